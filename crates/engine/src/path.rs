use std::{fmt, hash::Hash, sync::Arc};

use error::{ErrorPath, ErrorPathSegment, InsertIntoErrorPath};

/// Response key of a field, its alias if any or its name otherwise.
pub type ResponseKey = Arc<str>;

const PARENT_MULTIPLIER: u64 = 31;
const NAME_MULTIPLIER: u64 = 17;
const INDEX_MULTIPLIER: u64 = 0x9E37_79B9_7F4A_7C15;

/// Address of a value within the response data.
///
/// Paths are immutable linked lists pointing to their parent, so sibling fields and list items
/// share their ancestors. The empty path is the root of the data and every other path is either
/// a field of an object or an item of a list. Equality and hashing are structural, two paths
/// built independently from the same segments are equal and can be used interchangeably as keys.
#[derive(Clone, Default)]
pub struct Path(Option<Arc<PathNode>>);

struct PathNode {
    parent: Path,
    segment: PathSegment,
    depth: usize,
    hash: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Field(ResponseKey),
    Index(usize),
}

impl PathSegment {
    fn hash_value(&self) -> u64 {
        match self {
            PathSegment::Field(name) => fxhash::hash64(name.as_ref()).wrapping_mul(NAME_MULTIPLIER),
            PathSegment::Index(index) => (*index as u64).wrapping_add(1).wrapping_mul(INDEX_MULTIPLIER),
        }
    }
}

impl Path {
    /// The root of the response data.
    pub fn root() -> Self {
        Path(None)
    }

    /// Path of a root field.
    pub fn new(name: impl Into<ResponseKey>) -> Self {
        Self::root().child(name)
    }

    /// Path of the field `name` of the object at this path.
    #[must_use]
    pub fn child(&self, name: impl Into<ResponseKey>) -> Self {
        self.push(PathSegment::Field(name.into()))
    }

    /// Path of the item at `index` of the list at this path.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.push(PathSegment::Index(index))
    }

    fn push(&self, segment: PathSegment) -> Self {
        let hash = self
            .hash_value()
            .wrapping_mul(PARENT_MULTIPLIER)
            .wrapping_add(segment.hash_value());
        Path(Some(Arc::new(PathNode {
            parent: self.clone(),
            segment,
            depth: self.depth() + 1,
            hash,
        })))
    }

    pub fn is_root(&self) -> bool {
        self.0.is_none()
    }

    /// `None` only for the root.
    pub fn parent(&self) -> Option<&Path> {
        self.0.as_ref().map(|node| &node.parent)
    }

    pub fn segment(&self) -> Option<&PathSegment> {
        self.0.as_ref().map(|node| &node.segment)
    }

    pub fn name(&self) -> Option<&str> {
        match self.segment()? {
            PathSegment::Field(name) => Some(name),
            PathSegment::Index(_) => None,
        }
    }

    pub fn list_index(&self) -> Option<usize> {
        match self.segment()? {
            PathSegment::Index(index) => Some(*index),
            PathSegment::Field(_) => None,
        }
    }

    pub fn is_indexer(&self) -> bool {
        matches!(self.segment(), Some(PathSegment::Index(_)))
    }

    pub fn depth(&self) -> usize {
        self.0.as_ref().map(|node| node.depth).unwrap_or_default()
    }

    fn hash_value(&self) -> u64 {
        self.0.as_ref().map(|node| node.hash).unwrap_or_default()
    }

    /// Iterates from this path up to the root, the root excluded.
    pub fn ancestors(&self) -> impl Iterator<Item = &Path> {
        std::iter::successors(Some(self), |path| path.parent()).filter(|path| !path.is_root())
    }

    /// Segments from the root down to this path.
    pub fn segments(&self) -> Vec<PathSegment> {
        let mut segments = self.ancestors().filter_map(|path| path.segment().cloned()).collect::<Vec<_>>();
        segments.reverse();
        segments
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        let mut left = self;
        let mut right = other;
        loop {
            match (&left.0, &right.0) {
                (None, None) => return true,
                (Some(a), Some(b)) => {
                    if Arc::ptr_eq(a, b) {
                        return true;
                    }
                    if a.hash != b.hash || a.depth != b.depth || a.segment != b.segment {
                        return false;
                    }
                    left = &a.parent;
                    right = &b.parent;
                }
                _ => return false,
            }
        }
    }
}

impl Eq for Path {}

impl Hash for Path {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash_value());
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str("/");
        }
        for segment in self.segments() {
            match segment {
                PathSegment::Field(name) => write!(f, "/{name}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Path({self})")
    }
}

impl InsertIntoErrorPath for &Path {
    fn insert_into(self, path: &mut ErrorPath) {
        for segment in self.segments() {
            path.push(match segment {
                PathSegment::Field(name) => ErrorPathSegment::Field(name.as_ref().into()),
                PathSegment::Index(index) => ErrorPathSegment::Index(index),
            });
        }
    }
}
