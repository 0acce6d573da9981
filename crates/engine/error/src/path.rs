#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Default)]
pub struct ErrorPath(Vec<ErrorPathSegment>);

impl std::ops::Deref for ErrorPath {
    type Target = Vec<ErrorPathSegment>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for ErrorPath {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone)]
pub enum ErrorPathSegment {
    Field(Box<str>),
    Index(usize),
}

impl serde::Serialize for ErrorPathSegment {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            ErrorPathSegment::Field(name) => serializer.serialize_str(name),
            ErrorPathSegment::Index(index) => serializer.serialize_u64(*index as u64),
        }
    }
}

impl serde::Serialize for ErrorPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(self.0.iter())
    }
}

pub trait InsertIntoErrorPath {
    fn insert_into(self, path: &mut ErrorPath);
}

impl InsertIntoErrorPath for &str {
    fn insert_into(self, path: &mut ErrorPath) {
        path.0.push(ErrorPathSegment::Field(self.into()));
    }
}

impl InsertIntoErrorPath for String {
    fn insert_into(self, path: &mut ErrorPath) {
        path.0.push(ErrorPathSegment::Field(self.into_boxed_str()));
    }
}

impl InsertIntoErrorPath for usize {
    fn insert_into(self, path: &mut ErrorPath) {
        path.0.push(ErrorPathSegment::Index(self));
    }
}

impl InsertIntoErrorPath for u32 {
    fn insert_into(self, path: &mut ErrorPath) {
        path.0.push(ErrorPathSegment::Index(self as usize));
    }
}

impl InsertIntoErrorPath for ErrorPathSegment {
    fn insert_into(self, path: &mut ErrorPath) {
        path.0.push(self);
    }
}

impl<T: InsertIntoErrorPath> InsertIntoErrorPath for Vec<T> {
    fn insert_into(self, path: &mut ErrorPath) {
        for item in self {
            item.insert_into(path);
        }
    }
}

impl<T1: InsertIntoErrorPath, T2: InsertIntoErrorPath> InsertIntoErrorPath for (T1, T2) {
    fn insert_into(self, path: &mut ErrorPath) {
        self.0.insert_into(path);
        self.1.insert_into(path);
    }
}

impl<T: InsertIntoErrorPath> From<T> for ErrorPath {
    fn from(t: T) -> Self {
        let mut path = ErrorPath(Vec::new());
        t.insert_into(&mut path);
        path
    }
}

impl std::fmt::Display for ErrorPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for segment in &self.0 {
            match segment {
                ErrorPathSegment::Field(name) => write!(f, "/{name}")?,
                ErrorPathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}
