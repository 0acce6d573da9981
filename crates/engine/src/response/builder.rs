use fxhash::FxHashSet;
use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::path::{Path, PathSegment, ResponseKey};

enum Entry {
    Value(Value),
    /// Object with its fields in selection order.
    Object(Vec<ResponseKey>),
    List(usize),
}

/// Accumulates the values written by field completion, keyed by their path, and assembles the
/// nested response data at the end of the execution.
///
/// Writes can happen in any order. Containers are materialized on demand while building, so
/// objects and lists only need to be declared to guarantee their field order and length.
#[derive(Default)]
pub(crate) struct ResultBuilder {
    entries: IndexMap<Path, Entry>,
    nulled: FxHashSet<Path>,
    data_nulled: bool,
}

impl ResultBuilder {
    pub fn add_value(&mut self, path: &Path, value: Value) {
        self.insert(path, Entry::Value(value));
    }

    pub fn add_object(&mut self, path: &Path, keys: Vec<ResponseKey>) {
        self.insert(path, Entry::Object(keys));
    }

    pub fn add_list(&mut self, path: &Path, len: usize) {
        self.insert(path, Entry::List(len));
    }

    fn insert(&mut self, path: &Path, entry: Entry) {
        let previous = self.entries.insert(path.clone(), entry);
        debug_assert!(previous.is_none(), "{path} was written twice");
    }

    /// Replaces whatever was written at `path` by null, discarding every value written below it.
    pub fn set_null(&mut self, path: &Path) {
        if path.is_root() {
            self.data_nulled = true;
            return;
        }
        self.entries.insert(path.clone(), Entry::Value(Value::Null));
        self.nulled.insert(path.clone());
    }

    /// Nulls the nearest nullable ancestor of a failed non-null field, the whole data if there is
    /// none.
    pub fn propagate_null(&mut self, nullable_ancestor: Option<&Path>) {
        match nullable_ancestor {
            Some(path) => self.set_null(path),
            None => self.data_nulled = true,
        }
    }

    /// Whether anything written at `path` would be dropped.
    pub fn is_discarded(&self, path: &Path) -> bool {
        self.data_nulled || path.ancestors().any(|ancestor| self.nulled.contains(ancestor))
    }

    pub fn build(self) -> Value {
        let ResultBuilder {
            entries,
            nulled,
            data_nulled,
        } = self;
        if data_nulled {
            return Value::Null;
        }
        let is_below_null = |path: &Path| {
            path.parent()
                .is_some_and(|parent| parent.ancestors().any(|ancestor| nulled.contains(ancestor)))
        };

        let mut data = Value::Object(Map::new());
        for (path, entry) in entries {
            if is_below_null(&path) {
                continue;
            }
            let slot = materialize(&mut data, &path.segments());
            match entry {
                Entry::Value(value) => *slot = value,
                Entry::Object(keys) => {
                    let mut existing = match slot.take() {
                        Value::Object(fields) => fields,
                        _ => Map::new(),
                    };
                    let mut fields = Map::with_capacity(keys.len());
                    for key in keys {
                        let value = existing.remove(&*key).unwrap_or_default();
                        fields.insert(key.to_string(), value);
                    }
                    fields.extend(existing);
                    *slot = Value::Object(fields);
                }
                Entry::List(len) => {
                    let mut items = match slot.take() {
                        Value::Array(items) => items,
                        _ => Vec::new(),
                    };
                    if items.len() < len {
                        items.resize(len, Value::Null);
                    }
                    *slot = Value::Array(items);
                }
            }
        }
        data
    }
}

/// Walks down to the value at `segments`, creating the intermediate containers. Reusing an
/// existing container is what makes the assembly independent of the write order.
fn materialize<'v>(root: &'v mut Value, segments: &[PathSegment]) -> &'v mut Value {
    let mut current = root;
    for segment in segments {
        current = match segment {
            PathSegment::Field(key) => {
                if !current.is_object() {
                    *current = Value::Object(Map::new());
                }
                &mut current[&**key]
            }
            PathSegment::Index(index) => {
                if let Value::Array(items) = current {
                    if items.len() <= *index {
                        items.resize(index + 1, Value::Null);
                    }
                } else {
                    *current = Value::Array(vec![Value::Null; index + 1]);
                }
                &mut current[*index]
            }
        };
    }
    current
}
