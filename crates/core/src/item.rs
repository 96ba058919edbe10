//! Shared JSON records whose nested fields can be mutated in place.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::{Map, Value};

use crate::{FieldPath, Identity};

/// A JSON record shared between the source collection and any projection of it.
///
/// Clones share the same record, so mutating a field through one handle is
/// visible through all of them and identity (pointer equality) is preserved.
#[derive(Debug, Clone, Default)]
pub struct Node(Arc<RwLock<Value>>);

impl Node {
    pub fn new(value: Value) -> Self { Self(Arc::new(RwLock::new(value))) }

    fn read(&self) -> RwLockReadGuard<'_, Value> {
        self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Value> {
        self.0.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Copy of the whole record.
    pub fn snapshot(&self) -> Value { self.read().clone() }

    /// Run `f` against the record without copying it.
    pub fn with<R>(&self, f: impl FnOnce(&Value) -> R) -> R { f(&self.read()) }

    /// Value at a dotted path, if present.
    pub fn get(&self, path: &str) -> Option<Value> {
        let path = FieldPath::parse(path)?;
        self.read().pointer(&path.to_pointer()).cloned()
    }

    pub fn get_bool(&self, path: &str) -> bool {
        self.get(path).and_then(|v| v.as_bool()).unwrap_or(false)
    }

    pub fn get_i64(&self, path: &str) -> Option<i64> {
        self.get(path).and_then(|v| v.as_i64())
    }

    pub fn get_str(&self, path: &str) -> Option<String> {
        self.get(path).and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    /// Assign `value` at a dotted path, creating intermediate objects as needed.
    /// Returns false when the path is malformed or crosses a scalar or an
    /// out-of-range array index.
    pub fn set(&self, path: &str, value: Value) -> bool {
        let Some(path) = FieldPath::parse(path) else { return false };
        let mut guard = self.write();
        let mut cur: &mut Value = &mut *guard;
        let (last, parents) = match path.segments().split_last() {
            Some(split) => split,
            None => return false,
        };
        for seg in parents {
            if cur.is_null() { *cur = Value::Object(Map::new()); }
            cur = match cur {
                Value::Object(map) => map.entry(seg.clone()).or_insert(Value::Null),
                Value::Array(arr) => {
                    let Ok(i) = seg.parse::<usize>() else { return false };
                    match arr.get_mut(i) {
                        Some(v) => v,
                        None => return false,
                    }
                }
                _ => return false,
            };
        }
        if cur.is_null() { *cur = Value::Object(Map::new()); }
        match cur {
            Value::Object(map) => { map.insert(last.clone(), value); true }
            Value::Array(arr) => match last.parse::<usize>() {
                Ok(i) if i < arr.len() => { arr[i] = value; true }
                _ => false,
            },
            _ => false,
        }
    }
}

impl From<Value> for Node {
    fn from(v: Value) -> Self { Self::new(v) }
}

impl Identity for Node {
    fn same_item(&self, other: &Self) -> bool { Arc::ptr_eq(&self.0, &other.0) }
}
