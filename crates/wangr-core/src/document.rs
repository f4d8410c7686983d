//! Documents and snapshots
//!
//! A [`Document`] is the opaque structured payload one source returns. The core
//! only looks inside it to extract sort keys and list rows; field extraction
//! for display belongs to the view layer. A [`DataSnapshot`] groups the
//! documents of one acquisition cycle by source and is never patched after it
//! is built: the next cycle produces a new one.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::sources::Source;

/// Immutable JSON payload with cheap clones.
#[derive(Clone, PartialEq)]
pub struct Document(Arc<Value>);

impl Document {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(value))
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Null, `{}` and `[]` carry nothing worth rendering.
    pub fn is_empty(&self) -> bool {
        match self.value() {
            Value::Null => true,
            Value::Object(map) => map.is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Rows of a list-shaped document. Non-arrays have no rows.
    pub fn rows(&self) -> &[Value] {
        match self.value() {
            Value::Array(items) => items.as_slice(),
            _ => &[],
        }
    }

    /// Looks up a key on an object-shaped document.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value().get(key)
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Document({})", self.0)
    }
}

impl From<Value> for Document {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

/// One complete acquisition result, keyed by source identity.
///
/// Backed by an ordered map so two snapshots built from the same documents
/// compare equal regardless of the order the documents arrived in.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSnapshot {
    entries: BTreeMap<Source, Document>,
}

impl DataSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a snapshot from `(source, document)` pairs. Later pairs for the
    /// same source replace earlier ones.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Source, Document)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn get(&self, source: &Source) -> Option<&Document> {
        self.entries.get(source)
    }

    pub fn sources(&self) -> impl Iterator<Item = &Source> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Source, &Document)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the snapshot has no keys at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when at least one document has something to render. A snapshot
    /// whose every source fell back to its empty default has no content.
    pub fn has_content(&self) -> bool {
        self.entries.values().any(|doc| !doc.is_empty())
    }
}
