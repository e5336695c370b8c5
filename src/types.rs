//! CANOPY - Core Type Definitions
//! Defines fundamental types shared by the store and its backends.

/// Raw engine key (a composed path).
pub type Key = Vec<u8>;

/// Raw value bytes.
pub type Value = Vec<u8>;

/// A single staged write against the engine.
/// A `None` value indicates a tombstone (deletion).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub key: Key,
    pub value: Option<Value>,
}

impl Mutation {
    /// Create a PUT mutation.
    pub fn put(key: Key, value: Value) -> Self {
        Self {
            key,
            value: Some(value),
        }
    }

    /// Create a DELETE mutation.
    pub fn delete(key: Key) -> Self {
        Self { key, value: None }
    }
}

/// A key and its stripped value, as returned by tree reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: Key,
    pub value: Value,
}

impl Entry {
    /// The key as UTF-8 text, lossily.
    pub fn key_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }
}
