//! CANOPY - Key Composition
//! Hierarchical paths are flattened into engine keys by joining their
//! segments with [`SEPARATOR`]. Tree operations use the same join on a
//! shorter path as a raw byte prefix.

use crate::error::{CanopyError, Result};
use crate::types::Key;

/// Reserved segment separator.
pub const SEPARATOR: char = ':';

/// Compose the engine key for `segments`. The result must be non-empty.
pub fn join<S: AsRef<str>>(segments: &[S]) -> Result<Key> {
    let key = compose(segments)?;
    if key.is_empty() {
        return Err(CanopyError::BadKey("empty key".to_string()));
    }
    Ok(key)
}

/// Compose a scan prefix. Zero segments is the whole keyspace.
pub fn prefix<S: AsRef<str>>(segments: &[S]) -> Result<Key> {
    compose(segments)
}

fn compose<S: AsRef<str>>(segments: &[S]) -> Result<Key> {
    let mut key = Vec::new();
    for (i, segment) in segments.iter().enumerate() {
        let segment = segment.as_ref();
        // Unescaped separators would make distinct paths collide.
        if segment.contains(SEPARATOR) {
            return Err(CanopyError::BadKey(format!(
                "segment {:?} contains the separator '{}'",
                segment, SEPARATOR
            )));
        }
        if i > 0 {
            key.push(SEPARATOR as u8);
        }
        key.extend_from_slice(segment.as_bytes());
    }
    Ok(key)
}
