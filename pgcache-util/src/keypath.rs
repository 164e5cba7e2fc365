//! Typed key-path segment parsing used by the introspection registry's
//! value lookup (spec.md §4.6: "converting each string segment to the key
//! type (integer, unsigned, bool, or string)").

use std::fmt;

/// The kind of key a single mapping layer is indexed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyKind {
    /// A signed integer key.
    Integer,
    /// An unsigned integer key.
    Unsigned,
    /// A boolean key.
    Bool,
    /// A string key.
    String,
}

/// A single parsed key-path segment, ready to be compared against a row's
/// key-field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyValue {
    /// A signed integer key.
    Integer(i64),
    /// An unsigned integer key.
    Unsigned(u64),
    /// A boolean key.
    Bool(bool),
    /// A string key.
    String(String),
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Integer(v) => write!(f, "{v}"),
            KeyValue::Unsigned(v) => write!(f, "{v}"),
            KeyValue::Bool(v) => write!(f, "{v}"),
            KeyValue::String(v) => write!(f, "{v}"),
        }
    }
}

/// A key path couldn't be walked against a binding's expected key kinds:
/// either one segment didn't parse as its kind, or the path had the wrong
/// number of segments.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyPathError {
    /// One segment couldn't be parsed as the key kind a mapping layer
    /// expects.
    #[error("key-path segment `{segment}` is not a valid {kind:?}")]
    Segment {
        /// The segment that failed to parse.
        segment: String,
        /// The kind it was expected to parse as.
        kind: KeyKind,
    },

    /// The path had a different number of segments than the binding has
    /// mapping layers.
    #[error("key path `{path}` has {actual} segment(s), expected {expected}")]
    LengthMismatch {
        /// The full path as given.
        path: String,
        /// The number of key kinds the binding expects.
        expected: usize,
        /// The number of comma-separated segments actually given.
        actual: usize,
    },
}

/// Parse one `?keys=a,b,c`-style path segment into a typed key, per
/// `kind`.
pub fn parse_segment(kind: KeyKind, segment: &str) -> Result<KeyValue, KeyPathError> {
    let err = || KeyPathError::Segment {
        segment: segment.to_string(),
        kind,
    };
    match kind {
        KeyKind::Integer => segment.parse().map(KeyValue::Integer).map_err(|_| err()),
        KeyKind::Unsigned => segment.parse().map(KeyValue::Unsigned).map_err(|_| err()),
        KeyKind::Bool => segment.parse().map(KeyValue::Bool).map_err(|_| err()),
        KeyKind::String => Ok(KeyValue::String(segment.to_string())),
    }
}

/// Parse a full comma-separated key path (the `?keys=a,b,c` query
/// parameter) against an ordered list of expected key kinds. Errors if the
/// path has a different number of segments than `kinds` rather than
/// silently truncating to the shorter length, so a malformed request is
/// reported instead of mis-answered as "not found".
pub fn parse_path(kinds: &[KeyKind], path: &str) -> Result<Vec<KeyValue>, KeyPathError> {
    let segments: Vec<&str> = path.split(',').collect();
    if segments.len() != kinds.len() {
        return Err(KeyPathError::LengthMismatch {
            path: path.to_string(),
            expected: kinds.len(),
            actual: segments.len(),
        });
    }
    segments
        .into_iter()
        .zip(kinds.iter())
        .map(|(segment, kind)| parse_segment(*kind, segment))
        .collect()
}
