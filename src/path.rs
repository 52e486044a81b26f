use smol_str::{SmolStr, format_smolstr};

// ─── PathKey ────────────────────────────────────────────────────────────────

/// One segment of an access path: a field name, a mapping key, or a sequence
/// index. Built per call, never stored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathKey {
    Name(SmolStr),
    Index(i64),
}

impl PathKey {
    /// Render the key as a field/map name. Integer keys format as decimal.
    pub fn as_name(&self) -> SmolStr {
        match self {
            PathKey::Name(s) => s.clone(),
            PathKey::Index(i) => format_smolstr!("{}", i),
        }
    }

    /// Coerce the key to a sequence index. Numeric strings parse; anything
    /// else (or a negative index) is a miss.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathKey::Index(i) => usize::try_from(*i).ok(),
            PathKey::Name(s) => s.parse::<usize>().ok(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PathKey::Index(i) => Some(*i),
            PathKey::Name(s) => s.parse::<i64>().ok(),
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            PathKey::Index(i) => u64::try_from(*i).ok(),
            PathKey::Name(s) => s.parse::<u64>().ok(),
        }
    }
}

impl From<&str> for PathKey {
    fn from(s: &str) -> Self {
        PathKey::Name(SmolStr::from(s))
    }
}

impl From<String> for PathKey {
    fn from(s: String) -> Self {
        PathKey::Name(SmolStr::from(s))
    }
}

impl From<SmolStr> for PathKey {
    fn from(s: SmolStr) -> Self {
        PathKey::Name(s)
    }
}

impl From<i64> for PathKey {
    fn from(i: i64) -> Self {
        PathKey::Index(i)
    }
}

impl From<i32> for PathKey {
    fn from(i: i32) -> Self {
        PathKey::Index(i64::from(i))
    }
}

impl From<u32> for PathKey {
    fn from(i: u32) -> Self {
        PathKey::Index(i64::from(i))
    }
}

impl From<usize> for PathKey {
    fn from(i: usize) -> Self {
        PathKey::Index(i as i64)
    }
}

/// Build a `[PathKey; N]` from mixed name/index literals:
/// `path!["addr", "lines", 0]`.
#[macro_export]
macro_rules! path {
    ( $($key:expr),* $(,)? ) => {
        [ $( $crate::path::PathKey::from($key) ),* ]
    };
}
