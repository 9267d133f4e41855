use std::fmt;

/// A datagram that could not be decoded as OSC. The receive loop drops it,
/// logs, and keeps going; never fatal.
#[derive(Debug)]
pub enum DecodeError {
    Malformed(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed(detail) => write!(f, "malformed OSC datagram: {}", detail),
        }
    }
}

impl std::error::Error for DecodeError {}

/// A rejected local settings edit. State is left untouched; surfaced to
/// the caller instead of being clamped, because the edit was deliberate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    OutOfRange {
        field: &'static str,
        value: u32,
        max: u32,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::OutOfRange { field, value, max } => {
                write!(f, "{} {} out of range (0-{})", field, value, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Settings could not be read from or written to disk. Surfaced to the
/// shell; the engine keeps operating on its in-memory copy.
#[derive(Debug)]
pub enum PersistenceError {
    Io(std::io::Error),
    Format(String),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Io(e) => write!(f, "settings file I/O failed: {}", e),
            PersistenceError::Format(detail) => write!(f, "settings file invalid: {}", detail),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistenceError::Io(e) => Some(e),
            PersistenceError::Format(_) => None,
        }
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(e: std::io::Error) -> Self {
        PersistenceError::Io(e)
    }
}
