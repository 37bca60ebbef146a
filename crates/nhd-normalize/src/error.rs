use std::fmt;

/// Why a payload could not be classified. Recovered locally: the event is
/// discarded and the canonical store is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// The payload root is neither an object nor a sequence.
    UnsupportedRoot { found: &'static str },
    /// A `symbols` / `prices` / `data` container held an unusable value.
    UnsupportedContainer {
        key: &'static str,
        found: &'static str,
    },
    /// An object payload carried no symbol-state members.
    NoSymbols,
    /// A price payload carried no finite numeric prices.
    NoPrices,
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedRoot { found } => write!(f, "unsupported payload root: {found}"),
            Self::UnsupportedContainer { key, found } => {
                write!(f, "'{key}' holds {found}, expected object or sequence")
            }
            Self::NoSymbols => write!(f, "no symbol records in payload"),
            Self::NoPrices => write!(f, "no numeric prices in payload"),
        }
    }
}

impl std::error::Error for ShapeError {}
