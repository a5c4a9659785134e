use thiserror::Error;

/// Errors produced by the coding algorithms in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Frequency counting, tree construction or encoding was attempted on empty input.
    #[error("cannot build a code from empty input")]
    EmptyInput,

    /// A symbol has no entry in the code table it is being encoded with.
    #[error("symbol {0:?} has no code in the code table")]
    UnknownSymbol(char),

    /// The bit stream ended, or hit an impossible branch, before reaching a leaf.
    #[error("malformed bit stream: code starting at bit {position} is incomplete")]
    MalformedStream { position: usize },

    /// A textual bit stream contained something other than `'0'` or `'1'`.
    #[error("invalid bit {found:?} at position {position}")]
    InvalidBit { position: usize, found: char },

    /// A serialized payload could not be parsed.
    #[error("invalid payload format: {0}")]
    InvalidFormat(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
