//! Error types for scene conversion.

use thiserror::Error;

/// Errors that end a stage or the whole run.
///
/// Conditions that only skip data (an unmapped bone, a malformed keyframe, a
/// missing timeline plugin) are reported through stage outcomes instead.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The container ended in the middle of a record
    #[error("Unexpected end of data while reading {context} (record at byte {position})")]
    UnexpectedEof { context: &'static str, position: u64 },

    /// A field whose encoding cannot be decoded, such as a runaway string length
    #[error("Malformed {context} at byte {position}: {message}")]
    Malformed {
        context: &'static str,
        position: u64,
        message: String,
    },

    /// Object kind outside the supported Character/Item/Folder set
    #[error("Unsupported object kind {kind} at byte {position}")]
    UnsupportedObjectKind { kind: i32, position: u64 },

    /// A length field that cannot describe a real block
    #[error("Invalid length {length} for {context}")]
    InvalidLength { context: &'static str, length: i64 },

    /// The plugin map could not be decoded as MessagePack
    #[error("Plugin data decode failed: {0}")]
    PluginDecode(String),

    /// The plugin map decoded but does not have the expected shape
    #[error("Unexpected plugin data layout: {0}")]
    PluginShape(String),

    /// Malformed timeline XML
    #[error("Timeline XML error: {0}")]
    Xml(String),

    /// Caller-supplied input that cannot be used
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Re-labels end-of-file and undecodable-data I/O errors with what was
    /// being read. Other I/O errors stay `Io`.
    pub fn at(self, context: &'static str, position: u64) -> Self {
        match self {
            Error::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Error::UnexpectedEof { context, position }
            }
            Error::Io(e) if e.kind() == std::io::ErrorKind::InvalidData => Error::Malformed {
                context,
                position,
                message: e.to_string(),
            },
            other => other,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<rmpv::decode::Error> for Error {
    fn from(e: rmpv::decode::Error) -> Self {
        Error::PluginDecode(e.to_string())
    }
}
