//! Error types for the XMLTV reader

use thiserror::Error;

/// Errors that end an enumeration over an XMLTV document.
///
/// Structural problems inside a single block (missing channel id, bad dates,
/// unparseable star ratings) never surface here; they are logged and the
/// affected field or record is dropped.
#[derive(Debug, Error)]
pub enum XmlTvError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("XML error at byte {position}: {source}")]
    Xml {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    /// The document ended while a block was still open.
    #[error("unexpected end of document inside <{0}>")]
    UnexpectedEof(String),

    /// An `xmltv_ns` episode code that does not follow the dotted-triple form.
    #[error("invalid xmltv_ns episode number '{value}': {reason}")]
    EpisodeNumber { value: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, XmlTvError>;
