//! Error types for the importer.

use thiserror::Error;

/// Main error type for the importer library.
#[derive(Debug, Error)]
pub enum ImporterError {
    /// HTTP transport failure while fetching the archive.
    #[error("archive download failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The archive endpoint answered with a non-success status.
    #[error("archive download failed with status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// The downloaded bytes are not a readable ZIP archive.
    #[error("invalid ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The archive contains no XML member.
    #[error("no XML entry found in the registry archive")]
    NoXmlEntry,

    /// The XML payload could not be decoded in its declared encoding.
    #[error("could not decode XML payload as {encoding}")]
    Decode { encoding: String },

    /// XML parsing failed.
    #[error("XML parsing failed: {0}")]
    XmlParse(#[from] roxmltree::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for importer operations.
pub type Result<T> = std::result::Result<T, ImporterError>;
