use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfInkError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("Failed to embed font: {0}")]
    FontEmbedError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}
