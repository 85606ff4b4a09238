use thiserror::Error;

/// Errors raised while constructing a QR PDF from a source document.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("could not determine a valid encoding for file contents")]
    EncodingDetection,

    #[error("could not decode file with encoding: {0}")]
    UnsupportedEncoding(String),

    #[error("input requires {0} QR codes to encode, which exceeds the maximum; consider breaking the file into smaller pieces")]
    TooManyCodes(u64),

    #[error("could not construct error-correction codes: {0}")]
    EccFailed(String),

    #[error("unable to fit QR code on page")]
    LayoutImpossible,

    #[error("QR code construction failed: {0}")]
    Qr(#[from] qrcode::types::QrError),

    #[error("PDF write failed: {0}")]
    PdfWrite(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Errors raised while reconstructing a source document from a QR PDF.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// A QR payload that failed base-85 or frame parsing. Individual bad
    /// frames are skipped during scanning; this surfaces only when every
    /// detected symbol is unreadable.
    #[error("could not read QR payload")]
    BadFrame,

    #[error("unknown document payload data type: {0}")]
    UnknownDataType(i32),

    #[error("insufficient QR payloads for recovery: need {needed}, got {got}")]
    InsufficientCodes { needed: usize, got: usize },

    #[error("error-correction decode failed: {0}")]
    UnrecoverableLoss(String),

    #[error("recovered document does not match checksum")]
    ChecksumMismatch,

    #[error("recovered document payload is corrupt")]
    Corrupt,

    #[error("could not render PDF pages: {0}")]
    PdfRender(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
