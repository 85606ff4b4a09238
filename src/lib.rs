//! Tools for carrying text documents through the print/scan channel:
//! encoding a document (plus optional JSON metadata) into a PDF of QR
//! codes, and recovering the exact original bytes by scanning such a PDF.
//!
//! Documents are compressed, fingerprinted, split into fixed-length
//! fragments, and extended with cross-code Reed-Solomon parity fragments,
//! so the original survives individual codes being smudged, torn, or
//! missing entirely. Each fragment travels in a compact binary frame that
//! carries the document fingerprint and its position in the sequence;
//! scan order never matters.
//!
//! ```no_run
//! let options = qrdm::EncodeOptions::default();
//! let pdf = qrdm::encode_qr_pdf("Lorem ipsum dolor sit amet. 😎", &options)?;
//! let recovered = qrdm::decode_qr_pdf(&pdf)?.expect("no QR codes found");
//! assert_eq!(recovered.content, "Lorem ipsum dolor sit amet. 😎");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod b85;
mod chunk;
mod consts;
mod decode;
mod ecc;
mod encode;
mod error;
mod fingerprint;
mod models;
mod wire;

pub use decode::{decode_qr_images, decode_qr_pdf, decode_qr_pdf_file, recover_document_payload};
pub use encode::{
    document_content_from_bytes, encode_qr_pdf, encode_qr_pdf_to_writer, generate_qr_codes,
    generate_qr_payloads, EncodeOptions,
};
pub use error::{DecodeError, EncodeError};
pub use models::{DocumentPayload, ErrorTolerance, QrContent, QrMeta};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
