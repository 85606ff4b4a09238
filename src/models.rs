//! Data structures representing source documents and per-QR payloads, and
//! their serialized forms.

use crate::b85;
use crate::error::DecodeError;
use crate::wire;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use prost::Message;
use std::io::{Read, Write};

/// Error-correction level applied inside each individual QR symbol. This is
/// orthogonal to the cross-code Reed-Solomon layer: it tolerates
/// module-level damage within one symbol, not whole missing symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorTolerance {
    L,
    #[default]
    M,
    Q,
    H,
}

impl ErrorTolerance {
    /// Column of the capacity table for this level.
    pub(crate) fn column(self) -> usize {
        match self {
            ErrorTolerance::L => 0,
            ErrorTolerance::M => 1,
            ErrorTolerance::Q => 2,
            ErrorTolerance::H => 3,
        }
    }

    pub(crate) fn ec_level(self) -> qrcode::EcLevel {
        match self {
            ErrorTolerance::L => qrcode::EcLevel::L,
            ErrorTolerance::M => qrcode::EcLevel::M,
            ErrorTolerance::Q => qrcode::EcLevel::Q,
            ErrorTolerance::H => qrcode::EcLevel::H,
        }
    }
}

/// A source document: its text content and optional JSON metadata carried
/// alongside it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentPayload {
    pub content: String,
    pub metadata: Option<serde_json::Value>,
}

impl DocumentPayload {
    pub fn new(content: impl Into<String>, metadata: Option<serde_json::Value>) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }

    /// Serialize to the length-delimited wire form.
    pub(crate) fn to_wire_bytes(&self) -> Vec<u8> {
        let message = wire::DocumentPayload {
            content: self.content.as_bytes().to_vec(),
            metadata: self
                .metadata
                .as_ref()
                .map(|value| value.to_string().into_bytes()),
            data_type: wire::DataType::Utf8String as i32,
        };
        message.encode_to_vec()
    }

    /// Serialize and deflate at the maximum compression level.
    pub fn to_compressed_bytes(&self) -> std::io::Result<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
        encoder.write_all(&self.to_wire_bytes())?;
        encoder.finish()
    }

    pub(crate) fn from_wire_bytes(raw: &[u8]) -> Result<Self, DecodeError> {
        let message = wire::DocumentPayload::decode(raw).map_err(|_| DecodeError::Corrupt)?;
        if wire::DataType::try_from(message.data_type) != Ok(wire::DataType::Utf8String) {
            return Err(DecodeError::UnknownDataType(message.data_type));
        }
        let content = String::from_utf8(message.content).map_err(|_| DecodeError::Corrupt)?;
        let metadata = match message.metadata {
            Some(raw_json) if !raw_json.is_empty() => {
                Some(serde_json::from_slice(&raw_json).map_err(|_| DecodeError::Corrupt)?)
            }
            _ => None,
        };
        Ok(Self { content, metadata })
    }

    /// Inflate and parse. Trailing bytes after the end of the deflate
    /// stream (reconstruction padding) are ignored.
    pub fn from_compressed_bytes(compressed: &[u8]) -> Result<Self, DecodeError> {
        let mut raw = Vec::new();
        ZlibDecoder::new(compressed)
            .read_to_end(&mut raw)
            .map_err(|_| DecodeError::Corrupt)?;
        Self::from_wire_bytes(&raw)
    }
}

/// Metadata duplicated into every QR code of a document, used to regroup
/// and order scanned fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QrMeta {
    /// Fingerprint of the compressed document.
    pub document_hash: u64,
    /// Position of this fragment in the emitted sequence; each
    /// error-correction group's parity fragments follow its data fragments.
    pub sequence_number: u32,
    pub total_qr_codes: u32,
    /// Number of parity fragments in each error-correction group.
    pub num_ecc: u32,
}

/// Payload of a single QR code: shared metadata plus one document fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrContent {
    pub meta: QrMeta,
    pub doc_fragment: Vec<u8>,
}

impl QrContent {
    pub(crate) fn to_wire_bytes(&self) -> Vec<u8> {
        let message = wire::QrContent {
            meta: Some(wire::QrMeta {
                document_hash: self.meta.document_hash,
                sequence_number: self.meta.sequence_number,
                total_qr_codes: self.meta.total_qr_codes,
                num_ecc: self.meta.num_ecc,
            }),
            doc_fragment: self.doc_fragment.clone(),
        };
        message.encode_to_vec()
    }

    /// Serialize and base-85 encode, yielding the ASCII byte string placed
    /// in a QR symbol.
    pub fn to_b85_bytes(&self) -> Vec<u8> {
        b85::encode(&self.to_wire_bytes())
    }

    pub(crate) fn from_wire_bytes(raw: &[u8]) -> Result<Self, DecodeError> {
        let message = wire::QrContent::decode(raw).map_err(|_| DecodeError::BadFrame)?;
        let meta = message.meta.ok_or(DecodeError::BadFrame)?;
        let meta = QrMeta {
            document_hash: meta.document_hash,
            sequence_number: meta.sequence_number,
            total_qr_codes: meta.total_qr_codes,
            num_ecc: meta.num_ecc,
        };
        if meta.total_qr_codes == 0
            || meta.sequence_number >= meta.total_qr_codes
            || meta.num_ecc >= meta.total_qr_codes
        {
            return Err(DecodeError::BadFrame);
        }
        Ok(Self {
            meta,
            doc_fragment: message.doc_fragment,
        })
    }

    /// Parse a base-85 encoded frame as scanned out of a QR symbol.
    pub fn from_b85_bytes(encoded: &[u8]) -> Result<Self, DecodeError> {
        let raw = b85::decode(encoded).map_err(|_| DecodeError::BadFrame)?;
        Self::from_wire_bytes(&raw)
    }
}
