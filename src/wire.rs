//! Tag-length-value wire messages carried inside QR codes. These are plain
//! protobuf messages; decoders skip unknown fields, so the format can grow
//! without breaking already-printed documents.

use prost::Message;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QrMeta {
    #[prost(uint64, tag = "1")]
    pub document_hash: u64,
    #[prost(uint32, tag = "2")]
    pub sequence_number: u32,
    #[prost(uint32, tag = "3")]
    pub total_qr_codes: u32,
    #[prost(uint32, tag = "4")]
    pub num_ecc: u32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct QrContent {
    #[prost(message, optional, tag = "1")]
    pub meta: Option<QrMeta>,
    #[prost(bytes = "vec", tag = "2")]
    pub doc_fragment: Vec<u8>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DocumentPayload {
    #[prost(bytes = "vec", tag = "1")]
    pub content: Vec<u8>,
    #[prost(bytes = "vec", optional, tag = "2")]
    pub metadata: Option<Vec<u8>>,
    #[prost(enumeration = "DataType", tag = "3")]
    pub data_type: i32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DataType {
    Utf8String = 0,
}

/// Longest varint encoding.
pub const MAX_VARINT_LEN: usize = 10;

/// Upper bound on the framing overhead of one QR payload: a `QrMeta` with
/// every field at its maximum value, plus a tag and length varint for each
/// of the message's length-delimited fields. Reserving this many bytes out
/// of the QR capacity before chunking guarantees a framed chunk still fits.
pub fn reserved_frame_len() -> usize {
    let max_meta = QrMeta {
        document_hash: u64::MAX,
        sequence_number: u32::MAX,
        total_qr_codes: u32::MAX,
        num_ecc: u32::MAX,
    };
    max_meta.encoded_len() + 4 * MAX_VARINT_LEN
}
