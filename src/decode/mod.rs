//! Recover source documents from QR PDFs.

mod pages;
mod scan;

use crate::ecc;
use crate::error::DecodeError;
use crate::fingerprint;
use crate::models::{DocumentPayload, QrContent};
use image::GrayImage;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

/// Decode a QR PDF into the original document content and metadata.
///
/// Returns `None` when the PDF contains no QR symbols at all; a document
/// that was detected but cannot be reconstructed is an error.
pub fn decode_qr_pdf(pdf_bytes: &[u8]) -> Result<Option<DocumentPayload>, DecodeError> {
    let images = pages::render_page_images(pdf_bytes)?;
    decode_qr_images(&images)
}

/// As [`decode_qr_pdf`], reading the PDF from a file path.
pub fn decode_qr_pdf_file(path: impl AsRef<Path>) -> Result<Option<DocumentPayload>, DecodeError> {
    let pdf_bytes = std::fs::read(path)?;
    decode_qr_pdf(&pdf_bytes)
}

/// Run document recovery over already-rasterized page images. This is the
/// driver [`decode_qr_pdf`] wraps once the PDF has been rendered; hosts
/// that scan loose page images can call it directly.
pub fn decode_qr_images(images: &[GrayImage]) -> Result<Option<DocumentPayload>, DecodeError> {
    let outcome = scan::extract_qr_contents(images)?;
    debug!(extracted = outcome.contents.len(), "extracted QR payloads");
    if outcome.contents.is_empty() {
        if outcome.symbols_seen > 0 {
            // Symbols were detected, but every frame was unreadable.
            return Err(DecodeError::BadFrame);
        }
        warn!("failed to extract any QR data from input document");
        return Ok(None);
    }
    recover_document_payload(&outcome.contents).map(Some)
}

/// Reconstruct a [`DocumentPayload`] from parsed frames keyed by sequence
/// number: fill erasures through the parity fragments, verify the document
/// fingerprint, inflate, and parse.
pub fn recover_document_payload(
    contents: &HashMap<u32, QrContent>,
) -> Result<DocumentPayload, DecodeError> {
    let first = contents
        .values()
        .next()
        .ok_or(DecodeError::InsufficientCodes { needed: 1, got: 0 })?;
    let total = first.meta.total_qr_codes as usize;
    let num_ecc = first.meta.num_ecc as usize;
    let needed = total - num_ecc;
    if contents.len() < needed {
        debug!(missing = ?missing_sequence_numbers(contents), "insufficient QR payloads");
        return Err(DecodeError::InsufficientCodes {
            needed,
            got: contents.len(),
        });
    }

    // Fragments of one document all share a length; anything shorter got
    // truncated somewhere and counts as an erasure.
    let fragment_len = contents
        .values()
        .map(|content| content.doc_fragment.len())
        .max()
        .unwrap_or(0);

    let data_fragments = if num_ecc > 0 {
        let shards: Vec<Option<Vec<u8>>> = (0..total as u32)
            .map(|sequence_number| {
                contents.get(&sequence_number).and_then(|content| {
                    (content.doc_fragment.len() == fragment_len)
                        .then(|| content.doc_fragment.clone())
                })
            })
            .collect();
        ecc::reconstruct(shards, num_ecc)?
    } else {
        (0..total as u32)
            .map(|sequence_number| {
                contents
                    .get(&sequence_number)
                    .map(|content| content.doc_fragment.clone())
                    .ok_or(DecodeError::InsufficientCodes {
                        needed,
                        got: contents.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?
    };

    let total_payload = data_fragments.concat();
    let recomputed_hash = fingerprint::document_fingerprint(&total_payload);
    if recomputed_hash != first.meta.document_hash {
        warn!(
            expected = first.meta.document_hash,
            got = recomputed_hash,
            "recovered document does not match verification hash"
        );
        return Err(DecodeError::ChecksumMismatch);
    }

    DocumentPayload::from_compressed_bytes(&total_payload)
}

fn missing_sequence_numbers(contents: &HashMap<u32, QrContent>) -> Vec<u32> {
    match contents.values().next() {
        Some(first) => (0..first.meta.total_qr_codes)
            .filter(|sequence_number| !contents.contains_key(sequence_number))
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::{generate_qr_payloads, EncodeOptions};
    use crate::models::ErrorTolerance;

    fn frames_for(
        document: &DocumentPayload,
        encode_ec_codes: bool,
    ) -> HashMap<u32, QrContent> {
        let payloads =
            generate_qr_payloads(document, encode_ec_codes, ErrorTolerance::M).unwrap();
        payloads
            .iter()
            .map(|payload| {
                let content = QrContent::from_b85_bytes(payload).unwrap();
                (content.meta.sequence_number, content)
            })
            .collect()
    }

    fn sample_document() -> DocumentPayload {
        let mut x: u64 = 99;
        let content: String = (0..3000)
            .map(|_| {
                x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
                char::from(b'A' + ((x >> 58) % 26) as u8)
            })
            .collect();
        DocumentPayload::new(content, Some(serde_json::json!({"example": true})))
    }

    #[test]
    fn payload_round_trip_without_loss() {
        let document = sample_document();
        let frames = frames_for(&document, true);
        assert_eq!(recover_document_payload(&frames).unwrap(), document);
    }

    #[test]
    fn recovers_with_parity_after_losses() {
        let document = sample_document();
        let mut frames = frames_for(&document, true);
        let num_ecc = frames[&0].meta.num_ecc;
        assert!(num_ecc >= 1);
        for sequence_number in 0..num_ecc {
            frames.remove(&sequence_number);
        }
        assert_eq!(recover_document_payload(&frames).unwrap(), document);
    }

    #[test]
    fn one_loss_too_many_is_insufficient() {
        let document = sample_document();
        let mut frames = frames_for(&document, true);
        let num_ecc = frames[&0].meta.num_ecc;
        for sequence_number in 0..=num_ecc {
            frames.remove(&sequence_number);
        }
        assert!(matches!(
            recover_document_payload(&frames),
            Err(DecodeError::InsufficientCodes { .. })
        ));
    }

    #[test]
    fn without_parity_every_code_is_required() {
        let document = sample_document();
        let mut frames = frames_for(&document, false);
        assert_eq!(frames[&0].meta.num_ecc, 0);
        frames.remove(&1);
        assert!(matches!(
            recover_document_payload(&frames),
            Err(DecodeError::InsufficientCodes { .. })
        ));
    }

    #[test]
    fn tampered_fragment_fails_the_checksum() {
        let document = DocumentPayload::new("tamper detection", None);
        let mut frames = frames_for(&document, false);
        frames.get_mut(&0).unwrap().doc_fragment[0] ^= 0x01;
        assert!(matches!(
            recover_document_payload(&frames),
            Err(DecodeError::ChecksumMismatch)
        ));
    }

    #[test]
    fn empty_document_is_a_single_data_code() {
        let document = DocumentPayload::new("", None);
        let frames = frames_for(&document, false);
        assert_eq!(frames.len(), 1);
        let recovered = recover_document_payload(&frames).unwrap();
        assert_eq!(recovered.content, "");
        assert_eq!(recovered.metadata, None);
    }

    #[test]
    fn options_default_shape() {
        let options = EncodeOptions::default();
        assert!(options.encode_ec_codes);
        assert_eq!(options.error_tolerance, ErrorTolerance::M);
    }
}
