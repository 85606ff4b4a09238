//! Generate QR PDFs from source documents.

mod layout;
mod render;

use crate::chunk;
use crate::consts;
use crate::ecc;
use crate::error::EncodeError;
use crate::fingerprint;
use crate::models::{DocumentPayload, ErrorTolerance, QrContent, QrMeta};
use chardetng::EncodingDetector;
use qrcode::QrCode;
use rayon::prelude::*;
use std::io::Write;
use tracing::{debug, warn};

/// Sequence numbers are recorded as 32-bit uints.
const N_MAX_QRS: u64 = 1 << 32;

/// Knobs for [`encode_qr_pdf`]. The defaults match the common case: the
/// cross-code error-correction layer on, medium per-symbol tolerance.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Text to include as header and footer of the QR PDF.
    pub header_text: String,
    /// JSON-encodable data carried alongside the document contents.
    pub metadata: Option<serde_json::Value>,
    /// Name of the original file or document, used to label the output.
    pub document_name: Option<String>,
    /// Whether to include additional error-correcting QR codes. These are
    /// what lets a document survive individual codes failing to scan.
    pub encode_ec_codes: bool,
    /// Error correction level of the individual QR codes.
    pub error_tolerance: ErrorTolerance,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            header_text: String::new(),
            metadata: None,
            document_name: None,
            encode_ec_codes: true,
            error_tolerance: ErrorTolerance::M,
        }
    }
}

/// Convert a plaintext document to a PDF carrying it as a grid of QR
/// codes, returned as bytes.
pub fn encode_qr_pdf(content: &str, options: &EncodeOptions) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    encode_qr_pdf_to_writer(content, options, &mut buf)?;
    Ok(buf)
}

/// As [`encode_qr_pdf`], writing the PDF to a sink instead of returning
/// bytes.
pub fn encode_qr_pdf_to_writer<W: Write>(
    content: &str,
    options: &EncodeOptions,
    mut writer: W,
) -> Result<(), EncodeError> {
    let document = DocumentPayload::new(content, options.metadata.clone());
    let payloads =
        generate_qr_payloads(&document, options.encode_ec_codes, options.error_tolerance)?;
    let codes = generate_qr_codes(&payloads, options.error_tolerance)?;
    render::write_pdf(codes, options, &document.content, &mut writer)
}

/// Extract text contents from binary file data. With `encoding` set, the
/// named label is used; otherwise the charset is autodetected.
pub fn document_content_from_bytes(
    data: &[u8],
    encoding: Option<&str>,
) -> Result<String, EncodeError> {
    match encoding {
        None => {
            let mut detector = EncodingDetector::new();
            detector.feed(data, true);
            let detected = detector.guess(None, true);
            let (content, _, malformed) = detected.decode(data);
            if malformed {
                return Err(EncodeError::EncodingDetection);
            }
            debug!(encoding = detected.name(), "decoded file contents");
            Ok(content.into_owned())
        }
        Some(label) => {
            let encoding = encoding_rs::Encoding::for_label(label.as_bytes())
                .ok_or_else(|| EncodeError::UnsupportedEncoding(label.to_string()))?;
            let (content, _, malformed) = encoding.decode(data);
            if malformed {
                return Err(EncodeError::UnsupportedEncoding(label.to_string()));
            }
            Ok(content.into_owned())
        }
    }
}

/// Construct the base-85 encoded payloads that become QR codes: compress,
/// fingerprint, split, extend with parity fragments, and frame.
pub fn generate_qr_payloads(
    document: &DocumentPayload,
    encode_ec_codes: bool,
    error_tolerance: ErrorTolerance,
) -> Result<Vec<Vec<u8>>, EncodeError> {
    let compressed = document.to_compressed_bytes()?;
    let document_hash = fingerprint::document_fingerprint(&compressed);
    debug!(
        compressed_len = compressed.len(),
        document_hash, "generating QR code payloads"
    );

    let mut fragments = chunk::split_fragments(&compressed, chunk::chunk_size(error_tolerance));
    let num_ecc = if encode_ec_codes {
        parity_count(fragments.len())
    } else {
        0
    };
    let projected = projected_total(fragments.len(), num_ecc);
    ensure_code_count(projected)?;
    if num_ecc > 0 && projected > 256 {
        warn!(
            total_qr_codes = projected,
            "input requires more than 256 QR codes to encode; error-correction processing will be significantly longer"
        );
    }

    if num_ecc > 0 {
        debug!(num_ecc, "constructing error correction QR codes");
        fragments = ecc::encode_with_parity(fragments, num_ecc)?;
    }

    let total_qr_codes = fragments.len() as u32;
    Ok(fragments
        .into_iter()
        .enumerate()
        .map(|(sequence_number, doc_fragment)| {
            QrContent {
                meta: QrMeta {
                    document_hash,
                    sequence_number: sequence_number as u32,
                    total_qr_codes,
                    num_ecc: num_ecc as u32,
                },
                doc_fragment,
            }
            .to_b85_bytes()
        })
        .collect())
}

/// Parity fragments per Reed-Solomon group for `num_data` data fragments.
/// The codec groups at 256 fragments, so the proportion is applied per 256
/// at most.
fn parity_count(num_data: usize) -> usize {
    let proportion = consts::EC_CODE_PROPORTION;
    let max_ecc = (256.0 * proportion / (1.0 + proportion)).ceil() as usize;
    max_ecc.min((num_data as f64 * proportion).ceil() as usize)
}

/// Total fragments the emitted sequence will hold: every group of data
/// fragments carries its own parity tail.
fn projected_total(num_data: usize, num_ecc: usize) -> u64 {
    if num_ecc == 0 {
        return num_data as u64;
    }
    let groups = num_data.div_ceil(ecc::GROUP_SIZE - num_ecc) as u64;
    num_data as u64 + groups * num_ecc as u64
}

fn ensure_code_count(projected: u64) -> Result<(), EncodeError> {
    if projected >= N_MAX_QRS {
        return Err(EncodeError::TooManyCodes(projected));
    }
    Ok(())
}

/// Build the QR symbols for a list of ASCII payloads. The symbol version is
/// fitted per payload; equal-length payloads come out at equal versions.
pub fn generate_qr_codes(
    payloads: &[Vec<u8>],
    error_tolerance: ErrorTolerance,
) -> Result<Vec<QrCode>, EncodeError> {
    payloads
        .par_iter()
        .map(|payload| {
            QrCode::with_error_correction_level(payload, error_tolerance.ec_level())
                .map_err(EncodeError::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::QR_SIZE;

    /// Letter soup that does not compress away, so multi-fragment paths
    /// are actually exercised.
    fn incompressible_text(len: usize) -> String {
        let mut x: u64 = 12345;
        (0..len)
            .map(|_| {
                x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
                char::from(b'a' + ((x >> 57) % 26) as u8)
            })
            .collect()
    }

    #[test]
    fn parity_proportion() {
        assert_eq!(parity_count(1), 1);
        assert_eq!(parity_count(10), 2);
        assert_eq!(parity_count(100), 20);
        // The per-group cap holds from here on out.
        assert_eq!(parity_count(213), 43);
        assert_eq!(parity_count(250), 43);
        assert_eq!(parity_count(10_000), 43);
    }

    #[test]
    fn projected_totals_account_for_parity_groups() {
        assert_eq!(projected_total(5, 0), 5);
        assert_eq!(projected_total(5, 1), 6);
        // 213 data fragments fill exactly one 256-fragment group.
        assert_eq!(projected_total(213, 43), 256);
        assert_eq!(projected_total(214, 43), 214 + 2 * 43);
        assert_eq!(projected_total(500, 43), 500 + 3 * 43);
    }

    #[test]
    fn code_count_guard() {
        assert!(ensure_code_count((1 << 32) - 1).is_ok());
        assert!(matches!(
            ensure_code_count(1 << 32),
            Err(EncodeError::TooManyCodes(_))
        ));
    }

    #[test]
    fn sequence_numbers_cover_the_payload_set() {
        let document = DocumentPayload::new(incompressible_text(4000), None);
        let payloads = generate_qr_payloads(&document, true, ErrorTolerance::M).unwrap();
        let frames: Vec<QrContent> = payloads
            .iter()
            .map(|p| QrContent::from_b85_bytes(p).unwrap())
            .collect();
        let total = frames[0].meta.total_qr_codes;
        assert_eq!(frames.len(), total as usize);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame.meta.sequence_number, i as u32);
            assert_eq!(frame.meta.total_qr_codes, total);
            assert_eq!(frame.meta.num_ecc, frames[0].meta.num_ecc);
            assert_eq!(frame.meta.document_hash, frames[0].meta.document_hash);
        }
    }

    #[test]
    fn payload_generation_is_deterministic() {
        let document = DocumentPayload::new(
            "determinism",
            Some(serde_json::json!({"b": 2, "a": [1, 2, 3]})),
        );
        let first = generate_qr_payloads(&document, true, ErrorTolerance::Q).unwrap();
        let second = generate_qr_payloads(&document, true, ErrorTolerance::Q).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn fragments_share_length_when_parity_is_present() {
        let document = DocumentPayload::new(incompressible_text(4000), None);
        let payloads = generate_qr_payloads(&document, true, ErrorTolerance::M).unwrap();
        let frames: Vec<QrContent> = payloads
            .iter()
            .map(|p| QrContent::from_b85_bytes(p).unwrap())
            .collect();
        assert!(frames[0].meta.num_ecc > 0);
        let len = frames[0].doc_fragment.len();
        assert!(frames.iter().all(|f| f.doc_fragment.len() == len));
    }

    #[test]
    fn generated_codes_stay_within_the_budgeted_version() {
        let document = DocumentPayload::new(incompressible_text(6000), None);
        let payloads = generate_qr_payloads(&document, true, ErrorTolerance::M).unwrap();
        let codes = generate_qr_codes(&payloads, ErrorTolerance::M).unwrap();
        for code in codes {
            assert!(code.width() <= (17 + 4 * QR_SIZE) as usize);
        }
    }

    #[test]
    fn charset_autodetection_recovers_cyrillic() {
        let original = "Съешь же ещё этих мягких французских булок, да выпей чаю";
        let (encoded, _, _) = encoding_rs::WINDOWS_1251.encode(original);
        assert_eq!(
            document_content_from_bytes(&encoded, None).unwrap(),
            original
        );
        assert_eq!(
            document_content_from_bytes(&encoded, Some("cp1251")).unwrap(),
            original
        );
    }

    #[test]
    fn named_encoding_must_exist_and_fit() {
        assert!(matches!(
            document_content_from_bytes(b"abc", Some("no-such-charset")),
            Err(EncodeError::UnsupportedEncoding(_))
        ));
    }
}
