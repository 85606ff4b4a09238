//! Detect and parse QR payloads in page images, with a deterministic blur
//! retry ladder for pages that scan poorly. Printer/scanner aliasing tends
//! to over-sharpen; a mild box blur recovers finder patterns the detector
//! otherwise misses.

use crate::models::{QrContent, QrMeta};
use image::{DynamicImage, GrayImage};
use imageproc::filter::box_filter;
use rayon::prelude::*;
use rxing::{
    common::HybridBinarizer,
    multi::{GenericMultipleBarcodeReader, MultipleBarcodeReader},
    BarcodeFormat, BinaryBitmap, BufferedImageLuminanceSource,
    DecodeHintType::{POSSIBLE_FORMATS, TRY_HARDER},
    DecodeHintValue::{PossibleFormats, TryHarder},
};
use std::collections::HashMap;
use tracing::{debug, warn};

const BLUR_RADII: [u32; 3] = [2, 3, 4];

pub(crate) struct ScanOutcome {
    /// Parsed frames, keyed by sequence number; first decode wins.
    pub contents: HashMap<u32, QrContent>,
    /// QR symbols detected across all passes, including unparseable ones.
    pub symbols_seen: usize,
}

/// Decode QR payloads from a set of page images on a bounded worker pool.
/// When the initial pass does not yield enough frames to reconstruct the
/// document, each blur radius is applied once and then a second time over
/// every page, re-scanning after each application.
pub(crate) fn extract_qr_contents(images: &[GrayImage]) -> std::io::Result<ScanOutcome> {
    let mut outcome = ScanOutcome {
        contents: HashMap::new(),
        symbols_seen: 0,
    };
    if images.is_empty() {
        return Ok(outcome);
    }

    let worker_count = std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or_else(|e| {
            debug!("failed to get cpu count for worker pool: {e}");
            10.min(images.len())
        });
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .build()
        .map_err(std::io::Error::other)?;

    debug!(
        images = images.len(),
        worker_count, "decoding QR codes from page images"
    );
    run_decode_pass(&pool, images, &mut outcome);
    if sufficient_decodes(&outcome.contents) {
        return Ok(outcome);
    }

    warn!("not enough QR codes decoded; attempting image enhancement");
    for radius in BLUR_RADII {
        let blurred: Vec<GrayImage> = images
            .iter()
            .map(|image| box_filter(image, radius, radius))
            .collect();
        run_decode_pass(&pool, &blurred, &mut outcome);
        if sufficient_decodes(&outcome.contents) {
            break;
        }

        let double_blurred: Vec<GrayImage> = blurred
            .iter()
            .map(|image| box_filter(image, radius, radius))
            .collect();
        run_decode_pass(&pool, &double_blurred, &mut outcome);
        if sufficient_decodes(&outcome.contents) {
            break;
        }
    }
    debug!(
        decoded = outcome.contents.len(),
        "total QR codes decoded after image enhancement"
    );
    Ok(outcome)
}

/// Scan every image on the pool, then merge the results single-threaded.
fn run_decode_pass(pool: &rayon::ThreadPool, images: &[GrayImage], outcome: &mut ScanOutcome) {
    let decoded: Vec<Vec<Vec<u8>>> = pool.install(|| images.par_iter().map(scan_image).collect());
    for payload in decoded.into_iter().flatten() {
        outcome.symbols_seen += 1;
        let content = match QrContent::from_b85_bytes(&payload) {
            Ok(content) => content,
            Err(_) => {
                warn!("could not read QR payload; treating code as missing");
                continue;
            }
        };
        let reference: Option<QrMeta> = outcome.contents.values().next().map(|c| c.meta);
        if let Some(reference) = reference {
            let meta = content.meta;
            if (meta.document_hash, meta.total_qr_codes, meta.num_ecc)
                != (
                    reference.document_hash,
                    reference.total_qr_codes,
                    reference.num_ecc,
                )
            {
                warn!(
                    sequence_number = meta.sequence_number,
                    "QR metadata disagrees with previously scanned codes; skipping"
                );
                continue;
            }
        }
        outcome
            .contents
            .entry(content.meta.sequence_number)
            .or_insert(content);
    }
}

/// Find all QR symbols in one image and return their raw byte payloads.
/// A detector miss is an empty result, not an error.
fn scan_image(image: &GrayImage) -> Vec<Vec<u8>> {
    let bitmap = &mut BinaryBitmap::new(HybridBinarizer::new(BufferedImageLuminanceSource::new(
        DynamicImage::ImageLuma8(image.clone()),
    )));
    let reader = rxing::MultiUseMultiFormatReader::default();
    let mut scanner = GenericMultipleBarcodeReader::new(reader);
    match scanner.decode_multiple_with_hints(
        bitmap,
        &rxing::DecodingHintDictionary::from([
            (
                POSSIBLE_FORMATS,
                PossibleFormats(vec![BarcodeFormat::QR_CODE].into_iter().collect()),
            ),
            (TRY_HARDER, TryHarder(true)),
        ]),
    ) {
        Ok(results) => results
            .iter()
            .map(|result| result.getText().as_bytes().to_vec())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Whether the frames collected so far are enough to reconstruct the
/// document: at least `total_qr_codes - num_ecc` distinct sequence numbers.
pub(crate) fn sufficient_decodes(contents: &HashMap<u32, QrContent>) -> bool {
    match contents.values().next() {
        Some(first) => {
            let required = first.meta.total_qr_codes - first.meta.num_ecc;
            contents.len() >= required as usize
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(sequence_number: u32, total: u32, num_ecc: u32) -> QrContent {
        QrContent {
            meta: QrMeta {
                document_hash: 7,
                sequence_number,
                total_qr_codes: total,
                num_ecc,
            },
            doc_fragment: vec![sequence_number as u8; 4],
        }
    }

    #[test]
    fn sufficiency_accounts_for_parity() {
        let mut contents = HashMap::new();
        assert!(!sufficient_decodes(&contents));
        contents.insert(0, frame(0, 3, 1));
        assert!(!sufficient_decodes(&contents));
        contents.insert(2, frame(2, 3, 1));
        assert!(sufficient_decodes(&contents));
    }

    #[test]
    fn blank_images_yield_no_symbols() {
        let blank = GrayImage::from_pixel(64, 64, image::Luma([255u8]));
        assert!(scan_image(&blank).is_empty());
    }
}
