//! Splitting a compressed document into the fixed-length fragments that
//! become individual QR payloads.

use crate::consts;
use crate::models::ErrorTolerance;
use crate::wire;

/// Number of document bytes that fit in one QR code at the given error
/// tolerance: the byte capacity of a version-[`consts::QR_SIZE`] symbol,
/// minus the reserved frame overhead, scaled down by 4/5 for base-85
/// inflation.
pub fn chunk_size(error_tolerance: ErrorTolerance) -> usize {
    let capacity = consts::qr_capacity(consts::QR_SIZE, error_tolerance.column());
    let payload_room = capacity - wire::reserved_frame_len();
    payload_room / 5 * 4
}

/// Split `content` into fragments of exactly `maximum_length` bytes, null
/// padding the tail of the final fragment. Equal-length fragments are
/// required for generating error-correction codes.
///
/// A document that fits in a single fragment is returned unpadded.
pub fn split_fragments(content: &[u8], maximum_length: usize) -> Vec<Vec<u8>> {
    if content.len() <= maximum_length {
        return vec![content.to_vec()];
    }
    let mut fragments: Vec<Vec<u8>> = content
        .chunks(maximum_length)
        .map(|fragment| fragment.to_vec())
        .collect();
    if let Some(last) = fragments.last_mut() {
        last.resize(maximum_length, 0);
    }
    fragments
}
