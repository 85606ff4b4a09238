//! Cross-code erasure layer: Reed-Solomon over GF(256) applied across the
//! document fragments. Each fragment is one shard, so the math runs
//! column-by-column over fragment bytes and tolerates whole missing QR
//! codes, complementing the module-level error correction inside each
//! symbol.
//!
//! A shard group is capped at [`GROUP_SIZE`] fragments, the field's
//! operating limit. Documents with more data fragments than one group can
//! hold are split into consecutive groups, each followed by its own parity
//! fragments, so the protection ratio holds at any document size.

use crate::error::{DecodeError, EncodeError};
use reed_solomon_erasure::galois_8::ReedSolomon;

/// Most fragments (data plus parity) one Reed-Solomon group can span.
pub(crate) const GROUP_SIZE: usize = 256;

/// Extend data fragments with `num_ecc` parity fragments per group,
/// returning the full emitted sequence: each group's data fragments
/// followed by its parity fragments. All fragments must share one length;
/// parity fragments come back with that same length.
pub fn encode_with_parity(
    fragments: Vec<Vec<u8>>,
    num_ecc: usize,
) -> Result<Vec<Vec<u8>>, EncodeError> {
    let fragment_len = match fragments.first() {
        Some(first) if !first.is_empty() => first.len(),
        _ => return Err(EncodeError::EccFailed("no fragment data".into())),
    };
    let group_data_len = GROUP_SIZE
        .checked_sub(num_ecc)
        .filter(|&len| len > 0)
        .ok_or_else(|| {
            EncodeError::EccFailed(format!(
                "cannot fit {num_ecc} parity fragments in a {GROUP_SIZE}-fragment group"
            ))
        })?;

    let group_count = fragments.len().div_ceil(group_data_len);
    let mut out = Vec::with_capacity(fragments.len() + group_count * num_ecc);
    for group in fragments.chunks(group_data_len) {
        let rs = ReedSolomon::new(group.len(), num_ecc)
            .map_err(|e| EncodeError::EccFailed(e.to_string()))?;
        let mut shards = group.to_vec();
        shards.extend(std::iter::repeat_with(|| vec![0u8; fragment_len]).take(num_ecc));
        rs.encode(&mut shards)
            .map_err(|e| EncodeError::EccFailed(e.to_string()))?;
        out.extend(shards);
    }
    Ok(out)
}

/// Recover the data fragments from a partial shard sequence laid out by
/// [`encode_with_parity`]. `None` entries are erasures at known positions;
/// recovery is guaranteed while no group loses more fragments than its
/// parity count.
pub fn reconstruct(
    shards: Vec<Option<Vec<u8>>>,
    num_ecc: usize,
) -> Result<Vec<Vec<u8>>, DecodeError> {
    let mut data = Vec::new();
    let mut remaining = shards.into_iter();
    loop {
        let mut group: Vec<Option<Vec<u8>>> = remaining.by_ref().take(GROUP_SIZE).collect();
        if group.is_empty() {
            break;
        }
        let group_data_len = group
            .len()
            .checked_sub(num_ecc)
            .filter(|&len| len > 0)
            .ok_or_else(|| {
                DecodeError::UnrecoverableLoss("invalid error-correction geometry".into())
            })?;
        let rs = ReedSolomon::new(group_data_len, num_ecc)
            .map_err(|e| DecodeError::UnrecoverableLoss(e.to_string()))?;
        rs.reconstruct(&mut group)
            .map_err(|e| DecodeError::UnrecoverableLoss(e.to_string()))?;
        data.extend(group.into_iter().take(group_data_len).flatten());
    }
    Ok(data)
}
