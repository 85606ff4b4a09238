use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;

/// Strip trailing null bytes. Recovered chunk sets carry the tail padding
/// added during splitting; both sides of the pipeline must hash the
/// stripped form so the fingerprint survives reconstruction.
pub fn strip_trailing_nulls(data: &[u8]) -> &[u8] {
    let end = data
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |pos| pos + 1);
    &data[..end]
}

/// SHAKE-256 fingerprint of a compressed document: 8 bytes of output,
/// interpreted big-endian. Duplicated into every QR of the document as its
/// cross-code identifier and end-to-end integrity check.
pub fn document_fingerprint(compressed: &[u8]) -> u64 {
    let mut hasher = Shake256::default();
    hasher.update(strip_trailing_nulls(compressed));
    let mut reader = hasher.finalize_xof();
    let mut digest = [0u8; 8];
    reader.read(&mut digest);
    u64::from_be_bytes(digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_only_trailing_nulls() {
        assert_eq!(strip_trailing_nulls(b"\0abc\0\0"), b"\0abc");
        assert_eq!(strip_trailing_nulls(b"abc"), b"abc");
        assert_eq!(strip_trailing_nulls(b"\0\0"), b"");
        assert_eq!(strip_trailing_nulls(b""), b"");
    }

    #[test]
    fn distinct_inputs_distinct_fingerprints() {
        assert_ne!(
            document_fingerprint(b"first document"),
            document_fingerprint(b"second document")
        );
    }

    proptest! {
        #[test]
        fn stable_under_tail_padding(
            data in proptest::collection::vec(any::<u8>(), 0..256),
            pad in 0usize..32,
        ) {
            let mut padded = data.clone();
            padded.resize(data.len() + pad, 0);
            prop_assert_eq!(document_fingerprint(&data), document_fingerprint(&padded));
        }
    }
}
