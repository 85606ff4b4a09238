//! Base-85 codec using the RFC 1924 alphabet, compatible with the `b85`
//! family of encoders: each 4-byte group maps to 5 printable characters, a
//! short final group of n bytes maps to n + 1 characters.

const ALPHABET: &[u8; 85] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz!#$%&()*+-;<=>?@^_`{|}~";

const INVALID: u8 = 0xff;

const DECODE_MAP: [u8; 256] = {
    let mut map = [INVALID; 256];
    let mut i = 0;
    while i < ALPHABET.len() {
        map[ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    map
};

/// A byte string that does not parse as base-85.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct B85Error;

pub fn encode(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len().div_ceil(4) * 5);
    for group in data.chunks(4) {
        let mut word = [0u8; 4];
        word[..group.len()].copy_from_slice(group);
        let mut value = u32::from_be_bytes(word);
        let mut digits = [0u8; 5];
        for digit in digits.iter_mut().rev() {
            *digit = ALPHABET[(value % 85) as usize];
            value /= 85;
        }
        out.extend_from_slice(&digits[..group.len() + 1]);
    }
    out
}

pub fn decode(data: &[u8]) -> Result<Vec<u8>, B85Error> {
    let mut out = Vec::with_capacity(data.len() / 5 * 4 + 4);
    for group in data.chunks(5) {
        if group.len() == 1 {
            return Err(B85Error);
        }
        // Short groups decode as if padded with the maximum digit.
        let mut value: u64 = 0;
        for i in 0..5 {
            let digit = match group.get(i) {
                Some(&c) => DECODE_MAP[c as usize],
                None => 84,
            };
            if digit == INVALID {
                return Err(B85Error);
            }
            value = value * 85 + digit as u64;
        }
        if value > u32::MAX as u64 {
            return Err(B85Error);
        }
        let word = (value as u32).to_be_bytes();
        out.extend_from_slice(&word[..group.len() - 1]);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn known_vectors() {
        // Matches python `base64.b85encode`.
        assert_eq!(encode(b""), b"");
        assert_eq!(encode(b"hello"), b"Xk~0{Zv");
        assert_eq!(decode(b"Xk~0{Zv").unwrap(), b"hello");
    }

    #[test]
    fn tail_lengths() {
        for len in 0..9 {
            let data: Vec<u8> = (0..len as u8).collect();
            let encoded = encode(&data);
            let expected = if len % 4 == 0 {
                len / 4 * 5
            } else {
                len / 4 * 5 + len % 4 + 1
            };
            assert_eq!(encoded.len(), expected);
            assert_eq!(decode(&encoded).unwrap(), data);
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode(b" ").is_err());
        assert!(decode(b"\"1234").is_err());
        assert!(decode(b"~~~~~").is_err()); // group value overflows 32 bits
        assert!(decode(b"X").is_err()); // 1-char tail is unrepresentable
    }

    proptest! {
        #[test]
        fn round_trips(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(decode(&encode(&data)).unwrap(), data);
        }

        #[test]
        fn output_is_printable_ascii(data in proptest::collection::vec(any::<u8>(), 0..128)) {
            prop_assert!(encode(&data).iter().all(|c| c.is_ascii_graphic()));
        }
    }
}
