//! Script number encoding.
//!
//! Numbers on the script stack are little-endian magnitudes with the sign
//! carried in the most significant bit of the last byte. Zero is the empty
//! byte string. Contract constructor arguments (goals, expiry times) and ABI
//! function selectors are encoded this way.

use crate::ScriptError;

/// Largest encoding the engine produces or accepts: `i64` magnitudes plus a
/// sign byte.
pub const MAX_NUMBER_LEN: usize = 9;

/// Encode an integer as a minimally-encoded script number.
///
/// # Arguments
/// * `value` - The integer to encode.
///
/// # Returns
/// The little-endian sign-magnitude bytes; empty for zero.
pub fn encode_number(value: i64) -> Vec<u8> {
    if value == 0 {
        return Vec::new();
    }

    let negative = value < 0;
    let mut magnitude = value.unsigned_abs();
    let mut out = Vec::with_capacity(MAX_NUMBER_LEN);
    while magnitude > 0 {
        out.push((magnitude & 0xff) as u8);
        magnitude >>= 8;
    }

    // The top byte's high bit is the sign; add a byte if it is already used.
    let last = out.len() - 1;
    if out[last] & 0x80 != 0 {
        out.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        out[last] |= 0x80;
    }
    out
}

/// Decode a script number, requiring minimal encoding.
///
/// # Arguments
/// * `bytes` - The encoded number.
/// * `max_len` - Maximum permitted encoded length.
///
/// # Returns
/// The decoded value, or an error if the encoding is too long, non-minimal,
/// or does not fit in an `i64`.
pub fn decode_number(bytes: &[u8], max_len: usize) -> Result<i64, ScriptError> {
    if bytes.len() > max_len.min(MAX_NUMBER_LEN) {
        return Err(ScriptError::NumberTooBig(bytes.len()));
    }
    check_minimal(bytes)?;
    let Some((&top, rest)) = bytes.split_last() else {
        return Ok(0);
    };

    let negative = top & 0x80 != 0;
    let mut magnitude: u64 = 0;
    for (i, &b) in rest.iter().enumerate() {
        magnitude |= u64::from(b) << (8 * i);
    }
    let top = u64::from(top & 0x7f);
    if rest.len() == 8 {
        if top != 0 {
            return Err(ScriptError::NumberTooBig(bytes.len()));
        }
    } else {
        magnitude |= top << (8 * rest.len());
    }

    if negative {
        if magnitude > i64::MAX as u64 + 1 {
            return Err(ScriptError::NumberTooBig(bytes.len()));
        }
        Ok((magnitude as i128).wrapping_neg() as i64)
    } else {
        i64::try_from(magnitude).map_err(|_| ScriptError::NumberTooBig(bytes.len()))
    }
}

/// Reject encodings with a redundant trailing zero or sign byte.
fn check_minimal(bytes: &[u8]) -> Result<(), ScriptError> {
    let Some(&last) = bytes.last() else {
        return Ok(());
    };
    if last & 0x7f == 0 && (bytes.len() == 1 || bytes[bytes.len() - 2] & 0x80 == 0) {
        return Err(ScriptError::NonMinimalNumber(hex::encode(bytes)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Known encodings of values around the sign-bit boundaries.
    #[test]
    fn test_encode_number_vectors() {
        let vectors: &[(i64, &str)] = &[
            (0, ""),
            (1, "01"),
            (-1, "81"),
            (16, "10"),
            (127, "7f"),
            (-127, "ff"),
            (128, "8000"),
            (-128, "8080"),
            (255, "ff00"),
            (256, "0001"),
            (-256, "0081"),
            (1000, "e803"),
            (32767, "ff7f"),
            (32768, "008000"),
            (2147483647, "ffffff7f"),
            (-2147483647, "ffffffff"),
            (2147483648, "0000008000"),
            (1_700_000_000, "00f15365"),
            (i64::MAX, "ffffffffffffff7f"),
        ];
        for (value, expected) in vectors {
            assert_eq!(hex::encode(encode_number(*value)), *expected, "value {}", value);
            let decoded = decode_number(&encode_number(*value), MAX_NUMBER_LEN).expect("decodes");
            assert_eq!(decoded, *value);
        }
    }

    #[test]
    fn test_decode_number_extremes() {
        let min = encode_number(i64::MIN);
        assert_eq!(hex::encode(&min), "000000000000008080");
        assert_eq!(decode_number(&min, MAX_NUMBER_LEN).expect("decodes"), i64::MIN);
        assert!(decode_number(&hex::decode("000000000000008000").expect("hex"), 9).is_err());
    }

    #[test]
    fn test_decode_number_rejects_non_minimal() {
        for bad in ["00", "80", "0100", "0180", "ff0000"] {
            let bytes = hex::decode(bad).expect("hex");
            assert!(
                matches!(decode_number(&bytes, 9), Err(ScriptError::NonMinimalNumber(_))),
                "{} should be rejected",
                bad
            );
        }
        // A trailing zero is needed when the previous byte has its high bit set.
        assert_eq!(decode_number(&hex::decode("ff00").expect("hex"), 9).expect("ok"), 255);
    }

    #[test]
    fn test_decode_number_length_limit() {
        let bytes = encode_number(2147483648);
        assert!(matches!(decode_number(&bytes, 4), Err(ScriptError::NumberTooBig(5))));
        assert!(decode_number(&bytes, 5).is_ok());
    }
}
