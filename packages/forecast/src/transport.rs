//! Transport encoding used to pass a forecast table through automation
//! systems that cannot carry raw CSV or `=` characters.
//!
//! The table is base64-encoded with the standard alphabet and the trailing
//! padding is stripped. Decoding restores the padding before decoding.

use std::io::Cursor;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::ForecastError;

/// Decodes a padding-stripped base64 forecast table into a seekable text
/// stream.
///
/// # Errors
///
/// Returns [`ForecastError::Decode`] if the input cannot be padded to a
/// multiple of four characters, is not valid base64, or decodes to bytes
/// that are not ASCII.
pub fn decode_forecast_text(encoded: &str) -> Result<Cursor<String>, ForecastError> {
    let trimmed = encoded.trim().trim_end_matches('=');

    let padding = match trimmed.len() % 4 {
        0 => "",
        2 => "==",
        3 => "=",
        _ => {
            return Err(ForecastError::Decode {
                message: format!(
                    "encoded length {} cannot be padded to a multiple of 4",
                    trimmed.len()
                ),
            });
        }
    };

    let bytes = STANDARD
        .decode(format!("{trimmed}{padding}"))
        .map_err(|e| ForecastError::Decode {
            message: e.to_string(),
        })?;

    if let Some(offset) = bytes.iter().position(|b| !b.is_ascii()) {
        return Err(ForecastError::Decode {
            message: format!("decoded byte at offset {offset} is not ASCII"),
        });
    }

    let text = String::from_utf8(bytes).map_err(|e| ForecastError::Decode {
        message: e.to_string(),
    })?;

    log::debug!("Decoded forecast table ({} bytes)", text.len());

    Ok(Cursor::new(text))
}

/// Encodes a raw forecast table the way the upstream transport does:
/// standard base64 with the padding stripped.
#[must_use]
pub fn encode_forecast_text(raw: &str) -> String {
    let mut encoded = STANDARD.encode(raw.as_bytes());
    let unpadded_len = encoded.trim_end_matches('=').len();
    encoded.truncate(unpadded_len);
    encoded
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;

    fn decode_to_string(encoded: &str) -> String {
        let mut out = String::new();
        decode_forecast_text(encoded)
            .unwrap()
            .read_to_string(&mut out)
            .unwrap();
        out
    }

    #[test]
    fn round_trips_every_padding_length() {
        for raw in ["a", "ab", "abc", "abcd", "baseTime=2024-02-10T06:00:00Z\n"] {
            let encoded = encode_forecast_text(raw);
            assert!(!encoded.ends_with('='), "{encoded}");
            assert_eq!(decode_to_string(&encoded), raw);
        }
    }

    #[test]
    fn round_trips_fixture_table() {
        let raw = include_str!("../fixtures/forecast_lola.csv");
        assert_eq!(decode_to_string(&encode_forecast_text(raw)), raw);
    }

    #[test]
    fn accepts_input_that_still_has_padding() {
        assert_eq!(decode_to_string("YWI="), "ab");
        assert_eq!(decode_to_string("YWI"), "ab");
    }

    #[test]
    fn rejects_unpaddable_length() {
        let err = decode_forecast_text("YWJjZ").unwrap_err();
        assert!(matches!(err, ForecastError::Decode { .. }), "{err}");
    }

    #[test]
    fn rejects_invalid_alphabet() {
        assert!(matches!(
            decode_forecast_text("YW*j"),
            Err(ForecastError::Decode { .. })
        ));
    }

    #[test]
    fn rejects_non_ascii_payload() {
        let encoded = STANDARD.encode("Lola é".as_bytes());
        let err = decode_forecast_text(&encoded).unwrap_err();
        assert!(err.to_string().contains("offset 5"), "{err}");
    }
}
