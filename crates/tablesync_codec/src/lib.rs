//! # Tablesync Codec
//!
//! Bidirectional mapping between remote typed property payloads and local
//! cell values.
//!
//! Every remote column carries a type tag. The tag selects a [`FieldKind`],
//! and the kind knows how to read its raw payload into a [`CellValue`] and,
//! for the writable subset, how to wrap a [`CellValue`] back into a payload.
//!
//! ## Writable kinds
//!
//! - `number` is passed through
//! - `date` is wrapped as `{start, end: null, time_zone: null}`
//! - `rich_text` is wrapped as a single text run
//! - `status` is wrapped as a named option
//!
//! `formula` and `rollup` are computed and always rejected, before any
//! encoder lookup.
//!
//! ## Usage
//!
//! ```
//! use tablesync_codec::{decode, encode, CellValue};
//!
//! let raw = encode("rich_text", &CellValue::Text("hello".into())).unwrap();
//! assert_eq!(decode("rich_text", &raw).unwrap(), CellValue::Text("hello".into()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod kind;
mod value;

pub use error::{CodecError, CodecResult};
pub use kind::FieldKind;
pub use value::CellValue;

/// Decode a raw payload for the given type tag.
///
/// # Errors
///
/// See [`FieldKind::decode`].
pub fn decode(type_tag: &str, raw: &serde_json::Value) -> CodecResult<CellValue> {
    FieldKind::from_tag(type_tag).decode(raw)
}

/// Encode a local value for the given type tag.
///
/// # Errors
///
/// See [`FieldKind::encode`].
pub fn encode(type_tag: &str, value: &CellValue) -> CodecResult<serde_json::Value> {
    FieldKind::from_tag(type_tag).encode(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn roundtrip(tag: &str, value: CellValue) {
        let raw = encode(tag, &value).unwrap();
        let decoded = decode(tag, &raw).unwrap();
        assert_eq!(decoded, value, "tag {tag}");
    }

    #[test]
    fn roundtrip_number() {
        roundtrip("number", CellValue::Number(122.49));
        roundtrip("number", CellValue::Number(-3.0));
    }

    #[test]
    fn roundtrip_date() {
        roundtrip("date", CellValue::Date("2024-12-20".into()));
        roundtrip("date", CellValue::Date("2024-12-20T10:30:00.000+00:00".into()));
    }

    #[test]
    fn roundtrip_rich_text_and_status() {
        roundtrip("rich_text", CellValue::Text("change_description_132.49".into()));
        roundtrip("status", CellValue::Text("unpaid".into()));
    }

    #[test]
    fn roundtrip_nulls() {
        for tag in ["number", "date", "rich_text", "status"] {
            roundtrip(tag, CellValue::Null);
        }
    }

    #[test]
    fn unknown_tags_are_unsupported() {
        let err = decode("checkbox", &serde_json::json!(true)).unwrap_err();
        assert_eq!(err, CodecError::unsupported_type("checkbox"));
        let err = encode("checkbox", &CellValue::Text("x".into())).unwrap_err();
        assert!(err.is_skippable());
    }

    proptest! {
        #[test]
        fn prop_roundtrip_nonzero_numbers(n in -1.0e9f64..1.0e9f64) {
            prop_assume!(n != 0.0);
            let raw = encode("number", &CellValue::Number(n)).unwrap();
            prop_assert_eq!(decode("number", &raw).unwrap(), CellValue::Number(n));
        }

        #[test]
        fn prop_roundtrip_short_text(s in "[a-zA-Z0-9 _.-]{0,40}") {
            let value = CellValue::Text(s);
            let raw = encode("rich_text", &value).unwrap();
            prop_assert_eq!(decode("rich_text", &raw).unwrap(), value);
        }

        #[test]
        fn prop_roundtrip_dates(y in 1990u32..2100, m in 1u32..13, d in 1u32..29) {
            let value = CellValue::Date(format!("{y:04}-{m:02}-{d:02}"));
            let raw = encode("date", &value).unwrap();
            prop_assert_eq!(decode("date", &raw).unwrap(), value);
        }
    }
}
