//! Property-based test generators using proptest.

use proptest::prelude::*;
use tablesync_codec::CellValue;

/// Strategy for short printable text.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Za-z0-9 ,.-]{1,24}").expect("Invalid regex")
}

/// Strategy for finite, non-zero numbers (zero reads back as null).
pub fn number_strategy() -> impl Strategy<Value = f64> {
    prop_oneof![(-1.0e9f64..-1.0e-3), (1.0e-3f64..1.0e9)]
}

/// Strategy for ISO-8601 dates, with and without a time part.
pub fn date_strategy() -> impl Strategy<Value = String> {
    (2000u32..2100, 1u32..=12, 1u32..=28, prop::option::of((0u32..24, 0u32..60))).prop_map(
        |(year, month, day, time)| match time {
            Some((hour, minute)) => {
                format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:00.000+00:00")
            }
            None => format!("{year:04}-{month:02}-{day:02}"),
        },
    )
}

/// Strategy for any cell value.
pub fn cell_value() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        Just(CellValue::Null),
        text_strategy().prop_map(CellValue::Text),
        number_strategy().prop_map(CellValue::Number),
        date_strategy().prop_map(CellValue::Date),
    ]
}
