use minijinja::Value;
use time::{
    OffsetDateTime,
    format_description::{BorrowedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

const DISPLAY_FORMAT: &[BorrowedFormatItem<'static>] = format_description!(
    "[year]-[month]-[day] [hour]:[minute]:[second] [offset_hour sign:mandatory]:[offset_minute]"
);

/// A minijinja template filter for showing a stored RFC 3339 timestamp in a
/// friendlier form. Anything that doesn't parse is shown unchanged.
pub(crate) fn format_timestamp(value: &str) -> String {
    OffsetDateTime::parse(value, &Rfc3339)
        .ok()
        .and_then(|dt| dt.format(DISPLAY_FORMAT).ok())
        .unwrap_or_else(|| value.to_string())
}

/// A minijinja template filter for showing a coordinate with a fixed number of
/// decimal places. Coordinates that clients sent as text are shown as-is.
pub(crate) fn format_coordinate(value: Value, places: Option<usize>) -> String {
    let places = places.unwrap_or(6);
    match f64::try_from(value.clone()) {
        Ok(n) => format!("{n:.places$}"),
        Err(_) => value.to_string(),
    }
}

#[test]
fn test_format_timestamp() {
    assert_eq!(
        format_timestamp("2025-06-11T09:30:05.123456+09:00"),
        "2025-06-11 09:30:05 +09:00"
    );
    assert_eq!(
        format_timestamp("2025-06-11T00:30:05Z"),
        "2025-06-11 00:30:05 +00:00"
    );
    assert_eq!(format_timestamp("yesterday"), "yesterday");
}

#[test]
fn test_format_coordinate() {
    assert_eq!(format_coordinate(Value::from(37.5665), None), "37.566500");
    assert_eq!(format_coordinate(Value::from(127), Some(2)), "127.00");
    assert_eq!(format_coordinate(Value::from("37.5N"), None), "37.5N");
}
