/// Utility functions for formatting timestamps
use time::macros::format_description;
use time::OffsetDateTime;

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(&format).unwrap_or_else(|_| dt.to_string())
}

/// Timestamp embedded in export file names: YYYY_MM_DD_HH_MM_SS_mmm
pub fn export_file_stamp(dt: &OffsetDateTime) -> String {
    let format = format_description!(
        "[year]_[month]_[day]_[hour]_[minute]_[second]_[subsecond digits:3]"
    );
    match dt.format(&format) {
        Ok(stamp) => stamp,
        Err(_) => dt.unix_timestamp().to_string(),
    }
}
