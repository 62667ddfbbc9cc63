use std::borrow::Cow;
use std::io::{self, Write};

use chrono::{DateTime, Local, SecondsFormat, Utc};

use crate::domain::entities::device::Channel;
use crate::domain::entities::sample::ChannelValue;

/// Column suffixes written for every channel, in order.
pub const VALUE_COLUMNS: [&str; 3] = ["Temperature (C)", "Voltage (V)", "Resistance"];

/// Quote a field if it contains a delimiter, quote or line break.
#[must_use]
pub fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

/// Join fields into one CSV line, without the trailing newline.
#[must_use]
pub fn join_row<S: AsRef<str>>(fields: &[S]) -> String {
    fields
        .iter()
        .map(|f| escape(f.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Write one CSV line, including the trailing newline.
///
/// # Errors
///
/// Returns any I/O error from the sink.
pub fn write_row<W: Write + ?Sized, S: AsRef<str>>(sink: &mut W, fields: &[S]) -> io::Result<()> {
    writeln!(sink, "{}", join_row(fields))
}

#[must_use]
pub fn format_time(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Local wall-clock stamp used in file names.
#[must_use]
pub fn file_stamp(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d_%H-%M-%S")
        .to_string()
}

/// Header cells for one channel, prefixed with `prefix` (e.g. device and label).
#[must_use]
pub fn channel_headers(prefix: &str) -> Vec<String> {
    VALUE_COLUMNS
        .iter()
        .map(|suffix| format!("{prefix} {suffix}"))
        .collect()
}

/// Header cells for a channel in a single-device file.
#[must_use]
pub fn label_headers(channel: &Channel) -> Vec<String> {
    channel_headers(&channel.label)
}

/// Value cells for one channel; a missing value yields empty cells.
#[must_use]
pub fn value_cells(value: Option<ChannelValue>) -> [String; 3] {
    value.map_or_else(
        || [String::new(), String::new(), String::new()],
        |v| {
            [
                v.temperature.to_string(),
                v.voltage.to_string(),
                v.resistance.to_string(),
            ]
        },
    )
}

/// Make a device id safe to embed in a file name.
#[must_use]
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
