// Bridge output parsers
// Both parsers tolerate noise: lines they do not understand are skipped, never errors.

use crate::domain::{AttachedDevice, BridgeState, DeviceRecord, DeviceState, Serial};
use regex::Regex;
use std::sync::LazyLock;

/// First line of the bridge's device listing; everything above it is daemon chatter
pub const LISTING_HEADER: &str = "List of devices";

/// Substring a listing line must contain to pass the `Ready` filter
pub const READY_MARKER: &str = "device";

pub const MODEL_PROPERTY: &str = "ro.product.model";
pub const NAME_PROPERTY: &str = "ro.product.name";

static PROPERTY_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(?<key>.*)\]: \[(?<value>.*)\]").expect("property pattern is valid")
});

/// Which listing entries become device records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeviceFilter {
    /// Only lines containing "device"; unauthorized and offline entries are dropped
    #[default]
    Ready,
    /// Every entry after the header, whatever the bridge state
    All,
}

/// Non-blank lines after the listing header
fn listing_entries(lines: &[String]) -> Vec<&str> {
    let mut in_listing = false;
    let mut entries = Vec::new();

    for line in lines {
        if line.starts_with(LISTING_HEADER) {
            in_listing = true;
            continue;
        }
        if !in_listing || line.trim().is_empty() {
            continue;
        }
        entries.push(line.as_str());
    }

    entries
}

fn serial_field(entry: &str) -> &str {
    entry.split('\t').next().unwrap_or(entry)
}

/// Parse every entry of a `devices` listing, whatever its state
pub fn parse_device_list(lines: &[String]) -> Vec<AttachedDevice> {
    listing_entries(lines)
        .into_iter()
        .map(|entry| {
            let mut fields = entry.split('\t');
            let serial = fields.next().unwrap_or(entry);
            let state = BridgeState::parse(fields.next().unwrap_or(""));
            AttachedDevice::new(serial, state)
        })
        .collect()
}

/// Serials selected from a `devices` listing, in listing order
pub fn select_serials(lines: &[String], filter: DeviceFilter) -> Vec<Serial> {
    listing_entries(lines)
        .into_iter()
        .filter(|entry| match filter {
            DeviceFilter::Ready => entry.contains(READY_MARKER),
            DeviceFilter::All => true,
        })
        .map(|entry| serial_field(entry).to_string())
        .collect()
}

/// Split a `[key]: [value]` property line
pub fn parse_property_line(line: &str) -> Option<(&str, &str)> {
    let caps = PROPERTY_LINE.captures(line)?;
    let key = caps.name("key")?.as_str();
    let value = caps.name("value")?.as_str();
    Some((key, value))
}

/// Build a record from a property dump
///
/// Any parsed line marks the device Online; zero parsed lines leave it Offline.
pub fn parse_properties(serial: &str, lines: &[String]) -> DeviceRecord {
    let mut record = DeviceRecord::new(serial);

    for (key, value) in lines.iter().filter_map(|l| parse_property_line(l)) {
        record.state = DeviceState::Online;
        match key {
            MODEL_PROPERTY => record.model = value.to_string(),
            NAME_PROPERTY => record.name = value.to_string(),
            _ => {}
        }
    }

    record
}
