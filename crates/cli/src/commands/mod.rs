// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
pub mod inspect;
pub mod proof;
pub mod timeline;
pub mod verify;

/// Renders a logical time (seconds since the epoch) for display.
pub(crate) fn render_time(secs: u64) -> String {
    chrono::DateTime::from_timestamp(secs as i64, 0)
        .unwrap_or_default()
        .to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}
