//! Human-readable formatting for sizes and progress.

const BYTE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Format a byte count with 1024-based units and up to two decimals.
///
/// Trailing zeros are dropped, so `2048` renders as `"2 KB"` and `1536`
/// as `"1.5 KB"`.
pub fn format_bytes(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < BYTE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let rendered = format!("{value:.2}");
    let trimmed = rendered.trim_end_matches('0').trim_end_matches('.');
    format!("{trimmed} {}", BYTE_UNITS[unit])
}

/// Format a `[0, 1]` progress fraction as a percentage with a fixed
/// number of fractional digits.
pub fn format_progress(progress: f64, digits: usize) -> String {
    let percent = if progress.is_finite() {
        progress.clamp(0.0, 1.0) * 100.0
    } else {
        0.0
    };
    format!("{percent:.digits$}%")
}
