const UNITS: [(usize, &str); 3] = [(1_000_000_000, "B"), (1_000_000, "M"), (1_000, "K")];

/// Compact count: `4.5K`, `2.3M`. Values below a thousand print as is.
pub fn format_numbers(n: usize) -> String {
    UNITS
        .iter()
        .find(|(scale, _)| n >= *scale)
        .map(|(scale, suffix)| format!("{:.1}{}", n as f64 / *scale as f64, suffix))
        .unwrap_or_else(|| n.to_string())
}

pub fn format_percent(rate: f64) -> String {
    format!("{:.2}%", rate)
}
