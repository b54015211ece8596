pub mod json;
pub mod stdout;

/// Error samples kept per rule in rendered reports.
pub const MAX_REPORTED_SAMPLES: usize = 5;
