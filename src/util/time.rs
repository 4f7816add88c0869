use chrono::{DateTime, Local};

/// Local wall-clock time
pub fn now() -> DateTime<Local> {
    Local::now()
}

/// Timestamp used in generated filenames, e.g. `20260316-142501`
pub fn filename_timestamp(at: &DateTime<Local>) -> String {
    at.format("%Y%m%d-%H%M%S").to_string()
}

/// Calendar date printed in document headers
pub fn header_date(at: &DateTime<Local>) -> String {
    at.format("%Y-%m-%d").to_string()
}
