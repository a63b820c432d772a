//! Time formatting shared by the daemon and `srctl`.

/// Formats seconds as `m:ss`; anything non-finite renders as `0:00`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn format_time(time: f64) -> String {
    if !time.is_finite() || time < 0.0 {
        return "0:00".to_string();
    }
    let total = time.floor() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}
