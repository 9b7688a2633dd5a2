/// Returns a simple timestamp string (Unix epoch seconds with Z suffix).
/// Used for session creation stamps in snapshots and logs.
pub fn timestamp_now() -> String {
    let dur = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}Z", dur.as_secs())
}
