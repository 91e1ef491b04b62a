/// Formats an offset in hours as `UTC+H` or `UTC±H:MM` when it is not a whole hour.
pub fn format_utc_offset(hours: f64) -> String {
    let sign = if hours < 0.0 { '-' } else { '+' };
    let total_minutes = (hours.abs() * 60.0).round() as i64;
    let (h, m) = (total_minutes / 60, total_minutes % 60);

    if m == 0 {
        format!("UTC{}{}", sign, h)
    } else {
        format!("UTC{}{}:{:02}", sign, h, m)
    }
}

/// Human-readable region of a tzid: its last path segment with underscores as spaces.
pub fn region_name(tzid: &str) -> String {
    tzid.rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(tzid)
        .replace('_', " ")
}

pub fn display_name(tzid: &str, offset_hours: f64) -> String {
    format!("{} ({})", region_name(tzid), format_utc_offset(offset_hours))
}
