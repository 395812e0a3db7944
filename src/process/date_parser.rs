use chrono::NaiveDate;

/// Fast parse of `"YYYYMMDD"` (the `ga:date` form), falling back to `"YYYY-MM-DD"`.
pub fn parse_report_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let b = s.as_bytes();
    let (year, month, day) = match b.len() {
        8 if b.iter().all(u8::is_ascii_digit) => (s.get(0..4)?, s.get(4..6)?, s.get(6..8)?),
        10 if b[4] == b'-' && b[7] == b'-' => (s.get(0..4)?, s.get(5..7)?, s.get(8..10)?),
        _ => return None,
    };
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    let day: u32 = day.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}
