/// Normalizes a locale-formatted count ("1.234 Fahrzeuge", " 47 ") to an
/// integer by keeping only ASCII digits. Absent, empty or digit-free text
/// yields 0, the same value a genuine empty result page produces. Digit runs
/// too long for `u64` saturate.
pub fn extract_count(raw: Option<&str>) -> u64 {
    let digits: String = raw
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    if digits.is_empty() {
        return 0;
    }

    digits.parse().unwrap_or_else(|_| {
        tracing::warn!("Count '{}' exceeds u64, saturating", digits);
        u64::MAX
    })
}
