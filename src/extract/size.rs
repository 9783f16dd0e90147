/// Binary units accepted in human readable sizes, smallest first
const UNITS: [(&str, u64); 6] = [
    ("B", 1),
    ("KiB", 1 << 10),
    ("MiB", 1 << 20),
    ("GiB", 1 << 30),
    ("TiB", 1 << 40),
    ("PiB", 1 << 50),
];

/// Converts a size such as `"1.5 GiB"` or `"(700 MiB)"` into bytes
///
/// Units are matched case-insensitively. Returns `None` when no number
/// followed by a known unit is found.
pub fn parse_size_to_bytes(size: &str) -> Option<u64> {
    let trimmed = size.trim().trim_start_matches('(').trim_end_matches(')').trim();

    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let value: f64 = number.parse().ok()?;
    let unit = unit.trim();
    let multiplier = UNITS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(unit))
        .map(|(_, multiplier)| *multiplier)?;

    Some((value * multiplier as f64).round() as u64)
}
