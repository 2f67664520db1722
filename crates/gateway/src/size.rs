//! Human-readable byte counts.

use serde::{Deserialize, Serialize};

const DECIMAL_LABELS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
const BINARY_LABELS: [&str; 5] = ["Bytes", "KiB", "MiB", "GiB", "TiB"];

/// Default number of fractional digits.
pub const DEFAULT_DECIMALS: u32 = 2;

/// Which family of unit prefixes to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    /// Powers of 1000: KB, MB, ...
    Decimal,
    /// Powers of 1024: KiB, MiB, ...
    #[default]
    Binary,
}

impl UnitSystem {
    /// Pick the unit system from the `use_binary_prefix` flag.
    pub fn from_binary_flag(use_binary_prefix: bool) -> Self {
        if use_binary_prefix {
            Self::Binary
        } else {
            Self::Decimal
        }
    }

    pub fn base(self) -> u64 {
        match self {
            Self::Decimal => 1000,
            Self::Binary => 1024,
        }
    }

    pub fn labels(self) -> &'static [&'static str; 5] {
        match self {
            Self::Decimal => &DECIMAL_LABELS,
            Self::Binary => &BINARY_LABELS,
        }
    }
}

/// A byte count tagged with the unit system to render it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize {
    pub bytes: i64,
    pub units: UnitSystem,
}

impl ByteSize {
    pub fn new(bytes: i64, units: UnitSystem) -> Self {
        Self { bytes, units }
    }

    /// Render with `decimals` fractional digits, trailing zeros dropped.
    pub fn format(&self, decimals: u32) -> String {
        format_bytes(self.bytes, decimals, self.units)
    }
}

impl std::fmt::Display for ByteSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format(DEFAULT_DECIMALS))
    }
}

/// Formatter bound to a configured unit system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SizeFormatter {
    units: UnitSystem,
}

impl SizeFormatter {
    pub fn new(units: UnitSystem) -> Self {
        Self { units }
    }

    pub fn units(&self) -> UnitSystem {
        self.units
    }

    /// Format with the default two decimals.
    pub fn format(&self, bytes: i64) -> String {
        format_bytes(bytes, DEFAULT_DECIMALS, self.units)
    }

    pub fn format_with(&self, bytes: i64, decimals: u32) -> String {
        format_bytes(bytes, decimals, self.units)
    }
}

/// Convert a byte count into `"<value> <unit>"`.
///
/// Non-positive counts render as `"0 Bytes"`. The unit is the largest power
/// of the base not exceeding `bytes`, capped at terabytes; the magnitude is
/// rounded half away from zero to `decimals` places and printed without
/// trailing zeros.
///
/// ```
/// use gateway::size::{format_bytes, UnitSystem};
///
/// assert_eq!(format_bytes(0, 2, UnitSystem::Binary), "0 Bytes");
/// assert_eq!(format_bytes(1024, 2, UnitSystem::Binary), "1 KiB");
/// assert_eq!(format_bytes(1024, 2, UnitSystem::Decimal), "1.02 KB");
/// ```
pub fn format_bytes(bytes: i64, decimals: u32, units: UnitSystem) -> String {
    let labels = units.labels();
    if bytes <= 0 {
        return format!("0 {}", labels[0]);
    }

    // Integer search for floor(log_base(bytes)) avoids float drift at exact
    // powers (log(1e6)/log(1e3) is not exactly 2.0).
    let base = units.base();
    let bytes = bytes as u64;
    let mut index = 0usize;
    let mut divisor = 1u64;
    while index + 1 < labels.len() {
        match divisor.checked_mul(base) {
            Some(next) if next <= bytes => {
                divisor = next;
                index += 1;
            }
            _ => break,
        }
    }

    let value = round_to(bytes as f64 / divisor as f64, decimals);
    format!("{} {}", trim_number(value, decimals), labels[index])
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals.min(15) as i32);
    (value * factor).round() / factor
}

fn trim_number(value: f64, decimals: u32) -> String {
    let text = format!("{:.*}", decimals.min(15) as usize, value);
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_and_negative() {
        assert_eq!(format_bytes(0, 2, UnitSystem::Binary), "0 Bytes");
        assert_eq!(format_bytes(0, 5, UnitSystem::Decimal), "0 Bytes");
        assert_eq!(format_bytes(-10, 2, UnitSystem::Binary), "0 Bytes");
    }

    #[test]
    fn test_kibibyte_vs_kilobyte() {
        assert_eq!(format_bytes(1024, 2, UnitSystem::Binary), "1 KiB");
        assert_eq!(format_bytes(1024, 2, UnitSystem::Decimal), "1.02 KB");
    }

    #[test]
    fn test_below_first_unit() {
        assert_eq!(format_bytes(1, 2, UnitSystem::Decimal), "1 Bytes");
        assert_eq!(format_bytes(999, 2, UnitSystem::Decimal), "999 Bytes");
        assert_eq!(format_bytes(1023, 2, UnitSystem::Binary), "1023 Bytes");
    }

    #[test]
    fn test_exact_powers() {
        assert_eq!(format_bytes(1_000_000, 2, UnitSystem::Decimal), "1 MB");
        assert_eq!(format_bytes(1_000_000_000, 2, UnitSystem::Decimal), "1 GB");
        assert_eq!(format_bytes(1 << 30, 2, UnitSystem::Binary), "1 GiB");
    }

    #[test]
    fn test_rounding_and_decimals() {
        assert_eq!(format_bytes(1536, 2, UnitSystem::Binary), "1.5 KiB");
        assert_eq!(format_bytes(1536, 0, UnitSystem::Binary), "2 KiB");
        assert_eq!(format_bytes(1_234_567, 3, UnitSystem::Decimal), "1.235 MB");
        assert_eq!(format_bytes(1_234_567, 1, UnitSystem::Decimal), "1.2 MB");
    }

    #[test]
    fn test_rounding_up_to_next_whole() {
        assert_eq!(format_bytes(1_999_999, 2, UnitSystem::Decimal), "2 MB");
    }

    #[test]
    fn test_clamped_to_largest_unit() {
        let two_pb = 2_000_000_000_000_000;
        assert_eq!(format_bytes(two_pb, 2, UnitSystem::Decimal), "2000 TB");
        assert_eq!(format_bytes(i64::MAX, 0, UnitSystem::Binary), "8388608 TiB");
    }

    #[test]
    fn test_formatter_uses_configured_units() {
        let formatter = SizeFormatter::new(UnitSystem::from_binary_flag(false));
        assert_eq!(formatter.units(), UnitSystem::Decimal);
        assert_eq!(formatter.format(2_500), "2.5 KB");
        assert_eq!(formatter.format_with(2_500, 0), "3 KB");
    }

    #[test]
    fn test_byte_size_display() {
        let size = ByteSize::new(4 * 1024 * 1024, UnitSystem::Binary);
        assert_eq!(size.to_string(), "4 MiB");
        assert_eq!(size.format(1), "4 MiB");
    }

    #[test]
    fn test_unit_system_serde_names() {
        let json = serde_json::to_string(&UnitSystem::Binary).unwrap();
        assert_eq!(json, r#""binary""#);
    }
}
