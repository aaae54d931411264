//! Money is carried as signed integers in minor units (poisha).
//!
//! 1 BDT = 100 poisha. Display formatting converts back to major units
//! with two decimal places and the currency glyph.

/// Currency tag stamped on every expense record.
pub const CURRENCY: &str = "BDT";

/// Minor units per major unit.
pub const MINOR_PER_MAJOR: i64 = 100;

/// Convert a major-unit amount to minor units, rounding to the nearest.
pub fn to_minor(major: f64) -> i64 {
    (major * MINOR_PER_MAJOR as f64).round() as i64
}

/// Convert minor units back to a major-unit amount.
pub fn from_minor(minor: i64) -> f64 {
    minor as f64 / MINOR_PER_MAJOR as f64
}

/// Format a minor-unit amount for display, e.g. `৳ 1234.56`.
pub fn format_minor(minor: i64) -> String {
    format!("৳ {:.2}", from_minor(minor))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_whole_amounts() {
        assert_eq!(to_minor(3000.0), 300_000);
        assert_eq!(from_minor(300_000), 3000.0);
    }

    #[test]
    fn rounds_fractional_major_amounts() {
        assert_eq!(to_minor(12.345), 1235);
        assert_eq!(to_minor(12.344), 1234);
    }

    #[test]
    fn formats_with_glyph_and_two_decimals() {
        assert_eq!(format_minor(123_456), "৳ 1234.56");
        assert_eq!(format_minor(-500), "৳ -5.00");
        assert_eq!(format_minor(0), "৳ 0.00");
    }
}
