use anyhow::Result;
use anyhow::anyhow;
use std::fmt;
use std::str::FromStr;

/// Signed decimal using fixed-point units (six fractional digits)
#[derive(Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash, Default)]
pub struct Decimal {
    repr: i64,
}

impl Decimal {
    /// Number of decimal digits kept after the point.
    pub const FRAC_DIGITS: u32 = 6;
    /// The number of units in `1.0` (10^6).
    pub const SCALE: i64 = 10i64.pow(Self::FRAC_DIGITS);

    pub const ZERO: Self = Self { repr: 0 };
    pub const ONE: Self = Self { repr: Self::SCALE };

    pub const fn from_units(units: i64) -> Self {
        Self { repr: units }
    }

    /// Saturates at the representable range.
    pub(crate) const fn from_int(value: i64) -> Self {
        Self {
            repr: value.saturating_mul(Self::SCALE),
        }
    }

    pub const fn units(&self) -> i64 {
        self.repr
    }

    pub fn is_positive(&self) -> bool {
        self.repr > 0
    }

    /// Integer part, truncated toward zero.
    pub fn trunc(&self) -> i64 {
        self.repr / Self::SCALE
    }

    fn frac_units(&self) -> u64 {
        (self.repr % Self::SCALE).unsigned_abs()
    }

    /// Returns `numerator / self`, rounded to the nearest integer.
    /// `None` when `self` is not positive or the result does not fit.
    pub fn divide_into(&self, numerator: u64) -> Option<u64> {
        if self.repr <= 0 {
            return None;
        }
        let scaled = numerator as u128 * Self::SCALE as u128;
        let divisor = self.repr as u128;
        let quotient = (scaled + divisor / 2) / divisor;
        u64::try_from(quotient).ok()
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.repr < 0 { "-" } else { "" };
        let whole = (self.repr / Self::SCALE).unsigned_abs();

        let mut frac = format!("{:06}", self.frac_units());
        while frac.ends_with('0') {
            frac.pop();
            if frac.is_empty() {
                frac.push('0');
                break;
            }
        }
        f.pad(&format!("{}{}.{}", sign, whole, frac))
    }
}

impl fmt::Debug for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decimal({})", self)
    }
}

impl FromStr for Decimal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || anyhow!("Invalid decimal: {}", s);

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };

        let mut parts = body.splitn(2, '.');
        let whole_str = parts.next().ok_or_else(invalid)?;
        let frac_str = parts.next().unwrap_or("");

        if whole_str.is_empty() && frac_str.is_empty() {
            return Err(invalid());
        }
        if !whole_str.chars().all(|c| c.is_ascii_digit())
            || !frac_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }
        if frac_str.len() > Self::FRAC_DIGITS as usize {
            return Err(anyhow!(
                "Too many fractional digits (max {}): {}",
                Self::FRAC_DIGITS,
                s
            ));
        }

        let whole: i64 = if whole_str.is_empty() {
            0
        } else {
            whole_str.parse().map_err(|_e| invalid())?
        };
        let frac: i64 = if frac_str.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac_str, width = Self::FRAC_DIGITS as usize);
            padded.parse().map_err(|_e| invalid())?
        };

        let units = whole
            .checked_mul(Self::SCALE)
            .and_then(|w| w.checked_add(frac))
            .ok_or_else(|| anyhow!("Decimal out of range: {}", s))?;

        Ok(Self::from_units(if negative { -units } else { units }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parsing() {
        let value: Decimal = "187.5".parse().unwrap();
        assert_eq!(value.units(), 187_500_000);
        assert_eq!(value.to_string(), "187.5");

        assert_eq!("0".parse::<Decimal>().unwrap().to_string(), "0.0");
        assert_eq!("120".parse::<Decimal>().unwrap().to_string(), "120.0");
        assert_eq!("0.000".parse::<Decimal>().unwrap().to_string(), "0.0");
        assert_eq!(" 0.75 ".parse::<Decimal>().unwrap().to_string(), "0.75");
        assert_eq!(".5".parse::<Decimal>().unwrap().to_string(), "0.5");
        assert_eq!("-0.5".parse::<Decimal>().unwrap().to_string(), "-0.5");
        assert_eq!("-2".parse::<Decimal>().unwrap().to_string(), "-2.0");
        assert_eq!("+1.25".parse::<Decimal>().unwrap().to_string(), "1.25");
        assert_eq!(
            "0.000001".parse::<Decimal>().unwrap().to_string(),
            "0.000001"
        );
    }

    #[test]
    fn test_parse_error() {
        assert!("".parse::<Decimal>().is_err());
        assert!(".".parse::<Decimal>().is_err());
        assert!("-".parse::<Decimal>().is_err());
        assert!("1.2.3".parse::<Decimal>().is_err());
        assert!("0x5".parse::<Decimal>().is_err());
        assert!("1e5".parse::<Decimal>().is_err());
        assert!("1. 2".parse::<Decimal>().is_err());
        assert!("1,2".parse::<Decimal>().is_err());
        assert!("--1".parse::<Decimal>().is_err());
        assert!("0.0000001".parse::<Decimal>().is_err());
        assert!("99999999999999999999".parse::<Decimal>().is_err());
    }

    #[test]
    fn test_compare() {
        let a: Decimal = "1.5".parse().unwrap();
        let b: Decimal = "0.25".parse().unwrap();
        assert!(a > b);
        assert!("-1.25".parse::<Decimal>().unwrap() < Decimal::ZERO);
        assert!(Decimal::ONE.is_positive());
        assert!(!Decimal::ZERO.is_positive());
        assert_eq!("-3.7".parse::<Decimal>().unwrap().trunc(), -3);
    }

    #[test]
    fn test_from_int_saturates() {
        assert_eq!(Decimal::from_int(7).units(), 7_000_000);
        assert_eq!(Decimal::from_int(i64::MAX).units(), i64::MAX);
        assert_eq!(Decimal::from_int(i64::MIN).units(), i64::MIN);
    }

    #[test]
    fn test_divide_into() {
        let bpm: Decimal = "120".parse().unwrap();
        assert_eq!(bpm.divide_into(60_000_000), Some(500_000));

        let bpm: Decimal = "140".parse().unwrap();
        assert_eq!(bpm.divide_into(60_000_000), Some(428_571));

        assert_eq!(Decimal::ZERO.divide_into(60_000_000), None);
        assert_eq!(Decimal::from_int(-1).divide_into(60_000_000), None);
    }
}
