use crate::error::RangeError;
use anyhow::{Result, anyhow, bail};
use std::fmt;
use std::str::FromStr;

/// Meter as numerator over a power-of-two denominator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeSignature {
    numerator: u32,
    denominator_exponent: u32,
}

impl TimeSignature {
    pub const FOUR_FOUR: TimeSignature = TimeSignature {
        numerator: 4,
        denominator_exponent: 2,
    };

    pub fn new(numerator: i64, denominator_exponent: i64) -> Result<Self, RangeError> {
        let numerator = u32::try_from(numerator)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or(RangeError::Numerator(numerator))?;
        let denominator_exponent = u32::try_from(denominator_exponent)
            .map_err(|_| RangeError::DenominatorExponent(denominator_exponent))?;
        Ok(Self {
            numerator,
            denominator_exponent,
        })
    }

    pub fn numerator(&self) -> u32 {
        self.numerator
    }

    pub fn denominator_exponent(&self) -> u32 {
        self.denominator_exponent
    }

    /// `None` when `2^exponent` does not fit in 64 bits.
    pub fn denominator(&self) -> Option<u64> {
        1u64.checked_shl(self.denominator_exponent)
    }

    /// Bar length in ticks: `ticks_per_beat * 4 * numerator / denominator`.
    ///
    /// Returns `None` when that is not a positive whole number of ticks.
    pub fn bar_ticks(&self, ticks_per_beat: u32) -> Option<u64> {
        let whole_notes = ticks_per_beat as u128 * 4 * self.numerator as u128;
        if whole_notes == 0 || whole_notes.trailing_zeros() < self.denominator_exponent {
            return None;
        }
        u64::try_from(whole_notes >> self.denominator_exponent)
            .ok()
            .filter(|ticks| *ticks > 0)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::FOUR_FOUR
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.denominator() {
            Some(denominator) => write!(f, "{}/{}", self.numerator, denominator),
            None => write!(f, "{}/2^{}", self.numerator, self.denominator_exponent),
        }
    }
}

impl FromStr for TimeSignature {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (num_str, den_str) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| anyhow!("Invalid time signature \"{}\", expected N/D", s))?;

        let numerator: i64 = num_str
            .parse()
            .map_err(|_| anyhow!("Invalid time signature numerator \"{}\"", num_str))?;

        let exponent = if let Some(exp_str) = den_str.strip_prefix("2^") {
            exp_str
                .parse::<i64>()
                .map_err(|_| anyhow!("Invalid time signature denominator \"{}\"", den_str))?
        } else {
            let denominator: u64 = den_str
                .parse()
                .map_err(|_| anyhow!("Invalid time signature denominator \"{}\"", den_str))?;
            if !denominator.is_power_of_two() {
                bail!(
                    "Time signature denominator must be a power of two, got {}",
                    denominator
                );
            }
            denominator.trailing_zeros() as i64
        };

        Ok(Self::new(numerator, exponent)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new() {
        let sig = TimeSignature::new(3, 2).unwrap();
        assert_eq!(sig.numerator(), 3);
        assert_eq!(sig.denominator(), Some(4));

        assert_eq!(TimeSignature::new(0, 2), Err(RangeError::Numerator(0)));
        assert_eq!(TimeSignature::new(-3, 2), Err(RangeError::Numerator(-3)));
        assert_eq!(
            TimeSignature::new(4, -1),
            Err(RangeError::DenominatorExponent(-1))
        );
    }

    #[test]
    fn test_bar_ticks() {
        assert_eq!(TimeSignature::FOUR_FOUR.bar_ticks(480), Some(1920));
        assert_eq!(TimeSignature::new(3, 2).unwrap().bar_ticks(480), Some(1440));
        assert_eq!(TimeSignature::new(7, 3).unwrap().bar_ticks(480), Some(1680));
        assert_eq!(TimeSignature::new(2, 1).unwrap().bar_ticks(480), Some(1920));
        assert_eq!(TimeSignature::new(1, 0).unwrap().bar_ticks(480), Some(1920));
        // 1920 / 1024 is not a whole number of ticks
        assert_eq!(TimeSignature::new(1, 10).unwrap().bar_ticks(480), None);
        assert_eq!(TimeSignature::new(1, 200).unwrap().bar_ticks(480), None);
        assert_eq!(TimeSignature::FOUR_FOUR.bar_ticks(0), None);
    }

    #[test]
    fn test_parse_and_display() {
        let sig: TimeSignature = "6/8".parse().unwrap();
        assert_eq!(sig.numerator(), 6);
        assert_eq!(sig.denominator_exponent(), 3);
        assert_eq!(sig.to_string(), "6/8");

        assert_eq!("4/4".parse::<TimeSignature>().unwrap(), TimeSignature::FOUR_FOUR);
        assert_eq!("4/2^2".parse::<TimeSignature>().unwrap(), TimeSignature::FOUR_FOUR);
        assert_eq!(TimeSignature::new(1, 70).unwrap().to_string(), "1/2^70");

        assert!("4/3".parse::<TimeSignature>().is_err());
        assert!("0/4".parse::<TimeSignature>().is_err());
        assert!("4".parse::<TimeSignature>().is_err());
        assert!("a/4".parse::<TimeSignature>().is_err());
        assert!("4/0".parse::<TimeSignature>().is_err());
    }
}
