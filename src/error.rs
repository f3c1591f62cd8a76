use crate::types::decimal::Decimal;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChartError>;

/// A value violates its sign or positivity constraint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("tick must be non-negative, got {0}")]
    Tick(i64),

    #[error("bar index must be non-negative, got {0}")]
    Bar(i64),

    #[error("time signature numerator must be at least 1, got {0}")]
    Numerator(i64),

    #[error("time signature denominator exponent must be non-negative, got {0}")]
    DenominatorExponent(i64),

    #[error("tempo must be positive, got {0} bpm")]
    Bpm(Decimal),

    #[error("ticks per beat must be positive, got {0}")]
    TicksPerBeat(i64),

    #[error("no item at index {index} (collection has {len})")]
    Index { index: usize, len: usize },
}

/// A time signature change the bar resolver cannot segment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeSignatureError {
    /// The change does not fall on a bar line of the signature it replaces.
    #[error("time signature at tick {tick} is not on a bar boundary")]
    Misaligned { tick: u64 },

    #[error("more than one time signature at tick {tick}")]
    Duplicate { tick: u64 },

    /// The bar length is not a whole number of ticks at this resolution.
    #[error("time signature at tick {tick} has a bar length that is not a whole number of ticks")]
    FractionalBar { tick: u64 },
}

impl TimeSignatureError {
    pub fn tick(&self) -> u64 {
        match self {
            TimeSignatureError::Misaligned { tick }
            | TimeSignatureError::Duplicate { tick }
            | TimeSignatureError::FractionalBar { tick } => *tick,
        }
    }
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error(transparent)]
    Range(#[from] RangeError),

    #[error(transparent)]
    TimeSignature(#[from] TimeSignatureError),

    #[error("cancelled by user")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The target format cannot express something in the chart.
    #[error("{format}: {message}")]
    Format { format: String, message: String },
}

impl ChartError {
    pub fn format(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            format: format.into(),
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ChartError::Cancelled)
    }
}
