use crate::error::RangeError;
use crate::types::decimal::Decimal;
use crate::types::time_signature::TimeSignature;
use std::fmt;

/// Absolute position on the tick axis.
pub type Tick = u64;

pub const MICROS_PER_MINUTE: u64 = 60_000_000;

/// Validates a tick coming from the outside world.
pub fn check_tick(tick: i64) -> Result<Tick, RangeError> {
    u64::try_from(tick).map_err(|_| RangeError::Tick(tick))
}

/// Anything anchored to the tick axis.
///
/// `set_tick` rejects negative ticks and leaves the previous value in place.
pub trait Timed {
    fn tick(&self) -> Tick;
    fn set_tick(&mut self, tick: i64) -> Result<(), RangeError>;
}

/// Event kinds, declared in the order they are visited when they share a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    TimeSignature,
    Tempo,
    Speed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TempoEvent {
    tick: Tick,
    bpm: Decimal,
}

impl TempoEvent {
    pub fn new(tick: i64, bpm: Decimal) -> Result<Self, RangeError> {
        let tick = check_tick(tick)?;
        Ok(Self {
            tick,
            bpm: check_bpm(bpm)?,
        })
    }

    pub fn bpm(&self) -> Decimal {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: Decimal) -> Result<(), RangeError> {
        self.bpm = check_bpm(bpm)?;
        Ok(())
    }

    /// Length of one quarter beat in microseconds, rounded.
    pub fn micros_per_beat(&self) -> u64 {
        self.bpm
            .divide_into(MICROS_PER_MINUTE)
            .unwrap_or(u64::MAX)
    }
}

fn check_bpm(bpm: Decimal) -> Result<Decimal, RangeError> {
    if bpm.is_positive() {
        Ok(bpm)
    } else {
        Err(RangeError::Bpm(bpm))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSignatureEvent {
    tick: Tick,
    signature: TimeSignature,
}

impl TimeSignatureEvent {
    pub fn new(tick: i64, signature: TimeSignature) -> Result<Self, RangeError> {
        Ok(Self {
            tick: check_tick(tick)?,
            signature,
        })
    }

    pub fn from_parts(
        tick: i64,
        numerator: i64,
        denominator_exponent: i64,
    ) -> Result<Self, RangeError> {
        let tick = check_tick(tick)?;
        Ok(Self {
            tick,
            signature: TimeSignature::new(numerator, denominator_exponent)?,
        })
    }

    pub fn signature(&self) -> TimeSignature {
        self.signature
    }

    pub fn set_signature(&mut self, signature: TimeSignature) {
        self.signature = signature;
    }

    /// Changes both parts or neither.
    pub fn set_parts(
        &mut self,
        numerator: i64,
        denominator_exponent: i64,
    ) -> Result<(), RangeError> {
        self.signature = TimeSignature::new(numerator, denominator_exponent)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeedEvent {
    tick: Tick,
    ratio: Decimal,
    channel: i32, // opaque partition key
}

impl SpeedEvent {
    pub fn new(tick: i64, ratio: Decimal, channel: i32) -> Result<Self, RangeError> {
        Ok(Self {
            tick: check_tick(tick)?,
            ratio,
            channel,
        })
    }

    pub fn ratio(&self) -> Decimal {
        self.ratio
    }

    pub fn set_ratio(&mut self, ratio: Decimal) {
        self.ratio = ratio;
    }

    pub fn channel(&self) -> i32 {
        self.channel
    }

    pub fn set_channel(&mut self, channel: i32) {
        self.channel = channel;
    }
}

macro_rules! impl_timed {
    ($($ty:ty),*) => {
        $(
            impl Timed for $ty {
                fn tick(&self) -> Tick {
                    self.tick
                }

                fn set_tick(&mut self, tick: i64) -> Result<(), RangeError> {
                    self.tick = check_tick(tick)?;
                    Ok(())
                }
            }
        )*
    };
}

impl_timed!(TempoEvent, TimeSignatureEvent, SpeedEvent);

/// Closed set of timeline events.
#[derive(Debug, Clone, PartialEq)]
pub enum TimedEvent {
    Tempo(TempoEvent),
    TimeSignature(TimeSignatureEvent),
    Speed(SpeedEvent),
}

impl TimedEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TimedEvent::Tempo(_) => EventKind::Tempo,
            TimedEvent::TimeSignature(_) => EventKind::TimeSignature,
            TimedEvent::Speed(_) => EventKind::Speed,
        }
    }
}

impl Timed for TimedEvent {
    fn tick(&self) -> Tick {
        match self {
            TimedEvent::Tempo(e) => e.tick(),
            TimedEvent::TimeSignature(e) => e.tick(),
            TimedEvent::Speed(e) => e.tick(),
        }
    }

    fn set_tick(&mut self, tick: i64) -> Result<(), RangeError> {
        match self {
            TimedEvent::Tempo(e) => e.set_tick(tick),
            TimedEvent::TimeSignature(e) => e.set_tick(tick),
            TimedEvent::Speed(e) => e.set_tick(tick),
        }
    }
}

impl From<TempoEvent> for TimedEvent {
    fn from(event: TempoEvent) -> Self {
        TimedEvent::Tempo(event)
    }
}

impl From<TimeSignatureEvent> for TimedEvent {
    fn from(event: TimeSignatureEvent) -> Self {
        TimedEvent::TimeSignature(event)
    }
}

impl From<SpeedEvent> for TimedEvent {
    fn from(event: SpeedEvent) -> Self {
        TimedEvent::Speed(event)
    }
}

impl fmt::Display for TempoEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tempo {}", self.bpm)
    }
}

impl fmt::Display for TimeSignatureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timesig {}", self.signature)
    }
}

impl fmt::Display for SpeedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speed {} ch={}", self.ratio, self.channel)
    }
}

impl fmt::Display for TimedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimedEvent::Tempo(e) => write!(f, "{}", e),
            TimedEvent::TimeSignature(e) => write!(f, "{}", e),
            TimedEvent::Speed(e) => write!(f, "{}", e),
        }
    }
}
