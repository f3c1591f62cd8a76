use crate::error::{ChartError, RangeError, TimeSignatureError};
use crate::types::event::{Tick, TimeSignatureEvent, Timed, check_tick};
use crate::types::time_signature::TimeSignature;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarSegment {
    pub start_tick: Tick,
    pub start_bar: u64,
    pub bar_length: Tick,
    pub signature: TimeSignature,
}

impl BarSegment {
    fn bars_until(&self, tick: Tick) -> u64 {
        (tick - self.start_tick) / self.bar_length
    }
}

/// Bar index (0-based) and tick offset inside that bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BarPosition {
    pub bar: u64,
    pub offset: Tick,
}

impl BarPosition {
    pub fn new(bar: u64, offset: Tick) -> Self {
        Self { bar, offset }
    }

    pub fn is_bar_line(&self) -> bool {
        self.offset == 0
    }
}

impl fmt::Display for BarPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&format!("{:03}:{}", self.bar, self.offset))
    }
}

/// Splits the tick axis into one segment per time signature. Every change sits
/// on a bar line of the signature before it, so bar numbering is contiguous.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarIndexResolver {
    ticks_per_beat: u32,
    segments: Vec<BarSegment>,
}

impl BarIndexResolver {
    /// `events` must be sorted by tick. When there is no event at tick 0 a 4/4
    /// segment covers the start of the axis, and the first real event is
    /// checked against it like any other change.
    pub fn new(ticks_per_beat: u32, events: &[TimeSignatureEvent]) -> Result<Self, ChartError> {
        if ticks_per_beat == 0 {
            return Err(RangeError::TicksPerBeat(0).into());
        }

        let mut segments: Vec<BarSegment> = Vec::with_capacity(events.len() + 1);

        if events.first().is_none_or(|e| e.tick() != 0) {
            segments.push(BarSegment {
                start_tick: 0,
                start_bar: 0,
                bar_length: ticks_per_beat as u64 * 4,
                signature: TimeSignature::FOUR_FOUR,
            });
        }

        for event in events {
            let tick = event.tick();
            let signature = event.signature();
            let bar_length = signature
                .bar_ticks(ticks_per_beat)
                .ok_or(TimeSignatureError::FractionalBar { tick })?;

            let start_bar = match segments.last() {
                None => 0,
                Some(prev) => {
                    if tick == prev.start_tick {
                        return Err(TimeSignatureError::Duplicate { tick }.into());
                    }
                    let delta = tick
                        .checked_sub(prev.start_tick)
                        .filter(|delta| delta % prev.bar_length == 0)
                        .ok_or(TimeSignatureError::Misaligned { tick })?;
                    prev.start_bar + delta / prev.bar_length
                }
            };

            segments.push(BarSegment {
                start_tick: tick,
                start_bar,
                bar_length,
                signature,
            });
        }

        debug!(
            ticks_per_beat,
            segments = segments.len(),
            "built bar index"
        );

        Ok(Self {
            ticks_per_beat,
            segments,
        })
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    pub fn segments(&self) -> &[BarSegment] {
        &self.segments
    }

    fn segment_at(&self, tick: Tick) -> &BarSegment {
        // segments[0] starts at tick 0, so the index is at least 1
        let idx = self.segments.partition_point(|s| s.start_tick <= tick);
        &self.segments[idx - 1]
    }

    fn segment_of_bar(&self, bar: u64) -> &BarSegment {
        let idx = self.segments.partition_point(|s| s.start_bar <= bar);
        &self.segments[idx - 1]
    }

    /// Bar position of a tick that is already known to be valid.
    pub fn position(&self, tick: Tick) -> BarPosition {
        let segment = self.segment_at(tick);
        BarPosition {
            bar: segment.start_bar + segment.bars_until(tick),
            offset: (tick - segment.start_tick) % segment.bar_length,
        }
    }

    pub fn resolve(&self, tick: i64) -> Result<BarPosition, RangeError> {
        Ok(self.position(check_tick(tick)?))
    }

    /// First tick of a bar, or `None` if it lies beyond the tick range.
    pub fn bar_start(&self, bar: u64) -> Option<Tick> {
        let segment = self.segment_of_bar(bar);
        (bar - segment.start_bar)
            .checked_mul(segment.bar_length)
            .and_then(|ticks| ticks.checked_add(segment.start_tick))
    }

    pub fn tick_of(&self, bar: i64) -> Result<Tick, RangeError> {
        let index = u64::try_from(bar).map_err(|_| RangeError::Bar(bar))?;
        self.bar_start(index).ok_or(RangeError::Bar(bar))
    }

    /// Absolute tick of a bar position. The offset may exceed the bar length.
    pub fn tick_at(&self, position: BarPosition) -> Option<Tick> {
        self.bar_start(position.bar)
            .and_then(|start| start.checked_add(position.offset))
    }

    pub fn signature_at(&self, tick: Tick) -> TimeSignature {
        self.segment_at(tick).signature
    }

    pub fn bar_length_at(&self, tick: Tick) -> Tick {
        self.segment_at(tick).bar_length
    }

    pub fn is_bar_line(&self, tick: Tick) -> bool {
        self.position(tick).is_bar_line()
    }

    /// Bar-line ticks in the half-open range `from..to`.
    pub fn bar_lines(&self, from: Tick, to: Tick) -> impl Iterator<Item = Tick> + '_ {
        let position = self.position(from);
        let first = if position.is_bar_line() {
            Some(from)
        } else {
            self.bar_start(position.bar + 1)
        };

        std::iter::successors(first, move |tick| {
            tick.checked_add(self.bar_length_at(*tick))
        })
        .take_while(move |tick| *tick < to)
    }
}
