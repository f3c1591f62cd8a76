use crate::types::decimal::Decimal;
use crate::types::event::{MICROS_PER_MINUTE, TempoEvent, Tick, Timed};

pub const DEFAULT_BPM: Decimal = Decimal::from_int(120);

#[derive(Debug, Clone, Copy, PartialEq)]
struct TempoPoint {
    tick: Tick,
    micros: u64,
    bpm: Decimal,
    micros_per_beat: u64,
}

/// Tick to wall-clock conversion over a score's tempo changes.
///
/// Before the first tempo event the chart plays at 120 bpm. When several
/// tempo events share a tick the last one wins.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    ticks_per_beat: u32,
    points: Vec<TempoPoint>,
}

impl TempoMap {
    pub fn new(ticks_per_beat: u32, tempos: &[TempoEvent]) -> Self {
        let ticks_per_beat = ticks_per_beat.max(1);
        let default_mpb = DEFAULT_BPM.divide_into(MICROS_PER_MINUTE).unwrap_or(500_000);
        let mut points = vec![TempoPoint {
            tick: 0,
            micros: 0,
            bpm: DEFAULT_BPM,
            micros_per_beat: default_mpb,
        }];

        for tempo in tempos {
            let Some(prev) = points.last().copied() else {
                break;
            };
            let tick = tempo.tick().max(prev.tick);
            let point = TempoPoint {
                tick,
                micros: prev
                    .micros
                    .saturating_add(span_micros(tick - prev.tick, prev.micros_per_beat, ticks_per_beat)),
                bpm: tempo.bpm(),
                micros_per_beat: tempo.micros_per_beat(),
            };
            if tick == prev.tick {
                points.pop();
            }
            points.push(point);
        }

        Self {
            ticks_per_beat,
            points,
        }
    }

    fn point_at(&self, tick: Tick) -> &TempoPoint {
        let idx = self.points.partition_point(|p| p.tick <= tick);
        &self.points[idx.max(1) - 1]
    }

    pub fn bpm_at(&self, tick: Tick) -> Decimal {
        self.point_at(tick).bpm
    }

    /// Microseconds from tick 0 to `tick`, saturating at `u64::MAX`.
    pub fn micros_at(&self, tick: Tick) -> u64 {
        let point = self.point_at(tick);
        point
            .micros
            .saturating_add(span_micros(tick - point.tick, point.micros_per_beat, self.ticks_per_beat))
    }

    /// Last tick that starts at or before `micros`.
    pub fn tick_at_micros(&self, micros: u64) -> Tick {
        let idx = self.points.partition_point(|p| p.micros <= micros);
        let point = &self.points[idx.max(1) - 1];
        let elapsed = (micros - point.micros) as u128 * self.ticks_per_beat as u128;
        let ticks = elapsed / point.micros_per_beat.max(1) as u128;
        point
            .tick
            .saturating_add(u64::try_from(ticks).unwrap_or(u64::MAX))
    }
}

fn span_micros(ticks: Tick, micros_per_beat: u64, ticks_per_beat: u32) -> u64 {
    let micros = ticks as u128 * micros_per_beat as u128 / ticks_per_beat as u128;
    u64::try_from(micros).unwrap_or(u64::MAX)
}
