use crate::error::RangeError;
use crate::types::event::{Tick, Timed, check_tick};
use std::fmt;

/// A playable object in a lane. `length == 0` is a tap, anything longer a hold.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Note {
    tick: Tick,
    lane: u16,
    length: Tick,
}

impl Note {
    pub fn tap(tick: i64, lane: u16) -> Result<Self, RangeError> {
        Self::new(tick, lane, 0)
    }

    pub fn new(tick: i64, lane: u16, length: i64) -> Result<Self, RangeError> {
        Ok(Self {
            tick: check_tick(tick)?,
            lane,
            length: check_tick(length)?,
        })
    }

    pub fn lane(&self) -> u16 {
        self.lane
    }

    pub fn set_lane(&mut self, lane: u16) {
        self.lane = lane;
    }

    pub fn length(&self) -> Tick {
        self.length
    }

    pub fn set_length(&mut self, length: i64) -> Result<(), RangeError> {
        self.length = check_tick(length)?;
        Ok(())
    }

    pub fn is_hold(&self) -> bool {
        self.length > 0
    }

    pub fn end_tick(&self) -> Tick {
        self.tick.saturating_add(self.length)
    }
}

impl Timed for Note {
    fn tick(&self) -> Tick {
        self.tick
    }

    fn set_tick(&mut self, tick: i64) -> Result<(), RangeError> {
        self.tick = check_tick(tick)?;
        Ok(())
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "note lane={}", self.lane)?;
        if self.length > 0 {
            write!(f, " len={}", self.length)?;
        }
        Ok(())
    }
}
