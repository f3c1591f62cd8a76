use crate::error::{ChartError, RangeError};
use crate::resolver::BarIndexResolver;
use crate::tempo_map::TempoMap;
use crate::types::event::{
    EventKind, SpeedEvent, TempoEvent, Tick, TimeSignatureEvent, Timed, TimedEvent,
};
use crate::types::note::Note;
use std::fmt;

pub const DEFAULT_TICKS_PER_BEAT: u32 = 480;

/// Vector kept sorted by tick. Items sharing a tick keep insertion order; a
/// moved item goes after the others at its new tick.
#[derive(Debug, Clone, PartialEq)]
pub struct EventList<T> {
    items: Vec<T>,
}

impl<T> Default for EventList<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Timed> EventList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts after any item at the same tick and returns the new index.
    pub fn insert(&mut self, item: T) -> usize {
        let tick = item.tick();
        let idx = self.items.partition_point(|e| e.tick() <= tick);
        self.items.insert(idx, item);
        idx
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        (index < self.items.len()).then(|| self.items.remove(index))
    }

    /// Edits one item in place and restores ordering if its tick moved.
    ///
    /// If `edit` fails the item is left exactly as it was.
    pub fn modify<F>(&mut self, index: usize, edit: F) -> Result<usize, RangeError>
    where
        T: Clone,
        F: FnOnce(&mut T) -> Result<(), RangeError>,
    {
        let len = self.items.len();
        let item = self
            .items
            .get(index)
            .ok_or(RangeError::Index { index, len })?;

        let mut edited = item.clone();
        edit(&mut edited)?;

        if edited.tick() == self.items[index].tick() {
            self.items[index] = edited;
            Ok(index)
        } else {
            self.items.remove(index);
            Ok(self.insert(edited))
        }
    }

    pub fn set_tick(&mut self, index: usize, tick: i64) -> Result<usize, RangeError>
    where
        T: Clone,
    {
        self.modify(index, |item| item.set_tick(tick))
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// The last item at or before `tick`.
    pub fn active_at(&self, tick: Tick) -> Option<&T> {
        let idx = self.items.partition_point(|e| e.tick() <= tick);
        idx.checked_sub(1).map(|i| &self.items[i])
    }

    pub fn in_range(&self, from: Tick, to: Tick) -> &[T] {
        let start = self.items.partition_point(|e| e.tick() < from);
        let end = self.items.partition_point(|e| e.tick() < to).max(start);
        &self.items[start..end]
    }
}

impl<T: Timed> FromIterator<T> for EventList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut list = Self::new();
        for item in iter {
            list.insert(item);
        }
        list
    }
}

impl<'a, T> IntoIterator for &'a EventList<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimelineItem<'a> {
    TimeSignature(&'a TimeSignatureEvent),
    Tempo(&'a TempoEvent),
    Speed(&'a SpeedEvent),
    Note(&'a Note),
}

impl TimelineItem<'_> {
    pub fn tick(&self) -> Tick {
        match self {
            TimelineItem::TimeSignature(e) => e.tick(),
            TimelineItem::Tempo(e) => e.tick(),
            TimelineItem::Speed(e) => e.tick(),
            TimelineItem::Note(n) => n.tick(),
        }
    }

    /// `None` for notes.
    pub fn event_kind(&self) -> Option<EventKind> {
        match self {
            TimelineItem::TimeSignature(_) => Some(EventKind::TimeSignature),
            TimelineItem::Tempo(_) => Some(EventKind::Tempo),
            TimelineItem::Speed(_) => Some(EventKind::Speed),
            TimelineItem::Note(_) => None,
        }
    }

    fn rank(&self) -> (Tick, u8) {
        let order = match self {
            TimelineItem::TimeSignature(_) => 0,
            TimelineItem::Tempo(_) => 1,
            TimelineItem::Speed(_) => 2,
            TimelineItem::Note(_) => 3,
        };
        (self.tick(), order)
    }
}

impl fmt::Display for TimelineItem<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineItem::TimeSignature(e) => write!(f, "{}", e),
            TimelineItem::Tempo(e) => write!(f, "{}", e),
            TimelineItem::Speed(e) => write!(f, "{}", e),
            TimelineItem::Note(n) => write!(f, "{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Score {
    ticks_per_beat: u32,
    pub tempos: EventList<TempoEvent>,
    pub time_signatures: EventList<TimeSignatureEvent>,
    pub speeds: EventList<SpeedEvent>,
    pub notes: EventList<Note>,
}

impl Default for Score {
    fn default() -> Self {
        Self::with_resolution(DEFAULT_TICKS_PER_BEAT)
    }
}

impl Score {
    pub fn new(ticks_per_beat: i64) -> Result<Self, RangeError> {
        let ticks_per_beat = u32::try_from(ticks_per_beat)
            .ok()
            .filter(|tpb| *tpb > 0)
            .ok_or(RangeError::TicksPerBeat(ticks_per_beat))?;
        Ok(Self::with_resolution(ticks_per_beat))
    }

    fn with_resolution(ticks_per_beat: u32) -> Self {
        Self {
            ticks_per_beat,
            tempos: EventList::new(),
            time_signatures: EventList::new(),
            speeds: EventList::new(),
            notes: EventList::new(),
        }
    }

    pub fn ticks_per_beat(&self) -> u32 {
        self.ticks_per_beat
    }

    /// Length of a 4/4 bar. Grid convenience only; bar math goes through the resolver.
    pub fn standard_bar_ticks(&self) -> Tick {
        self.ticks_per_beat as Tick * 4
    }

    pub fn insert_event(&mut self, event: TimedEvent) -> usize {
        match event {
            TimedEvent::Tempo(e) => self.tempos.insert(e),
            TimedEvent::TimeSignature(e) => self.time_signatures.insert(e),
            TimedEvent::Speed(e) => self.speeds.insert(e),
        }
    }

    pub fn remove_event(&mut self, kind: EventKind, index: usize) -> Option<TimedEvent> {
        match kind {
            EventKind::Tempo => self.tempos.remove(index).map(TimedEvent::from),
            EventKind::TimeSignature => self.time_signatures.remove(index).map(TimedEvent::from),
            EventKind::Speed => self.speeds.remove(index).map(TimedEvent::from),
        }
    }

    pub fn set_event_tick(
        &mut self,
        kind: EventKind,
        index: usize,
        tick: i64,
    ) -> Result<usize, RangeError> {
        match kind {
            EventKind::Tempo => self.tempos.set_tick(index, tick),
            EventKind::TimeSignature => self.time_signatures.set_tick(index, tick),
            EventKind::Speed => self.speeds.set_tick(index, tick),
        }
    }

    pub fn insert_note(&mut self, note: Note) -> usize {
        self.notes.insert(note)
    }

    pub fn remove_note(&mut self, index: usize) -> Option<Note> {
        self.notes.remove(index)
    }

    pub fn set_note_tick(&mut self, index: usize, tick: i64) -> Result<usize, RangeError> {
        self.notes.set_tick(index, tick)
    }

    /// Every event and note in visiting order: by tick, then time signature,
    /// tempo, speed, note. Each collection keeps its own order.
    pub fn timeline(&self) -> Vec<TimelineItem<'_>> {
        let mut items: Vec<TimelineItem<'_>> = self
            .time_signatures
            .iter()
            .map(TimelineItem::TimeSignature)
            .chain(self.tempos.iter().map(TimelineItem::Tempo))
            .chain(self.speeds.iter().map(TimelineItem::Speed))
            .chain(self.notes.iter().map(TimelineItem::Note))
            .collect();
        items.sort_by_key(|item| item.rank());
        items
    }

    pub fn events(&self) -> Vec<TimelineItem<'_>> {
        let mut items = self.timeline();
        items.retain(|item| item.event_kind().is_some());
        items
    }

    pub fn resolver(&self) -> Result<BarIndexResolver, ChartError> {
        BarIndexResolver::new(self.ticks_per_beat, self.time_signatures.as_slice())
    }

    pub fn tempo_map(&self) -> TempoMap {
        TempoMap::new(self.ticks_per_beat, self.tempos.as_slice())
    }

    /// Last occupied tick, counting the ends of holds.
    pub fn end_tick(&self) -> Tick {
        let last_event = self
            .timeline()
            .last()
            .map(|item| item.tick())
            .unwrap_or(0);
        let last_hold_end = self.notes.iter().map(Note::end_tick).max().unwrap_or(0);
        last_event.max(last_hold_end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::decimal::Decimal;
    use pretty_assertions::assert_eq;

    fn tempo(tick: i64, bpm: i64) -> TempoEvent {
        TempoEvent::new(tick, Decimal::from_int(bpm)).unwrap()
    }

    fn bpms(score: &Score) -> Vec<(Tick, i64)> {
        score
            .tempos
            .iter()
            .map(|t| (t.tick(), t.bpm().trunc()))
            .collect()
    }

    #[test]
    fn test_insert_keeps_order() {
        let mut score = Score::default();
        score.insert_event(tempo(960, 140).into());
        score.insert_event(tempo(0, 120).into());
        score.insert_event(tempo(960, 150).into());
        score.insert_event(tempo(480, 130).into());

        assert_eq!(
            bpms(&score),
            vec![(0, 120), (480, 130), (960, 140), (960, 150)]
        );
    }

    #[test]
    fn test_move_resorts() {
        let mut score = Score::default();
        score.tempos.insert(tempo(0, 100));
        score.tempos.insert(tempo(480, 110));
        score.tempos.insert(tempo(960, 120));

        let idx = score.set_event_tick(EventKind::Tempo, 0, 960).unwrap();
        assert_eq!(idx, 2);
        assert_eq!(bpms(&score), vec![(480, 110), (960, 120), (960, 100)]);
    }

    #[test]
    fn test_negative_move_leaves_event_unchanged() {
        let mut score = Score::default();
        score.tempos.insert(tempo(0, 100));
        score.tempos.insert(tempo(480, 110));

        assert_eq!(
            score.set_event_tick(EventKind::Tempo, 1, -1),
            Err(RangeError::Tick(-1))
        );
        assert_eq!(bpms(&score), vec![(0, 100), (480, 110)]);

        assert_eq!(
            score.set_event_tick(EventKind::Speed, 0, 10),
            Err(RangeError::Index { index: 0, len: 0 })
        );
    }

    #[test]
    fn test_modify_without_moving() {
        let mut score = Score::default();
        score.tempos.insert(tempo(0, 100));
        score.tempos.insert(tempo(0, 110));

        let idx = score
            .tempos
            .modify(0, |t| t.set_bpm(Decimal::from_int(90)))
            .unwrap();
        assert_eq!(idx, 0);
        assert_eq!(bpms(&score), vec![(0, 90), (0, 110)]);

        assert!(score.tempos.modify(1, |t| t.set_bpm(Decimal::ZERO)).is_err());
        assert_eq!(bpms(&score), vec![(0, 90), (0, 110)]);
    }

    #[test]
    fn test_timeline_order() {
        let mut score = Score::default();
        score.insert_note(Note::tap(0, 1).unwrap());
        score.insert_event(SpeedEvent::new(0, Decimal::ONE, 0).unwrap().into());
        score.insert_event(tempo(0, 120).into());
        score.insert_event(TimeSignatureEvent::from_parts(0, 4, 2).unwrap().into());
        score.insert_note(Note::tap(240, 2).unwrap());
        score.insert_event(tempo(240, 180).into());

        let kinds: Vec<(Tick, Option<EventKind>)> = score
            .timeline()
            .iter()
            .map(|item| (item.tick(), item.event_kind()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (0, Some(EventKind::TimeSignature)),
                (0, Some(EventKind::Tempo)),
                (0, Some(EventKind::Speed)),
                (0, None),
                (240, Some(EventKind::Tempo)),
                (240, None),
            ]
        );
        assert_eq!(score.events().len(), 4);
    }

    #[test]
    fn test_queries() {
        let mut score = Score::new(192).unwrap();
        assert_eq!(score.standard_bar_ticks(), 768);
        score.insert_note(Note::new(100, 0, 500).unwrap());
        score.insert_note(Note::tap(300, 1).unwrap());
        score.insert_note(Note::tap(400, 1).unwrap());

        assert_eq!(score.end_tick(), 600);
        assert_eq!(score.notes.in_range(100, 400).len(), 2);
        assert_eq!(score.notes.active_at(350).map(|n| n.tick()), Some(300));
        assert_eq!(score.notes.active_at(99), None);

        assert_eq!(score.remove_note(0).map(|n| n.lane()), Some(0));
        assert_eq!(score.remove_note(5), None);
        assert!(score.remove_event(EventKind::Tempo, 0).is_none());
    }

    #[test]
    fn test_resolution_must_be_positive() {
        assert_eq!(Score::new(0), Err(RangeError::TicksPerBeat(0)));
        assert_eq!(Score::new(-480), Err(RangeError::TicksPerBeat(-480)));
        assert_eq!(Score::default().ticks_per_beat(), 480);
    }
}
