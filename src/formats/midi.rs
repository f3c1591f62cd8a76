use crate::error::{ChartError, Result};
use crate::export::diagnostics::Severity;
use crate::export::{ExportContext, PositionedItem};
use crate::plugin::{ChartEncoder, FormatPlugin};
use crate::score::TimelineItem;
use crate::types::event::Tick;
use midly::num::{u4, u7, u15, u24, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use tracing::debug;

const FORMAT_NAME: &str = "midi";
const DEFAULT_BASE_KEY: u8 = 60;
const VELOCITY: u8 = 100;

/// Sort rank of events sharing a tick: releases first, then meta, then presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Slot {
    NoteOff,
    Meta,
    NoteOn,
}

/// Lane `n` plays key `base + n` on channel 0, with `base` taken from the
/// format metadata. Speed changes are dropped.
#[derive(Debug, Default)]
pub struct MidiEncoder {
    base_key: u8,
    events: Vec<(Tick, Slot, TrackEventKind<'static>)>,
    skipped_speed: bool,
}

impl MidiEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_base_key(ctx: &mut ExportContext<'_>) -> u8 {
        let metadata = ctx.metadata().map(str::to_string);
        match metadata.as_deref() {
            Some(value) => match value.trim().parse::<u8>() {
                Ok(key) if key <= 127 => key,
                _ => {
                    ctx.report(
                        Severity::Warning,
                        &format!("invalid base key \"{}\", using {}", value, DEFAULT_BASE_KEY),
                    );
                    DEFAULT_BASE_KEY
                }
            },
            None if ctx.skip_prompts() => DEFAULT_BASE_KEY,
            None => {
                ctx.report(
                    Severity::Information,
                    &format!("lane 0 is mapped to key {}", DEFAULT_BASE_KEY),
                );
                ctx.set_metadata(DEFAULT_BASE_KEY.to_string());
                DEFAULT_BASE_KEY
            }
        }
    }

    fn push(&mut self, tick: Tick, slot: Slot, kind: TrackEventKind<'static>) {
        self.events.push((tick, slot, kind));
    }

    fn note_key(&self, lane: u16) -> Result<u8> {
        u8::try_from(self.base_key as u32 + lane as u32)
            .ok()
            .filter(|key| *key <= 127)
            .ok_or_else(|| {
                ChartError::format(
                    FORMAT_NAME,
                    format!("lane {} is above the highest MIDI key", lane),
                )
            })
    }
}

fn note_event(key: u8, on: bool) -> TrackEventKind<'static> {
    let key = u7::new(key);
    let message = if on {
        MidiMessage::NoteOn {
            key,
            vel: u7::new(VELOCITY),
        }
    } else {
        MidiMessage::NoteOff {
            key,
            vel: u7::new(0),
        }
    };
    TrackEventKind::Midi {
        channel: u4::new(0),
        message,
    }
}

impl FormatPlugin for MidiEncoder {
    fn name(&self) -> &str {
        FORMAT_NAME
    }

    fn file_filter(&self) -> &str {
        "*.mid;*.midi"
    }
}

impl ChartEncoder for MidiEncoder {
    fn begin(&mut self, ctx: &mut ExportContext<'_>) -> Result<()> {
        let ticks_per_beat = ctx.resolver().ticks_per_beat();
        if ticks_per_beat > u15::max_value().as_int() as u32 {
            return Err(ChartError::format(
                FORMAT_NAME,
                format!("resolution {} does not fit in a MIDI header", ticks_per_beat),
            ));
        }
        self.base_key = Self::read_base_key(ctx);
        self.events.clear();
        self.skipped_speed = false;
        Ok(())
    }

    fn encode(&mut self, ctx: &mut ExportContext<'_>, item: &PositionedItem<'_>) -> Result<()> {
        let tick = item.tick();
        match item.item {
            TimelineItem::Tempo(tempo) => {
                let micros = u32::try_from(tempo.micros_per_beat())
                    .ok()
                    .filter(|m| *m <= u24::max_value().as_int())
                    .ok_or_else(|| {
                        ChartError::format(
                            FORMAT_NAME,
                            format!("tempo {} bpm at tick {} is too slow", tempo.bpm(), tick),
                        )
                    })?;
                self.push(
                    tick,
                    Slot::Meta,
                    TrackEventKind::Meta(MetaMessage::Tempo(u24::new(micros))),
                );
            }
            TimelineItem::TimeSignature(event) => {
                let signature = event.signature();
                let (Ok(numerator), Ok(exponent)) = (
                    u8::try_from(signature.numerator()),
                    u8::try_from(signature.denominator_exponent()),
                ) else {
                    return Err(ChartError::format(
                        FORMAT_NAME,
                        format!("time signature {} at tick {} is too large", signature, tick),
                    ));
                };
                self.push(
                    tick,
                    Slot::Meta,
                    TrackEventKind::Meta(MetaMessage::TimeSignature(
                        numerator,
                        exponent,
                        24, // MIDI clocks per metronome click
                        8,  // 32nd notes per quarter note
                    )),
                );
            }
            TimelineItem::Speed(_) => {
                if !self.skipped_speed {
                    ctx.report(Severity::Hidden, "speed changes are not exported to MIDI");
                    self.skipped_speed = true;
                }
            }
            TimelineItem::Note(note) => {
                let key = self.note_key(note.lane())?;
                let length = if note.is_hold() {
                    note.length()
                } else {
                    (ctx.resolver().ticks_per_beat() as Tick / 4).max(1)
                };
                self.push(tick, Slot::NoteOn, note_event(key, true));
                self.push(tick.saturating_add(length), Slot::NoteOff, note_event(key, false));
            }
        }
        Ok(())
    }

    fn finish(&mut self, ctx: &mut ExportContext<'_>) -> Result<()> {
        let book = ctx.book();
        let ticks_per_beat = ctx.resolver().ticks_per_beat() as u16;

        // stable: same-slot events keep timeline order
        self.events.sort_by_key(|(tick, slot, _)| (*tick, *slot));

        let mut track = Vec::with_capacity(self.events.len() + 2);
        if !book.title.is_empty() {
            track.push(TrackEvent {
                delta: u28::new(0),
                kind: TrackEventKind::Meta(MetaMessage::TrackName(book.title.as_bytes())),
            });
        }

        let max_delta = u28::max_value().as_int() as u64;
        let mut last_tick = 0;
        for (tick, _, kind) in self.events.drain(..) {
            let mut delta = tick - last_tick;
            last_tick = tick;
            while delta > max_delta {
                track.push(TrackEvent {
                    delta: u28::max_value(),
                    kind: TrackEventKind::Meta(MetaMessage::Text(b"long delta")),
                });
                delta -= max_delta;
            }
            track.push(TrackEvent {
                delta: u28::new(delta as u32),
                kind,
            });
        }

        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });

        debug!(events = track.len(), "writing MIDI track");

        let smf = Smf {
            header: Header {
                format: Format::SingleTrack,
                timing: Timing::Metrical(u15::new(ticks_per_beat)),
            },
            tracks: vec![track],
        };
        smf.write_std(ctx.sink())?;
        Ok(())
    }
}
