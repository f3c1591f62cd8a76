pub mod diagnostics;

use crate::book::ScoreBook;
use crate::error::Result;
use crate::plugin::ChartEncoder;
use crate::resolver::{BarIndexResolver, BarPosition};
use crate::score::TimelineItem;
use crate::tempo_map::TempoMap;
use crate::types::decimal::Decimal;
use crate::types::event::Tick;
use crate::types::time_signature::TimeSignature;
use diagnostics::{DiagnosticSink, Severity};
use std::collections::BTreeMap;
use std::io::Write;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub skip_prompts: bool,
    /// Overrides the metadata stored in the book for this format.
    pub metadata: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionedItem<'a> {
    pub item: TimelineItem<'a>,
    pub index: usize,
    pub position: BarPosition,
    /// Counts a tempo change at the same tick.
    pub bpm: Decimal,
    pub signature: TimeSignature,
}

impl PositionedItem<'_> {
    pub fn tick(&self) -> Tick {
        self.item.tick()
    }
}

/// What an encoder can see and touch during an export.
pub struct ExportContext<'a> {
    book: &'a ScoreBook,
    resolver: &'a BarIndexResolver,
    sink: &'a mut dyn Write,
    diagnostics: &'a mut dyn DiagnosticSink,
    skip_prompts: bool,
    metadata: Option<String>,
    speeds: BTreeMap<i32, Decimal>,
}

impl<'a> ExportContext<'a> {
    pub fn book(&self) -> &'a ScoreBook {
        self.book
    }

    pub fn resolver(&self) -> &'a BarIndexResolver {
        self.resolver
    }

    pub fn sink(&mut self) -> &mut dyn Write {
        &mut *self.sink
    }

    pub fn skip_prompts(&self) -> bool {
        self.skip_prompts
    }

    /// Format-specific metadata string, opaque to the core.
    pub fn metadata(&self) -> Option<&str> {
        self.metadata.as_deref()
    }

    pub fn set_metadata(&mut self, value: impl Into<String>) {
        self.metadata = Some(value.into());
    }

    pub fn report(&mut self, severity: Severity, message: &str) {
        self.diagnostics.report(severity, message);
    }

    /// Speed ratio of the last visited speed change on `channel`, or 1.
    pub fn speed_at(&self, channel: i32) -> Decimal {
        self.speeds.get(&channel).copied().unwrap_or(Decimal::ONE)
    }

    pub fn active_speeds(&self) -> impl Iterator<Item = (i32, Decimal)> + '_ {
        self.speeds.iter().map(|(channel, ratio)| (*channel, *ratio))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub format: String,
    pub items: usize,
    pub bars: u64,
    pub duration_micros: u64,
    pub metadata: Option<String>,
}

/// Builds the bar index once, then hands every timeline item to `encoder`
/// with its bar position. The first error aborts the run; partial sink
/// output is left for the caller to discard.
pub fn export(
    book: &ScoreBook,
    encoder: &mut dyn ChartEncoder,
    sink: &mut dyn Write,
    options: &ExportOptions,
    diagnostics: &mut dyn DiagnosticSink,
) -> Result<ExportSummary> {
    let format = encoder.name().to_string();
    let resolver = book.resolver()?;
    let tempo_map = book.score.tempo_map();
    let timeline = book.score.timeline();

    debug!(format = %format, items = timeline.len(), "starting export");

    let metadata = options
        .metadata
        .clone()
        .or_else(|| book.format_metadata(&format).map(str::to_string));

    let mut ctx = ExportContext {
        book,
        resolver: &resolver,
        sink,
        diagnostics,
        skip_prompts: options.skip_prompts,
        metadata,
        speeds: BTreeMap::new(),
    };

    let result = run(encoder, &mut ctx, &tempo_map, &timeline);
    if let Err(e) = &result {
        if e.is_cancelled() {
            info!(format = %format, "export cancelled");
        } else {
            debug!(format = %format, error = %e, "export failed");
        }
    }
    result?;

    let end_tick = book.duration();
    let bars = if timeline.is_empty() {
        0
    } else {
        resolver.position(end_tick).bar + 1
    };

    Ok(ExportSummary {
        format,
        items: timeline.len(),
        bars,
        duration_micros: tempo_map.micros_at(end_tick),
        metadata: ctx.metadata,
    })
}

fn run(
    encoder: &mut dyn ChartEncoder,
    ctx: &mut ExportContext<'_>,
    tempo_map: &TempoMap,
    timeline: &[TimelineItem<'_>],
) -> Result<()> {
    encoder.begin(ctx)?;

    for (index, item) in timeline.iter().enumerate() {
        let tick = item.tick();
        if let TimelineItem::Speed(speed) = item {
            ctx.speeds.insert(speed.channel(), speed.ratio());
        }
        let positioned = PositionedItem {
            item: *item,
            index,
            position: ctx.resolver.position(tick),
            bpm: tempo_map.bpm_at(tick),
            signature: ctx.resolver.signature_at(tick),
        };
        encoder.encode(ctx, &positioned)?;
    }

    encoder.finish(ctx)?;
    ctx.sink.flush()?;
    Ok(())
}
