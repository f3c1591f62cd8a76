use crate::error::Result;
use crate::export::diagnostics::Severity;
use crate::export::{ExportContext, PositionedItem};
use crate::plugin::{ChartEncoder, FormatPlugin};
use std::io::Write;

const DEFAULT_WIDTH: usize = 3;
const MAX_WIDTH: usize = 12;

/// Human-readable listing with bar-relative positions.
///
/// Each line is `BAR:OFFSET ITEM`, where `BAR` is zero-padded to the width
/// stored in this format's metadata (3 unless set).
#[derive(Debug, Clone)]
pub struct BarTextEncoder {
    width: usize,
    last_bar: Option<u64>,
}

impl Default for BarTextEncoder {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            last_bar: None,
        }
    }
}

impl BarTextEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_width(ctx: &mut ExportContext<'_>) -> usize {
        let metadata = ctx.metadata().map(str::to_string);
        match metadata.as_deref() {
            Some(value) => match value.trim().parse::<usize>() {
                Ok(width) if (1..=MAX_WIDTH).contains(&width) => width,
                _ => {
                    let message = format!(
                        "invalid bar width \"{}\", using {}",
                        value, DEFAULT_WIDTH
                    );
                    ctx.report(Severity::Warning, &message);
                    DEFAULT_WIDTH
                }
            },
            None if ctx.skip_prompts() => {
                ctx.report(Severity::Hidden, "no bar width set, using default");
                DEFAULT_WIDTH
            }
            None => {
                ctx.report(
                    Severity::Information,
                    &format!("bar width defaults to {}", DEFAULT_WIDTH),
                );
                ctx.set_metadata(DEFAULT_WIDTH.to_string());
                DEFAULT_WIDTH
            }
        }
    }
}

impl FormatPlugin for BarTextEncoder {
    fn name(&self) -> &str {
        "bars"
    }

    fn file_filter(&self) -> &str {
        "*.bars"
    }
}

impl ChartEncoder for BarTextEncoder {
    fn begin(&mut self, ctx: &mut ExportContext<'_>) -> Result<()> {
        self.width = Self::read_width(ctx);
        self.last_bar = None;

        let book = ctx.book();
        let resolution = ctx.resolver().ticks_per_beat();
        let sink = ctx.sink();
        if !book.title.is_empty() {
            writeln!(sink, "# {}", book.title)?;
        }
        writeln!(sink, "# resolution {}", resolution)?;
        Ok(())
    }

    fn encode(&mut self, ctx: &mut ExportContext<'_>, item: &PositionedItem<'_>) -> Result<()> {
        let position = item.position;
        if self.last_bar != Some(position.bar) {
            writeln!(
                ctx.sink(),
                "bar {:0width$} {} @ {} bpm",
                position.bar,
                item.signature,
                item.bpm,
                width = self.width
            )?;
            self.last_bar = Some(position.bar);
        }
        writeln!(
            ctx.sink(),
            "{:0width$}:{} {}",
            position.bar,
            position.offset,
            item.item,
            width = self.width
        )?;
        Ok(())
    }
}
