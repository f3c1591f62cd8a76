use crate::book::ScoreBook;
use crate::error::Result;
use crate::export::diagnostics::DiagnosticSink;
use crate::export::{ExportContext, PositionedItem};

pub trait FormatPlugin {
    fn name(&self) -> &str;

    /// File dialog filter, e.g. `*.chart`.
    fn file_filter(&self) -> &str;

    fn matches_path(&self, path: &str) -> bool {
        let lower = path.to_lowercase();
        self.file_filter()
            .split(';')
            .filter_map(|pattern| pattern.trim().strip_prefix('*'))
            .any(|suffix| lower.ends_with(&suffix.to_lowercase()))
    }
}

/// A cancelled import carries [`crate::ChartError::Cancelled`] inside the
/// `anyhow` error.
pub trait ChartImporter: FormatPlugin {
    fn import(
        &mut self,
        source: &str,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> anyhow::Result<ScoreBook>;
}

pub trait ChartEncoder: FormatPlugin {
    fn begin(&mut self, _ctx: &mut ExportContext<'_>) -> Result<()> {
        Ok(())
    }

    fn encode(&mut self, ctx: &mut ExportContext<'_>, item: &PositionedItem<'_>) -> Result<()>;

    fn finish(&mut self, _ctx: &mut ExportContext<'_>) -> Result<()> {
        Ok(())
    }
}
