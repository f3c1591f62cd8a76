use crate::book::ScoreBook;
use crate::error::{ChartError, Result};
use crate::export::diagnostics::{DiagnosticSink, Severity};
use crate::export::{ExportContext, PositionedItem};
use crate::parser::parse_chart;
use crate::plugin::{ChartEncoder, ChartImporter, FormatPlugin};
use std::io::{self, Write};

/// The native `.chart` text format.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChartTextFormat;

impl ChartTextFormat {
    /// Writes the book as-is, without validating its time signatures.
    pub fn save(book: &ScoreBook, sink: &mut impl Write) -> io::Result<()> {
        sink.write_all(book.to_string().as_bytes())?;
        sink.flush()
    }
}

impl FormatPlugin for ChartTextFormat {
    fn name(&self) -> &str {
        "chart"
    }

    fn file_filter(&self) -> &str {
        "*.chart"
    }
}

impl ChartImporter for ChartTextFormat {
    fn import(
        &mut self,
        source: &str,
        diagnostics: &mut dyn DiagnosticSink,
    ) -> anyhow::Result<ScoreBook> {
        let book = parse_chart(source)?;

        diagnostics.report(
            Severity::Hidden,
            &format!(
                "loaded {} notes and {} events",
                book.score.notes.len(),
                book.score.events().len()
            ),
        );
        if let Err(e) = book.resolver() {
            diagnostics.report(Severity::Warning, &e.to_string());
        }

        Ok(book)
    }
}

impl ChartEncoder for ChartTextFormat {
    fn begin(&mut self, ctx: &mut ExportContext<'_>) -> Result<()> {
        let mut header = String::new();
        ctx.book()
            .write_header(&mut header)
            .map_err(|e| ChartError::format("chart", e.to_string()))?;
        ctx.sink().write_all(header.as_bytes())?;
        Ok(())
    }

    fn encode(&mut self, ctx: &mut ExportContext<'_>, item: &PositionedItem<'_>) -> Result<()> {
        writeln!(ctx.sink(), "{} {}", item.tick(), item.item)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::diagnostics::Diagnostic;
    use crate::export::{ExportOptions, export};
    use pretty_assertions::assert_eq;

    const CHART: &str = r#"chart 1.0
title Sample
version 2
resolution 480
0 timesig 4/4
0 tempo 140.0
480 note lane=1
1920 timesig 6/8
1920 note lane=0 len=720
"#;

    #[test]
    fn test_import_and_export_match_save() {
        let mut format = ChartTextFormat;
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let book = format.import(CHART, &mut diagnostics).unwrap();
        assert!(diagnostics.iter().all(|d| d.severity == Severity::Hidden));

        let mut saved = Vec::new();
        ChartTextFormat::save(&book, &mut saved).unwrap();
        assert_eq!(String::from_utf8(saved).unwrap(), CHART);

        let mut exported = Vec::new();
        export(
            &book,
            &mut format,
            &mut exported,
            &ExportOptions::default(),
            &mut diagnostics,
        )
        .unwrap();
        assert_eq!(String::from_utf8(exported).unwrap(), CHART);
    }

    #[test]
    fn test_import_warns_on_misplaced_signature() {
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let book = ChartTextFormat
            .import("chart 1.0\n0 timesig 4/4\n1000 timesig 3/4\n", &mut diagnostics)
            .unwrap();

        assert_eq!(book.score.time_signatures.len(), 2);
        let warning = diagnostics
            .iter()
            .find(|d| d.severity == Severity::Warning)
            .unwrap();
        assert_eq!(
            warning.message,
            "time signature at tick 1000 is not on a bar boundary"
        );
    }

    #[test]
    fn test_matches_path() {
        assert!(ChartTextFormat.matches_path("songs/Intro.CHART"));
        assert!(!ChartTextFormat.matches_path("intro.mid"));
    }
}
