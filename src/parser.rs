use crate::book::ScoreBook;
use crate::line_parser::{ChartLine, parse_chart_line};
use crate::score::Score;
use anyhow::{Context, Result, bail};

/// Parses `.chart` text into a score book.
///
/// Only per-value ranges are checked here. Time signature placement is left to
/// the bar resolver, so a chart with misplaced meter changes still loads.
pub fn parse_chart(content: &str) -> Result<ScoreBook> {
    let mut parser = ChartParser::new();
    parser.parse(content)
}

#[derive(Default)]
pub struct ChartParser {}

impl ChartParser {
    pub fn new() -> Self {
        Self {}
    }

    pub fn parse(&mut self, content: &str) -> Result<ScoreBook> {
        let mut book = ScoreBook::default();
        let mut lines = Vec::new();
        let mut has_header = false;
        let mut resolution = None;

        for (line_idx, line) in content.lines().enumerate() {
            let parsed =
                parse_chart_line(line).with_context(|| format!("Line #{}", line_idx + 1))?;

            match parsed {
                ChartLine::Header { .. } => {
                    if has_header {
                        bail!("Line #{}: Duplicate chart header", line_idx + 1);
                    }
                    has_header = true;
                }
                ChartLine::Title(title) => book.title = title,
                ChartLine::Artist(artist) => book.artist = artist,
                ChartLine::Version(version) => book.version = version,
                ChartLine::Resolution(value) => {
                    if resolution.is_some() {
                        bail!("Line #{}: Resolution declared twice", line_idx + 1);
                    }
                    resolution = Some((line_idx, value));
                }
                ChartLine::FormatMeta { format, value } => {
                    book.set_format_metadata(format, value);
                }
                timed @ (ChartLine::Event(_) | ChartLine::Note(_)) => lines.push(timed),
                ChartLine::Empty => {}
            }
        }

        if !has_header {
            bail!("Missing chart header");
        }

        book.score = match resolution {
            Some((line_idx, value)) => {
                Score::new(value).with_context(|| format!("Line #{}", line_idx + 1))?
            }
            None => Score::default(),
        };

        for line in lines {
            match line {
                ChartLine::Event(event) => {
                    book.score.insert_event(event);
                }
                ChartLine::Note(note) => {
                    book.score.insert_note(note);
                }
                _ => {}
            }
        }

        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RangeError;
    use crate::types::event::Timed;
    use pretty_assertions::assert_eq;

    const CHART: &str = r#"
chart 1.0
title Night Drive
artist Someone
version 3
resolution 240
meta midi base_key=48

// intro
0 timesig 4/4
0 tempo 128
960 note lane=0
1200 note lane=1 len=240
960 tempo 132.5
3840 timesig 7/8
3840 speed 0.5 ch=1
"#;

    #[test]
    fn test_parse() {
        let book = parse_chart(CHART).unwrap();
        assert_eq!(book.title, "Night Drive");
        assert_eq!(book.artist, "Someone");
        assert_eq!(book.version, 3);
        assert_eq!(book.score.ticks_per_beat(), 240);
        assert_eq!(book.format_metadata("midi"), Some("base_key=48"));
        assert_eq!(book.score.tempos.len(), 2);
        assert_eq!(book.score.time_signatures.len(), 2);
        assert_eq!(book.score.speeds.len(), 1);
        assert_eq!(book.score.notes.len(), 2);
        assert_eq!(book.score.tempos.get(1).map(|t| t.tick()), Some(960));
    }

    #[test]
    fn test_save_and_reload() {
        let book = parse_chart(CHART).unwrap();
        let saved = book.to_string();
        let reloaded = parse_chart(&saved).unwrap();
        assert_eq!(reloaded, book);
        assert_eq!(reloaded.to_string(), saved);
    }

    #[test]
    fn test_misplaced_signature_still_loads() {
        let book = parse_chart("chart 1.0\n0 timesig 4/4\n1000 timesig 3/4\n").unwrap();
        assert_eq!(book.score.time_signatures.len(), 2);
        assert!(book.resolver().is_err());
    }

    #[test]
    fn test_errors() {
        let err = parse_chart("0 tempo 120").unwrap_err();
        assert_eq!(err.to_string(), "Missing chart header");

        let err = parse_chart("chart 1.0\n0 tempo 120\n-5 note lane=1\n").unwrap_err();
        assert_eq!(
            format!("{:#}", err),
            "Line #3: tick must be non-negative, got -5"
        );

        let err = parse_chart("chart 1.0\nresolution 0\n").unwrap_err();
        assert_eq!(
            format!("{:#}", err),
            "Line #2: ticks per beat must be positive, got 0"
        );

        assert!(parse_chart("chart 1.0\nchart 1.0\n").is_err());
        assert!(parse_chart("chart 1.0\n0 tempo abc\n").is_err());
        assert!(parse_chart("chart 1.0\nresolution 96\nresolution 96\n").is_err());
    }

    #[test]
    fn test_range_error_kind_survives() {
        let err = parse_chart("chart 1.0\n-5 note lane=1\n").unwrap_err();
        assert_eq!(err.downcast_ref::<RangeError>(), Some(&RangeError::Tick(-5)));
        assert_eq!(err.to_string(), "Line #2");

        let err = parse_chart("chart 1.0\nresolution -96\n").unwrap_err();
        assert_eq!(
            err.downcast_ref::<RangeError>(),
            Some(&RangeError::TicksPerBeat(-96))
        );

        let err = parse_chart("0 note lane=1").unwrap_err();
        assert!(err.downcast_ref::<RangeError>().is_none());
    }
}
