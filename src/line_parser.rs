use crate::types::decimal::Decimal;
use crate::types::event::{SpeedEvent, TempoEvent, TimeSignatureEvent, TimedEvent};
use crate::types::note::Note;
use crate::types::time_signature::TimeSignature;
use anyhow::{Result, anyhow, bail};

/// One parsed line of a `.chart` file.
#[derive(Debug, Clone, PartialEq)]
pub enum ChartLine {
    Header { major: u32, minor: u32 },
    Title(String),
    Artist(String),
    Version(u32),
    Resolution(i64),
    FormatMeta { format: String, value: String },
    Event(TimedEvent),
    Note(Note),
    Empty,
}

#[derive(Debug)]
enum ParsedOption {
    Channel(i32),
    Lane(u16),
    Length(i64),
}

fn try_parse_option(part: &str) -> Result<ParsedOption> {
    let (key, value) = part
        .split_once('=')
        .ok_or_else(|| anyhow!("Unexpected \"{}\"", part))?;
    match key {
        "ch" => Ok(ParsedOption::Channel(
            value
                .parse()
                .map_err(|_| anyhow!("Invalid channel \"{}\"", value))?,
        )),
        "lane" => Ok(ParsedOption::Lane(
            value
                .parse()
                .map_err(|_| anyhow!("Invalid lane \"{}\"", value))?,
        )),
        "len" => Ok(ParsedOption::Length(
            value
                .parse()
                .map_err(|_| anyhow!("Invalid length \"{}\"", value))?,
        )),
        _ => bail!("Unknown option \"{}\"", key),
    }
}

fn parse_tempo(tick: i64, parts: &[&str]) -> Result<TimedEvent> {
    if parts.len() != 1 {
        bail!("Tempo event requires a BPM value");
    }
    let bpm: Decimal = parts[0]
        .parse()
        .map_err(|_| anyhow!("Invalid BPM value \"{}\"", parts[0]))?;
    Ok(TempoEvent::new(tick, bpm)?.into())
}

fn parse_time_signature(tick: i64, parts: &[&str]) -> Result<TimedEvent> {
    if parts.len() != 1 {
        bail!("Time signature event requires a signature");
    }
    let signature: TimeSignature = parts[0].parse()?;
    Ok(TimeSignatureEvent::new(tick, signature)?.into())
}

fn parse_speed(tick: i64, parts: &[&str]) -> Result<TimedEvent> {
    if parts.is_empty() {
        bail!("Speed event requires a ratio");
    }
    let ratio: Decimal = parts[0]
        .parse()
        .map_err(|_| anyhow!("Invalid speed ratio \"{}\"", parts[0]))?;

    let mut channel = 0;
    for part in &parts[1..] {
        match try_parse_option(part)? {
            ParsedOption::Channel(ch) => channel = ch,
            _ => bail!("Unsupported option \"{}\" for speed", part),
        }
    }

    Ok(SpeedEvent::new(tick, ratio, channel)?.into())
}

fn parse_note(tick: i64, parts: &[&str]) -> Result<Note> {
    let mut lane = None;
    let mut length = 0;

    for part in parts {
        match try_parse_option(part)? {
            ParsedOption::Lane(l) => lane = Some(l),
            ParsedOption::Length(l) => length = l,
            _ => bail!("Unsupported option \"{}\" for note", part),
        }
    }

    let lane = lane.ok_or_else(|| anyhow!("Note requires lane="))?;
    Ok(Note::new(tick, lane, length)?)
}

fn parse_header(parts: &[&str]) -> Result<ChartLine> {
    if parts.len() != 2 {
        bail!(
            "Invalid header. Got \"{}\". Expected \"chart 1.0\".",
            parts.join(" ")
        );
    }
    let (major, minor) = parts[1]
        .split_once('.')
        .ok_or_else(|| anyhow!("Invalid format version \"{}\"", parts[1]))?;
    let major: u32 = major
        .parse()
        .map_err(|_| anyhow!("Invalid format version \"{}\"", parts[1]))?;
    let minor: u32 = minor
        .parse()
        .map_err(|_| anyhow!("Invalid format version \"{}\"", parts[1]))?;
    if major != 1 {
        bail!("Unsupported chart format version {}.{}", major, minor);
    }
    Ok(ChartLine::Header { major, minor })
}

fn try_parse_timed_line(parts: &[&str]) -> Result<Option<ChartLine>> {
    if parts.len() < 2 {
        return Ok(None);
    }
    let Ok(tick) = parts[0].parse::<i64>() else {
        return Ok(None);
    };

    let rest = &parts[2..];
    let line = match parts[1] {
        "tempo" => ChartLine::Event(parse_tempo(tick, rest)?),
        "timesig" => ChartLine::Event(parse_time_signature(tick, rest)?),
        "speed" => ChartLine::Event(parse_speed(tick, rest)?),
        "note" => ChartLine::Note(parse_note(tick, rest)?),
        other => bail!("Unknown event type: {}", other),
    };
    Ok(Some(line))
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

pub fn parse_chart_line(line: &str) -> Result<ChartLine> {
    let line = strip_comment(line).trim();
    let parts: Vec<&str> = line.split_ascii_whitespace().collect();
    if parts.is_empty() {
        return Ok(ChartLine::Empty);
    }

    let text_value = || -> Result<String> {
        if parts.len() < 2 {
            bail!("\"{}\" requires a value", parts[0]);
        }
        Ok(parts[1..].join(" "))
    };

    let parsed = match parts[0] {
        "chart" => parse_header(&parts)?,
        "title" => ChartLine::Title(text_value()?),
        "artist" => ChartLine::Artist(text_value()?),
        "version" => {
            let value = text_value()?;
            ChartLine::Version(
                value
                    .parse()
                    .map_err(|_| anyhow!("Invalid version \"{}\"", value))?,
            )
        }
        "resolution" => {
            let value = text_value()?;
            ChartLine::Resolution(
                value
                    .parse()
                    .map_err(|_| anyhow!("Invalid resolution \"{}\"", value))?,
            )
        }
        "meta" => {
            if parts.len() < 3 {
                bail!("meta requires a format name and a value");
            }
            ChartLine::FormatMeta {
                format: parts[1].to_string(),
                value: parts[2..].join(" "),
            }
        }
        _ => match try_parse_timed_line(&parts)? {
            Some(line) => line,
            None => bail!("Cannot parse \"{}\"", parts.join(" ")),
        },
    };

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RangeError;
    use crate::types::event::Timed;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_book_lines() {
        assert_eq!(
            parse_chart_line("chart 1.0").unwrap(),
            ChartLine::Header { major: 1, minor: 0 }
        );
        assert_eq!(
            parse_chart_line("title  Night   Drive ").unwrap(),
            ChartLine::Title("Night Drive".to_string())
        );
        assert_eq!(
            parse_chart_line("resolution 192 // per beat").unwrap(),
            ChartLine::Resolution(192)
        );
        assert_eq!(
            parse_chart_line("meta midi base_key=48").unwrap(),
            ChartLine::FormatMeta {
                format: "midi".to_string(),
                value: "base_key=48".to_string()
            }
        );
        assert_eq!(parse_chart_line("   // only a comment").unwrap(), ChartLine::Empty);
        assert_eq!(parse_chart_line("").unwrap(), ChartLine::Empty);
    }

    #[test]
    fn test_event_lines() {
        let ChartLine::Event(TimedEvent::Speed(speed)) =
            parse_chart_line("960 speed 1.25 ch=3").unwrap()
        else {
            panic!("expected a speed event");
        };
        assert_eq!(speed.tick(), 960);
        assert_eq!(speed.channel(), 3);
        assert_eq!(speed.ratio().to_string(), "1.25");

        let ChartLine::Note(note) = parse_chart_line("480 note lane=2 len=120").unwrap() else {
            panic!("expected a note");
        };
        assert_eq!((note.tick(), note.lane(), note.length()), (480, 2, 120));

        assert!(matches!(
            parse_chart_line("0 timesig 7/8").unwrap(),
            ChartLine::Event(TimedEvent::TimeSignature(_))
        ));
    }

    #[test]
    fn test_range_errors_surface() {
        let err = parse_chart_line("-480 tempo 120").unwrap_err();
        assert_eq!(err.downcast_ref::<RangeError>(), Some(&RangeError::Tick(-480)));

        let err = parse_chart_line("0 tempo 0").unwrap_err();
        assert!(err.downcast_ref::<RangeError>().is_some());

        let err = parse_chart_line("0 timesig 0/4").unwrap_err();
        assert_eq!(err.to_string(), "time signature numerator must be at least 1, got 0");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_chart_line("chart 2.0").is_err());
        assert!(parse_chart_line("chart").is_err());
        assert!(parse_chart_line("0 jump 3").is_err());
        assert!(parse_chart_line("0 note").is_err());
        assert!(parse_chart_line("0 note lane=1 ch=2").is_err());
        assert!(parse_chart_line("0 tempo").is_err());
        assert!(parse_chart_line("0 speed 1.0 lane=2").is_err());
        assert!(parse_chart_line("hello world").is_err());
        assert!(parse_chart_line("title").is_err());
    }
}
