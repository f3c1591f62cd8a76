use crate::error::ChartError;
use crate::resolver::BarIndexResolver;
use crate::score::Score;
use crate::types::event::Tick;
use std::collections::BTreeMap;
use std::fmt;

/// Version written in the `chart` header line.
pub const FORMAT_VERSION: &str = "1.0";

/// A named, versioned chart: the unit handed to importers and exporters.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBook {
    pub title: String,
    pub artist: String,
    pub version: u32,
    pub score: Score,
    /// Opaque per-format settings, keyed by format name.
    format_metadata: BTreeMap<String, String>,
}

impl Default for ScoreBook {
    fn default() -> Self {
        Self::new(String::new(), Score::default())
    }
}

impl ScoreBook {
    pub fn new(title: impl Into<String>, score: Score) -> Self {
        Self {
            title: title.into(),
            artist: String::new(),
            version: 1,
            score,
            format_metadata: BTreeMap::new(),
        }
    }

    pub fn format_metadata(&self, format: &str) -> Option<&str> {
        self.format_metadata.get(format).map(String::as_str)
    }

    pub fn set_format_metadata(&mut self, format: impl Into<String>, value: impl Into<String>) {
        self.format_metadata.insert(format.into(), value.into());
    }

    pub fn clear_format_metadata(&mut self, format: &str) -> Option<String> {
        self.format_metadata.remove(format)
    }

    pub fn all_format_metadata(&self) -> impl Iterator<Item = (&str, &str)> {
        self.format_metadata
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn resolver(&self) -> Result<BarIndexResolver, ChartError> {
        self.score.resolver()
    }

    pub fn duration(&self) -> Tick {
        self.score.end_tick()
    }

    /// Writes the `chart` header and book-level lines.
    pub fn write_header(&self, f: &mut impl fmt::Write) -> fmt::Result {
        writeln!(f, "chart {}", FORMAT_VERSION)?;
        if !self.title.is_empty() {
            writeln!(f, "title {}", self.title)?;
        }
        if !self.artist.is_empty() {
            writeln!(f, "artist {}", self.artist)?;
        }
        writeln!(f, "version {}", self.version)?;
        writeln!(f, "resolution {}", self.score.ticks_per_beat())?;
        for (format, value) in self.all_format_metadata() {
            writeln!(f, "meta {} {}", format, value)?;
        }
        Ok(())
    }
}

impl fmt::Display for ScoreBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_header(f)?;
        for item in self.score.timeline() {
            writeln!(f, "{} {}", item.tick(), item)?;
        }
        Ok(())
    }
}
