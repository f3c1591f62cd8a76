//! tickchart - tick-indexed timeline engine for rhythm-game charts
//!
//! This library holds a chart's tempo, time signature and speed changes on an
//! integer tick axis, converts ticks to bar positions under changing meters,
//! and streams charts through format encoders.

pub mod book;
pub mod error;
pub mod export;
pub mod formats;
pub mod line_parser;
pub mod parser;
pub mod plugin;
pub mod resolver;
pub mod score;
pub mod tempo_map;
pub mod types;

// Re-export commonly used types
pub use book::ScoreBook;
pub use error::{ChartError, RangeError, Result, TimeSignatureError};
pub use export::diagnostics::{Diagnostic, DiagnosticSink, Severity, TracingDiagnostics};
pub use export::{ExportContext, ExportOptions, ExportSummary, PositionedItem, export};
pub use parser::parse_chart;
pub use plugin::{ChartEncoder, ChartImporter, FormatPlugin};
pub use resolver::{BarIndexResolver, BarPosition, BarSegment};
pub use score::{EventList, Score, TimelineItem};
pub use tempo_map::TempoMap;
pub use types::decimal::Decimal;
pub use types::event::{EventKind, SpeedEvent, TempoEvent, Tick, TimeSignatureEvent, Timed, TimedEvent};
pub use types::note::Note;
pub use types::time_signature::TimeSignature;
