pub mod bar_text;
pub mod chart_text;
#[cfg(feature = "midi")]
pub mod midi;

pub use bar_text::BarTextEncoder;
pub use chart_text::ChartTextFormat;
#[cfg(feature = "midi")]
pub use midi::MidiEncoder;
