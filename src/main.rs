use anyhow::{Context, Result, bail};
use clap::{Arg, Command};
use std::path::Path;
use tickchart::formats::{BarTextEncoder, ChartTextFormat};
use tickchart::{
    ChartEncoder, ChartImporter, ExportOptions, ScoreBook, TracingDiagnostics, export,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, PartialEq)]
enum FileFormat {
    Chart,
    Bars,
    Midi,
}

fn detect_file_format(file_path: &str) -> Result<FileFormat> {
    let path = Path::new(file_path);
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| anyhow::anyhow!("File has no extension: {}", file_path))?;

    match extension.to_lowercase().as_str() {
        "chart" => Ok(FileFormat::Chart),
        "bars" => Ok(FileFormat::Bars),
        "mid" | "midi" => Ok(FileFormat::Midi),
        _ => Err(anyhow::anyhow!(
            "Unsupported file extension: .{}",
            extension
        )),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn encoder_for(format: &FileFormat) -> Result<Box<dyn ChartEncoder>> {
    match format {
        FileFormat::Chart => Ok(Box::new(ChartTextFormat)),
        FileFormat::Bars => Ok(Box::new(BarTextEncoder::new())),
        FileFormat::Midi => {
            #[cfg(feature = "midi")]
            {
                Ok(Box::new(tickchart::formats::MidiEncoder::new()))
            }
            #[cfg(not(feature = "midi"))]
            {
                bail!("MIDI support is not enabled. Compile with --features midi");
            }
        }
    }
}

fn print_info(book: &ScoreBook) -> Result<()> {
    let score = &book.score;
    println!("Title:      {}", book.title);
    if !book.artist.is_empty() {
        println!("Artist:     {}", book.artist);
    }
    println!("Version:    {}", book.version);
    println!("Resolution: {} ticks per beat", score.ticks_per_beat());
    println!("Notes:      {}", score.notes.len());
    println!(
        "Events:     {} tempo, {} time signature, {} speed",
        score.tempos.len(),
        score.time_signatures.len(),
        score.speeds.len()
    );

    let resolver = book.resolver().context("Invalid time signatures")?;
    let end_tick = book.duration();
    let micros = score.tempo_map().micros_at(end_tick);
    println!("Length:     {} bars, {} ticks", resolver.position(end_tick).bar + 1, end_tick);
    println!(
        "Duration:   {}:{:06.3}",
        micros / 60_000_000,
        (micros % 60_000_000) as f64 / 1_000_000.0
    );
    Ok(())
}

fn main() -> Result<()> {
    let matches = Command::new("tickchart")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Rhythm-game chart converter")
        .arg(
            Arg::new("input")
                .help("Input chart (.chart)")
                .required(true)
                .value_name("INPUT_FILE")
                .index(1),
        )
        .arg(
            Arg::new("output")
                .help("Output file (.chart, .bars or .mid)")
                .value_name("OUTPUT_FILE")
                .index(2),
        )
        .arg(
            Arg::new("verbose")
                .help("Enable verbose output")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("skip-prompts")
                .help("Use defaults for missing format settings without reporting them")
                .long("skip-prompts")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("metadata")
                .help("Format-specific setting for the output format (e.g. MIDI base key)")
                .long("metadata")
                .value_name("VALUE"),
        )
        .arg(
            Arg::new("info")
                .help("Print a summary of the input chart")
                .long("info")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let input_file = matches
        .get_one::<String>("input")
        .context("No input file given")?;
    let output_file = matches.get_one::<String>("output");
    let verbose = matches.get_flag("verbose");

    init_tracing(verbose);

    let options = ExportOptions {
        skip_prompts: matches.get_flag("skip-prompts"),
        metadata: matches.get_one::<String>("metadata").cloned(),
    };

    let input_format = detect_file_format(input_file)
        .with_context(|| format!("Failed to detect input file format: {}", input_file))?;
    if input_format != FileFormat::Chart {
        bail!("Only .chart files can be read, got {}", input_file);
    }

    debug!(input = %input_file, "reading chart");
    let content = std::fs::read_to_string(input_file)
        .with_context(|| format!("Failed to read input file: {}", input_file))?;
    let book = ChartTextFormat
        .import(&content, &mut TracingDiagnostics)
        .with_context(|| format!("Failed to parse chart file: {}", input_file))?;

    if matches.get_flag("info") {
        print_info(&book)?;
    }

    let Some(output_file) = output_file else {
        return Ok(());
    };

    let output_format = detect_file_format(output_file)
        .with_context(|| format!("Failed to detect output file format: {}", output_file))?;

    let mut buffer = Vec::new();
    if output_format == FileFormat::Chart {
        // plain save keeps charts whose meters do not resolve
        ChartTextFormat::save(&book, &mut buffer)?;
    } else {
        let mut encoder = encoder_for(&output_format)?;
        let summary = export(
            &book,
            encoder.as_mut(),
            &mut buffer,
            &options,
            &mut TracingDiagnostics,
        )
        .with_context(|| format!("Failed to export {}", output_file))?;
        info!(
            format = %summary.format,
            items = summary.items,
            bars = summary.bars,
            metadata = ?summary.metadata,
            "exported"
        );
    }

    std::fs::write(output_file, buffer)
        .with_context(|| format!("Failed to write output file: {}", output_file))?;

    Ok(())
}
