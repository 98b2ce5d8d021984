use clap::Parser;
use eyre::{Context, Result};
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::PathBuf;
use trace_convert::config::Config;
use trace_convert::converter::TraceConverter;
use trace_convert::json::JsonTrace;

#[derive(Parser)]
#[command(name = "trace-convert")]
#[command(about = "convert chrome json traces into perfetto protobuf traces")]
#[command(version)]
struct Args {
    #[arg(help = "chrome json trace to convert")]
    input: PathBuf,

    #[arg(
        short,
        long,
        default_value = "trace.perfetto",
        help = "output file for trace data"
    )]
    output: PathBuf,

    #[arg(short, long, help = "configuration file path (toml format)")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config path={}", path.display()))?,
        None => Config::default(),
    };

    let input = fs::read_to_string(&args.input)
        .with_context(|| format!("failed to read trace path={}", args.input.display()))?;
    let events = JsonTrace::parse(&input)
        .with_context(|| format!("failed to parse trace path={}", args.input.display()))?
        .into_events();
    tracing::debug!(events = events.len(), "parsed input trace");

    let file = File::create(&args.output)
        .with_context(|| format!("failed to create output path={}", args.output.display()))?;
    let buffered_writer = BufWriter::with_capacity(config.global.buffer_size, file);
    let mut converter = TraceConverter::new(buffered_writer, config.global.strict);

    let stats = converter.convert_trace(&config, &events)?;
    converter.flush()?;

    tracing::info!(
        events = stats.events,
        threads = stats.threads,
        skipped = stats.skipped,
        output = %args.output.display(),
        "trace converted"
    );
    Ok(())
}
