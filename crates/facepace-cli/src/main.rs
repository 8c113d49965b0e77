use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use facepace_core::annotator::{MistralAnnotator, MockAnnotator, SemanticAnnotator};
use facepace_core::sink::{JsonLinesSink, NullSink, ResultSink};
use facepace_core::{
    EstimationRequest, FacepaceConfig, FrameSequence, Orchestrator, RecordedPulseSource, VideoRef,
};
use facepace_signals::FilterPolicy;

#[derive(Parser)]
#[command(name = "facepace", about = "Biometric estimation from face video signals")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the filter policy chosen for a stream
    Policy {
        #[arg(long)]
        fps: f64,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },
    /// Run the full estimation on a recorded pulse waveform and frame images
    Analyze {
        /// Pulse recording (JSON with fps, width, height, values[, times])
        #[arg(long)]
        waveform: PathBuf,
        /// Directory of decoded frames (png / jpeg), sorted by name
        #[arg(long)]
        frames: PathBuf,
        #[arg(long)]
        image_url: String,
        #[arg(long)]
        age: u32,
        /// TOML configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Use the offline mock annotator instead of the hosted model
        #[arg(long)]
        mock_annotator: bool,
        /// Append the result to this JSON-lines file
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

const DEFAULT_LOG_DIRECTIVES: &str = "facepace_core=info,facepace_signals=info";

/// `RUST_LOG` wins when set; otherwise log both library crates at info.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    match rust_log {
        Some(directives) if !directives.trim().is_empty() => EnvFilter::new(directives),
        _ => EnvFilter::new(DEFAULT_LOG_DIRECTIVES),
    }
}

fn init_logging() {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    fmt()
        .with_env_filter(log_filter(rust_log.as_deref()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Policy { fps, width, height } => {
            let policy = FilterPolicy::select(fps, width, height);
            println!("{}", serde_json::to_string_pretty(&policy)?);
        }
        Commands::Analyze {
            waveform,
            frames,
            image_url,
            age,
            config,
            mock_annotator,
            out,
        } => {
            let config = match config {
                Some(path) => FacepaceConfig::from_file_with_env(path)?,
                None => FacepaceConfig::load_layered(None, None)?,
            };

            let recording = RecordedPulseSource::load(&waveform)?;
            let frame_source = FrameSequence::from_image_dir(&frames, recording.fps)?;
            info!(frames = frame_source.len(), fps = recording.fps, "inputs loaded");

            let annotator: Arc<dyn SemanticAnnotator> = if mock_annotator {
                Arc::new(MockAnnotator::new())
            } else {
                Arc::new(MistralAnnotator::from_config(&config.annotator)?)
            };

            let sink: Arc<dyn ResultSink> = match out.or_else(|| config.sink.path.clone()) {
                Some(path) => Arc::new(JsonLinesSink::new(path)),
                None => Arc::new(NullSink),
            };

            let orchestrator = Orchestrator::new(
                &config,
                Arc::new(RecordedPulseSource::new()),
                Arc::new(frame_source),
                annotator,
                sink,
            )?;

            let request = EstimationRequest::new(
                VideoRef::new(waveform.to_string_lossy()),
                image_url,
                age,
            );
            let result = orchestrator.run(&request)?;
            println!("{}", serde_json::to_string_pretty(&result.to_flat_map())?);
        }
    }
    Ok(())
}
