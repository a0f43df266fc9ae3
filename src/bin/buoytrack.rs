use anyhow::Context;
use buoytrack::cv::{CaptureSource, HighGui, Recorder};
use buoytrack::log_writer::{session_name, SessionLog};
use buoytrack::video::{estimate_fps, VideoSource};
use buoytrack::{Session, TrackerConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Track a rescue buoy by color and record where it went
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Camera index or video file
    #[arg(short, long, default_value = "0")]
    source: String,

    /// Directory for the recording and the session log
    #[arg(short, long, default_value = "output")]
    output: PathBuf,

    /// JSON file with tracker settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run without windows
    #[arg(long)]
    headless: bool,

    /// Do not write the annotated video
    #[arg(long)]
    no_record: bool,

    /// Recording frame rate, overrides what the source reports
    #[arg(long)]
    fps: Option<f64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("buoytrack=info")))
        .init();

    let args = Args::parse();

    let config = match args.config.as_ref() {
        Some(path) => TrackerConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => TrackerConfig::default(),
    };

    let mut source = CaptureSource::open(&args.source)
        .with_context(|| format!("opening video source {}", args.source))?;

    let name = session_name(&chrono::Local::now());
    tracing::info!("session {}", name);

    let fps = match args.fps {
        Some(fps) => fps,
        None => estimate_fps(&mut source)?,
    };
    tracing::info!("source {:?} at {:.2} fps", source.frame_size(), fps);

    let display = if args.headless {
        None
    } else {
        Some(HighGui::new(&config)?)
    };

    let mut session = Session::new(source, config);

    if let Some(display) = display {
        session.set_display(Box::new(display));
    }

    if !args.no_record {
        std::fs::create_dir_all(&args.output)?;
        let video = args.output.join(format!("{}.avi", name));
        session.set_sink(Box::new(Recorder::new(video.display(), fps)));
    }

    session.set_log(SessionLog::create(&args.output, &name)?);

    let reason = session.run()?;
    tracing::info!("stopped: {:?}", reason);

    Ok(())
}
