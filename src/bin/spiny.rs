use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use serde::Serialize;

use spiny::coefficients::{load_coefficients, select_bins, truncate_to_common, write_map, BinRange};
use spiny::config::AppConfig;
use spiny::engine::{CpalBackend, OutputBackend, OutputDevice, PlaybackEngine};
use spiny::similarity::{smooth, MapSummary, Nsim};
use spiny::{audio, PlaybackEvent};

#[derive(Parser, Debug)]
#[command(
    name = "spiny",
    about = "Spectrogram similarity scoring and audio playback"
)]
struct Cli {
    /// JSON configuration file (defaults are used when omitted or unreadable)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two raw float32 coefficient files with NSIM
    Compare {
        reference: PathBuf,
        other: PathBuf,
        /// Bins per frame
        #[arg(long)]
        dim: Option<usize>,
        #[arg(long)]
        start_bin: Option<usize>,
        #[arg(long)]
        end_bin: Option<usize>,
        /// Smooth both matrices with the NSIM window first
        #[arg(long)]
        smooth: bool,
        /// Threshold for the summary proportion and masked mean
        #[arg(long)]
        threshold: Option<f64>,
        /// Include the per-frame similarity curve in the report
        #[arg(long)]
        profile: bool,
        /// Write the similarity map as raw float32
        #[arg(long)]
        map_output: Option<PathBuf>,
    },
    /// Play a WAV file (or a time range of it)
    Play {
        wav: PathBuf,
        #[arg(long, default_value_t = 0.0)]
        start: f64,
        #[arg(long)]
        end: Option<f64>,
        #[arg(long = "loop")]
        looping: bool,
        #[arg(long)]
        volume: Option<f32>,
        #[arg(long)]
        device: Option<String>,
    },
    /// List output devices
    Devices,
}

fn main() -> ExitCode {
    spiny::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let config = cli
        .config
        .as_deref()
        .map(AppConfig::load_from_file)
        .unwrap_or_default();

    match cli.command {
        Commands::Compare {
            reference,
            other,
            dim,
            start_bin,
            end_bin,
            smooth,
            threshold,
            profile,
            map_output,
        } => {
            let options = CompareOptions {
                dim: dim.unwrap_or(config.comparison.dim),
                start_bin,
                end_bin,
                smooth: smooth || config.comparison.smooth,
                threshold: threshold.unwrap_or(config.comparison.summary_threshold),
                frameshift: config.comparison.frameshift,
                profile,
                map_output,
            };
            run_compare(&reference, &other, &options)
        }
        Commands::Play {
            wav,
            start,
            end,
            looping,
            volume,
            device,
        } => {
            let mut playback = config.playback;
            if let Some(volume) = volume {
                playback.volume = volume;
            }
            if device.is_some() {
                playback.device = device;
            }
            let engine = PlaybackEngine::with_default_backend(playback);
            run_play(&engine, &wav, start, end, looping)
        }
        Commands::Devices => run_devices(&CpalBackend::new()),
    }
}

struct CompareOptions {
    dim: usize,
    start_bin: Option<usize>,
    end_bin: Option<usize>,
    smooth: bool,
    threshold: f64,
    frameshift: f64,
    profile: bool,
    map_output: Option<PathBuf>,
}

fn run_compare(reference: &Path, other: &Path, options: &CompareOptions) -> Result<ExitCode> {
    let a = load_coefficients(reference, options.dim)
        .with_context(|| format!("loading {}", reference.display()))?;
    let b = load_coefficients(other, options.dim)
        .with_context(|| format!("loading {}", other.display()))?;
    let (a, b) = truncate_to_common(&a.view(), &b.view());

    let range = BinRange::resolve(options.start_bin, options.end_bin, options.dim)?;
    let (mut a, mut b) = if range.is_full(options.dim) {
        (a, b)
    } else {
        (select_bins(&a.view(), range)?, select_bins(&b.view(), range)?)
    };
    if options.smooth {
        a = smooth(&a.view());
        b = smooth(&b.view());
    }

    let result = Nsim::new().compute(a.view(), b.view())?;
    if let Some(path) = &options.map_output {
        write_map(path, &result.map.view())
            .with_context(|| format!("writing {}", path.display()))?;
    }

    // Map row i is centred on input frame i + 1.
    let profile = options.profile.then(|| {
        result
            .frame_profile()
            .iter()
            .enumerate()
            .map(|(i, &value)| ProfilePoint {
                time: (i + 1) as f64 * options.frameshift,
                value,
            })
            .collect()
    });

    let report = CompareReport {
        reference: reference.display().to_string(),
        other: other.display().to_string(),
        frames: a.nrows(),
        bins: range,
        smoothed: options.smooth,
        score: result.score,
        summary: result.summary(options.threshold),
        profile,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::from(0))
}

fn run_play(
    engine: &PlaybackEngine,
    wav: &Path,
    start: f64,
    end: Option<f64>,
    looping: bool,
) -> Result<ExitCode> {
    let buffer =
        audio::load_wav(wav).with_context(|| format!("loading {}", wav.display()))?;
    engine.load_buffer(buffer)?;
    engine.set_looping(looping);

    let mut events = engine.event_stream();
    engine.play(start, end)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("creating tokio runtime")?;

    let outcome = runtime.block_on(async move {
        while let Some(event) = events.next().await {
            match event {
                PlaybackEvent::Position { .. } => {}
                PlaybackEvent::Error { message } => return Err(message),
                PlaybackEvent::Finished { .. } => return Ok(()),
                other => eprintln!("{}", serde_json::to_string(&other).unwrap_or_default()),
            }
        }
        Ok(())
    });

    if let Err(message) = outcome {
        bail!("playback failed: {message}");
    }
    Ok(ExitCode::from(0))
}

fn run_devices(backend: &dyn OutputBackend) -> Result<ExitCode> {
    let devices: Vec<OutputDevice> = backend.devices()?;
    if devices.is_empty() {
        println!("No output devices found");
        return Ok(ExitCode::from(0));
    }
    println!("{}", serde_json::to_string_pretty(&devices)?);
    Ok(ExitCode::from(0))
}

#[derive(Serialize)]
struct CompareReport {
    reference: String,
    other: String,
    frames: usize,
    bins: BinRange,
    smoothed: bool,
    score: f64,
    summary: MapSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile: Option<Vec<ProfilePoint>>,
}

#[derive(Serialize)]
struct ProfilePoint {
    time: f64,
    value: f64,
}
