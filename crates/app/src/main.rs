use std::{
    f32::consts::PI,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use mouthsync_core::{
    AppConfig, AudioEngine, LevelMeter, LipsyncAnalyzer, MorphAnimator, MorphWeights,
    MouthsyncError,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

fn main() -> mouthsync_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Analyze {
            input,
            frame_length,
            fps,
        } => run_analyze(
            &input,
            frame_length.unwrap_or(config.audio.frame_length),
            fps,
            &config,
        ),
        Commands::Tone {
            frequency,
            amplitude,
            frames,
            frame_length,
            sample_rate,
        } => run_tone(
            frequency,
            amplitude,
            frames,
            frame_length.unwrap_or(config.audio.frame_length),
            sample_rate.unwrap_or(config.audio.sample_rate),
            &config,
        ),
    }
}

/// One line of `analyze` output.
#[derive(Serialize)]
struct FrameReport {
    time: f32,
    level: f32,
    weights: MorphWeights,
    animated: MorphWeights,
}

fn run_analyze(
    input: &Path,
    frame_length: usize,
    fps: f32,
    config: &AppConfig,
) -> mouthsync_core::Result<()> {
    if frame_length == 0 {
        return Err(MouthsyncError::InvalidFrameLength(frame_length));
    }

    let mut reader = hound::WavReader::open(input).map_err(wav_error)?;
    let spec = reader.spec();
    tracing::info!(
        ?input,
        sample_rate = spec.sample_rate,
        channels = spec.channels,
        frame_length,
        "analysing wav file"
    );

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(wav_error)?,
        hound::SampleFormat::Int => {
            let scale = (1u64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|sample| sample.map(|value| value as f32 / scale))
                .collect::<Result<_, _>>()
                .map_err(wav_error)?
        }
    };

    let audio = AudioEngine::new(config.analyzer.clone());
    let mut meter = LevelMeter::new();
    let mut animator = MorphAnimator::new(config.animation.clone());

    let frame_seconds = frame_length as f32 / spec.sample_rate.max(1) as f32;
    let display_step = if fps > 0.0 { 1.0 / fps } else { frame_seconds };
    let mut pending = 0.0;
    let mut processed = 0usize;
    let mut skipped = 0usize;

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let span = frame_length * spec.channels.max(1) as usize;

    for (index, chunk) in samples.chunks(span).enumerate() {
        let level = meter.observe(chunk);
        let Some(weights) = audio.push_interleaved(chunk, spec.channels, spec.sample_rate)? else {
            skipped += 1;
            continue;
        };
        processed += 1;

        animator.submit(&weights);
        pending += frame_seconds;
        while pending >= display_step {
            animator.tick(display_step);
            pending -= display_step;
        }

        let report = FrameReport {
            time: index as f32 * frame_seconds,
            level,
            weights,
            animated: *animator.current(),
        };
        serde_json::to_writer(&mut out, &report)?;
        writeln!(out)?;
    }

    out.flush()?;
    tracing::info!(processed, skipped, "analysis finished");
    Ok(())
}

fn run_tone(
    frequency: f32,
    amplitude: f32,
    frames: usize,
    frame_length: usize,
    sample_rate: u32,
    config: &AppConfig,
) -> mouthsync_core::Result<()> {
    tracing::info!(frequency, amplitude, frames, frame_length, sample_rate, "synthesising tone");

    let mut analyzer = LipsyncAnalyzer::new(config.analyzer.clone());
    let mut frame = vec![0.0; frame_length];
    let mut weights = None;
    let step = 2.0 * PI * frequency / sample_rate.max(1) as f32;
    let mut phase = 0.0f32;

    for _ in 0..frames {
        for sample in frame.iter_mut() {
            *sample = amplitude * phase.sin();
            phase = (phase + step) % (2.0 * PI);
        }
        weights = analyzer.process_frame(&frame, sample_rate).or(weights);
    }

    let Some(weights) = weights else {
        return Err(MouthsyncError::msg("no frame produced morph weights"));
    };

    let smoothed = analyzer.smoothed();
    tracing::info!(
        volume = smoothed.volume,
        zero_crossing_rate = smoothed.zero_crossing_rate,
        centroid_hz = smoothed.centroid_hz,
        rolloff_hz = smoothed.rolloff_hz,
        dominant = %weights.dominant(),
        "tone analysed"
    );

    println!("{}", serde_json::to_string(&weights)?);
    Ok(())
}

fn wav_error(err: hound::Error) -> MouthsyncError {
    MouthsyncError::msg(format!("wav decoding failed: {err}"))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(name = "mouthsync", author, version, about = "Audio-driven mouth morph weights", long_about = None)]
struct Cli {
    /// Optional JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyse a WAV file and print one JSON line per frame.
    Analyze {
        /// Path to the WAV file.
        input: PathBuf,
        /// Samples per channel in each analysed frame.
        #[arg(long)]
        frame_length: Option<usize>,
        /// Display rate used to tick the animator.
        #[arg(long, default_value_t = 60.0)]
        fps: f32,
    },
    /// Run a synthetic sine through the analyzer and print the final weights.
    Tone {
        /// Tone frequency in Hz.
        #[arg(long)]
        frequency: f32,
        /// Peak amplitude.
        #[arg(long, default_value_t = 0.3)]
        amplitude: f32,
        /// Number of frames to generate.
        #[arg(long, default_value_t = 50)]
        frames: usize,
        #[arg(long)]
        frame_length: Option<usize>,
        #[arg(long)]
        sample_rate: Option<u32>,
    },
}
