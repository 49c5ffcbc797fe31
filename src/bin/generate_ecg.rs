//! Synthetic ECG recording generator.
//!
//! Writes a clean or noise-corrupted single-channel recording to WAV or
//! CSV for exercising the monitor without hardware.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use sinusoid::simulation::{BeatMorphology, NoiseConfig, apply_noise, generate_ecg_with};

#[derive(Parser, Debug)]
#[command(name = "generate_ecg")]
#[command(about = "Generate synthetic ECG recordings", long_about = None)]
struct Args {
    /// Output file (.wav or .csv)
    output: PathBuf,

    /// Recording length in seconds
    #[arg(short = 'd', long, default_value = "60")]
    duration: f32,

    /// Heart rate in BPM
    #[arg(short = 'b', long, default_value = "75")]
    bpm: f32,

    /// Sample rate in Hz
    #[arg(short = 'r', long, default_value = "250")]
    sample_rate: f32,

    /// Sinusoidal RR modulation depth (fraction of the beat period)
    #[arg(long, default_value = "0.0")]
    rr_modulation: f32,

    /// Gaussian noise sigma (0 disables)
    #[arg(long, default_value = "0.0")]
    noise_sigma: f32,

    /// Baseline wander amplitude (0 disables)
    #[arg(long, default_value = "0.0")]
    baseline_amplitude: f32,

    /// Mains hum amplitude at 50 Hz (0 disables)
    #[arg(long, default_value = "0.0")]
    mains_amplitude: f32,

    /// RNG seed for reproducible noise
    #[arg(long, default_value = "0")]
    seed: u64,

    /// TOML file describing the noise model (overrides the flags above)
    #[arg(short = 'c', long)]
    noise_config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut signal = generate_ecg_with(
        args.duration,
        args.sample_rate,
        args.bpm,
        &BeatMorphology::default(),
        args.rr_modulation,
    );

    let noise = build_noise_config(&args)?;
    apply_noise(&mut signal, args.sample_rate, &noise);

    let extension = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "wav" => write_wav(&args.output, &signal, args.sample_rate)?,
        "csv" | "txt" => write_csv(&args.output, &signal)?,
        other => anyhow::bail!("unsupported output format: {other:?}"),
    }

    log::info!(
        "wrote {} samples ({:.1} s at {} Hz) to {}",
        signal.len(),
        args.duration,
        args.sample_rate,
        args.output.display()
    );
    Ok(())
}

fn build_noise_config(args: &Args) -> anyhow::Result<NoiseConfig> {
    if let Some(path) = &args.noise_config {
        let content = std::fs::read_to_string(path).context("reading noise config")?;
        return toml::from_str(&content).context("parsing noise config");
    }

    let mut noise = NoiseConfig::default().with_seed(args.seed);
    if args.noise_sigma > 0.0 {
        noise = noise.with_awgn(args.noise_sigma);
    }
    if args.baseline_amplitude > 0.0 {
        noise = noise.with_baseline_wander(args.baseline_amplitude, 0.3);
    }
    if args.mains_amplitude > 0.0 {
        noise = noise.with_mains_hum(args.mains_amplitude, 50.0);
    }
    Ok(noise)
}

fn write_wav(path: &PathBuf, signal: &[f32], sample_rate: f32) -> anyhow::Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate as u32,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for &sample in signal {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

fn write_csv(path: &PathBuf, signal: &[f32]) -> anyhow::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for sample in signal {
        writeln!(writer, "{sample}")?;
    }
    Ok(())
}
