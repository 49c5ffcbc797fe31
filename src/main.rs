use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use clap::Parser;
use crossbeam_channel::{bounded, select, tick};
use rolling_stats::Stats;

use sinusoid::config::{EcgConfig, Sex};
use sinusoid::ingest::{CsvFileSource, SampleSource, WavFileSource};
use sinusoid::output::{MonitorReport, OutputFormat, create_formatter};
use sinusoid::processing::EcgProcessor;

#[derive(Parser, Debug)]
#[command(name = "sinusoid")]
#[command(about = "Streaming ECG monitor: heart rate, intervals and HRV from a recording", long_about = None)]
struct Args {
    /// ECG recording to process (.wav mono, or .csv with one sample per line)
    input: PathBuf,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Increase output verbosity
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Sample rate in Hz for CSV input (WAV files carry their own)
    #[arg(long, default_value = "250")]
    sample_rate: u32,

    /// Subject sex for QTc banding
    #[arg(long, value_enum, default_value = "male")]
    sex: Sex,

    /// TOML file with configuration overrides
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Report interval in milliseconds
    #[arg(long, default_value = "1000")]
    report_interval_ms: u64,

    /// Batch size in samples fed to the pipeline per iteration
    #[arg(long, default_value = "50")]
    batch_size: usize,

    /// Replay at recording speed instead of as fast as possible
    #[arg(long)]
    realtime: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_level = match args.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let mut config = match &args.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)?;
            EcgConfig::from_toml_str(&content)?
        }
        None => EcgConfig::default(),
    };
    config.intervals.sex = args.sex;

    let source = open_source(&args, &mut config)?;
    let sample_rate = config.acquisition.sample_rate;

    log::info!(
        "sample rate {} Hz, window {} samples, notch {} Hz",
        sample_rate,
        config.acquisition.buffer_capacity,
        config.filter.notch_hz
    );

    let processor = EcgProcessor::new(config)?;
    run_monitor_loop(source, processor, &args, sample_rate)
}

fn open_source(args: &Args, config: &mut EcgConfig) -> anyhow::Result<Box<dyn SampleSource>> {
    let extension = args
        .input
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match extension.as_str() {
        "wav" => {
            let source = WavFileSource::new(&args.input, args.batch_size)?;
            config.acquisition.sample_rate = source.sample_rate() as f32;
            Ok(Box::new(source))
        }
        "csv" | "txt" => {
            config.acquisition.sample_rate = args.sample_rate as f32;
            Ok(Box::new(CsvFileSource::new(
                &args.input,
                args.batch_size,
                args.sample_rate,
            )?))
        }
        other => anyhow::bail!("unsupported recording format: {other:?}"),
    }
}

/// Single-threaded event loop serializing ingestion and reporting.
///
/// A reader thread feeds batches through a bounded channel; this loop is
/// the only writer to the processor, and the report tick reads snapshots
/// between batches, so no locking is needed anywhere.
fn run_monitor_loop(
    mut source: Box<dyn SampleSource>,
    mut processor: EcgProcessor,
    args: &Args,
    sample_rate: f32,
) -> anyhow::Result<()> {
    let (batch_tx, batch_rx) = bounded::<Vec<f32>>(10);
    let realtime = args.realtime;
    let batch_period = Duration::from_secs_f32(args.batch_size as f32 / sample_rate);

    let reader = thread::spawn(move || -> anyhow::Result<()> {
        while let Some(batch) = source.next_batch()? {
            if realtime {
                thread::sleep(batch_period);
            }
            if batch_tx.send(batch).is_err() {
                break;
            }
        }
        Ok(())
    });

    let formatter = create_formatter(args.format, args.verbose > 0);
    if let Some(header) = formatter.header() {
        println!("{header}");
    }

    let ticker = tick(Duration::from_millis(args.report_interval_ms));
    let mut bpm_stats: Stats<f32> = Stats::new();

    loop {
        select! {
            recv(batch_rx) -> batch => {
                match batch {
                    Ok(batch) => processor.process_batch(&batch),
                    Err(_) => break,
                }
            }
            recv(ticker) -> _ => {
                let report = MonitorReport::from(&processor.snapshot());
                if let Some(bpm) = report.bpm {
                    bpm_stats.update(bpm);
                }
                println!("{}", formatter.format(&report));
            }
        }
    }

    // Final report over whatever remains in the window
    let report = MonitorReport::from(&processor.snapshot());
    if let Some(bpm) = report.bpm {
        bpm_stats.update(bpm);
    }
    println!("{}", formatter.format(&report));

    if bpm_stats.count > 0 {
        log::info!(
            "heart rate over run: mean {:.1} bpm, std {:.2}, range {:.1}-{:.1}",
            bpm_stats.mean,
            bpm_stats.std_dev,
            bpm_stats.min,
            bpm_stats.max
        );
    }

    match reader.join() {
        Ok(result) => result?,
        Err(_) => anyhow::bail!("reader thread panicked"),
    }

    Ok(())
}
