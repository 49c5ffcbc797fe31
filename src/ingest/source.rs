use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use hound::WavReader;

/// A source of normalized ECG sample batches.
///
/// Batches arrive at irregular but bounded sizes; `None` marks the end of
/// the stream. Live device transport is an external collaborator; the
/// sources here replay recordings.
pub trait SampleSource: Send {
    fn next_batch(&mut self) -> anyhow::Result<Option<Vec<f32>>>;
    fn sample_rate(&self) -> u32;
}

/// Replays a mono WAV recording in fixed-size chunks.
pub struct WavFileSource {
    samples: Vec<f32>,
    position: usize,
    chunk_size: usize,
    sample_rate: u32,
}

impl WavFileSource {
    pub fn new<P: AsRef<Path>>(path: P, chunk_size: usize) -> anyhow::Result<Self> {
        let reader = WavReader::open(path.as_ref())?;
        let spec = reader.spec();

        if spec.channels != 1 {
            anyhow::bail!("Expected mono WAV file, got {} channels", spec.channels);
        }

        let sample_rate = spec.sample_rate;
        let samples = Self::read_samples(reader, &spec)?;

        Ok(Self {
            samples,
            position: 0,
            chunk_size,
            sample_rate,
        })
    }

    fn read_samples(
        mut reader: WavReader<BufReader<File>>,
        spec: &hound::WavSpec,
    ) -> anyhow::Result<Vec<f32>> {
        let samples = match spec.sample_format {
            hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = 2_i32.pow(spec.bits_per_sample as u32 - 1) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(samples)
    }
}

impl SampleSource for WavFileSource {
    fn next_batch(&mut self) -> anyhow::Result<Option<Vec<f32>>> {
        if self.position >= self.samples.len() {
            return Ok(None);
        }
        let end = (self.position + self.chunk_size).min(self.samples.len());
        let chunk = self.samples[self.position..end].to_vec();
        self.position = end;
        Ok(Some(chunk))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

/// Replays a CSV recording (one sample per line) in fixed-size chunks.
///
/// Lines that do not parse as a float (headers, comments) are skipped
/// with a warning.
pub struct CsvFileSource {
    lines: std::io::Lines<BufReader<File>>,
    chunk_size: usize,
    sample_rate: u32,
    skipped: usize,
}

impl CsvFileSource {
    pub fn new<P: AsRef<Path>>(path: P, chunk_size: usize, sample_rate: u32) -> anyhow::Result<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            chunk_size,
            sample_rate,
            skipped: 0,
        })
    }
}

impl SampleSource for CsvFileSource {
    fn next_batch(&mut self) -> anyhow::Result<Option<Vec<f32>>> {
        let mut chunk = Vec::with_capacity(self.chunk_size);
        for line in self.lines.by_ref() {
            let line = line?;
            match line.trim().parse::<f32>() {
                Ok(value) => chunk.push(value),
                Err(_) => {
                    if self.skipped == 0 {
                        log::warn!("skipping unparseable line: {line:?}");
                    }
                    self.skipped += 1;
                }
            }
            if chunk.len() == self.chunk_size {
                return Ok(Some(chunk));
            }
        }
        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
