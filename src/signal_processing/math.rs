/// Mean of a sample slice; zero when empty.
pub fn mean(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<f32>() / samples.len() as f32
}

/// Population variance of a sample slice; zero when empty.
pub fn population_variance(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let m = mean(samples);
    samples.iter().map(|x| (x - m) * (x - m)).sum::<f32>() / samples.len() as f32
}

/// Population standard deviation of a sample slice.
pub fn population_std_dev(samples: &[f32]) -> f32 {
    population_variance(samples).sqrt()
}

/// Value at the given percentile (0.0–1.0) of the slice, by nearest-rank on
/// a sorted copy. Zero when empty.
pub fn percentile(samples: &[f32], p: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = ((sorted.len() - 1) as f32 * p.clamp(0.0, 1.0)).round() as usize;
    sorted[rank]
}

/// Mean of the largest `fraction` of the slice (at least one element).
pub fn top_fraction_mean(samples: &[f32], fraction: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let count = ((sorted.len() as f32 * fraction).ceil() as usize).clamp(1, sorted.len());
    mean(&sorted[..count])
}

/// Centered 5-point numerical derivative.
///
/// `d[n] = (2(x[n+1] − x[n−1]) + x[n+2] − x[n−2]) / 8`, with the two samples
/// at each edge held at zero. Output length matches the input.
pub fn derivative_five_point(samples: &[f32]) -> Vec<f32> {
    let n = samples.len();
    let mut out = vec![0.0; n];
    if n < 5 {
        return out;
    }
    for i in 2..n - 2 {
        out[i] =
            (2.0 * (samples[i + 1] - samples[i - 1]) + samples[i + 2] - samples[i - 2]) / 8.0;
    }
    out
}

/// Trailing moving-window mean (integration). Each output sample is the mean
/// of the preceding `window` input samples (fewer near the start).
pub fn moving_window_mean(samples: &[f32], window: usize) -> Vec<f32> {
    let window = window.max(1);
    let mut out = Vec::with_capacity(samples.len());
    let mut sum = 0.0f32;
    for (i, &x) in samples.iter().enumerate() {
        sum += x;
        if i >= window {
            sum -= samples[i - window];
        }
        let count = (i + 1).min(window);
        out.push(sum / count as f32);
    }
    out
}

/// Indices of strict local maxima: rising into the sample, not rising out of
/// it. Flat signals yield no maxima.
pub fn local_maxima(samples: &[f32]) -> Vec<usize> {
    let mut maxima = Vec::new();
    for i in 1..samples.len().saturating_sub(1) {
        if samples[i] > samples[i - 1] && samples[i] >= samples[i + 1] {
            maxima.push(i);
        }
    }
    maxima
}

/// Simple moving average filter
///
/// Computes the arithmetic mean of the last N values in a sliding window.
/// Used to smooth BPM measurements before the slew limiter.
pub struct MovingAverage {
    buffer: Vec<f32>,
    index: usize,
    filled: bool,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> Self {
        Self {
            buffer: vec![0.0; window_size],
            index: 0,
            filled: false,
        }
    }

    /// Add a new value and return the updated average.
    pub fn add(&mut self, value: f32) -> f32 {
        self.buffer[self.index] = value;
        self.index = (self.index + 1) % self.buffer.len();

        if self.index == 0 {
            self.filled = true;
        }

        self.average()
    }

    /// Current average of the values in the window.
    pub fn average(&self) -> f32 {
        let sum: f32 = self.buffer.iter().sum();
        let count = if self.filled {
            self.buffer.len()
        } else {
            self.index.max(1)
        };
        sum / count as f32
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.index = 0;
        self.filled = false;
    }
}
