use super::chunk::AudioWindow;

/// Peak amplitude at or below which a window is treated as silence
pub const DEFAULT_QUIETNESS_FLOOR: f32 = 0.001;

/// Target peak amplitude after normalization
pub const DEFAULT_HEADROOM: f32 = 0.95;

/// DC removal and peak normalization for sealed windows
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    quietness_floor: f32,
    headroom: f32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_QUIETNESS_FLOOR, DEFAULT_HEADROOM)
    }
}

impl Preprocessor {
    pub fn new(quietness_floor: f32, headroom: f32) -> Self {
        Self {
            quietness_floor,
            headroom,
        }
    }

    pub fn headroom(&self) -> f32 {
        self.headroom
    }

    pub fn quietness_floor(&self) -> f32 {
        self.quietness_floor
    }

    /// Remove the mean, then scale the peak to `headroom`
    ///
    /// Windows whose peak after DC removal is at or below the quietness floor
    /// are returned unscaled. A constant window comes back as all zeros.
    pub fn process(&self, window: &AudioWindow) -> AudioWindow {
        let samples = window.samples();
        if samples.is_empty() {
            return window.clone();
        }

        let (min, max) = samples
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
                (lo.min(s), hi.max(s))
            });
        if min == max {
            return window.with_samples(vec![0.0; samples.len()]);
        }

        // Accumulate in f64 so long windows don't drift
        let mean = (samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64) as f32;
        let mut centered: Vec<f32> = samples.iter().map(|&s| s - mean).collect();

        let peak = centered.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
        if peak > self.quietness_floor {
            let gain = self.headroom / peak;
            for sample in centered.iter_mut() {
                *sample = (*sample * gain).clamp(-self.headroom, self.headroom);
            }
        }

        window.with_samples(centered)
    }
}
