/// Average-magnitude cutoff used when none is configured.
pub const DEFAULT_THRESHOLD: u32 = 3000;

/// Consecutive loud blocks that must be exceeded before a trigger fires.
pub const DEFAULT_REQUIRED: u32 = 20;

/// Integer mean of `|sample|` over a block, or `None` for an empty block.
///
/// Magnitudes are summed in a `u64`, which holds `len * 32768` for any slice
/// the host can address. The result never exceeds 32768.
pub fn average_magnitude(samples: &[i16]) -> Option<u32> {
    if samples.is_empty() {
        return None;
    }

    let sum: u64 = samples.iter().map(|s| u64::from(s.unsigned_abs())).sum();
    let average = sum / samples.len() as u64;

    Some(average as u32)
}

/// What a single call to [`Detector::observe`] saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    pub average: Option<u32>,
    pub loud: bool,
    pub triggered: bool,
}

impl Observation {
    const EMPTY: Self = Self {
        average: None,
        loud: false,
        triggered: false,
    };
}

/// Sustained-loudness trigger over a stream of PCM blocks.
///
/// A block is loud when its average magnitude is strictly above `threshold`.
/// The detector fires on the block that makes the current loud run longer
/// than `required`, then re-arms from zero. Any quiet block discards the run.
///
/// Blocks must be fed in capture order; the run length is order dependent and
/// the detector has no way to check it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detector {
    threshold: u32,
    required: u32,
    consecutive: u32,
}

impl Detector {
    pub fn new(threshold: u32, required: u32) -> Self {
        Self {
            threshold,
            required,
            consecutive: 0,
        }
    }

    /// Resets the loud-run counter. Safe to call at any time.
    pub fn begin(&mut self) {
        self.consecutive = 0;
    }

    /// Feeds one block and reports whether it completed a sustained run.
    pub fn process(&mut self, samples: &[i16]) -> bool {
        self.observe(samples).triggered
    }

    /// Same state transition as [`process`](Self::process), with the block
    /// average and loudness reported alongside the trigger flag.
    pub fn observe(&mut self, samples: &[i16]) -> Observation {
        let Some(average) = average_magnitude(samples) else {
            return Observation::EMPTY;
        };

        if average <= self.threshold {
            self.consecutive = 0;
            return Observation {
                average: Some(average),
                loud: false,
                triggered: false,
            };
        }

        // Saturates only when required == u32::MAX, which never fires.
        self.consecutive = self.consecutive.saturating_add(1);
        let triggered = self.consecutive > self.required;
        if triggered {
            self.consecutive = 0;
        }

        Observation {
            average: Some(average),
            loud: true,
            triggered,
        }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn required(&self) -> u32 {
        self.required
    }

    /// Length of the current loud run, always within `0..=required`.
    pub fn consecutive(&self) -> u32 {
        self.consecutive
    }
}

impl Default for Detector {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_REQUIRED)
    }
}
