// Rolling window of recent velocity samples for one wheel

use super::error::{DriveError, Result};

/// Fixed-capacity ring buffer of velocity samples.
///
/// Once full, each new sample overwrites the oldest one.
#[derive(Debug, Clone)]
pub struct VelocityHistory {
    samples: Vec<f64>,
    capacity: usize,
    /// Slot the next sample goes into
    head: usize,
}

impl VelocityHistory {
    /// Create an empty history holding at most `capacity` samples (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            head: 0,
        }
    }

    pub fn record(&mut self, sample: f64) {
        if self.samples.len() < self.capacity {
            self.samples.push(sample);
        } else {
            self.samples[self.head] = sample;
        }
        self.head = (self.head + 1) % self.capacity;
    }

    /// Mean of the retained samples
    pub fn average(&self) -> Result<f64> {
        if self.samples.is_empty() {
            return Err(DriveError::EmptyHistory);
        }
        let sum: f64 = self.samples.iter().sum();
        Ok(sum / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.head = 0;
    }

    /// Samples from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let (newer, older) = if self.samples.len() < self.capacity {
            (&self.samples[..], &self.samples[..0])
        } else {
            let (a, b) = self.samples.split_at(self.head);
            (a, b)
        };
        older.iter().chain(newer.iter()).copied()
    }
}

/// Best-effort anti-slip adjustment of a wheel's target velocity.
///
/// Compares `target` against the average of earlier ticks. When the wheel is about
/// to reverse, or drop below half its recent speed, `fraction` of that average is
/// subtracted from the target. The uncorrected target is then recorded, so
/// corrections never feed back into the average.
///
/// This is a heuristic, not a closed-loop controller.
pub fn drift_corrected(target: f64, history: &mut VelocityHistory, fraction: f64) -> f64 {
    let corrected = match history.average() {
        Ok(average) => {
            let reversing = target * average < 0.0;
            let braking = target.abs() < average.abs() / 2.0;
            if reversing || braking {
                target - fraction * average
            } else {
                target
            }
        }
        Err(_) => target,
    };
    history.record(target);
    corrected
}
