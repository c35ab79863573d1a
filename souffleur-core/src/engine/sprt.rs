//! Leaky log-likelihood-ratio accumulator.
//!
//! A textbook SPRT sums `ln(p) − ln(1−p)` over i.i.d. observations.
//! Recognition frames are anything but i.i.d.: a garbled frame should stop
//! hurting the hypothesis once clean frames follow. The running value is
//! therefore decayed before every update. The decay factor is an explicit
//! knob; 1.0 recovers the strict accumulator.

/// Decayed accumulator of frame log-likelihood ratios.
#[derive(Debug, Clone)]
pub struct LlrAccumulator {
    value: f64,
    decay: f64,
}

impl LlrAccumulator {
    /// `decay` is clamped into (0, 1]; 1.0 disables forgetting.
    pub fn new(decay: f64) -> Self {
        Self {
            value: 0.0,
            decay: decay.clamp(f64::MIN_POSITIVE, 1.0),
        }
    }

    /// Fold one frame probability into the accumulator and return the new
    /// value. `p` must already be clipped away from 0 and 1 by the scorer.
    pub fn update(&mut self, p: f64) -> f64 {
        self.value = self.value * self.decay + p.ln() - (1.0 - p).ln();
        self.value
    }

    /// Current accumulated LLR.
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Back to the neutral state.
    pub fn reset(&mut self) {
        self.value = 0.0;
    }

    /// Confidence in [0, 1]: logistic squash of the accumulated LLR.
    pub fn confidence(&self) -> f64 {
        1.0 / (1.0 + (-self.value).exp())
    }
}
