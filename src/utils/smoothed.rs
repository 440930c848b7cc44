use std::fmt::Display;

// -------------------------------------------------------------------------------------------------

/// Exponential smoothed value for click free parameter changes.
///
/// The current value approaches the target with a one-pole low-pass filter, configured by a time
/// constant in seconds. Smoothing is advanced in blocks via [`Self::process`], so the matrix can
/// apply it once per processed audio block instead of per sample frame.
///
/// Changing the time constant or sample rate only retunes the filter coefficient: the current,
/// possibly ramping value is kept intact.
#[derive(Debug, Clone)]
pub struct ExponentialSmoothedValue {
    current: f32,
    target: f32,
    time: f32,
    sample_rate: u32,
    coefficient: f32,
}

impl ExponentialSmoothedValue {
    pub const DEFAULT_TIME: f32 = 0.02;

    pub fn new(value: f32, sample_rate: u32) -> Self {
        Self::with_time(value, Self::DEFAULT_TIME, sample_rate)
    }

    pub fn with_time(value: f32, time: f32, sample_rate: u32) -> Self {
        assert!(time >= 0.0, "Invalid smoothing time");
        assert!(sample_rate > 0, "Invalid sample rate");

        let current = value;
        let target = value;
        let coefficient = Self::coefficient(time, sample_rate);

        ExponentialSmoothedValue {
            current,
            target,
            time,
            sample_rate,
            coefficient,
        }
    }

    /// Access to the current, possibly ramped value.
    #[inline(always)]
    #[must_use]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Access to the target value.
    #[inline(always)]
    #[must_use]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Smoothing time constant in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Test if the current value still needs to move towards the target.
    #[must_use]
    pub fn need_ramp(&self) -> bool {
        const EPSILON: f32 = f32::EPSILON * 100.0;
        (self.target - self.current).abs() > EPSILON
    }

    /// Set current and target to the same value.
    pub fn init(&mut self, value: f32) {
        self.target = value;
        self.current = value;
    }

    /// Set a new target value. The current value starts moving with the next `process` call.
    #[inline]
    pub fn set_target(&mut self, target: f32) {
        self.target = target;
    }

    /// Move the current value instantly to the target.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
    }

    /// Advance the smoother by the given number of sample frames.
    pub fn process(&mut self, num_samples: usize) {
        if !self.need_ramp() || self.coefficient <= 0.0 {
            self.current = self.target;
        } else {
            let decay = self.coefficient.powi(num_samples.min(i32::MAX as usize) as i32);
            self.current = self.target + (self.current - self.target) * decay;
        }
    }

    /// Set a new smoothing time constant in seconds. A time of 0 disables smoothing.
    pub fn set_time(&mut self, time: f32) {
        assert!(time >= 0.0, "Invalid smoothing time");
        self.time = time;
        self.coefficient = Self::coefficient(self.time, self.sample_rate);
    }

    /// Update the sample rate the time constant refers to.
    pub fn set_sample_rate(&mut self, sample_rate: u32) {
        assert!(sample_rate > 0, "Invalid sample rate");
        self.sample_rate = sample_rate;
        self.coefficient = Self::coefficient(self.time, self.sample_rate);
    }

    fn coefficient(time: f32, sample_rate: u32) -> f32 {
        let time_in_samples = time * sample_rate as f32;
        if time_in_samples > f32::EPSILON {
            (-1.0 / time_in_samples).exp()
        } else {
            0.0
        }
    }
}

impl Display for ExponentialSmoothedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.need_ramp() {
            f.write_fmt(format_args!("{}(->{})", self.current(), self.target()))
        } else {
            f.write_fmt(format_args!("{}", self.target()))
        }
    }
}

// -------------------------------------------------------------------------------------------------
