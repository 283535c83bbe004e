//! Linear-interpolation sample rate conversion.

pub struct LinearResampler {
    ratio: f64,
    phase: f64,
}

impl LinearResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        Self {
            ratio: input_rate as f64 / output_rate.max(1) as f64,
            phase: 0.0,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Fills `output` by reading `input` from the current phase. The read position
    /// clamps at the last input sample, so a short input repeats its tail.
    /// Returns the number of samples written.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) -> usize {
        if input.is_empty() {
            output.fill(0.0);
            return 0;
        }
        let max_index = (input.len() - 1) as f64;
        let mut input_index = self.phase.min(max_index);
        for sample in output.iter_mut() {
            let index_floor = input_index.floor();
            let frac = (input_index - index_floor) as f32;
            let idx = index_floor as usize;
            *sample = if idx + 1 >= input.len() {
                input[idx]
            } else {
                input[idx] * (1.0 - frac) + input[idx + 1] * frac
            };
            input_index = (input_index + self.ratio).min(max_index);
        }
        self.phase = input_index - input_index.floor();
        output.len()
    }
}

/// Number of output frames produced when converting `frames` from `input_rate`
/// to `output_rate`.
pub fn output_len(frames: usize, input_rate: u32, output_rate: u32) -> usize {
    if input_rate == 0 {
        return 0;
    }
    ((frames as u128 * output_rate as u128 + input_rate as u128 - 1) / input_rate as u128) as usize
}

/// Converts a whole channel in one pass.
pub fn resample(input: &[f32], input_rate: u32, output_rate: u32) -> Vec<f32> {
    if input_rate == output_rate || input.is_empty() {
        return input.to_vec();
    }
    let mut output = vec![0.0; output_len(input.len(), input_rate, output_rate)];
    LinearResampler::new(input_rate, output_rate).process(input, &mut output);
    output
}
