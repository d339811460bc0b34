//! Audio Format Converter - Essential functions only

use ndarray::{Array1, ArrayView1};
use crate::error::{AlignerError, Result};

pub struct AudioConverter;

impl AudioConverter {
    /// Convert a mono signal between sample rates using linear interpolation
    pub fn convert_sample_rate(data: ArrayView1<f32>, source_rate: u32, target_rate: u32) -> Result<Array1<f32>> {
        if source_rate == 0 || target_rate == 0 {
            return Err(AlignerError::audio("Sample rate cannot be 0"));
        }
        if source_rate == target_rate || data.is_empty() {
            return Ok(data.to_owned());
        }

        let ratio = target_rate as f64 / source_rate as f64;
        let new_length = (data.len() as f64 * ratio) as usize;
        Self::resample_mono(data, new_length, ratio)
    }

    /// Keep at most `max_seconds` of audio; 0 means unbounded
    pub fn truncate_duration(data: Array1<f32>, sample_rate: u32, max_seconds: f64) -> Array1<f32> {
        if max_seconds <= 0.0 {
            return data;
        }
        let limit = (max_seconds * sample_rate as f64) as usize;
        if data.len() <= limit {
            data
        } else {
            data.slice(ndarray::s![..limit]).to_owned()
        }
    }

    fn resample_mono(data: ArrayView1<f32>, new_length: usize, ratio: f64) -> Result<Array1<f32>> {
        if data.is_empty() {
            return Err(AlignerError::audio("Input data is empty"));
        }

        let old_length = data.len();
        let mut new_data = Array1::zeros(new_length);

        for (i, sample) in new_data.iter_mut().enumerate() {
            let old_pos = i as f64 / ratio;
            let old_index = old_pos.floor() as usize;
            let fraction = old_pos - old_index as f64;

            *sample = if old_index >= old_length - 1 {
                data[old_length - 1]
            } else {
                data[old_index] + (data[old_index + 1] - data[old_index]) * fraction as f32
            };
        }

        Ok(new_data)
    }
}
