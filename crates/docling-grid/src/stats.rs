// Intentional ML conversions: pixel counts to float denominators
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

//! Dataset channel statistics
//!
//! Estimates the `image_mean` / `image_std` config values from a set of
//! `[3, H, W]` images in `[0, 1]`: the mean over images of each image's
//! channel mean, and the mean over images of each image's (unbiased) channel
//! standard deviation.

use crate::error::{GridError, Result};
use ndarray::{Array3, Axis};
use serde::Serialize;

/// Per-channel mean and std
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChannelStats {
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub images: usize,
}

/// Running accumulator for [`ChannelStats`]
#[derive(Debug, Clone, Default)]
pub struct ChannelStatsAccumulator {
    mean_sum: [f64; 3],
    std_sum: [f64; 3],
    images: usize,
}

impl ChannelStatsAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one image's per-channel mean and std
    pub fn push(&mut self, image: &Array3<f32>) -> Result<()> {
        let channels = image.len_of(Axis(0));
        if channels != 3 {
            return Err(GridError::invalid_input(format!(
                "expected 3 image channels, got {channels}"
            )));
        }
        if image.len() == 0 {
            return Err(GridError::invalid_input("image has zero area"));
        }

        for (c, plane) in image.axis_iter(Axis(0)).enumerate() {
            let n = plane.len() as f64;
            let mean = plane.iter().map(|&v| f64::from(v)).sum::<f64>() / n;
            let var = if plane.len() > 1 {
                plane
                    .iter()
                    .map(|&v| (f64::from(v) - mean).powi(2))
                    .sum::<f64>()
                    / (n - 1.0)
            } else {
                0.0
            };
            self.mean_sum[c] += mean;
            self.std_sum[c] += var.sqrt();
        }
        self.images += 1;
        Ok(())
    }

    /// Average the accumulated per-image statistics
    pub fn finish(&self) -> Result<ChannelStats> {
        if self.images == 0 {
            return Err(GridError::invalid_input(
                "cannot compute channel statistics of zero images",
            ));
        }
        let n = self.images as f64;
        Ok(ChannelStats {
            mean: self.mean_sum.map(|s| (s / n) as f32),
            std: self.std_sum.map(|s| (s / n) as f32),
            images: self.images,
        })
    }
}

/// Channel statistics of a set of images
pub fn channel_mean_std(images: &[Array3<f32>]) -> Result<ChannelStats> {
    let mut acc = ChannelStatsAccumulator::new();
    for image in images {
        acc.push(image)?;
    }
    acc.finish()
}
