//! Pipeline configuration
//!
//! [`GridConfig`] carries every option the alignment pipeline recognizes.
//! Build one with [`GridConfigBuilder`] or load it from JSON; both paths
//! validate before handing the config out.
//!
//! ```
//! use docling_grid::GridConfigBuilder;
//!
//! # fn main() -> docling_grid::Result<()> {
//! let config = GridConfigBuilder::new()
//!     .train_min_size_candidates(vec![480, 512, 544])
//!     .max_size(960)
//!     .num_classes(5)
//!     .build()?;
//! assert_eq!(config.size_divisible_stride, 32);
//! # Ok(())
//! # }
//! ```

use crate::error::{GridError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Number of pos/neg channels: background, key text, non-key text.
pub const POS_NEG_CLASSES: usize = 3;

/// Default channel mean of the receipt training set (grayscale scans, so all three agree).
pub const DEFAULT_IMAGE_MEAN: [f32; 3] = [0.948_028_86, 0.948_028_86, 0.948_028_86];

/// Default channel std of the receipt training set.
pub const DEFAULT_IMAGE_STD: [f32; 3] = [0.184_003_19, 0.184_003_19, 0.184_003_19];

/// Configuration for [`GridPipeline`](crate::GridPipeline)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Candidate short-edge lengths, one drawn uniformly per sample during training
    pub train_min_size_candidates: Vec<usize>,

    /// Short-edge length used in evaluation and inference
    pub test_min_size: usize,

    /// Cap on the long edge after resizing
    pub max_size: usize,

    /// Padded batch height and width are multiples of this (backbone stride)
    pub size_divisible_stride: usize,

    /// Number of semantic classes, including the catch-all "other" class
    pub num_classes: usize,

    /// Per-channel mean subtracted from `[0, 1]` images
    pub image_mean: [f32; 3],

    /// Per-channel std images are divided by
    pub image_std: [f32; 3],

    /// Token id written into padded sequence positions
    pub pad_token_id: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            train_min_size_candidates: vec![320, 416, 512, 608, 704],
            test_min_size: 512,
            max_size: 800,
            size_divisible_stride: 32,
            num_classes: 7,
            image_mean: DEFAULT_IMAGE_MEAN,
            image_std: DEFAULT_IMAGE_STD,
            pad_token_id: 0,
        }
    }
}

impl GridConfig {
    /// Load and validate a JSON configuration file
    ///
    /// Missing keys fall back to [`GridConfig::default`].
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::debug!("Loaded grid config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parse and validate a JSON configuration string
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every option against the constraints the pipeline relies on
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| Err(GridError::ConfigError { reason });

        if self.train_min_size_candidates.is_empty() {
            return fail("train_min_size_candidates must not be empty".to_string());
        }
        for &candidate in &self.train_min_size_candidates {
            if candidate == 0 || candidate > self.max_size {
                return fail(format!(
                    "train min size candidate {candidate} must be in 1..={}",
                    self.max_size
                ));
            }
        }
        if self.test_min_size == 0 || self.test_min_size > self.max_size {
            return fail(format!(
                "test_min_size {} must be in 1..={}",
                self.test_min_size, self.max_size
            ));
        }
        if self.size_divisible_stride == 0 {
            return fail("size_divisible_stride must be positive".to_string());
        }
        if self.num_classes == 0 {
            return fail("num_classes must be positive".to_string());
        }
        if let Some(c) = self.image_std.iter().position(|&s| s.is_nan() || s <= 0.0) {
            return fail(format!(
                "image_std[{c}] must be positive, got {}",
                self.image_std[c]
            ));
        }
        Ok(())
    }
}

/// Builder for [`GridConfig`]
///
/// Starts from [`GridConfig::default`]; [`build`](Self::build) validates.
#[derive(Debug, Clone, Default)]
pub struct GridConfigBuilder {
    config: GridConfig,
}

impl GridConfigBuilder {
    /// Create a new config builder with defaults
    ///
    /// Default settings:
    /// - Train short edges: 320, 416, 512, 608, 704
    /// - Test short edge: 512, long-edge cap: 800
    /// - Stride: 32
    /// - Classes: 7 (COMPANY, DATE, ADDRESS, TOTAL, TAX, PRODUCT, others)
    #[inline]
    #[must_use = "returns a new builder with default settings"]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the short-edge candidates sampled during training
    #[must_use = "returns the builder with training sizes configured"]
    pub fn train_min_size_candidates(mut self, candidates: Vec<usize>) -> Self {
        self.config.train_min_size_candidates = candidates;
        self
    }

    /// Set the evaluation short edge
    #[inline]
    #[must_use = "returns the builder with the test size configured"]
    pub const fn test_min_size(mut self, size: usize) -> Self {
        self.config.test_min_size = size;
        self
    }

    /// Set the long-edge cap
    #[inline]
    #[must_use = "returns the builder with the max size configured"]
    pub const fn max_size(mut self, size: usize) -> Self {
        self.config.max_size = size;
        self
    }

    /// Set the stride padded batch dimensions must divide by
    #[inline]
    #[must_use = "returns the builder with the stride configured"]
    pub const fn size_divisible_stride(mut self, stride: usize) -> Self {
        self.config.size_divisible_stride = stride;
        self
    }

    /// Set the number of semantic classes
    #[inline]
    #[must_use = "returns the builder with the class count configured"]
    pub const fn num_classes(mut self, num_classes: usize) -> Self {
        self.config.num_classes = num_classes;
        self
    }

    /// Set per-channel normalization statistics
    #[inline]
    #[must_use = "returns the builder with normalization configured"]
    pub const fn normalization(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.config.image_mean = mean;
        self.config.image_std = std;
        self
    }

    /// Set the padding token id
    #[inline]
    #[must_use = "returns the builder with the pad id configured"]
    pub const fn pad_token_id(mut self, id: u32) -> Self {
        self.config.pad_token_id = id;
        self
    }

    /// Validate and return the configuration
    pub fn build(self) -> Result<GridConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GridConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_size, 800);
        assert_eq!(config.test_min_size, 512);
    }

    #[test]
    fn test_builder_overrides() {
        let config = GridConfigBuilder::new()
            .test_min_size(600)
            .max_size(1000)
            .size_divisible_stride(64)
            .num_classes(4)
            .pad_token_id(1)
            .build()
            .unwrap();
        assert_eq!(config.test_min_size, 600);
        assert_eq!(config.size_divisible_stride, 64);
        assert_eq!(config.num_classes, 4);
        assert_eq!(config.pad_token_id, 1);
    }

    #[test]
    fn test_rejects_candidate_above_max() {
        let err = GridConfigBuilder::new()
            .train_min_size_candidates(vec![512, 900])
            .build()
            .unwrap_err();
        assert!(err.is_config_error());
        assert!(err.to_string().contains("900"));
    }

    #[test]
    fn test_rejects_empty_candidates() {
        let err = GridConfigBuilder::new()
            .train_min_size_candidates(Vec::new())
            .build()
            .unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn test_rejects_zero_stride_and_classes() {
        assert!(GridConfigBuilder::new()
            .size_divisible_stride(0)
            .build()
            .is_err());
        assert!(GridConfigBuilder::new().num_classes(0).build().is_err());
    }

    #[test]
    fn test_rejects_non_positive_std() {
        let err = GridConfigBuilder::new()
            .normalization([0.5; 3], [0.2, 0.0, 0.2])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("image_std[1]"));
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let config =
            GridConfig::from_json_str(r#"{"num_classes": 5, "size_divisible_stride": 16}"#)
                .unwrap();
        assert_eq!(config.num_classes, 5);
        assert_eq!(config.size_divisible_stride, 16);
        assert_eq!(config.max_size, 800);
    }

    #[test]
    fn test_json_invalid_is_rejected() {
        assert!(GridConfig::from_json_str(r#"{"test_min_size": 0}"#)
            .unwrap_err()
            .is_config_error());
        assert!(matches!(
            GridConfig::from_json_str("not json"),
            Err(GridError::JsonError(_))
        ));
    }

    #[test]
    fn test_json_misspelled_key_is_rejected() {
        let err = GridConfig::from_json_str(r#"{"max_sizes": 1000}"#).unwrap_err();
        assert!(matches!(err, GridError::JsonError(_)));
        assert!(err.to_string().contains("max_sizes"));
    }
}
