//! Error types for the grid alignment pipeline
//!
//! This module defines the error types that can occur while turning OCR
//! samples into aligned batch tensors. All public APIs use the `Result<T>`
//! type alias which wraps `GridError`.
//!
//! Per-sample operations create errors without knowing where the sample sits
//! in its batch. The pipeline attaches the index with [`GridError::with_sample`]
//! so that the final message names the offending sample:
//!
//! ```
//! use docling_grid::GridError;
//!
//! let err = GridError::IndexOutOfRange {
//!     sample: None,
//!     value: 9,
//!     num_classes: 7,
//! }
//! .with_sample(3);
//! assert_eq!(err.to_string(), "sample 3: label value 9 exceeds num_classes=7");
//! ```

use thiserror::Error;

/// Errors that can occur while preparing or batching samples
///
/// # Error Categories
///
/// - **Input errors** ([`InvalidInput`], [`IndexOutOfRange`]): a single sample is unusable
/// - **Batch errors** ([`ShapeMismatch`]): samples in one batch disagree on channel layout
/// - **Configuration errors** ([`ConfigError`]): invalid options (user error, fixable)
/// - **Collaborator errors** ([`TokenizerError`], [`DatasetError`], I/O, decoding)
///
/// [`InvalidInput`]: GridError::InvalidInput
/// [`IndexOutOfRange`]: GridError::IndexOutOfRange
/// [`ShapeMismatch`]: GridError::ShapeMismatch
/// [`ConfigError`]: GridError::ConfigError
/// [`TokenizerError`]: GridError::TokenizerError
/// [`DatasetError`]: GridError::DatasetError
#[derive(Error, Debug)]
pub enum GridError {
    /// A sample cannot be processed as given
    ///
    /// Common causes:
    /// - Zero-area image
    /// - Non-positive resize target, or a cap smaller than the target
    /// - Image without exactly 3 channels
    /// - Empty batch
    #[error("{}invalid input: {reason}", sample_prefix(.sample))]
    InvalidInput {
        /// Index of the sample within its batch, when known
        sample: Option<usize>,
        /// Which invariant was violated
        reason: String,
    },

    /// A label raster holds a value outside `[0, num_classes)`
    #[error("{}label value {value} exceeds num_classes={num_classes}", sample_prefix(.sample))]
    IndexOutOfRange {
        /// Index of the sample within its batch, when known
        sample: Option<usize>,
        /// Offending label value
        value: i64,
        /// Number of classes the encoder was asked for
        num_classes: usize,
    },

    /// Tensor shapes disagree
    ///
    /// Raised when a per-sample tensor's channel count differs from its batch
    /// siblings, or when a label raster does not match its image.
    #[error("{}shape mismatch: {reason}", sample_prefix(.sample))]
    ShapeMismatch {
        /// Index of the sample within its batch, when known
        sample: Option<usize>,
        /// Description of the disagreeing shapes
        reason: String,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {reason}")]
    ConfigError {
        /// Description of what is invalid in the configuration
        reason: String,
    },

    /// The sub-word tokenizer failed
    #[error("Tokenizer failed: {reason}")]
    TokenizerError {
        /// Message reported by the tokenizer
        reason: String,
    },

    /// On-disk dataset layout is not what the reader expects
    #[error("Dataset error: {reason}")]
    DatasetError {
        /// Description of the missing or malformed entry
        reason: String,
    },

    /// IO error (file not found, permission denied, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image decoding failed
    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    /// Segment CSV could not be parsed
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Configuration JSON could not be parsed
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

fn sample_prefix(sample: &Option<usize>) -> String {
    sample.map_or_else(String::new, |index| format!("sample {index}: "))
}

impl GridError {
    /// Attach the batch index of the sample this error belongs to
    ///
    /// Variants that are not sample-scoped are returned unchanged, and an
    /// index that is already set is kept.
    #[must_use = "returns the error tagged with the sample index"]
    pub fn with_sample(self, index: usize) -> Self {
        match self {
            Self::InvalidInput { sample, reason } => Self::InvalidInput {
                sample: sample.or(Some(index)),
                reason,
            },
            Self::IndexOutOfRange {
                sample,
                value,
                num_classes,
            } => Self::IndexOutOfRange {
                sample: sample.or(Some(index)),
                value,
                num_classes,
            },
            Self::ShapeMismatch { sample, reason } => Self::ShapeMismatch {
                sample: sample.or(Some(index)),
                reason,
            },
            other => other,
        }
    }

    /// Index of the offending sample, if the error is sample-scoped and tagged
    #[inline]
    #[must_use = "returns the sample index"]
    pub const fn sample(&self) -> Option<usize> {
        match self {
            Self::InvalidInput { sample, .. }
            | Self::IndexOutOfRange { sample, .. }
            | Self::ShapeMismatch { sample, .. } => *sample,
            _ => None,
        }
    }

    /// Build an untagged [`GridError::InvalidInput`]
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            sample: None,
            reason: reason.into(),
        }
    }

    /// Build an untagged [`GridError::ShapeMismatch`]
    pub(crate) fn shape_mismatch(reason: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            sample: None,
            reason: reason.into(),
        }
    }

    /// Returns true if this error is an invalid-input error
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }

    /// Returns true if a label value fell outside the class range
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_index_out_of_range(&self) -> bool {
        matches!(self, Self::IndexOutOfRange { .. })
    }

    /// Returns true if tensor shapes disagreed
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_shape_mismatch(&self) -> bool {
        matches!(self, Self::ShapeMismatch { .. })
    }

    /// Returns true if this error is a configuration error (user-fixable)
    #[inline]
    #[must_use = "this method returns a boolean, not modifying the error"]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError { .. })
    }
}

/// Type alias for Result with `GridError`
pub type Result<T> = std::result::Result<T, GridError>;
