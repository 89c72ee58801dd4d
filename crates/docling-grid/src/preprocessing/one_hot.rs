//! One-hot encoding of integer label rasters

use crate::error::{GridError, Result};
use ndarray::{Array2, Array3};

/// Expand an `[H, W]` label raster into a `[num_classes, H, W]` indicator tensor
///
/// Channel `c` at `(y, x)` is 1 exactly when `labels[y, x] == c`, so every
/// pixel has exactly one active channel.
///
/// # Errors
///
/// [`GridError::IndexOutOfRange`] for the first value outside `[0, num_classes)`.
/// Values are never clipped.
pub fn one_hot(labels: &Array2<i64>, num_classes: usize) -> Result<Array3<u8>> {
    let (height, width) = labels.dim();
    let mut encoded = Array3::<u8>::zeros((num_classes, height, width));

    for ((y, x), &value) in labels.indexed_iter() {
        let class = usize::try_from(value)
            .ok()
            .filter(|&c| c < num_classes)
            .ok_or(GridError::IndexOutOfRange {
                sample: None,
                value,
                num_classes,
            })?;
        encoded[[class, y, x]] = 1;
    }

    Ok(encoded)
}
