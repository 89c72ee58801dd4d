//! Stride-aligned zero padding of per-sample tensors into one batch tensor
//!
//! Every sample is written into the top-left corner of its slot in a
//! zero-filled `[N, C, H*, W*]` arena, where `H*` and `W*` are the largest
//! sample height and width rounded up to a multiple of the stride. Because
//! padding only ever grows the bottom and right edges, coordinates computed
//! before padding stay valid.

use crate::error::{GridError, Result};
use ndarray::{s, Array3, Array4};

/// Padded image batch plus the real `(height, width)` of every sample
#[derive(Debug, Clone, PartialEq)]
pub struct ImageList {
    /// `[N, C, H*, W*]`
    pub tensors: Array4<f32>,
    /// Unpadded `(height, width)` per sample, in batch order
    pub image_sizes: Vec<(usize, usize)>,
}

impl ImageList {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.image_sizes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.image_sizes.is_empty()
    }

    /// Common padded `(H*, W*)`
    #[inline]
    #[must_use]
    pub fn padded_size(&self) -> (usize, usize) {
        let (_, _, height, width) = self.tensors.dim();
        (height, width)
    }
}

/// Round `value` up to the next multiple of `stride`
#[inline]
#[must_use]
pub const fn round_up_to_stride(value: usize, stride: usize) -> usize {
    value.div_ceil(stride) * stride
}

/// Compute the padded `(H*, W*)` for a set of `(height, width)` sizes
///
/// Depends only on the per-axis maxima, so input order does not matter.
pub fn padded_extent(sizes: &[(usize, usize)], stride: usize) -> Result<(usize, usize)> {
    if stride == 0 {
        return Err(GridError::invalid_input("stride must be positive"));
    }
    if sizes.is_empty() {
        return Err(GridError::invalid_input("cannot align an empty batch"));
    }
    let max_height = sizes.iter().map(|&(h, _)| h).max().unwrap_or(0);
    let max_width = sizes.iter().map(|&(_, w)| w).max().unwrap_or(0);
    Ok((
        round_up_to_stride(max_height, stride),
        round_up_to_stride(max_width, stride),
    ))
}

/// Copy `[C, H_i, W_i]` samples into a zeroed `[N, C, height, width]` arena
///
/// # Errors
///
/// - [`GridError::InvalidInput`] for an empty batch
/// - [`GridError::ShapeMismatch`] (tagged with the sample index) if a sample's
///   channel count differs from sample 0, or if it does not fit the extent
pub fn pad_to_extent<T>(samples: &[Array3<T>], (height, width): (usize, usize)) -> Result<Array4<T>>
where
    T: Clone + Default,
{
    let first = samples
        .first()
        .ok_or_else(|| GridError::invalid_input("cannot align an empty batch"))?;
    let channels = first.len_of(ndarray::Axis(0));

    let mut batch = Array4::from_elem((samples.len(), channels, height, width), T::default());
    for (i, sample) in samples.iter().enumerate() {
        let (c, h, w) = sample.dim();
        if c != channels {
            return Err(GridError::shape_mismatch(format!(
                "{c} channels, batch expects {channels}"
            ))
            .with_sample(i));
        }
        if h > height || w > width {
            return Err(GridError::shape_mismatch(format!(
                "{h}x{w} does not fit padded extent {height}x{width}"
            ))
            .with_sample(i));
        }
        batch.slice_mut(s![i, .., ..h, ..w]).assign(sample);
    }

    Ok(batch)
}

/// Pad samples to the stride-aligned maximum of their own sizes
pub fn pad_to_stride<T>(samples: &[Array3<T>], stride: usize) -> Result<Array4<T>>
where
    T: Clone + Default,
{
    let sizes: Vec<_> = samples.iter().map(|s| (s.dim().1, s.dim().2)).collect();
    let extent = padded_extent(&sizes, stride)?;
    pad_to_extent(samples, extent)
}

/// Build an [`ImageList`] from resized `[C, H_i, W_i]` images
pub fn align_batch(images: &[Array3<f32>], stride: usize) -> Result<ImageList> {
    let image_sizes: Vec<_> = images.iter().map(|im| (im.dim().1, im.dim().2)).collect();
    let extent = padded_extent(&image_sizes, stride)?;
    let tensors = pad_to_extent(images, extent)?;

    log::debug!(
        "Aligned {} images to {}x{} (stride {stride})",
        images.len(),
        extent.0,
        extent.1
    );

    Ok(ImageList {
        tensors,
        image_sizes,
    })
}
