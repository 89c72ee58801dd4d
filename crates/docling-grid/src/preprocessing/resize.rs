// Intentional ML conversions: tensor indices, image dimensions, pixel coordinates
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]

//! Aspect-preserving resize of images, label rasters and boxes
//!
//! One scale factor is chosen per sample from the image's short and long
//! edges, then applied three ways:
//!
//! | Payload      | Resampling                        |
//! |--------------|-----------------------------------|
//! | image        | bilinear, half-pixel centers      |
//! | label raster | nearest neighbor, `floor(dst * in / out)` |
//! | boxes        | multiply by realized `out / in` per axis, truncate |
//!
//! Boxes use the ratio of the *realized* integer output size to the input
//! size, not the nominal scale, so rounding of the output shape is absorbed.

use crate::error::{GridError, Result};
use crate::segment::BoundingBox;
use ndarray::{Array2, Array3};
use rand::Rng;

/// Compute the scale that brings the short edge to `min_edge_target`
/// without letting the long edge exceed `max_edge_cap`
///
/// # Errors
///
/// [`GridError::InvalidInput`] if the image has zero area, the target is zero,
/// or the cap is smaller than the target.
pub fn compute_scale(
    height: usize,
    width: usize,
    min_edge_target: usize,
    max_edge_cap: usize,
) -> Result<f64> {
    if height == 0 || width == 0 {
        return Err(GridError::invalid_input(format!(
            "image has zero area ({height}x{width})"
        )));
    }
    if min_edge_target == 0 {
        return Err(GridError::invalid_input(
            "min edge target must be positive",
        ));
    }
    if max_edge_cap < min_edge_target {
        return Err(GridError::invalid_input(format!(
            "max edge cap {max_edge_cap} is below min edge target {min_edge_target}"
        )));
    }

    let short_edge = height.min(width) as f64;
    let long_edge = height.max(width) as f64;

    let mut scale = min_edge_target as f64 / short_edge;
    if long_edge * scale > max_edge_cap as f64 {
        scale = max_edge_cap as f64 / long_edge;
    }
    Ok(scale)
}

/// Output `(height, width)` for a scale: each edge rounded, never below 1
#[inline]
#[must_use]
pub fn scaled_size(height: usize, width: usize, scale: f64) -> (usize, usize) {
    let edge = |len: usize| ((len as f64 * scale).round() as usize).max(1);
    (edge(height), edge(width))
}

/// Resize a `[C, H, W]` image so its short edge hits `min_edge_target`
/// (long edge capped at `max_edge_cap`)
///
/// Returns the resized image and the scale that was applied.
pub fn resize_image(
    image: &Array3<f32>,
    min_edge_target: usize,
    max_edge_cap: usize,
) -> Result<(Array3<f32>, f64)> {
    let (_, height, width) = image.dim();
    let scale = compute_scale(height, width, min_edge_target, max_edge_cap)?;
    let (new_height, new_width) = scaled_size(height, width, scale);

    log::debug!(
        "Resize {height}x{width} -> {new_height}x{new_width} (target {min_edge_target}, cap {max_edge_cap}, scale {scale:.4})"
    );

    Ok((bilinear_resize_chw(image, new_height, new_width), scale))
}

/// Source taps and blend weight for one output position along an axis
#[derive(Clone, Copy)]
struct Tap {
    lo: usize,
    hi: usize,
    frac: f32,
}

fn axis_taps(src_len: usize, dst_len: usize) -> Vec<Tap> {
    let step = src_len as f32 / dst_len as f32;
    let last = src_len as i64 - 1;
    (0..dst_len)
        .map(|dst| {
            // Half-pixel centers: src = (dst + 0.5) * step - 0.5
            let src = (dst as f32 + 0.5).mul_add(step, -0.5);
            let lo = src.floor() as i64;
            Tap {
                lo: lo.clamp(0, last) as usize,
                hi: (lo + 1).clamp(0, last) as usize,
                frac: src - lo as f32,
            }
        })
        .collect()
}

/// Bilinear resample of a `[C, H, W]` tensor to `[C, new_height, new_width]`
///
/// Matches `align_corners=False` interpolation: sample centers sit at
/// half-pixel offsets and out-of-range taps clamp to the border.
#[must_use = "returns the resized tensor"]
pub fn bilinear_resize_chw(src: &Array3<f32>, new_height: usize, new_width: usize) -> Array3<f32> {
    let (channels, src_height, src_width) = src.dim();
    let mut dst = Array3::<f32>::zeros((channels, new_height, new_width));
    if src_height == 0 || src_width == 0 {
        return dst;
    }

    let rows = axis_taps(src_height, new_height);
    let cols = axis_taps(src_width, new_width);

    for c in 0..channels {
        let plane = src.index_axis(ndarray::Axis(0), c);
        let mut out = dst.index_axis_mut(ndarray::Axis(0), c);
        for (y, row) in rows.iter().enumerate() {
            for (x, col) in cols.iter().enumerate() {
                let v00 = plane[[row.lo, col.lo]];
                let v01 = plane[[row.lo, col.hi]];
                let v10 = plane[[row.hi, col.lo]];
                let v11 = plane[[row.hi, col.hi]];

                let top = (1.0 - col.frac).mul_add(v00, v01 * col.frac);
                let bottom = (1.0 - col.frac).mul_add(v10, v11 * col.frac);
                out[[y, x]] = (1.0 - row.frac).mul_add(top, bottom * row.frac);
            }
        }
    }

    dst
}

/// Nearest-neighbor resample of a label raster to `[new_height, new_width]`
///
/// Output pixel `(y, x)` copies input pixel
/// `(floor(y * H / new_height), floor(x * W / new_width))`, so no value is
/// ever produced that was not already present in the input.
pub fn resize_label_map_nearest(
    labels: &Array2<i64>,
    new_height: usize,
    new_width: usize,
) -> Result<Array2<i64>> {
    let (height, width) = labels.dim();
    if height == 0 || width == 0 {
        return Err(GridError::invalid_input(format!(
            "label map has zero area ({height}x{width})"
        )));
    }

    let src_index = |dst: usize, src_len: usize, dst_len: usize| {
        ((dst * src_len) / dst_len).min(src_len - 1)
    };
    let src_rows: Vec<usize> = (0..new_height)
        .map(|y| src_index(y, height, new_height))
        .collect();
    let src_cols: Vec<usize> = (0..new_width)
        .map(|x| src_index(x, width, new_width))
        .collect();

    Ok(Array2::from_shape_fn((new_height, new_width), |(y, x)| {
        labels[[src_rows[y], src_cols[x]]]
    }))
}

fn scale_boxes(boxes: &[BoundingBox], ratio_y: f64, ratio_x: f64) -> Vec<BoundingBox> {
    // `as i32` truncates toward zero
    let sx = |v: i32| (f64::from(v) * ratio_x) as i32;
    let sy = |v: i32| (f64::from(v) * ratio_y) as i32;
    boxes
        .iter()
        .map(|b| BoundingBox::new(sx(b.left), sy(b.top), sx(b.right), sy(b.bottom)))
        .collect()
}

/// Map boxes from original pixel space into resized pixel space
///
/// `original` and `resized` are `(height, width)`. x coordinates scale by the
/// width ratio and y coordinates by the height ratio.
#[must_use]
pub fn rescale_coordinates(
    boxes: &[BoundingBox],
    original: (usize, usize),
    resized: (usize, usize),
) -> Vec<BoundingBox> {
    let ratio = |to: usize, from: usize| if from == 0 { 0.0 } else { to as f64 / from as f64 };
    scale_boxes(
        boxes,
        ratio(resized.0, original.0),
        ratio(resized.1, original.1),
    )
}

/// Map boxes from resized pixel space back to original pixel space
///
/// Inverse of [`rescale_coordinates`] up to the one-pixel loss of truncation.
#[must_use]
pub fn restore_coordinates(
    boxes: &[BoundingBox],
    resized: (usize, usize),
    original: (usize, usize),
) -> Vec<BoundingBox> {
    rescale_coordinates(boxes, resized, original)
}

/// Draw a short-edge target uniformly from the candidate set
///
/// The random source is injected so callers can seed it.
pub fn choose_min_edge<R: Rng + ?Sized>(candidates: &[usize], rng: &mut R) -> Result<usize> {
    if candidates.is_empty() {
        return Err(GridError::invalid_input("no min edge candidates to choose from"));
    }
    Ok(candidates[rng.random_range(0..candidates.len())])
}
