//! Image tensor conversion and per-channel normalization

use crate::error::{GridError, Result};
use image::RgbImage;
use ndarray::{Array3, ArrayView3, Axis};

const PIXEL_MAX: f32 = 255.0;

/// Convert a decoded RGB image to a `[3, H, W]` tensor in `[0, 1]`
#[must_use = "returns the image tensor"]
pub fn to_chw_unit(image: &RgbImage) -> Array3<f32> {
    let (width, height) = image.dimensions();
    Array3::from_shape_fn((3, height as usize, width as usize), |(c, y, x)| {
        f32::from(image.get_pixel(x as u32, y as u32)[c]) / PIXEL_MAX
    })
}

/// Convert an `[H, W, C]` byte array to a `[C, H, W]` tensor in `[0, 1]`
#[must_use = "returns the image tensor"]
pub fn to_chw_unit_hwc(image: ArrayView3<'_, u8>) -> Array3<f32> {
    image
        .permuted_axes([2, 0, 1])
        .mapv(|v| f32::from(v) / PIXEL_MAX)
        .as_standard_layout()
        .into_owned()
}

/// Apply `(x - mean[c]) / std[c]` to every pixel of a `[3, H, W]` tensor
///
/// # Errors
///
/// [`GridError::InvalidInput`] if the tensor does not have exactly 3 channels.
pub fn normalize(image: &mut Array3<f32>, mean: [f32; 3], std: [f32; 3]) -> Result<()> {
    let channels = image.len_of(Axis(0));
    if channels != 3 {
        return Err(GridError::invalid_input(format!(
            "expected 3 image channels, got {channels}"
        )));
    }

    for (c, mut plane) in image.axis_iter_mut(Axis(0)).enumerate() {
        let (m, s) = (mean[c], std[c]);
        plane.mapv_inplace(|v| (v - m) / s);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    #[test]
    fn test_rgb_image_to_chw() {
        let mut image = RgbImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgb([255, 0, 51]));
        image.put_pixel(1, 0, image::Rgb([0, 255, 0]));

        let tensor = to_chw_unit(&image);
        assert_eq!(tensor.dim(), (3, 1, 2));
        assert!((tensor[[0, 0, 0]] - 1.0).abs() < 1e-6);
        assert!((tensor[[2, 0, 0]] - 0.2).abs() < 1e-6);
        assert!((tensor[[1, 0, 1]] - 1.0).abs() < 1e-6);
        assert_eq!(tensor[[0, 0, 1]], 0.0);
    }

    #[test]
    fn test_hwc_array_matches_rgb_image() {
        let mut image = RgbImage::new(3, 2);
        for (i, pixel) in image.pixels_mut().enumerate() {
            *pixel = image::Rgb([i as u8 * 10, i as u8 * 20, 255 - i as u8]);
        }
        let hwc = Array3::from_shape_vec((2, 3, 3), image.as_raw().clone()).unwrap();
        assert_eq!(to_chw_unit_hwc(hwc.view()), to_chw_unit(&image));
    }

    #[test]
    fn test_normalize_per_channel() {
        let mut tensor = Array3::<f32>::from_elem((3, 2, 2), 0.5);
        normalize(&mut tensor, [0.5, 0.0, 1.0], [1.0, 0.5, 0.25]).unwrap();
        assert!(tensor.index_axis(Axis(0), 0).iter().all(|&v| v.abs() < 1e-6));
        assert!(tensor.index_axis(Axis(0), 1).iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(tensor.index_axis(Axis(0), 2).iter().all(|&v| (v + 2.0).abs() < 1e-6));
    }

    #[test]
    fn test_normalize_rejects_non_rgb() {
        let mut tensor = Array3::<f32>::zeros((1, 2, 2));
        let err = normalize(&mut tensor, [0.0; 3], [1.0; 3]).unwrap_err();
        assert!(err.is_invalid_input());
    }
}
