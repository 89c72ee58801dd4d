//! # Preprocessing - Per-Sample Image and Label Transforms
//!
//! Everything here operates on a single sample and is safe to run on many
//! samples in parallel. Batch-level work lives in [`crate::batch`].
//!
//! ## Modules
//!
//! ### Resize
//! - **Module:** [`resize`]
//! - **Operations:**
//!   - Aspect-preserving scale bounded by a short-edge target and a long-edge cap
//!   - Bilinear (half-pixel) resampling for images
//!   - Nearest-neighbor resampling for label rasters
//!   - Box rescaling by the realized width/height ratios, and the inverse
//!
//! ### Normalize
//! - **Module:** [`normalize`]
//! - **Operations:** HWC `u8` → CHW `f32` in `[0, 1]`, per-channel mean/std
//!
//! ### One-Hot
//! - **Module:** [`one_hot`]
//! - **Operations:** `[H, W]` integer raster → `[K, H, W]` indicator tensor
//!
//! ### Rasterize
//! - **Module:** [`rasterize`]
//! - **Operations:** paint segment boxes into class and pos/neg rasters
//!
//! ## Tensor Layout
//!
//! Images are `Array3<f32>` in `[C, H, W]` order. Label rasters are
//! `Array2<i64>` in `[H, W]` order.

pub mod normalize;
pub mod one_hot;
pub mod rasterize;
pub mod resize;

pub use normalize::{normalize, to_chw_unit, to_chw_unit_hwc};
pub use one_hot::one_hot;
pub use rasterize::{rasterize_labels, LabelRasters};
pub use resize::{
    choose_min_edge, compute_scale, rescale_coordinates, resize_image, resize_label_map_nearest,
    restore_coordinates, scaled_size,
};
