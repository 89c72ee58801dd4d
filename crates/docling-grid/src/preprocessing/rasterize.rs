// Intentional ML conversions: pixel coordinates to raster indices
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

//! Paint segment boxes into class and pos/neg label rasters

use crate::segment::Segment;
use ndarray::{s, Array2};

/// Class and pos/neg rasters for one page, both `[H, W]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRasters {
    pub class_map: Array2<i64>,
    pub pos_neg_map: Array2<i64>,
}

/// Rasterize segment boxes over an `height x width` page
///
/// Pixels outside every box are `background_class` in the class map and 0 in
/// the pos/neg map. Each box is normalized, clipped to the page and painted
/// over `[top, bottom) x [left, right)`; later segments overwrite earlier ones
/// where boxes overlap.
#[must_use = "returns the painted rasters"]
pub fn rasterize_labels(
    height: usize,
    width: usize,
    segments: &[Segment],
    background_class: i64,
) -> LabelRasters {
    let mut class_map = Array2::from_elem((height, width), background_class);
    let mut pos_neg_map = Array2::<i64>::zeros((height, width));

    let clip = |v: i32, len: usize| (v.max(0) as usize).min(len);
    for segment in segments {
        let (bbox, _) = segment.bbox.normalized();
        let (top, bottom) = (clip(bbox.top, height), clip(bbox.bottom, height));
        let (left, right) = (clip(bbox.left, width), clip(bbox.right, width));
        if top >= bottom || left >= right {
            continue;
        }

        class_map
            .slice_mut(s![top..bottom, left..right])
            .fill(segment.class_id);
        pos_neg_map
            .slice_mut(s![top..bottom, left..right])
            .fill(segment.pos_neg.label());
    }

    LabelRasters {
        class_map,
        pos_neg_map,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::PosNeg;

    #[test]
    fn test_paints_boxes_over_background() {
        let segments = [Segment::new("a", [1, 0, 3, 2], 2, PosNeg::KeyText)];
        let rasters = rasterize_labels(3, 4, &segments, 6);

        assert_eq!(rasters.class_map[[0, 1]], 2);
        assert_eq!(rasters.class_map[[1, 2]], 2);
        assert_eq!(rasters.class_map[[2, 1]], 6);
        assert_eq!(rasters.class_map[[0, 3]], 6);
        assert_eq!(rasters.pos_neg_map[[1, 1]], 1);
        assert_eq!(rasters.pos_neg_map[[0, 0]], 0);
    }

    #[test]
    fn test_later_segment_wins_and_boxes_are_clipped() {
        let segments = [
            Segment::new("a", [0, 0, 4, 4], 1, PosNeg::KeyText),
            Segment::new("b", [10, 10, 2, 2], 3, PosNeg::NonKeyText),
        ];
        let rasters = rasterize_labels(4, 4, &segments, 0);

        assert_eq!(rasters.class_map[[0, 0]], 1);
        assert_eq!(rasters.class_map[[3, 3]], 3);
        assert_eq!(rasters.pos_neg_map[[2, 2]], 2);
    }

    #[test]
    fn test_degenerate_and_offpage_boxes_are_ignored() {
        let segments = [
            Segment::new("", [0, 0, 0, 0], 5, PosNeg::Background),
            Segment::new("far", [-20, -20, -5, -5], 5, PosNeg::KeyText),
        ];
        let rasters = rasterize_labels(2, 2, &segments, 6);
        assert!(rasters.class_map.iter().all(|&v| v == 6));
        assert!(rasters.pos_neg_map.iter().all(|&v| v == 0));
    }
}
