//! OCR segment data model
//!
//! A [`Segment`] is one OCR-detected text region: its text, its box in
//! original-image pixels, its semantic class and its pos/neg role. Segments
//! come from an external OCR engine or annotation file and are never mutated
//! by the pipeline; filtering and box normalization produce new values.

use crate::error::{GridError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Axis-aligned box in pixel coordinates
///
/// `left`/`right` are x coordinates and `top`/`bottom` are y coordinates.
/// A box straight out of OCR is not guaranteed to satisfy `left <= right`
/// and `top <= bottom`; see [`BoundingBox::normalized`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

/// Outcome of checking a box's corner order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoxValidity {
    /// Corners were already ordered
    WellFormed,
    /// One or both coordinate pairs were swapped into order
    Swapped {
        /// `right < left` was fixed
        horizontal: bool,
        /// `bottom < top` was fixed
        vertical: bool,
    },
}

impl BoxValidity {
    /// Returns true if normalization had to swap anything
    #[inline]
    #[must_use]
    pub const fn was_swapped(self) -> bool {
        matches!(self, Self::Swapped { .. })
    }
}

impl BoundingBox {
    #[inline]
    #[must_use]
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Order the corners, reporting whether a swap was needed
    ///
    /// OCR engines occasionally emit quads whose third corner lies above or
    /// left of the first. Such boxes are repaired rather than rejected.
    #[must_use = "returns the normalized box and its validity"]
    pub const fn normalized(self) -> (Self, BoxValidity) {
        let horizontal = self.right < self.left;
        let vertical = self.bottom < self.top;
        if !horizontal && !vertical {
            return (self, BoxValidity::WellFormed);
        }

        let mut fixed = self;
        if horizontal {
            fixed.left = self.right;
            fixed.right = self.left;
        }
        if vertical {
            fixed.top = self.bottom;
            fixed.bottom = self.top;
        }
        (
            fixed,
            BoxValidity::Swapped {
                horizontal,
                vertical,
            },
        )
    }

    /// Clamp every coordinate to be non-negative
    ///
    /// OCR quads can start slightly outside the page; pixel space has no
    /// negative coordinates.
    #[inline]
    #[must_use]
    pub const fn clamped_to_origin(self) -> Self {
        const fn non_negative(v: i32) -> i32 {
            if v < 0 {
                0
            } else {
                v
            }
        }
        Self::new(
            non_negative(self.left),
            non_negative(self.top),
            non_negative(self.right),
            non_negative(self.bottom),
        )
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> i32 {
        self.right - self.left
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

impl From<[i32; 4]> for BoundingBox {
    #[inline]
    fn from([left, top, right, bottom]: [i32; 4]) -> Self {
        Self::new(left, top, right, bottom)
    }
}

/// Role of a pixel or segment in the pos/neg label map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum PosNeg {
    #[default]
    Background,
    KeyText,
    NonKeyText,
}

impl PosNeg {
    /// Integer label written into the pos/neg raster
    #[inline]
    #[must_use]
    pub const fn label(self) -> i64 {
        match self {
            Self::Background => 0,
            Self::KeyText => 1,
            Self::NonKeyText => 2,
        }
    }
}

impl From<PosNeg> for i64 {
    #[inline]
    fn from(value: PosNeg) -> Self {
        value.label()
    }
}

impl TryFrom<i64> for PosNeg {
    type Error = String;

    fn try_from(value: i64) -> std::result::Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Background),
            1 => Ok(Self::KeyText),
            2 => Ok(Self::NonKeyText),
            other => Err(format!("pos_neg value {other} is not one of 0, 1, 2")),
        }
    }
}

/// One OCR-detected text region
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    /// Box in original-image pixel coordinates
    pub bbox: BoundingBox,
    /// Semantic class, including the catch-all "other" class
    pub class_id: i64,
    pub pos_neg: PosNeg,
}

impl Segment {
    pub fn new(
        text: impl Into<String>,
        bbox: impl Into<BoundingBox>,
        class_id: i64,
        pos_neg: PosNeg,
    ) -> Self {
        Self {
            text: text.into(),
            bbox: bbox.into(),
            class_id,
            pos_neg,
        }
    }
}

/// Row layout of a segment annotation CSV
#[derive(Debug, Deserialize)]
struct SegmentRecord {
    left: f64,
    top: f64,
    right: f64,
    bot: f64,
    text: Option<String>,
    data_class: i64,
    pos_neg: i64,
}

/// Read segments from an annotation CSV
///
/// Expected header: `left,top,right,bot,text,data_class,pos_neg`. Coordinates
/// may be written as floats and are truncated to the pixel grid. An empty
/// `text` cell yields an empty segment, which tokenization later drops.
pub fn read_segments_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Segment>> {
    let mut reader = csv::Reader::from_path(path.as_ref())?;
    let mut segments = Vec::new();

    for (row, record) in reader.deserialize::<SegmentRecord>().enumerate() {
        let record = record?;
        let pos_neg =
            PosNeg::try_from(record.pos_neg).map_err(|reason| GridError::DatasetError {
                reason: format!("{} row {row}: {reason}", path.as_ref().display()),
            })?;
        segments.push(Segment {
            text: record.text.unwrap_or_default(),
            bbox: BoundingBox::new(
                record.left as i32,
                record.top as i32,
                record.right as i32,
                record.bot as i32,
            ),
            class_id: record.data_class,
            pos_neg,
        });
    }

    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_well_formed_box_is_untouched() {
        let bbox = BoundingBox::new(10, 10, 50, 20);
        let (fixed, validity) = bbox.normalized();
        assert_eq!(fixed, bbox);
        assert_eq!(validity, BoxValidity::WellFormed);
        assert!(!validity.was_swapped());
    }

    #[test]
    fn test_inverted_box_is_swapped() {
        let (fixed, validity) = BoundingBox::new(50, 20, 10, 10).normalized();
        assert_eq!(fixed, BoundingBox::new(10, 10, 50, 20));
        assert_eq!(
            validity,
            BoxValidity::Swapped {
                horizontal: true,
                vertical: true
            }
        );
    }

    #[test]
    fn test_only_vertical_swap() {
        let (fixed, validity) = BoundingBox::new(0, 30, 40, 5).normalized();
        assert_eq!(fixed, BoundingBox::new(0, 5, 40, 30));
        assert_eq!(
            validity,
            BoxValidity::Swapped {
                horizontal: false,
                vertical: true
            }
        );
        assert_eq!(fixed.width(), 40);
        assert_eq!(fixed.height(), 25);
    }

    #[test]
    fn test_clamped_to_origin() {
        let bbox = BoundingBox::new(-5, -3, 10, 12).clamped_to_origin();
        assert_eq!(bbox, BoundingBox::new(0, 0, 10, 12));
        let outside = BoundingBox::new(-9, -9, -1, -2).clamped_to_origin();
        assert_eq!(outside, BoundingBox::new(0, 0, 0, 0));
    }

    #[test]
    fn test_degenerate_box_is_well_formed() {
        let (_, validity) = BoundingBox::new(0, 0, 0, 0).normalized();
        assert_eq!(validity, BoxValidity::WellFormed);
    }

    #[test]
    fn test_pos_neg_conversion() {
        assert_eq!(PosNeg::try_from(1), Ok(PosNeg::KeyText));
        assert_eq!(i64::from(PosNeg::NonKeyText), 2);
        assert!(PosNeg::try_from(3).is_err());
    }

    #[test]
    fn test_read_segments_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "left,top,right,bot,text,data_class,pos_neg").unwrap();
        writeln!(file, "10,10,50,20,Acme,0,1").unwrap();
        writeln!(file, "0,0,0,0,,6,0").unwrap();
        writeln!(file, "12.7,3.2,40.9,9.5,\"1,20\",3,2").unwrap();
        file.flush().unwrap();

        let segments = read_segments_csv(file.path()).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].text, "Acme");
        assert_eq!(segments[0].pos_neg, PosNeg::KeyText);
        assert_eq!(segments[1].text, "");
        assert_eq!(segments[1].class_id, 6);
        assert_eq!(segments[2].text, "1,20");
        assert_eq!(segments[2].bbox, BoundingBox::new(12, 3, 40, 9));
    }

    #[test]
    fn test_read_segments_csv_rejects_bad_pos_neg() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "left,top,right,bot,text,data_class,pos_neg").unwrap();
        writeln!(file, "10,10,50,20,Acme,0,7").unwrap();
        file.flush().unwrap();

        let err = read_segments_csv(file.path()).unwrap_err();
        assert!(matches!(err, GridError::DatasetError { .. }));
    }
}
