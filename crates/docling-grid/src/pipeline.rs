//! Sample preparation and batch collation
//!
//! Two stages separated by a barrier:
//!
//! 1. **Per-sample** ([`GridPipeline::prepare_sample`]): tokenize segments,
//!    normalize the image, choose a short-edge target, resize image and label
//!    rasters to one shape, rescale boxes, one-hot the rasters. Samples share
//!    no state and run in parallel.
//! 2. **Batch** ([`GridPipeline::collate`]): once every sample is ready, pad
//!    images and labels to a stride-aligned common shape and pack the token
//!    id sequences.
//!
//! [`GridPipeline::process_batch`] runs both, fanning stage 1 out over rayon.
//! Each sample draws its short-edge target from its own `StdRng` seeded from
//! the batch seed and its index, so a batch is reproducible no matter how the
//! thread pool schedules it.
//!
//! ```no_run
//! use docling_grid::{GridConfig, GridPipeline, Mode, WordPieceTokenizer};
//!
//! # fn main() -> docling_grid::Result<()> {
//! # let samples: Vec<docling_grid::RawSample> = Vec::new();
//! let tokenizer = WordPieceTokenizer::from_vocab_file("vocab.txt", true)?;
//! let pipeline = GridPipeline::new(GridConfig::default(), tokenizer, Mode::Train)?;
//! let batch = pipeline.process_batch(&samples, 42)?;
//! println!("{:?}", batch.images.tensors.dim());
//! # Ok(())
//! # }
//! ```

use crate::batch::{align_batch, pack_sequences, pad_to_extent, ImageList};
use crate::config::{GridConfig, POS_NEG_CLASSES};
use crate::error::{GridError, Result};
use crate::preprocessing::{
    choose_min_edge, normalize, one_hot, rescale_coordinates, resize_image,
    resize_label_map_nearest,
};
use crate::segment::{BoundingBox, PosNeg, Segment};
use crate::segment_tokenizer::expand_segments;
use crate::tokenizer::SubwordTokenizer;
use ndarray::{Array2, Array3, Array4};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

/// Whether short-edge targets are sampled (training) or fixed (evaluation)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    #[default]
    Train,
    Eval,
}

/// One document as it enters the pipeline
///
/// `image` is `[3, H, W]` in `[0, 1]`, not yet normalized. Both label rasters
/// must be `[H, W]`.
#[derive(Debug, Clone)]
pub struct RawSample {
    pub name: String,
    pub image: Array3<f32>,
    pub class_map: Array2<i64>,
    pub pos_neg_map: Array2<i64>,
    pub segments: Vec<Segment>,
}

/// What happened to one sample on its way through the per-sample stage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleProvenance {
    pub name: String,
    /// `(height, width)` before resizing
    pub original_size: (usize, usize),
    /// `(height, width)` after resizing, before padding
    pub resized_size: (usize, usize),
    pub scale: f64,
    pub min_edge_target: usize,
    pub dropped_segments: usize,
    pub swapped_boxes: usize,
}

/// Output of the per-sample stage
#[derive(Debug, Clone)]
pub struct PreparedSample {
    /// Normalized, resized `[3, h, w]`
    pub image: Array3<f32>,
    /// `[num_classes, h, w]`
    pub class_labels: Array3<u8>,
    /// `[3, h, w]`
    pub pos_neg_labels: Array3<u8>,
    /// Filtered segment boxes in resized pixel space
    pub coordinates: Vec<BoundingBox>,
    pub token_ids: Vec<u32>,
    pub segment_index_per_token: Vec<usize>,
    pub segment_classes: Vec<i64>,
    pub segment_pos_neg: Vec<PosNeg>,
    pub texts: Vec<String>,
    pub provenance: SampleProvenance,
}

/// Aligned batch handed to the model
#[derive(Debug, Clone)]
pub struct GridBatch {
    /// `[N, 3, H*, W*]` plus unpadded sizes
    pub images: ImageList,
    /// `[N, num_classes, H*, W*]`
    pub class_labels: Array4<u8>,
    /// `[N, 3, H*, W*]`
    pub pos_neg_labels: Array4<u8>,
    /// Per-sample boxes in resized pixel space
    pub coordinates: Vec<Vec<BoundingBox>>,
    /// `[N, L*]`
    pub input_ids: Array2<u32>,
    /// `[N, L*]`
    pub attention_mask: Array2<u8>,
    /// Per-sample segment index of every unpadded token
    pub segment_indices: Vec<Vec<usize>>,
    pub segment_classes: Vec<Vec<i64>>,
    pub segment_pos_neg: Vec<Vec<PosNeg>>,
    pub texts: Vec<Vec<String>>,
    pub provenance: Vec<SampleProvenance>,
}

impl GridBatch {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

/// Seed of sample `index` in a batch seeded with `seed`
#[inline]
#[must_use]
pub const fn sample_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

/// Alignment pipeline bound to a config and a tokenizer
#[derive(Debug, Clone)]
pub struct GridPipeline<T> {
    config: GridConfig,
    tokenizer: T,
    mode: Mode,
}

impl<T: SubwordTokenizer> GridPipeline<T> {
    /// Create a pipeline, validating the config
    pub fn new(config: GridConfig, tokenizer: T, mode: Mode) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            tokenizer,
            mode,
        })
    }

    #[inline]
    #[must_use]
    pub const fn config(&self) -> &GridConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    #[must_use]
    pub const fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    /// Switch between training and evaluation sizing
    #[must_use = "returns the pipeline in the new mode"]
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    fn min_edge_target<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<usize> {
        match self.mode {
            Mode::Train => choose_min_edge(&self.config.train_min_size_candidates, rng),
            Mode::Eval => Ok(self.config.test_min_size),
        }
    }

    /// Run the per-sample stage for the sample at `index` in its batch
    ///
    /// Errors are tagged with `index`.
    pub fn prepare_sample<R: Rng + ?Sized>(
        &self,
        index: usize,
        raw: &RawSample,
        rng: &mut R,
    ) -> Result<PreparedSample> {
        self.prepare(raw, rng).map_err(|e| e.with_sample(index))
    }

    fn prepare<R: Rng + ?Sized>(&self, raw: &RawSample, rng: &mut R) -> Result<PreparedSample> {
        let (_, height, width) = raw.image.dim();
        for (what, map) in [("class", &raw.class_map), ("pos/neg", &raw.pos_neg_map)] {
            if map.dim() != (height, width) {
                return Err(GridError::shape_mismatch(format!(
                    "{what} map is {:?}, image is {height}x{width}",
                    map.dim()
                )));
            }
        }

        let document = expand_segments(&raw.segments, &self.tokenizer)?;

        let mut image = raw.image.clone();
        normalize(&mut image, self.config.image_mean, self.config.image_std)?;

        let target = self.min_edge_target(rng)?;
        let (image, scale) = resize_image(&image, target, self.config.max_size)?;
        let (_, new_height, new_width) = image.dim();

        let class_map = resize_label_map_nearest(&raw.class_map, new_height, new_width)?;
        let pos_neg_map = resize_label_map_nearest(&raw.pos_neg_map, new_height, new_width)?;
        let class_labels = one_hot(&class_map, self.config.num_classes)?;
        let pos_neg_labels = one_hot(&pos_neg_map, POS_NEG_CLASSES)?;

        let coordinates =
            rescale_coordinates(&document.boxes, (height, width), (new_height, new_width));

        log::debug!(
            "{}: target {target}, scale {scale:.4}, {} tokens over {} segments",
            raw.name,
            document.num_tokens(),
            document.num_segments()
        );

        Ok(PreparedSample {
            image,
            class_labels,
            pos_neg_labels,
            coordinates,
            token_ids: document.token_ids,
            segment_index_per_token: document.segment_index_per_token,
            segment_classes: document.classes,
            segment_pos_neg: document.pos_neg,
            texts: document.texts,
            provenance: SampleProvenance {
                name: raw.name.clone(),
                original_size: (height, width),
                resized_size: (new_height, new_width),
                scale,
                min_edge_target: target,
                dropped_segments: document.dropped_segments,
                swapped_boxes: document.swapped_boxes,
            },
        })
    }

    /// Pad prepared samples into one batch
    ///
    /// # Errors
    ///
    /// - [`GridError::InvalidInput`] for an empty batch
    /// - [`GridError::ShapeMismatch`] if a sample's label channels disagree with
    ///   the configured class counts or its label size differs from its image
    pub fn collate(&self, samples: Vec<PreparedSample>) -> Result<GridBatch> {
        if samples.is_empty() {
            return Err(GridError::invalid_input("cannot collate an empty batch"));
        }

        for (i, sample) in samples.iter().enumerate() {
            let (_, h, w) = sample.image.dim();
            let checks = [
                ("class", &sample.class_labels, self.config.num_classes),
                ("pos/neg", &sample.pos_neg_labels, POS_NEG_CLASSES),
            ];
            for (what, labels, expected) in checks {
                let (k, lh, lw) = labels.dim();
                if k != expected {
                    return Err(GridError::shape_mismatch(format!(
                        "{what} labels have {k} channels, expected {expected}"
                    ))
                    .with_sample(i));
                }
                if (lh, lw) != (h, w) {
                    return Err(GridError::shape_mismatch(format!(
                        "{what} labels are {lh}x{lw}, image is {h}x{w}"
                    ))
                    .with_sample(i));
                }
            }
        }

        let n = samples.len();
        let mut images = Vec::with_capacity(n);
        let mut class_labels = Vec::with_capacity(n);
        let mut pos_neg_labels = Vec::with_capacity(n);
        let mut token_ids = Vec::with_capacity(n);
        let mut coordinates = Vec::with_capacity(n);
        let mut segment_indices = Vec::with_capacity(n);
        let mut segment_classes = Vec::with_capacity(n);
        let mut segment_pos_neg = Vec::with_capacity(n);
        let mut texts = Vec::with_capacity(n);
        let mut provenance = Vec::with_capacity(n);
        for sample in samples {
            images.push(sample.image);
            class_labels.push(sample.class_labels);
            pos_neg_labels.push(sample.pos_neg_labels);
            token_ids.push(sample.token_ids);
            coordinates.push(sample.coordinates);
            segment_indices.push(sample.segment_index_per_token);
            segment_classes.push(sample.segment_classes);
            segment_pos_neg.push(sample.segment_pos_neg);
            texts.push(sample.texts);
            provenance.push(sample.provenance);
        }

        let images = align_batch(&images, self.config.size_divisible_stride)?;
        let extent = images.padded_size();
        let class_labels = pad_to_extent(&class_labels, extent)?;
        let pos_neg_labels = pad_to_extent(&pos_neg_labels, extent)?;
        let packed = pack_sequences(&token_ids, self.config.pad_token_id);

        log::debug!(
            "Collated batch: images {:?}, tokens {:?}",
            images.tensors.dim(),
            packed.input_ids.dim()
        );

        Ok(GridBatch {
            images,
            class_labels,
            pos_neg_labels,
            coordinates,
            input_ids: packed.input_ids,
            attention_mask: packed.attention_mask,
            segment_indices,
            segment_classes,
            segment_pos_neg,
            texts,
            provenance,
        })
    }

    /// Prepare every sample in parallel, then collate
    ///
    /// The first per-sample failure aborts the whole batch.
    pub fn process_batch(&self, samples: &[RawSample], seed: u64) -> Result<GridBatch> {
        let prepared = samples
            .par_iter()
            .enumerate()
            .map(|(index, raw)| {
                let mut rng = StdRng::seed_from_u64(sample_seed(seed, index));
                self.prepare_sample(index, raw, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        self.collate(prepared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfigBuilder;
    use crate::preprocessing::rasterize_labels;

    struct WhitespaceTokenizer;

    impl SubwordTokenizer for WhitespaceTokenizer {
        fn tokenize(&self, text: &str) -> Result<Vec<String>> {
            Ok(text.split_whitespace().map(str::to_string).collect())
        }

        fn ids_of(&self, tokens: &[String]) -> Result<Vec<u32>> {
            Ok(tokens.iter().map(|t| t.len() as u32 + 100).collect())
        }
    }

    fn sample(name: &str, height: usize, width: usize, segments: Vec<Segment>) -> RawSample {
        let rasters = rasterize_labels(height, width, &segments, 6);
        RawSample {
            name: name.to_string(),
            image: Array3::from_elem((3, height, width), 0.5),
            class_map: rasters.class_map,
            pos_neg_map: rasters.pos_neg_map,
            segments,
        }
    }

    fn pipeline(mode: Mode) -> GridPipeline<WhitespaceTokenizer> {
        let config = GridConfigBuilder::new()
            .train_min_size_candidates(vec![32, 48, 64])
            .test_min_size(64)
            .max_size(128)
            .build()
            .unwrap();
        GridPipeline::new(config, WhitespaceTokenizer, mode).unwrap()
    }

    #[test]
    fn test_prepare_sample_eval() {
        let raw = sample(
            "doc",
            40,
            60,
            vec![
                Segment::new("Acme Corp", [10, 10, 50, 20], 0, PosNeg::KeyText),
                Segment::new("", [0, 0, 0, 0], 6, PosNeg::Background),
            ],
        );
        let mut rng = StdRng::seed_from_u64(0);
        let prepared = pipeline(Mode::Eval).prepare_sample(0, &raw, &mut rng).unwrap();

        assert_eq!(prepared.image.dim(), (3, 64, 96));
        assert_eq!(prepared.class_labels.dim(), (7, 64, 96));
        assert_eq!(prepared.pos_neg_labels.dim(), (3, 64, 96));
        assert_eq!(prepared.token_ids, [104, 104]);
        assert_eq!(prepared.segment_index_per_token, [0, 0]);
        assert_eq!(prepared.coordinates, [BoundingBox::new(16, 16, 80, 32)]);
        assert_eq!(prepared.provenance.min_edge_target, 64);
        assert_eq!(prepared.provenance.dropped_segments, 1);
        // 0.5 normalized with the default receipt statistics
        let expected = (0.5 - 0.948_028_86) / 0.184_003_19;
        assert!((prepared.image[[0, 0, 0]] - expected).abs() < 1e-4);
    }

    #[test]
    fn test_label_shape_mismatch_is_tagged() {
        let mut raw = sample("doc", 40, 60, Vec::new());
        raw.class_map = Array2::zeros((40, 61));
        let mut rng = StdRng::seed_from_u64(0);
        let err = pipeline(Mode::Eval)
            .prepare_sample(4, &raw, &mut rng)
            .unwrap_err();
        assert!(err.is_shape_mismatch());
        assert_eq!(err.sample(), Some(4));
    }

    #[test]
    fn test_out_of_range_label_names_sample() {
        let mut raw = sample("doc", 8, 8, Vec::new());
        raw.class_map[[0, 0]] = 9;
        let err = pipeline(Mode::Eval)
            .process_batch(&[sample("ok", 8, 8, Vec::new()), raw], 0)
            .unwrap_err();
        assert_eq!(err.to_string(), "sample 1: label value 9 exceeds num_classes=7");
    }

    #[test]
    fn test_process_batch_is_reproducible() {
        let samples: Vec<_> = (0..6)
            .map(|i| {
                sample(
                    &format!("doc{i}"),
                    20 + i * 7,
                    30,
                    vec![Segment::new("a bb", [1, 1, 9, 9], 1, PosNeg::KeyText)],
                )
            })
            .collect();
        let p = pipeline(Mode::Train);
        let a = p.process_batch(&samples, 11).unwrap();
        let b = p.process_batch(&samples, 11).unwrap();

        assert_eq!(a.provenance, b.provenance);
        assert_eq!(a.images.tensors, b.images.tensors);
        let (_, _, h, w) = a.images.tensors.dim();
        assert_eq!((h % 32, w % 32), (0, 0));
        assert_eq!(a.input_ids.dim(), (6, 2));
        assert!(a
            .provenance
            .iter()
            .all(|p| [32, 48, 64].contains(&p.min_edge_target)));
    }

    #[test]
    fn test_collate_rejects_empty_and_foreign_channels() {
        let p = pipeline(Mode::Eval);
        assert!(p.collate(Vec::new()).unwrap_err().is_invalid_input());

        let raw = sample("doc", 8, 8, Vec::new());
        let mut rng = StdRng::seed_from_u64(0);
        let good = p.prepare_sample(0, &raw, &mut rng).unwrap();
        let mut bad = good.clone();
        bad.class_labels = Array3::zeros((5, 64, 64));
        let err = p.collate(vec![good, bad]).unwrap_err();
        assert!(err.is_shape_mismatch());
        assert_eq!(err.sample(), Some(1));
    }

    #[test]
    fn test_sample_seed_differs_per_index() {
        assert_ne!(sample_seed(3, 0), sample_seed(3, 1));
        assert_eq!(sample_seed(3, 2), sample_seed(3, 2));
    }
}
