//! # Docling Grid - OCR-to-Grid Alignment and Batching
//!
//! Prepares document-understanding samples for models that fuse visual
//! features and text features on one spatial grid. A sample is a page image,
//! the OCR segments found on it, and two per-pixel label rasters (semantic
//! class and pos/neg role). After this crate is done with a batch, every
//! pixel, every label and every token box still refers to the same place on
//! the page.
//!
//! ## Stages
//!
//! Per sample (parallel):
//! - **Tokenize**: expand segment texts to sub-word ids, map each token back
//!   to its segment, drop segments with no tokens ([`segment_tokenizer`])
//! - **Resize**: one aspect-preserving scale for the image (bilinear), the
//!   label rasters (nearest) and the boxes (realized ratios) ([`preprocessing`])
//! - **Encode**: one-hot class and pos/neg rasters
//!
//! Per batch (after every sample is ready):
//! - **Align**: zero-pad into a stride-aligned arena, anchored top-left ([`batch`])
//! - **Pack**: right-pad token ids and emit an attention mask
//!
//! ## Quick Start
//!
//! ```no_run
//! use docling_grid::{DocumentDataset, GridConfig, GridPipeline, Mode, Split, WordPieceTokenizer};
//!
//! # fn main() -> docling_grid::Result<()> {
//! let dataset = DocumentDataset::open("data/receipts", Split::Train)?;
//! let samples = (0..dataset.len().min(4))
//!     .map(|i| dataset.load(i))
//!     .collect::<docling_grid::Result<Vec<_>>>()?;
//!
//! let tokenizer = WordPieceTokenizer::from_vocab_file("vocab.txt", true)?;
//! let pipeline = GridPipeline::new(GridConfig::default(), tokenizer, Mode::Train)?;
//! let batch = pipeline.process_batch(&samples, 42)?;
//!
//! println!("images {:?}", batch.images.tensors.dim());
//! println!("tokens {:?}", batch.input_ids.dim());
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result`]. Failures inside a batch name the
//! sample index:
//!
//! ```text
//! sample 3: label value 9 exceeds num_classes=7
//! ```

pub mod batch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod preprocessing;
pub mod segment;
pub mod segment_tokenizer;
pub mod stats;
pub mod tokenizer;

pub use error::{GridError, Result};

// Configuration
pub use config::{GridConfig, GridConfigBuilder, POS_NEG_CLASSES};

// Data model
pub use segment::{read_segments_csv, BoundingBox, BoxValidity, PosNeg, Segment};

// Tokenization
pub use segment_tokenizer::{expand_segments, TokenizedDocument};
pub use tokenizer::{HfTokenizer, SubwordTokenizer, WordPieceTokenizer};

// Batching
pub use batch::{align_batch, pack_sequences, ImageList, PackedSequences};

// Pipeline
pub use pipeline::{
    GridBatch, GridPipeline, Mode, PreparedSample, RawSample, SampleProvenance,
};

// Dataset
pub use dataset::{DocumentDataset, Split};
pub use stats::{channel_mean_std, ChannelStats, ChannelStatsAccumulator};
