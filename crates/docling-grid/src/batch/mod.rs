//! Batch-level aggregation
//!
//! Runs after every sample in a batch has finished its per-sample stage:
//! [`align`] pads image and label tensors to one stride-aligned shape, and
//! [`sequence`] pads token id sequences to one length.

pub mod align;
pub mod sequence;

pub use align::{align_batch, pad_to_extent, pad_to_stride, padded_extent, ImageList};
pub use sequence::{pack_sequences, PackedSequences};
