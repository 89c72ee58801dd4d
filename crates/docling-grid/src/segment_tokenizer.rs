//! Segment tokenization with segment-index bookkeeping
//!
//! Expands each OCR segment's text into sub-word tokens and records, for every
//! token, which segment it came from. Segments whose text is empty, blank, or
//! tokenizes to nothing are dropped from *all* parallel outputs at once, and
//! the surviving segments are renumbered without gaps:
//!
//! ```text
//! segments:        "Acme"   ""    "Total 12"
//! raw index:         0       1        2
//! filtered index:    0       -        1
//! tokens:          acme          total  1  ##2
//! segment index:     0             1    1   1
//! ```
//!
//! Boxes of surviving segments are normalized (see [`BoundingBox::normalized`])
//! and clamped at the origin, so later stages only ever see ordered,
//! non-negative corners.

use crate::error::{GridError, Result};
use crate::segment::{BoundingBox, PosNeg, Segment};
use crate::tokenizer::SubwordTokenizer;

/// Token stream and filtered segment lists for one document
///
/// `boxes`, `classes`, `pos_neg` and `texts` are parallel and indexed by
/// filtered segment index; `tokens`, `token_ids` and `segment_index_per_token`
/// are parallel and indexed by token position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenizedDocument {
    pub tokens: Vec<String>,
    pub token_ids: Vec<u32>,
    pub segment_index_per_token: Vec<usize>,
    pub boxes: Vec<BoundingBox>,
    pub classes: Vec<i64>,
    pub pos_neg: Vec<PosNeg>,
    pub texts: Vec<String>,
    /// Segments dropped for having no text or no tokens
    pub dropped_segments: usize,
    /// Surviving segments whose box corners had to be swapped
    pub swapped_boxes: usize,
}

impl TokenizedDocument {
    /// Number of segments that survived filtering
    #[inline]
    #[must_use]
    pub fn num_segments(&self) -> usize {
        self.boxes.len()
    }

    /// Number of sub-word tokens
    #[inline]
    #[must_use]
    pub fn num_tokens(&self) -> usize {
        self.token_ids.len()
    }
}

/// Running state of the single pass over a document's segments
#[derive(Default)]
struct Expansion {
    raw_index: usize,
    filtered_index: usize,
    doc: TokenizedDocument,
}

impl Expansion {
    fn skip(mut self) -> Self {
        self.raw_index += 1;
        self.doc.dropped_segments += 1;
        self
    }

    fn keep(mut self, segment: &Segment, pieces: Vec<String>) -> Self {
        let (bbox, validity) = segment.bbox.normalized();
        if validity.was_swapped() {
            log::debug!(
                "Segment {} box {:?} normalized to {:?}",
                self.raw_index,
                segment.bbox,
                bbox
            );
            self.doc.swapped_boxes += 1;
        }

        self.doc.boxes.push(bbox.clamped_to_origin());
        self.doc.classes.push(segment.class_id);
        self.doc.pos_neg.push(segment.pos_neg);
        self.doc.texts.push(segment.text.clone());
        self.doc
            .segment_index_per_token
            .extend(std::iter::repeat(self.filtered_index).take(pieces.len()));
        self.doc.tokens.extend(pieces);

        self.raw_index += 1;
        self.filtered_index += 1;
        self
    }
}

/// Tokenize a document's segments, dropping the ones that yield no tokens
///
/// Never fails on content; a document with no survivable segment produces an
/// empty [`TokenizedDocument`]. Tokenizer failures propagate unchanged.
pub fn expand_segments<T>(segments: &[Segment], tokenizer: &T) -> Result<TokenizedDocument>
where
    T: SubwordTokenizer + ?Sized,
{
    let expansion = segments
        .iter()
        .try_fold(Expansion::default(), |state, segment| {
            if segment.text.trim().is_empty() {
                return Ok::<_, GridError>(state.skip());
            }
            let pieces = tokenizer.tokenize(&segment.text)?;
            if pieces.is_empty() {
                return Ok(state.skip());
            }
            Ok(state.keep(segment, pieces))
        })?;

    debug_assert_eq!(expansion.raw_index, segments.len());
    debug_assert_eq!(expansion.filtered_index, expansion.doc.boxes.len());

    let mut doc = expansion.doc;
    doc.token_ids = tokenizer.ids_of(&doc.tokens)?;
    if doc.token_ids.len() != doc.tokens.len() {
        return Err(GridError::TokenizerError {
            reason: format!(
                "ids_of returned {} ids for {} tokens",
                doc.token_ids.len(),
                doc.tokens.len()
            ),
        });
    }

    if doc.dropped_segments > 0 {
        log::debug!(
            "Dropped {} of {} segments with no tokens",
            doc.dropped_segments,
            segments.len()
        );
    }

    Ok(doc)
}
