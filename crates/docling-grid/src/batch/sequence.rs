//! Right-padding of token id sequences with an attention mask

use ndarray::Array2;

/// Padded token ids and their validity mask
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedSequences {
    /// `[N, L*]`, padded on the right with the pad id
    pub input_ids: Array2<u32>,
    /// `[N, L*]`, 1 for real tokens and 0 for padding
    pub attention_mask: Array2<u8>,
    /// Unpadded length of each sequence
    pub lengths: Vec<usize>,
}

impl PackedSequences {
    /// Padded length `L*`
    #[inline]
    #[must_use]
    pub fn max_len(&self) -> usize {
        self.input_ids.ncols()
    }
}

/// Pad every sequence to the longest one in the batch
///
/// An all-empty batch yields `[N, 0]` tensors.
#[must_use = "returns the packed sequences"]
pub fn pack_sequences<S: AsRef<[u32]>>(sequences: &[S], pad_id: u32) -> PackedSequences {
    let lengths: Vec<usize> = sequences.iter().map(|s| s.as_ref().len()).collect();
    let max_len = lengths.iter().copied().max().unwrap_or(0);

    let mut input_ids = Array2::from_elem((sequences.len(), max_len), pad_id);
    let mut attention_mask = Array2::<u8>::zeros((sequences.len(), max_len));

    for (i, sequence) in sequences.iter().enumerate() {
        for (t, &id) in sequence.as_ref().iter().enumerate() {
            input_ids[[i, t]] = id;
            attention_mask[[i, t]] = 1;
        }
    }

    PackedSequences {
        input_ids,
        attention_mask,
        lengths,
    }
}
