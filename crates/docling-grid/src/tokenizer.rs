//! Sub-word tokenizer capability
//!
//! The pipeline consumes tokenization through [`SubwordTokenizer`] only:
//! `tokenize(text)` splits a segment's text into sub-word strings and
//! `ids_of(tokens)` maps them to vocabulary ids. Both must be deterministic for
//! a given text and vocabulary.
//!
//! Two implementations ship with the crate, both built on the `tokenizers`
//! crate:
//! - [`WordPieceTokenizer`]: BERT-style WordPiece over a `vocab.txt`
//! - [`HfTokenizer`]: any Hugging Face `tokenizer.json`

use crate::error::{GridError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::Tokenizer;

/// Expands text into sub-word tokens and maps tokens to ids
pub trait SubwordTokenizer: Send + Sync {
    /// Split `text` into ordered sub-word strings (possibly none)
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;

    /// Map sub-word strings to vocabulary ids, one id per token
    fn ids_of(&self, tokens: &[String]) -> Result<Vec<u32>>;
}

impl<T: SubwordTokenizer + ?Sized> SubwordTokenizer for &T {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        (**self).tokenize(text)
    }

    fn ids_of(&self, tokens: &[String]) -> Result<Vec<u32>> {
        (**self).ids_of(tokens)
    }
}

impl<T: SubwordTokenizer + ?Sized> SubwordTokenizer for Box<T> {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        (**self).tokenize(text)
    }

    fn ids_of(&self, tokens: &[String]) -> Result<Vec<u32>> {
        (**self).ids_of(tokens)
    }
}

impl<T: SubwordTokenizer + ?Sized> SubwordTokenizer for Arc<T> {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        (**self).tokenize(text)
    }

    fn ids_of(&self, tokens: &[String]) -> Result<Vec<u32>> {
        (**self).ids_of(tokens)
    }
}

/// Unknown-token marker used by BERT vocabularies
pub const UNK_TOKEN: &str = "[UNK]";

/// Continuation prefix for non-initial word pieces
const CONTINUATION_PREFIX: &str = "##";

/// Words longer than this many characters become a single `[UNK]`
const MAX_INPUT_CHARS_PER_WORD: usize = 100;

fn encode_tokens(tokenizer: &Tokenizer, text: &str) -> Result<Vec<String>> {
    let encoding = tokenizer
        .encode(text, false)
        .map_err(|e| GridError::TokenizerError {
            reason: format!("failed to encode text: {e}"),
        })?;
    Ok(encoding.get_tokens().to_vec())
}

/// BERT-style WordPiece tokenizer over a `vocab.txt`
///
/// Text is cleaned (control and format characters removed), CJK ideographs
/// are isolated and, when `lowercase` is set, lower-cased with accents
/// stripped (NFD, combining marks dropped). It is then split on whitespace
/// and Unicode punctuation, and each word is split greedily into the longest
/// vocabulary pieces with `##` marking continuation pieces.
#[derive(Clone)]
pub struct WordPieceTokenizer {
    tokenizer: Tokenizer,
    unk_id: u32,
    lowercase: bool,
}

impl std::fmt::Debug for WordPieceTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WordPieceTokenizer")
            .field("vocab_size", &self.vocab_size())
            .field("unk_id", &self.unk_id)
            .field("lowercase", &self.lowercase)
            .finish()
    }
}

impl WordPieceTokenizer {
    /// Load a `vocab.txt` (one token per line, id = line number)
    pub fn from_vocab_file<P: AsRef<Path>>(path: P, lowercase: bool) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let tokenizer = Self::from_tokens(text.lines().map(str::trim_end), lowercase)?;
        log::debug!(
            "Loaded WordPiece vocabulary ({} tokens) from {}",
            tokenizer.vocab_size(),
            path.as_ref().display()
        );
        Ok(tokenizer)
    }

    /// Build from tokens in id order
    ///
    /// The vocabulary must contain `[UNK]`. Duplicate tokens keep their first id.
    pub fn from_tokens<I, S>(tokens: I, lowercase: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = HashMap::new();
        for (id, token) in tokens.into_iter().enumerate() {
            let id = u32::try_from(id).map_err(|_| GridError::TokenizerError {
                reason: "vocabulary exceeds u32::MAX entries".to_string(),
            })?;
            vocab.entry(token.into()).or_insert(id);
        }

        let unk_id = *vocab.get(UNK_TOKEN).ok_or_else(|| GridError::TokenizerError {
            reason: format!("vocabulary has no {UNK_TOKEN} token"),
        })?;

        let wordpiece = WordPiece::builder()
            .vocab(vocab.into_iter().collect())
            .unk_token(UNK_TOKEN.to_string())
            .continuing_subword_prefix(CONTINUATION_PREFIX.to_string())
            .max_input_chars_per_word(MAX_INPUT_CHARS_PER_WORD)
            .build()
            .map_err(|e| GridError::TokenizerError {
                reason: format!("failed to build WordPiece model: {e}"),
            })?;

        let mut tokenizer = Tokenizer::new(wordpiece);
        // Accent stripping follows `lowercase`, as in uncased BERT
        tokenizer.with_normalizer(Some(BertNormalizer::new(true, true, None, lowercase)));
        tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

        Ok(Self {
            tokenizer,
            unk_id,
            lowercase,
        })
    }

    #[inline]
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(false)
    }

    #[inline]
    #[must_use]
    pub fn token_to_id(&self, token: &str) -> Option<u32> {
        self.tokenizer.token_to_id(token)
    }

    #[inline]
    #[must_use]
    pub const fn lowercase(&self) -> bool {
        self.lowercase
    }
}

impl SubwordTokenizer for WordPieceTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        encode_tokens(&self.tokenizer, text)
    }

    fn ids_of(&self, tokens: &[String]) -> Result<Vec<u32>> {
        Ok(tokens
            .iter()
            .map(|token| self.token_to_id(token).unwrap_or(self.unk_id))
            .collect())
    }
}

/// Adapter over a Hugging Face `tokenizers::Tokenizer`
///
/// Unlike [`WordPieceTokenizer`], `ids_of` fails on a token the vocabulary
/// does not contain.
pub struct HfTokenizer {
    tokenizer: Tokenizer,
}

impl std::fmt::Debug for HfTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HfTokenizer")
            .field("tokenizer", &"<Tokenizer>")
            .finish()
    }
}

impl HfTokenizer {
    /// Load from a `tokenizer.json`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let tokenizer = Tokenizer::from_file(path).map_err(|e| GridError::TokenizerError {
            reason: format!("failed to load tokenizer from {}: {e}", path.display()),
        })?;
        log::debug!(
            "Loaded tokenizer ({} tokens) from {}",
            tokenizer.get_vocab_size(true),
            path.display()
        );
        Ok(Self { tokenizer })
    }

    /// Wrap an already-built tokenizer
    #[must_use]
    pub const fn from_tokenizer(tokenizer: Tokenizer) -> Self {
        Self { tokenizer }
    }

    /// Vocabulary size including added tokens
    #[inline]
    #[must_use]
    pub fn vocab_size(&self) -> usize {
        self.tokenizer.get_vocab_size(true)
    }
}

impl SubwordTokenizer for HfTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        encode_tokens(&self.tokenizer, text)
    }

    fn ids_of(&self, tokens: &[String]) -> Result<Vec<u32>> {
        tokens
            .iter()
            .map(|token| {
                self.tokenizer
                    .token_to_id(token)
                    .ok_or_else(|| GridError::TokenizerError {
                        reason: format!("token {token:?} is not in the vocabulary"),
                    })
            })
            .collect()
    }
}
