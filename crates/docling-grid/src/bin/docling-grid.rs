//! Docling Grid CLI
//!
//! Runs the alignment pipeline over an on-disk dataset and prints one JSON
//! summary line per batch.
//!
//! Usage:
//!   docling-grid data/receipts --vocab vocab.txt              # Training-mode batches
//!   docling-grid data/receipts --vocab vocab.txt --eval --split test
//!   docling-grid data/receipts --tokenizer-json tokenizer.json
//!   docling-grid data/receipts --stats                        # Channel mean/std of the split

use anyhow::{bail, Context, Result};
use clap::Parser;
use docling_grid::preprocessing::to_chw_unit;
use docling_grid::{
    ChannelStatsAccumulator, DocumentDataset, GridConfig, GridPipeline, HfTokenizer, Mode, Split,
    SubwordTokenizer, WordPieceTokenizer,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docling-grid")]
#[command(about = "Align OCR tokens, page images and label maps into model-ready batches")]
struct Args {
    /// Dataset root containing training_data/ and testing_data/
    root: PathBuf,

    /// WordPiece vocabulary (one token per line)
    #[arg(long)]
    vocab: Option<PathBuf>,

    /// Hugging Face tokenizer.json, used instead of --vocab
    #[arg(long, conflicts_with_all = ["vocab", "lowercase"])]
    tokenizer_json: Option<PathBuf>,

    /// Dataset split (train|test)
    #[arg(long, default_value = "train")]
    split: Split,

    /// JSON pipeline configuration (defaults apply for missing keys)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Documents per batch
    #[arg(long, default_value_t = 4)]
    batch_size: usize,

    /// Seed for training-time size sampling
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Use the fixed evaluation size instead of sampling
    #[arg(long)]
    eval: bool,

    /// Print the split's channel mean/std and exit
    #[arg(long)]
    stats: bool,

    /// Lower-case text before WordPiece lookup
    #[arg(long)]
    lowercase: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GridConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GridConfig::default(),
    };

    let background = i64::try_from(config.num_classes)
        .context("num_classes does not fit a label value")?
        - 1;
    let dataset = DocumentDataset::open(&args.root, args.split)
        .with_context(|| format!("opening dataset at {}", args.root.display()))?
        .with_background_class(background);

    if args.stats {
        return print_stats(&dataset);
    }

    if args.batch_size == 0 {
        bail!("--batch-size must be positive");
    }
    let tokenizer = load_tokenizer(&args)?;

    let mode = if args.eval { Mode::Eval } else { Mode::Train };
    let stride = config.size_divisible_stride;
    let pipeline = GridPipeline::new(config, tokenizer, mode)?;

    let indices: Vec<usize> = (0..dataset.len()).collect();
    for (batch_index, chunk) in indices.chunks(args.batch_size).enumerate() {
        let samples = chunk
            .iter()
            .map(|&i| {
                dataset
                    .load(i)
                    .with_context(|| format!("loading {}", dataset.entries()[i].name))
            })
            .collect::<Result<Vec<_>>>()?;

        let batch = pipeline
            .process_batch(&samples, args.seed.wrapping_add(batch_index as u64))
            .with_context(|| format!("processing batch {batch_index}"))?;

        let (n, c, h, w) = batch.images.tensors.dim();
        log::info!("Batch {batch_index}: {n}x{c}x{h}x{w} (stride {stride})");

        let summary = json!({
            "batch": batch_index,
            "images": [n, c, h, w],
            "class_labels": batch.class_labels.shape(),
            "sequence_length": batch.input_ids.ncols(),
            "tokens": batch.segment_indices.iter().map(Vec::len).collect::<Vec<_>>(),
            "segments": batch.coordinates.iter().map(Vec::len).collect::<Vec<_>>(),
            "samples": batch.provenance,
        });
        println!("{summary}");
    }

    Ok(())
}

fn load_tokenizer(args: &Args) -> Result<Box<dyn SubwordTokenizer>> {
    if let Some(path) = &args.tokenizer_json {
        let tokenizer = HfTokenizer::from_file(path)
            .with_context(|| format!("loading tokenizer {}", path.display()))?;
        log::info!("Loaded tokenizer.json with {} tokens", tokenizer.vocab_size());
        return Ok(Box::new(tokenizer));
    }

    let Some(vocab) = &args.vocab else {
        bail!("--vocab or --tokenizer-json is required unless --stats is given");
    };
    let tokenizer = WordPieceTokenizer::from_vocab_file(vocab, args.lowercase)
        .with_context(|| format!("loading vocabulary {}", vocab.display()))?;
    log::info!("Loaded vocabulary of {} tokens", tokenizer.vocab_size());
    Ok(Box::new(tokenizer))
}

fn print_stats(dataset: &DocumentDataset) -> Result<()> {
    let mut acc = ChannelStatsAccumulator::new();
    for (i, entry) in dataset.entries().iter().enumerate() {
        let rgb = dataset
            .load_image(i)
            .with_context(|| format!("loading image for {}", entry.name))?;
        acc.push(&to_chw_unit(&rgb))?;
    }
    let stats = acc.finish().context("computing channel statistics")?;
    println!("{}", serde_json::to_string(&stats)?);
    Ok(())
}
