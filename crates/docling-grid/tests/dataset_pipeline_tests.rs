//! Dataset-to-batch tests over a temporary on-disk dataset

use docling_grid::{
    channel_mean_std, DocumentDataset, GridConfig, GridPipeline, Mode, Split, WordPieceTokenizer,
};
use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const VOCAB: &str = "[PAD]\n[UNK]\nacme\ntotal\n:\n1\n##2\n.\n50\n";

fn write_document(root: &Path, split: Split, name: &str, rows: &[&str], size: (u32, u32)) {
    let dir = root.join(split.dir_name());
    fs::create_dir_all(dir.join("_label_csv")).unwrap();
    fs::create_dir_all(dir.join("images")).unwrap();

    let mut csv = String::from("left,top,right,bot,text,data_class,pos_neg\n");
    for row in rows {
        csv.push_str(row);
        csv.push('\n');
    }
    fs::write(dir.join("_label_csv").join(format!("{name}.csv")), csv).unwrap();

    RgbImage::from_fn(size.0, size.1, |x, _| {
        if x % 2 == 0 {
            Rgb([255, 255, 255])
        } else {
            Rgb([0, 0, 0])
        }
    })
    .save(dir.join("images").join(format!("{name}.png")))
    .unwrap();
}

fn fixture() -> TempDir {
    let root = tempfile::tempdir().unwrap();
    write_document(
        root.path(),
        Split::Train,
        "receipt_001",
        &["4,4,40,12,ACME,0,1", "0,0,0,0,,6,0", "50,30,10,20,Total: 12.50,3,1"],
        (80, 60),
    );
    write_document(
        root.path(),
        Split::Train,
        "receipt_002",
        &["2,2,20,10,acme,0,2"],
        (50, 90),
    );
    fs::write(root.path().join("vocab.txt"), VOCAB).unwrap();
    root
}

fn load_all(dataset: &DocumentDataset) -> Vec<docling_grid::RawSample> {
    (0..dataset.len()).map(|i| dataset.load(i).unwrap()).collect()
}

#[test]
fn test_dataset_batch_end_to_end() {
    let root = fixture();
    let config = GridConfig::default();
    let dataset = DocumentDataset::open(root.path(), Split::Train)
        .unwrap()
        .with_background_class(config.num_classes as i64 - 1);
    assert_eq!(dataset.len(), 2);

    let tokenizer =
        WordPieceTokenizer::from_vocab_file(root.path().join("vocab.txt"), true).unwrap();
    let pipeline = GridPipeline::new(config, tokenizer, Mode::Eval).unwrap();
    let batch = pipeline.process_batch(&load_all(&dataset), 3).unwrap();

    assert_eq!(batch.len(), 2);
    // 60x80 -> 512x683 and 90x50 -> 800x444 (long edge capped at 800)
    assert_eq!(batch.images.image_sizes, [(512, 683), (800, 444)]);
    assert_eq!(batch.images.tensors.dim(), (2, 3, 800, 704));
    assert_eq!(batch.class_labels.dim(), (2, 7, 800, 704));

    // receipt_001: "ACME" | "Total: 12.50" with the empty segment dropped
    assert_eq!(batch.texts[0], ["ACME", "Total: 12.50"]);
    assert_eq!(batch.segment_indices[0], [0, 1, 1, 1, 1, 1, 1]);
    assert_eq!(batch.input_ids.row(0).to_vec(), [2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(batch.attention_mask.row(1).to_vec(), [1, 0, 0, 0, 0, 0, 0]);
    assert_eq!(batch.provenance[0].dropped_segments, 1);
    assert_eq!(batch.provenance[0].swapped_boxes, 1);

    // The swapped box (50,30,10,20) is normalized then scaled by 512/60
    let b = batch.coordinates[0][1];
    assert!(b.left < b.right && b.top < b.bottom);
    assert_eq!((b.left, b.top), (85, 170));
}

#[test]
fn test_dataset_channel_stats() {
    let root = fixture();
    let dataset = DocumentDataset::open(root.path(), Split::Train).unwrap();
    let images: Vec<_> = load_all(&dataset).into_iter().map(|s| s.image).collect();

    let stats = channel_mean_std(&images).unwrap();
    assert_eq!(stats.images, 2);
    // Alternating white/black columns over even widths: mean exactly 0.5
    assert!(stats.mean.iter().all(|&m| (m - 0.5).abs() < 1e-6));
    assert!(stats.std.iter().all(|&s| s > 0.49 && s < 0.52));
}

#[test]
fn test_train_mode_batches_reproducible_under_seed() {
    let root = fixture();
    let dataset = DocumentDataset::open(root.path(), Split::Train).unwrap();
    let samples = load_all(&dataset);
    let tokenizer =
        WordPieceTokenizer::from_vocab_file(root.path().join("vocab.txt"), true).unwrap();
    let pipeline = GridPipeline::new(GridConfig::default(), tokenizer, Mode::Train).unwrap();

    let a = pipeline.process_batch(&samples, 5).unwrap();
    let b = pipeline.process_batch(&samples, 5).unwrap();
    assert_eq!(a.provenance, b.provenance);
    assert_eq!(a.class_labels, b.class_labels);

    let (_, _, h, w) = a.images.tensors.dim();
    assert_eq!(h % 32, 0);
    assert_eq!(w % 32, 0);
}
