//! On-disk document dataset
//!
//! Expected layout:
//!
//! ```text
//! <root>/
//! ├── training_data/
//! │   ├── _label_csv/<name>.csv
//! │   └── images/<name>.png
//! └── testing_data/
//!     ├── _label_csv/<name>.csv
//!     └── images/<name>.png
//! ```
//!
//! Each CSV lists one document's segments (see [`read_segments_csv`]). The
//! label rasters are painted from those segments at load time.

use crate::error::{GridError, Result};
use crate::pipeline::RawSample;
use crate::preprocessing::{rasterize_labels, to_chw_unit};
use crate::segment::read_segments_csv;
use image::RgbImage;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Class painted where no segment box lies ("others" in the receipt schema)
pub const DEFAULT_BACKGROUND_CLASS: i64 = 6;

const LABEL_DIR: &str = "_label_csv";
const IMAGE_DIR: &str = "images";
const IMAGE_EXT: &str = "png";

/// Dataset partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Split {
    #[default]
    Train,
    Test,
}

impl Split {
    /// Directory name under the dataset root
    #[must_use]
    pub const fn dir_name(self) -> &'static str {
        match self {
            Self::Train => "training_data",
            Self::Test => "testing_data",
        }
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Test => write!(f, "test"),
        }
    }
}

impl FromStr for Split {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "train" | "training" => Ok(Self::Train),
            "test" | "testing" | "eval" => Ok(Self::Test),
            other => Err(format!("unknown split '{other}', expected train or test")),
        }
    }
}

/// Files belonging to one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentEntry {
    pub name: String,
    pub csv_path: PathBuf,
    pub image_path: PathBuf,
}

/// Sorted index of the documents in one split
#[derive(Debug, Clone)]
pub struct DocumentDataset {
    split: Split,
    entries: Vec<DocumentEntry>,
    background_class: i64,
}

impl DocumentDataset {
    /// Index `<root>/<split>/_label_csv/*.csv`
    ///
    /// Image files are not checked until a document is loaded.
    pub fn open<P: AsRef<Path>>(root: P, split: Split) -> Result<Self> {
        let split_dir = root.as_ref().join(split.dir_name());
        let label_dir = split_dir.join(LABEL_DIR);
        let image_dir = split_dir.join(IMAGE_DIR);
        if !label_dir.is_dir() {
            return Err(GridError::DatasetError {
                reason: format!("missing label directory {}", label_dir.display()),
            });
        }

        let mut entries = Vec::new();
        for dir_entry in std::fs::read_dir(&label_dir)? {
            let csv_path = dir_entry?.path();
            if csv_path.extension().and_then(|e| e.to_str()) != Some("csv") {
                continue;
            }
            let Some(name) = csv_path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let name = name.to_string();
            let image_path = image_dir.join(format!("{name}.{IMAGE_EXT}"));
            entries.push(DocumentEntry {
                name,
                csv_path,
                image_path,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        log::info!(
            "Found {} {split} documents in {}",
            entries.len(),
            split_dir.display()
        );

        Ok(Self {
            split,
            entries,
            background_class: DEFAULT_BACKGROUND_CLASS,
        })
    }

    /// Set the class painted outside every segment box
    #[must_use = "returns the dataset with the background class set"]
    pub const fn with_background_class(mut self, class: i64) -> Self {
        self.background_class = class;
        self
    }

    #[inline]
    #[must_use]
    pub const fn split(&self) -> Split {
        self.split
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[DocumentEntry] {
        &self.entries
    }

    fn entry(&self, index: usize) -> Result<&DocumentEntry> {
        self.entries.get(index).ok_or_else(|| GridError::DatasetError {
            reason: format!("document {index} out of range (len {})", self.entries.len()),
        })
    }

    /// Decode a document's page image as RGB
    pub fn load_image(&self, index: usize) -> Result<RgbImage> {
        let entry = self.entry(index)?;
        if !entry.image_path.is_file() {
            return Err(GridError::DatasetError {
                reason: format!(
                    "missing image {} for {}",
                    entry.image_path.display(),
                    entry.name
                ),
            });
        }
        Ok(image::open(&entry.image_path)?.to_rgb8())
    }

    /// Load one document as a pipeline-ready sample
    pub fn load(&self, index: usize) -> Result<RawSample> {
        let entry = self.entry(index)?;
        let segments = read_segments_csv(&entry.csv_path)?;
        let rgb = self.load_image(index)?;
        let (width, height) = rgb.dimensions();
        let rasters = rasterize_labels(
            height as usize,
            width as usize,
            &segments,
            self.background_class,
        );

        log::debug!(
            "Loaded {} ({}x{}, {} segments)",
            entry.name,
            height,
            width,
            segments.len()
        );

        Ok(RawSample {
            name: entry.name.clone(),
            image: to_chw_unit(&rgb),
            class_map: rasters.class_map,
            pos_neg_map: rasters.pos_neg_map,
            segments,
        })
    }
}
