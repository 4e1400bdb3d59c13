//! ClickMe CSV loading and grouping of trials by image.

#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// One CSV row: one subject's clicks on one image. Other columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClickRow {
    pub image_path: String,
    pub clicks: String,
}

/// Serialized trials of one image, in row order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawImage {
    /// `category/...` path identifying the image.
    pub key: String,
    pub clicks: Vec<String>,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid CSV row: {0}")]
    Csv(#[from] csv::Error),
}

/// Reads every row from a CSV with a header line.
pub fn read_rows<R: io::Read>(reader: R) -> Result<Vec<ClickRow>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut rows = Vec::new();
    for row in reader.deserialize() {
        rows.push(row?);
    }
    Ok(rows)
}

pub fn read_csv(path: &Path) -> Result<Vec<ClickRow>, DatasetError> {
    let file = std::fs::File::open(path).map_err(|source| DatasetError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let rows = read_rows(io::BufReader::new(file))?;
    tracing::info!(path = %path.display(), rows = rows.len(), "Loaded click rows");
    Ok(rows)
}

/// Groups rows by image key, keeping images in first-seen order.
///
/// `prefix` (e.g. the image folder name) is stripped from `image_path`.
pub fn group_by_image(rows: Vec<ClickRow>, prefix: Option<&str>) -> Vec<RawImage> {
    let mut images: Vec<RawImage> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let key = match prefix {
            Some(prefix) => row.image_path.replacen(prefix, "", 1),
            None => row.image_path,
        };
        match index.get(&key) {
            Some(&i) => images[i].clicks.push(row.clicks),
            None => {
                index.insert(key.clone(), images.len());
                images.push(RawImage {
                    key,
                    clicks: vec![row.clicks],
                });
            }
        }
    }
    images
}

/// Category of an image: the first path segment of its key.
pub fn category_of(key: &str) -> &str {
    key.split('/').next().unwrap_or(key)
}
