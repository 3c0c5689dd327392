use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// A question/answer row as it appears in the dataset.
///
/// Only the `Question` and `Answer` columns are read; anything else in the
/// row is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QaPair {
    #[serde(rename = "Question")]
    pub question: String,
    #[serde(rename = "Answer")]
    pub answer: String,
}

#[cfg(test)]
impl QaPair {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        QaPair {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Loads the knowledge base from a `.csv` or `.json` file.
///
/// Loading is all-or-nothing: the first row that cannot be decoded aborts
/// with [`Error::MalformedRow`], numbered from 1 over data rows.
pub fn load_knowledge_base(path: impl AsRef<Path>) -> Result<Vec<QaPair>> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();

    let content = fs::read_to_string(path).map_err(|source| Error::Dataset {
        path: path.to_path_buf(),
        source,
    })?;

    let pairs = match extension.as_str() {
        "csv" => parse_csv(&content)?,
        "json" => parse_json(&content)?,
        other => {
            return Err(Error::UnsupportedFormat(format!(
                "{:?} (expected .csv or .json, got {:?})",
                path, other
            )));
        }
    };

    tracing::info!(path = ?path, pairs = pairs.len(), "loaded knowledge base");
    Ok(pairs)
}

fn parse_csv(content: &str) -> Result<Vec<QaPair>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let mut pairs = Vec::new();
    for (i, record) in reader.deserialize::<QaPair>().enumerate() {
        let pair = record.map_err(|e| Error::MalformedRow {
            row: i + 1,
            reason: e.to_string(),
        })?;
        pairs.push(pair);
    }
    Ok(pairs)
}

fn parse_json(content: &str) -> Result<Vec<QaPair>> {
    let rows: Vec<serde_json::Value> =
        serde_json::from_str(content).map_err(|e| Error::MalformedRow {
            row: 0,
            reason: format!("dataset is not a JSON array of objects: {e}"),
        })?;

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| {
            serde_json::from_value(row).map_err(|e| Error::MalformedRow {
                row: i + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}
