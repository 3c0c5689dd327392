use ndarray::Array1;
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::knowledge::QaPair;
use crate::utils::{normalize, tokenize};

/// A knowledge base entry. Its position in the index is its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub question: String,
    pub answer: String,
    pub normalized_question: String,
}

/// Term to column id mapping, ids assigned in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Vocabulary {
    ids: FxHashMap<String, usize>,
    terms: Vec<String>,
}

impl Vocabulary {
    /// Builds the vocabulary from normalized documents, walking documents in
    /// order and terms left to right.
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a str>) -> Self {
        let mut vocabulary = Vocabulary::default();
        for document in documents {
            for term in tokenize(document) {
                if !vocabulary.ids.contains_key(term) {
                    vocabulary.ids.insert(term.to_string(), vocabulary.terms.len());
                    vocabulary.terms.push(term.to_string());
                }
            }
        }
        vocabulary
    }

    pub fn id(&self, term: &str) -> Option<usize> {
        self.ids.get(term).copied()
    }

    /// Terms ordered by column id
    #[cfg(test)]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

/// Sparse vector over vocabulary columns, kept sorted by column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SparseVector {
    entries: Vec<(usize, f32)>,
    norm: f32,
}

impl SparseVector {
    fn from_weights(mut entries: Vec<(usize, f32)>) -> Self {
        entries.sort_unstable_by_key(|&(column, _)| column);
        let norm = entries.iter().map(|&(_, w)| w * w).sum::<f32>().sqrt();
        SparseVector { entries, norm }
    }

    /// `(column, weight)` pairs in ascending column order
    #[cfg(test)]
    pub fn entries(&self) -> &[(usize, f32)] {
        &self.entries
    }

    #[cfg(test)]
    pub fn norm(&self) -> f32 {
        self.norm
    }

    pub fn dot(&self, other: &SparseVector) -> f32 {
        let (mut i, mut j) = (0, 0);
        let mut sum = 0.0;
        while i < self.entries.len() && j < other.entries.len() {
            let (a_col, a_w) = self.entries[i];
            let (b_col, b_w) = other.entries[j];
            if a_col == b_col {
                sum += a_w * b_w;
                i += 1;
                j += 1;
            } else if a_col < b_col {
                i += 1;
            } else {
                j += 1;
            }
        }
        sum
    }

    /// Cosine similarity, 0.0 when either side has zero magnitude.
    pub fn cosine_similarity(&self, other: &SparseVector) -> f32 {
        let denom = self.norm * other.norm;
        if denom == 0.0 {
            return 0.0;
        }

        let result = self.dot(other) / denom;
        if !result.is_finite() {
            return 0.0;
        }
        result.clamp(-1.0, 1.0)
    }
}

/// Immutable TF-IDF index over the knowledge base questions.
#[derive(Debug, Clone)]
pub struct VectorDB {
    entries: Vec<KnowledgeEntry>,
    vocabulary: Vocabulary,
    idf_values: Array1<f32>,
    document_vectors: Vec<SparseVector>,
}

impl VectorDB {
    pub fn build(pairs: impl IntoIterator<Item = QaPair>) -> Result<Self> {
        let entries: Vec<KnowledgeEntry> = pairs
            .into_iter()
            .map(|pair| KnowledgeEntry {
                normalized_question: normalize(&pair.question),
                question: pair.question,
                answer: pair.answer,
            })
            .collect();

        if entries.is_empty() {
            return Err(Error::EmptyCorpus);
        }

        let vocabulary =
            Vocabulary::from_documents(entries.iter().map(|e| e.normalized_question.as_str()));
        if vocabulary.is_empty() {
            tracing::warn!(
                entries = entries.len(),
                "no question has a content word, every query will match the first entry"
            );
        }
        let idf_values = Self::calculate_idf(&vocabulary, &entries);

        let mut db = VectorDB {
            entries,
            vocabulary,
            idf_values,
            document_vectors: Vec::new(),
        };
        db.document_vectors = db
            .entries
            .iter()
            .map(|entry| db.vectorize(&entry.normalized_question))
            .collect();

        tracing::info!(
            entries = db.entries.len(),
            vocabulary = db.vocabulary.len(),
            "built TF-IDF index"
        );
        Ok(db)
    }

    /// Smoothed idf: `ln((1 + N) / (1 + df)) + 1`, always positive.
    fn calculate_idf(vocabulary: &Vocabulary, entries: &[KnowledgeEntry]) -> Array1<f32> {
        let mut doc_freq = vec![0u32; vocabulary.len()];
        let mut last_seen: Vec<Option<usize>> = vec![None; vocabulary.len()];

        for (position, entry) in entries.iter().enumerate() {
            for term in tokenize(&entry.normalized_question) {
                if let Some(id) = vocabulary.id(term) {
                    if last_seen[id] != Some(position) {
                        last_seen[id] = Some(position);
                        doc_freq[id] += 1;
                    }
                }
            }
        }

        let doc_count = entries.len() as f32;
        Array1::from(doc_freq).mapv(|df| ((1.0 + doc_count) / (1.0 + df as f32)).ln() + 1.0)
    }

    /// Projects normalized text into the index's vector space.
    ///
    /// Terms outside the vocabulary are dropped. Nothing in the index changes.
    pub fn vectorize(&self, normalized: &str) -> SparseVector {
        let mut term_freq: FxHashMap<usize, u32> = FxHashMap::default();
        for term in tokenize(normalized) {
            if let Some(id) = self.vocabulary.id(term) {
                *term_freq.entry(id).or_insert(0) += 1;
            }
        }

        let weights = term_freq
            .into_iter()
            .map(|(id, tf)| (id, tf as f32 * self.idf_values[id]))
            .collect();
        SparseVector::from_weights(weights)
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    #[cfg(test)]
    pub fn idf_values(&self) -> &Array1<f32> {
        &self.idf_values
    }

    pub fn document_vectors(&self) -> &[SparseVector] {
        &self.document_vectors
    }
}
