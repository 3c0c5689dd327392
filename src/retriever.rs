use crate::error::Result;
use crate::knowledge::QaPair;
use crate::utils::normalize;
use crate::vector_db::{KnowledgeEntry, VectorDB};

/// Best entry for a query, with its position in the index
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    pub position: usize,
    pub similarity: f32,
    pub entry: &'a KnowledgeEntry,
}

pub struct Retriever {
    vector_db: VectorDB,
}

impl Retriever {
    pub fn new(vector_db: VectorDB) -> Self {
        Retriever { vector_db }
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = QaPair>) -> Result<Self> {
        Ok(Self::new(VectorDB::build(pairs)?))
    }

    /// Cosine similarity of the query against every entry, in index order.
    pub fn similarities(&self, query: &str) -> Vec<f32> {
        let query_vector = self.vector_db.vectorize(&normalize(query));
        self.vector_db
            .document_vectors()
            .iter()
            .map(|doc| query_vector.cosine_similarity(doc))
            .collect()
    }

    /// Picks the most similar entry; the lowest position wins ties.
    ///
    /// A query with no known terms scores 0.0 everywhere and therefore
    /// resolves to entry 0.
    pub fn best_match(&self, query: &str) -> Match<'_> {
        let similarities = self.similarities(query);

        let mut position = 0;
        let mut best = similarities[0];
        for (i, &similarity) in similarities.iter().enumerate().skip(1) {
            if similarity > best {
                position = i;
                best = similarity;
            }
        }

        let m = Match {
            position,
            similarity: best,
            entry: &self.vector_db.entries()[position],
        };
        tracing::debug!(
            query,
            position = m.position,
            similarity = m.similarity,
            question = %m.entry.question,
            "matched query"
        );
        m
    }

    pub fn respond(&self, query: &str) -> &str {
        &self.best_match(query).entry.answer
    }

    pub fn vector_db(&self) -> &VectorDB {
        &self.vector_db
    }
}
