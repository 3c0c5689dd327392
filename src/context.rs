use serde::Serialize;

use crate::config::AppConfig;
use crate::entities::{CapitalizedSpanExtractor, EntityExtractor, NoEntities};
use crate::error::Result;
use crate::knowledge::load_knowledge_base;
use crate::retriever::Retriever;
use crate::speech::{Speaker, Transcriber, speaker_from_config, transcriber_from_config};

/// Reply to a chat query. The answer goes out under `response`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChatReply {
    #[serde(rename = "response")]
    pub answer: String,
    pub entities: Vec<String>,
}

impl ChatReply {
    pub fn text(answer: impl Into<String>) -> Self {
        ChatReply {
            answer: answer.into(),
            entities: Vec::new(),
        }
    }
}

/// Everything a request needs, built once at startup and never mutated.
pub struct AppState {
    pub retriever: Retriever,
    pub entities: Box<dyn EntityExtractor>,
    pub transcriber: Box<dyn Transcriber>,
    pub speaker: Box<dyn Speaker>,
}

impl AppState {
    pub fn new(
        retriever: Retriever,
        entities: Box<dyn EntityExtractor>,
        transcriber: Box<dyn Transcriber>,
        speaker: Box<dyn Speaker>,
    ) -> Self {
        AppState {
            retriever,
            entities,
            transcriber,
            speaker,
        }
    }

    /// Load the dataset, build the index and wire up the collaborators.
    ///
    /// Any failure here is fatal: there is nothing to serve without an index.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let pairs = load_knowledge_base(&config.dataset)?;
        let retriever = Retriever::from_pairs(pairs)?;

        if config.speech.endpoint.is_none() {
            tracing::warn!("no speech endpoint configured, voice chat will be unavailable");
        }

        let entities: Box<dyn EntityExtractor> = if config.extract_entities {
            Box::new(CapitalizedSpanExtractor)
        } else {
            Box::new(NoEntities)
        };

        Ok(AppState::new(
            retriever,
            entities,
            transcriber_from_config(&config.speech)?,
            speaker_from_config(&config.tts),
        ))
    }

    /// Answer a query and list the entities found in it.
    pub fn answer(&self, query: &str) -> ChatReply {
        ChatReply {
            answer: self.retriever.respond(query).to_string(),
            entities: self.entities.extract(query),
        }
    }
}
