use std::fmt;

use serde::Serialize;

use crate::catalog::{Catalog, CourseRecord};
use crate::config::{Config, DEFAULT_TEMPERATURE, DEFAULT_TOP_K};
use crate::embed_texts::{Embedder, HttpEmbedder};
use crate::error::{RagError, Result};
use crate::find_course::find_course;
use crate::format_answer::format_course_answer;
use crate::generate::{generate_answer, ChatModel, HttpChatModel};
use crate::index_catalog::index_catalog;
use crate::retrieve_courses::{retrieve_courses, RetrievedDocument};
use crate::smalltalk::Smalltalk;
use crate::store_qdrant::{QdrantIndex, VectorIndex};

/// Where an answer came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    Smalltalk,
    Catalog,
    Retrieval,
    Failure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Source {
    pub title: String,
    pub url: String,
}

/// What every resolution path hands back to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnswerResult {
    pub kind: AnswerKind,
    pub answer: String,
    pub documents: Vec<String>,
    pub sources: Vec<Source>,
}

/// Outcome of running a question through the pipeline.
#[derive(Debug)]
pub enum Resolution<'a> {
    Smalltalk(Smalltalk),
    Course(&'a CourseRecord),
    Retrieved {
        answer: String,
        documents: Vec<RetrievedDocument>,
    },
    Failed(RagError),
}

impl Resolution<'_> {
    pub fn into_answer(self) -> AnswerResult {
        match self {
            Self::Smalltalk(kind) => AnswerResult {
                kind: AnswerKind::Smalltalk,
                answer: kind.reply().to_string(),
                documents: vec![],
                sources: vec![],
            },
            Self::Course(record) => AnswerResult {
                kind: AnswerKind::Catalog,
                answer: format_course_answer(record),
                documents: vec![],
                sources: vec![Source {
                    title: record.source_title(),
                    url: record.source_url.clone(),
                }],
            },
            Self::Retrieved { answer, documents } => {
                let sources = documents
                    .iter()
                    .map(|d| Source {
                        title: d.title.clone(),
                        url: d.url.clone(),
                    })
                    .collect();
                AnswerResult {
                    kind: AnswerKind::Retrieval,
                    answer,
                    documents: documents.into_iter().map(|d| d.text).collect(),
                    sources,
                }
            }
            Self::Failed(err) => AnswerResult {
                kind: AnswerKind::Failure,
                answer: failure_message(&err),
                documents: vec![],
                sources: vec![],
            },
        }
    }
}

pub fn failure_message(err: &RagError) -> String {
    format!("Sorry, PantherBot could not reach the course search service: {err}")
}

/// Answers course questions: smalltalk, then exact catalog lookup, then grounded
/// retrieval. Holds only read-only state, so one instance can serve many callers.
pub struct Assistant {
    catalog: Option<Catalog>,
    embedder: Box<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    model: Box<dyn ChatModel>,
    top_k: usize,
    temperature: f32,
    index_batch: usize,
}

impl fmt::Debug for Assistant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assistant")
            .field("courses", &self.catalog.as_ref().map(Catalog::len))
            .field("top_k", &self.top_k)
            .field("temperature", &self.temperature)
            .finish_non_exhaustive()
    }
}

impl Assistant {
    /// `catalog` is `None` when it could not be loaded; exact lookup is then skipped.
    pub fn new(
        catalog: Option<Catalog>,
        embedder: Box<dyn Embedder>,
        index: Box<dyn VectorIndex>,
        model: Box<dyn ChatModel>,
    ) -> Self {
        Self {
            catalog,
            embedder,
            index,
            model,
            top_k: DEFAULT_TOP_K,
            temperature: DEFAULT_TEMPERATURE,
            index_batch: 32,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_index_batch(mut self, batch: usize) -> Self {
        self.index_batch = batch.max(1);
        self
    }

    /// Wires HTTP-backed services from `cfg`. A missing credential is fatal; a
    /// missing catalog only disables exact lookup.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let endpoint = cfg.llm_endpoint()?;
        let catalog = match Catalog::load_first(&cfg.catalog_paths) {
            Ok(catalog) => Some(catalog),
            Err(err) => {
                tracing::warn!("{err}; exact course lookup disabled");
                None
            }
        };
        let embedder = HttpEmbedder::new(cfg, endpoint.clone())?;
        let model = HttpChatModel::new(cfg, endpoint)?;
        let index = QdrantIndex::new(cfg)?;

        Ok(Self::new(catalog, Box::new(embedder), Box::new(index), Box::new(model))
            .with_top_k(cfg.top_k)
            .with_temperature(cfg.temperature)
            .with_index_batch(cfg.index_batch))
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    pub fn resolve(&self, question: &str) -> Resolution<'_> {
        if let Some(kind) = Smalltalk::classify(question) {
            tracing::debug!(?kind, "answered as smalltalk");
            return Resolution::Smalltalk(kind);
        }

        if let Some(record) = self
            .catalog
            .as_ref()
            .and_then(|catalog| find_course(catalog, question))
        {
            tracing::debug!(code = %record.course_code, "answered from catalog");
            return Resolution::Course(record);
        }

        let retrieved = retrieve_courses(
            self.embedder.as_ref(),
            self.index.as_ref(),
            question,
            self.top_k,
        )
        .and_then(|documents| {
            generate_answer(self.model.as_ref(), question, &documents, self.temperature)
                .map(|answer| (answer, documents))
        });

        match retrieved {
            Ok((answer, documents)) => Resolution::Retrieved { answer, documents },
            Err(err) => {
                tracing::error!("retrieval answer failed: {err}");
                Resolution::Failed(err)
            }
        }
    }

    /// Never fails: service errors come back as a labeled failure answer.
    pub fn ask(&self, question: &str) -> AnswerResult {
        self.resolve(question).into_answer()
    }

    /// Raw nearest-neighbour results, without generation.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<RetrievedDocument>> {
        retrieve_courses(self.embedder.as_ref(), self.index.as_ref(), query, k)
    }

    pub fn index_catalog(&self) -> Result<usize> {
        let catalog = self.catalog.as_ref().ok_or(RagError::CatalogUnavailable)?;
        index_catalog(
            catalog,
            self.embedder.as_ref(),
            self.index.as_ref(),
            self.index_batch,
        )
    }

    pub fn indexed_count(&self) -> Result<usize> {
        self.index.count()
    }
}
