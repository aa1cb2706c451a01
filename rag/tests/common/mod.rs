#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use course_rag::{
    Catalog, ChatModel, CoursePoint, Embedder, Message, RagError, RetrievedDocument, Service,
    VectorIndex,
};

const VOCABULARY: &[&str] = &["database", "sql", "architecture", "information", "network"];

pub const CATALOG_CSV: &str = "\
course_code,course_title,description,credits,prerequisites,source_url,Required Courses for MSIST
INFOST 790,Info Architecture,Intro to IA,3,,https://example.edu/infost790,
COMPSCI 557,Database Systems,Relational database design and SQL,3,COMPSCI 351,https://example.edu/cs557,Core
INFOST 410,Database Information Retrieval Systems,SQL for information systems,3,,https://example.edu/infost410,
";

pub fn catalog() -> Catalog {
    Catalog::from_reader(CATALOG_CSV.as_bytes()).expect("fixture catalog parses")
}

#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Bag-of-words embedding over a tiny vocabulary.
pub struct KeywordEmbedder {
    pub calls: Counter,
    pub fail: bool,
}

impl KeywordEmbedder {
    pub fn new(calls: Counter) -> Self {
        Self { calls, fail: false }
    }

    pub fn failing(calls: Counter) -> Self {
        Self { calls, fail: true }
    }
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        self.calls.bump();
        if self.fail {
            return Err(RagError::Timeout {
                service: Service::Embedding,
                secs: 60,
            });
        }
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                VOCABULARY
                    .iter()
                    .map(|word| lower.matches(word).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Cosine search that only returns documents with positive similarity.
#[derive(Default)]
pub struct MemoryIndex {
    pub points: Arc<Mutex<Vec<CoursePoint>>>,
    pub queries: Counter,
    pub unreachable: bool,
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

impl VectorIndex for MemoryIndex {
    fn ensure_collection(&self, _vector_size: usize) -> Result<(), RagError> {
        Ok(())
    }

    fn upsert(&self, points: &[CoursePoint]) -> Result<(), RagError> {
        let mut stored = self.points.lock().unwrap();
        for point in points {
            stored.retain(|p| p.doc_id != point.doc_id);
            stored.push(point.clone());
        }
        Ok(())
    }

    fn query(&self, vector: &[f32], limit: usize) -> Result<Vec<RetrievedDocument>, RagError> {
        self.queries.bump();
        if self.unreachable {
            return Err(RagError::Transport {
                service: Service::VectorIndex,
                message: "connection refused".into(),
            });
        }
        let stored = self.points.lock().unwrap();
        let mut scored: Vec<(f32, &CoursePoint)> = stored
            .iter()
            .map(|p| (cosine(vector, &p.vector), p))
            .filter(|(score, _)| *score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, p)| RetrievedDocument {
                text: p.document.clone(),
                title: p.title.clone(),
                url: p.url.clone(),
            })
            .collect())
    }

    fn count(&self) -> Result<usize, RagError> {
        Ok(self.points.lock().unwrap().len())
    }
}

pub struct ScriptedModel {
    pub calls: Counter,
    pub prompts: Arc<Mutex<Vec<String>>>,
    pub reply: String,
    pub fail: bool,
}

impl ScriptedModel {
    pub fn replying(calls: Counter, reply: &str) -> Self {
        Self {
            calls,
            prompts: Arc::default(),
            reply: reply.to_string(),
            fail: false,
        }
    }
}

impl ChatModel for ScriptedModel {
    fn chat(&self, messages: &[Message], _temperature: f32) -> Result<String, RagError> {
        self.calls.bump();
        self.prompts
            .lock()
            .unwrap()
            .extend(messages.iter().map(|m| m.content.clone()));
        if self.fail {
            return Err(RagError::Status {
                service: Service::Generation,
                status: 503,
                body: "overloaded".into(),
            });
        }
        Ok(self.reply.clone())
    }
}
