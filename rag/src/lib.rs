mod assistant;
mod build_prompt;
mod catalog;
mod config;
mod embed_texts;
mod error;
mod extract_code;
mod find_course;
mod format_answer;
mod generate;
mod http;
mod index_catalog;
mod retrieve_courses;
mod smalltalk;
mod store_qdrant;

pub use assistant::{failure_message, AnswerKind, AnswerResult, Assistant, Resolution, Source};
pub use build_prompt::{build_grounded_prompt, format_context, ChatTurn, Message, Role, REFUSAL};
pub use catalog::{Catalog, CourseRecord, ProgramRequirement};
pub use config::{Config, LlmEndpoint, Provider};
pub use embed_texts::{embed_query, Embedder, HttpEmbedder};
pub use error::{CatalogError, RagError, Result, Service};
pub use extract_code::{extract_code, normalize_code};
pub use find_course::find_course;
pub use format_answer::format_course_answer;
pub use generate::{generate_answer, ChatModel, HttpChatModel};
pub use index_catalog::{course_document, index_catalog, CourseDocument};
pub use retrieve_courses::{retrieve_courses, RetrievedDocument};
pub use smalltalk::{smalltalk_reply, Smalltalk, BOT_NAME};
pub use store_qdrant::{point_id, CoursePoint, QdrantIndex, VectorIndex};
