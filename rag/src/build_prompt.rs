use serde::{Deserialize, Serialize};

use crate::retrieve_courses::RetrievedDocument;

/// Fixed answer when the catalog has nothing to say. Callers may compare against it.
pub const REFUSAL: &str = "I cannot find this information in the UWM course catalog.";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// One entry of a chat transcript.
pub type ChatTurn = Message;

pub fn format_context(documents: &[RetrievedDocument]) -> String {
    documents
        .iter()
        .map(|doc| format!("{} (Source: {}):\n{}", doc.title, doc.url, doc.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn build_grounded_prompt(question: &str, documents: &[RetrievedDocument]) -> Vec<Message> {
    let context = format_context(documents);
    let prompt = format!(
        "You are PantherBot, the official UWM course information assistant.\n\
         \n\
         Use ONLY the context below to answer the question.\n\
         If the answer is not found in the context, say exactly:\n\
         \"{REFUSAL}\"\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         Question: {question}\n\
         \n\
         Answer with clear details. When possible, include the source URL in parentheses like (Source: <URL>)."
    );
    vec![Message::user(prompt)]
}
