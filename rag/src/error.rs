use std::fmt;
use std::path::PathBuf;

/// External collaborator a request was addressed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Service {
    Embedding,
    Generation,
    VectorIndex,
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Embedding => "embedding service",
            Self::Generation => "generation service",
            Self::VectorIndex => "vector index",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{service} timed out after {secs}s")]
    Timeout { service: Service, secs: u64 },

    #[error("{service} request failed: {message}")]
    Transport { service: Service, message: String },

    #[error("{service} returned status {status}: {body}")]
    Status {
        service: Service,
        status: u16,
        body: String,
    },

    #[error("{service} response decode failed: {message}")]
    Decode { service: Service, message: String },

    #[error("{service} returned an empty response")]
    EmptyResponse { service: Service },

    #[error("course catalog is not loaded")]
    CatalogUnavailable,
}

impl RagError {
    #[must_use]
    pub fn service(&self) -> Option<Service> {
        match self {
            Self::Config(_) | Self::CatalogUnavailable => None,
            Self::Timeout { service, .. }
            | Self::Transport { service, .. }
            | Self::Status { service, .. }
            | Self::Decode { service, .. }
            | Self::EmptyResponse { service } => Some(*service),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("no catalog file found (tried: {})", display_paths(.0))]
    NotFound(Vec<PathBuf>),

    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed catalog: {0}")]
    Csv(#[from] csv::Error),

    #[error("catalog is missing required column `{0}`")]
    MissingColumn(&'static str),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, RagError>;
