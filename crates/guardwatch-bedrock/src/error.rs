use thiserror::Error;

#[derive(Error, Debug)]
pub enum BedrockError {
    #[error("invalid prompt template: {0}")]
    Template(#[from] handlebars::TemplateError),

    #[error("prompt rendering failed: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("failed to encode model request: {0}")]
    RequestEncoding(#[source] serde_json::Error),

    #[error("failed to decode model response: {0}")]
    ResponseDecoding(#[source] serde_json::Error),

    #[error("model invocation failed: {0}")]
    Invocation(String),

    #[error("model response contained no message content")]
    EmptyResponse,

    #[error("unsupported content kind '{0}' in model response")]
    UnsupportedContent(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    InvalidFile {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
