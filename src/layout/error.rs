/// Errors raised by a layout run. All of them are deterministic input
/// failures; no partial layout is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LayoutError {
    #[error("graph integrity error: {message}")]
    GraphIntegrity { message: String },
    #[error("cyclic graph: {phase} did not stabilize within {passes} passes")]
    CyclicGraph { phase: &'static str, passes: usize },
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },
}

impl LayoutError {
    pub(crate) fn integrity(message: impl Into<String>) -> Self {
        Self::GraphIntegrity {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LayoutError>;
