use crate::extension::ExtensionError;

/// Failure of one step in a per-entity extension chain.
///
/// The remainder of that entity's chain is skipped; translating the error
/// into a protocol response is left to the calling workflow.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extension(#[from] ExtensionError),
    #[error("extension '{extension}' failed for '{entity}': {source}")]
    Step {
        extension: String,
        entity: String,
        source: anyhow::Error,
    },
}

impl PipelineError {
    pub(crate) fn step(extension: &str, entity: &str, source: anyhow::Error) -> Self {
        Self::Step {
            extension: extension.to_string(),
            entity: entity.to_string(),
            source,
        }
    }
}
