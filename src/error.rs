// Error taxonomy for the render program core
//
// Load-time errors carry enough context (file, token) to localize the
// authoring bug. Device failures keep the backend's anyhow chain as source.

use thiserror::Error;

pub type Result<T, E = RenderProgError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RenderProgError {
    /// Neither the on-disk nor the embedded source exists
    #[error("shader source {path} could not be loaded and may be corrupt")]
    MissingSource { path: String },

    #[error("couldn't find uniform {token} for {file}")]
    UnresolvedUniform { token: String, file: String },

    #[error("invalid binding {token} in {file}")]
    UnresolvedBinding { token: String, file: String },

    /// Structural manifest error (missing delimiter, truncated input)
    #[error("malformed layout manifest {file}: {message}")]
    Manifest { file: String, message: String },

    #[error("{what} failed")]
    Device {
        what: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("shader index {0} is out of range")]
    InvalidShaderIndex(usize),

    #[error("program index {0} is out of range")]
    InvalidProgramIndex(usize),

    /// A program was linked against a shader without a compiled module
    #[error("shader {name} has no compiled module")]
    ShaderNotReady { name: String },

    #[error("shader {name} is a {found} shader, expected a {expected} shader")]
    StageMismatch {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Bind of a program slot without a pipeline
    #[error("program {0} is not linked")]
    ProgramNotLinked(usize),
}

impl RenderProgError {
    pub(crate) fn device(what: impl Into<String>, err: anyhow::Error) -> Self {
        Self::Device {
            what: what.into(),
            source: err.into(),
        }
    }
}
