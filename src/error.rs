use std::path::PathBuf;
use thiserror::Error;

/// Crate-wide result type alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the diffusion core. Every variant is fatal to a run.
#[derive(Debug, Error)]
pub enum Error {
    /// A species with this name is already registered.
    #[error("species '{0}' is already registered")]
    DuplicateSpecies(String),

    /// A lookup or release directive named a species that was never declared.
    #[error("unknown species '{0}'")]
    UnknownSpecies(String),

    /// Invalid user or API parameter.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// A trajectory snapshot could not be created, written or closed.
    #[error("failed to write trajectory snapshot for iteration {iteration} to '{}': {source}", path.display())]
    TrajectoryIo {
        iteration: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Other I/O failures (output layout, exports).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
