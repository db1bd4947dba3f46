//! Error types for pipeline runs.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use vegscan_store::StoreError;

/// The stage of a run that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Fetch,
    Composite,
    Index,
    Sample,
    Fit,
    Assign,
    Aggregate,
    Export,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Fetch => "fetch",
            Stage::Composite => "composite",
            Stage::Index => "index",
            Stage::Sample => "sample",
            Stage::Fit => "fit",
            Stage::Assign => "assign",
            Stage::Aggregate => "aggregate",
            Stage::Export => "export",
        };
        f.write_str(name)
    }
}

/// Errors produced by a pipeline run. Every one of them ends the run.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cannot read configuration {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration JSON: {0}")]
    ConfigJson(#[from] serde_json::Error),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: vegscan_core::Error,
    },
}

impl PipelineError {
    /// Stage that failed, if the run got past configuration.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Store(_) => Some(Stage::Fetch),
            PipelineError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The underlying core error, looking through the store wrapper.
    pub fn core(&self) -> Option<&vegscan_core::Error> {
        match self {
            PipelineError::Store(StoreError::Core(e)) => Some(e),
            PipelineError::Stage { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Tag a core error with the stage that raised it.
pub(crate) trait AtStage<T> {
    fn at(self, stage: Stage) -> Result<T>;
}

impl<T> AtStage<T> for vegscan_core::Result<T> {
    fn at(self, stage: Stage) -> Result<T> {
        self.map_err(|source| PipelineError::Stage { stage, source })
    }
}

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
