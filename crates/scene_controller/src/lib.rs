//! Scene controllers: the VR-driven office trial loop and the interior skybox
//! capture, plus the settings and placement helpers they share.

use std::path::PathBuf;

use catalog::CatalogError;
use depth_store::DumpError;
use engine_client::EngineError;
use shared::error::SceneError;
use thiserror::Error;

pub mod commands;
pub mod config;
pub mod interior;
pub mod office;
pub mod placement;

pub use interior::{InteriorOptions, InteriorScene};
pub use office::{OfficeOptions, OfficeProps, OfficeScene, TrialReport, TrialSignal, TrialState};

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Scene(#[from] SceneError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Dump(#[from] DumpError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("failed to read init commands '{path}': {source}")]
    InitCommandsIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("malformed init commands: {0}")]
    InitCommands(#[from] serde_json::Error),
    #[error("failed to rename captured image '{path}': {source}")]
    Rename {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Outcome of a whole run, reported once the engine has been told to terminate.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub trials: u32,
    pub frames_dumped: usize,
    pub dump_path: Option<PathBuf>,
    pub manifest_path: Option<PathBuf>,
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
