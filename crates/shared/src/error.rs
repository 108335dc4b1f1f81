use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{ObjectId, Vector3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Protocol,
    AssetNotFound,
    DegenerateGeometry,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SceneError {
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("asset not found: {0}")]
    AssetNotFound(String),
    #[error("degenerate geometry: bound point {bound:?} coincides with center {center:?}")]
    DegenerateGeometry { center: Vector3, bound: Vector3 },
}

impl SceneError {
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    pub fn missing_bounds(id: ObjectId) -> Self {
        Self::Protocol(format!("no bounds returned for object {id}"))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SceneError::Protocol(_) => ErrorKind::Protocol,
            SceneError::AssetNotFound(_) => ErrorKind::AssetNotFound,
            SceneError::DegenerateGeometry { .. } => ErrorKind::DegenerateGeometry,
        }
    }
}
