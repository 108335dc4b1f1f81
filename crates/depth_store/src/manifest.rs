use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DepthBufferScope, DumpError};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Run metadata written next to the depth dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub scene: String,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub trials: u32,
    pub frames_dumped: usize,
    pub buffer_scope: DepthBufferScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_path: Option<PathBuf>,
}

impl RunManifest {
    pub fn start(scene: impl Into<String>, buffer_scope: DepthBufferScope) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scene: scene.into(),
            started_at: Utc::now(),
            finished_at: None,
            trials: 0,
            frames_dumped: 0,
            buffer_scope,
            dump_path: None,
        }
    }

    pub fn finish(&mut self, frames_dumped: usize, dump_path: &Path) {
        self.finished_at = Some(Utc::now());
        self.frames_dumped = frames_dumped;
        self.dump_path = Some(dump_path.to_path_buf());
    }

    pub fn write(&self, dir: &Path) -> Result<PathBuf, DumpError> {
        fs::create_dir_all(dir).map_err(|source| DumpError::io(dir, source))?;
        let path = dir.join(MANIFEST_FILE_NAME);
        let body = serde_json::to_string_pretty(self)?;
        fs::write(&path, body).map_err(|source| DumpError::io(&path, source))?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self, DumpError> {
        let raw = fs::read_to_string(path).map_err(|source| DumpError::io(path, source))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
