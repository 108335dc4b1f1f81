use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use ndarray::Array3;
use ndarray_npy::{read_npy, write_npy, ReadNpyError, WriteNpyError};
use serde::{Deserialize, Serialize};
use shared::domain::DepthFrame;
use thiserror::Error;
use tracing::info;

mod manifest;
pub mod render;

pub use manifest::RunManifest;

pub const DUMP_EXTENSION: &str = "npy";
pub const DUMP_FILE_NAME: &str = "output.npy";

#[derive(Debug, Error)]
pub enum DumpError {
    #[error("failed to access '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write depth dump: {0}")]
    Write(#[from] WriteNpyError),
    #[error("failed to read depth dump: {0}")]
    Read(#[from] ReadNpyError),
    #[error("frame {index} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        index: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },
    #[error("frame data does not match its shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("failed to encode depth image: {0}")]
    Image(#[from] image::ImageError),
    #[error("malformed run manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl DumpError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Lifetime of the depth frame buffer relative to trials.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepthBufferScope {
    /// Cleared at the start of every trial; a dump holds the last trial only.
    #[default]
    PerTrial,
    /// Accumulates across every trial of the run.
    PerRun,
}

impl FromStr for DepthBufferScope {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "per-trial" => Ok(Self::PerTrial),
            "per-run" => Ok(Self::PerRun),
            other => Err(format!(
                "unknown depth buffer scope '{other}' (expected per-trial or per-run)"
            )),
        }
    }
}

impl fmt::Display for DepthBufferScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerTrial => f.write_str("per-trial"),
            Self::PerRun => f.write_str("per-run"),
        }
    }
}

/// Ordered, append-only sequence of captured depth frames.
#[derive(Debug, Clone, Default)]
pub struct DepthFrameBuffer {
    frames: Vec<DepthFrame>,
}

impl DepthFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: DepthFrame) {
        self.frames.push(frame);
    }

    pub fn extend(&mut self, frames: impl IntoIterator<Item = DepthFrame>) {
        self.frames.extend(frames);
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> &[DepthFrame] {
        &self.frames
    }

    /// Stacks the frames into a `[frames, height, width]` array. An empty buffer
    /// yields a `[0, 0, 0]` array.
    pub fn to_array(&self) -> Result<Array3<f32>, DumpError> {
        let Some(first) = self.frames.first() else {
            return Ok(Array3::zeros((0, 0, 0)));
        };
        let (height, width) = first.shape();
        let mut data = Vec::with_capacity(self.frames.len() * height * width);
        for (index, frame) in self.frames.iter().enumerate() {
            if frame.shape() != (height, width) || frame.values.len() != height * width {
                return Err(DumpError::ShapeMismatch {
                    index,
                    expected: (height, width),
                    actual: frame.shape(),
                });
            }
            data.extend_from_slice(&frame.values);
        }
        Ok(Array3::from_shape_vec(
            (self.frames.len(), height, width),
            data,
        )?)
    }
}

/// Writes the depth buffer as a single `.npy` array.
#[derive(Debug, Clone)]
pub struct DepthDumpWriter {
    path: PathBuf,
}

impl DepthDumpWriter {
    /// Whatever extension `path` carries is replaced by `.npy`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: normalize_dump_path(path.into()),
        }
    }

    /// Writer for `<output_root>/<scene>/output.npy`.
    pub fn for_scene(output_root: &Path, scene: &str) -> Self {
        Self::new(output_root.join(scene).join(DUMP_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, buffer: &DepthFrameBuffer) -> Result<&Path, DumpError> {
        let array = buffer.to_array()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| DumpError::io(parent, source))?;
        }
        write_npy(&self.path, &array)?;
        info!(
            path = %self.path.display(),
            frames = buffer.len(),
            "wrote depth dump"
        );
        Ok(&self.path)
    }
}

fn normalize_dump_path(path: PathBuf) -> PathBuf {
    path.with_extension(DUMP_EXTENSION)
}

pub fn read_dump(path: &Path) -> Result<Array3<f32>, DumpError> {
    Ok(read_npy(path)?)
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
