//! Kitchen interior rendered once per HDRI skybox.
//!
//! The furnished scene comes from a recorded command list. Each skybox gets a
//! fresh camera and capture setup, one rendered frame renamed after the skybox,
//! and that frame's depth.

use std::{
    fs,
    path::{Path, PathBuf},
};

use catalog::platform_infix;
use depth_store::{
    DepthBufferScope, DepthDumpWriter, DepthFrameBuffer, RunManifest, DUMP_FILE_NAME,
};
use engine_client::{
    add_ons::{AddOn, ImageCapture, InteriorSceneLighting, ThirdPersonCamera},
    communicate_with_add_ons,
    depth::{depth_frames, ClipPlanes},
    EngineClient,
};
use serde_json::Value;
use shared::{
    domain::Vector3,
    error::SceneError,
    protocol::{Command, OutputData, WireCommand},
};
use tracing::{info, warn};

use crate::{config::Settings, ControllerError, RunSummary};

pub const SCENE_NAME: &str = "interior_scene";
pub const DEFAULT_INIT_COMMANDS: &str = "interior_scene.json";
pub const CAMERA_AVATAR_ID: &str = "a";
pub const CAMERA_POSITION: Vector3 = Vector3::new(-0.6771, 2.0, 2.0463);
pub const CAMERA_LOOK_AT: Vector3 = Vector3::new(0.1, 0.0, -0.1);
pub const SCREEN_WIDTH: u32 = 1024;
pub const SCREEN_HEIGHT: u32 = 768;
pub const CAPTURE_PASSES: [&str; 3] = ["_img", "_id", "_depth"];

/// Platform segment the command list was recorded with.
const RECORDED_INFIX: &str = "/windows/";

/// Points asset urls recorded on one platform at `infix`.
pub fn localize_init_commands(raw: &str, infix: &str) -> String {
    raw.replace(RECORDED_INFIX, &format!("/{infix}/"))
}

pub fn parse_init_commands(raw: &str) -> Result<Vec<Value>, ControllerError> {
    let localized = localize_init_commands(raw, platform_infix());
    Ok(serde_json::from_str(&localized)?)
}

pub fn load_init_commands(path: &Path) -> Result<Vec<Value>, ControllerError> {
    let raw = fs::read_to_string(path).map_err(|source| ControllerError::InitCommandsIo {
        path: path.to_path_buf(),
        source,
    })?;
    parse_init_commands(&raw)
}

#[derive(Debug, Clone)]
pub struct InteriorOptions {
    pub output_dir: PathBuf,
    pub clip_planes: ClipPlanes,
}

impl InteriorOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            output_dir: settings.scene_dir(SCENE_NAME),
            clip_planes: settings.clip_planes(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkyboxCapture {
    pub skybox: String,
    pub image_path: Option<PathBuf>,
    pub frames_captured: usize,
}

pub struct InteriorScene<C> {
    client: C,
    lighting: InteriorSceneLighting,
    camera: ThirdPersonCamera,
    capture: ImageCapture,
    init_commands: Vec<Value>,
    options: InteriorOptions,
    depth: DepthFrameBuffer,
    writer: DepthDumpWriter,
    manifest: RunManifest,
    shown: u32,
}

impl<C: EngineClient> InteriorScene<C> {
    pub async fn new(
        mut client: C,
        init_commands: Vec<Value>,
        options: InteriorOptions,
    ) -> Result<Self, ControllerError> {
        let screen = vec![WireCommand::from(Command::SetScreenSize {
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
        })];
        let no_add_ons: &mut [&mut dyn AddOn] = &mut [];
        communicate_with_add_ons(&mut client, no_add_ons, screen).await?;
        info!(path = %options.output_dir.display(), "images will be saved");

        Ok(Self {
            client,
            lighting: InteriorSceneLighting::default(),
            camera: ThirdPersonCamera::new(CAMERA_AVATAR_ID, CAMERA_POSITION, Some(CAMERA_LOOK_AT)),
            capture: ImageCapture::new([CAMERA_AVATAR_ID], CAPTURE_PASSES)
                .with_output_dir(&options.output_dir),
            init_commands,
            writer: DepthDumpWriter::new(options.output_dir.join(DUMP_FILE_NAME)),
            options,
            depth: DepthFrameBuffer::new(),
            manifest: RunManifest::start(SCENE_NAME, DepthBufferScope::PerRun),
            shown: 0,
        })
    }

    pub fn skybox_names(&self) -> Vec<&str> {
        self.lighting.skybox_names()
    }

    pub fn depth_buffer(&self) -> &DepthFrameBuffer {
        &self.depth
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Rebuilds the scene under skybox `index` and captures one frame.
    pub async fn show_skybox(&mut self, index: usize) -> Result<SkyboxCapture, ControllerError> {
        let names = self.lighting.skybox_names();
        let skybox = names
            .get(index)
            .map(|name| name.to_string())
            .ok_or_else(|| {
                SceneError::AssetNotFound(format!(
                    "hdri skybox index {index} (have {})",
                    names.len()
                ))
            })?;

        self.camera.reset();
        self.capture.reset();
        self.lighting.reset(&skybox)?;

        let batch = self.init_commands.iter().cloned().map(WireCommand::from).collect();
        self.round_trip(batch).await?;
        self.shown += 1;

        let image_path = self.rename_latest_image(&skybox)?;

        let mut frames_captured = 0;
        if let Some(images) = self.capture.images(CAMERA_AVATAR_ID) {
            let frames = depth_frames(images, self.options.clip_planes)?;
            frames_captured = frames.len();
            self.depth.extend(frames);
        }
        info!(skybox = %skybox, frames = frames_captured, "captured skybox");

        Ok(SkyboxCapture {
            skybox,
            image_path,
            frames_captured,
        })
    }

    /// Shows each skybox in turn, writes the depth dump and terminates the engine.
    pub async fn show_skyboxes(
        &mut self,
        indices: &[usize],
    ) -> Result<RunSummary, ControllerError> {
        for index in indices {
            self.show_skybox(*index).await?;
        }

        let dump_path = self.writer.write(&self.depth)?.to_path_buf();
        self.manifest.trials = self.shown;
        self.manifest.finish(self.depth.len(), &dump_path);
        let manifest_path = self.manifest.write(&self.options.output_dir)?;

        let terminate = vec![WireCommand::from(Command::Terminate)];
        self.round_trip(terminate).await?;

        Ok(RunSummary {
            trials: self.shown,
            frames_dumped: self.depth.len(),
            dump_path: Some(dump_path),
            manifest_path: Some(manifest_path),
        })
    }

    /// `a/img_<frame-1>.jpg` becomes `a/<skybox>.jpg`.
    fn rename_latest_image(&self, skybox: &str) -> Result<Option<PathBuf>, ControllerError> {
        let latest = self.capture.frame().checked_sub(1);
        let (Some(dir), Some(frame)) = (self.capture.output_dir(), latest) else {
            warn!(skybox, "no image captured for skybox");
            return Ok(None);
        };
        let avatar_dir = dir.join(CAMERA_AVATAR_ID);
        let src = avatar_dir.join(format!("img_{frame:04}.jpg"));
        if !src.exists() {
            warn!(path = %src.display(), "captured image missing");
            return Ok(None);
        }
        let dst = avatar_dir.join(format!("{skybox}.jpg"));
        fs::rename(&src, &dst).map_err(|source| ControllerError::Rename {
            path: src.clone(),
            source,
        })?;
        Ok(Some(dst))
    }

    async fn round_trip(
        &mut self,
        batch: Vec<WireCommand>,
    ) -> Result<Vec<OutputData>, ControllerError> {
        let add_ons: &mut [&mut dyn AddOn] =
            &mut [&mut self.lighting, &mut self.camera, &mut self.capture];
        Ok(communicate_with_add_ons(&mut self.client, add_ons, batch).await?)
    }
}

#[cfg(test)]
#[path = "tests/interior_tests.rs"]
mod tests;
