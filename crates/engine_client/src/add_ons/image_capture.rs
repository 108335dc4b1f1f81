use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shared::protocol::{Command, Frequency, Images, OutputData};
use tracing::{debug, warn};

use super::{AddOn, AddOnState};
use crate::EngineError;

/// Requests image passes from a set of avatars and keeps the latest frame of
/// each. Encoded passes (`_img`, `_id`) are optionally written to disk as
/// `<dir>/<avatar>/<pass>_<frame>.<ext>`.
pub struct ImageCapture {
    state: AddOnState,
    avatar_ids: Vec<String>,
    pass_masks: Vec<String>,
    output_dir: Option<PathBuf>,
    frame: u64,
    images: HashMap<String, Images>,
}

impl ImageCapture {
    pub fn new<A, P>(avatar_ids: A, pass_masks: P) -> Self
    where
        A: IntoIterator,
        A::Item: Into<String>,
        P: IntoIterator,
        P::Item: Into<String>,
    {
        Self {
            state: AddOnState::default(),
            avatar_ids: avatar_ids.into_iter().map(Into::into).collect(),
            pass_masks: pass_masks.into_iter().map(Into::into).collect(),
            output_dir: None,
            frame: 0,
            images: HashMap::new(),
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn output_dir(&self) -> Option<&Path> {
        self.output_dir.as_deref()
    }

    /// Number of frames for which images have been received.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Images received with the most recent response, if any.
    pub fn images(&self, avatar_id: &str) -> Option<&Images> {
        self.images.get(avatar_id)
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }

    fn save(&self, dir: &Path, images: &Images) -> Result<(), EngineError> {
        let avatar_dir = dir.join(&images.avatar_id);
        fs::create_dir_all(&avatar_dir)?;
        for pass in &images.passes {
            let Some((stem, extension)) = encoded_pass_file(&pass.pass_mask) else {
                continue;
            };
            let bytes = STANDARD.decode(&pass.data_b64)?;
            let path = avatar_dir.join(format!("{stem}_{:04}.{extension}", self.frame));
            fs::write(&path, bytes)?;
            debug!(path = %path.display(), "saved image pass");
        }
        Ok(())
    }
}

/// File stem and extension for passes that arrive already encoded.
fn encoded_pass_file(pass_mask: &str) -> Option<(&'static str, &'static str)> {
    match pass_mask {
        "_img" => Some(("img", "jpg")),
        "_id" => Some(("id", "png")),
        _ => None,
    }
}

impl AddOn for ImageCapture {
    fn state(&mut self) -> &mut AddOnState {
        &mut self.state
    }

    fn initialization_commands(&self) -> Vec<Command> {
        let mut commands: Vec<Command> = self
            .avatar_ids
            .iter()
            .map(|avatar_id| Command::SetPassMasks {
                avatar_id: avatar_id.clone(),
                pass_masks: self.pass_masks.clone(),
            })
            .collect();
        commands.push(Command::SendImages {
            frequency: Frequency::Always,
            ids: self.avatar_ids.clone(),
        });
        commands
    }

    fn on_send(&mut self, outputs: &[OutputData]) -> Result<(), EngineError> {
        self.images.clear();
        for output in outputs {
            let OutputData::Images(images) = output else {
                continue;
            };
            if !self.avatar_ids.contains(&images.avatar_id) {
                warn!(avatar_id = %images.avatar_id, "images from unregistered avatar");
                continue;
            }
            if let Some(dir) = &self.output_dir {
                self.save(dir, images)?;
            }
            self.images
                .insert(images.avatar_id.clone(), images.clone());
        }
        if !self.images.is_empty() {
            self.frame += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::protocol::ImagePass;

    fn images(avatar_id: &str) -> Images {
        Images {
            avatar_id: avatar_id.to_string(),
            width: 2,
            height: 1,
            passes: vec![
                ImagePass {
                    pass_mask: "_img".into(),
                    data_b64: STANDARD.encode(b"jpeg-bytes"),
                },
                ImagePass {
                    pass_mask: "_depth".into(),
                    data_b64: STANDARD.encode([0u8; 6]),
                },
            ],
        }
    }

    #[test]
    fn initialization_requests_passes_for_every_avatar() {
        let capture = ImageCapture::new(["a", "b"], ["_img", "_depth"]);
        let commands = capture.initialization_commands();
        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands[2],
            Command::SendImages {
                frequency: Frequency::Always,
                ids: vec!["a".into(), "b".into()],
            }
        );
    }

    #[test]
    fn keeps_only_latest_response_images() {
        let mut capture = ImageCapture::new(["vr"], ["_depth"]);
        capture
            .on_send(&[OutputData::Images(images("vr"))])
            .expect("first");
        assert_eq!(capture.frame(), 1);
        assert_eq!(capture.images("vr").map(Images::num_passes), Some(2));

        capture.on_send(&[]).expect("empty");
        assert!(capture.images("vr").is_none());
        assert_eq!(capture.frame(), 1);
    }

    #[test]
    fn ignores_unregistered_avatars() {
        let mut capture = ImageCapture::new(["vr"], ["_depth"]);
        capture
            .on_send(&[OutputData::Images(images("a"))])
            .expect("other avatar");
        assert!(capture.images("a").is_none());
        assert_eq!(capture.frame(), 0);
    }

    #[test]
    fn saves_encoded_passes_with_frame_numbers() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut capture = ImageCapture::new(["a"], ["_img", "_depth"]).with_output_dir(dir.path());
        capture
            .on_send(&[OutputData::Images(images("a"))])
            .expect("frame 0");
        capture
            .on_send(&[OutputData::Images(images("a"))])
            .expect("frame 1");

        let first = dir.path().join("a").join("img_0000.jpg");
        assert_eq!(fs::read(&first).expect("saved"), b"jpeg-bytes");
        assert!(dir.path().join("a").join("img_0001.jpg").exists());
        assert_eq!(
            fs::read_dir(dir.path().join("a")).expect("dir").count(),
            2,
            "raw depth passes are not written"
        );
    }
}
