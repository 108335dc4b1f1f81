use serde::{Deserialize, Serialize};
use shared::{error::SceneError, protocol::Command};

use super::{AddOn, AddOnState};

const SKYBOX_BUCKET: &str = "https://tdw-public.s3.amazonaws.com/hdri_skyboxes";
const SKYBOX_LIBRARY_VERSION: &str = "2019.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HdriSkybox {
    pub name: String,
    pub post_exposure: f64,
}

impl HdriSkybox {
    pub fn url(&self) -> String {
        format!(
            "{SKYBOX_BUCKET}/{}/{SKYBOX_LIBRARY_VERSION}/{}",
            catalog::platform_infix(),
            self.name
        )
    }
}

/// Interior lighting skyboxes with the post exposure each one is rendered at.
pub const DEFAULT_SKYBOXES: &[(&str, f64)] = &[
    ("bergen_4k", 0.6),
    ("industrial_sunset_4k", 0.7),
    ("kiara_1_dawn_4k", 0.5),
    ("misty_pines_4k", 0.6),
    ("table_mountain_1_4k", 0.6),
    ("venice_sunset_4k", 0.7),
];

/// HDRI skybox lighting for interior scenes.
pub struct InteriorSceneLighting {
    state: AddOnState,
    skyboxes: Vec<HdriSkybox>,
    current: usize,
}

impl Default for InteriorSceneLighting {
    fn default() -> Self {
        Self::new(
            DEFAULT_SKYBOXES
                .iter()
                .map(|(name, post_exposure)| HdriSkybox {
                    name: (*name).to_string(),
                    post_exposure: *post_exposure,
                })
                .collect(),
        )
    }
}

impl InteriorSceneLighting {
    pub fn new(skyboxes: Vec<HdriSkybox>) -> Self {
        Self {
            state: AddOnState::default(),
            skyboxes,
            current: 0,
        }
    }

    pub fn skyboxes(&self) -> &[HdriSkybox] {
        &self.skyboxes
    }

    pub fn skybox_names(&self) -> Vec<&str> {
        self.skyboxes.iter().map(|skybox| skybox.name.as_str()).collect()
    }

    pub fn current(&self) -> Option<&HdriSkybox> {
        self.skyboxes.get(self.current)
    }

    /// Selects the skybox by name; its setup commands go out with the next batch.
    pub fn reset(&mut self, hdri_skybox: &str) -> Result<(), SceneError> {
        let index = self
            .skyboxes
            .iter()
            .position(|skybox| skybox.name == hdri_skybox)
            .ok_or_else(|| SceneError::AssetNotFound(format!("hdri skybox {hdri_skybox}")))?;
        self.current = index;
        self.state.reset();
        Ok(())
    }
}

impl AddOn for InteriorSceneLighting {
    fn state(&mut self) -> &mut AddOnState {
        &mut self.state
    }

    fn initialization_commands(&self) -> Vec<Command> {
        let Some(skybox) = self.current() else {
            return Vec::new();
        };
        vec![
            Command::AddHdriSkybox {
                name: skybox.name.clone(),
                url: skybox.url(),
            },
            Command::SetPostExposure {
                post_exposure: skybox.post_exposure,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_selects_skybox_and_reinitializes() {
        let mut lighting = InteriorSceneLighting::default();
        let _ = lighting.commands_for_batch();
        lighting.reset("kiara_1_dawn_4k").expect("known skybox");

        let commands = lighting.commands_for_batch();
        assert_eq!(commands.len(), 2);
        match &commands[0] {
            Command::AddHdriSkybox { name, url } => {
                assert_eq!(name, "kiara_1_dawn_4k");
                assert!(url.ends_with("/kiara_1_dawn_4k"));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(
            commands[1],
            Command::SetPostExposure { post_exposure: 0.5 }
        );
    }

    #[test]
    fn unknown_skybox_is_rejected() {
        let mut lighting = InteriorSceneLighting::default();
        assert!(matches!(
            lighting.reset("moon_surface"),
            Err(SceneError::AssetNotFound(_))
        ));
    }

    #[test]
    fn empty_skybox_list_sends_nothing() {
        let mut lighting = InteriorSceneLighting::new(Vec::new());
        assert!(lighting.commands_for_batch().is_empty());
    }
}
