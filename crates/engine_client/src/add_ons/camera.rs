use shared::{domain::Vector3, protocol::Command};

use super::{AddOn, AddOnState};

const AVATAR_TYPE: &str = "A_Img_Caps_Kinematic";

pub struct ThirdPersonCamera {
    state: AddOnState,
    avatar_id: String,
    position: Vector3,
    look_at: Option<Vector3>,
}

impl ThirdPersonCamera {
    pub fn new(avatar_id: impl Into<String>, position: Vector3, look_at: Option<Vector3>) -> Self {
        Self {
            state: AddOnState::default(),
            avatar_id: avatar_id.into(),
            position,
            look_at,
        }
    }

    pub fn avatar_id(&self) -> &str {
        &self.avatar_id
    }

    pub fn reset(&mut self) {
        self.state.reset();
    }
}

impl AddOn for ThirdPersonCamera {
    fn state(&mut self) -> &mut AddOnState {
        &mut self.state
    }

    fn initialization_commands(&self) -> Vec<Command> {
        let mut commands = vec![
            Command::CreateAvatar {
                avatar_type: AVATAR_TYPE.to_string(),
                id: self.avatar_id.clone(),
            },
            Command::TeleportAvatarTo {
                avatar_id: self.avatar_id.clone(),
                position: self.position,
            },
        ];
        if let Some(target) = self.look_at {
            commands.push(Command::LookAtPosition {
                avatar_id: self.avatar_id.clone(),
                position: target,
            });
        }
        commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_reissues_avatar_setup() {
        let mut camera = ThirdPersonCamera::new(
            "a",
            Vector3::new(-0.6771, 2.0, 2.0463),
            Some(Vector3::new(0.1, 0.0, -0.1)),
        );
        assert_eq!(camera.commands_for_batch().len(), 3);
        assert!(camera.commands_for_batch().is_empty());
        camera.reset();
        assert_eq!(camera.commands_for_batch().len(), 3);
    }
}
