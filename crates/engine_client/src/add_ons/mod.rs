//! Add-ons inject commands into outgoing batches and react to the outputs of
//! each response.

use shared::protocol::{Command, OutputData};

use crate::EngineError;

mod camera;
mod image_capture;
mod lighting;
mod oculus_touch;

pub use camera::ThirdPersonCamera;
pub use image_capture::ImageCapture;
pub use lighting::{HdriSkybox, InteriorSceneLighting, DEFAULT_SKYBOXES};
pub use oculus_touch::{OculusTouch, VR_AVATAR_ID};

#[derive(Debug, Default)]
pub struct AddOnState {
    initialized: bool,
    queued: Vec<Command>,
}

impl AddOnState {
    pub fn initialized(&self) -> bool {
        self.initialized
    }

    /// Marks the add-on uninitialized so its setup commands go out with the next
    /// batch. Queued commands are dropped.
    pub fn reset(&mut self) {
        self.initialized = false;
        self.queued.clear();
    }

    pub fn queue(&mut self, command: Command) {
        self.queued.push(command);
    }
}

pub trait AddOn: Send {
    fn state(&mut self) -> &mut AddOnState;

    fn initialization_commands(&self) -> Vec<Command>;

    fn on_send(&mut self, _outputs: &[OutputData]) -> Result<(), EngineError> {
        Ok(())
    }

    fn commands_for_batch(&mut self) -> Vec<Command> {
        let mut commands = if self.state().initialized {
            Vec::new()
        } else {
            self.state().initialized = true;
            self.initialization_commands()
        };
        commands.append(&mut self.state().queued);
        commands
    }
}
