use std::collections::{HashSet, VecDeque};

use shared::{
    domain::{Hand, OculusTouchButton},
    protocol::{Command, Frequency, OutputData},
};
use tracing::debug;

use super::{AddOn, AddOnState};
use crate::EngineError;

const RIG_TYPE: &str = "oculus_touch_robot_hands";
pub const VR_AVATAR_ID: &str = "vr";

struct ButtonListener<S> {
    hand: Hand,
    button: OculusTouchButton,
    signal: S,
}

/// VR rig with Oculus Touch controllers. Button presses are turned into signals
/// on their rising edge and queued until the owner drains them.
pub struct OculusTouch<S> {
    state: AddOnState,
    attach_avatar: bool,
    listeners: Vec<ButtonListener<S>>,
    held: HashSet<(Hand, OculusTouchButton)>,
    pending: VecDeque<S>,
}

impl<S: Clone + Send> OculusTouch<S> {
    pub fn new(attach_avatar: bool) -> Self {
        Self {
            state: AddOnState::default(),
            attach_avatar,
            listeners: Vec::new(),
            held: HashSet::new(),
            pending: VecDeque::new(),
        }
    }

    pub fn listen_to_button(&mut self, button: OculusTouchButton, hand: Hand, signal: S) {
        self.listeners.push(ButtonListener {
            hand,
            button,
            signal,
        });
    }

    /// Clears latched buttons and undelivered signals; the rig is set up again on
    /// the next batch. A button still held across the reset reads as a fresh press
    /// on the next report.
    pub fn reset(&mut self) {
        self.state.reset();
        self.held.clear();
        self.pending.clear();
    }

    pub fn drain_signals(&mut self) -> Vec<S> {
        self.pending.drain(..).collect()
    }

    pub fn has_pending_signals(&self) -> bool {
        !self.pending.is_empty()
    }

    fn press(&mut self, hand: Hand, button: OculusTouchButton) {
        for listener in &self.listeners {
            if listener.hand == hand && listener.button == button {
                debug!(?hand, ?button, "vr button pressed");
                self.pending.push_back(listener.signal.clone());
            }
        }
    }
}

impl<S: Clone + Send> AddOn for OculusTouch<S> {
    fn state(&mut self) -> &mut AddOnState {
        &mut self.state
    }

    fn initialization_commands(&self) -> Vec<Command> {
        let mut commands = vec![Command::CreateVrRig {
            rig_type: RIG_TYPE.to_string(),
            sync_timestep_with_vr: true,
        }];
        if self.attach_avatar {
            commands.push(Command::AttachAvatarToVrRig {
                id: VR_AVATAR_ID.to_string(),
            });
        }
        commands.push(Command::SendOculusTouchButtons {
            frequency: Frequency::Always,
        });
        commands
    }

    fn on_send(&mut self, outputs: &[OutputData]) -> Result<(), EngineError> {
        let mut report = None;
        for output in outputs {
            if let OutputData::OculusTouchButtons { left, right } = output {
                report = Some((left, right));
            }
        }
        let Some((left, right)) = report else {
            return Ok(());
        };

        let current: HashSet<(Hand, OculusTouchButton)> = left
            .iter()
            .map(|button| (Hand::Left, *button))
            .chain(right.iter().map(|button| (Hand::Right, *button)))
            .collect();
        let mut rising: Vec<_> = current.difference(&self.held).copied().collect();
        rising.sort_by_key(|(hand, _)| *hand == Hand::Right);
        for (hand, button) in rising {
            self.press(hand, button);
        }
        self.held = current;
        Ok(())
    }
}
