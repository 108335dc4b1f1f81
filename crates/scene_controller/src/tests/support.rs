//! In-memory engine that answers batches the way the simulator would, with
//! button presses scripted per capture tick.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use engine_client::{EngineClient, EngineError};
use shared::{
    domain::{Hand, ObjectId, OculusTouchButton, Vector3},
    protocol::{Command, ImagePass, Images, ObjectBounds, OutputData, WireCommand},
};

pub const DEPTH_WIDTH: u32 = 4;
pub const DEPTH_HEIGHT: u32 = 2;

pub fn table_bounds_template() -> ObjectBounds {
    ObjectBounds {
        id: ObjectId(0),
        center: Vector3::new(0.0, 0.4, 0.5),
        left: Vector3::new(-0.6, 0.4, 0.5),
        right: Vector3::new(0.6, 0.4, 0.5),
        top: Vector3::new(0.0, 0.8, 0.5),
        bottom: Vector3::new(0.0, 0.0, 0.5),
        front: Vector3::new(0.0, 0.4, 0.9),
        back: Vector3::new(0.0, 0.4, 0.1),
    }
}

#[derive(Default)]
pub struct ScriptedEngine {
    pub batches: Vec<Vec<WireCommand>>,
    pub omit_bounds: bool,
    /// Capture ticks (1-based, counted over the engine's lifetime) on which the
    /// given hand's trigger is held.
    presses: BTreeMap<usize, Hand>,
    /// `send_bounds` batches (1-based) whose response carries a trigger press.
    bounds_presses: BTreeMap<usize, Hand>,
    ticks: usize,
    bounds_requests: usize,
    image_avatars: HashSet<String>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn press_on_tick(mut self, tick: usize, hand: Hand) -> Self {
        self.presses.insert(tick, hand);
        self
    }

    pub fn press_on_bounds_request(mut self, request: usize, hand: Hand) -> Self {
        self.bounds_presses.insert(request, hand);
        self
    }

    pub fn without_bounds(mut self) -> Self {
        self.omit_bounds = true;
        self
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.batches
            .iter()
            .flatten()
            .filter_map(WireCommand::as_typed)
    }

    pub fn count(&self, type_name: &str) -> usize {
        self.commands()
            .filter(|command| command.type_name() == type_name)
            .count()
    }

    fn depth_pass(&self) -> ImagePass {
        let pixel = [0u8, 128, 0];
        let bytes: Vec<u8> = pixel
            .iter()
            .copied()
            .cycle()
            .take((DEPTH_WIDTH * DEPTH_HEIGHT * 3) as usize)
            .collect();
        ImagePass {
            pass_mask: "_depth".into(),
            data_b64: STANDARD.encode(bytes),
        }
    }
}

#[async_trait]
impl EngineClient for ScriptedEngine {
    async fn communicate(
        &mut self,
        batch: Vec<WireCommand>,
    ) -> Result<Vec<OutputData>, EngineError> {
        let mut outputs = Vec::new();
        let is_tick = batch.is_empty();
        let mut held = None;

        for command in batch.iter().filter_map(WireCommand::as_typed) {
            match command {
                Command::SendImages { ids, .. } => {
                    self.image_avatars.extend(ids.iter().cloned());
                }
                Command::SendBounds { ids, .. } => {
                    self.bounds_requests += 1;
                    held = self.bounds_presses.get(&self.bounds_requests).copied();
                    if !self.omit_bounds {
                        outputs.extend(ids.iter().map(|id| OutputData::Bounds {
                            objects: vec![ObjectBounds {
                                id: *id,
                                ..table_bounds_template()
                            }],
                        }));
                    }
                }
                _ => {}
            }
        }
        self.batches.push(batch);

        let mut avatars: Vec<_> = self.image_avatars.iter().cloned().collect();
        avatars.sort();
        for avatar_id in avatars {
            outputs.push(OutputData::Images(Images {
                avatar_id,
                width: DEPTH_WIDTH,
                height: DEPTH_HEIGHT,
                passes: vec![
                    ImagePass {
                        pass_mask: "_img".into(),
                        data_b64: STANDARD.encode(b"jpeg"),
                    },
                    self.depth_pass(),
                ],
            }));
        }

        if is_tick {
            self.ticks += 1;
            held = self.presses.get(&self.ticks).copied();
        }
        if is_tick || held.is_some() {
            let pressed = |hand: Hand| {
                if held == Some(hand) {
                    vec![OculusTouchButton::TriggerButton]
                } else {
                    Vec::new()
                }
            };
            outputs.push(OutputData::OculusTouchButtons {
                left: pressed(Hand::Left),
                right: pressed(Hand::Right),
            });
        }
        Ok(outputs)
    }
}
