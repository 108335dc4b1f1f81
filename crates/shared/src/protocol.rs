use serde::{Deserialize, Serialize};

use crate::domain::{GridPoint, OculusTouchButton, ObjectId, Vector3};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Once,
    Always,
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationAxis {
    Pitch,
    Yaw,
    Roll,
}

/// Commands understood by the engine. Serialized with a `"$type"` tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type", rename_all = "snake_case")]
pub enum Command {
    AddObject {
        name: String,
        url: String,
        scale_factor: f64,
        position: Vector3,
        rotation: Vector3,
        category: String,
        id: ObjectId,
    },
    RotateObjectToEulerAngles {
        euler_angles: Vector3,
        id: ObjectId,
    },
    SetKinematicState {
        id: ObjectId,
        is_kinematic: bool,
        use_gravity: bool,
    },
    SetMass {
        mass: f64,
        id: ObjectId,
    },
    SetPhysicMaterial {
        dynamic_friction: f64,
        static_friction: f64,
        bounciness: f64,
        id: ObjectId,
    },
    SendBounds {
        frequency: Frequency,
        ids: Vec<ObjectId>,
    },
    ObjectLookAtPosition {
        position: Vector3,
        id: ObjectId,
    },
    RotateObjectBy {
        angle: f64,
        id: ObjectId,
        axis: RotationAxis,
    },
    DestroyObject {
        id: ObjectId,
    },
    Terminate,
    SetRenderQuality {
        render_quality: u8,
    },
    SetScreenSize {
        width: u32,
        height: u32,
    },
    LoadScene {
        scene_name: String,
    },
    CreateExteriorWalls {
        walls: Vec<GridPoint>,
    },
    CreateVrRig {
        rig_type: String,
        sync_timestep_with_vr: bool,
    },
    AttachAvatarToVrRig {
        id: String,
    },
    SendOculusTouchButtons {
        frequency: Frequency,
    },
    CreateAvatar {
        #[serde(rename = "type")]
        avatar_type: String,
        id: String,
    },
    TeleportAvatarTo {
        avatar_id: String,
        position: Vector3,
    },
    LookAtPosition {
        avatar_id: String,
        position: Vector3,
    },
    SetPassMasks {
        avatar_id: String,
        pass_masks: Vec<String>,
    },
    SendImages {
        frequency: Frequency,
        ids: Vec<String>,
    },
    AddHdriSkybox {
        name: String,
        url: String,
    },
    SetPostExposure {
        post_exposure: f64,
    },
}

impl Command {
    pub fn type_name(&self) -> &'static str {
        match self {
            Command::AddObject { .. } => "add_object",
            Command::RotateObjectToEulerAngles { .. } => "rotate_object_to_euler_angles",
            Command::SetKinematicState { .. } => "set_kinematic_state",
            Command::SetMass { .. } => "set_mass",
            Command::SetPhysicMaterial { .. } => "set_physic_material",
            Command::SendBounds { .. } => "send_bounds",
            Command::ObjectLookAtPosition { .. } => "object_look_at_position",
            Command::RotateObjectBy { .. } => "rotate_object_by",
            Command::DestroyObject { .. } => "destroy_object",
            Command::Terminate => "terminate",
            Command::SetRenderQuality { .. } => "set_render_quality",
            Command::SetScreenSize { .. } => "set_screen_size",
            Command::LoadScene { .. } => "load_scene",
            Command::CreateExteriorWalls { .. } => "create_exterior_walls",
            Command::CreateVrRig { .. } => "create_vr_rig",
            Command::AttachAvatarToVrRig { .. } => "attach_avatar_to_vr_rig",
            Command::SendOculusTouchButtons { .. } => "send_oculus_touch_buttons",
            Command::CreateAvatar { .. } => "create_avatar",
            Command::TeleportAvatarTo { .. } => "teleport_avatar_to",
            Command::LookAtPosition { .. } => "look_at_position",
            Command::SetPassMasks { .. } => "set_pass_masks",
            Command::SendImages { .. } => "send_images",
            Command::AddHdriSkybox { .. } => "add_hdri_skybox",
            Command::SetPostExposure { .. } => "set_post_exposure",
        }
    }
}

/// One entry of an outgoing batch: either a typed command or a command loaded
/// verbatim from a prepared JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireCommand {
    Typed(Command),
    Passthrough(serde_json::Value),
}

impl WireCommand {
    pub fn as_typed(&self) -> Option<&Command> {
        match self {
            WireCommand::Typed(command) => Some(command),
            WireCommand::Passthrough(_) => None,
        }
    }
}

impl From<Command> for WireCommand {
    fn from(value: Command) -> Self {
        WireCommand::Typed(value)
    }
}

impl From<serde_json::Value> for WireCommand {
    fn from(value: serde_json::Value) -> Self {
        WireCommand::Passthrough(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectBounds {
    pub id: ObjectId,
    pub center: Vector3,
    pub left: Vector3,
    pub right: Vector3,
    pub top: Vector3,
    pub bottom: Vector3,
    pub front: Vector3,
    pub back: Vector3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImagePass {
    pub pass_mask: String,
    pub data_b64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Images {
    pub avatar_id: String,
    pub width: u32,
    pub height: u32,
    pub passes: Vec<ImagePass>,
}

impl Images {
    pub fn num_passes(&self) -> usize {
        self.passes.len()
    }

    pub fn pass_mask(&self, index: usize) -> Option<&str> {
        self.passes.get(index).map(|pass| pass.pass_mask.as_str())
    }
}

/// Output records returned by the engine for one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "$type", rename_all = "snake_case")]
pub enum OutputData {
    Bounds {
        objects: Vec<ObjectBounds>,
    },
    Images(Images),
    OculusTouchButtons {
        #[serde(default)]
        left: Vec<OculusTouchButton>,
        #[serde(default)]
        right: Vec<OculusTouchButton>,
    },
    #[serde(other)]
    Unknown,
}

pub fn find_bounds(outputs: &[OutputData], id: ObjectId) -> Option<&ObjectBounds> {
    outputs.iter().find_map(|output| match output {
        OutputData::Bounds { objects } => objects.iter().find(|bounds| bounds.id == id),
        _ => None,
    })
}
