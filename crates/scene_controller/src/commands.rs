//! Builders for the command groups the scenes send.

use catalog::ModelRecord;
use shared::{
    domain::{GridPoint, ObjectId, PhysicsProperties, Vector3},
    error::SceneError,
    protocol::Command,
};

pub const PROC_GEN_SCENE: &str = "ProcGenScene";

pub fn add_object(
    record: &ModelRecord,
    id: ObjectId,
    position: Vector3,
    rotation: Vector3,
) -> Result<Command, SceneError> {
    Ok(Command::AddObject {
        name: record.name.clone(),
        url: record.url()?.to_string(),
        scale_factor: record.scale_factor,
        position,
        rotation,
        category: record.wcategory.clone(),
        id,
    })
}

/// Spawn plus the mass, material and kinematic commands for `physics`.
pub fn add_physics_object(
    record: &ModelRecord,
    id: ObjectId,
    position: Vector3,
    rotation: Vector3,
    physics: PhysicsProperties,
) -> Result<Vec<Command>, SceneError> {
    Ok(vec![
        add_object(record, id, position, rotation)?,
        Command::SetMass {
            mass: physics.mass,
            id,
        },
        Command::SetPhysicMaterial {
            dynamic_friction: physics.dynamic_friction,
            static_friction: physics.static_friction,
            bounciness: physics.bounciness,
            id,
        },
        Command::SetKinematicState {
            id,
            is_kinematic: physics.is_kinematic,
            use_gravity: physics.use_gravity,
        },
    ])
}

/// Cells on the perimeter of a `width` x `length` grid.
pub fn perimeter(width: u32, length: u32) -> Vec<GridPoint> {
    let (w, l) = (width as i32, length as i32);
    let mut cells = Vec::new();
    for x in 0..w {
        for y in 0..l {
            if x == 0 || x == w - 1 || y == 0 || y == l - 1 {
                cells.push(GridPoint { x, y });
            }
        }
    }
    cells
}

/// Loads the procedural scene and walls off a `width` x `length` room.
pub fn empty_room(width: u32, length: u32) -> Vec<Command> {
    vec![
        Command::LoadScene {
            scene_name: PROC_GEN_SCENE.to_string(),
        },
        Command::CreateExteriorWalls {
            walls: perimeter(width, length),
        },
    ]
}

pub fn destroy(id: ObjectId) -> Command {
    Command::DestroyObject { id }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::ModelLibrarian;

    #[test]
    fn perimeter_of_twelve_square_room() {
        let cells = perimeter(12, 12);
        assert_eq!(cells.len(), 44);
        assert!(cells.contains(&GridPoint { x: 0, y: 5 }));
        assert!(cells.contains(&GridPoint { x: 11, y: 11 }));
        assert!(!cells.contains(&GridPoint { x: 5, y: 5 }));
    }

    #[test]
    fn empty_room_loads_scene_first() {
        let commands = empty_room(4, 3);
        assert_eq!(commands[0].type_name(), "load_scene");
        let Command::CreateExteriorWalls { walls } = &commands[1] else {
            panic!("expected walls, got {:?}", commands[1]);
        };
        assert_eq!(walls.len(), 10);
    }

    #[test]
    fn physics_object_carries_properties() {
        let librarian = ModelLibrarian::builtin();
        let record = librarian.get_record("wood_chair").expect("chair");
        let commands = add_physics_object(
            record,
            ObjectId(9),
            Vector3::new(1.0, 0.0, 2.0),
            Vector3::ZERO,
            PhysicsProperties::default(),
        )
        .expect("commands");

        let names: Vec<_> = commands.iter().map(Command::type_name).collect();
        assert_eq!(
            names,
            ["add_object", "set_mass", "set_physic_material", "set_kinematic_state"]
        );
        let Command::AddObject { name, url, category, .. } = &commands[0] else {
            panic!("expected add_object");
        };
        assert_eq!(name, "wood_chair");
        assert_eq!(category, "chair");
        assert!(url.ends_with("/wood_chair"));
    }
}
