//! VR-driven office trials.
//!
//! Every trial furnishes a table with a laptop, mouse, lamp, cup, two chairs
//! and any configured fruit, book or pen. It then ticks the engine, collecting
//! the `vr` avatar's depth frames, until the right trigger ends the trial or the
//! left trigger quits the run.

use std::{collections::HashSet, path::PathBuf};

use catalog::{ModelLibrarian, ModelRecord, OfficeCatalog};
use depth_store::{
    DepthBufferScope, DepthDumpWriter, DepthFrameBuffer, RunManifest, DUMP_FILE_NAME,
};
use engine_client::{
    add_ons::{AddOn, ImageCapture, OculusTouch, VR_AVATAR_ID},
    communicate_with_add_ons,
    depth::{depth_frames, ClipPlanes},
    EngineClient,
};
use rand::{rngs::StdRng, Rng};
use shared::{
    domain::{Hand, ObjectId, OculusTouchButton, PhysicsProperties, Vector3},
    error::SceneError,
    protocol::{find_bounds, Command, Frequency, OutputData, RotationAxis, WireCommand},
};
use tracing::{debug, info};

use crate::{
    commands,
    config::Settings,
    placement::{sample_chair_position, sample_chair_yaw, sample_prop_yaw},
    ControllerError, RunSummary,
};

pub const SCENE_NAME: &str = "scene_office";
pub const LAPTOP_MODEL: &str = "macbook_air";
pub const MOUSE_MODEL: &str = "mouse_02_vray";
pub const DEFAULT_CUP: &str = "cup";
/// Prop argument that leaves the prop out.
pub const NO_PROP: &str = "none";
pub const CAPTURE_PASSES: [&str; 3] = ["_img", "_id", "_depth"];

const MAX_OBJECT_ID: i64 = 1 << 24;
const TABLE_X: f64 = 0.0;
const TABLE_Z: f64 = 0.5;

const TABLE_PHYSICS: PhysicsProperties = PhysicsProperties {
    mass: 50.0,
    is_kinematic: true,
    use_gravity: true,
    dynamic_friction: 0.45,
    static_friction: 0.48,
    bounciness: 0.5,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrialSignal {
    EndTrial,
    Quit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialState {
    pub simulation_done: bool,
    pub trial_done: bool,
}

/// Model names for the table-top props. `None` leaves the prop out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfficeProps {
    pub cup: String,
    pub fruit: Option<String>,
    pub book: Option<String>,
    pub pen: Option<String>,
}

impl Default for OfficeProps {
    fn default() -> Self {
        Self {
            cup: DEFAULT_CUP.to_string(),
            fruit: None,
            book: None,
            pen: None,
        }
    }
}

impl OfficeProps {
    pub fn from_args(cup: &str, fruit: &str, book: &str, pen: &str) -> Self {
        Self {
            cup: cup.to_string(),
            fruit: optional_prop(fruit),
            book: optional_prop(book),
            pen: optional_prop(pen),
        }
    }
}

pub fn optional_prop(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case(NO_PROP) {
        None
    } else {
        Some(raw.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct OfficeOptions {
    pub output_dir: PathBuf,
    pub buffer_scope: DepthBufferScope,
    pub clip_planes: ClipPlanes,
    pub save_images: bool,
    pub render_quality: u8,
    pub room_width: u32,
    pub room_length: u32,
}

impl OfficeOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            output_dir: settings.scene_dir(SCENE_NAME),
            buffer_scope: settings.depth_buffer_scope,
            clip_planes: settings.clip_planes(),
            save_images: settings.save_images,
            render_quality: settings.render_quality,
            room_width: settings.room_width,
            room_length: settings.room_length,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prop {
    Table,
    Computer,
    Mouse,
    Lamp,
    Cup,
    Fruit,
    Book,
    Pen,
    Chair,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedObject {
    pub prop: Prop,
    pub id: ObjectId,
    pub model: String,
    pub position: Vector3,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrialReport {
    pub index: u32,
    pub spawned: Vec<SpawnedObject>,
    pub chair_positions: [Vector3; 2],
    pub frames_captured: usize,
}

/// Ids drawn for one trial. Teardown destroys every non-chair id, spawned or
/// not.
struct TrialIds {
    table: ObjectId,
    cup: ObjectId,
    computer: ObjectId,
    mouse: ObjectId,
    lamp: ObjectId,
    fruit: ObjectId,
    book: ObjectId,
    pen: ObjectId,
}

impl TrialIds {
    fn teardown_order(&self) -> [ObjectId; 8] {
        [
            self.table,
            self.cup,
            self.computer,
            self.mouse,
            self.lamp,
            self.fruit,
            self.book,
            self.pen,
        ]
    }
}

struct DumpRecord {
    dump_path: PathBuf,
    manifest_path: PathBuf,
    frames: usize,
}

pub struct OfficeScene<C> {
    client: C,
    vr: OculusTouch<TrialSignal>,
    capture: ImageCapture,
    librarian: ModelLibrarian,
    catalog: OfficeCatalog,
    props: OfficeProps,
    options: OfficeOptions,
    rng: StdRng,
    state: TrialState,
    depth: DepthFrameBuffer,
    writer: DepthDumpWriter,
    manifest: RunManifest,
    issued_ids: HashSet<ObjectId>,
    spawned: HashSet<ObjectId>,
    trials: u32,
    dump: Option<DumpRecord>,
}

impl<C: EngineClient> OfficeScene<C> {
    /// Registers the VR and capture add-ons and builds the empty room.
    pub async fn new(
        client: C,
        librarian: ModelLibrarian,
        props: OfficeProps,
        options: OfficeOptions,
        rng: StdRng,
    ) -> Result<Self, ControllerError> {
        let mut vr = OculusTouch::new(true);
        vr.listen_to_button(OculusTouchButton::TriggerButton, Hand::Left, TrialSignal::Quit);
        vr.listen_to_button(
            OculusTouchButton::TriggerButton,
            Hand::Right,
            TrialSignal::EndTrial,
        );

        let mut capture = ImageCapture::new([VR_AVATAR_ID], CAPTURE_PASSES);
        if options.save_images {
            capture = capture.with_output_dir(&options.output_dir);
        }

        let catalog = OfficeCatalog::from_librarian(&librarian);
        let writer = DepthDumpWriter::new(options.output_dir.join(DUMP_FILE_NAME));
        let manifest = RunManifest::start(SCENE_NAME, options.buffer_scope);

        let mut scene = Self {
            client,
            vr,
            capture,
            librarian,
            catalog,
            props,
            options,
            rng,
            state: TrialState::default(),
            depth: DepthFrameBuffer::new(),
            writer,
            manifest,
            issued_ids: HashSet::new(),
            spawned: HashSet::new(),
            trials: 0,
            dump: None,
        };

        let mut setup = commands::empty_room(scene.options.room_width, scene.options.room_length);
        setup.push(Command::SetRenderQuality {
            render_quality: scene.options.render_quality,
        });
        scene.communicate(setup).await?;
        info!(run_id = %scene.manifest.run_id, "office scene ready");
        Ok(scene)
    }

    pub fn state(&self) -> TrialState {
        self.state
    }

    pub fn depth_buffer(&self) -> &DepthFrameBuffer {
        &self.depth
    }

    pub fn dump_path(&self) -> &std::path::Path {
        self.writer.path()
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    /// Runs trials until a quit signal arrives, then terminates the engine.
    pub async fn run(&mut self) -> Result<RunSummary, ControllerError> {
        while !self.state.simulation_done {
            let report = self.trial().await?;
            info!(
                trial = report.index,
                frames = report.frames_captured,
                "trial finished"
            );
        }
        self.communicate(vec![Command::Terminate]).await?;

        Ok(RunSummary {
            trials: self.trials,
            frames_dumped: self.dump.as_ref().map_or(0, |dump| dump.frames),
            dump_path: self.dump.as_ref().map(|dump| dump.dump_path.clone()),
            manifest_path: self.dump.as_ref().map(|dump| dump.manifest_path.clone()),
        })
    }

    pub async fn trial(&mut self) -> Result<TrialReport, ControllerError> {
        self.vr.reset();
        self.state.trial_done = false;
        self.trials += 1;

        let table = self.catalog.choose_table(&mut self.rng)?.clone();
        let chair = self.catalog.choose_chair(&mut self.rng)?.clone();
        let lamp = self.catalog.choose_lamp(&mut self.rng)?.clone();
        info!(
            trial = self.trials,
            table = %table.name,
            chair = %chair.name,
            lamp = %lamp.name,
            "starting trial"
        );

        let mut spawned = Vec::new();
        let table_id = self.unique_id();
        let table_position = Vector3::new(TABLE_X, 0.0, TABLE_Z);
        let outputs = self
            .communicate(table_commands(&table, table_id, table_position)?)
            .await?;
        spawned.push(spawn_entry(Prop::Table, table_id, &table, table_position));

        let bounds = find_bounds(&outputs, table_id)
            .ok_or_else(|| SceneError::missing_bounds(table_id))?
            .clone();
        let top = bounds.top.y;
        let chair_positions = [
            sample_chair_position(bounds.center, bounds.left, &mut self.rng)?,
            sample_chair_position(bounds.center, bounds.right, &mut self.rng)?,
        ];

        let ids = TrialIds {
            table: table_id,
            cup: self.unique_id(),
            computer: self.unique_id(),
            mouse: self.unique_id(),
            lamp: self.unique_id(),
            fruit: self.unique_id(),
            book: self.unique_id(),
            pen: self.unique_id(),
        };

        let accessories = [
            (
                Prop::Computer,
                self.record(LAPTOP_MODEL)?,
                ids.computer,
                Vector3::new(TABLE_X + 0.1, top, TABLE_Z + 0.3),
                Vector3::yaw(180.0),
            ),
            (
                Prop::Mouse,
                self.record(MOUSE_MODEL)?,
                ids.mouse,
                Vector3::new(TABLE_X + 0.4, top, TABLE_Z + 0.2),
                Vector3::ZERO,
            ),
            (
                Prop::Lamp,
                lamp,
                ids.lamp,
                Vector3::new(bounds.left.x - 0.3, 0.0, bounds.left.z + 1.0),
                Vector3::yaw(180.0),
            ),
            (
                Prop::Cup,
                self.record(&self.props.cup)?,
                ids.cup,
                Vector3::new(TABLE_X - 0.3, top, TABLE_Z - 0.3),
                Vector3::ZERO,
            ),
        ];
        let mut batch = Vec::with_capacity(accessories.len());
        for (prop, record, id, position, rotation) in &accessories {
            batch.push(commands::add_object(record, *id, *position, *rotation)?);
            spawned.push(spawn_entry(*prop, *id, record, *position));
        }
        self.communicate(batch).await?;

        let optional = [
            (
                Prop::Fruit,
                self.props.fruit.clone(),
                ids.fruit,
                Vector3::new(TABLE_X - 0.3, top, TABLE_Z + 0.1),
                false,
            ),
            (
                Prop::Book,
                self.props.book.clone(),
                ids.book,
                Vector3::new(TABLE_X, top, TABLE_Z - 0.2),
                true,
            ),
            (
                Prop::Pen,
                self.props.pen.clone(),
                ids.pen,
                Vector3::new(TABLE_X + 0.3, top, TABLE_Z - 0.2),
                true,
            ),
        ];
        for (prop, model, id, position, spin) in optional {
            let Some(model) = model else {
                continue;
            };
            let record = self.record(&model)?;
            let rotation = if spin {
                Vector3::yaw(sample_prop_yaw(&mut self.rng))
            } else {
                Vector3::ZERO
            };
            let command = commands::add_object(&record, id, position, rotation)?;
            self.communicate(vec![command]).await?;
            spawned.push(spawn_entry(prop, id, &record, position));
        }

        let mut chair_ids = Vec::with_capacity(chair_positions.len());
        let mut batch = Vec::new();
        for position in chair_positions {
            let id = self.unique_id();
            chair_ids.push(id);
            batch.extend(commands::add_physics_object(
                &chair,
                id,
                position,
                Vector3::ZERO,
                PhysicsProperties::default(),
            )?);
            batch.push(Command::ObjectLookAtPosition {
                position: bounds.bottom,
                id,
            });
            batch.push(Command::RotateObjectBy {
                angle: sample_chair_yaw(&mut self.rng),
                id,
                axis: RotationAxis::Yaw,
            });
            spawned.push(spawn_entry(Prop::Chair, id, &chair, position));
        }
        self.communicate(batch).await?;

        // A quit during setup still dumps the previous trial's frames.
        if self.options.buffer_scope == DepthBufferScope::PerTrial {
            self.depth.clear();
        }
        let frames_captured = self.capture_until_done().await?;

        let teardown = ids.teardown_order().into_iter().map(commands::destroy).collect();
        self.communicate(teardown).await?;
        for id in chair_ids {
            self.communicate(vec![commands::destroy(id)]).await?;
        }

        Ok(TrialReport {
            index: self.trials,
            spawned,
            chair_positions,
            frames_captured,
        })
    }

    pub fn end_trial(&mut self) {
        debug!(trial = self.trials, "end of trial requested");
        self.state.trial_done = true;
    }

    /// Stops the run and writes the depth dump and manifest. Only the first call
    /// writes.
    pub fn quit(&mut self) -> Result<(), ControllerError> {
        self.state.simulation_done = true;
        if self.dump.is_some() {
            debug!("depth dump already written");
            return Ok(());
        }

        let dump_path = self.writer.write(&self.depth)?.to_path_buf();
        self.manifest.trials = self.trials;
        self.manifest.finish(self.depth.len(), &dump_path);
        let manifest_path = self.manifest.write(&self.options.output_dir)?;
        info!(
            frames = self.depth.len(),
            path = %dump_path.display(),
            "quit requested, depth dump written"
        );
        self.dump = Some(DumpRecord {
            dump_path,
            manifest_path,
            frames: self.depth.len(),
        });
        Ok(())
    }

    async fn capture_until_done(&mut self) -> Result<usize, ControllerError> {
        let mut captured = 0;
        while !self.state.trial_done && !self.state.simulation_done {
            self.round_trip(Vec::new()).await?;
            if let Some(images) = self.capture.images(VR_AVATAR_ID) {
                let frames = depth_frames(images, self.options.clip_planes)?;
                captured += frames.len();
                self.depth.extend(frames);
            }
            self.apply_signals()?;
        }
        Ok(captured)
    }

    async fn communicate(
        &mut self,
        batch: Vec<Command>,
    ) -> Result<Vec<OutputData>, ControllerError> {
        self.track(&batch);
        let outputs = self
            .round_trip(batch.into_iter().map(WireCommand::from).collect())
            .await?;
        self.apply_signals()?;
        Ok(outputs)
    }

    async fn round_trip(
        &mut self,
        batch: Vec<WireCommand>,
    ) -> Result<Vec<OutputData>, ControllerError> {
        let add_ons: &mut [&mut dyn AddOn] = &mut [&mut self.vr, &mut self.capture];
        Ok(communicate_with_add_ons(&mut self.client, add_ons, batch).await?)
    }

    fn apply_signals(&mut self) -> Result<(), ControllerError> {
        for signal in self.vr.drain_signals() {
            match signal {
                TrialSignal::EndTrial => self.end_trial(),
                TrialSignal::Quit => self.quit()?,
            }
        }
        Ok(())
    }

    fn track(&mut self, batch: &[Command]) {
        for command in batch {
            match command {
                Command::AddObject { id, .. } => {
                    self.spawned.insert(*id);
                }
                Command::DestroyObject { id } => {
                    if !self.spawned.remove(id) {
                        debug!(%id, "destroying object that was never spawned");
                    }
                }
                _ => {}
            }
        }
    }

    fn record(&self, model: &str) -> Result<ModelRecord, SceneError> {
        self.librarian.get_record(model).cloned()
    }

    fn unique_id(&mut self) -> ObjectId {
        loop {
            let id = ObjectId(self.rng.gen_range(1..MAX_OBJECT_ID));
            if self.issued_ids.insert(id) {
                return id;
            }
        }
    }
}

fn table_commands(
    table: &ModelRecord,
    id: ObjectId,
    position: Vector3,
) -> Result<Vec<Command>, SceneError> {
    Ok(vec![
        commands::add_object(table, id, position, Vector3::ZERO)?,
        Command::RotateObjectToEulerAngles {
            euler_angles: Vector3::ZERO,
            id,
        },
        Command::SetKinematicState {
            id,
            is_kinematic: TABLE_PHYSICS.is_kinematic,
            use_gravity: TABLE_PHYSICS.use_gravity,
        },
        Command::SetMass {
            mass: TABLE_PHYSICS.mass,
            id,
        },
        Command::SetPhysicMaterial {
            dynamic_friction: TABLE_PHYSICS.dynamic_friction,
            static_friction: TABLE_PHYSICS.static_friction,
            bounciness: TABLE_PHYSICS.bounciness,
            id,
        },
        Command::SendBounds {
            frequency: Frequency::Once,
            ids: vec![id],
        },
    ])
}

fn spawn_entry(
    prop: Prop,
    id: ObjectId,
    record: &ModelRecord,
    position: Vector3,
) -> SpawnedObject {
    SpawnedObject {
        prop,
        id,
        model: record.name.clone(),
        position,
    }
}

#[cfg(test)]
#[path = "tests/office_tests.rs"]
mod tests;
