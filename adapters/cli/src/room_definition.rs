use std::{collections::BTreeSet, fs, path::Path, sync::Arc};

use anyhow::{bail, Context, Result};
use police_maze_core::{
    Command, Event, ItemId, MazeRules, SceneId, SetId, TrackIndex, Vector3,
};
use police_maze_system_room::Room;
use police_maze_system_track::{AddMode, Program, TrackSetup};
use police_maze_world::{self as world, World};
use serde::Deserialize;

const BUNDLED_ROOM: &str = include_str!("../rooms/ps10.toml");

/// Authored police maze room: the items placed in the scene and the tracks
/// driving them.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct RoomDefinition {
    #[serde(default = "default_set")]
    pub(crate) set: i32,
    #[serde(default = "default_scene")]
    pub(crate) scene: i32,
    #[serde(default)]
    pub(crate) debug_overlay: bool,
    #[serde(default)]
    pub(crate) items: Vec<ItemDefinition>,
    #[serde(default)]
    pub(crate) tracks: Vec<TrackDefinition>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct ItemDefinition {
    pub(crate) id: i32,
    pub(crate) position: [f32; 3],
    #[serde(default)]
    pub(crate) facing: i32,
    #[serde(default)]
    pub(crate) target: bool,
    #[serde(default)]
    pub(crate) obstacle: bool,
    #[serde(default)]
    pub(crate) enemy: bool,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct TrackDefinition {
    pub(crate) slot: u32,
    pub(crate) item: i32,
    pub(crate) start: [f32; 3],
    pub(crate) end: [f32; 3],
    pub(crate) steps: u32,
    #[serde(default)]
    pub(crate) active: bool,
    pub(crate) program: Vec<i32>,
}

fn default_set() -> i32 {
    14
}

fn default_scene() -> i32 {
    80
}

impl RoomDefinition {
    /// Loads the room at `path`, or the bundled demo room when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let contents = fs::read_to_string(path)
                    .with_context(|| format!("failed to read room definition {}", path.display()))?;
                Self::parse(&contents)
                    .with_context(|| format!("failed to parse room definition {}", path.display()))
            }
            None => Self::parse(BUNDLED_ROOM).context("bundled room definition is invalid"),
        }
    }

    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let definition: Self = toml::from_str(contents).context("room definition is not valid TOML")?;
        definition.validate()?;
        Ok(definition)
    }

    fn validate(&self) -> Result<()> {
        let mut items = BTreeSet::new();
        for item in &self.items {
            if !items.insert(item.id) {
                bail!("item {} is placed twice", item.id);
            }
        }

        let mut slots = BTreeSet::new();
        for track in &self.tracks {
            if !slots.insert(track.slot) {
                bail!("track slot {} is defined twice", track.slot);
            }
            if !items.contains(&track.item) {
                bail!(
                    "track slot {} drives item {} which is not placed",
                    track.slot,
                    track.item
                );
            }
        }
        Ok(())
    }

    /// Rules the room runs under.
    pub(crate) fn rules(&self) -> MazeRules {
        MazeRules {
            maze_set: SetId::new(self.set),
            debug_overlay: self.debug_overlay,
            ..MazeRules::default()
        }
    }

    /// Moves the host into the maze scene and places every item.
    pub(crate) fn stage(&self, world: &mut World) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(
            world,
            Command::EnterScene {
                set: SetId::new(self.set),
                scene: SceneId::new(self.scene),
            },
            &mut events,
        );
        for item in &self.items {
            world::apply(
                world,
                Command::PlaceItem {
                    item: ItemId::new(item.id),
                    position: Vector3::from(item.position),
                    facing: item.facing,
                    target: item.target,
                    obstacle: item.obstacle,
                    maze_enemy: item.enemy,
                },
                &mut events,
            );
        }
        events
    }

    /// Decodes every track program, keyed by slot.
    pub(crate) fn programs(&self) -> Result<Vec<(TrackIndex, Arc<Program>)>> {
        self.tracks
            .iter()
            .map(|track| {
                let program = Program::decode(&track.program)
                    .with_context(|| format!("track slot {} has an invalid program", track.slot))?;
                Ok((TrackIndex::new(track.slot), Arc::new(program)))
            })
            .collect()
    }

    /// Attaches every track to `room`.
    pub(crate) fn attach(&self, room: &mut Room, mode: AddMode) -> Result<()> {
        for (track, (slot, program)) in self.tracks.iter().zip(self.programs()?) {
            let setup = TrackSetup {
                item: ItemId::new(track.item),
                start: Vector3::from(track.start),
                end: Vector3::from(track.end),
                step_count: track.steps,
                active: track.active,
            };
            room.add_track(slot, setup, program, mode)
                .with_context(|| format!("failed to attach track slot {slot}"))?;
        }
        Ok(())
    }
}
