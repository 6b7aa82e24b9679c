use anyhow::{Context, Result};
use log::{debug, info};
use police_maze_core::{EntityStore, Event, ItemId};
use police_maze_system_room::{Room, RoomTick};
use police_maze_system_track::AddMode;
use police_maze_world::{self as world, query, Config, Item, World};

use crate::{room_definition::RoomDefinition, save_transfer::SaveTransfer};

/// Headless driver pairing a room with the reference host.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    room: Room,
    frames: u64,
}

/// Result of advancing the simulation by one frame.
#[derive(Debug)]
pub(crate) struct FrameOutcome {
    pub(crate) tick: RoomTick,
    pub(crate) events: Vec<Event>,
}

impl Simulation {
    /// Stages the room and starts every active track from the top.
    pub(crate) fn start(definition: &RoomDefinition, config: Config) -> Result<Self> {
        let mut world = World::with_config(config);
        let staged = definition.stage(&mut world);
        debug!("staged room with {} setup events", staged.len());

        let mut room = Room::new(definition.rules());
        definition.attach(&mut room, AddMode::Fresh)?;
        room.activate();
        room.set_pause_state(false, &world);
        Ok(Self {
            world,
            room,
            frames: 0,
        })
    }

    /// Stages the room and continues the tracks from a save.
    ///
    /// Host scalars are not part of the save, so variables and flags start
    /// fresh; items are moved onto the waypoints their tracks occupied.
    pub(crate) fn resume(
        definition: &RoomDefinition,
        config: Config,
        save: &SaveTransfer,
    ) -> Result<Self> {
        let mut world = World::with_config(config);
        let _ = definition.stage(&mut world);

        let mut room = Room::new(definition.rules());
        save.restore_into(&mut room, &world)
            .context("save does not describe a police maze room")?;
        definition.attach(&mut room, AddMode::Reattach)?;

        for track in room.tracks().iter().filter(|track| track.is_present()) {
            if let Some(position) = track.waypoints().get(track.waypoint_index()) {
                world.set_position(track.item(), *position);
            }
        }
        let _ = world.drain_events();

        room.set_pause_state(false, &world);
        info!("resumed police maze from save");
        Ok(Self {
            world,
            room,
            frames: 0,
        })
    }

    /// Advances the host clock by `frame_ms` and ticks the room once.
    pub(crate) fn step(&mut self, frame_ms: u64) -> FrameOutcome {
        let mut events = Vec::new();
        world::apply(&mut self.world, world::frame(frame_ms), &mut events);
        let tick = self.room.tick(&mut self.world);
        self.frames += 1;
        events.extend(self.world.drain_events());
        FrameOutcome { tick, events }
    }

    /// Captures the room for a later resume.
    pub(crate) fn save(&self) -> Result<SaveTransfer> {
        SaveTransfer::capture(&self.room).context("failed to encode room save")
    }

    pub(crate) fn room(&self) -> &Room {
        &self.room
    }

    pub(crate) fn score(&self) -> i32 {
        self.room.score(&self.world)
    }

    pub(crate) fn frames(&self) -> u64 {
        self.frames
    }

    pub(crate) fn now_ms(&self) -> u32 {
        query::now_ms(&self.world)
    }

    /// Staged items in identifier order.
    pub(crate) fn items(&self) -> impl Iterator<Item = (ItemId, &Item)> + '_ {
        query::items(&self.world)
    }
}

#[cfg(test)]
mod tests {
    use police_maze_core::Difficulty;

    use super::*;

    fn run(seed: u64, frames: usize) -> (Vec<FrameOutcome>, Simulation) {
        let definition = RoomDefinition::load(None).expect("bundled room");
        let mut simulation =
            Simulation::start(&definition, Config::new(seed, Difficulty::Normal, 0))
                .expect("room starts");
        let outcomes = (0..frames).map(|_| simulation.step(66)).collect();
        (outcomes, simulation)
    }

    #[test]
    fn same_seed_replays_same_frames() {
        let (first, first_sim) = run(11, 300);
        let (second, second_sim) = run(11, 300);
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
        assert_eq!(first_sim.score(), second_sim.score());
        assert_eq!(first_sim.frames(), 300);
        assert_eq!(first_sim.now_ms(), 300 * 66);
    }

    #[test]
    fn resume_restores_track_progress() {
        let (_, simulation) = run(5, 40);
        let save = simulation.save().expect("room saves");
        let definition = RoomDefinition::load(None).expect("bundled room");

        let resumed = Simulation::resume(&definition, Config::default(), &save)
            .expect("room resumes");
        assert_eq!(resumed.room().snapshot(), simulation.room().snapshot());
        assert_eq!(resumed.frames(), 0);
    }

    #[test]
    fn resumed_items_stand_on_their_restored_waypoints() {
        let (_, simulation) = run(5, 40);
        let save = simulation.save().expect("room saves");
        let definition = RoomDefinition::load(None).expect("bundled room");
        let resumed = Simulation::resume(&definition, Config::default(), &save)
            .expect("room resumes");

        let driven: Vec<_> = resumed
            .room()
            .tracks()
            .iter()
            .filter(|track| track.is_present())
            .map(|track| (track.item(), track.waypoints()[track.waypoint_index()]))
            .collect();
        assert_eq!(driven.len(), definition.tracks.len());
        for (item, waypoint) in driven {
            let (_, placed) = resumed
                .items()
                .find(|(id, _)| *id == item)
                .expect("driven item is staged");
            assert_eq!(placed.position(), waypoint, "item {item}");
        }
    }

    #[test]
    fn items_are_listed_in_identifier_order() {
        let (_, simulation) = run(3, 1);
        let ids: Vec<ItemId> = simulation.items().map(|(id, _)| id).collect();
        let mut sorted = ids.clone();
        sorted.sort_by_key(|id| id.get());
        assert_eq!(ids, sorted);
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn resume_rejects_saves_for_other_rooms() {
        let (_, simulation) = run(5, 10);
        let save = simulation.save().expect("room saves");
        let other = RoomDefinition::parse(
            r#"
            [[items]]
            id = 99
            position = [0.0, 0.0, 0.0]

            [[tracks]]
            slot = 0
            item = 99
            start = [0.0, 0.0, 0.0]
            end = [0.0, 0.0, 0.0]
            steps = 1
            program = [-3, 100, -4]
            "#,
        )
        .expect("room parses");

        let error = Simulation::resume(&other, Config::default(), &save).expect_err("mismatch");
        assert!(format!("{error:#}").contains("slot 0"));
    }
}
