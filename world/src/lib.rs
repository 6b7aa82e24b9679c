#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Reference host for the police maze.
//!
//! [`World`] implements every service trait the tracks and the room consume:
//! an item table, global variables and flags, a seeded random source, a manual
//! millisecond clock, and player and audio state. Adapters mutate it with
//! [`apply`]; the effects of service calls made by tracks are journaled as
//! [`Event`] values that adapters collect with [`World::drain_events`].

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use log::warn;
use police_maze_core::{
    AnimationMode, AudioSink, Clock, Command, Difficulty, EntityStore, Event, FlagId, ItemId,
    PlayerControl, RandomSource, ScalarStore, SceneId, SceneQuery, SetId, SoundId, VariableId,
    Vector3, VoiceLineId,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DEFAULT_SEED: u64 = 0x42f0_e1eb_d4a5_3c21;

/// Configuration parameters required to construct a world.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    rng_seed: u64,
    difficulty: Difficulty,
    start_ms: u32,
}

impl Config {
    /// Creates a new configuration.
    #[must_use]
    pub const fn new(rng_seed: u64, difficulty: Difficulty, start_ms: u32) -> Self {
        Self {
            rng_seed,
            difficulty,
            start_ms,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_SEED, Difficulty::Normal, 0)
    }
}

/// State of a single scene item.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    position: Vector3,
    facing: i32,
    target: bool,
    obstacle: bool,
    spinning: bool,
    maze_enemy: bool,
    registrations: u32,
}

impl Item {
    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vector3 {
        self.position
    }

    /// Current facing angle.
    #[must_use]
    pub const fn facing(&self) -> i32 {
        self.facing
    }

    /// Whether the item can be shot.
    #[must_use]
    pub const fn is_target(&self) -> bool {
        self.target
    }

    /// Whether the item blocks movement.
    #[must_use]
    pub const fn is_obstacle(&self) -> bool {
        self.obstacle
    }

    /// Whether a spin animation is playing.
    #[must_use]
    pub const fn is_spinning(&self) -> bool {
        self.spinning
    }

    /// Whether the item is flagged as a maze enemy.
    #[must_use]
    pub const fn is_maze_enemy(&self) -> bool {
        self.maze_enemy
    }

    /// Number of times the item's bounds were re-registered.
    #[must_use]
    pub const fn registrations(&self) -> u32 {
        self.registrations
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Player {
    walking: bool,
    animation: Option<AnimationMode>,
    combat_mode: bool,
    cursor_jitters: u32,
}

/// Represents the authoritative host state.
#[derive(Clone, Debug)]
pub struct World {
    items: BTreeMap<ItemId, Item>,
    variables: BTreeMap<VariableId, i32>,
    flags: BTreeSet<FlagId>,
    rng: ChaCha8Rng,
    now_ms: u32,
    difficulty: Difficulty,
    player: Player,
    set: SetId,
    scene: SceneId,
    journal: Vec<Event>,
}

impl World {
    /// Creates a world using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Creates a world using the supplied configuration.
    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            items: BTreeMap::new(),
            variables: BTreeMap::new(),
            flags: BTreeSet::new(),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            now_ms: config.start_ms,
            difficulty: config.difficulty,
            player: Player {
                walking: true,
                ..Player::default()
            },
            set: SetId::new(-1),
            scene: SceneId::new(-1),
            journal: Vec::new(),
        }
    }

    /// Removes and returns the effects journaled by service calls.
    pub fn drain_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.journal)
    }

    fn item_mut(&mut self, item: ItemId) -> Option<&mut Item> {
        let found = self.items.get_mut(&item);
        if found.is_none() {
            warn!("item {item} is not placed in the world");
        }
        found
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ConfigureDifficulty { difficulty } => {
            world.difficulty = difficulty;
            out_events.push(Event::DifficultyChanged { difficulty });
        }
        Command::EnterScene { set, scene } => {
            world.set = set;
            world.scene = scene;
            out_events.push(Event::SceneEntered { set, scene });
        }
        Command::AdvanceClock { dt } => {
            let millis = u32::try_from(dt.as_millis()).unwrap_or(u32::MAX);
            world.now_ms = world.now_ms.wrapping_add(millis);
            out_events.push(Event::ClockAdvanced {
                now_ms: world.now_ms,
            });
        }
        Command::PlaceItem {
            item,
            position,
            facing,
            target,
            obstacle,
            maze_enemy,
        } => {
            let _ = world.items.insert(
                item,
                Item {
                    position,
                    facing,
                    target,
                    obstacle,
                    spinning: false,
                    maze_enemy,
                    registrations: 0,
                },
            );
            out_events.push(Event::ItemPlaced { item });
        }
        Command::SetCombatMode { enabled } => {
            world.player.combat_mode = enabled;
            out_events.push(Event::CombatModeChanged { enabled });
        }
        Command::SetSpinning { item, spinning } => {
            if let Some(entry) = world.item_mut(item) {
                entry.spinning = spinning;
            }
        }
    }
}

impl EntityStore for World {
    fn position(&self, item: ItemId) -> Option<Vector3> {
        self.items.get(&item).map(Item::position)
    }

    fn set_position(&mut self, item: ItemId, position: Vector3) {
        let Some(entry) = self.item_mut(item) else {
            return;
        };
        entry.position = position;
        self.journal.push(Event::ItemMoved { item, position });
    }

    fn facing(&self, item: ItemId) -> Option<i32> {
        self.items.get(&item).map(Item::facing)
    }

    fn set_facing(&mut self, item: ItemId, facing: i32) {
        if let Some(entry) = self.item_mut(item) {
            entry.facing = facing;
        }
    }

    fn is_target(&self, item: ItemId) -> bool {
        self.items.get(&item).is_some_and(Item::is_target)
    }

    fn set_target(&mut self, item: ItemId, target: bool) {
        if let Some(entry) = self.item_mut(item) {
            entry.target = target;
        }
    }

    fn is_obstacle(&self, item: ItemId) -> bool {
        self.items.get(&item).is_some_and(Item::is_obstacle)
    }

    fn set_obstacle(&mut self, item: ItemId, obstacle: bool) {
        if let Some(entry) = self.item_mut(item) {
            entry.obstacle = obstacle;
        }
    }

    fn is_spinning(&self, item: ItemId) -> bool {
        self.items.get(&item).is_some_and(Item::is_spinning)
    }

    fn is_maze_enemy(&self, item: ItemId) -> bool {
        self.items.get(&item).is_some_and(Item::is_maze_enemy)
    }

    fn set_maze_enemy(&mut self, item: ItemId, enemy: bool) {
        if let Some(entry) = self.item_mut(item) {
            entry.maze_enemy = enemy;
        }
    }

    fn reregister_bounds(&mut self, item: ItemId) {
        let Some(entry) = self.item_mut(item) else {
            return;
        };
        entry.registrations = entry.registrations.saturating_add(1);
        self.journal.push(Event::ItemBoundsRegistered { item });
    }
}

impl ScalarStore for World {
    fn variable(&self, id: VariableId) -> i32 {
        self.variables.get(&id).copied().unwrap_or(0)
    }

    fn set_variable(&mut self, id: VariableId, value: i32) {
        let _ = self.variables.insert(id, value);
    }

    fn flag(&self, id: FlagId) -> bool {
        self.flags.contains(&id)
    }

    fn set_flag(&mut self, id: FlagId, value: bool) {
        let _ = if value {
            self.flags.insert(id)
        } else {
            self.flags.remove(&id)
        };
    }
}

impl RandomSource for World {
    fn random_inclusive(&mut self, min: i32, max: i32) -> i32 {
        let (low, high) = if min <= max { (min, max) } else { (max, min) };
        self.rng.gen_range(low..=high)
    }
}

impl AudioSink for World {
    fn play_sound(&mut self, sound: SoundId, volume: i32) {
        self.journal.push(Event::SoundPlayed { sound, volume });
    }

    fn play_voice_over(&mut self, line: VoiceLineId) {
        self.journal.push(Event::VoiceOverPlayed { line });
    }
}

impl PlayerControl for World {
    fn stop_walking(&mut self) {
        self.player.walking = false;
        self.journal.push(Event::PlayerStopped);
    }

    fn change_animation(&mut self, mode: AnimationMode) {
        self.player.animation = Some(mode);
        self.journal.push(Event::PlayerAnimationChanged { mode });
    }

    fn is_combat_mode(&self) -> bool {
        self.player.combat_mode
    }

    fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    fn jitter_cursor(&mut self) {
        self.player.cursor_jitters = self.player.cursor_jitters.saturating_add(1);
        self.journal.push(Event::CursorJittered);
    }
}

impl SceneQuery for World {
    fn current_set(&self) -> SetId {
        self.set
    }

    fn current_scene(&self) -> SceneId {
        self.scene
    }
}

impl Clock for World {
    fn now_ms(&self) -> u32 {
        self.now_ms
    }
}

/// Convenience for adapters that advance the clock by whole milliseconds.
#[must_use]
pub fn frame(ms: u64) -> Command {
    Command::AdvanceClock {
        dt: Duration::from_millis(ms),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{Item, World};
    use police_maze_core::{AnimationMode, FlagId, ItemId, VariableId};

    /// Retrieves the item with the provided identifier.
    #[must_use]
    pub fn item(world: &World, item: ItemId) -> Option<&Item> {
        world.items.get(&item)
    }

    /// Enumerates placed items in identifier order.
    pub fn items(world: &World) -> impl Iterator<Item = (ItemId, &Item)> + '_ {
        world.items.iter().map(|(id, item)| (*id, item))
    }

    /// Reads a global variable.
    #[must_use]
    pub fn variable(world: &World, id: VariableId) -> i32 {
        world.variables.get(&id).copied().unwrap_or(0)
    }

    /// Reads a game flag.
    #[must_use]
    pub fn flag(world: &World, id: FlagId) -> bool {
        world.flags.contains(&id)
    }

    /// Current clock reading.
    #[must_use]
    pub fn now_ms(world: &World) -> u32 {
        world.now_ms
    }

    /// Whether the player is still walking.
    #[must_use]
    pub fn player_walking(world: &World) -> bool {
        world.player.walking
    }

    /// Last animation mode requested for the player.
    #[must_use]
    pub fn player_animation(world: &World) -> Option<AnimationMode> {
        world.player.animation
    }

    /// Number of cursor jitters requested so far.
    #[must_use]
    pub fn cursor_jitters(world: &World) -> u32 {
        world.player.cursor_jitters
    }
}
