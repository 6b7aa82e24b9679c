#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the police maze engine.
//!
//! This crate defines the surface that connects the host environment, the
//! scripted target tracks, and the room controller that owns them. Tracks and
//! the room never own game state directly: every read or write of entity
//! flags, global variables, randomness, audio, player control, or time goes
//! through the host service traits declared here. The reference host lives in
//! `police-maze-world`, which is driven by [`Command`] values and journals the
//! effects of service calls as [`Event`] values.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};

/// Number of track slots owned by a maze room.
pub const TRACK_CAPACITY: usize = 64;

/// Maximum number of waypoints a single track may precompute.
pub const WAYPOINT_CAPACITY: usize = 100;

macro_rules! integer_id {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name($inner);

        impl $name {
            /// Creates a new identifier with the provided numeric value.
            #[must_use]
            pub const fn new(value: $inner) -> Self {
                Self(value)
            }

            /// Retrieves the numeric representation of the identifier.
            #[must_use]
            pub const fn get(&self) -> $inner {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

integer_id!(
    /// Identifier of a scene item driven by a track.
    ItemId(i32)
);
integer_id!(
    /// Identifier of an integer global variable.
    VariableId(i32)
);
integer_id!(
    /// Identifier of a boolean game flag.
    FlagId(i32)
);
integer_id!(
    /// Identifier of a sound effect.
    SoundId(i32)
);
integer_id!(
    /// Identifier of a voice-over line.
    VoiceLineId(i32)
);
integer_id!(
    /// Identifier of a loaded set (physical location).
    SetId(i32)
);
integer_id!(
    /// Identifier of a scene within a set.
    SceneId(i32)
);
integer_id!(
    /// Animation mode requested from the player actor.
    AnimationMode(i32)
);
integer_id!(
    /// Index of a track slot within a room's pool.
    TrackIndex(u32)
);

impl TrackIndex {
    /// Converts the index into a slice position.
    #[must_use]
    pub fn as_usize(self) -> usize {
        usize::try_from(self.0).unwrap_or(usize::MAX)
    }
}

/// Position in world space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    /// Horizontal coordinate.
    pub x: f32,
    /// Vertical coordinate.
    pub y: f32,
    /// Depth coordinate.
    pub z: f32,
}

impl Vector3 {
    /// Origin of world space.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a new position from its components.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Linearly interpolates component-wise toward `other`.
    ///
    /// A factor of zero yields `self` unchanged.
    #[must_use]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }
}

impl From<[f32; 3]> for Vector3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

/// Difficulty tier selected by the player.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    /// Slower scripted motion.
    Easy,
    /// Default pacing.
    #[default]
    Normal,
    /// Same pacing as normal.
    Hard,
}

/// Access to the state of scene items.
///
/// Lookups of unknown items report neutral values and writes to them are
/// ignored; hosts are expected to log such misses.
pub trait EntityStore {
    /// Current position of the item.
    fn position(&self, item: ItemId) -> Option<Vector3>;
    /// Moves the item to the provided position.
    fn set_position(&mut self, item: ItemId, position: Vector3);
    /// Current facing angle of the item.
    fn facing(&self, item: ItemId) -> Option<i32>;
    /// Sets the facing angle of the item.
    fn set_facing(&mut self, item: ItemId, facing: i32);
    /// Whether the item can currently be shot at.
    fn is_target(&self, item: ItemId) -> bool;
    /// Marks the item as shootable or not.
    fn set_target(&mut self, item: ItemId, target: bool);
    /// Whether the item blocks movement.
    fn is_obstacle(&self, item: ItemId) -> bool;
    /// Marks the item as blocking movement or not.
    fn set_obstacle(&mut self, item: ItemId, obstacle: bool);
    /// Whether the item is playing a transient spin animation.
    fn is_spinning(&self, item: ItemId) -> bool;
    /// Whether the item is flagged as a police maze enemy.
    fn is_maze_enemy(&self, item: ItemId) -> bool;
    /// Flags the item as a police maze enemy or not.
    fn set_maze_enemy(&mut self, item: ItemId, enemy: bool);
    /// Re-registers the item's spatial bounds after a position change.
    fn reregister_bounds(&mut self, item: ItemId);
}

/// Game-wide integer variables and boolean flags.
pub trait ScalarStore {
    /// Current value of the variable, zero when never written.
    fn variable(&self, id: VariableId) -> i32;
    /// Overwrites the variable.
    fn set_variable(&mut self, id: VariableId, value: i32);
    /// Current state of the flag, false when never written.
    fn flag(&self, id: FlagId) -> bool;
    /// Overwrites the flag.
    fn set_flag(&mut self, id: FlagId, value: bool);

    /// Adds one to the variable.
    fn increment_variable(&mut self, id: VariableId) {
        let value = self.variable(id);
        self.set_variable(id, value.saturating_add(1));
    }

    /// Subtracts one from the variable. There is no floor.
    fn decrement_variable(&mut self, id: VariableId) {
        let value = self.variable(id);
        self.set_variable(id, value.saturating_sub(1));
    }

    /// Sets the variable back to zero.
    fn reset_variable(&mut self, id: VariableId) {
        self.set_variable(id, 0);
    }
}

/// Source of uniformly distributed integers.
pub trait RandomSource {
    /// Draws an integer from the inclusive range `[min, max]`.
    fn random_inclusive(&mut self, min: i32, max: i32) -> i32;
}

/// Fire-and-forget audio playback.
pub trait AudioSink {
    /// Plays a sound effect at the provided volume.
    fn play_sound(&mut self, sound: SoundId, volume: i32);
    /// Plays a voice-over line.
    fn play_voice_over(&mut self, line: VoiceLineId);
}

/// Control over the player actor and its input surface.
pub trait PlayerControl {
    /// Forces the player to stop walking.
    fn stop_walking(&mut self);
    /// Switches the player's animation mode.
    fn change_animation(&mut self, mode: AnimationMode);
    /// Whether the player currently has a weapon drawn.
    fn is_combat_mode(&self) -> bool;
    /// Difficulty tier selected for the current game.
    fn difficulty(&self) -> Difficulty;
    /// Visually jolts the mouse cursor.
    fn jitter_cursor(&mut self);
}

/// Information about the scene currently loaded by the host.
pub trait SceneQuery {
    /// Set that is currently loaded.
    fn current_set(&self) -> SetId;
    /// Scene that is currently loaded.
    fn current_scene(&self) -> SceneId;
}

/// Monotonic millisecond clock.
pub trait Clock {
    /// Current time in milliseconds. The value may wrap.
    fn now_ms(&self) -> u32;
}

/// Umbrella trait for everything the police maze consumes from its host.
pub trait Host:
    EntityStore + ScalarStore + RandomSource + AudioSink + PlayerControl + SceneQuery + Clock
{
}

impl<T: ?Sized> Host for T where
    T: EntityStore + ScalarStore + RandomSource + AudioSink + PlayerControl + SceneQuery + Clock
{
}

/// Reaction applied to the player when a scripted enemy lands a shot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotReaction {
    /// Volume of the gunshot sound named by the instruction.
    pub shot_volume: i32,
    /// Pain vocalizations; one is chosen at random per hit.
    pub pain_sounds: [SoundId; 2],
    /// Volume of the pain vocalization.
    pub pain_volume: i32,
    /// Animation played when the player has a weapon drawn.
    pub combat_hit: AnimationMode,
    /// Animation played when the player is unarmed.
    pub idle_hit: AnimationMode,
}

impl Default for ShotReaction {
    fn default() -> Self {
        Self {
            shot_volume: 90,
            pain_sounds: [SoundId::new(9900), SoundId::new(9905)],
            pain_volume: 100,
            combat_hit: AnimationMode::new(22),
            idle_hit: AnimationMode::new(21),
        }
    }
}

/// Room-wide rules shared by the controller and every track it owns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeRules {
    /// Global variable holding the shared score.
    pub score_variable: VariableId,
    /// Set in which the maze runs; ticks elsewhere are ignored.
    pub maze_set: SetId,
    /// Player reaction to enemy fire.
    pub shot_reaction: ShotReaction,
    /// Completion voice-over per sub-room scene.
    pub completion_cues: Vec<(SceneId, VoiceLineId)>,
    /// Completion voice-over used when the scene has no dedicated cue.
    pub default_completion_cue: VoiceLineId,
    /// Records score overlay counters every tick when set.
    pub debug_overlay: bool,
}

impl MazeRules {
    /// Selects the completion voice-over for the scene the player is in.
    #[must_use]
    pub fn completion_cue(&self, scene: SceneId) -> VoiceLineId {
        self.completion_cues
            .iter()
            .find(|(candidate, _)| *candidate == scene)
            .map_or(self.default_completion_cue, |(_, line)| *line)
    }
}

impl Default for MazeRules {
    fn default() -> Self {
        Self {
            score_variable: VariableId::new(9),
            maze_set: SetId::new(14),
            shot_reaction: ShotReaction::default(),
            completion_cues: vec![(SceneId::new(80), VoiceLineId::new(320))],
            default_completion_cue: VoiceLineId::new(310),
            debug_overlay: false,
        }
    }
}

/// Persisted state of a single track slot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    /// Whether the slot is attached to a live item.
    pub present: bool,
    /// Item driven by the track.
    pub item: ItemId,
    /// Number of precomputed waypoints.
    pub waypoint_count: u32,
    /// Word offset of the next instruction.
    pub cursor: u32,
    /// Whether a wait countdown is running.
    pub waiting: bool,
    /// Whether the item is walking toward a waypoint.
    pub moving: bool,
    /// Waypoint the item currently occupies.
    pub waypoint_index: u32,
    /// Waypoint the item is walking toward.
    pub waypoint_target: Option<u32>,
    /// Whether the item is turning toward a facing angle.
    pub rotating: bool,
    /// Facing angle the rotation ends at.
    pub rotation_target: i32,
    /// Facing change applied per update.
    pub rotation_delta: i32,
    /// Whether script execution is suspended.
    pub paused: bool,
    /// Precomputed waypoints.
    pub waypoints: Vec<Vector3>,
    /// Milliseconds left before the next update.
    pub update_budget_ms: i32,
    /// Milliseconds left on the wait countdown.
    pub wait_remaining_ms: i32,
}

/// Persisted state of a maze room.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    /// Whether the room ignores ticks.
    pub paused: bool,
    /// Whether the player is inside the maze.
    pub active: bool,
    /// Whether the maze has been completed.
    pub ending: bool,
    /// Every pooled track in slot order.
    pub tracks: Vec<TrackSnapshot>,
}

/// Commands that express all permissible mutations of the reference host.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Selects the difficulty tier.
    ConfigureDifficulty {
        /// Tier to activate.
        difficulty: Difficulty,
    },
    /// Loads a set and scene.
    EnterScene {
        /// Set to load.
        set: SetId,
        /// Scene within the set.
        scene: SceneId,
    },
    /// Advances the host clock.
    AdvanceClock {
        /// Time that elapsed since the previous frame.
        dt: Duration,
    },
    /// Creates or replaces a scene item.
    PlaceItem {
        /// Identifier of the item.
        item: ItemId,
        /// Initial position.
        position: Vector3,
        /// Initial facing angle.
        facing: i32,
        /// Whether the item starts shootable.
        target: bool,
        /// Whether the item starts blocking movement.
        obstacle: bool,
        /// Whether the item starts flagged as a maze enemy.
        maze_enemy: bool,
    },
    /// Draws or holsters the player's weapon.
    SetCombatMode {
        /// Whether a weapon is drawn.
        enabled: bool,
    },
    /// Starts or ends an item's spin animation.
    SetSpinning {
        /// Item being animated.
        item: ItemId,
        /// Whether the animation is playing.
        spinning: bool,
    },
}

/// Effects reported by the reference host.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// The difficulty tier changed.
    DifficultyChanged {
        /// Tier now active.
        difficulty: Difficulty,
    },
    /// A set and scene were loaded.
    SceneEntered {
        /// Loaded set.
        set: SetId,
        /// Loaded scene.
        scene: SceneId,
    },
    /// The clock advanced.
    ClockAdvanced {
        /// Time after advancing.
        now_ms: u32,
    },
    /// An item was created or replaced.
    ItemPlaced {
        /// Placed item.
        item: ItemId,
    },
    /// An item moved.
    ItemMoved {
        /// Moved item.
        item: ItemId,
        /// Position after the move.
        position: Vector3,
    },
    /// An item's spatial bounds were re-registered.
    ItemBoundsRegistered {
        /// Re-registered item.
        item: ItemId,
    },
    /// A sound effect was played.
    SoundPlayed {
        /// Sound that played.
        sound: SoundId,
        /// Volume it played at.
        volume: i32,
    },
    /// A voice-over line was played.
    VoiceOverPlayed {
        /// Line that played.
        line: VoiceLineId,
    },
    /// The player was forced to stop walking.
    PlayerStopped,
    /// The player's animation mode changed.
    PlayerAnimationChanged {
        /// Mode now active.
        mode: AnimationMode,
    },
    /// The player drew or holstered a weapon.
    CombatModeChanged {
        /// Whether a weapon is drawn.
        enabled: bool,
    },
    /// The cursor was jolted.
    CursorJittered,
}
