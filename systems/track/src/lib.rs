#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Scripted target tracks for the police maze.
//!
//! A [`Track`] drives one scene item along a precomputed straight path while
//! interpreting a small [`Program`]. Execution is throttled to a fixed update
//! rate that does not depend on the host frame rate, and suspends on waits,
//! rotations, single waypoint steps, shots, and pauses. Tracks reach their
//! siblings only through [`Siblings`], a split borrow of the owning pool, so
//! cross-track pauses take effect immediately and in pool order.

use std::{
    io::{Read, Write},
    sync::Arc,
};

use log::{debug, warn};
use police_maze_core::{
    Difficulty, Host, ItemId, MazeRules, TrackIndex, TrackSnapshot, Vector3, TRACK_CAPACITY,
    WAYPOINT_CAPACITY,
};
use thiserror::Error;

pub mod program;

pub use program::{Instruction, Program, ProgramError};

/// Instructions one track may execute in a single update before it is halted.
pub const RUNAWAY_LIMIT: usize = 256;

/// Milliseconds between track updates for the provided difficulty.
#[must_use]
pub const fn update_quantum_ms(difficulty: Difficulty) -> i32 {
    match difficulty {
        Difficulty::Easy => 100,
        Difficulty::Normal | Difficulty::Hard => 66,
    }
}

/// Geometry and initial state supplied when a track is attached to an item.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackSetup {
    /// Item driven by the track.
    pub item: ItemId,
    /// First waypoint.
    pub start: Vector3,
    /// Last waypoint.
    pub end: Vector3,
    /// Number of waypoints to precompute.
    pub step_count: u32,
    /// Whether the program runs immediately.
    pub active: bool,
}

/// How [`Track::add`] treats existing state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AddMode {
    /// Rebuilds the path and restarts the program.
    #[default]
    Fresh,
    /// Rebinds the program to state restored from a save, keeping the path,
    /// cursor, timers, and pause state.
    Reattach,
}

/// Reasons a track cannot be attached or restored.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TrackError {
    /// The path must contain between one and the waypoint capacity points.
    #[error("step count {0} is outside 1..={}", WAYPOINT_CAPACITY)]
    InvalidStepCount(u32),
    /// A `move` or `position` instruction names a waypoint the path lacks.
    #[error("instruction at word {offset} references waypoint {waypoint} of {count}")]
    WaypointOutOfRange {
        /// Word offset of the instruction.
        offset: usize,
        /// Referenced waypoint.
        waypoint: u32,
        /// Waypoints on the path.
        count: usize,
    },
    /// A pause instruction names a slot outside the pool.
    #[error("instruction at word {offset} references track {track} beyond the pool of {}", TRACK_CAPACITY)]
    TrackOutOfRange {
        /// Word offset of the instruction.
        offset: usize,
        /// Referenced slot.
        track: TrackIndex,
    },
    /// Reattaching found restored state for a different item.
    #[error("restored track drives item {restored} but item {requested} was attached")]
    ItemMismatch {
        /// Item recorded in the save.
        restored: ItemId,
        /// Item named by the attach request.
        requested: ItemId,
    },
    /// Reattaching asked for a different path length than the save holds.
    #[error("restored track has {restored} waypoints but {requested} steps were requested")]
    StepCountMismatch {
        /// Waypoints recorded in the save.
        restored: usize,
        /// Step count named by the attach request.
        requested: u32,
    },
    /// Saved state violates track invariants.
    #[error("track snapshot is inconsistent: {0}")]
    InconsistentSnapshot(&'static str),
}

/// Reasons a single-track save stream cannot be loaded.
#[derive(Debug, Error)]
pub enum TrackLoadError {
    /// The stream could not be decoded.
    #[error("track save stream is unreadable")]
    Codec(#[from] bincode::Error),
    /// The decoded record violates track invariants.
    #[error(transparent)]
    Invalid(#[from] TrackError),
}

/// Runtime failures that halt a single track.
///
/// The faulting track pauses itself; every other track keeps running.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum TrackFault {
    /// A present track has no program bound, usually after a load that was
    /// never followed by a reattach.
    #[error("track is present but has no program")]
    MissingProgram,
    /// The cursor does not start an instruction.
    #[error("cursor {cursor} does not start an instruction")]
    CursorOutOfProgram {
        /// Offending cursor.
        cursor: usize,
    },
    /// The program executed too many instructions without suspending.
    #[error("program ran {executed} instructions without suspending")]
    RunawayProgram {
        /// Instructions executed before halting.
        executed: usize,
    },
}

/// Precomputes `step_count` evenly spaced waypoints from `start` to `end`.
///
/// The last waypoint is exactly `end`; a single waypoint path is just `end`.
#[must_use]
pub fn interpolate_waypoints(start: Vector3, end: Vector3, step_count: u32) -> Vec<Vector3> {
    let count = usize::try_from(step_count).unwrap_or(0);
    if count == 0 {
        return Vec::new();
    }

    let last = count - 1;
    (0..count)
        .map(|index| {
            if index == last {
                end
            } else {
                start.lerp(end, index as f32 / last as f32)
            }
        })
        .collect()
}

/// Mutable access to the other tracks of a pool while one track ticks.
#[derive(Debug)]
pub struct Siblings<'a> {
    current: usize,
    before: &'a mut [Track],
    after: &'a mut [Track],
}

impl<'a> Siblings<'a> {
    /// Siblings of a track that does not live in a pool.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            current: usize::MAX,
            before: &mut [],
            after: &mut [],
        }
    }

    /// Splits `pool` around the slot at `index`.
    pub fn split(pool: &'a mut [Track], index: usize) -> Option<(&'a mut Track, Self)> {
        if index >= pool.len() {
            return None;
        }
        let (before, rest) = pool.split_at_mut(index);
        let (current, after) = rest.split_first_mut()?;
        Some((
            current,
            Self {
                current: index,
                before,
                after,
            },
        ))
    }

    fn is_current(&self, index: usize) -> bool {
        index == self.current
    }

    fn get_mut(&mut self, index: usize) -> Option<&mut Track> {
        if index < self.before.len() {
            self.before.get_mut(index)
        } else {
            let offset = index.checked_sub(self.current)?.checked_sub(1)?;
            self.after.get_mut(offset)
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Suspend,
}

/// Scripted driver for a single scene item.
#[derive(Clone, Debug)]
pub struct Track {
    present: bool,
    item: ItemId,
    program: Option<Arc<Program>>,
    cursor: usize,
    waypoints: Vec<Vector3>,
    waypoint_index: usize,
    waypoint_target: Option<usize>,
    moving: bool,
    waiting: bool,
    wait_remaining_ms: i32,
    rotating: bool,
    rotation_target: i32,
    rotation_delta: i32,
    paused: bool,
    update_budget_ms: i32,
    last_tick_ms: u32,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            present: false,
            item: ItemId::new(-1),
            program: None,
            cursor: 0,
            waypoints: Vec::new(),
            waypoint_index: 0,
            waypoint_target: None,
            moving: false,
            waiting: false,
            wait_remaining_ms: 0,
            rotating: false,
            rotation_target: 0,
            rotation_delta: 0,
            paused: true,
            update_budget_ms: 0,
            last_tick_ms: 0,
        }
    }
}

impl Track {
    /// Creates an empty, paused slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the slot to its empty state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Attaches the track to an item and binds its program.
    ///
    /// [`AddMode::Reattach`] only binds the program and marks the track
    /// present; everything else keeps the values restored from a save. The
    /// setup must still name the restored item and path length.
    pub fn add(
        &mut self,
        setup: TrackSetup,
        program: Arc<Program>,
        mode: AddMode,
    ) -> Result<(), TrackError> {
        let step_count = usize::try_from(setup.step_count).unwrap_or(usize::MAX);
        if step_count == 0 || step_count > WAYPOINT_CAPACITY {
            return Err(TrackError::InvalidStepCount(setup.step_count));
        }

        match mode {
            AddMode::Fresh => {
                validate_program(&program, step_count)?;
                self.item = setup.item;
                self.waypoints = interpolate_waypoints(setup.start, setup.end, setup.step_count);
                self.cursor = 0;
                self.waypoint_index = 0;
                self.waypoint_target = None;
                self.moving = false;
                self.waiting = false;
                self.wait_remaining_ms = 0;
                self.rotating = false;
                self.rotation_target = 0;
                self.rotation_delta = 0;
                self.update_budget_ms = 0;
                self.paused = !setup.active;
            }
            AddMode::Reattach => {
                if self.item != setup.item {
                    return Err(TrackError::ItemMismatch {
                        restored: self.item,
                        requested: setup.item,
                    });
                }
                if self.waypoints.len() != step_count {
                    return Err(TrackError::StepCountMismatch {
                        restored: self.waypoints.len(),
                        requested: setup.step_count,
                    });
                }
                validate_program(&program, step_count)?;
            }
        }

        self.program = Some(program);
        self.present = true;
        Ok(())
    }

    /// Re-stamps the time of the last tick so paused intervals are not
    /// credited to the next update.
    pub fn resync_clock(&mut self, now_ms: u32) {
        self.last_tick_ms = now_ms;
    }

    /// Pauses or resumes script execution.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Advances the track by one host frame.
    ///
    /// Returns `Ok(false)` only when the slot is empty. A fault pauses the
    /// track before it is returned.
    pub fn tick<H>(
        &mut self,
        host: &mut H,
        rules: &MazeRules,
        siblings: &mut Siblings<'_>,
    ) -> Result<bool, TrackFault>
    where
        H: Host + ?Sized,
    {
        if !self.present {
            return Ok(false);
        }

        let now = host.now_ms();
        let elapsed = now.wrapping_sub(self.last_tick_ms);
        self.last_tick_ms = now;

        let Some(credited) = self.consume_budget(elapsed, host.difficulty()) else {
            return Ok(true);
        };

        if self.paused {
            return Ok(true);
        }

        if self.waiting {
            self.wait_remaining_ms = self.wait_remaining_ms.saturating_sub(credited);
            if self.wait_remaining_ms > 0 {
                return Ok(true);
            }
            self.waiting = false;
            self.wait_remaining_ms = 0;
        }

        if host.is_spinning(self.item) {
            return Ok(true);
        }

        if self.rotating {
            self.rotate_step(host);
            if self.rotating {
                return Ok(true);
            }
        }

        if self.moving {
            self.move_step(host);
            return Ok(true);
        }

        self.run_program(host, rules, siblings)?;
        Ok(true)
    }

    /// Charges `elapsed` against the update budget and returns the time
    /// credited to this update when one is due.
    ///
    /// A budget of zero means no update has been scheduled yet, so the first
    /// one lands a full quantum after the clock was synced. Afterwards each
    /// update is scheduled one quantum after the previous due time, so the
    /// update rate follows wall time whatever the frame length. Lateness of
    /// a quantum or more is dropped and at most one update runs per tick.
    fn consume_budget(&mut self, elapsed: u32, difficulty: Difficulty) -> Option<i32> {
        let quantum = update_quantum_ms(difficulty);
        if self.update_budget_ms == 0 {
            self.update_budget_ms = quantum;
        }
        let elapsed = i32::try_from(elapsed).unwrap_or(i32::MAX);
        self.update_budget_ms = self.update_budget_ms.saturating_sub(elapsed);
        if self.update_budget_ms > 0 {
            return None;
        }

        // Stays in 1..=quantum so zero keeps meaning "unscheduled".
        self.update_budget_ms = self
            .update_budget_ms
            .max(1 - quantum)
            .saturating_add(quantum);
        Some(quantum)
    }

    fn rotate_step<H: Host + ?Sized>(&mut self, host: &mut H) {
        let current = host.facing(self.item).unwrap_or(self.rotation_target);
        let mut angle = current.saturating_add(self.rotation_delta);
        if self.rotation_delta > 0 {
            if angle >= self.rotation_target {
                angle = self.rotation_target;
                self.rotating = false;
            }
        } else if self.rotation_delta < 0 {
            if angle <= self.rotation_target {
                angle = self.rotation_target;
                self.rotating = false;
            }
        } else {
            self.rotating = false;
        }
        host.set_facing(self.item, angle);
    }

    fn move_step<H: Host + ?Sized>(&mut self, host: &mut H) {
        let Some(target) = self.waypoint_target else {
            self.moving = false;
            return;
        };

        if self.waypoint_index < target {
            self.waypoint_index += 1;
        } else if self.waypoint_index > target {
            self.waypoint_index -= 1;
        }
        if self.waypoint_index == target {
            self.moving = false;
        }
        self.place_at_waypoint(host);
    }

    fn place_at_waypoint<H: Host + ?Sized>(&self, host: &mut H) {
        if let Some(position) = self.waypoints.get(self.waypoint_index) {
            host.set_position(self.item, *position);
            host.reregister_bounds(self.item);
        }
    }

    fn run_program<H: Host + ?Sized>(
        &mut self,
        host: &mut H,
        rules: &MazeRules,
        siblings: &mut Siblings<'_>,
    ) -> Result<(), TrackFault> {
        let Some(program) = self.program.clone() else {
            self.paused = true;
            return Err(TrackFault::MissingProgram);
        };

        for _ in 0..RUNAWAY_LIMIT {
            let Some((instruction, next)) = program.instruction_at(self.cursor) else {
                self.paused = true;
                return Err(TrackFault::CursorOutOfProgram {
                    cursor: self.cursor,
                });
            };
            debug!("item {} executes {instruction} at {}", self.item, self.cursor);
            self.cursor = next;

            if self.execute(instruction, host, rules, siblings) == Flow::Suspend || self.paused {
                return Ok(());
            }
        }

        self.paused = true;
        Err(TrackFault::RunawayProgram {
            executed: RUNAWAY_LIMIT,
        })
    }

    fn execute<H: Host + ?Sized>(
        &mut self,
        instruction: Instruction,
        host: &mut H,
        rules: &MazeRules,
        siblings: &mut Siblings<'_>,
    ) -> Flow {
        match instruction {
            Instruction::Activate { variable, max } => {
                if host.variable(variable) >= max {
                    self.paused = true;
                    return Flow::Suspend;
                }
            }
            Instruction::Leave => {
                if !host.is_maze_enemy(self.item) && host.is_target(self.item) {
                    host.increment_variable(rules.score_variable);
                }
            }
            Instruction::Shoot { sound, .. } => {
                if host.is_target(self.item) {
                    let reaction = &rules.shot_reaction;
                    host.play_sound(sound, reaction.shot_volume);
                    host.decrement_variable(rules.score_variable);
                    host.stop_walking();
                    let animation = if host.is_combat_mode() {
                        reaction.combat_hit
                    } else {
                        reaction.idle_hit
                    };
                    host.change_animation(animation);
                    let pain = if host.random_inclusive(0, 1) == 0 {
                        reaction.pain_sounds[0]
                    } else {
                        reaction.pain_sounds[1]
                    };
                    host.play_sound(pain, reaction.pain_volume);
                    host.jitter_cursor();
                }
                return Flow::Suspend;
            }
            Instruction::EnemyReset { item } => host.set_maze_enemy(item, false),
            Instruction::EnemySet { item } => host.set_maze_enemy(item, true),
            Instruction::FlagReset { flag } => host.set_flag(flag, false),
            Instruction::FlagSet { flag } => host.set_flag(flag, true),
            Instruction::VariableDec { variable } => host.decrement_variable(variable),
            Instruction::VariableInc { variable, max } => {
                if host.variable(variable) < max {
                    host.increment_variable(variable);
                }
            }
            Instruction::VariableReset { variable } => host.reset_variable(variable),
            Instruction::VariableSet { variable, value } => host.set_variable(variable, value),
            Instruction::TargetSet { item, value } => host.set_target(item, value != 0),
            Instruction::PausedSet { track } => self.set_track_paused(track, true, siblings),
            Instruction::PausedReset { track } => self.set_track_paused(track, false, siblings),
            Instruction::PausedReset1of2 { candidates } => {
                let chosen = pick(&candidates, host.random_inclusive(0, 1));
                self.set_track_paused(chosen, false, siblings);
            }
            Instruction::PausedReset1of3 { candidates } => {
                let chosen = pick(&candidates, host.random_inclusive(0, 2));
                self.set_track_paused(chosen, false, siblings);
            }
            Instruction::PlaySound { sound, volume } => host.play_sound(sound, volume),
            Instruction::ObstacleReset { item } => host.set_obstacle(item, false),
            Instruction::ObstacleSet { item } => host.set_obstacle(item, true),
            Instruction::WaitRandom { min_ms, max_ms } => {
                let duration = host.random_inclusive(min_ms, max_ms);
                self.begin_wait(duration);
                return Flow::Suspend;
            }
            Instruction::Wait { ms } => {
                self.begin_wait(ms);
                return Flow::Suspend;
            }
            Instruction::Rotate { target, delta } => {
                self.rotating = true;
                self.rotation_target = target;
                self.rotation_delta = delta;
                return Flow::Suspend;
            }
            Instruction::Facing { angle } => host.set_facing(self.item, angle),
            Instruction::Position { waypoint } => {
                self.moving = false;
                match self.waypoint(waypoint) {
                    Some(index) => {
                        self.waypoint_index = index;
                        self.place_at_waypoint(host);
                    }
                    None => warn!("item {} cannot jump to waypoint {waypoint}", self.item),
                }
            }
            Instruction::Move { waypoint } => {
                match self.waypoint(waypoint) {
                    Some(index) => {
                        self.waypoint_target = Some(index);
                        self.moving = true;
                    }
                    None => warn!("item {} cannot walk to waypoint {waypoint}", self.item),
                }
                return Flow::Suspend;
            }
            Instruction::Restart => self.cursor = 0,
        }
        Flow::Continue
    }

    fn begin_wait(&mut self, ms: i32) {
        self.waiting = true;
        self.wait_remaining_ms = ms.max(0);
    }

    fn waypoint(&self, waypoint: u32) -> Option<usize> {
        usize::try_from(waypoint)
            .ok()
            .filter(|index| *index < self.waypoints.len())
    }

    fn set_track_paused(&mut self, track: TrackIndex, paused: bool, siblings: &mut Siblings<'_>) {
        let index = track.as_usize();
        if siblings.is_current(index) {
            self.paused = paused;
            return;
        }
        match siblings.get_mut(index) {
            Some(sibling) => sibling.paused = paused,
            None => warn!("item {} references missing track {track}", self.item),
        }
    }

    /// Captures the persisted state of the slot.
    #[must_use]
    pub fn snapshot(&self) -> TrackSnapshot {
        TrackSnapshot {
            present: self.present,
            item: self.item,
            waypoint_count: to_u32(self.waypoints.len()),
            cursor: to_u32(self.cursor),
            waiting: self.waiting,
            moving: self.moving,
            waypoint_index: to_u32(self.waypoint_index),
            waypoint_target: self.waypoint_target.map(to_u32),
            rotating: self.rotating,
            rotation_target: self.rotation_target,
            rotation_delta: self.rotation_delta,
            paused: self.paused,
            waypoints: self.waypoints.clone(),
            update_budget_ms: self.update_budget_ms.max(0),
            wait_remaining_ms: self.wait_remaining_ms.max(0),
        }
    }

    /// Builds a slot from persisted state.
    ///
    /// The program is not part of the save; a restored present track must be
    /// reattached with [`AddMode::Reattach`] before it can run.
    pub fn from_snapshot(snapshot: &TrackSnapshot) -> Result<Self, TrackError> {
        let count = snapshot.waypoints.len();
        if count != usize::try_from(snapshot.waypoint_count).unwrap_or(usize::MAX) {
            return Err(TrackError::InconsistentSnapshot(
                "waypoint count disagrees with waypoint list",
            ));
        }
        if count > WAYPOINT_CAPACITY {
            return Err(TrackError::InconsistentSnapshot("too many waypoints"));
        }

        let waypoint_index = to_usize(snapshot.waypoint_index);
        if count > 0 && waypoint_index >= count {
            return Err(TrackError::InconsistentSnapshot("waypoint index out of range"));
        }
        let waypoint_target = snapshot.waypoint_target.map(to_usize);
        if waypoint_target.is_some_and(|target| target >= count) {
            return Err(TrackError::InconsistentSnapshot("waypoint target out of range"));
        }
        if snapshot.moving && waypoint_target.is_none() {
            return Err(TrackError::InconsistentSnapshot("moving without a target"));
        }

        debug!("restored track for item {}", snapshot.item);
        Ok(Self {
            present: snapshot.present,
            item: snapshot.item,
            program: None,
            cursor: to_usize(snapshot.cursor),
            waypoints: snapshot.waypoints.clone(),
            waypoint_index,
            waypoint_target,
            moving: snapshot.moving,
            waiting: snapshot.waiting,
            wait_remaining_ms: snapshot.wait_remaining_ms.max(0),
            rotating: snapshot.rotating,
            rotation_target: snapshot.rotation_target,
            rotation_delta: snapshot.rotation_delta,
            paused: snapshot.paused,
            update_budget_ms: snapshot.update_budget_ms.max(0),
            last_tick_ms: 0,
        })
    }

    /// Writes the persisted state of the slot to `writer`.
    pub fn save<W: Write>(&self, writer: W) -> Result<(), bincode::Error> {
        bincode::serialize_into(writer, &self.snapshot())
    }

    /// Replaces the slot with state read from `reader`.
    ///
    /// The track is left untouched when the stream is rejected.
    pub fn load<R: Read>(&mut self, reader: R) -> Result<(), TrackLoadError> {
        let snapshot: TrackSnapshot = bincode::deserialize_from(reader)?;
        *self = Self::from_snapshot(&snapshot)?;
        Ok(())
    }

    /// Whether the slot is attached to a live item.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        self.present
    }

    /// Whether script execution is suspended.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether a wait countdown is running.
    #[must_use]
    pub const fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Whether the item is walking toward a waypoint.
    #[must_use]
    pub const fn is_moving(&self) -> bool {
        self.moving
    }

    /// Whether the item is turning.
    #[must_use]
    pub const fn is_rotating(&self) -> bool {
        self.rotating
    }

    /// Item driven by the track.
    #[must_use]
    pub const fn item(&self) -> ItemId {
        self.item
    }

    /// Word offset of the next instruction.
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// Waypoint the item currently occupies.
    #[must_use]
    pub const fn waypoint_index(&self) -> usize {
        self.waypoint_index
    }

    /// Waypoint the item is walking toward.
    #[must_use]
    pub const fn waypoint_target(&self) -> Option<usize> {
        self.waypoint_target
    }

    /// Precomputed path.
    #[must_use]
    pub fn waypoints(&self) -> &[Vector3] {
        &self.waypoints
    }

    /// Milliseconds left on the wait countdown.
    #[must_use]
    pub const fn wait_remaining_ms(&self) -> i32 {
        self.wait_remaining_ms
    }

    /// Milliseconds left before the next update.
    #[must_use]
    pub const fn update_budget_ms(&self) -> i32 {
        self.update_budget_ms
    }

    /// Program bound to the track.
    #[must_use]
    pub fn program(&self) -> Option<&Program> {
        self.program.as_deref()
    }
}

fn validate_program(program: &Program, waypoint_count: usize) -> Result<(), TrackError> {
    for (offset, instruction) in program.iter() {
        if let Some(waypoint) = instruction.waypoint_operand() {
            if to_usize(waypoint) >= waypoint_count {
                return Err(TrackError::WaypointOutOfRange {
                    offset,
                    waypoint,
                    count: waypoint_count,
                });
            }
        }
        if let Some(track) = instruction
            .track_operands()
            .iter()
            .find(|track| track.as_usize() >= TRACK_CAPACITY)
        {
            return Err(TrackError::TrackOutOfRange {
                offset,
                track: *track,
            });
        }
    }
    Ok(())
}

fn pick<const N: usize>(candidates: &[TrackIndex; N], draw: i32) -> TrackIndex {
    let index = usize::try_from(draw).unwrap_or(0).min(N - 1);
    candidates[index]
}

fn to_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

fn to_usize(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}
