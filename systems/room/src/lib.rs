#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Controller for a police maze room.
//!
//! A [`Room`] owns a fixed pool of [`Track`] slots, advances them strictly in
//! slot order once per host frame, and watches for the moment every slot is
//! paused. The first such frame while the player is inside the maze completes
//! the room and plays a one-shot voice-over.

use std::{
    io::{Read, Write},
    sync::Arc,
};

use log::{debug, error, info};
use police_maze_core::{
    Clock, Host, MazeRules, RoomSnapshot, ScalarStore, TrackIndex, TRACK_CAPACITY,
};
use police_maze_system_track::{AddMode, Program, Siblings, Track, TrackError, TrackFault, TrackSetup};
use thiserror::Error;

/// Errors reported by room management and persistence.
#[derive(Debug, Error)]
pub enum RoomError {
    /// The slot index lies outside the pool.
    #[error("track slot {0} is outside the pool of {}", TRACK_CAPACITY)]
    SlotOutOfRange(TrackIndex),
    /// A track rejected its setup or saved state.
    #[error("track slot {index} rejected its state")]
    Track {
        /// Slot that failed.
        index: TrackIndex,
        /// Underlying track error.
        #[source]
        source: TrackError,
    },
    /// A save holds the wrong number of slots.
    #[error("save holds {found} track slots but the pool has {}", TRACK_CAPACITY)]
    SlotCount {
        /// Slots found in the save.
        found: usize,
    },
    /// The save stream could not be encoded or decoded.
    #[error("room save stream is unreadable")]
    Codec(#[from] bincode::Error),
}

/// Score overlay counters recorded when debugging is enabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DebugOverlay {
    /// Shared score after the tick.
    pub score: i32,
    /// Present slots that are not paused.
    pub live_tracks: usize,
}

/// Outcome of [`Room::tick`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoomTick {
    /// The room is paused.
    Paused,
    /// The host is in another set.
    OutOfScene,
    /// The room was completed earlier and stays inert until reactivated.
    Ended,
    /// Every slot was advanced.
    Advanced(TickReport),
}

/// Details of a frame in which the tracks were advanced.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Every slot reported paused after the tick.
    pub drained: bool,
    /// The room completed during this tick.
    pub completed: bool,
    /// Slots that faulted during this tick.
    pub faults: Vec<(TrackIndex, TrackFault)>,
}

/// Police maze room controller.
#[derive(Debug)]
pub struct Room {
    rules: MazeRules,
    tracks: Vec<Track>,
    paused: bool,
    active: bool,
    ending: bool,
    overlay: Option<DebugOverlay>,
}

impl Room {
    /// Creates a room with every slot empty.
    #[must_use]
    pub fn new(rules: MazeRules) -> Self {
        Self {
            rules,
            tracks: (0..TRACK_CAPACITY).map(|_| Track::new()).collect(),
            paused: false,
            active: false,
            ending: false,
            overlay: None,
        }
    }

    /// Marks the player as inside the maze.
    pub fn activate(&mut self) {
        info!("police maze activated");
        self.active = true;
        self.ending = false;
    }

    /// Freezes or resumes the room and re-stamps every track's clock.
    pub fn set_pause_state<C: Clock + ?Sized>(&mut self, paused: bool, clock: &C) {
        self.paused = paused;
        let now = clock.now_ms();
        for track in &mut self.tracks {
            track.resync_clock(now);
        }
    }

    /// Empties every slot and clears the room flags.
    pub fn reset(&mut self) {
        for track in &mut self.tracks {
            track.reset();
        }
        self.paused = false;
        self.active = false;
        self.ending = false;
        self.overlay = None;
    }

    /// Attaches a track to the slot at `index`.
    pub fn add_track(
        &mut self,
        index: TrackIndex,
        setup: TrackSetup,
        program: Arc<Program>,
        mode: AddMode,
    ) -> Result<(), RoomError> {
        let track = self
            .tracks
            .get_mut(index.as_usize())
            .ok_or(RoomError::SlotOutOfRange(index))?;
        track
            .add(setup, program, mode)
            .map_err(|source| RoomError::Track { index, source })
    }

    /// Advances the room by one host frame.
    pub fn tick<H: Host + ?Sized>(&mut self, host: &mut H) -> RoomTick {
        if self.paused {
            return RoomTick::Paused;
        }
        if host.current_set() != self.rules.maze_set {
            return RoomTick::OutOfScene;
        }
        if self.ending {
            self.active = false;
            return RoomTick::Ended;
        }

        let mut report = TickReport::default();
        for index in 0..self.tracks.len() {
            let Some((track, mut siblings)) = Siblings::split(&mut self.tracks, index) else {
                continue;
            };
            if let Err(fault) = track.tick(host, &self.rules, &mut siblings) {
                let slot = TrackIndex::new(u32::try_from(index).unwrap_or(u32::MAX));
                error!("track {slot} driving item {} halted: {fault}", track.item());
                report.faults.push((slot, fault));
            }
        }

        report.drained = self.tracks.iter().all(Track::is_paused);
        if report.drained && self.active && !self.ending {
            self.active = false;
            self.ending = true;
            report.completed = true;
            let cue = self.rules.completion_cue(host.current_scene());
            info!("police maze completed, playing voice-over {cue}");
            host.play_voice_over(cue);
        }

        if self.rules.debug_overlay {
            let overlay = DebugOverlay {
                score: host.variable(self.rules.score_variable),
                live_tracks: self
                    .tracks
                    .iter()
                    .filter(|track| track.is_present() && !track.is_paused())
                    .count(),
            };
            debug!(
                "score {} with {} live tracks",
                overlay.score, overlay.live_tracks
            );
            self.overlay = Some(overlay);
        }

        RoomTick::Advanced(report)
    }

    /// Current score held by the host.
    #[must_use]
    pub fn score<S: ScalarStore + ?Sized>(&self, scalars: &S) -> i32 {
        scalars.variable(self.rules.score_variable)
    }

    /// Captures the persisted state of the room.
    #[must_use]
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            paused: self.paused,
            active: self.active,
            ending: self.ending,
            tracks: self.tracks.iter().map(Track::snapshot).collect(),
        }
    }

    /// Replaces the room state with a snapshot.
    ///
    /// Nothing changes when the snapshot is rejected. Restored present slots
    /// need [`AddMode::Reattach`] before they run again, and their clocks
    /// start at zero until [`Room::set_pause_state`] resyncs them.
    pub fn restore(&mut self, snapshot: &RoomSnapshot) -> Result<(), RoomError> {
        if snapshot.tracks.len() != TRACK_CAPACITY {
            return Err(RoomError::SlotCount {
                found: snapshot.tracks.len(),
            });
        }

        let tracks = snapshot
            .tracks
            .iter()
            .enumerate()
            .map(|(index, track)| {
                Track::from_snapshot(track).map_err(|source| RoomError::Track {
                    index: TrackIndex::new(u32::try_from(index).unwrap_or(u32::MAX)),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.tracks = tracks;
        self.paused = snapshot.paused;
        self.active = snapshot.active;
        self.ending = snapshot.ending;
        self.overlay = None;
        Ok(())
    }

    /// Writes the room state to `writer`.
    pub fn save<W: Write>(&self, writer: W) -> Result<(), RoomError> {
        bincode::serialize_into(writer, &self.snapshot())?;
        Ok(())
    }

    /// Decodes a save without touching any room.
    pub fn read_snapshot<R: Read>(reader: R) -> Result<RoomSnapshot, RoomError> {
        Ok(bincode::deserialize_from(reader)?)
    }

    /// Reads the room state from `reader` and resyncs every track clock to
    /// `clock`, so the first tick after a load is charged only for the time
    /// since the load.
    pub fn load<R, C>(&mut self, reader: R, clock: &C) -> Result<(), RoomError>
    where
        R: Read,
        C: Clock + ?Sized,
    {
        let snapshot = Self::read_snapshot(reader)?;
        self.restore(&snapshot)?;
        let now = clock.now_ms();
        for track in &mut self.tracks {
            track.resync_clock(now);
        }
        Ok(())
    }

    /// Rules shared with the tracks.
    #[must_use]
    pub fn rules(&self) -> &MazeRules {
        &self.rules
    }

    /// Track in the slot at `index`.
    #[must_use]
    pub fn track(&self, index: TrackIndex) -> Option<&Track> {
        self.tracks.get(index.as_usize())
    }

    /// Every slot in pool order.
    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Whether the room ignores ticks.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Whether the player is inside the maze.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the maze has been completed.
    #[must_use]
    pub const fn is_ending(&self) -> bool {
        self.ending
    }

    /// Overlay counters from the last advanced tick.
    #[must_use]
    pub const fn debug_overlay(&self) -> Option<DebugOverlay> {
        self.overlay
    }
}

impl Default for Room {
    fn default() -> Self {
        Self::new(MazeRules::default())
    }
}
