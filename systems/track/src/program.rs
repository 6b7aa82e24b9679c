//! Decoding of authored target track programs.
//!
//! Programs are authored as flat streams of signed words: a negative opcode
//! tag followed by a fixed number of operands. The stream is decoded once into
//! [`Instruction`] values; each decoded instruction remembers the word offset
//! it started at so the track cursor keeps its authored meaning.

use std::fmt;

use police_maze_core::{FlagId, ItemId, SoundId, TrackIndex, VariableId};
use thiserror::Error;

const ACTIVATE: i32 = -26;
const LEAVE: i32 = -25;
const SHOOT: i32 = -24;
const ENEMY_RESET: i32 = -23;
const ENEMY_SET: i32 = -22;
const FLAG_RESET: i32 = -21;
const FLAG_SET: i32 = -20;
const VARIABLE_DEC: i32 = -19;
const VARIABLE_INC: i32 = -18;
const VARIABLE_RESET: i32 = -17;
const VARIABLE_SET: i32 = -16;
const TARGET_SET: i32 = -15;
const PAUSED_RESET_1OF3: i32 = -14;
const PAUSED_RESET_1OF2: i32 = -13;
const PAUSED_SET: i32 = -12;
const PAUSED_RESET: i32 = -11;
const PLAY_SOUND: i32 = -10;
const OBSTACLE_RESET: i32 = -9;
const OBSTACLE_SET: i32 = -8;
const WAIT_RANDOM: i32 = -7;
const ROTATE: i32 = -6;
const FACING: i32 = -5;
const RESTART: i32 = -4;
const WAIT: i32 = -3;
const MOVE: i32 = -2;
const POSITION: i32 = -1;

/// Single decoded track instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// Pauses the track once `variable` has reached `max`.
    Activate {
        /// Variable counting appearances.
        variable: VariableId,
        /// Value at which the track stops.
        max: i32,
    },
    /// Credits the score when an innocent target walks away.
    Leave,
    /// Fires at the player when the item is still a target.
    Shoot {
        /// Gunshot sound.
        sound: SoundId,
        /// Authored operand with no effect.
        reserved: i32,
    },
    /// Clears the maze enemy flag of an item.
    EnemyReset {
        /// Affected item.
        item: ItemId,
    },
    /// Sets the maze enemy flag of an item.
    EnemySet {
        /// Affected item.
        item: ItemId,
    },
    /// Clears a game flag.
    FlagReset {
        /// Affected flag.
        flag: FlagId,
    },
    /// Sets a game flag.
    FlagSet {
        /// Affected flag.
        flag: FlagId,
    },
    /// Decrements a variable.
    VariableDec {
        /// Affected variable.
        variable: VariableId,
    },
    /// Increments a variable while it is below `max`.
    VariableInc {
        /// Affected variable.
        variable: VariableId,
        /// Exclusive ceiling for the increment.
        max: i32,
    },
    /// Zeroes a variable.
    VariableReset {
        /// Affected variable.
        variable: VariableId,
    },
    /// Overwrites a variable.
    VariableSet {
        /// Affected variable.
        variable: VariableId,
        /// New value.
        value: i32,
    },
    /// Sets whether an item can be shot; any non-zero value enables it.
    TargetSet {
        /// Affected item.
        item: ItemId,
        /// Raw authored value.
        value: i32,
    },
    /// Unpauses one of three tracks chosen at random.
    PausedReset1of3 {
        /// Candidate tracks.
        candidates: [TrackIndex; 3],
    },
    /// Unpauses one of two tracks chosen at random.
    PausedReset1of2 {
        /// Candidate tracks.
        candidates: [TrackIndex; 2],
    },
    /// Pauses a track.
    PausedSet {
        /// Affected track.
        track: TrackIndex,
    },
    /// Unpauses a track.
    PausedReset {
        /// Affected track.
        track: TrackIndex,
    },
    /// Plays a sound effect.
    PlaySound {
        /// Sound to play.
        sound: SoundId,
        /// Playback volume.
        volume: i32,
    },
    /// Clears the obstacle flag of an item.
    ObstacleReset {
        /// Affected item.
        item: ItemId,
    },
    /// Sets the obstacle flag of an item.
    ObstacleSet {
        /// Affected item.
        item: ItemId,
    },
    /// Waits for a random duration.
    WaitRandom {
        /// Shortest wait in milliseconds.
        min_ms: i32,
        /// Longest wait in milliseconds.
        max_ms: i32,
    },
    /// Turns toward `target` by `delta` per update.
    Rotate {
        /// Final facing angle.
        target: i32,
        /// Facing change per update.
        delta: i32,
    },
    /// Sets the facing angle immediately.
    Facing {
        /// New facing angle.
        angle: i32,
    },
    /// Jumps back to the first instruction.
    Restart,
    /// Waits for a fixed duration.
    Wait {
        /// Wait in milliseconds.
        ms: i32,
    },
    /// Walks toward a waypoint, one waypoint per update.
    Move {
        /// Destination waypoint.
        waypoint: u32,
    },
    /// Teleports to a waypoint.
    Position {
        /// Destination waypoint.
        waypoint: u32,
    },
}

impl Instruction {
    /// Opcode tag used in authored streams.
    #[must_use]
    pub const fn opcode(&self) -> i32 {
        match self {
            Self::Activate { .. } => ACTIVATE,
            Self::Leave => LEAVE,
            Self::Shoot { .. } => SHOOT,
            Self::EnemyReset { .. } => ENEMY_RESET,
            Self::EnemySet { .. } => ENEMY_SET,
            Self::FlagReset { .. } => FLAG_RESET,
            Self::FlagSet { .. } => FLAG_SET,
            Self::VariableDec { .. } => VARIABLE_DEC,
            Self::VariableInc { .. } => VARIABLE_INC,
            Self::VariableReset { .. } => VARIABLE_RESET,
            Self::VariableSet { .. } => VARIABLE_SET,
            Self::TargetSet { .. } => TARGET_SET,
            Self::PausedReset1of3 { .. } => PAUSED_RESET_1OF3,
            Self::PausedReset1of2 { .. } => PAUSED_RESET_1OF2,
            Self::PausedSet { .. } => PAUSED_SET,
            Self::PausedReset { .. } => PAUSED_RESET,
            Self::PlaySound { .. } => PLAY_SOUND,
            Self::ObstacleReset { .. } => OBSTACLE_RESET,
            Self::ObstacleSet { .. } => OBSTACLE_SET,
            Self::WaitRandom { .. } => WAIT_RANDOM,
            Self::Rotate { .. } => ROTATE,
            Self::Facing { .. } => FACING,
            Self::Restart => RESTART,
            Self::Wait { .. } => WAIT,
            Self::Move { .. } => MOVE,
            Self::Position { .. } => POSITION,
        }
    }

    /// Mnemonic used in listings.
    #[must_use]
    pub const fn mnemonic(&self) -> &'static str {
        match self {
            Self::Activate { .. } => "activate",
            Self::Leave => "leave",
            Self::Shoot { .. } => "shoot",
            Self::EnemyReset { .. } => "enemy_reset",
            Self::EnemySet { .. } => "enemy_set",
            Self::FlagReset { .. } => "flag_reset",
            Self::FlagSet { .. } => "flag_set",
            Self::VariableDec { .. } => "variable_dec",
            Self::VariableInc { .. } => "variable_inc",
            Self::VariableReset { .. } => "variable_reset",
            Self::VariableSet { .. } => "variable_set",
            Self::TargetSet { .. } => "target_set",
            Self::PausedReset1of3 { .. } => "paused_reset_1of3",
            Self::PausedReset1of2 { .. } => "paused_reset_1of2",
            Self::PausedSet { .. } => "paused_set",
            Self::PausedReset { .. } => "paused_reset",
            Self::PlaySound { .. } => "play_sound",
            Self::ObstacleReset { .. } => "obstacle_reset",
            Self::ObstacleSet { .. } => "obstacle_set",
            Self::WaitRandom { .. } => "wait_random",
            Self::Rotate { .. } => "rotate",
            Self::Facing { .. } => "facing",
            Self::Restart => "restart",
            Self::Wait { .. } => "wait",
            Self::Move { .. } => "move",
            Self::Position { .. } => "position",
        }
    }

    /// Appends the operands in authored order.
    fn push_operands(&self, out: &mut Vec<i32>) {
        match *self {
            Self::Leave | Self::Restart => {}
            Self::Activate { variable, max } | Self::VariableInc { variable, max } => {
                out.extend([variable.get(), max]);
            }
            Self::Shoot { sound, reserved } => out.extend([sound.get(), reserved]),
            Self::EnemyReset { item }
            | Self::EnemySet { item }
            | Self::ObstacleReset { item }
            | Self::ObstacleSet { item } => out.push(item.get()),
            Self::FlagReset { flag } | Self::FlagSet { flag } => out.push(flag.get()),
            Self::VariableDec { variable } | Self::VariableReset { variable } => {
                out.push(variable.get());
            }
            Self::VariableSet { variable, value } => out.extend([variable.get(), value]),
            Self::TargetSet { item, value } => out.extend([item.get(), value]),
            Self::PausedReset1of3 { candidates } => {
                out.extend(candidates.iter().map(|track| track_word(*track)));
            }
            Self::PausedReset1of2 { candidates } => {
                out.extend(candidates.iter().map(|track| track_word(*track)));
            }
            Self::PausedSet { track } | Self::PausedReset { track } => out.push(track_word(track)),
            Self::PlaySound { sound, volume } => out.extend([sound.get(), volume]),
            Self::WaitRandom { min_ms, max_ms } => out.extend([min_ms, max_ms]),
            Self::Rotate { target, delta } => out.extend([target, delta]),
            Self::Facing { angle } => out.push(angle),
            Self::Wait { ms } => out.push(ms),
            Self::Move { waypoint } | Self::Position { waypoint } => {
                out.push(i32::try_from(waypoint).unwrap_or(i32::MAX));
            }
        }
    }

    /// Waypoint operand of `Move` and `Position`.
    #[must_use]
    pub const fn waypoint_operand(&self) -> Option<u32> {
        match *self {
            Self::Move { waypoint } | Self::Position { waypoint } => Some(waypoint),
            _ => None,
        }
    }

    /// Sibling tracks referenced by the pause instructions.
    #[must_use]
    pub fn track_operands(&self) -> &[TrackIndex] {
        match self {
            Self::PausedSet { track } | Self::PausedReset { track } => std::slice::from_ref(track),
            Self::PausedReset1of2 { candidates } => candidates,
            Self::PausedReset1of3 { candidates } => candidates,
            _ => &[],
        }
    }

    fn decode(opcode: i32, operands: &[i32], offset: usize) -> Result<Self, ProgramError> {
        let word = |index: usize| operands[index];
        let track = |index: usize| track_operand(operands[index], offset);
        let waypoint = |index: usize| waypoint_operand(operands[index], offset);

        let instruction = match opcode {
            ACTIVATE => Self::Activate {
                variable: VariableId::new(word(0)),
                max: word(1),
            },
            LEAVE => Self::Leave,
            SHOOT => Self::Shoot {
                sound: SoundId::new(word(0)),
                reserved: word(1),
            },
            ENEMY_RESET => Self::EnemyReset {
                item: ItemId::new(word(0)),
            },
            ENEMY_SET => Self::EnemySet {
                item: ItemId::new(word(0)),
            },
            FLAG_RESET => Self::FlagReset {
                flag: FlagId::new(word(0)),
            },
            FLAG_SET => Self::FlagSet {
                flag: FlagId::new(word(0)),
            },
            VARIABLE_DEC => Self::VariableDec {
                variable: VariableId::new(word(0)),
            },
            VARIABLE_INC => Self::VariableInc {
                variable: VariableId::new(word(0)),
                max: word(1),
            },
            VARIABLE_RESET => Self::VariableReset {
                variable: VariableId::new(word(0)),
            },
            VARIABLE_SET => Self::VariableSet {
                variable: VariableId::new(word(0)),
                value: word(1),
            },
            TARGET_SET => Self::TargetSet {
                item: ItemId::new(word(0)),
                value: word(1),
            },
            PAUSED_RESET_1OF3 => Self::PausedReset1of3 {
                candidates: [track(0)?, track(1)?, track(2)?],
            },
            PAUSED_RESET_1OF2 => Self::PausedReset1of2 {
                candidates: [track(0)?, track(1)?],
            },
            PAUSED_SET => Self::PausedSet { track: track(0)? },
            PAUSED_RESET => Self::PausedReset { track: track(0)? },
            PLAY_SOUND => Self::PlaySound {
                sound: SoundId::new(word(0)),
                volume: word(1),
            },
            OBSTACLE_RESET => Self::ObstacleReset {
                item: ItemId::new(word(0)),
            },
            OBSTACLE_SET => Self::ObstacleSet {
                item: ItemId::new(word(0)),
            },
            WAIT_RANDOM => Self::WaitRandom {
                min_ms: word(0),
                max_ms: word(1),
            },
            ROTATE => Self::Rotate {
                target: word(0),
                delta: word(1),
            },
            FACING => Self::Facing { angle: word(0) },
            RESTART => Self::Restart,
            WAIT => Self::Wait { ms: word(0) },
            MOVE => Self::Move {
                waypoint: waypoint(0)?,
            },
            POSITION => Self::Position {
                waypoint: waypoint(0)?,
            },
            value => return Err(ProgramError::UnknownOpcode { offset, value }),
        };
        Ok(instruction)
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())?;
        let mut operands = Vec::new();
        self.push_operands(&mut operands);
        for operand in operands {
            write!(f, " {operand}")?;
        }
        Ok(())
    }
}

/// Number of operand words that follow the opcode, or `None` for unknown tags.
#[must_use]
pub const fn operand_count(opcode: i32) -> Option<usize> {
    let count = match opcode {
        LEAVE | RESTART => 0,
        ENEMY_RESET | ENEMY_SET | FLAG_RESET | FLAG_SET | VARIABLE_DEC | VARIABLE_RESET
        | PAUSED_SET | PAUSED_RESET | OBSTACLE_RESET | OBSTACLE_SET | FACING | WAIT | MOVE
        | POSITION => 1,
        ACTIVATE | SHOOT | VARIABLE_INC | VARIABLE_SET | TARGET_SET | PAUSED_RESET_1OF2
        | PLAY_SOUND | WAIT_RANDOM | ROTATE => 2,
        PAUSED_RESET_1OF3 => 3,
        _ => return None,
    };
    Some(count)
}

fn track_operand(value: i32, offset: usize) -> Result<TrackIndex, ProgramError> {
    u32::try_from(value)
        .map(TrackIndex::new)
        .map_err(|_| ProgramError::NegativeOperand { offset, value })
}

fn waypoint_operand(value: i32, offset: usize) -> Result<u32, ProgramError> {
    u32::try_from(value).map_err(|_| ProgramError::NegativeOperand { offset, value })
}

fn track_word(track: TrackIndex) -> i32 {
    i32::try_from(track.get()).unwrap_or(i32::MAX)
}

/// Reasons an authored stream fails to decode.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ProgramError {
    /// The stream contains no words.
    #[error("program is empty")]
    Empty,
    /// A word in opcode position is not a known tag.
    #[error("unknown opcode {value} at word {offset}")]
    UnknownOpcode {
        /// Word offset of the tag.
        offset: usize,
        /// Offending tag.
        value: i32,
    },
    /// The stream ends before all operands of an instruction.
    #[error("opcode {opcode} at word {offset} expects {expected} operands but {available} remain")]
    Truncated {
        /// Word offset of the tag.
        offset: usize,
        /// Tag of the truncated instruction.
        opcode: i32,
        /// Operands the tag requires.
        expected: usize,
        /// Operands left in the stream.
        available: usize,
    },
    /// A waypoint or track operand is negative.
    #[error("instruction at word {offset} has negative index operand {value}")]
    NegativeOperand {
        /// Word offset of the tag.
        offset: usize,
        /// Offending operand.
        value: i32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    offset: usize,
    instruction: Instruction,
}

/// Decoded, read-only track program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Program {
    entries: Vec<Entry>,
    word_count: usize,
}

impl Program {
    /// Decodes a flat authored stream.
    pub fn decode(words: &[i32]) -> Result<Self, ProgramError> {
        if words.is_empty() {
            return Err(ProgramError::Empty);
        }

        let mut entries = Vec::new();
        let mut offset = 0;
        while offset < words.len() {
            let opcode = words[offset];
            let expected = operand_count(opcode).ok_or(ProgramError::UnknownOpcode {
                offset,
                value: opcode,
            })?;
            let available = words.len() - offset - 1;
            if available < expected {
                return Err(ProgramError::Truncated {
                    offset,
                    opcode,
                    expected,
                    available,
                });
            }

            let operands = &words[offset + 1..offset + 1 + expected];
            let instruction = Instruction::decode(opcode, operands, offset)?;
            entries.push(Entry {
                offset,
                instruction,
            });
            offset += 1 + expected;
        }

        Ok(Self {
            entries,
            word_count: words.len(),
        })
    }

    /// Builds a program from already decoded instructions.
    #[must_use]
    pub fn from_instructions(instructions: &[Instruction]) -> Self {
        let mut entries = Vec::with_capacity(instructions.len());
        let mut offset = 0;
        for instruction in instructions {
            entries.push(Entry {
                offset,
                instruction: *instruction,
            });
            offset += 1 + operand_count(instruction.opcode()).unwrap_or(0);
        }
        Self {
            entries,
            word_count: offset,
        }
    }

    /// Re-encodes the program into its flat authored form.
    #[must_use]
    pub fn encode(&self) -> Vec<i32> {
        let mut words = Vec::with_capacity(self.word_count);
        for entry in &self.entries {
            words.push(entry.instruction.opcode());
            entry.instruction.push_operands(&mut words);
        }
        words
    }

    /// Instruction starting exactly at `offset` and the offset that follows it.
    ///
    /// Returns `None` when `offset` is past the end of the program or points
    /// into the operands of another instruction.
    #[must_use]
    pub fn instruction_at(&self, offset: usize) -> Option<(Instruction, usize)> {
        let index = self
            .entries
            .binary_search_by_key(&offset, |entry| entry.offset)
            .ok()?;
        let entry = self.entries[index];
        let next = self
            .entries
            .get(index + 1)
            .map_or(self.word_count, |next| next.offset);
        Some((entry.instruction, next))
    }

    /// Iterates over `(offset, instruction)` pairs in program order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Instruction)> + '_ {
        self.entries
            .iter()
            .map(|entry| (entry.offset, &entry.instruction))
    }

    /// Number of decoded instructions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the program holds no instructions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of words in the authored stream.
    #[must_use]
    pub fn word_count(&self) -> usize {
        self.word_count
    }
}
