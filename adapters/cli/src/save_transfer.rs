#![allow(clippy::missing_errors_doc)]

use std::{error::Error, fmt};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use police_maze_core::{Clock, RoomSnapshot};
use police_maze_system_room::{Room, RoomError};

const SAVE_DOMAIN: &str = "maze-save";
const SAVE_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded save payload.
pub(crate) const SAVE_HEADER: &str = "maze-save:v1";
/// Delimiter used to separate the prefix, version and payload.
const FIELD_DELIMITER: char = ':';

/// Room save wrapped for transfer as a single line of text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct SaveTransfer {
    payload: Vec<u8>,
}

impl SaveTransfer {
    /// Captures the current state of `room`.
    pub(crate) fn capture(room: &Room) -> Result<Self, RoomError> {
        let mut payload = Vec::new();
        room.save(&mut payload)?;
        Ok(Self { payload })
    }

    /// Replaces the state of `room` with the captured save, resyncing its
    /// track clocks to `clock`.
    pub(crate) fn restore_into<C: Clock + ?Sized>(
        &self,
        room: &mut Room,
        clock: &C,
    ) -> Result<(), RoomError> {
        room.load(self.payload.as_slice(), clock)
    }

    /// Decodes the captured save without restoring it.
    pub(crate) fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        Room::read_snapshot(self.payload.as_slice())
    }

    /// Encodes the save into a single-line string.
    #[must_use]
    pub(crate) fn encode(&self) -> String {
        let encoded = STANDARD_NO_PAD.encode(&self.payload);
        format!("{SAVE_HEADER}:{encoded}")
    }

    /// Decodes a save from its transfer string.
    pub(crate) fn decode(value: &str) -> Result<Self, SaveTransferError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(SaveTransferError::EmptyPayload);
        }

        let mut parts = trimmed.split(FIELD_DELIMITER);
        let domain = parts.next().ok_or(SaveTransferError::MissingPrefix)?;
        let version = parts.next().ok_or(SaveTransferError::MissingVersion)?;
        let payload = parts.next().ok_or(SaveTransferError::MissingPayload)?;

        if domain != SAVE_DOMAIN {
            return Err(SaveTransferError::InvalidPrefix(domain.to_owned()));
        }
        if version != SAVE_VERSION {
            return Err(SaveTransferError::UnsupportedVersion(version.to_owned()));
        }

        let payload = STANDARD_NO_PAD
            .decode(payload.as_bytes())
            .map_err(SaveTransferError::InvalidEncoding)?;
        Ok(Self { payload })
    }
}

/// Errors that can occur while decoding save transfer strings.
#[derive(Debug)]
pub(crate) enum SaveTransferError {
    /// The provided string was empty or contained only whitespace.
    EmptyPayload,
    /// The prefix segment was missing.
    MissingPrefix,
    /// The version segment was missing.
    MissingVersion,
    /// The payload segment was missing.
    MissingPayload,
    /// The string used an unexpected prefix segment.
    InvalidPrefix(String),
    /// The string used an unsupported version identifier.
    UnsupportedVersion(String),
    /// The base64 payload could not be decoded.
    InvalidEncoding(base64::DecodeError),
}

impl fmt::Display for SaveTransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPayload => write!(f, "save string was empty"),
            Self::MissingPrefix => write!(f, "save string is missing the prefix"),
            Self::MissingVersion => write!(f, "save string is missing the version"),
            Self::MissingPayload => write!(f, "save string is missing the payload"),
            Self::InvalidPrefix(prefix) => write!(f, "save prefix '{prefix}' is not supported"),
            Self::UnsupportedVersion(version) => {
                write!(f, "save version '{version}' is not supported")
            }
            Self::InvalidEncoding(error) => write!(f, "could not decode save payload: {error}"),
        }
    }
}

impl Error for SaveTransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEncoding(error) => Some(error),
            _ => None,
        }
    }
}
