use serde::{Deserialize, Serialize};

/// The subset of MIDI channel messages the mapper understands.
///
/// Channels are zero-based (`0..=15`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    /// A 14-bit pitch bend value in `0..=16383`, centered at `8192`.
    PitchBend { channel: u8, value: u16 },
    /// Any other message. It is always passed through untouched.
    Other([u8; 3]),
}

impl MidiEvent {
    pub fn channel(&self) -> Option<u8> {
        match *self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::PitchBend { channel, .. } => Some(channel),
            Self::Other(_) => None,
        }
    }

    /// Parse a raw 3-byte channel message.
    pub fn from_bytes(bytes: [u8; 3]) -> Self {
        let channel = bytes[0] & 0x0F;
        let data1 = bytes[1] & 0x7F;
        let data2 = bytes[2] & 0x7F;

        match bytes[0] & 0xF0 {
            0x80 => Self::NoteOff {
                channel,
                note: data1,
                velocity: data2,
            },
            0x90 => Self::NoteOn {
                channel,
                note: data1,
                velocity: data2,
            },
            0xB0 => Self::ControlChange {
                channel,
                controller: data1,
                value: data2,
            },
            0xE0 => Self::PitchBend {
                channel,
                value: ((data2 as u16) << 7) | data1 as u16,
            },
            _ => Self::Other(bytes),
        }
    }

    pub fn to_bytes(&self) -> [u8; 3] {
        match *self {
            Self::NoteOff {
                channel,
                note,
                velocity,
            } => [0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            Self::NoteOn {
                channel,
                note,
                velocity,
            } => [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F],
            Self::ControlChange {
                channel,
                controller,
                value,
            } => [0xB0 | (channel & 0x0F), controller & 0x7F, value & 0x7F],
            Self::PitchBend { channel, value } => [
                0xE0 | (channel & 0x0F),
                (value & 0x7F) as u8,
                ((value >> 7) & 0x7F) as u8,
            ],
            Self::Other(bytes) => bytes,
        }
    }
}

/// A [`MidiEvent`] with its frame offset inside the current processing block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedMidiEvent {
    pub frame: u32,
    pub event: MidiEvent,
}

/// Which incoming value gets remapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MidiSource {
    /// The value of a control change message with this controller number.
    Controller(u8),
    /// The velocity of note-on messages.
    Velocity,
    /// The position of the pitch wheel.
    PitchBend,
}

/// What the remapped value is sent as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MidiDestination {
    /// A control change message with this controller number.
    Controller(u8),
    /// A pitch bend message.
    PitchBend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiRouting {
    pub source: MidiSource,
    pub destination: MidiDestination,
}

impl Default for MidiRouting {
    fn default() -> Self {
        Self {
            source: MidiSource::Controller(0),
            destination: MidiDestination::Controller(0),
        }
    }
}
