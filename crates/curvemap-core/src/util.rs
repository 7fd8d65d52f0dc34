//! General conversion functions for MIDI values.

/// The number of discrete pitch bend positions (14 bits).
pub const PITCH_BEND_STEPS: u32 = 1 << 14;

/// The largest value a pitch bend message can carry.
pub const PITCH_BEND_MAX: u16 = (PITCH_BEND_STEPS - 1) as u16;

/// The largest value a 7-bit MIDI data byte can carry.
pub const MIDI_7BIT_MAX: u8 = 127;

/// Returns the 7-bit MIDI value for the given mapped value.
///
/// The fractional part is discarded and the result is limited to
/// `0..=127`. NaN maps to `0`.
#[inline]
pub fn to_midi_7bit(value: f32) -> u8 {
    if !(value > 0.0) {
        return 0;
    }

    value.min(MIDI_7BIT_MAX as f32) as u8
}

/// Returns the pitch bend position in `[0.0, 1.0)` for a 14-bit value.
#[inline]
pub fn pitch_bend_to_unit(value: u16) -> f32 {
    value.min(PITCH_BEND_MAX) as f32 / PITCH_BEND_STEPS as f32
}

/// Returns the 14-bit pitch bend value for a position in `[0.0, 1.0]`.
///
/// The result is limited to `0..=16383`. NaN maps to `0`.
#[inline]
pub fn unit_to_pitch_bend(unit: f32) -> u16 {
    let raw = unit * PITCH_BEND_STEPS as f32;
    if !(raw > 0.0) {
        return 0;
    }

    raw.min(PITCH_BEND_MAX as f32) as u16
}
