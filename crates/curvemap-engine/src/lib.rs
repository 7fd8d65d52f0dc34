mod context;
pub mod midi;
pub mod processor;
pub mod state;

pub use context::{
    ActiveCurveMapperCtx, CurveMapperCtx, EngineConfig, PublishError, UpdateStatus,
};
pub use midi::{MidiDestination, MidiEvent, MidiRouting, MidiSource, TimedMidiEvent};
pub use processor::{CurveProcessor, CurveProcessorStatus, MappedEvents};
pub use state::{PluginState, UiState};
