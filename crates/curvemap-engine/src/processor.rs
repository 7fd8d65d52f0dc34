use std::sync::{atomic::Ordering, Arc};

use arrayvec::ArrayVec;
use atomic_float::AtomicF32;

use curvemap_core::{util, CurveSnapshot};

use crate::midi::{MidiDestination, MidiEvent, MidiRouting, MidiSource, TimedMidiEvent};

/// The most events a single input event can turn into: the original note-on
/// plus the mapped value when remapping velocity.
pub const MAX_EVENTS_PER_INPUT: usize = 2;

pub type MappedEvents = ArrayVec<MidiEvent, MAX_EVENTS_PER_INPUT>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveProcessorStatus {
    Ok,
    /// If this is returned, then the [`CurveProcessor`] must be dropped.
    DropProcessor,
}

/// The processing-side half of the mapper.
///
/// This runs on the latency-critical thread. It only ever reads an immutable
/// [`CurveSnapshot`], never allocates, never blocks and never logs. New
/// snapshots arrive from the editing context, and replaced ones are sent
/// back so they get deallocated over there.
pub struct CurveProcessor {
    curve: Option<Box<CurveSnapshot>>,
    routing: MidiRouting,
    last_input: Arc<AtomicF32>,

    from_ctx_rx: rtrb::Consumer<CtxToProcessorMsg>,
    to_ctx_tx: rtrb::Producer<ProcessorToCtxMsg>,

    running: bool,
}

impl CurveProcessor {
    pub(crate) fn new(
        curve: Box<CurveSnapshot>,
        routing: MidiRouting,
        last_input: Arc<AtomicF32>,
        from_ctx_rx: rtrb::Consumer<CtxToProcessorMsg>,
        to_ctx_tx: rtrb::Producer<ProcessorToCtxMsg>,
    ) -> Self {
        Self {
            curve: Some(curve),
            routing,
            last_input,
            from_ctx_rx,
            to_ctx_tx,
            running: true,
        }
    }

    pub fn routing(&self) -> MidiRouting {
        self.routing
    }

    /// The curve currently used for mapping.
    pub fn curve(&self) -> Option<&CurveSnapshot> {
        self.curve.as_deref()
    }

    /// Map one block of events.
    ///
    /// Every output event is handed to `emit` with the frame offset of the
    /// event it came from, in input order.
    ///
    /// If this returns [`CurveProcessorStatus::DropProcessor`], then this
    /// [`CurveProcessor`] must be dropped and no events were emitted.
    pub fn process_block(
        &mut self,
        events: &[TimedMidiEvent],
        mut emit: impl FnMut(TimedMidiEvent),
    ) -> CurveProcessorStatus {
        self.poll_messages();

        if !self.running {
            return CurveProcessorStatus::DropProcessor;
        }

        for timed in events {
            for event in self.process_event(timed.event) {
                emit(TimedMidiEvent {
                    frame: timed.frame,
                    event,
                });
            }
        }

        CurveProcessorStatus::Ok
    }

    /// Map a single event against the current curve.
    ///
    /// Events that don't match the routing's source are passed through
    /// untouched. A matching control change or pitch bend is replaced by the
    /// mapped event. A matching note-on is passed through and followed by
    /// the mapped event.
    pub fn process_event(&mut self, event: MidiEvent) -> MappedEvents {
        let mut out = MappedEvents::new();

        let Some(curve) = self.curve.as_deref() else {
            out.push(event);
            return out;
        };
        let bounds = curve.bounds();

        let (channel, input) = match (self.routing.source, event) {
            (
                MidiSource::Controller(cc),
                MidiEvent::ControlChange {
                    channel,
                    controller,
                    value,
                },
            ) if controller == cc => (channel, value as f32),
            (MidiSource::Velocity, MidiEvent::NoteOn { channel, velocity, .. }) if velocity > 0 => {
                out.push(event);
                (channel, velocity as f32)
            }
            (MidiSource::PitchBend, MidiEvent::PitchBend { channel, value }) => {
                (channel, bounds.denormalize_x(util::pitch_bend_to_unit(value)))
            }
            _ => {
                out.push(event);
                return out;
            }
        };

        self.last_input.store(input, Ordering::Relaxed);
        let output = curve.evaluate(input);

        out.push(match self.routing.destination {
            MidiDestination::Controller(controller) => MidiEvent::ControlChange {
                channel,
                controller,
                value: util::to_midi_7bit(output),
            },
            MidiDestination::PitchBend => MidiEvent::PitchBend {
                channel,
                value: util::unit_to_pitch_bend(bounds.normalize_y(output)),
            },
        });

        out
    }

    fn poll_messages(&mut self) {
        while let Ok(msg) = self.from_ctx_rx.pop() {
            match msg {
                CtxToProcessorMsg::NewCurve(curve) => {
                    if let Some(old_curve) = self.curve.replace(curve) {
                        // The return channel is larger than the number of
                        // curves the context can have in flight, so this
                        // can't fail.
                        let _ = self
                            .to_ctx_tx
                            .push(ProcessorToCtxMsg::ReturnCurve(old_curve));
                    }
                }
                CtxToProcessorMsg::SetRouting(routing) => {
                    self.routing = routing;
                }
                CtxToProcessorMsg::Stop => {
                    self.running = false;
                }
            }
        }
    }
}

impl Drop for CurveProcessor {
    fn drop(&mut self) {
        // Make sure the curve is not deallocated in the processing thread.
        let _ = self.to_ctx_tx.push(ProcessorToCtxMsg::Dropped {
            curve: self.curve.take(),
        });
    }
}

pub(crate) enum CtxToProcessorMsg {
    NewCurve(Box<CurveSnapshot>),
    SetRouting(MidiRouting),
    Stop,
}

pub(crate) enum ProcessorToCtxMsg {
    ReturnCurve(Box<CurveSnapshot>),
    Dropped { curve: Option<Box<CurveSnapshot>> },
}
