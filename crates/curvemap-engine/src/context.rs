use std::time::{Duration, Instant};

use rtrb::PushError;

use curvemap_core::{CurveConfig, CurveModel, PresetError};

use crate::{
    midi::MidiRouting,
    processor::{CtxToProcessorMsg, CurveProcessor, ProcessorToCtxMsg},
    state::{PluginState, UiState},
};

const CLOSE_PROCESSOR_TIMEOUT: Duration = Duration::from_secs(3);
const CLOSE_PROCESSOR_SLEEP_INTERVAL: Duration = Duration::from_millis(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// The capacity of the message channel to the processor.
    ///
    /// By default this is set to `16`.
    pub channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 16,
        }
    }
}

/// An error occurred while sending an update to the [`CurveProcessor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to publish to the curve processor: message channel is full")]
    ChannelFull,
}

/// The editing-side half of the mapper, before a processor exists.
///
/// This owns the [`CurveModel`]. All structural edits happen here, on the
/// editing thread.
pub struct CurveMapperCtx {
    model: CurveModel,
    routing: MidiRouting,
    ui: UiState,
    config: EngineConfig,
}

impl CurveMapperCtx {
    pub fn new(curve_config: CurveConfig, config: EngineConfig) -> Self {
        Self {
            model: CurveModel::new(curve_config),
            routing: MidiRouting::default(),
            ui: UiState::default(),
            config,
        }
    }

    pub fn model(&self) -> &CurveModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut CurveModel {
        &mut self.model
    }

    pub fn routing(&self) -> MidiRouting {
        self.routing
    }

    pub fn set_routing(&mut self, routing: MidiRouting) {
        self.routing = routing;
    }

    pub fn ui(&self) -> &UiState {
        &self.ui
    }

    pub fn set_ui(&mut self, ui: UiState) {
        self.ui = ui;
    }

    /// The input value most recently seen by the processor.
    pub fn last_input_value(&self) -> f32 {
        self.model.last_input_value()
    }

    /// Capture everything that should be persisted by the host.
    pub fn state(&self) -> PluginState {
        PluginState {
            ui: self.ui,
            routing: self.routing,
            curve: self.model.serialize(),
        }
    }

    /// Restore persisted state.
    ///
    /// An empty curve resets the model to the default curve. If the curve
    /// is rejected, nothing is changed.
    pub fn load_state(&mut self, state: &PluginState) -> Result<(), PresetError> {
        if state.curve.is_empty() {
            self.model.reset();
        } else {
            self.model.deserialize(&state.curve)?;
        }

        self.routing = state.routing;
        self.ui = state.ui;

        Ok(())
    }

    /// Create the processor and move this context into its active state.
    ///
    /// The processor starts out with a snapshot of the current curve.
    pub fn activate(self) -> (ActiveCurveMapperCtx, CurveProcessor) {
        let (to_processor_tx, from_ctx_rx) =
            rtrb::RingBuffer::<CtxToProcessorMsg>::new(self.config.channel_capacity);
        // Every curve in flight comes back at most once, plus the final
        // `Dropped` message.
        let (to_ctx_tx, from_processor_rx) =
            rtrb::RingBuffer::<ProcessorToCtxMsg>::new(self.config.channel_capacity + 1);

        let processor = CurveProcessor::new(
            Box::new(self.model.snapshot()),
            self.routing,
            self.model.shared_last_input(),
            from_ctx_rx,
            to_ctx_tx,
        );

        let published_revision = self.model.revision();
        let published_routing = self.routing;

        (
            ActiveCurveMapperCtx {
                inner: Some(ActiveCtxInner {
                    cx: self,
                    to_processor_tx,
                    from_processor_rx,
                    published_revision,
                    published_routing,
                }),
            },
            processor,
        )
    }
}

impl Default for CurveMapperCtx {
    fn default() -> Self {
        Self::new(CurveConfig::default(), EngineConfig::default())
    }
}

/// The editing-side half of the mapper while its [`CurveProcessor`] is
/// alive.
///
/// Dropping this without calling [`ActiveCurveMapperCtx::deactivate`] stops
/// the processor and waits for it the same way.
pub struct ActiveCurveMapperCtx {
    inner: Option<ActiveCtxInner>,
}

impl ActiveCurveMapperCtx {
    pub fn cx(&self) -> &CurveMapperCtx {
        &self.inner.as_ref().unwrap().cx
    }

    pub fn cx_mut(&mut self) -> &mut CurveMapperCtx {
        &mut self.inner.as_mut().unwrap().cx
    }

    pub fn model(&self) -> &CurveModel {
        &self.cx().model
    }

    pub fn model_mut(&mut self) -> &mut CurveModel {
        &mut self.cx_mut().model
    }

    /// Whether the processor is running on an older curve or routing than
    /// the one in this context.
    pub fn needs_publish(&self) -> bool {
        let inner = self.inner.as_ref().unwrap();

        inner.cx.model.revision() != inner.published_revision
            || inner.cx.routing != inner.published_routing
    }

    /// Update the mapper context.
    ///
    /// This must be called regularly (i.e. once every UI frame). It frees
    /// curves the processor is done with and publishes any edits made since
    /// the last call. If the channel is full, the edits are published on a
    /// later call instead.
    pub fn update(mut self) -> UpdateStatus {
        let inner = self.inner.as_mut().unwrap();

        if inner.poll_processor() {
            return UpdateStatus::Deactivated {
                cx: self.inner.take().unwrap().cx,
            };
        }

        let publish_error = inner.publish().err();

        UpdateStatus::Ok {
            cx: self,
            publish_error,
        }
    }

    /// Deactivate the mapper context.
    ///
    /// This will block the thread until either the processor has been
    /// dropped or a timeout has been reached.
    ///
    /// If the processor is still running, then it is first asked to stop,
    /// after which it reports [`CurveProcessorStatus::DropProcessor`](crate::processor::CurveProcessorStatus::DropProcessor).
    pub fn deactivate(mut self, processor_is_running: bool) -> CurveMapperCtx {
        let inner = self.inner.take().unwrap();
        inner.deactivate(processor_is_running)
    }
}

impl Drop for ActiveCurveMapperCtx {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.deactivate(true);
        }
    }
}

struct ActiveCtxInner {
    cx: CurveMapperCtx,

    to_processor_tx: rtrb::Producer<CtxToProcessorMsg>,
    from_processor_rx: rtrb::Consumer<ProcessorToCtxMsg>,

    published_revision: u64,
    published_routing: MidiRouting,
}

impl ActiveCtxInner {
    fn deactivate(mut self, processor_is_running: bool) -> CurveMapperCtx {
        let start = Instant::now();

        let mut dropped = false;

        // An abandoned channel means the processor is already gone.
        if processor_is_running && !self.to_processor_tx.is_abandoned() {
            loop {
                if self.to_processor_tx.push(CtxToProcessorMsg::Stop).is_err() {
                    log::error!("Failed to send stop signal: curve processor message channel is full");

                    std::thread::sleep(CLOSE_PROCESSOR_SLEEP_INTERVAL);

                    if start.elapsed() > CLOSE_PROCESSOR_TIMEOUT {
                        log::error!("Timed out trying to send stop signal to curve processor");
                        dropped = true;
                        break;
                    }
                } else {
                    break;
                }
            }
        }

        while !dropped {
            dropped = self.poll_processor();

            if !dropped {
                std::thread::sleep(CLOSE_PROCESSOR_SLEEP_INTERVAL);

                if start.elapsed() > CLOSE_PROCESSOR_TIMEOUT {
                    log::error!("Timed out waiting for curve processor to drop");
                    dropped = true;
                }
            }
        }

        self.cx
    }

    /// Returns `true` if the processor has been dropped.
    fn poll_processor(&mut self) -> bool {
        let mut dropped = false;

        while let Ok(msg) = self.from_processor_rx.pop() {
            match msg {
                // Deallocate on this thread.
                ProcessorToCtxMsg::ReturnCurve(_curve) => {}
                ProcessorToCtxMsg::Dropped { curve: _ } => {
                    dropped = true;
                }
            }
        }

        dropped
    }

    fn publish(&mut self) -> Result<(), PublishError> {
        if self.cx.routing != self.published_routing {
            let routing = self.cx.routing;

            if let Err(PushError::Full(_)) = self
                .to_processor_tx
                .push(CtxToProcessorMsg::SetRouting(routing))
            {
                log::error!("Failed to send new routing: curve processor message channel is full");
                return Err(PublishError::ChannelFull);
            }

            log::debug!("Published routing {:?}", routing);
            self.published_routing = routing;
        }

        let revision = self.cx.model.revision();
        if revision != self.published_revision {
            let curve = Box::new(self.cx.model.snapshot());

            if let Err(PushError::Full(_)) = self
                .to_processor_tx
                .push(CtxToProcessorMsg::NewCurve(curve))
            {
                log::error!("Failed to send new curve: curve processor message channel is full");
                return Err(PublishError::ChannelFull);
            }

            log::debug!(
                "Published curve revision {} with {} nodes",
                revision,
                self.cx.model.len()
            );
            self.published_revision = revision;
        }

        Ok(())
    }
}

pub enum UpdateStatus {
    Ok {
        cx: ActiveCurveMapperCtx,
        publish_error: Option<PublishError>,
    },
    Deactivated {
        cx: CurveMapperCtx,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvemap_core::{CurveBounds, CurveType, Point};

    use crate::midi::{MidiDestination, MidiEvent, MidiSource};
    use crate::processor::CurveProcessorStatus;

    fn midi_ctx() -> CurveMapperCtx {
        CurveMapperCtx::new(
            CurveConfig::with_bounds(CurveBounds::MIDI),
            EngineConfig::default(),
        )
    }

    fn update(cx: ActiveCurveMapperCtx) -> ActiveCurveMapperCtx {
        match cx.update() {
            UpdateStatus::Ok { cx, publish_error } => {
                assert_eq!(publish_error, None);
                cx
            }
            UpdateStatus::Deactivated { .. } => panic!("deactivated unexpectedly"),
        }
    }

    fn map_cc(processor: &mut CurveProcessor, value: u8) -> u8 {
        let out = processor.process_event(MidiEvent::ControlChange {
            channel: 0,
            controller: 0,
            value,
        });
        match out[0] {
            MidiEvent::ControlChange { value, .. } => value,
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn edits_reach_processor_after_update() {
        let (mut cx, mut processor) = midi_ctx().activate();
        assert_eq!(map_cc(&mut processor, 100), 100);

        let middle = cx.model().node_ids()[1];
        cx.model_mut().set_anchor(middle, Point::new(63.5, 0.0));
        assert!(cx.needs_publish());

        // Not published yet.
        assert_eq!(processor.process_block(&[], |_| {}), CurveProcessorStatus::Ok);
        assert_eq!(map_cc(&mut processor, 63), 63);

        let cx = update(cx);
        assert!(!cx.needs_publish());
        assert_eq!(processor.process_block(&[], |_| {}), CurveProcessorStatus::Ok);
        assert_eq!(map_cc(&mut processor, 63), 0);
        assert_eq!(processor.curve().unwrap().nodes(), cx.model().snapshot().nodes());

        drop(processor);
    }

    #[test]
    fn full_channel_retries_on_next_update() {
        let mut cx = CurveMapperCtx::new(
            CurveConfig::with_bounds(CurveBounds::MIDI),
            EngineConfig {
                channel_capacity: 1,
            },
        );
        cx.model_mut().insert_node(Point::new(10.0, 10.0));
        let (mut cx, mut processor) = cx.activate();

        let middle = cx.model().node_ids()[2];
        cx.model_mut().set_curve_type(middle, CurveType::Cubic);
        let mut cx = update(cx);

        cx.model_mut().set_curve_type(middle, CurveType::Linear);
        let cx = match cx.update() {
            UpdateStatus::Ok { cx, publish_error } => {
                assert_eq!(publish_error, Some(PublishError::ChannelFull));
                cx
            }
            UpdateStatus::Deactivated { .. } => panic!("deactivated unexpectedly"),
        };
        assert!(cx.needs_publish());

        processor.process_block(&[], |_| {});
        let cx = update(cx);
        assert!(!cx.needs_publish());

        processor.process_block(&[], |_| {});
        assert_eq!(
            processor.curve().unwrap().nodes()[2].curve_type,
            CurveType::Linear
        );

        drop(processor);
    }

    #[test]
    fn routing_changes_reach_processor() {
        let (mut cx, mut processor) = midi_ctx().activate();

        let routing = MidiRouting {
            source: MidiSource::PitchBend,
            destination: MidiDestination::Controller(11),
        };
        cx.cx_mut().set_routing(routing);
        let _cx = update(cx);

        processor.process_block(&[], |_| {});
        assert_eq!(processor.routing(), routing);

        drop(processor);
    }

    #[test]
    fn dropping_processor_deactivates() {
        let (cx, processor) = midi_ctx().activate();
        drop(processor);

        match cx.update() {
            UpdateStatus::Deactivated { cx } => assert_eq!(cx.model().len(), 3),
            UpdateStatus::Ok { .. } => panic!("expected deactivation"),
        }
    }

    #[test]
    fn stop_signal_drops_processor() {
        let (cx, mut processor) = midi_ctx().activate();

        let handle = std::thread::spawn(move || loop {
            if processor.process_block(&[], |_| {}) == CurveProcessorStatus::DropProcessor {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        });

        let cx = cx.deactivate(true);
        handle.join().unwrap();

        assert_eq!(cx.model().len(), 3);
    }

    #[test]
    fn dropping_active_ctx_stops_processor() {
        let (mut cx, mut processor) = midi_ctx().activate();

        let middle = cx.model().node_ids()[1];
        cx.model_mut().set_anchor(middle, Point::new(63.5, 10.0));
        let cx = update(cx);

        let handle = std::thread::spawn(move || {
            while processor.process_block(&[], |_| {}) == CurveProcessorStatus::Ok {
                std::thread::sleep(Duration::from_millis(1));
            }
        });

        let start = Instant::now();
        drop(cx);
        assert!(start.elapsed() < CLOSE_PROCESSOR_TIMEOUT);

        // Only finishes once the processor saw the stop signal.
        handle.join().unwrap();
    }

    #[test]
    fn dropping_active_ctx_after_processor_returns_quickly() {
        let (cx, processor) = midi_ctx().activate();
        drop(processor);

        let start = Instant::now();
        drop(cx);
        assert!(start.elapsed() < CLOSE_PROCESSOR_TIMEOUT);
    }

    #[test]
    fn state_round_trip() {
        let mut cx = midi_ctx();
        cx.model_mut().insert_node(Point::new(30.0, 90.0));
        cx.set_routing(MidiRouting {
            source: MidiSource::Velocity,
            destination: MidiDestination::PitchBend,
        });
        cx.set_ui(UiState {
            width: 800,
            height: 600,
        });

        let json = cx.state().to_json().unwrap();

        let mut loaded = midi_ctx();
        loaded.load_state(&PluginState::from_json(&json).unwrap()).unwrap();

        assert_eq!(loaded.state(), cx.state());
    }

    #[test]
    fn rejected_state_changes_nothing() {
        let mut cx = midi_ctx();
        let before = cx.state();

        let mut state = before.clone();
        state.routing.source = MidiSource::PitchBend;
        state.curve.truncate(1);

        assert!(cx.load_state(&state).is_err());
        assert_eq!(cx.state(), before);
    }
}
