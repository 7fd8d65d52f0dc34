use std::time::{Duration, Instant};

use curvemap::{
    CurveBounds, CurveConfig, CurveMapperCtx, CurveProcessorStatus, EngineConfig,
    InteractionController, MidiDestination, MidiEvent, MidiRouting, MidiSource, PointerButton,
    PointerEvent, ScreenTransform, TimedMidiEvent, UpdateStatus,
};
use glam::Vec2;

const RUN_DURATION: Duration = Duration::from_secs(2);
const UPDATE_INTERVAL: Duration = Duration::from_millis(15);
const BLOCK_INTERVAL: Duration = Duration::from_millis(5);
const VIEW_WIDTH: f32 = 500.0;
const VIEW_HEIGHT: f32 = 300.0;

fn main() {
    simple_log::quick!("info");

    println!("curvemap demo...");

    let mut cx = CurveMapperCtx::new(
        CurveConfig::with_bounds(CurveBounds::MIDI),
        EngineConfig::default(),
    );
    cx.set_routing(MidiRouting {
        source: MidiSource::Controller(1),
        destination: MidiDestination::Controller(7),
    });

    let Some(transform) = ScreenTransform::from_viewport(cx.model().bounds(), VIEW_WIDTH, VIEW_HEIGHT)
    else {
        log::error!("Invalid viewport");
        return;
    };
    let mut controller = InteractionController::default();

    let (active_cx, mut processor) = cx.activate();
    let mut active_cx = Some(active_cx);

    let processor_thread = std::thread::spawn(move || {
        let mut value = 0u8;

        loop {
            let block = [TimedMidiEvent {
                frame: 0,
                event: MidiEvent::ControlChange {
                    channel: 0,
                    controller: 1,
                    value,
                },
            }];

            let status = processor.process_block(&block, |out| {
                log::debug!("{:?} -> {:?}", block[0].event, out.event);
            });
            if status == CurveProcessorStatus::DropProcessor {
                break;
            }

            value = (value + 1) % 128;
            std::thread::sleep(BLOCK_INTERVAL);
        }
    });

    // Pull the middle anchor up, then make the first segment a cubic.
    let gestures = [
        PointerEvent::Down {
            position: Vec2::new(VIEW_WIDTH / 2.0, VIEW_HEIGHT / 2.0),
            button: PointerButton::Primary,
        },
        PointerEvent::Drag {
            position: Vec2::new(VIEW_WIDTH / 2.0, VIEW_HEIGHT / 4.0),
        },
        PointerEvent::Drag {
            position: Vec2::new(VIEW_WIDTH / 2.0, VIEW_HEIGHT / 5.0),
        },
        PointerEvent::Up,
        PointerEvent::DoubleClick {
            position: Vec2::new(0.0, VIEW_HEIGHT),
        },
        PointerEvent::DoubleClick {
            position: Vec2::new(0.0, VIEW_HEIGHT),
        },
        PointerEvent::DoubleClick {
            position: Vec2::new(VIEW_WIDTH * 0.8, VIEW_HEIGHT * 0.1),
        },
    ];
    let mut gestures = gestures.into_iter();

    let start = Instant::now();
    while start.elapsed() < RUN_DURATION {
        std::thread::sleep(UPDATE_INTERVAL);

        let Some(mut cx) = active_cx.take() else {
            break;
        };

        if let Some(event) = gestures.next() {
            if controller.handle_event(cx.model_mut(), &transform, event) {
                log::info!("{:?} edited the curve", event);
            }
        }

        match cx.update() {
            UpdateStatus::Ok { cx, publish_error } => {
                if let Some(e) = publish_error {
                    log::error!("{}", e);
                }

                active_cx = Some(cx);
            }
            UpdateStatus::Deactivated { .. } => {
                log::error!("Deactivated unexpectedly");
                break;
            }
        }
    }

    if let Some(active_cx) = active_cx {
        let cx = active_cx.deactivate(true);

        println!("last input: {}", cx.last_input_value());
        for x in [0.0, 32.0, 64.0, 96.0, 127.0] {
            println!("f({}) = {:.2}", x, cx.model().evaluate(x));
        }

        match cx.state().to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => log::error!("{}", e),
        }
    }

    if processor_thread.join().is_err() {
        log::error!("Processor thread panicked");
    }

    println!("finished");
}
