//! Remote request → router → command dispatcher → CAN transmit.

use leafmon::adapters::twai::TwaiAdapter;
use leafmon::app::uplink::UplinkModel;
use leafmon::bus::router::Router;
use leafmon::bus::subscriptions::SubscriptionTable;
use leafmon::bus::{ConsumerId, EventBus};
use leafmon::can::command::{COMMAND_ID, CommandDispatcher, Dispatch, WAKE_ID};
use leafmon::can::decoder::FrameDecoder;
use leafmon::config::SystemConfig;
use leafmon::diagnostics::FrameTrace;
use leafmon::events::{AcStatus, DoorRequest, TelemetryEvent};
use leafmon::tasks::{dispatch_pending, reception_step};

use crate::mock_hw::{ManualClock, RecordingBroker, TallyDelay, frame};

#[test]
fn remote_start_ac_becomes_a_burst() {
    let config = SystemConfig::default();
    let bus = EventBus::new();
    let can = TwaiAdapter::start(&config).unwrap();
    let mut router = Router::new(&bus, SubscriptionTable::standard());
    let mut uplink = UplinkModel::new(RecordingBroker::default(), &config);
    let mut dispatcher = CommandDispatcher::new(
        &can,
        TallyDelay::default(),
        config.command_repeat,
        bus.trace_signal(),
    );

    uplink.handle_control(b"start_ac", &bus);
    assert_eq!(router.route_pending(), 1);

    // Command kinds go to the dispatcher and nowhere else.
    for c in [ConsumerId::Display, ConsumerId::Logger, ConsumerId::Uplink] {
        assert_eq!(bus.try_next(c), None);
    }
    assert_eq!(dispatch_pending(&mut dispatcher, &bus), 1);

    let sent = can.transmitted();
    let count = usize::from(config.command_repeat.count);
    assert_eq!(sent.len(), 1 + count);
    assert_eq!(sent[0].identifier(), WAKE_ID);
    assert_eq!(sent[0].payload(), &[0x00]);
    for f in &sent[1..] {
        assert_eq!(f.identifier(), COMMAND_ID);
        assert_eq!(f.payload(), &[0x4E, 0x08, 0x12, 0x00]);
    }
}

#[test]
fn failing_controller_does_not_stop_the_burst() {
    let config = SystemConfig::default();
    let bus = EventBus::new();
    let can = TwaiAdapter::start(&config).unwrap();
    can.set_transmit_failing(true);
    let mut dispatcher = CommandDispatcher::new(
        &can,
        TallyDelay::default(),
        config.command_repeat,
        bus.trace_signal(),
    );

    let result = dispatcher.handle(&TelemetryEvent::DoorRequest(DoorRequest::Lock));
    let attempts = config.command_repeat.count + 1;
    assert_eq!(
        result,
        Dispatch::Burst {
            sent: 0,
            failed: attempts
        }
    );
    assert_eq!(can.transmitted().len(), usize::from(attempts));
}

#[test]
fn queued_requests_are_handled_in_order() {
    let config = SystemConfig::default();
    let bus = EventBus::new();
    let can = TwaiAdapter::start(&config).unwrap();
    let mut router = Router::new(&bus, SubscriptionTable::standard());
    let mut dispatcher = CommandDispatcher::new(
        &can,
        TallyDelay::default(),
        config.command_repeat,
        bus.trace_signal(),
    );

    bus.publish(TelemetryEvent::AcRequest(AcStatus::StartRequested));
    bus.publish(TelemetryEvent::AcRequest(AcStatus::StopRequested));
    router.route_pending();
    assert_eq!(dispatch_pending(&mut dispatcher, &bus), 2);

    let sent = can.transmitted();
    let burst = 1 + usize::from(config.command_repeat.count);
    assert_eq!(sent.len(), 2 * burst);
    assert_eq!(sent[burst].identifier(), WAKE_ID);
    assert_eq!(sent[burst + 1].payload(), &[0x56, 0x00, 0x01, 0x00]);
}

#[test]
fn toggle_trace_switches_reception_output() {
    let config = SystemConfig::default();
    let bus = EventBus::new();
    let can = TwaiAdapter::start(&config).unwrap();
    let clock = ManualClock::default();
    let mut decoder = FrameDecoder::new(&config);
    let mut delay = TallyDelay::default();
    let mut trace = FrameTrace::new();
    let mut out = Vec::new();
    let mut router = Router::new(&bus, SubscriptionTable::standard());
    let mut dispatcher = CommandDispatcher::new(
        &can,
        TallyDelay::default(),
        config.command_repeat,
        bus.trace_signal(),
    );

    can.inject(frame(0x5BC, &[0x3E, 0x80]));
    reception_step(&can, &mut decoder, &bus, &clock, &mut delay, &mut trace, &mut out);
    assert!(out.is_empty());

    bus.publish(TelemetryEvent::ToggleTrace);
    router.route_pending();
    dispatch_pending(&mut dispatcher, &bus);
    assert!(dispatcher.trace_enabled());
    // The toggle does not touch the bus.
    assert!(can.transmitted().is_empty());

    can.inject(frame(0x5BC, &[0x3E, 0x80]));
    reception_step(&can, &mut decoder, &bus, &clock, &mut delay, &mut trace, &mut out);
    assert!(trace.is_enabled());
    assert_eq!(out, b"t5bc23e80\r");

    bus.publish(TelemetryEvent::ToggleTrace);
    router.route_pending();
    dispatch_pending(&mut dispatcher, &bus);
    out.clear();
    can.inject(frame(0x5BC, &[0x3E, 0x80]));
    reception_step(&can, &mut decoder, &bus, &clock, &mut delay, &mut trace, &mut out);
    assert!(out.is_empty());
}
