//! Integration tests driving the switch coordinator and daemon against a
//! mock desktop and a recording HID transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use logiflow_daemon::config::Config;
use logiflow_daemon::{
    Daemon, DaemonError, DaemonEvent, FlowSettings, Services, SwitchCoordinator, SwitchState,
};
use logiflow_hidpp::{CommandRunner, HidTransport, RetryPolicy, TransportError, WriteRequest};
use logiflow_input::mock::{MockDesktop, MockDesktopHandle};
use logiflow_input::{Desktop, Modifier};
use logiflow_types::{
    Channel, DeviceKind, EdgePosition, EdgeTarget, Point, Rect, ScreenBounds, ZoneAnchor,
};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Records every write; acknowledges unless the device is told to fail.
struct RecordingTransport {
    delay: Duration,
    fail: Mutex<Option<DeviceKind>>,
    requests: Mutex<Vec<WriteRequest>>,
    completed: AtomicUsize,
}

impl RecordingTransport {
    fn new() -> Arc<Self> {
        Self::with_delay(Duration::ZERO)
    }

    fn with_delay(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            fail: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
            completed: AtomicUsize::new(0),
        })
    }

    fn fail_device(&self, device: DeviceKind) {
        *self.fail.lock().unwrap() = Some(device);
    }

    fn requests(&self) -> Vec<WriteRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Writes that ran to the end of their delay.
    fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HidTransport for RecordingTransport {
    async fn write(&self, request: &WriteRequest) -> Result<String, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock().unwrap() == Some(request.command.device) {
            return Ok("error: could not open device".to_string());
        }
        Ok(format!("Opening device\n{}\n", request.acknowledgement()))
    }
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        attempts: 3,
        delay: Duration::from_millis(1),
        timeout: Duration::from_secs(2),
    }
}

fn ch(n: u8) -> Channel {
    Channel::new(n).unwrap()
}

fn single_monitor() -> Vec<Rect> {
    vec![Rect::new(0, 0, 1920, 1080)]
}

fn settings_with(targets: Vec<EdgeTarget>) -> FlowSettings {
    let mut config = Config::default();
    config.targets = targets;
    FlowSettings::from_config(&config)
}

struct Rig {
    coordinator: SwitchCoordinator,
    cursor: MockDesktopHandle,
    transport: Arc<RecordingTransport>,
    settings: watch::Sender<Arc<FlowSettings>>,
}

fn rig(monitors: Vec<Rect>, settings: FlowSettings, transport: Arc<RecordingTransport>) -> Rig {
    let bounds = ScreenBounds::from_monitors(&monitors).unwrap();
    let backend = MockDesktop::new(monitors);
    let cursor = backend.handle();
    let desktop = Desktop::from_backend(backend);
    let (settings_tx, settings_rx) = watch::channel(Arc::new(settings));
    let runner = CommandRunner::with_policy(transport.clone(), fast_policy());
    Rig {
        coordinator: SwitchCoordinator::new(bounds, desktop.pointer, runner, settings_rx),
        cursor,
        transport,
        settings: settings_tx,
    }
}

#[tokio::test]
async fn left_edge_switches_both_devices_and_nudges_cursor() {
    let mut rig = rig(
        single_monitor(),
        settings_with(vec![EdgeTarget::full(EdgePosition::Left, ch(1))]),
        RecordingTransport::new(),
    );
    rig.cursor.move_to(Point::new(0, 500));

    let fired = rig.coordinator.tick().expect("left edge fires");
    assert_eq!(fired.channel, ch(1));
    assert!(rig.coordinator.state().is_in_flight());

    let outcome = rig.coordinator.settle().await.unwrap();
    assert!(outcome.is_success());
    assert_eq!(rig.coordinator.state(), SwitchState::Idle);

    let requests = rig.transport.requests();
    assert_eq!(requests.len(), 2);
    let mut keyboard = vec![0x11, 0x01, 0x09, 0x1E, 0x00];
    keyboard.resize(20, 0);
    let mut mouse = vec![0x11, 0x02, 0x0A, 0x1E, 0x00];
    mouse.resize(20, 0);
    assert_eq!(requests[0].command.bytes, keyboard);
    assert_eq!(requests[1].command.bytes, mouse);

    assert_eq!(rig.cursor.warps(), vec![Point::new(1, 500)]);
}

#[tokio::test]
async fn nudge_is_relative_to_cursor_at_completion() {
    let mut rig = rig(
        single_monitor(),
        settings_with(vec![EdgeTarget::full(EdgePosition::Bottom, ch(2))]),
        RecordingTransport::with_delay(Duration::from_millis(30)),
    );
    rig.cursor.move_to(Point::new(700, 1079));
    rig.coordinator.tick().unwrap();
    // The user keeps moving while the switch is delivered.
    rig.cursor.move_to(Point::new(900, 1078));

    rig.coordinator.settle().await.unwrap();

    assert_eq!(rig.cursor.warps(), vec![Point::new(900, 1077)]);
}

#[tokio::test]
async fn ticks_during_switch_are_ignored() {
    let mut rig = rig(
        single_monitor(),
        settings_with(vec![EdgeTarget::full(EdgePosition::Right, ch(2))]),
        RecordingTransport::with_delay(Duration::from_millis(100)),
    );
    rig.cursor.move_to(Point::new(1919, 300));

    assert!(rig.coordinator.tick().is_some());
    for _ in 0..10 {
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(rig.coordinator.tick().is_none());
    }
    rig.coordinator.settle().await.unwrap();

    assert_eq!(rig.transport.requests().len(), 2);
    assert_eq!(rig.cursor.warps(), vec![Point::new(1918, 300)]);
}

#[tokio::test]
async fn partial_switch_leaves_cursor_and_retries_next_tick() {
    let transport = RecordingTransport::new();
    transport.fail_device(DeviceKind::Mouse);
    let mut rig = rig(
        single_monitor(),
        settings_with(vec![EdgeTarget::full(EdgePosition::Top, ch(3))]),
        transport,
    );
    rig.cursor.move_to(Point::new(400, 0));

    rig.coordinator.tick().unwrap();
    let outcome = rig.coordinator.settle().await.unwrap();

    assert!(outcome.keyboard);
    assert!(!outcome.mouse);
    assert!(rig.cursor.warps().is_empty());
    assert_eq!(rig.coordinator.state(), SwitchState::Idle);
    // One keyboard write, three failed mouse attempts.
    assert_eq!(rig.transport.requests().len(), 4);

    // Both halves are sent again on the next qualifying tick.
    rig.coordinator.tick().unwrap();
    rig.coordinator.settle().await.unwrap();
    let devices: Vec<_> = rig.transport.requests()[4..]
        .iter()
        .map(|r| r.command.device)
        .collect();
    assert_eq!(devices[0], DeviceKind::Keyboard);
    assert!(devices[1..].iter().all(|d| *d == DeviceKind::Mouse));
}

#[tokio::test]
async fn modifier_gate_blocks_until_held() {
    let mut settings = settings_with(vec![EdgeTarget::full(EdgePosition::Left, ch(1))]);
    settings.gate = Some(Modifier::Ctrl);
    let mut rig = rig(single_monitor(), settings, RecordingTransport::new());
    rig.cursor.move_to(Point::new(0, 10));

    assert!(rig.coordinator.tick().is_none());
    assert!(rig.transport.requests().is_empty());

    rig.cursor.set_held(Modifier::Ctrl, true);
    assert!(rig.coordinator.tick().is_some());
    rig.coordinator.settle().await.unwrap();
}

#[tokio::test]
async fn lowest_channel_wins_when_targets_overlap() {
    // Both targets match the top-left corner; channel 1 fires although
    // channel 3 is listed first.
    let config = Config::from_toml(
        r#"
[[targets]]
position = "top"
channel = 3

[[targets]]
position = "left"
channel = 1
"#,
    )
    .unwrap();
    let mut rig = rig(
        single_monitor(),
        FlowSettings::from_config(&config),
        RecordingTransport::new(),
    );
    rig.cursor.move_to(Point::new(0, 0));

    assert_eq!(rig.coordinator.tick().unwrap().channel, ch(1));
    rig.coordinator.settle().await.unwrap();
    assert!(rig.transport.requests().iter().all(|r| r.command.bytes[4] == 0x00));
}

#[tokio::test]
async fn zone_target_only_fires_inside_zone() {
    let mut rig = rig(
        single_monitor(),
        settings_with(vec![EdgeTarget::zone(
            EdgePosition::Right,
            ch(2),
            200,
            ZoneAnchor::Start,
        )]),
        RecordingTransport::new(),
    );

    rig.cursor.move_to(Point::new(1920, 500));
    assert!(rig.coordinator.tick().is_none());

    rig.cursor.move_to(Point::new(1920, 150));
    assert_eq!(rig.coordinator.tick().unwrap().channel, ch(2));
    rig.coordinator.settle().await.unwrap();
}

#[tokio::test]
async fn edges_come_from_the_whole_desktop() {
    // Two monitors side by side: the seam at x=1920 is not an edge.
    let mut rig = rig(
        vec![Rect::new(0, 0, 1920, 1080), Rect::new(1920, 0, 1920, 1080)],
        settings_with(vec![EdgeTarget::full(EdgePosition::Right, ch(2))]),
        RecordingTransport::new(),
    );

    rig.cursor.move_to(Point::new(1919, 400));
    assert!(rig.coordinator.tick().is_none());

    rig.cursor.move_to(Point::new(3839, 400));
    assert!(rig.coordinator.tick().is_some());
    rig.coordinator.settle().await.unwrap();
}

#[tokio::test]
async fn swapped_settings_apply_on_next_tick() {
    let mut rig = rig(
        single_monitor(),
        settings_with(vec![EdgeTarget::disabled(ch(1))]),
        RecordingTransport::new(),
    );
    rig.cursor.move_to(Point::new(0, 500));
    assert!(rig.coordinator.tick().is_none());

    rig.settings
        .send_replace(Arc::new(settings_with(vec![EdgeTarget::full(EdgePosition::Left, ch(1))])));

    assert!(rig.coordinator.tick().is_some());
    rig.coordinator.settle().await.unwrap();
}

#[tokio::test]
async fn run_stops_on_shutdown_after_in_flight_switch() {
    let rig = rig(
        single_monitor(),
        settings_with(vec![EdgeTarget::full(EdgePosition::Left, ch(1))]),
        RecordingTransport::with_delay(Duration::from_millis(50)),
    );
    rig.cursor.move_to(Point::new(0, 500));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let coordinator = rig.coordinator.with_poll_interval(Duration::from_millis(10));

    let task = tokio::spawn(coordinator.run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(20)).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("flow stops within the grace period")
        .unwrap();

    // The first switch was allowed to finish.
    let requests = rig.transport.requests();
    assert!(requests.len() >= 2);
    assert_eq!(requests[0].command.device, DeviceKind::Keyboard);
    assert_eq!(requests[1].command.device, DeviceKind::Mouse);
    assert!(!rig.cursor.warps().is_empty());
}

#[tokio::test]
async fn shutdown_abandons_slow_switch_without_cancelling_it() {
    let monitors = single_monitor();
    let bounds = ScreenBounds::from_monitors(&monitors).unwrap();
    let backend = MockDesktop::new(monitors);
    let cursor = backend.handle();
    let desktop = Desktop::from_backend(backend);
    let transport = RecordingTransport::with_delay(Duration::from_secs(4));
    let runner = CommandRunner::with_policy(
        transport.clone(),
        RetryPolicy {
            attempts: 1,
            delay: Duration::from_millis(1),
            timeout: Duration::from_secs(10),
        },
    );
    let (_settings_tx, settings_rx) = watch::channel(Arc::new(settings_with(vec![
        EdgeTarget::full(EdgePosition::Left, ch(1)),
    ])));
    let coordinator = SwitchCoordinator::new(bounds, desktop.pointer, runner, settings_rx)
        .with_poll_interval(Duration::from_millis(10));
    cursor.move_to(Point::new(0, 500));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(coordinator.run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.requests().len(), 1);
    shutdown_tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("flow gives up after the grace period")
        .unwrap();
    assert_eq!(transport.completed(), 0);

    // The detached keyboard write still finishes.
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(transport.completed(), 1);
    assert!(cursor.warps().is_empty());
}

#[tokio::test]
async fn daemon_runs_flow_and_applies_new_config() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
    let backend = MockDesktop::new(single_monitor());
    let cursor = backend.handle();
    let transport = RecordingTransport::new();
    let runner = CommandRunner::with_policy(transport.clone(), fast_policy());

    let mut config = Config::default();
    config.daemon.poll_interval_ms = 10;
    config.targets = vec![EdgeTarget::disabled(ch(1))];
    let services = Services::from_config(&config);
    assert!(services.flow);

    let mut daemon = Daemon::new(
        config.clone(),
        Desktop::from_backend(backend),
        Some(runner),
        None,
        services,
    );
    let events = daemon.event_sender();
    let handle = tokio::spawn(async move { daemon.run().await });

    cursor.move_to(Point::new(0, 500));
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(transport.requests().is_empty());

    config.targets = vec![EdgeTarget::full(EdgePosition::Left, ch(2))];
    events
        .send(DaemonEvent::ApplyConfig(Box::new(config)))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    events.send(DaemonEvent::Shutdown).await.unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("daemon stops")
        .unwrap()
        .unwrap();

    let requests = transport.requests();
    assert!(requests.len() >= 2);
    assert!(requests.iter().all(|r| r.command.bytes[4] == 0x01));
}

#[tokio::test]
async fn daemon_without_monitors_fails_to_start() {
    let mut daemon = Daemon::new(
        Config::default(),
        Desktop::from_backend(MockDesktop::new(vec![])),
        Some(CommandRunner::new(RecordingTransport::new())),
        None,
        Services::default(),
    );

    assert!(daemon.run().await.is_err());
}

#[tokio::test]
async fn flow_without_transport_is_an_error() {
    let mut daemon = Daemon::new(
        Config::default(),
        Desktop::from_backend(MockDesktop::new(single_monitor())),
        None,
        None,
        Services {
            flow: true,
            ..Services::default()
        },
    );

    assert!(matches!(daemon.run().await, Err(DaemonError::Other(_))));
}
