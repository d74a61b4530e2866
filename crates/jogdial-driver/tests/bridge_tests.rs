//! 主循环集成测试
//!
//! 使用 mock 输入源与 mock 接收端逐步驱动状态机（`tick()`），
//! 验证连接/重连流程、命令发送顺序和连续重发。

use jogdial_driver::{
    AuxEvent, Bridge, BridgeBuilder, BridgeConfig, BridgeState, Dialect, IndicatorStatus,
    StatusIndicator,
};
use jogdial_input::{MockInputHandle, MockInputSource};
use jogdial_protocol::{ActiveAxis, KeyCode, RawEvent, SpeedLevel};
use jogdial_transport::{MockSink, MockSinkHandle};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

const DEVICE: &str = "/dev/input/event7";

/// 所有等待都压缩到 1ms
fn fast_config() -> BridgeConfig {
    BridgeConfig {
        cycle_period_ms: 1,
        transport_retry_ms: 1,
        device_retry_ms: 1,
        ..BridgeConfig::default()
    }
}

struct Harness {
    bridge: Bridge<MockInputSource, MockSink>,
    device: MockInputHandle,
    backend: MockSinkHandle,
}

impl Harness {
    fn new(config: BridgeConfig) -> Self {
        Self::with_builder(BridgeBuilder::new(DEVICE).config(config))
    }

    fn with_builder(builder: BridgeBuilder) -> Self {
        let (input, device) = MockInputSource::new();
        let (sink, backend) = MockSink::new();
        let bridge = builder.build(input, sink).unwrap();
        Self {
            bridge,
            device,
            backend,
        }
    }

    fn tick(&mut self) -> BridgeState {
        self.bridge.tick().unwrap()
    }

    /// 连接后端和设备，进入 Running
    fn bring_up(&mut self) {
        assert_eq!(self.tick(), BridgeState::DeviceConnecting);
        assert_eq!(self.tick(), BridgeState::Running);
    }

    /// 注入事件并运行一个周期，返回本周期发出的命令
    fn cycle_with(&mut self, events: impl IntoIterator<Item = RawEvent>) -> Vec<String> {
        self.device.push_events(events);
        assert_eq!(self.tick(), BridgeState::Running);
        self.backend.take_sent()
    }
}

#[test]
fn test_startup_sequence() {
    let mut h = Harness::new(fast_config());
    assert_eq!(h.bridge.phase(), BridgeState::TransportConnecting);

    assert_eq!(h.tick(), BridgeState::DeviceConnecting);
    assert!(h.backend.is_connected());
    assert!(h.bridge.state().connection.transport_connected);
    assert!(!h.bridge.state().connection.device_connected);

    assert_eq!(h.tick(), BridgeState::Running);
    assert!(h.device.is_claimed());
    assert_eq!(h.device.open_path().unwrap().to_str(), Some(DEVICE));
    assert!(h.bridge.state().connection.device_connected);
}

#[test]
fn test_transport_connect_retries() {
    let mut h = Harness::new(fast_config());
    h.backend.fail_next_connects(2);

    assert_eq!(h.tick(), BridgeState::TransportConnecting);
    assert_eq!(h.tick(), BridgeState::TransportConnecting);
    assert_eq!(h.tick(), BridgeState::DeviceConnecting);
    assert_eq!(h.backend.connects(), 1);
}

#[test]
fn test_device_open_and_claim_retries() {
    let mut h = Harness::new(fast_config());
    h.device.fail_next_opens(1);
    h.device.fail_next_claims(1);

    assert_eq!(h.tick(), BridgeState::DeviceConnecting);
    // 打开失败
    assert_eq!(h.tick(), BridgeState::DeviceConnecting);
    // 打开成功但独占失败，设备句柄被释放
    assert_eq!(h.tick(), BridgeState::DeviceConnecting);
    assert_eq!(h.device.opens(), 1);
    assert_eq!(h.device.closes(), 1);

    assert_eq!(h.tick(), BridgeState::Running);
    assert!(h.device.is_claimed());
}

#[test]
fn test_end_to_end_jog_on_z_at_second_level() {
    let mut h = Harness::new(fast_config());
    h.bring_up();

    // 选择 Z 轴，档位 L4 -> L1 -> L2
    let sent = h.cycle_with([
        RawEvent::key(KeyCode::ZAxis, 1),
        RawEvent::key(KeyCode::ZAxis, 0),
        RawEvent::key(KeyCode::Increment, 1),
        RawEvent::key(KeyCode::Increment, 0),
        RawEvent::key(KeyCode::Increment, 1),
        RawEvent::key(KeyCode::Increment, 0),
    ]);
    // 每次广播都会抢占前一条，只剩最后一条
    assert_eq!(
        sent,
        ["broadcast {\"id\":\"shuttlexpress\",\"action\":\"0.010mm\"}\n"]
    );
    assert_eq!(h.bridge.state().axis, ActiveAxis::Z);
    assert_eq!(h.bridge.state().speed, SpeedLevel::L2);

    // 第一个内圈样本只建立基准
    assert!(h.cycle_with([RawEvent::jog(0)]).is_empty());

    assert_eq!(
        h.cycle_with([RawEvent::jog(1)]),
        ["send /dev/ttyACM0 G91 G0 Z0.010\nG90\n"]
    );
}

#[test]
fn test_jog_steps_flushed_in_order_within_one_cycle() {
    let mut h = Harness::new(fast_config());
    h.bring_up();
    h.cycle_with([RawEvent::jog(250)]);

    let sent = h.cycle_with([RawEvent::jog(4), RawEvent::jog(2)]);
    let forward = "send /dev/ttyACM0 G91 G0 X1.000\nG90\n";
    let backward = "send /dev/ttyACM0 G91 G0 X-1.000\nG90\n";
    let mut expected = vec![forward; 10];
    expected.extend([backward; 2]);
    assert_eq!(sent, expected);
}

#[test]
fn test_continuous_resend_once_per_cycle() {
    let mut h = Harness::new(fast_config());
    h.bring_up();

    let shuttle_cmd = "send /dev/ttyACM0 G91 G1 F1071.429 X1.893\nG90\n";
    assert_eq!(h.cycle_with([RawEvent::shuttle(5)]), [shuttle_cmd]);
    assert!(h.bridge.state().pending.continuous);

    for _ in 0..3 {
        assert_eq!(h.cycle_with([]), [shuttle_cmd]);
    }

    // 回中：本周期清空重发副本，此后不再发送
    assert!(h.cycle_with([RawEvent::shuttle(0)]).is_empty());
    assert!(!h.bridge.state().pending.continuous);
    assert!(h.cycle_with([]).is_empty());
    assert!(h.bridge.state().queue.is_empty());
}

#[test]
fn test_jog_preempts_continuous_resend() {
    // 避免慢速机器上触发补发回中
    let mut h = Harness::new(BridgeConfig {
        synthetic_zero_delay_ms: 60_000,
        ..fast_config()
    });
    h.bring_up();
    h.cycle_with([RawEvent::jog(0), RawEvent::shuttle(5)]);

    // 重发副本被新的点动替换，但连续重发仍然有效
    let sent = h.cycle_with([RawEvent::jog(1)]);
    assert_eq!(sent, ["send /dev/ttyACM0 G91 G0 X1.000\nG90\n"]);
    assert!(h.bridge.state().pending.continuous);
    assert_eq!(h.bridge.state().queue.len(), 1);
}

#[test]
fn test_synthetic_zero_after_quiet_shuttle() {
    let mut h = Harness::new(fast_config());
    h.bring_up();
    h.cycle_with([RawEvent::jog(10), RawEvent::shuttle(5)]);
    assert!(h.bridge.state().pending.continuous);

    std::thread::sleep(Duration::from_millis(20));

    // 外圈回中时设备只上报了一个内圈事件
    let sent = h.cycle_with([RawEvent::jog(11)]);
    assert!(sent.is_empty());
    assert!(!h.bridge.state().pending.continuous);
    assert!(!h.bridge.state().shuttle.synthetic_zero_expected);
    assert!(h.cycle_with([]).is_empty());
}

#[test]
fn test_send_shortfall_reconnects_without_replay() {
    let mut h = Harness::new(fast_config());
    h.bring_up();
    h.cycle_with([RawEvent::jog(0)]);

    h.backend.accept_at_most(1);
    h.device.push_events([RawEvent::jog(3)]);
    assert_eq!(h.tick(), BridgeState::Reconnecting);
    assert!(!h.bridge.state().connection.transport_connected);
    assert_eq!(h.backend.take_sent().len(), 1);

    assert_eq!(h.tick(), BridgeState::TransportConnecting);
    let state = h.bridge.state();
    assert!(state.queue.is_empty());
    assert!(!state.pending.continuous);
    assert!(!state.connection.device_connected);
    assert!(!state.connection.transport_connected);
    assert!(!h.backend.is_connected());
    assert_eq!(h.device.closes(), 1);
    // 内圈基准跨重连保留
    assert_eq!(state.jog.last, Some(3));

    h.backend.accept_all();
    h.bring_up();
    assert_eq!(h.device.opens(), 2);
    // 未发出的命令不会重放
    assert!(h.cycle_with([]).is_empty());
}

#[test]
fn test_shortfall_stops_continuous_resend() {
    let mut h = Harness::new(fast_config());
    h.bring_up();
    h.cycle_with([RawEvent::shuttle(-6)]);

    h.backend.accept_at_most(0);
    assert_eq!(h.tick(), BridgeState::Reconnecting);
    assert_eq!(h.tick(), BridgeState::TransportConnecting);
    assert!(!h.bridge.state().pending.continuous);

    h.backend.accept_all();
    h.bring_up();
    assert!(h.cycle_with([]).is_empty());
}

#[test]
fn test_input_errors_reconnect() {
    let mut h = Harness::new(fast_config());
    h.bring_up();

    h.device.push_read_error();
    assert_eq!(h.tick(), BridgeState::Reconnecting);
    assert_eq!(h.tick(), BridgeState::TransportConnecting);
    h.bring_up();

    h.device.push_short_read(7);
    assert_eq!(h.tick(), BridgeState::Reconnecting);
    assert_eq!(h.backend.disconnects(), 1);
}

#[test]
fn test_events_before_read_error_are_decoded() {
    let mut h = Harness::new(fast_config());
    h.bring_up();

    h.device.push_event(RawEvent::key(KeyCode::YAxis, 1));
    h.device.push_read_error();
    assert_eq!(h.tick(), BridgeState::Reconnecting);
    assert_eq!(h.bridge.state().axis, ActiveAxis::Y);
    // 队列在重连时清空，广播未发出
    assert!(h.backend.take_sent().is_empty());
}

#[test]
fn test_reconnect_handle() {
    let mut h = Harness::new(fast_config());
    h.bring_up();

    let handle = h.bridge.reconnect_handle();
    handle.request();
    assert_eq!(h.tick(), BridgeState::Reconnecting);
    assert!(h.bridge.state().connection.reconnect_requested);

    assert_eq!(h.tick(), BridgeState::TransportConnecting);
    assert_eq!(h.tick(), BridgeState::DeviceConnecting);
    assert!(!handle.is_requested());
    assert!(!h.bridge.state().connection.reconnect_requested);
    assert_eq!(h.tick(), BridgeState::Running);
    assert_eq!(h.tick(), BridgeState::Running);
}

#[test]
fn test_teardown_waits_before_reconnecting() {
    let mut h = Harness::new(BridgeConfig {
        device_retry_ms: 40,
        ..fast_config()
    });
    h.bring_up();

    h.bridge.reconnect_handle().request();
    assert_eq!(h.tick(), BridgeState::Reconnecting);

    let started = Instant::now();
    assert_eq!(h.tick(), BridgeState::TransportConnecting);
    assert!(started.elapsed() >= Duration::from_millis(40));
    assert!(!h.backend.is_connected());
}

#[test]
fn test_aux_input_controls() {
    let (tx, rx) = mpsc::channel();
    let mut h = Harness::with_builder(
        BridgeBuilder::new(DEVICE)
            .config(fast_config())
            .aux_input(rx),
    );
    h.bring_up();
    h.cycle_with([RawEvent::shuttle(4)]);

    tx.send(AuxEvent::FeedHold).unwrap();
    assert_eq!(h.cycle_with([]), ["send /dev/ttyACM0 !\n"]);
    assert!(!h.bridge.state().pending.continuous);

    tx.send(AuxEvent::Resume).unwrap();
    assert_eq!(h.cycle_with([]), ["send /dev/ttyACM0 ~\n"]);

    // 同一周期内后到的控制命令抢占先到的
    tx.send(AuxEvent::FeedHold).unwrap();
    tx.send(AuxEvent::SoftReset).unwrap();
    assert_eq!(h.cycle_with([]), ["send /dev/ttyACM0 \x18\n"]);

    tx.send(AuxEvent::Reconnect).unwrap();
    assert_eq!(h.tick(), BridgeState::Reconnecting);
}

#[test]
fn test_http_dialect() {
    let config = BridgeConfig {
        dialect: Dialect::Http,
        host: "cnc".into(),
        port: 8080,
        ..fast_config()
    };
    let (input, device) = MockInputSource::new();
    let (sink, backend) = MockSink::connectionless();
    let mut bridge = BridgeBuilder::new(DEVICE)
        .config(config)
        .build(input, sink)
        .unwrap();

    assert_eq!(bridge.tick().unwrap(), BridgeState::DeviceConnecting);
    assert_eq!(bridge.tick().unwrap(), BridgeState::Running);

    device.push_events([RawEvent::key(KeyCode::XAxis, 1), RawEvent::shuttle(7)]);
    bridge.tick().unwrap();
    assert_eq!(
        backend.take_sent(),
        ["http://cnc:8080/send?gcode=G91G1F1500.000X2.650%0DG90"]
    );

    // 按键在 HTTP 方言下没有广播
    device.push_event(RawEvent::key(KeyCode::AAxis, 1));
    bridge.tick().unwrap();
    assert!(backend.take_sent().is_empty());
    assert!(!bridge.state().pending.continuous);
}

#[test]
fn test_jog_burst_capped_at_queue_capacity() {
    let mut h = Harness::new(fast_config());
    h.bring_up();
    h.cycle_with([RawEvent::jog(0)]);

    // 每个样本回绕 128 格，共 384 步，超过默认容量 256
    let sent = h.cycle_with([RawEvent::jog(128), RawEvent::jog(0), RawEvent::jog(128)]);
    assert_eq!(sent.len(), 256);
    assert!(
        sent.iter()
            .all(|c| c == "send /dev/ttyACM0 G91 G0 X-1.000\nG90\n")
    );

    // 主循环继续运行
    let sent = h.cycle_with([RawEvent::jog(129)]);
    assert_eq!(sent, ["send /dev/ttyACM0 G91 G0 X1.000\nG90\n"]);
}

#[test]
fn test_jog_burst_with_small_queue() {
    let mut h = Harness::new(BridgeConfig {
        queue_capacity: 4,
        ..fast_config()
    });
    h.bring_up();
    h.cycle_with([RawEvent::jog(0)]);

    let sent = h.cycle_with([RawEvent::jog(10)]);
    assert_eq!(sent.len(), 4);
    assert_eq!(h.bridge.phase(), BridgeState::Running);
}

#[derive(Clone, Default)]
struct RecordingIndicator {
    updates: Arc<Mutex<Vec<IndicatorStatus>>>,
}

impl StatusIndicator for RecordingIndicator {
    fn update(&mut self, status: &IndicatorStatus) {
        self.updates.lock().unwrap().push(*status);
    }
}

#[test]
fn test_indicator_follows_connection_state() {
    let indicator = RecordingIndicator::default();
    let updates = indicator.updates.clone();
    let mut h = Harness::with_builder(
        BridgeBuilder::new(DEVICE)
            .config(fast_config())
            .indicator(indicator),
    );

    h.bring_up();
    h.cycle_with([RawEvent::key(KeyCode::ZAxis, 1)]);
    {
        let updates = updates.lock().unwrap();
        let last = updates.last().unwrap();
        assert!(last.device_connected && last.transport_connected);
        assert_eq!(last.axis, ActiveAxis::Z);
    }

    h.device.push_read_error();
    h.tick();
    h.tick();
    let updates = updates.lock().unwrap();
    let last = updates.last().unwrap();
    assert!(!last.device_connected && !last.transport_connected);
}
