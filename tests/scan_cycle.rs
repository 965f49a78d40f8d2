mod common;

use std::thread;
use std::time::{Duration, Instant};

use common::{Call, FakeDevice};
use wago_io::{
    scan_position, CancellationToken, ControllerConfig, ControllerState, DemoPattern, InputImage,
    OutputGenerator, OutputImage, RegisterSpace, ScanController, WagoError,
};

fn fast() -> ControllerConfig {
    ControllerConfig::default().with_interval(Duration::ZERO)
}

fn connected(device: FakeDevice, config: ControllerConfig) -> ScanController<FakeDevice> {
    let mut controller = ScanController::new(device, config);
    controller.connect().unwrap();
    controller
}

#[test]
fn test_write_failure_is_reported_once_and_loop_continues() {
    let device = FakeDevice {
        failing_writes: vec![1],
        ..Default::default()
    };
    let mut controller = connected(device, fast().with_max_cycles(4));

    let mut failed_cycles = Vec::new();
    let summary = controller
        .run(DemoPattern::default(), &CancellationToken::new(), |report| {
            if let Err(e) = &report.write {
                assert!(e.is_transport());
                failed_cycles.push(report.cycle);
            }
        })
        .unwrap();

    assert_eq!(failed_cycles, vec![1]);
    assert_eq!(summary.cycles, 4);
    assert_eq!(summary.write_failures, 1);
    assert!(summary.safe_state_written);
    assert_eq!(controller.state(), ControllerState::Closed);
    // Four cycle writes plus the safe-state write.
    assert_eq!(controller.transport().written_images().len(), 5);
}

#[test]
fn test_cancel_mid_loop_writes_safe_state_once_then_closes() {
    let mut controller = connected(FakeDevice::default(), fast());
    let token = CancellationToken::new();

    let summary = controller
        .run(DemoPattern::default(), &token, |report| {
            if report.cycle == 2 {
                token.cancel();
            }
        })
        .unwrap();

    assert_eq!(summary.cycles, 3);
    assert!(summary.safe_state_written);

    let device = controller.transport();
    let writes: Vec<usize> = device
        .calls
        .iter()
        .enumerate()
        .filter(|(_, call)| matches!(call, Call::WriteWords(..)))
        .map(|(i, _)| i)
        .collect();
    assert_eq!(writes.len(), 4);

    let last_write = *writes.last().unwrap();
    assert_eq!(device.calls[last_write], Call::WriteWords(0, vec![0, 0, 0]));
    assert_eq!(&device.calls[last_write + 1..], &[Call::Close]);
    assert_eq!(device.output_words(), [0, 0, 0]);
}

#[test]
fn test_cancel_from_another_thread_interrupts_pause() {
    let config = ControllerConfig::default().with_interval(Duration::from_secs(30));
    let mut controller = connected(FakeDevice::default(), config);
    let token = CancellationToken::new();

    let remote = token.clone();
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        remote.cancel();
    });

    let started = Instant::now();
    let summary = controller
        .run(DemoPattern::default(), &token, |_| {})
        .unwrap();
    canceller.join().unwrap();

    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(summary.cycles, 1);
    assert_eq!(
        controller.transport().written_images().last(),
        Some(&vec![0, 0, 0])
    );
}

#[test]
fn test_safe_state_write_failure_is_tolerated() {
    // The third write is the safe-state write after two cycles.
    let device = FakeDevice {
        failing_writes: vec![2],
        ..Default::default()
    };
    let mut controller = connected(device, fast().with_max_cycles(2));

    let summary = controller
        .run(DemoPattern::default(), &CancellationToken::new(), |_| {})
        .unwrap();

    assert_eq!(summary.write_failures, 0);
    assert!(!summary.safe_state_written);
    assert_eq!(controller.state(), ControllerState::Closed);
    assert_eq!(controller.transport().calls.last(), Some(&Call::Close));
}

#[test]
fn test_connect_failure_then_retry() {
    let device = FakeDevice {
        connect_failures: 1,
        ..Default::default()
    };
    let mut controller = ScanController::new(device, fast());

    assert!(matches!(
        controller.connect(),
        Err(WagoError::Connection { .. })
    ));
    assert_eq!(controller.state(), ControllerState::Idle);

    controller.connect().unwrap();
    assert_eq!(controller.state(), ControllerState::Connected);
}

#[test]
fn test_each_cycle_is_one_write_and_whole_image_reads() {
    let mut controller = connected(FakeDevice::default(), fast().with_max_cycles(1));
    controller
        .run(DemoPattern::default(), &CancellationToken::new(), |_| {})
        .unwrap();

    let calls = &controller.transport().calls;
    assert_eq!(
        calls[1..4],
        [
            Call::WriteWords(0, DemoPattern::default().next_outputs(0, None).to_words()),
            Call::ReadWords(RegisterSpace::HoldingRegister, 0, 3),
            Call::ReadWords(RegisterSpace::InputRegister, 0, 9),
        ]
    );
}

#[test]
fn test_read_back_failure_is_not_fatal() {
    let device = FakeDevice {
        failing_reads: vec![0, 1],
        ..Default::default()
    };
    let mut controller = connected(device, fast().with_max_cycles(3));

    let mut healthy = Vec::new();
    let summary = controller
        .run(DemoPattern::default(), &CancellationToken::new(), |report| {
            healthy.push(report.is_ok());
        })
        .unwrap();

    assert_eq!(healthy, vec![false, true, true]);
    assert_eq!(summary.read_failures, 2);
    assert_eq!(summary.write_failures, 0);
}

#[test]
fn test_malformed_input_image_ends_run_safely() {
    let device = FakeDevice {
        input: vec![0; 8],
        ..Default::default()
    };
    let mut controller = connected(device, fast());

    let result = controller.run(DemoPattern::default(), &CancellationToken::new(), |_| {});

    assert!(matches!(
        result,
        Err(WagoError::MalformedImage {
            expected: 9,
            actual: 8,
            ..
        })
    ));
    assert_eq!(controller.state(), ControllerState::Closed);
    assert_eq!(
        controller.transport().written_images().last(),
        Some(&vec![0, 0, 0])
    );
}

#[test]
fn test_generator_sees_previous_inputs() {
    let mut controller = connected(FakeDevice::default(), fast().with_max_cycles(2));
    let mut seen = Vec::new();

    let generator = |cycle: u64, inputs: Option<&InputImage>| {
        seen.push((cycle, inputs.map(|image| image.analog[3])));
        OutputImage::safe()
    };
    controller
        .run(generator, &CancellationToken::new(), |_| {})
        .unwrap();

    assert_eq!(seen, vec![(0, None), (1, Some(32767))]);
    assert_eq!(controller.last_inputs().map(|i| i.discrete(2)), Some(Some(true)));
}

#[test]
fn test_demo_pattern_scans_discrete_outputs() {
    let mut controller = connected(
        FakeDevice::default(),
        fast().with_max_cycles(14).with_read_back(false),
    );
    controller
        .run(DemoPattern::default(), &CancellationToken::new(), |_| {})
        .unwrap();

    let images = controller.transport().written_images();
    for (cycle, words) in images.iter().take(14).enumerate() {
        assert_eq!(words[2], 1 << scan_position(cycle as u64, 8));
    }
    // Without read-back only writes reach the device.
    assert!(controller
        .transport()
        .calls
        .iter()
        .all(|call| !matches!(call, Call::ReadWords(..))));
}
