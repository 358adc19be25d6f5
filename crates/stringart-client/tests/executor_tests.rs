//! 执行器集成测试：指令顺序与轴互斥
//!
//! 下一条指令只能在上一条指令的运动全部结束后下发，
//! 因此录制到的运动事件按轴分段，段与段之间不会交错。

use serial_test::serial;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};
use stringart_client::{ExecError, ExecutionEvent, Executor, ExecutorConfig};
use stringart_driver::{Axis, MachineBuilder, MotionEvent, RecordingSink};
use stringart_protocol::parse_program;
use stringart_tools::MachineConfig;

fn fast_config() -> MachineConfig {
    let mut config = MachineConfig::default();
    config.tick.rate_hz = 1000;
    // 1.8° 整步，缩短转台运动
    config.stepper.micro_steps = 1;
    config
}

fn event_axis(event: &MotionEvent) -> Axis {
    match event {
        MotionEvent::ArmMoved { .. } => Axis::Arm,
        MotionEvent::TableStep { .. } => Axis::Table,
        MotionEvent::MotionComplete { axis, .. } => *axis,
    }
}

#[test]
#[serial]
fn test_motions_never_overlap_between_instructions() {
    let (sink, rx) = RecordingSink::new();
    let machine = MachineBuilder::new()
        .config(fast_config())
        .callback(Arc::new(sink))
        .build()
        .unwrap();

    let program = parse_program(
        "\
ROT i1 a30 s100 abs1
ROT i0 a18 s100 abs1
ROT i1 a0 s100 abs1
ROT i0 a0 s100 abs1
",
    )
    .unwrap();

    let mut executor = Executor::builder().bind_machine(&machine).build().unwrap();
    let report = executor.run_program(&program).unwrap();
    assert!(report.is_complete());

    let events: Vec<MotionEvent> = rx.try_iter().collect();

    // 按轴切段
    let mut segments: Vec<(Axis, Vec<&MotionEvent>)> = Vec::new();
    for event in &events {
        let axis = event_axis(event);
        match segments.last_mut() {
            Some((last, list)) if *last == axis => list.push(event),
            _ => segments.push((axis, vec![event])),
        }
    }

    let axes: Vec<Axis> = segments.iter().map(|(a, _)| *a).collect();
    assert_eq!(axes, vec![Axis::Arm, Axis::Table, Axis::Arm, Axis::Table]);

    // 每段都以完成事件结束
    for (axis, list) in &segments {
        assert!(
            matches!(list.last(), Some(MotionEvent::MotionComplete { axis: a, .. }) if a == axis),
            "segment for {} did not end with completion",
            axis
        );
    }

    // 下一段的第一拍晚于上一段的完成拍
    for pair in segments.windows(2) {
        let done = pair[0].1.last().map(|e| e.tick()).unwrap();
        let next = pair[1].1.first().map(|e| e.tick()).unwrap();
        assert!(next > done, "segment started at tick {} before {}", next, done);
    }

    let snapshot = machine.snapshot();
    assert_eq!(snapshot.arm_angle, 0.0);
    assert_eq!(snapshot.table_net_steps, 0);
    assert_eq!(machine.command_label().get().as_str(), "ROT i0 a0.0 s100 abs1");
}

#[test]
#[serial]
fn test_sleep_blocks_next_instruction() {
    let machine = MachineBuilder::new().config(fast_config()).build().unwrap();
    let program = parse_program("SP d60\nSP d60\n").unwrap();

    let mut executor = Executor::builder().bind_machine(&machine).build().unwrap();
    let start = Instant::now();
    let report = executor.run_program(&program).unwrap();

    assert_eq!(report.executed, 2);
    assert!(start.elapsed() >= Duration::from_millis(120));
}

#[test]
#[serial]
fn test_start_delay_is_applied() {
    let machine = MachineBuilder::new().config(fast_config()).build().unwrap();
    let mut executor = Executor::builder()
        .bind_machine(&machine)
        .config(ExecutorConfig {
            continue_on_error: false,
            start_delay: Some(Duration::from_millis(50)),
        })
        .build()
        .unwrap();

    let report = executor.run(&[]).unwrap();
    assert_eq!(report.total, 0);
    assert!(report.duration >= Duration::from_millis(50));
}

#[test]
#[serial]
fn test_stop_mid_program_halts_without_rollback() {
    let machine = MachineBuilder::new().config(fast_config()).build().unwrap();
    let running = machine.running_flag();
    let (tx, rx) = crossbeam_channel::bounded(64);

    // 转台 180° = 100 步 ≈ 0.1s，第二条指令开始前就会被停止
    let program = parse_program("ROT i0 a180 s1 abs1\nROT i0 a0 s1 abs1\nSP d1\n").unwrap();
    let mut executor = Executor::builder()
        .bind_machine(&machine)
        .events(tx)
        .build()
        .unwrap();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(30));
        running.store(false, Ordering::Release);
    });

    let report = executor.run_program(&program).unwrap();
    stopper.join().unwrap();

    assert!(report.halted);
    assert_eq!(report.executed, 1);

    let dispatched = rx
        .try_iter()
        .filter(|e| matches!(e, ExecutionEvent::Dispatched { .. }))
        .count();
    assert_eq!(dispatched, 1);

    // 停在半路，不回到 0°
    let angle = machine.snapshot().table_angle;
    assert!(angle > 0.0 && angle < 180.0, "table at {}", angle);
}

#[test]
#[serial]
fn test_failed_instruction_error_chain() {
    let machine = MachineBuilder::new().config(fast_config()).build().unwrap();
    let program = parse_program("PN p10 r20\n").unwrap();
    let mut executor = Executor::builder().bind_machine(&machine).build().unwrap();

    let err = executor.run_program(&program).unwrap_err();
    assert!(matches!(err, ExecError::Aborted { index: 0, .. }));
    let source = std::error::Error::source(&err).unwrap();
    assert_eq!(source.to_string(), "PN instruction is not implemented");
}
