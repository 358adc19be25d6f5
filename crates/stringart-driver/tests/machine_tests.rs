//! 节拍线程集成测试
//!
//! 使用 1kHz 节拍缩短测试时间；涉及墙钟的测试串行执行。

use serial_test::serial;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use stringart_driver::{
    Axis, Direction, MachineBuilder, MotionEvent, RecordingSink, TableAxis,
};
use stringart_tools::MachineConfig;

fn fast_config() -> MachineConfig {
    let mut config = MachineConfig::default();
    config.tick.rate_hz = 1000;
    config.stepper.micro_steps = 1;
    config
}

#[test]
#[serial]
fn test_tick_rate_is_respected() {
    let machine = MachineBuilder::new().tick_rate(200).build().unwrap();
    thread::sleep(Duration::from_millis(250));
    let ticks = machine.metrics().ticks;
    // 200Hz × 0.25s ≈ 50 拍，允许调度抖动
    assert!((25..=75).contains(&ticks), "ticks = {}", ticks);
}

#[test]
#[serial]
fn test_table_move_emits_one_event_per_step() {
    let (sink, rx) = RecordingSink::new();
    let machine = MachineBuilder::new()
        .config(fast_config())
        .callback(Arc::new(sink))
        .build()
        .unwrap();

    // 1.8° 步距，-9° -> 5 步顺时针
    machine.move_table_to(-9.0).unwrap();
    assert!(machine.wait_idle());

    let events: Vec<MotionEvent> = rx.try_iter().collect();
    let steps: Vec<&MotionEvent> = events
        .iter()
        .filter(|e| matches!(e, MotionEvent::TableStep { .. }))
        .collect();
    assert_eq!(steps.len(), 5);
    assert!(steps.iter().all(|e| matches!(
        e,
        MotionEvent::TableStep {
            direction: Direction::Cw,
            ..
        }
    )));
    assert!(matches!(
        events.last(),
        Some(MotionEvent::MotionComplete {
            axis: Axis::Table,
            ..
        })
    ));

    // 事件节拍严格递增
    let ticks: Vec<u64> = steps.iter().map(|e| e.tick()).collect();
    assert!(ticks.windows(2).all(|w| w[0] < w[1]));

    let snapshot = machine.snapshot();
    assert!((snapshot.table_angle - 351.0).abs() < 1e-9);
    assert_eq!(snapshot.table_net_steps, -5);
}

#[test]
#[serial]
fn test_arm_move_duration_follows_servo_speed() {
    let machine = MachineBuilder::new().config(fast_config()).build().unwrap();

    // 60° 需要 0.17s
    let start = Instant::now();
    machine.arm_to_angle(60.0).unwrap();
    assert!(machine.wait_idle());
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(150), "{:?}", elapsed);
    assert!(elapsed < Duration::from_millis(600), "{:?}", elapsed);
    assert_eq!(machine.snapshot().arm_angle, 60.0);
}

#[test]
#[serial]
fn test_later_command_replaces_pending_one() {
    let machine = MachineBuilder::new().config(fast_config()).build().unwrap();
    let table = machine.table_handle();

    table.begin_rotation(180.0).unwrap();
    thread::sleep(Duration::from_millis(20));
    table.begin_rotation(0.0).unwrap();
    assert!(table.wait_idle());

    let snapshot = machine.snapshot();
    assert!(snapshot.table_angle.abs() < 1e-9 || (snapshot.table_angle - 360.0).abs() < 1e-9);
    assert_eq!(snapshot.table_net_steps, 0);
}

#[test]
#[serial]
fn test_snapshot_matches_config_geometry() {
    let config = fast_config();
    let machine = MachineBuilder::new().config(config.clone()).build().unwrap();
    let snapshot = machine.snapshot();
    let table = TableAxis::from_config(&config);

    assert_eq!(snapshot.table_origin, table.origin());
    assert_eq!(snapshot.table_radius, config.table.radius);
    assert_eq!(snapshot.pin_count, config.table.pin_count);
    assert_eq!(snapshot.arm_origin, config.arm_origin());
    assert_eq!(snapshot.needle_length, config.arm.needle_length);
}
