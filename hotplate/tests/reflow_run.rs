//! Scripted end-to-end runs through the assembled controller, with the
//! electrical measurements played back from fixed values rather than a
//! thermal simulation.

use hotplate::{
    BangBangConfig, CalibrationConfig, CalibrationSequencer, EstimatorConfig, Measurement,
    PowerController, Predictor, ProfileSequencer, ReflowController, RtdEstimator, SampleKind,
    Sequencer, Stage,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Linear element: 1.0 Ω at 25 °C rising to 2.0 Ω at 275 °C.
fn measurement_at(temperature: f64) -> Measurement {
    let resistance = 1.0 + (temperature - 25.0) / 250.0;
    // Sense current fixed at 2 A.
    Measurement::new(2.0 * resistance, 2.0)
}

fn reflow_stages() -> Vec<Stage> {
    vec![
        Stage::new("preheat", 100.0, 30.0),
        Stage::new("soak", 175.0, 120.0),
        Stage::new("reflow", 205.0, 30.0),
        Stage::new("hold", 205.0, 10.0),
        Stage::new("cool", 100.0, 120.0),
    ]
}

fn profile_controller() -> ReflowController {
    let mut estimator = RtdEstimator::new(EstimatorConfig::default());
    estimator.add_calibration_point(1.0, 25.0);
    estimator.add_calibration_point(2.0, 275.0);
    ReflowController::new(
        estimator,
        Predictor::single(40.0),
        PowerController::bang_bang(BangBangConfig::default()),
        Sequencer::Profile(ProfileSequencer::new(reflow_stages()).expect("profile")),
    )
}

#[test]
fn test_first_tick_targets_interpolated_ramp_point() {
    init_logging();
    let mut controller = profile_controller();

    let outcome = controller.tick(0.0, 1.5, measurement_at(25.0));
    assert!(outcome.running);
    // Cold plate, ramping profile: full power.
    assert_eq!(outcome.power, Some(100.0));

    let sample = controller.log().get(outcome.sample).expect("sample");
    assert_eq!(sample.stage.as_deref(), Some("preheat"));
    // 25 + 1.5/30 * (100 - 25)
    let target = sample.then_temperature.expect("target");
    assert!((target - 28.75).abs() < 1e-9);
}

#[test]
fn test_stage_names_follow_elapsed_time() {
    init_logging();
    let mut controller = profile_controller();

    let cases = [
        (10.0, "preheat"),
        (60.0, "soak"),
        (160.0, "reflow"),
        (182.0, "hold"),
        (250.0, "cool"),
    ];
    for (now, stage) in cases {
        let outcome = controller.tick(now, 1.5, measurement_at(150.0));
        assert!(outcome.running);
        let sample = controller.log().get(outcome.sample).expect("sample");
        assert_eq!(sample.stage.as_deref(), Some(stage), "at t={now}");
    }
}

#[test]
fn test_run_completes_past_final_stage() {
    init_logging();
    let mut controller = profile_controller();

    let outcome = controller.tick(311.0, 1.5, measurement_at(90.0));
    assert!(!outcome.running);
    assert_eq!(outcome.power, Some(0.0));
}

#[test]
fn test_unmeasurable_tick_holds_and_logs() {
    init_logging();
    let mut controller = profile_controller();
    controller.tick(0.0, 1.5, measurement_at(25.0));

    // Sense current collapses; the controller must not command anything.
    let outcome = controller.tick(1.5, 1.5, Measurement::new(0.0, 0.0));
    assert!(outcome.running);
    assert_eq!(outcome.power, None);
    // The blind tick is still on the record.
    assert_eq!(controller.log().len(), 2);

    // Recovery on the next good measurement.
    let outcome = controller.tick(3.0, 1.5, measurement_at(26.0));
    assert_eq!(outcome.power, Some(100.0));
}

#[test]
fn test_interrupt_then_abort_ends_the_run() {
    init_logging();
    let mut controller = profile_controller();
    controller.tick(0.0, 1.5, measurement_at(25.0));

    controller.interrupt(0.9);
    controller.abort();

    let outcome = controller.tick(1.5, 1.5, measurement_at(26.0));
    assert!(!outcome.running);
    assert_eq!(outcome.power, Some(0.0));

    let event = controller
        .log()
        .latest(SampleKind::Interactive)
        .expect("interactive sample");
    assert_eq!(event.stage.as_deref(), Some("interrupt"));
}

#[test]
fn test_calibration_run_walks_the_ladder() {
    init_logging();
    let mut estimator = RtdEstimator::new(EstimatorConfig::default());
    estimator.add_calibration_point(1.0, 25.0);
    estimator.add_calibration_point(2.0, 275.0);
    let mut controller = ReflowController::new(
        estimator,
        Predictor::single(40.0),
        PowerController::bang_bang(BangBangConfig::default()),
        Sequencer::Calibration(CalibrationSequencer::new(CalibrationConfig {
            power_step: 10.0,
            step_duration: 450.0,
            max_steps: 4,
        })),
    );

    let expected = [
        (0.0, Some(10.0), "rising-10"),
        (450.0, Some(20.0), "rising-20"),
        (900.0, Some(10.0), "falling-10"),
        (1350.0, Some(30.0), "rising-30"),
    ];
    for (now, power, stage) in expected {
        let outcome = controller.tick(now, 1.5, measurement_at(80.0));
        assert!(outcome.running);
        assert_eq!(outcome.power, power);
        let sample = controller.log().get(outcome.sample).expect("sample");
        assert_eq!(sample.stage.as_deref(), Some(stage));
    }

    let outcome = controller.tick(1800.0, 1.5, measurement_at(80.0));
    assert!(!outcome.running);
    assert_eq!(outcome.power, Some(0.0));
}
