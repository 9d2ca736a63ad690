mod common;

use std::time::Duration;

use gazeproctor_lib::models::SessionStatus;
use gazeproctor_lib::{
    CalibrationPhase, ClickOutcome, EnvironmentStatus, GazeSample, ScriptedEstimator,
};

use common::{
    calibrate, controller_with, wait_for_cursor, wait_for_samples, wait_until, zip_names,
    zip_text, GatedCapture, RecordingEstimator,
};

#[tokio::test]
async fn off_screen_excursion_ends_up_in_the_archive() {
    let feeder = ScriptedEstimator::new();
    let controller = controller_with(Box::new(feeder.clone()), true);
    assert_eq!(controller.start().await.unwrap(), EnvironmentStatus::Ready);

    calibrate(&controller).await;
    controller.start_exam().await.unwrap();

    feeder.push([
        GazeSample::new(1050.0, 400.0, 12.3),
        GazeSample::new(500.0, 400.0, 12.4),
    ]);
    wait_for_samples(&controller, 2).await;

    let events = controller.events().await;
    assert!(events[0].off_screen);
    assert_eq!(events[0].snapshot_id(), Some("snapshot_1.jpg"));
    assert!(!events[1].off_screen);
    assert!(events[1].snapshot.is_none());
    assert_eq!(controller.summary().await.off_screen, 1);

    controller.stop_exam().await.unwrap();
    let report = controller.download_report().await.unwrap();
    assert_eq!(report.file_name, "proctoring_report.zip");

    assert_eq!(
        zip_names(&report.bytes),
        vec![
            "heatmap_with_screen_outline.png",
            "report.txt",
            "snapshots/",
            "snapshots/snapshot_1.jpg",
        ]
    );

    let text = zip_text(&report.bytes, "report.txt");
    assert!(text.contains("Total off-screen events: 1"));
    let event_lines: Vec<&str> = text.lines().filter(|line| line.starts_with("1. ")).collect();
    assert_eq!(event_lines.len(), 1);
    assert!(event_lines[0].contains("(1050, 400)"));
    assert!(event_lines[0].ends_with("snapshot: snapshot_1.jpg"));
    assert!(!text.contains("(500, 400)"));

    controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn samples_outside_an_exam_are_not_logged() {
    let feeder = ScriptedEstimator::new();
    let controller = controller_with(Box::new(feeder.clone()), false);
    controller.start().await.unwrap();

    feeder.push([GazeSample::new(-10.0, -10.0, 1.0), GazeSample::new(20.0, 20.0, 2.0)]);
    wait_for_cursor(&controller, (20, 20)).await;

    let snapshot = controller.get_snapshot().await;
    assert_eq!(snapshot.summary.total_samples, 0);

    calibrate(&controller).await;
    controller.start_exam().await.unwrap();
    feeder.push((0..25).map(|i| GazeSample::new(i as f64 * 50.0, 10.0, i as f64)));
    wait_for_samples(&controller, 25).await;

    controller.stop_exam().await.unwrap();
    feeder.push([GazeSample::new(-5.0, -5.0, 99.0)]);
    controller.handle_sample(GazeSample::new(-5.0, -5.0, 100.0)).await;

    let summary = controller.summary().await;
    assert_eq!(summary.total_samples, 25);
    // x = 1050.. 1200 are past the 1000px edge
    assert_eq!(summary.off_screen, 4);
    assert_eq!(summary.capture_gaps, 4);
    controller.shutdown().await.unwrap();
}

#[tokio::test]
async fn missing_camera_gives_text_and_heatmap_only() {
    let controller = controller_with(Box::new(ScriptedEstimator::new()), false);
    calibrate(&controller).await;
    controller.start_exam().await.unwrap();

    controller.handle_sample(GazeSample::new(-30.0, 200.0, 1.0)).await;
    controller.handle_sample(GazeSample::new(300.0, 900.0, 2.0)).await;
    controller.stop_exam().await.unwrap();

    let report = controller.download_report().await.unwrap();
    assert_eq!(
        zip_names(&report.bytes),
        vec!["heatmap_with_screen_outline.png", "report.txt", "snapshots/"]
    );
    let text = zip_text(&report.bytes, "report.txt");
    assert!(text.contains("Total off-screen events: 2"));
    assert!(!text.contains("snapshot:"));
}

#[tokio::test]
async fn exam_requires_completed_calibration() {
    let controller = controller_with(Box::new(ScriptedEstimator::new()), false);
    assert!(controller.start_exam().await.is_err());

    controller.start_calibration().await.unwrap();
    assert_eq!(controller.click_calibration_point(0).await, ClickOutcome::Advanced(1));
    assert_eq!(controller.click_calibration_point(2).await, ClickOutcome::Ignored);
    assert_eq!(
        controller.get_snapshot().await.calibration_phase,
        CalibrationPhase::InProgress(1)
    );
    assert!(controller.start_exam().await.is_err());

    for index in 1..9 {
        controller.click_calibration_point(index).await;
    }
    let snapshot = controller.get_snapshot().await;
    assert_eq!(snapshot.calibration_phase, CalibrationPhase::Complete);
    assert!(snapshot.calibration_points.is_empty());
    assert!(controller.start_exam().await.is_ok());
}

#[tokio::test]
async fn recalibrate_wipes_session_and_calibration() {
    let estimator = RecordingEstimator::default();
    let controller = controller_with(Box::new(estimator.clone()), true);
    controller.start().await.unwrap();
    calibrate(&controller).await;
    controller.start_exam().await.unwrap();
    for i in 0..10 {
        controller
            .handle_sample(GazeSample::new(-1.0 - i as f64, 0.0, i as f64))
            .await;
    }

    controller.recalibrate().await;

    let snapshot = controller.get_snapshot().await;
    assert_eq!(snapshot.calibration_phase, CalibrationPhase::NotStarted);
    assert_eq!(snapshot.summary.total_samples, 0);
    assert_eq!(snapshot.summary.off_screen, 0);
    assert!(estimator.calls().contains(&"clear_data".to_string()));
    assert!(controller.start_exam().await.is_err());

    // Snapshot numbering restarts with the next sitting.
    calibrate(&controller).await;
    controller.start_exam().await.unwrap();
    let event = controller
        .handle_sample(GazeSample::new(-1.0, 0.0, 1.0))
        .await
        .unwrap();
    assert_eq!(event.snapshot_id(), Some("snapshot_1.jpg"));
}

#[tokio::test]
async fn estimator_lifecycle_follows_commands() {
    let estimator = RecordingEstimator::default();
    let controller = controller_with(Box::new(estimator.clone()), false);
    controller.start().await.unwrap();
    calibrate(&controller).await;
    controller.start_exam().await.unwrap();
    controller.stop_exam().await.unwrap();
    controller.shutdown().await.unwrap();

    let calls = estimator.calls();
    let position = |name: &str| calls.iter().position(|c| c == name).unwrap();
    assert!(position("configure") < position("begin"));
    assert!(calls.contains(&"prediction_points:true".to_string()));
    assert!(calls.contains(&"prediction_points:false".to_string()));
    assert!(calls.contains(&"pause".to_string()));
    assert_eq!(calls.last().map(String::as_str), Some("end"));
}

#[tokio::test]
async fn failed_environment_blocks_exam() {
    let controller = controller_with(Box::new(RecordingEstimator::failing()), false);
    let status = controller.start().await.unwrap();
    assert!(matches!(status, EnvironmentStatus::Failed(ref message) if message.contains("webcam")));

    calibrate(&controller).await;
    let err = controller.start_exam().await.unwrap_err();
    assert!(err.to_string().contains("webcam access denied"));
    assert_eq!(controller.get_snapshot().await.environment, status);
}

#[tokio::test]
async fn report_needs_a_stopped_exam() {
    let controller = controller_with(Box::new(ScriptedEstimator::new()), false);
    assert!(controller.download_report().await.is_err());

    calibrate(&controller).await;
    controller.start_exam().await.unwrap();
    assert!(controller.download_report().await.is_err());
    assert!(controller.stop_exam().await.is_ok());
    assert!(controller.stop_exam().await.is_err());

    let report = controller.download_report().await.unwrap();
    let names = zip_names(&report.bytes);
    assert!(!names.contains(&"heatmap_with_screen_outline.png".to_string()));
    assert!(zip_text(&report.bytes, "report.txt").contains("No off-screen events recorded."));
}

#[tokio::test]
async fn live_heatmap_tracks_on_screen_gaze() {
    let controller = controller_with(Box::new(ScriptedEstimator::new()), false);
    calibrate(&controller).await;
    controller.start_exam().await.unwrap();
    controller.handle_sample(GazeSample::new(100.0, 100.0, 1.0)).await;
    controller.handle_sample(GazeSample::new(-100.0, 100.0, 2.0)).await;
    controller.handle_sample(GazeSample::new(100.0, 100.0, 3.0)).await;

    let data = controller.live_heatmap().await;
    assert_eq!(data.max, 100);
    assert_eq!(data.points.len(), 2);
    assert!(data.points.iter().all(|p| p.value == 10 && (p.x, p.y) == (100, 100)));
}

#[tokio::test]
async fn resize_changes_later_classification() {
    let controller = controller_with(Box::new(ScriptedEstimator::new()), false);
    calibrate(&controller).await;
    controller.start_exam().await.unwrap();

    let before = controller.handle_sample(GazeSample::new(900.0, 10.0, 1.0)).await.unwrap();
    controller.resize(800, 800).await;
    let after = controller.handle_sample(GazeSample::new(900.0, 10.0, 2.0)).await.unwrap();

    assert!(!before.off_screen);
    assert!(after.off_screen);
}

#[tokio::test]
async fn calibration_is_refused_during_an_exam() {
    let controller = controller_with(Box::new(ScriptedEstimator::new()), false);
    calibrate(&controller).await;
    controller.start_exam().await.unwrap();

    assert!(controller.start_calibration().await.is_err());

    let snapshot = controller.get_snapshot().await;
    assert_eq!(snapshot.calibration_phase, CalibrationPhase::Complete);
    assert!(!snapshot.overlay_visible);
    assert_eq!(snapshot.session.status, SessionStatus::Tracking);

    // Once stopped, recalibration is allowed again.
    controller.stop_exam().await.unwrap();
    let snapshot = controller.start_calibration().await.unwrap();
    assert_eq!(snapshot.calibration_phase, CalibrationPhase::InProgress(0));
    assert!(controller
        .handle_sample(GazeSample::new(-10.0, 5.0, 1.0))
        .await
        .is_none());
}

#[tokio::test]
async fn failed_resume_does_not_start_the_exam() {
    let estimator = RecordingEstimator::without_resume();
    let controller = controller_with(Box::new(estimator.clone()), false);
    assert_eq!(controller.start().await.unwrap(), EnvironmentStatus::Ready);
    calibrate(&controller).await;

    assert!(controller.start_exam().await.is_err());

    let snapshot = controller.get_snapshot().await;
    assert_eq!(snapshot.session.status, SessionStatus::Idle);
    assert!(snapshot.session.id.is_none());
    assert!(controller
        .handle_sample(GazeSample::new(-10.0, 5.0, 1.0))
        .await
        .is_none());
    assert_eq!(controller.summary().await.total_samples, 0);
    assert!(controller.stop_exam().await.is_err());
}

#[tokio::test]
async fn capture_runs_without_holding_the_proctor() {
    let controller = controller_with(Box::new(ScriptedEstimator::new()), false);
    let (capture, release) = GatedCapture::with_release();
    let started = capture.started.clone();
    controller.set_capture(Box::new(capture)).await;
    calibrate(&controller).await;
    controller.start_exam().await.unwrap();

    let sampler = controller.clone();
    let in_flight =
        tokio::spawn(async move { sampler.handle_sample(GazeSample::new(-5.0, 5.0, 1.0)).await });
    wait_until(&started).await;

    // Commands keep working while the frame is being captured.
    let snapshot = tokio::time::timeout(Duration::from_millis(500), controller.get_snapshot())
        .await
        .expect("proctor state stays available during capture");
    assert_eq!(snapshot.summary.total_samples, 0);
    assert!(controller
        .handle_sample(GazeSample::new(5.0, 5.0, 2.0))
        .await
        .is_some());

    release.send(()).unwrap();
    let event = in_flight.await.unwrap().expect("off-screen sample logged");
    assert!(event.off_screen);
    assert_eq!(event.snapshot_id(), Some("snapshot_1.jpg"));

    let summary = controller.summary().await;
    assert_eq!(summary.total_samples, 2);
    assert_eq!(summary.snapshots_captured, 1);
}

#[tokio::test]
async fn closing_an_unfinished_calibration_hides_markers() {
    let estimator = RecordingEstimator::default();
    let controller = controller_with(Box::new(estimator.clone()), false);
    controller.start().await.unwrap();

    let opened = controller.start_calibration().await.unwrap();
    assert!(opened.overlay_visible);
    controller.click_calibration_point(0).await;
    controller.close_calibration_overlay().await;

    let snapshot = controller.get_snapshot().await;
    assert!(!snapshot.overlay_visible);
    assert_eq!(snapshot.calibration_phase, CalibrationPhase::InProgress(1));
    assert_eq!(
        estimator.calls().last().map(String::as_str),
        Some("prediction_points:false")
    );
    assert!(controller.start_exam().await.is_err());

    // Reopening starts over from the first target.
    let reopened = controller.start_calibration().await.unwrap();
    assert!(reopened.overlay_visible);
    assert_eq!(reopened.calibration_phase, CalibrationPhase::InProgress(0));

    // Closing after completion leaves markers as the last click set them.
    for index in 0..9 {
        controller.click_calibration_point(index).await;
    }
    let hides_before = estimator
        .calls()
        .iter()
        .filter(|call| *call == "prediction_points:false")
        .count();
    controller.close_calibration_overlay().await;
    let hides_after = estimator
        .calls()
        .iter()
        .filter(|call| *call == "prediction_points:false")
        .count();
    assert_eq!(hides_before, hides_after);
    assert!(controller.start_exam().await.is_ok());
}
