use approx::assert_abs_diff_eq;
use fillcam::calib::{Calibrator, JsonFileStore};
use fillcam::{
    CalibrationError, CalibrationSample, Frame, MeasurementConfig, MeasurementPipeline,
    VolumeSource,
};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

fn cup_frame(fill_top: i32) -> RgbImage {
    let grey = Rgb([60, 60, 60]);
    let mut img = RgbImage::from_pixel(240, 240, Rgb([255, 255, 255]));
    for (x, y, w, h) in [(60, 60, 120, 4), (60, 176, 120, 4), (60, 60, 4, 120), (176, 60, 4, 120)] {
        draw_filled_rect_mut(&mut img, Rect::at(x, y).of_size(w, h), grey);
    }
    draw_filled_rect_mut(
        &mut img,
        Rect::at(64, fill_top).of_size(112, (176 - fill_top) as u32),
        Rgb([150, 90, 40]),
    );
    img
}

fn config_in(dir: &tempfile::TempDir) -> MeasurementConfig {
    MeasurementConfig {
        calibration_path: Some(dir.path().join("calibration").join("curves.json")),
        ..MeasurementConfig::default()
    }
}

#[test]
fn capture_save_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = MeasurementPipeline::new(config_in(&dir)).unwrap();

    // 3, 5 and 8 of 10 bands filled.
    let mut samples = Vec::new();
    for (top, volume) in [(144, 75.0), (120, 125.0), (84, 200.0)] {
        let frame = cup_frame(top);
        let capture = pipeline
            .begin_calibration_capture(Frame::Image(&frame), "small_cup")
            .unwrap();
        assert!(capture.debug_image.is_some());
        samples.push(capture.sample(volume));
    }
    assert_abs_diff_eq!(samples[0].pixel_height, 36.0, epsilon = 1.0);
    assert_abs_diff_eq!(samples[2].pixel_height, 96.0, epsilon = 2.0);

    let curve = pipeline.save_calibration("small_cup", &samples).unwrap();
    assert_abs_diff_eq!(curve.min_volume, 75.0);
    assert_abs_diff_eq!(curve.max_volume, 200.0);
    assert!(pipeline.calibrator().is_calibrated("small_cup"));

    let frame = cup_frame(120);
    let before = pipeline.process_measurement(Frame::Image(&frame), "small_cup", "rice");
    assert_eq!(before.volume_source, Some(VolumeSource::Calibration));
    assert_abs_diff_eq!(before.volume_ml.unwrap(), 125.0, epsilon = 0.011);

    drop(pipeline);
    let reopened = MeasurementPipeline::new(config_in(&dir)).unwrap();
    assert!(reopened.calibrator().is_calibrated("small_cup"));
    let after = reopened.process_measurement(Frame::Image(&frame), "small_cup", "rice");
    assert_eq!(after.volume_source, Some(VolumeSource::Calibration));
    assert_eq!(after.volume_ml, before.volume_ml);
}

#[test]
fn failed_fit_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = MeasurementPipeline::new(config_in(&dir)).unwrap();
    let samples = [
        CalibrationSample::new(40.0, 10.0),
        CalibrationSample::new(40.0, 20.0),
    ];
    assert!(matches!(
        pipeline.save_calibration("teaspoon", &samples),
        Err(CalibrationError::TooFewSamples { .. })
    ));
    assert!(!dir.path().join("calibration").join("curves.json").exists());
    assert!(!pipeline.calibrator().is_calibrated("teaspoon"));
}

#[test]
fn calibrator_shared_with_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("curves.json");
    let calibrator = std::sync::Arc::new(
        Calibrator::open(Box::new(JsonFileStore::new(&path))).unwrap(),
    );
    let pipeline = MeasurementPipeline::builder(MeasurementConfig::default())
        .calibrator(calibrator.clone())
        .build()
        .unwrap();

    let samples = [
        CalibrationSample::new(0.0, 0.0),
        CalibrationSample::new(60.0, 100.0),
        CalibrationSample::new(120.0, 200.0),
    ];
    calibrator.calibrate("small_cup", &samples).unwrap();

    let frame = cup_frame(120);
    let result = pipeline.process_measurement(Frame::Image(&frame), "small_cup", "water");
    assert_eq!(result.volume_source, Some(VolumeSource::Calibration));
    assert_abs_diff_eq!(result.volume_ml.unwrap(), 100.0, epsilon = 0.011);
    assert!(path.exists());
}
