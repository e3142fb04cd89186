use eyetrack::blink::CALIBRATION_SAMPLES;
use eyetrack::core::GrayImage;
use eyetrack::{Engine, EngineParams, EngineState, FrameSequence, JsonLogExtractor};
use nalgebra::Point2;

const BACKGROUND: u8 = 51;

fn eye_frame(cx: f64, cy: f64, r: f64) -> GrayImage {
    let mut img = GrayImage::new_fill(200, 200, BACKGROUND);
    for y in 0..200 {
        for x in 0..200 {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            if dx * dx + dy * dy <= r * r {
                img.set(x, y, 0);
            }
        }
    }
    img
}

fn tracking_engine(params: EngineParams) -> Engine {
    let mut engine = Engine::new(EngineParams {
        state: EngineState::Track,
        ..params
    });
    engine
        .load_blink_calibration(vec![50.0; CALIBRATION_SAMPLES])
        .expect("calibration");
    engine.pupil_mut().set_threshold(25.0);
    engine.pupil_mut().set_center(Point2::new(100.0, 100.0));
    engine
}

#[test]
fn dark_disc_is_tracked_without_blink() {
    let mut engine = tracking_engine(EngineParams::default());
    let frame = eye_frame(100.0, 100.0, 15.0);
    let t = engine.on_frame(&frame.view()).expect("engine active");

    assert!(t.blink.is_none(), "frame mean should be near the baseline");
    let pupil = t.pupil.expect("pupil fit");
    assert!((pupil.center.x - 100.0).abs() < 1.0, "{:?}", pupil.center);
    assert!((pupil.center.y - 100.0).abs() < 1.0, "{:?}", pupil.center);
    // Erosion widens the disc by about one pixel.
    assert!((pupil.axis1 - 15.0).abs() < 3.0, "axis1 {}", pupil.axis1);
    assert!(pupil.axis2 <= pupil.axis1);
    assert!(t.cr_0.is_none() && t.cr_1.is_none());
}

#[test]
fn pupil_is_followed_across_frames() {
    let mut engine = tracking_engine(EngineParams::default());
    let mut last = None;
    for i in 0..6 {
        let frame = eye_frame(100.0 + 3.0 * i as f64, 100.0 - 2.0 * i as f64, 15.0);
        last = engine.on_frame(&frame.view()).and_then(|t| t.pupil);
    }
    let fit = last.expect("tracked on last frame");
    assert!((fit.center.x - 115.0).abs() < 1.5, "{:?}", fit.center);
    assert!((fit.center.y - 90.0).abs() < 1.5, "{:?}", fit.center);
}

#[test]
fn blink_frame_is_flagged_and_logged() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut engine = tracking_engine(EngineParams {
        output_dir: Some(dir.path().to_path_buf()),
        ..EngineParams::default()
    });
    engine.add_extractor(Box::new(JsonLogExtractor::in_dir(dir.path())));

    let frames = vec![
        eye_frame(100.0, 100.0, 15.0),
        GrayImage::new_fill(200, 200, 120),
        eye_frame(100.0, 100.0, 15.0),
    ];
    let n = engine.run(&mut FrameSequence::new(frames)).expect("run");
    assert_eq!(n, 3);

    let log = std::fs::read_to_string(dir.path().join("output.json")).expect("log written");
    let lines: Vec<serde_json::Value> = log
        .lines()
        .map(|l| serde_json::from_str(l).expect("json line"))
        .collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].get("pupil").is_some());
    assert!(lines[0].get("blink").is_none());
    assert_eq!(lines[1]["blink"], serde_json::json!(1));
    assert!(lines[1].get("pupil").is_none());
    assert!(lines[2].get("pupil").is_some());
}

#[test]
fn record_only_session_never_tracks() {
    let mut engine = tracking_engine(EngineParams::default());
    engine.toggle_record();
    assert_eq!(engine.state(), EngineState::Record);
    let frame = eye_frame(100.0, 100.0, 15.0);
    for _ in 0..3 {
        let t = engine.on_frame(&frame.view()).expect("active");
        assert!(t.pupil.is_none());
    }
    assert!(engine.pupil().last_fit().is_none());
    assert_eq!(engine.frame_index(), 3);
}

#[cfg(feature = "image")]
#[test]
fn record_only_session_saves_frames() {
    use eyetrack::FrameRecorder;

    let dir = tempfile::tempdir().expect("tempdir");
    let frames_dir = dir.path().join("frames");
    let mut engine = Engine::new(EngineParams {
        state: EngineState::Record,
        ..EngineParams::default()
    });
    engine.add_extractor(Box::new(FrameRecorder::new(&frames_dir)));

    let frames = vec![eye_frame(100.0, 100.0, 15.0), eye_frame(110.0, 95.0, 15.0)];
    let n = engine.run(&mut FrameSequence::new(frames)).expect("run");
    assert_eq!(n, 2);

    let recorder = FrameRecorder::new(&frames_dir);
    let first = image::open(recorder.frame_path(1)).expect("first frame").to_luma8();
    assert_eq!(first.dimensions(), (200, 200));
    assert_eq!(first.get_pixel(100, 100).0, [0]);
    assert_eq!(first.get_pixel(5, 5).0, [BACKGROUND]);
    let second = image::open(recorder.frame_path(2)).expect("second frame").to_luma8();
    assert_eq!(second.get_pixel(110, 95).0, [0]);
    assert!(!recorder.frame_path(3).exists());
}
