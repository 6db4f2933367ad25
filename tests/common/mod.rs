#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use roi_counter::detect::{MarkerBackend, SharedDetector};
use roi_counter::ingest::{SceneObject, SceneScript, SCENE_EXTENSION};
use roi_counter::{
    ColorTag, LineBoundary, ObjectClass, Point, RequestOrchestrator, RoiResult,
    TrackerSettings, VideoLibrary,
};

pub const SAMPLE_FRAMES: u64 = 120;

fn mover(class: ObjectClass, frames: (u64, u64), from: [f64; 2], to: [f64; 2]) -> SceneObject {
    SceneObject {
        class,
        first_frame: frames.0,
        last_frame: frames.1,
        from,
        to,
        size: [20, 20],
    }
}

/// 480x300, 120 frames, crossing the line y = 200 (x in 0..=400) at known frames:
/// car at 31, person at 70, two trucks together at 101. The bicycle never reaches the line
/// and the motorcycle passes beyond its end.
pub fn sample_scene() -> SceneScript {
    SceneScript::new(480, 300, SAMPLE_FRAMES)
        .with_object(mover(ObjectClass::Car, (10, 40), [100.0, 150.0], [100.0, 240.0]))
        .with_object(mover(ObjectClass::Person, (50, 90), [300.0, 250.0], [300.0, 130.0]))
        .with_object(mover(ObjectClass::Truck, (80, 110), [150.0, 150.0], [150.0, 240.0]))
        .with_object(mover(ObjectClass::Truck, (80, 110), [250.0, 150.0], [250.0, 240.0]))
        .with_object(mover(ObjectClass::Bicycle, (0, 119), [50.0, 100.0], [350.0, 100.0]))
        .with_object(mover(ObjectClass::Motorcycle, (10, 40), [450.0, 150.0], [450.0, 240.0]))
}

pub fn write_scene(dir: &Path, video: &str, scene: &SceneScript) -> Result<()> {
    scene.save(&dir.join(format!("{}.{}", video, SCENE_EXTENSION)))
}

pub fn sample_boundary(color: ColorTag, video: &str) -> LineBoundary {
    LineBoundary::new(Point(0, 200), Point(400, 200), color, video)
}

/// Hand-computed histogram for `sample_scene` against `sample_boundary`.
pub fn sample_expected(color: ColorTag) -> RoiResult {
    let mut expected = RoiResult::empty(color);
    expected.car = vec![0, 1, 0, 0, 0, 0];
    expected.person = vec![0, 0, 0, 1, 0, 0];
    expected.truck = vec![0, 0, 0, 0, 0, 2];
    expected
}

pub fn scene_orchestrator(dir: &Path) -> RequestOrchestrator {
    let detector: SharedDetector = Arc::new(Mutex::new(MarkerBackend::new()));
    RequestOrchestrator::new(
        VideoLibrary::new(dir, SCENE_EXTENSION),
        detector,
        TrackerSettings::default(),
    )
}
