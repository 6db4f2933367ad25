mod common;

use anyhow::Result;
use tempfile::tempdir;

use common::{sample_boundary, sample_expected, sample_scene, scene_orchestrator, write_scene};
use roi_counter::detect::MarkerBackend;
use roi_counter::ingest::SCENE_EXTENSION;
use roi_counter::{
    ColorTag, LineBoundary, ObjectClass, Point, Response, RoiEvaluator, TrackerSettings,
    VideoLibrary,
};

#[test]
fn sample_video_yields_hand_computed_histograms() -> Result<()> {
    let dir = tempdir()?;
    write_scene(dir.path(), "sample", &sample_scene())?;

    let response = scene_orchestrator(dir.path()).handle(&[sample_boundary(ColorTag::Blue, "sample")]);

    assert_eq!(response, Response::Results(vec![sample_expected(ColorTag::Blue)]));
    Ok(())
}

#[test]
fn regions_are_independent_and_keep_submission_order() -> Result<()> {
    let dir = tempdir()?;
    write_scene(dir.path(), "sample", &sample_scene())?;

    // vertical line at x = 200 is crossed by the bicycle only
    let request = [
        LineBoundary::new(Point(200, 0), Point(200, 300), ColorTag::Red, "sample"),
        sample_boundary(ColorTag::Green, "sample"),
    ];
    let Response::Results(results) = scene_orchestrator(dir.path()).handle(&request) else {
        panic!("expected results");
    };

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].color, ColorTag::Red);
    assert_eq!(results[0].total(ObjectClass::Bicycle), 1);
    for class in [ObjectClass::Person, ObjectClass::Car, ObjectClass::Truck] {
        assert_eq!(results[0].total(class), 0, "{}", class);
    }
    assert_eq!(results[1], sample_expected(ColorTag::Green));
    Ok(())
}

#[test]
fn degenerate_region_returns_empty_list() -> Result<()> {
    let dir = tempdir()?;
    write_scene(dir.path(), "sample", &sample_scene())?;

    let request = [LineBoundary::new(Point(120, 80), Point(120, 80), ColorTag::Blue, "sample")];
    let response = scene_orchestrator(dir.path()).handle(&request);

    assert_eq!(response, Response::Results(vec![]));
    Ok(())
}

#[test]
fn missing_video_discards_earlier_results() -> Result<()> {
    let dir = tempdir()?;
    write_scene(dir.path(), "sample", &sample_scene())?;

    let request = [
        sample_boundary(ColorTag::Blue, "sample"),
        sample_boundary(ColorTag::Green, "nowhere"),
        sample_boundary(ColorTag::Red, "sample"),
    ];
    let Response::Error(err) = scene_orchestrator(dir.path()).handle(&request) else {
        panic!("expected an error response");
    };

    assert!(err.error.contains("nowhere"), "{}", err.error);
    assert!(err.error.contains("video file not found"), "{}", err.error);
    Ok(())
}

#[test]
fn truncated_video_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    write_scene(dir.path(), "cut", &sample_scene().truncated_at(80))?;

    let Response::Error(err) = scene_orchestrator(dir.path()).handle(&[sample_boundary(ColorTag::Blue, "cut")])
    else {
        panic!("expected an error response");
    };

    assert!(err.error.contains("ended after 80 of 120 frames"), "{}", err.error);
    Ok(())
}

#[test]
fn corrupt_video_is_an_error() -> Result<()> {
    let dir = tempdir()?;
    std::fs::write(dir.path().join(format!("broken.{}", SCENE_EXTENSION)), "{\"width\":")?;

    let response = scene_orchestrator(dir.path()).handle(&[sample_boundary(ColorTag::Blue, "broken")]);

    assert!(response.is_error());
    Ok(())
}

#[test]
fn empty_request_is_rejected() {
    let response = scene_orchestrator(std::path::Path::new("unused")).handle(&[]);
    assert_eq!(response, Response::error("request contains no regions"));
}

#[test]
fn evaluator_runs_directly_against_a_library() -> Result<()> {
    let dir = tempdir()?;
    write_scene(dir.path(), "sample", &sample_scene())?;
    let library = VideoLibrary::new(dir.path(), SCENE_EXTENSION);

    let result = RoiEvaluator::new(sample_boundary(ColorTag::Blue, "sample"), TrackerSettings::default())
        .with_bucket_count(2)
        .run(&library, &mut MarkerBackend::new())?;

    assert_eq!(result.car, vec![1, 0]);
    assert_eq!(result.person, vec![0, 1]);
    assert_eq!(result.truck, vec![0, 2]);
    Ok(())
}
