use std::sync::Arc;
use std::time::{Duration, Instant};

use glam::Vec3;
use parking_lot::Mutex;

use orbit_viewer::{
    CameraPose, KeyInputState, LayoutPolicy, LoadError, LoadResult, MeshData, ModelLoader,
    ModelNode, ModelSource, ModelTemplate, RenderError, RenderFrame, RenderService, ScenePreset,
    TickStatus, Transform, Viewer, ViewerError, ViewerStatus,
};

#[derive(Default)]
struct RecordingRenderer {
    frames: Vec<(CameraPose, Vec<Vec3>)>,
    released: usize,
}

impl RenderService for RecordingRenderer {
    fn render(&mut self, frame: &RenderFrame<'_>) -> Result<(), RenderError> {
        let positions = frame.instances.iter().map(|i| i.position()).collect();
        self.frames.push((frame.pose, positions));
        Ok(())
    }

    fn release_resources(&mut self) {
        self.released += 1;
    }
}

/// Loader returning a single-triangle template and recording requests.
#[derive(Default)]
struct StubLoader {
    requests: Mutex<Vec<ModelSource>>,
}

impl ModelLoader for StubLoader {
    fn load(&self, source: &ModelSource) -> LoadResult {
        self.requests.lock().push(source.clone());
        let mesh = Arc::new(MeshData::new(
            vec![
                0.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
                1.0, 0.0, 0.0, 0.0, 0.0, 1.0, //
                0.0, 1.0, 0.0, 0.0, 0.0, 1.0,
            ],
            vec![0, 1, 2],
        ));
        Ok(ModelTemplate::new(
            "stub",
            Transform::default(),
            vec![ModelNode::new("tri", mesh)],
        ))
    }
}

struct BrokenLoader;

impl ModelLoader for BrokenLoader {
    fn load(&self, _source: &ModelSource) -> LoadResult {
        Err(LoadError::Empty {
            name: "broken".into(),
        })
    }
}

fn tick_until_running(viewer: &mut Viewer, renderer: &mut RecordingRenderer) {
    let keys = KeyInputState::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        match viewer.tick(&keys, None, renderer).expect("tick") {
            TickStatus::Rendered => return,
            TickStatus::Loading => {
                assert!(Instant::now() < deadline, "model never loaded");
                std::thread::sleep(Duration::from_millis(1));
            }
            other => panic!("unexpected status {other:?}"),
        }
    }
}

#[test]
fn failed_load_never_enters_frame_loop() {
    let mut viewer = Viewer::with_loader(ScenePreset::Gallery.config(), Arc::new(BrokenLoader));
    let mut renderer = RecordingRenderer::default();
    let keys = KeyInputState::new();
    viewer.start("broken.obj", LayoutPolicy::Grid);

    let deadline = Instant::now() + Duration::from_secs(10);
    let err = loop {
        match viewer.tick(&keys, Some(4), &mut renderer) {
            Ok(TickStatus::Loading) => {
                assert!(Instant::now() < deadline, "load never resolved");
                std::thread::sleep(Duration::from_millis(1));
            }
            Ok(other) => panic!("unexpected status {other:?}"),
            Err(err) => break err,
        }
    };
    match err {
        ViewerError::Load { source_name, error } => {
            assert_eq!(source_name, "broken.obj");
            assert!(matches!(error, LoadError::Empty { .. }));
        }
        other => panic!("unexpected error {other:?}"),
    }

    for _ in 0..5 {
        assert_eq!(
            viewer.tick(&keys, Some(4), &mut renderer).unwrap(),
            TickStatus::Failed
        );
    }
    assert!(renderer.frames.is_empty());
    assert_eq!(viewer.status(), ViewerStatus::Failed);
}

#[test]
fn growing_grid_reframes_camera() {
    let loader = Arc::new(StubLoader::default());
    let mut viewer = Viewer::with_loader(ScenePreset::Gallery.config(), loader.clone());
    let mut renderer = RecordingRenderer::default();
    viewer.start(ModelSource::Primitives, LayoutPolicy::Grid);
    tick_until_running(&mut viewer, &mut renderer);

    let keys = KeyInputState::new();
    viewer.tick(&keys, Some(1), &mut renderer).unwrap();
    let (one_pose, one_positions) = renderer.frames.last().cloned().unwrap();
    assert_eq!(one_positions, vec![Vec3::ZERO]);

    viewer.tick(&keys, Some(4), &mut renderer).unwrap();
    let (four_pose, four_positions) = renderer.frames.last().cloned().unwrap();
    assert_eq!(
        four_positions,
        vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(40.0, 0.0, 0.0),
            Vec3::new(0.0, 0.0, 40.0),
            Vec3::new(40.0, 0.0, 40.0),
        ]
    );

    let one_distance = (one_pose.position - one_pose.look_at).length();
    let four_distance = (four_pose.position - four_pose.look_at).length();
    assert!(four_distance > one_distance);
    assert_eq!(four_pose.look_at, Vec3::new(40.0, 0.0, 40.0));
    assert_eq!(loader.requests.lock().as_slice(), &[ModelSource::Primitives]);
}

#[test]
fn linear_scene_keeps_camera_while_count_changes() {
    let mut viewer =
        Viewer::with_loader(ScenePreset::Analyser.config(), Arc::new(StubLoader::default()));
    let mut renderer = RecordingRenderer::default();
    viewer.start("model.obj", LayoutPolicy::Linear);
    tick_until_running(&mut viewer, &mut renderer);

    let keys = KeyInputState::new();
    let before = renderer.frames.last().cloned().unwrap().0;
    viewer.tick(&keys, Some(5), &mut renderer).unwrap();
    let (after, positions) = renderer.frames.last().cloned().unwrap();

    assert_eq!(before, after);
    let xs: Vec<f32> = positions.iter().map(|p| p.x).collect();
    assert_eq!(xs, vec![0.0, 15.0, 30.0, 45.0, 60.0]);
}

#[test]
fn restarting_discards_previous_scene() {
    let loader = Arc::new(StubLoader::default());
    let mut viewer = Viewer::with_loader(ScenePreset::Orbit.config(), loader.clone());
    let mut renderer = RecordingRenderer::default();

    viewer.start("first.obj", LayoutPolicy::Linear);
    tick_until_running(&mut viewer, &mut renderer);
    viewer
        .tick(&KeyInputState::new(), Some(3), &mut renderer)
        .unwrap();
    assert_eq!(viewer.frame_loop().unwrap().applied_count(), 3);

    viewer.start("second.obj", LayoutPolicy::Linear);
    assert_eq!(viewer.status(), ViewerStatus::Loading);
    viewer.wait_for_load().unwrap();
    assert_eq!(viewer.frame_loop().unwrap().applied_count(), 1);

    viewer.stop();
    assert_eq!(viewer.status(), ViewerStatus::Idle);
    assert_eq!(renderer.released, 0);
    assert_eq!(loader.requests.lock().len(), 2);
}

#[test]
fn switching_scene_releases_renderer_and_adopts_new_config() {
    let loader = Arc::new(StubLoader::default());
    let mut viewer = Viewer::with_loader(ScenePreset::Analyser.config(), loader.clone());
    let mut renderer = RecordingRenderer::default();
    viewer.start("model.obj", LayoutPolicy::Linear);
    tick_until_running(&mut viewer, &mut renderer);
    assert_eq!(renderer.released, 0);

    viewer.switch_scene(
        ScenePreset::Gallery.config(),
        ModelSource::Primitives,
        LayoutPolicy::Grid,
        &mut renderer,
    );
    assert_eq!(renderer.released, 1);
    assert_eq!(viewer.status(), ViewerStatus::Loading);
    assert_eq!(viewer.config().layout.spacing, 40.0);

    viewer.wait_for_load().unwrap();
    viewer
        .tick(&KeyInputState::new(), Some(2), &mut renderer)
        .unwrap();
    let positions = &renderer.frames.last().unwrap().1;
    assert_eq!(positions, &vec![Vec3::ZERO, Vec3::new(40.0, 0.0, 0.0)]);
    assert_eq!(
        loader.requests.lock().as_slice(),
        &[ModelSource::from("model.obj"), ModelSource::Primitives]
    );
}

#[test]
fn shutdown_stops_scene_and_releases_renderer() {
    let mut viewer =
        Viewer::with_loader(ScenePreset::Orbit.config(), Arc::new(StubLoader::default()));
    let mut renderer = RecordingRenderer::default();
    viewer.start("model.obj", LayoutPolicy::Linear);
    tick_until_running(&mut viewer, &mut renderer);
    let drawn = renderer.frames.len();

    viewer.shutdown(&mut renderer);
    assert_eq!(renderer.released, 1);
    assert_eq!(viewer.status(), ViewerStatus::Idle);
    assert!(viewer.frame_loop().is_none());

    let status = viewer
        .tick(&KeyInputState::new(), None, &mut renderer)
        .unwrap();
    assert_eq!(status, TickStatus::Idle);
    assert_eq!(renderer.frames.len(), drawn);
}

#[test]
fn invalid_requests_keep_previous_layout() {
    let mut viewer =
        Viewer::with_loader(ScenePreset::Gallery.config(), Arc::new(StubLoader::default()));
    let mut renderer = RecordingRenderer::default();
    viewer.start("model.obj", LayoutPolicy::Grid);
    tick_until_running(&mut viewer, &mut renderer);

    let keys = KeyInputState::new();
    viewer.tick(&keys, Some(9), &mut renderer).unwrap();
    viewer.tick(&keys, Some(1_000_000), &mut renderer).unwrap();
    viewer.tick(&keys, None, &mut renderer).unwrap();

    assert_eq!(renderer.frames.last().unwrap().1.len(), 9);
    assert_eq!(viewer.frame_loop().unwrap().applied_count(), 9);
}
