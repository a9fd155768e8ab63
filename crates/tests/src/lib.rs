//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Configuration to running components
//! - Mock e2e: mock sensor -> scheduler -> controller -> exporter
//! - Replay e2e from a recording on disk

#[cfg(test)]
mod contract_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{MeshFormat, SensorKind};
    use depth_device::DepthSourceFactory;
    use exporter::MeshExporter;
    use reconstruction::ControllerSettings;

    const SESSION_TOML: &str = r#"
[sensor]
kind = "mock"
width = 32
height = 24

[reconstruction]
voxels_per_meter = 128
resolution_x = 64
resolution_y = 64
resolution_z = 64
min_depth_clip = 0.5
mirror_depth = true

[export]
directory = "scans"
format = "ply"
center_vertical = true
"#;

    #[test]
    fn test_blueprint_drives_components() {
        let blueprint = ConfigLoader::load_from_str(SESSION_TOML, ConfigFormat::Toml).unwrap();
        assert_eq!(blueprint.sensor.kind, SensorKind::Mock);

        let source = DepthSourceFactory::from_config(&blueprint.sensor).unwrap();
        assert_eq!(source.frame_data_length(), 32 * 24);

        let settings = ControllerSettings::from(&blueprint.reconstruction);
        assert_eq!(settings.parameters.voxels_per_meter, 128);
        assert!(settings.conversion.mirror);
        assert_eq!(settings.conversion.min_depth_clip, 0.5);

        let exporter = MeshExporter::from_config(&blueprint.export);
        assert_eq!(exporter.default_format(), MeshFormat::Ply);
        assert_eq!(exporter.counter().directory(), std::path::Path::new("scans"));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use contracts::{
        DepthFrameRef, DepthSource, ErrorKind, EventBus, MeshFormat, ReconstructionParameters,
        StatusEvent,
    };
    use depth_device::{
        MockDepthSensor, MockDepthSensorConfig, RecordingWriter, ReplayConfig, ReplayDepthSensor,
    };
    use exporter::{ExportDestination, ExportError, ExportHandle, ExportRequest, MeshExporter};
    use observability::FrameRateCounter;
    use reconstruction::{
        ControllerSettings, MockEngineConfig, MockEngineFactory, ReconstructionController,
        SharedController,
    };
    use scheduler::FrameScheduler;

    fn params() -> ReconstructionParameters {
        ReconstructionParameters::new(64, 32, 32, 32)
    }

    fn session(config: MockEngineConfig, events: EventBus) -> (SharedController, MockEngineFactory) {
        let factory = MockEngineFactory::new(config);
        let controller = ReconstructionController::new(
            Arc::new(factory.clone()),
            ControllerSettings {
                parameters: params(),
                ..Default::default()
            },
        )
        .with_events(events);
        let shared = SharedController::new(controller);
        shared.lock().create(params()).unwrap();
        (shared, factory)
    }

    fn mock_sensor(max_frames: u64) -> MockDepthSensor {
        MockDepthSensor::new(
            "e2e-mock",
            MockDepthSensorConfig {
                width: 16,
                height: 12,
                frequency_hz: 200.0,
                max_frames: Some(max_frames),
                ..Default::default()
            },
        )
    }

    async fn wait_until(mut done: impl FnMut() -> bool, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while tokio::time::Instant::now() < deadline {
            if done() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        done()
    }

    /// End-to-end test: MockDepthSensor -> FrameScheduler -> controller -> MeshExporter
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_mock_session_exports_stl() {
        let dir = tempfile::tempdir().unwrap();
        let (bus, subscriber) = EventBus::new(1024, 64);
        let (controller, factory) = session(MockEngineConfig::default(), bus.clone());

        let frame_rate = FrameRateCounter::with_events(Duration::from_millis(50), bus.clone());
        frame_rate.start().unwrap();
        let scheduler = FrameScheduler::new(controller.clone(), bus.clone())
            .unwrap()
            .with_frame_rate(frame_rate.clone());

        let sensor = mock_sensor(30);
        scheduler.attach(&sensor).unwrap();
        assert!(
            wait_until(|| !sensor.is_streaming(), Duration::from_secs(5)).await,
            "mock sensor did not finish"
        );
        scheduler.detach(&sensor).unwrap();
        scheduler.wait_idle().await;
        frame_rate.stop();

        let probe = factory.probe();
        let processed = probe.processed_frames();
        assert!(!processed.is_empty());
        assert!(processed.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(probe.max_concurrent_steps(), 1);

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.frames_seen(), 30);
        assert_eq!(snapshot.frames_processed, processed.len() as u64);
        assert!(!controller.lock().pose().is_identity());
        assert_eq!(
            scheduler.latest_frame().map(|f| f.frame_id),
            processed.last().copied()
        );

        let handle = ExportHandle::spawn(
            MeshExporter::from_config(&contracts::ExportConfig {
                directory: dir.path().to_path_buf(),
                ..Default::default()
            }),
            Arc::new(controller.clone()),
            bus.clone(),
            4,
        );
        let report = handle
            .export(ExportRequest {
                destination: ExportDestination::Counter(MeshFormat::Stl),
                detail_level: 1,
            })
            .await
            .unwrap();
        handle.shutdown().await;

        assert_eq!(report.path, dir.path().join("mesh_0000.stl"));
        assert!(report.triangles > 0);
        let bytes = std::fs::read(&report.path).unwrap();
        assert_eq!(bytes.len() as u64, report.bytes_written);
        assert_eq!(bytes.len(), 84 + 50 * report.triangles);

        let mut statuses = Vec::new();
        while let Ok(event) = subscriber.status.try_recv() {
            statuses.push(event);
        }
        assert!(statuses.iter().any(|e| matches!(e, StatusEvent::EngineCreated { .. })));
        assert!(statuses.iter().any(|e| matches!(e, StatusEvent::ResetComplete)));
        assert!(statuses.iter().any(|e| matches!(e, StatusEvent::SensorStarted { .. })));
        assert!(statuses.iter().any(|e| matches!(e, StatusEvent::SensorStopped { .. })));
        assert!(statuses
            .iter()
            .any(|e| matches!(e, StatusEvent::ExportComplete { triangles, .. } if *triangles == report.triangles)));
        assert!(subscriber.errors.try_recv().is_err());

        controller.lock().dispose();
        assert_eq!(probe.disposed(), probe.created());
    }

    /// A slow engine never runs two steps at once; the excess is dropped
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_slow_engine_drops_frames() {
        let (controller, factory) = session(
            MockEngineConfig {
                step_delay: Duration::from_millis(40),
                ..Default::default()
            },
            EventBus::detached(),
        );
        let scheduler = FrameScheduler::new(controller, EventBus::detached()).unwrap();

        let sensor = mock_sensor(40);
        scheduler.attach(&sensor).unwrap();
        assert!(wait_until(|| !sensor.is_streaming(), Duration::from_secs(5)).await);
        scheduler.detach(&sensor).unwrap();
        scheduler.wait_idle().await;

        let snapshot = scheduler.snapshot();
        assert_eq!(snapshot.frames_seen(), 40);
        assert!(snapshot.frames_dropped > 0);
        assert_eq!(factory.probe().max_concurrent_steps(), 1);
    }

    /// Replay a recording written to disk through the whole pipeline
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_replay_recording() {
        let dir = tempfile::tempdir().unwrap();
        let recording = dir.path().join("recording");

        let mut writer = RecordingWriter::create(&recording).unwrap();
        for frame_id in 1..=5u64 {
            let pixels = vec![1200u16; 8 * 6];
            writer
                .write_frame(&DepthFrameRef {
                    frame_id,
                    timestamp: frame_id as f64 * 0.02,
                    width: 8,
                    height: 6,
                    pixels: &pixels,
                })
                .unwrap();
        }
        writer.finish().unwrap();

        let sensor = ReplayDepthSensor::load(
            &recording,
            ReplayConfig {
                speed_multiplier: 1.0,
                loop_playback: false,
            },
        )
        .unwrap();
        assert_eq!(sensor.frame_count(), 5);

        let (controller, factory) = session(MockEngineConfig::default(), EventBus::detached());
        let scheduler = FrameScheduler::new(controller.clone(), EventBus::detached()).unwrap();
        scheduler.attach(&sensor).unwrap();
        assert!(wait_until(|| !sensor.is_streaming(), Duration::from_secs(5)).await);
        scheduler.wait_idle().await;
        scheduler.detach(&sensor).unwrap();

        let processed = factory.probe().processed_frames();
        assert!(!processed.is_empty());
        assert!(processed.iter().all(|id| (1..=5).contains(id)));
        assert!(processed.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(scheduler.snapshot().frames_seen(), 5);
    }

    /// Exporting before any frame has been integrated writes nothing
    #[tokio::test]
    async fn test_export_before_first_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (bus, subscriber) = EventBus::new(16, 16);
        let (controller, _) = session(MockEngineConfig::default(), EventBus::detached());

        let handle = ExportHandle::spawn(
            MeshExporter::from_config(&contracts::ExportConfig {
                directory: dir.path().join("exports"),
                ..Default::default()
            }),
            Arc::new(controller),
            bus,
            1,
        );
        let err = handle
            .export(ExportRequest {
                destination: ExportDestination::Counter(MeshFormat::Obj),
                detail_level: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ExportError::Contract(_)), "got: {err}");
        assert_eq!(err.kind(), ErrorKind::InvalidMesh);
        assert_eq!(handle.exporter().counter().peek().unwrap(), 0);
        handle.shutdown().await;

        assert!(!dir.path().join("exports").join("mesh_0000.obj").exists());
        let event = subscriber.errors.try_recv().unwrap();
        assert_eq!(event.kind, ErrorKind::InvalidMesh);
    }
}
