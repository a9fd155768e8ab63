//! ExportHandle - background export worker
//!
//! Exports run on their own task, independent of the frame pipeline. Each
//! request pulls a fresh snapshot from the [`MeshProvider`], writes it on the
//! blocking pool and answers through a oneshot channel.

use std::sync::Arc;

use contracts::{ErrorEvent, EventBus, MeshProvider, StatusEvent};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use crate::error::{ExportError, Result};
use crate::exporter::{ExportReport, MeshExporter};
use crate::metrics::ExportMetrics;
use crate::naming::ExportDestination;

/// One export job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub destination: ExportDestination,
    /// Mesh sampling step in voxels (1 = full detail)
    pub detail_level: u32,
}

struct ExportJob {
    request: ExportRequest,
    reply: oneshot::Sender<Result<ExportReport>>,
}

/// Handle to a running export worker
pub struct ExportHandle {
    tx: mpsc::Sender<ExportJob>,
    metrics: Arc<ExportMetrics>,
    exporter: Arc<MeshExporter>,
    worker_handle: JoinHandle<()>,
}

impl ExportHandle {
    /// Spawn the worker on the current runtime
    pub fn spawn(
        exporter: MeshExporter,
        provider: Arc<dyn MeshProvider>,
        events: EventBus,
        queue_capacity: usize,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(ExportMetrics::new());
        let exporter = Arc::new(exporter);

        let worker_handle = tokio::spawn(export_worker(
            exporter.clone(),
            provider,
            events,
            rx,
            metrics.clone(),
        ));

        Self {
            tx,
            metrics,
            exporter,
            worker_handle,
        }
    }

    pub fn metrics(&self) -> &Arc<ExportMetrics> {
        &self.metrics
    }

    pub fn exporter(&self) -> &MeshExporter {
        &self.exporter
    }

    /// Queue a request; the receiver resolves when the file is written
    pub async fn submit(&self, request: ExportRequest) -> Result<oneshot::Receiver<Result<ExportReport>>> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(ExportJob { request, reply })
            .await
            .map_err(|_| ExportError::WorkerClosed)?;
        Ok(rx)
    }

    /// Queue a request and wait for its outcome
    pub async fn export(&self, request: ExportRequest) -> Result<ExportReport> {
        self.submit(request)
            .await?
            .await
            .map_err(|_| ExportError::WorkerClosed)?
    }

    /// Finish queued jobs, then stop the worker
    #[instrument(name = "export_handle_shutdown", skip(self))]
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker_handle.await {
            error!(error = ?e, "export worker panicked");
        }
        debug!("ExportHandle shutdown complete");
    }
}

#[instrument(name = "export_worker_loop", skip_all)]
async fn export_worker(
    exporter: Arc<MeshExporter>,
    provider: Arc<dyn MeshProvider>,
    events: EventBus,
    mut rx: mpsc::Receiver<ExportJob>,
    metrics: Arc<ExportMetrics>,
) {
    debug!("export worker started");

    while let Some(job) = rx.recv().await {
        let format_label = job
            .request
            .destination
            .format()
            .map(|f| f.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        let result = run_job(exporter.clone(), provider.clone(), job.request).await;
        match &result {
            Ok(report) => {
                metrics.record_success(report.triangles, report.bytes_written);
                observability::record_export(&format_label, true);
                observability::record_export_triangles(report.triangles);
                events.publish_status(StatusEvent::ExportComplete {
                    path: report.path.clone(),
                    format: report.format.to_string(),
                    triangles: report.triangles,
                });
            }
            Err(e) => {
                metrics.record_failure();
                observability::record_export(&format_label, false);
                error!(error = %e, "export failed");
                events.publish_error(ErrorEvent {
                    kind: e.kind(),
                    message: e.to_string(),
                    frame_id: None,
                });
            }
        }

        // Requester may have stopped waiting
        let _ = job.reply.send(result);
    }

    debug!("export worker stopped");
}

async fn run_job(
    exporter: Arc<MeshExporter>,
    provider: Arc<dyn MeshProvider>,
    request: ExportRequest,
) -> Result<ExportReport> {
    tokio::task::spawn_blocking(move || {
        let mesh = provider.snapshot_mesh(request.detail_level)?;
        exporter
            .export(Some(&mesh), Some(&request.destination))?
            .ok_or_else(|| ExportError::Task("export produced no file".to_string()))
    })
    .await
    .map_err(|e| ExportError::Task(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::single_triangle;
    use crate::naming::ExportCounter;
    use crate::normalize::CenteringMode;
    use contracts::{ContractError, ErrorKind, MeshFormat, MeshSnapshot};
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;

    /// Provider returning a fixed mesh and remembering the requested detail
    struct FixedMesh {
        mesh: MeshSnapshot,
        last_detail: AtomicU32,
    }

    impl MeshProvider for FixedMesh {
        fn snapshot_mesh(&self, detail_level: u32) -> std::result::Result<MeshSnapshot, ContractError> {
            self.last_detail.store(detail_level, Ordering::SeqCst);
            Ok(self.mesh.clone())
        }
    }

    fn spawn(dir: &std::path::Path, mesh: MeshSnapshot, events: EventBus) -> (ExportHandle, Arc<FixedMesh>) {
        let provider = Arc::new(FixedMesh {
            mesh,
            last_detail: AtomicU32::new(0),
        });
        let exporter = MeshExporter::new(
            ExportCounter::new(dir, "export_counter.txt"),
            CenteringMode::Horizontal,
            MeshFormat::Stl,
        );
        (ExportHandle::spawn(exporter, provider.clone(), events, 4), provider)
    }

    #[tokio::test]
    async fn test_export_round_trip() {
        let dir = tempdir().unwrap();
        let (bus, subscriber) = EventBus::new(8, 8);
        let (handle, provider) = spawn(dir.path(), single_triangle(), bus);

        let report = handle
            .export(ExportRequest {
                destination: ExportDestination::Counter(MeshFormat::Stl),
                detail_level: 2,
            })
            .await
            .unwrap();

        assert_eq!(report.bytes_written, 134);
        assert_eq!(provider.last_detail.load(Ordering::SeqCst), 2);
        assert_eq!(handle.metrics().snapshot().succeeded, 1);
        assert!(matches!(
            subscriber.status.try_recv().unwrap(),
            StatusEvent::ExportComplete { triangles: 1, .. }
        ));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_mesh_reported_on_error_channel() {
        let dir = tempdir().unwrap();
        let (bus, subscriber) = EventBus::new(8, 8);
        let (handle, _) = spawn(dir.path(), MeshSnapshot::default(), bus);

        let err = handle
            .export(ExportRequest {
                destination: ExportDestination::Counter(MeshFormat::Obj),
                detail_level: 1,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ExportError::Contract(ContractError::InvalidMesh { .. })));
        assert_eq!(handle.metrics().snapshot().failed, 1);
        assert_eq!(subscriber.errors.try_recv().unwrap().kind, ErrorKind::InvalidMesh);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_queued_jobs_finish_before_shutdown() {
        let dir = tempdir().unwrap();
        let (handle, _) = spawn(dir.path(), single_triangle(), EventBus::detached());

        let mut pending = Vec::new();
        for _ in 0..3 {
            pending.push(
                handle
                    .submit(ExportRequest {
                        destination: ExportDestination::Counter(MeshFormat::Ply),
                        detail_level: 1,
                    })
                    .await
                    .unwrap(),
            );
        }
        let metrics = handle.metrics().clone();
        handle.shutdown().await;

        for rx in pending {
            assert!(rx.await.unwrap().is_ok());
        }
        assert_eq!(metrics.snapshot().succeeded, 3);
    }
}
