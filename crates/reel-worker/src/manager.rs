//! Montage run lifecycle.
//!
//! [`MontageManager`] owns every run from submission to cleanup:
//!
//! ```text
//! submit ──► processing ──► completed ──┐
//!                 │                     ├──► (retention) ──► removed
//!                 └───────► failed ─────┘
//! ```
//!
//! Submission validates and resolves the request synchronously, records the
//! run and hands the expensive work to a background task. Only the manager
//! mutates runs; terminal transitions arm a cleanup timer that deletes the
//! run together with its files whether or not anyone polls it.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reel_media::{DurationProbe, FrameGrid, Renderer};
use reel_models::{MontageRequest, MusicReference, Region, Run, RunId, RunStatus};
use tokio::sync::Semaphore;
use tracing::{error, info, warn, Instrument};
use validator::Validate;

use crate::analysis::AnalysisProvider;
use crate::cache::AnalysisCache;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;
use crate::metrics;
use crate::pipeline;
use crate::scheduler::DelayScheduler;
use crate::sources::{remove_file_if_exists, ResolvedSources, SourceLayout};
use crate::store::RunStore;

/// User-facing run messages.
pub mod messages {
    pub const INITIALIZING: &str = "Initializing montage creation...";
    pub const ANALYZING: &str = "Analyzing video...";
    pub const RENDERING: &str = "Rendering montage...";
    pub const COMPLETED: &str = "Montage creation completed!";
    pub const FAILED: &str = "Montage generation failed. Please check server logs.";
}

pub const PROGRESS_ANALYZING: u8 = 10;
pub const PROGRESS_RENDERING: u8 = 70;

/// External collaborators a manager drives.
#[derive(Clone)]
pub struct MontageBackends {
    pub analysis: Arc<dyn AnalysisProvider>,
    pub renderer: Arc<dyn Renderer>,
    pub probe: Arc<dyn DurationProbe>,
}

/// Everything the background pipeline needs to know about one run.
#[derive(Debug, Clone)]
pub(crate) struct MontageJob {
    pub run_id: RunId,
    pub source_id: String,
    /// Frame-aligned output window
    pub region: Region,
    pub beat_markers: Vec<f64>,
    pub sources: ResolvedSources,
}

pub(crate) struct Inner {
    pub config: WorkerConfig,
    pub layout: SourceLayout,
    pub grid: FrameGrid,
    pub backends: MontageBackends,
    pub cache: AnalysisCache,
    store: RunStore,
    cleanups: DelayScheduler,
    permits: Arc<Semaphore>,
    in_flight: AtomicUsize,
}

/// Job lifecycle manager for montage runs.
///
/// Cloning shares the same run table and background machinery.
#[derive(Clone)]
pub struct MontageManager {
    inner: Arc<Inner>,
}

impl MontageManager {
    /// Create a manager with its own run table.
    pub fn new(config: WorkerConfig, backends: MontageBackends) -> WorkerResult<Self> {
        Self::with_store(config, backends, RunStore::new())
    }

    /// Create a manager over an existing run table.
    pub fn with_store(
        config: WorkerConfig,
        backends: MontageBackends,
        store: RunStore,
    ) -> WorkerResult<Self> {
        let grid = FrameGrid::new(config.frame_rate)
            .map_err(|e| WorkerError::config_error(e.to_string()))?;
        if !config.fade_window.is_finite() || config.fade_window < 0.0 {
            return Err(WorkerError::config_error(format!(
                "Invalid fade window: {}",
                config.fade_window
            )));
        }
        if config.max_concurrent_runs == 0 {
            return Err(WorkerError::config_error("max_concurrent_runs must be at least 1"));
        }

        Ok(Self {
            inner: Arc::new(Inner {
                layout: SourceLayout::new(&config),
                permits: Arc::new(Semaphore::new(config.max_concurrent_runs)),
                grid,
                backends,
                cache: AnalysisCache::new(),
                store,
                cleanups: DelayScheduler::new(),
                in_flight: AtomicUsize::new(0),
                config,
            }),
        })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.inner.config
    }

    pub fn layout(&self) -> &SourceLayout {
        &self.inner.layout
    }

    pub(crate) fn inner(&self) -> &Inner {
        &self.inner
    }

    /// Submit a montage using a library track.
    pub async fn submit(&self, request: MontageRequest) -> WorkerResult<RunId> {
        let music = MusicReference::Library(request.music_reference.clone());
        self.submit_with_music(request, music).await
    }

    /// Submit a montage with an explicit music reference.
    ///
    /// An uploaded music file becomes the run's property: it is deleted at
    /// cleanup, or immediately if the submission is rejected.
    ///
    /// Returns as soon as the run is recorded; analysis and rendering happen
    /// in a background task.
    pub async fn submit_with_music(
        &self,
        request: MontageRequest,
        music: MusicReference,
    ) -> WorkerResult<RunId> {
        let job = match self.prepare(&request, &music) {
            Ok(job) => job,
            Err(e) => {
                warn!(source_id = %request.source_id, "Rejected montage request: {}", e);
                metrics::record_run_rejected(rejection_reason(&e));
                if let Some(upload) = music.owned_path() {
                    if let Err(io) = remove_file_if_exists(upload).await {
                        warn!("Failed to delete rejected upload {}: {}", upload.display(), io);
                    }
                }
                return Err(e);
            }
        };

        let run_id = job.run_id.clone();
        let task_run_id = run_id.clone();
        let run = Run::new(run_id.clone(), messages::INITIALIZING);
        self.inner
            .store
            .insert(run, music.owned_path().map(|p| p.to_path_buf()))
            .await;
        metrics::record_run_submitted();
        info!(run_id = %run_id, source_id = %job.source_id, "Montage run submitted");

        self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
        let manager = self.clone();
        tokio::spawn(async move {
            let worker = manager.clone();
            let outcome = tokio::spawn(async move { worker.execute(job).await }).await;

            // A panicking collaborator must still leave the run terminal
            if let Err(e) = outcome {
                if e.is_panic() {
                    error!(run_id = %task_run_id, "Montage task panicked");
                    manager.fail(&task_run_id, messages::FAILED).await;
                }
            }
            manager.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
        });

        Ok(run_id)
    }

    /// Validate a request and resolve its media. No side effects.
    fn prepare(&self, request: &MontageRequest, music: &MusicReference) -> WorkerResult<MontageJob> {
        request.validate()?;

        let region = self
            .inner
            .grid
            .align_region(&request.region)
            .map_err(|e| WorkerError::invalid_request(e.to_string()))?;

        let sources = self.inner.layout.resolve(&request.source_id, music)?;

        Ok(MontageJob {
            run_id: RunId::new(),
            source_id: request.source_id.clone(),
            region,
            beat_markers: request.beat_markers.clone(),
            sources,
        })
    }

    /// Background half of a run.
    async fn execute(&self, job: MontageJob) {
        let logger = RunLogger::new(&job.run_id, &job.source_id, "montage");
        let span = logger.create_span();

        async {
            let _permit = match Arc::clone(&self.inner.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    logger.log_error("run semaphore closed");
                    self.fail(&job.run_id, messages::FAILED).await;
                    return;
                }
            };

            logger.log_start(&format!(
                "{} beat markers over {:.3}s",
                job.beat_markers.len(),
                job.region.duration()
            ));

            match pipeline::run_montage(self, &job, &logger).await {
                Ok(output) => {
                    if self.complete(&job.run_id, output.clone()).await {
                        logger.log_completion(&output.display().to_string());
                    } else {
                        // Run was cleaned up while rendering
                        logger.log_warning("run vanished before completion, discarding output");
                        let _ = remove_file_if_exists(&output).await;
                    }
                }
                Err(e) => {
                    logger.log_error(&e.to_string());
                    self.fail(&job.run_id, messages::FAILED).await;
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Raise a run's progress. No-op for unknown or terminal runs.
    pub async fn advance(&self, id: &RunId, progress: u8, message: &str) -> bool {
        self.transition(id, |run| run.set_progress(progress, message))
            .await
    }

    /// Mark a run completed and arm its cleanup.
    pub async fn complete(&self, id: &RunId, result_path: PathBuf) -> bool {
        let applied = self
            .transition(id, |run| run.set_completed(result_path, messages::COMPLETED))
            .await;
        if applied {
            metrics::record_run_completed();
            self.arm_cleanup(id);
        }
        applied
    }

    /// Mark a run failed and arm its cleanup. Progress is left where it was.
    pub async fn fail(&self, id: &RunId, message: &str) -> bool {
        let applied = self.transition(id, |run| run.set_failed(message)).await;
        if applied {
            metrics::record_run_failed();
            self.arm_cleanup(id);
        }
        applied
    }

    /// Apply `f` to a non-terminal run. Returns whether it was applied.
    async fn transition<F>(&self, id: &RunId, f: F) -> bool
    where
        F: FnOnce(&mut Run),
    {
        let mut applied = false;
        self.inner
            .store
            .update(id, |run| {
                if !run.is_terminal() {
                    f(run);
                    applied = true;
                }
            })
            .await;
        applied
    }

    fn arm_cleanup(&self, id: &RunId) {
        let manager = Arc::downgrade(&self.inner);
        let run_id = id.clone();
        self.inner
            .cleanups
            .schedule(id.as_str(), self.inner.config.run_retention, async move {
                if let Some(inner) = manager.upgrade() {
                    MontageManager { inner }.cleanup(&run_id).await;
                }
            });
    }

    /// Delete a run, its result file and any input it owns.
    ///
    /// Called by the retention timer; calling it early cancels the timer.
    pub async fn cleanup(&self, id: &RunId) -> bool {
        self.inner.cleanups.cancel(id.as_str());

        let Some(removed) = self.inner.store.remove(id).await else {
            return false;
        };

        let files = removed.run.result_path.iter().chain(removed.owned_input.iter());
        for path in files {
            match remove_file_if_exists(path).await {
                Ok(_) => {}
                Err(e) => warn!(run_id = %id, "Failed to delete {}: {}", path.display(), e),
            }
        }

        info!(run_id = %id, status = %removed.run.status, "Cleaned up montage run");
        true
    }

    /// Snapshot of a run.
    pub async fn get_status(&self, id: &RunId) -> WorkerResult<Run> {
        self.inner
            .store
            .get(id)
            .await
            .ok_or_else(|| WorkerError::NotFound(id.to_string()))
    }

    /// Path of a completed run's montage, checked to lie in the output directory.
    pub async fn result_path(&self, id: &RunId) -> WorkerResult<PathBuf> {
        let run = self.get_status(id).await?;

        match run.status {
            RunStatus::Processing => Err(WorkerError::NotReady(id.to_string())),
            RunStatus::Failed => Err(WorkerError::NotFound(format!("{} has no result", id))),
            RunStatus::Completed => {
                let path = run
                    .result_path
                    .filter(|p| p.is_file())
                    .ok_or_else(|| WorkerError::NotFound(format!("{} result missing", id)))?;
                if !self.inner.layout.is_within_output(&path) {
                    return Err(WorkerError::PathRejected(path));
                }
                Ok(path)
            }
        }
    }

    /// Runs submitted and not yet finished.
    pub fn active_runs(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Wait up to `timeout` for in-flight runs to finish.
    ///
    /// Returns whether everything finished.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let wait = async {
            while self.active_runs() > 0 {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    /// Abort pending cleanups. Files of finished runs are left for the
    /// startup purge.
    pub fn shutdown(&self) {
        self.inner.cleanups.shutdown();
    }
}

fn rejection_reason(error: &WorkerError) -> &'static str {
    match error {
        WorkerError::SourceUnavailable(_) => "source_unavailable",
        _ => "invalid_request",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisRequest;
    use async_trait::async_trait;
    use reel_media::{MediaError, MediaResult, RenderGraph};
    use std::path::Path;
    use std::sync::Mutex;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    const CLIPS: &str = r#"[
        {"start_timestamp": "00:00:05", "end_timestamp": "00:00:08"},
        {"start_timestamp": "00:00:20", "end_timestamp": "00:00:22"}
    ]"#;

    #[derive(Default)]
    struct FakeAnalysis {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl AnalysisProvider for FakeAnalysis {
        async fn analyze(&self, _request: &AnalysisRequest) -> WorkerResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(WorkerError::analysis_failed("upstream 500"));
            }
            Ok(CLIPS.to_string())
        }
    }

    #[derive(Default)]
    struct FakeRenderer {
        graphs: Mutex<Vec<String>>,
        gate: Option<Arc<Notify>>,
        fail: bool,
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn render(&self, graph: &RenderGraph, output: &Path) -> MediaResult<()> {
            self.graphs.lock().unwrap().push(graph.filter_complex());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail {
                return Err(MediaError::ffmpeg_failed("exit 1", None, Some(1)));
            }
            tokio::fs::write(output, b"mp4").await?;
            Ok(())
        }
    }

    struct FixedProbe(f64);

    #[async_trait]
    impl DurationProbe for FixedProbe {
        async fn duration(&self, _path: &Path) -> MediaResult<f64> {
            Ok(self.0)
        }
    }

    struct Fixture {
        dir: TempDir,
        manager: MontageManager,
        analysis: Arc<FakeAnalysis>,
        renderer: Arc<FakeRenderer>,
    }

    fn fixture(analysis: FakeAnalysis, renderer: FakeRenderer) -> Fixture {
        let dir = TempDir::new().unwrap();
        let assets = dir.path().join("assets");
        std::fs::create_dir_all(assets.join("videos")).unwrap();
        std::fs::create_dir_all(assets.join("music")).unwrap();
        std::fs::write(assets.join("videos/source_748231_480p.mp4"), b"video").unwrap();
        std::fs::write(assets.join("music/anthem.mp3"), b"music").unwrap();

        let config = WorkerConfig {
            assets_dir: assets,
            output_dir: dir.path().join("downloads"),
            source_bucket: Some("montage-sources".to_string()),
            ..WorkerConfig::default()
        };

        let analysis = Arc::new(analysis);
        let renderer = Arc::new(renderer);
        let backends = MontageBackends {
            analysis: analysis.clone(),
            renderer: renderer.clone(),
            probe: Arc::new(FixedProbe(120.0)),
        };

        Fixture {
            manager: MontageManager::new(config, backends).unwrap(),
            dir,
            analysis,
            renderer,
        }
    }

    fn request() -> MontageRequest {
        MontageRequest {
            source_id: "748231".to_string(),
            region: Region { start: 0.0, end: 10.0 },
            beat_markers: vec![3.0, 3.0, 7.0],
            music_reference: "anthem.mp3".to_string(),
        }
    }

    async fn wait_for_terminal(manager: &MontageManager, id: &RunId) -> Run {
        for _ in 0..500 {
            let run = manager.get_status(id).await.unwrap();
            if run.is_terminal() {
                return run;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("run {} never finished", id);
    }

    #[tokio::test]
    async fn test_submit_returns_before_pipeline_starts() {
        let f = fixture(FakeAnalysis::default(), FakeRenderer::default());
        let id = f.manager.submit(request()).await.unwrap();

        let run = f.manager.get_status(&id).await.unwrap();
        assert_eq!(run.status, RunStatus::Processing);
        assert_eq!(run.progress, 0);
        assert_eq!(run.message, messages::INITIALIZING);
    }

    #[tokio::test]
    async fn test_run_completes() {
        let f = fixture(FakeAnalysis::default(), FakeRenderer::default());
        let id = f.manager.submit(request()).await.unwrap();

        let run = wait_for_terminal(&f.manager, &id).await;
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.progress, 100);
        assert_eq!(run.message, messages::COMPLETED);

        let path = f.manager.result_path(&id).await.unwrap();
        assert!(path.ends_with(format!("final_montage_{}.mp4", id)));
        assert!(path.starts_with(f.dir.path()));

        let graphs = f.renderer.graphs.lock().unwrap();
        assert_eq!(graphs.len(), 1);
        assert!(graphs[0].contains("concat="));
        assert!(graphs[0].contains("[1:a]atrim=start=0:duration="));
    }

    #[tokio::test]
    async fn test_progress_is_ordered() {
        let gate = Arc::new(Notify::new());
        let f = fixture(
            FakeAnalysis::default(),
            FakeRenderer {
                gate: Some(gate.clone()),
                ..FakeRenderer::default()
            },
        );
        let id = f.manager.submit(request()).await.unwrap();

        // Blocked inside the renderer
        let mut run = f.manager.get_status(&id).await.unwrap();
        for _ in 0..500 {
            if !f.renderer.graphs.lock().unwrap().is_empty() {
                run = f.manager.get_status(&id).await.unwrap();
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(run.progress, PROGRESS_RENDERING);
        assert_eq!(run.message, messages::RENDERING);

        gate.notify_one();
        let run = wait_for_terminal(&f.manager, &id).await;
        assert_eq!(run.progress, 100);
    }

    #[tokio::test]
    async fn test_invalid_request_creates_no_run() {
        let f = fixture(FakeAnalysis::default(), FakeRenderer::default());

        let mut req = request();
        req.region = Region { start: 10.0, end: 2.0 };
        assert!(matches!(
            f.manager.submit(req).await,
            Err(WorkerError::InvalidRequest(_))
        ));

        // Collapses to an empty region on the frame grid
        let mut req = request();
        req.region = Region { start: 1.0, end: 1.001 };
        assert!(matches!(
            f.manager.submit(req).await,
            Err(WorkerError::InvalidRequest(_))
        ));

        assert_eq!(f.manager.active_runs(), 0);
        assert_eq!(f.manager.inner.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_missing_source_is_unavailable_and_upload_deleted() {
        let f = fixture(FakeAnalysis::default(), FakeRenderer::default());
        let upload = f.dir.path().join("upload.mp3");
        std::fs::write(&upload, b"music").unwrap();

        let mut req = request();
        req.source_id = "111".to_string();
        let err = f
            .manager
            .submit_with_music(req, MusicReference::Uploaded(upload.clone()))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkerError::SourceUnavailable(_)));
        assert!(!upload.exists());
        assert_eq!(f.manager.inner.store.len().await, 0);
    }

    #[tokio::test]
    async fn test_analysis_failure_fails_run() {
        let f = fixture(
            FakeAnalysis {
                fail: true,
                ..FakeAnalysis::default()
            },
            FakeRenderer::default(),
        );
        let id = f.manager.submit(request()).await.unwrap();

        let run = wait_for_terminal(&f.manager, &id).await;
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.message, messages::FAILED);
        assert_eq!(run.progress, PROGRESS_ANALYZING);
        assert!(f.renderer.graphs.lock().unwrap().is_empty());
        assert!(matches!(
            f.manager.result_path(&id).await,
            Err(WorkerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_render_failure_fails_run() {
        let f = fixture(
            FakeAnalysis::default(),
            FakeRenderer {
                fail: true,
                ..FakeRenderer::default()
            },
        );
        let id = f.manager.submit(request()).await.unwrap();

        let run = wait_for_terminal(&f.manager, &id).await;
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.message, messages::FAILED);
        assert!(run.result_path.is_none());
    }

    struct PanickingRenderer;

    #[async_trait]
    impl Renderer for PanickingRenderer {
        async fn render(&self, _graph: &RenderGraph, _output: &Path) -> MediaResult<()> {
            panic!("encoder crashed");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_renderer_fails_and_cleans_up() {
        let f = fixture(FakeAnalysis::default(), FakeRenderer::default());
        let upload = f.dir.path().join("upload.mp3");
        std::fs::write(&upload, b"music").unwrap();

        let backends = MontageBackends {
            renderer: Arc::new(PanickingRenderer),
            ..f.manager.inner.backends.clone()
        };
        let manager = MontageManager::new(f.manager.config().clone(), backends).unwrap();

        let id = manager
            .submit_with_music(request(), MusicReference::Uploaded(upload.clone()))
            .await
            .unwrap();

        let run = wait_for_terminal(&manager, &id).await;
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.message, messages::FAILED);
        assert!(manager.drain(Duration::from_secs(5)).await);
        assert_eq!(manager.active_runs(), 0);

        tokio::time::sleep(manager.config().run_retention).await;
        for _ in 0..500 {
            if manager.get_status(&id).await.is_err() && !upload.exists() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(matches!(
            manager.get_status(&id).await,
            Err(WorkerError::NotFound(_))
        ));
        assert!(!upload.exists());
    }

    #[tokio::test]
    async fn test_analysis_is_cached_per_source() {
        let f = fixture(FakeAnalysis::default(), FakeRenderer::default());

        let first = f.manager.submit(request()).await.unwrap();
        wait_for_terminal(&f.manager, &first).await;
        let second = f.manager.submit(request()).await.unwrap();
        wait_for_terminal(&f.manager, &second).await;

        assert_eq!(f.analysis.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_result_not_ready_while_processing() {
        let gate = Arc::new(Notify::new());
        let f = fixture(
            FakeAnalysis::default(),
            FakeRenderer {
                gate: Some(gate.clone()),
                ..FakeRenderer::default()
            },
        );
        let id = f.manager.submit(request()).await.unwrap();

        assert!(matches!(
            f.manager.result_path(&id).await,
            Err(WorkerError::NotReady(_))
        ));
        assert!(matches!(
            f.manager.result_path(&RunId::new()).await,
            Err(WorkerError::NotFound(_))
        ));

        gate.notify_one();
        wait_for_terminal(&f.manager, &id).await;
    }

    #[tokio::test]
    async fn test_terminal_runs_ignore_updates() {
        let f = fixture(FakeAnalysis::default(), FakeRenderer::default());
        let id = f.manager.submit(request()).await.unwrap();
        wait_for_terminal(&f.manager, &id).await;

        assert!(!f.manager.advance(&id, 50, "late").await);
        assert!(!f.manager.fail(&id, "late").await);
        assert!(!f.manager.advance(&RunId::new(), 50, "unknown").await);

        let run = f.manager.get_status(&id).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.message, messages::COMPLETED);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_after_retention() {
        let f = fixture(FakeAnalysis::default(), FakeRenderer::default());
        let upload = f.dir.path().join("upload.mp3");
        std::fs::write(&upload, b"music").unwrap();

        let id = f
            .manager
            .submit_with_music(request(), MusicReference::Uploaded(upload.clone()))
            .await
            .unwrap();
        wait_for_terminal(&f.manager, &id).await;
        let result = f.manager.result_path(&id).await.unwrap();

        tokio::time::sleep(f.manager.config().run_retention - Duration::from_secs(1)).await;
        assert!(f.manager.get_status(&id).await.is_ok());

        tokio::time::sleep(Duration::from_secs(2)).await;
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert!(matches!(
            f.manager.get_status(&id).await,
            Err(WorkerError::NotFound(_))
        ));
        assert!(!result.exists());
        assert!(!upload.exists());
    }

    #[tokio::test]
    async fn test_early_cleanup_cancels_timer() {
        let f = fixture(FakeAnalysis::default(), FakeRenderer::default());
        let id = f.manager.submit(request()).await.unwrap();
        wait_for_terminal(&f.manager, &id).await;

        assert!(f.manager.inner.cleanups.is_scheduled(id.as_str()));
        assert!(f.manager.cleanup(&id).await);
        assert!(!f.manager.inner.cleanups.is_scheduled(id.as_str()));
        assert!(!f.manager.cleanup(&id).await);
    }

    #[test]
    fn test_rejects_bad_config() {
        let backends = MontageBackends {
            analysis: Arc::new(FakeAnalysis::default()),
            renderer: Arc::new(FakeRenderer::default()),
            probe: Arc::new(FixedProbe(1.0)),
        };
        let config = WorkerConfig {
            frame_rate: 0.0,
            ..WorkerConfig::default()
        };
        assert!(matches!(
            MontageManager::new(config, backends.clone()),
            Err(WorkerError::Config(_))
        ));

        let config = WorkerConfig {
            max_concurrent_runs: 0,
            ..WorkerConfig::default()
        };
        assert!(MontageManager::new(config, backends).is_err());
    }
}
