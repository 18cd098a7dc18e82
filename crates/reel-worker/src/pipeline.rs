//! Background montage pipeline.
//!
//! Probe the source, fetch (or reuse) the analysis, derive the beat slots,
//! fill them from the clip pool and render. Stages 3 to 5 are pure; only the
//! probe, the analysis call and the render suspend.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use reel_media::{allocate_segments, beat_intervals, build_montage_graph};
use reel_models::timestamp::format_seconds;

use crate::analysis::{parse_clip_pool, AnalysisRequest};
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;
use crate::manager::{
    messages, Inner, MontageJob, MontageManager, PROGRESS_ANALYZING, PROGRESS_RENDERING,
};
use crate::metrics;
use crate::sources::remove_file_if_exists;

/// Run every stage for `job`, returning the rendered montage.
pub(crate) async fn run_montage(
    manager: &MontageManager,
    job: &MontageJob,
    logger: &RunLogger,
) -> WorkerResult<PathBuf> {
    let inner = manager.inner();

    manager
        .advance(&job.run_id, PROGRESS_ANALYZING, messages::ANALYZING)
        .await;

    let source_duration = inner.backends.probe.duration(&job.sources.video).await?;
    logger.log_progress(&format!("source is {} long", format_seconds(source_duration)));

    let request = AnalysisRequest {
        source_uri: job.sources.analysis_uri.clone(),
        duration_hint: Some(source_duration),
    };
    let raw = fetch_analysis(inner, &request).await?;

    let intervals = beat_intervals(&job.beat_markers, &job.region, &inner.grid)?;
    let pool = parse_clip_pool(&raw, source_duration, inner.grid.frame_duration());
    if pool.fallback {
        metrics::record_analysis_fallback();
        logger.log_warning("analysis unusable, montage draws from the full source");
    }
    logger.log_progress(&format!(
        "{} beat slots, {} clips ({} dropped)",
        intervals.len(),
        pool.clips.len(),
        pool.dropped
    ));

    manager
        .advance(&job.run_id, PROGRESS_RENDERING, messages::RENDERING)
        .await;

    let segments = allocate_segments(&intervals, &pool.clips)?;
    let graph = build_montage_graph(
        &segments,
        &job.sources.video,
        &job.sources.music,
        &job.region,
        inner.config.fade_window,
    )?;

    tokio::fs::create_dir_all(inner.layout.output_dir()).await?;
    let output = inner.layout.output_path(&job.run_id);

    let started = Instant::now();
    if let Err(e) = inner.backends.renderer.render(&graph, &output).await {
        // Do not leave a partial file behind
        let _ = remove_file_if_exists(&output).await;
        return Err(WorkerError::render_failed(e.to_string()));
    }
    metrics::record_render_duration(started.elapsed().as_secs_f64());

    Ok(output)
}

/// Analysis text for a source, from the cache when possible.
///
/// Concurrent misses for the same source each call upstream; the last
/// response written wins.
async fn fetch_analysis(inner: &Inner, request: &AnalysisRequest) -> WorkerResult<Arc<str>> {
    if let Some(cached) = inner.cache.get(&request.source_uri).await {
        return Ok(cached);
    }

    let raw: Arc<str> = inner
        .backends
        .analysis
        .analyze(request)
        .await
        .map_err(|e| match e {
            WorkerError::AnalysisFailure(_) => e,
            other => WorkerError::analysis_failed(other.to_string()),
        })?
        .into();

    inner
        .cache
        .put(
            request.source_uri.clone(),
            Arc::clone(&raw),
            inner.config.analysis_cache_ttl,
        )
        .await;

    Ok(raw)
}
