// THEORY:
// Concurrent front-ends for `AestheticPipeline`. Every component is synchronous
// and CPU-bound, so concurrency here means putting that work on tokio's blocking
// threads and awaiting the results.
//
// Two shapes are offered:
// 1.  **Per-image fan-out** (`analyze_concurrently`): the independent components
//     of one analysis (color statistics, complexity, symmetry, self-similarity,
//     layout, detectors) each run on their own blocking task and are joined
//     before the report is built. The intensity field and the shared quad-tree
//     are built once up front. The stage functions are the same ones the
//     synchronous path calls, so the report is identical.
// 2.  **Worker pool** (`ParallelPipeline`): a dispatcher hands whole images to a
//     fixed set of workers round-robin; each job answers on its own oneshot
//     channel. Nothing is shared between jobs except the read-only pipeline.

use crate::core_modules::color_metrics;
use crate::core_modules::intensity_field::IntensityField;
use crate::error::{AnalysisError, Result};
use crate::pipeline::AestheticPipeline;
use crate::report::{AnalysisReport, ReportBuilder};
use image::DynamicImage;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinError, JoinHandle, spawn_blocking};
use tracing::{debug, info};

/// Runs the components of one analysis on separate blocking tasks.
///
/// Must be called from within a tokio runtime.
pub async fn analyze_concurrently(
    pipeline: &AestheticPipeline,
    image: &DynamicImage,
) -> Result<AnalysisReport> {
    let working = Arc::new(pipeline.working_image(image)?);
    let config = pipeline.config();
    let plan = config.method.plan();
    info!(
        method = %config.method,
        width = working.width(),
        height = working.height(),
        "starting concurrent aesthetic analysis"
    );

    let (field, tree) = {
        let (pipeline, working) = (pipeline.clone(), Arc::clone(&working));
        let (field, tree) = spawn_blocking(move || {
            let field = IntensityField::from_rgb(&working);
            let tree = pipeline.shared_tree(&field);
            (field, tree)
        })
        .await?;
        (Arc::new(field), Arc::new(tree))
    };

    let colors = {
        let working = Arc::clone(&working);
        let palette = plan.runs_color_palette;
        spawn_blocking(move || {
            (
                color_metrics::brightness(&working),
                color_metrics::colorfulness(&working),
                palette.then(|| color_metrics::color_distribution(&working)),
            )
        })
    };
    let complexity = {
        let (pipeline, tree) = (pipeline.clone(), Arc::clone(&tree));
        spawn_blocking(move || pipeline.complexity(&tree))
    };
    let symmetry = {
        let (pipeline, field, tree) = (pipeline.clone(), Arc::clone(&field), Arc::clone(&tree));
        spawn_blocking(move || pipeline.symmetry(&field, &tree))
    };
    let self_similarity = plan.runs_self_similarity.then(|| {
        let (pipeline, field) = (pipeline.clone(), Arc::clone(&field));
        spawn_blocking(move || pipeline.self_similarity(&field))
    });
    let layout = plan.runs_region_layout.then(|| {
        let (pipeline, working) = (pipeline.clone(), Arc::clone(&working));
        spawn_blocking(move || pipeline.layout(&working))
    });
    let faces = plan.runs_external_detectors.then(|| {
        let (pipeline, working) = (pipeline.clone(), Arc::clone(&working));
        spawn_blocking(move || pipeline.detect_faces(&working))
    });
    let text = plan.runs_external_detectors.then(|| {
        let (pipeline, working) = (pipeline.clone(), Arc::clone(&working));
        spawn_blocking(move || pipeline.detect_text(&working))
    });

    let (colors, complexity, symmetry, self_similarity, layout, faces, text) = tokio::try_join!(
        colors,
        complexity,
        symmetry,
        optional(self_similarity),
        optional(layout),
        optional(faces),
        optional(text),
    )?;
    debug!("all component tasks joined");

    let (brightness, colorfulness, palette) = colors;
    let mut builder = ReportBuilder::new(config.method, working.dimensions())
        .brightness(brightness)
        .colorfulness(colorfulness)
        .complexity(complexity)
        .symmetry(symmetry);
    if let Some(palette) = palette {
        builder = builder.color_distribution(palette);
    }
    if let Some(score) = self_similarity {
        builder = builder.self_similarity(score);
    }
    if let Some(layout) = layout {
        builder = builder.layout(layout);
    }
    if let Some(faces) = faces {
        builder = builder.faces(faces?);
    }
    if let Some(text) = text {
        builder = builder.text(text?);
    }
    builder.build()
}

async fn optional<T>(handle: Option<JoinHandle<T>>) -> std::result::Result<Option<T>, JoinError> {
    match handle {
        Some(handle) => handle.await.map(Some),
        None => Ok(None),
    }
}

struct AnalysisJob {
    image: DynamicImage,
    reply: oneshot::Sender<Result<AnalysisReport>>,
}

/// Fixed set of workers fed by a round-robin dispatcher.
pub struct WorkerPool {
    job_sender: mpsc::UnboundedSender<AnalysisJob>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `size` workers (at least one). Must be called within a tokio runtime.
    pub fn new(pipeline: AestheticPipeline, size: usize) -> Self {
        let size = size.max(1);
        let (job_sender, mut job_receiver) = mpsc::unbounded_channel::<AnalysisJob>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..size)
            .map(|_| mpsc::unbounded_channel::<AnalysisJob>())
            .unzip();

        tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(job) = job_receiver.recv().await {
                // A closed worker drops the job, which closes its reply channel.
                let _ = worker_senders[worker_idx].send(job);
                worker_idx = (worker_idx + 1) % size;
            }
        });

        let workers = worker_receivers
            .into_iter()
            .enumerate()
            .map(|(worker_id, mut worker_receiver)| {
                let pipeline = pipeline.clone();
                tokio::spawn(async move {
                    while let Some(AnalysisJob { image, reply }) = worker_receiver.recv().await {
                        let job_pipeline = pipeline.clone();
                        let result = spawn_blocking(move || job_pipeline.analyze(&image))
                            .await
                            .unwrap_or_else(|e| Err(AnalysisError::Task(e)));
                        debug!(worker_id, ok = result.is_ok(), "worker finished a job");
                        let _ = reply.send(result);
                    }
                })
            })
            .collect();

        Self {
            job_sender,
            workers,
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    pub async fn submit(&self, image: DynamicImage) -> Result<AnalysisReport> {
        let (reply, result_receiver) = oneshot::channel();
        self.job_sender
            .send(AnalysisJob { image, reply })
            .map_err(|_| AnalysisError::PoolClosed("failed to send job to worker pool"))?;
        result_receiver
            .await
            .map_err(|_| AnalysisError::PoolClosed("worker dropped the job"))?
    }
}

/// Pipeline front-end for analyzing many images at once.
pub struct ParallelPipeline {
    pipeline: AestheticPipeline,
    worker_pool: WorkerPool,
}

impl ParallelPipeline {
    /// One worker per logical CPU.
    pub fn new(pipeline: AestheticPipeline) -> Self {
        Self::with_workers(pipeline, num_cpus::get())
    }

    pub fn with_workers(pipeline: AestheticPipeline, workers: usize) -> Self {
        let worker_pool = WorkerPool::new(pipeline.clone(), workers);
        Self {
            pipeline,
            worker_pool,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_pool.size()
    }

    /// Analyzes one image on the next free worker.
    pub async fn analyze(&self, image: DynamicImage) -> Result<AnalysisReport> {
        self.worker_pool.submit(image).await
    }

    /// Analyzes one image with its components fanned out over blocking tasks.
    pub async fn analyze_concurrently(&self, image: &DynamicImage) -> Result<AnalysisReport> {
        analyze_concurrently(&self.pipeline, image).await
    }

    /// Analyzes every image; results keep the input order.
    pub async fn analyze_batch(&self, images: Vec<DynamicImage>) -> Vec<Result<AnalysisReport>> {
        futures::future::join_all(images.into_iter().map(|image| self.analyze(image))).await
    }
}
