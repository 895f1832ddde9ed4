//! Worker execution loop.
//!
//! Each worker owns a private job queue and runs edit operations to
//! completion, reporting phase changes and results back over a shared event
//! channel. Workers never share buffers: a job owns its pixels, and the
//! result moves back to the control side in the response.

use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};

use tracing::debug;

use fstop_core::adjustments::apply_adjustments;
use fstop_core::decode::{decode, resize_to_fit};
use fstop_core::transform::{apply_crop, apply_rotation, transform, InterpolationFilter};
use fstop_core::{analyze, apply_tone_curve, Adjustments, PixelBuffer, ToneCurveLut};

use crate::error::EngineError;
use crate::gpu::{self, ComputeBackendError};
use crate::message::{
    AnalysisReport, AssetId, EditOp, EditOutcome, EditPhase, EditSource, RequestId, Response,
};
use crate::orchestrator::ComputeBackend;

/// A unit of work routed to a worker.
pub(crate) struct Job {
    pub id: RequestId,
    pub asset: AssetId,
    pub op: EditOp,
}

/// Events flowing from workers back to the control side.
pub(crate) enum WorkerEvent {
    Phase { id: RequestId, phase: EditPhase },
    Done(Response),
}

/// Per-worker context: event channel, shared latest-id map, backend choice.
pub(crate) struct WorkerContext {
    pub index: usize,
    pub events: mpsc::Sender<WorkerEvent>,
    pub latest: Arc<Mutex<HashMap<AssetId, RequestId>>>,
    pub backend: ComputeBackend,
}

/// The worker loop: runs until the job sender is dropped.
pub(crate) fn run(ctx: WorkerContext, jobs: mpsc::Receiver<Job>) {
    debug!(worker = ctx.index, "worker started");

    while let Ok(job) = jobs.recv() {
        // Advisory cancellation: if a newer request for this asset was
        // issued while this one sat in the queue, skip the compute. The
        // receiver would drop the result anyway.
        let superseded = {
            let latest = ctx.latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            latest.get(&job.asset) != Some(&job.id)
        };
        if superseded {
            debug!(
                worker = ctx.index,
                id = job.id,
                asset = %job.asset,
                "skipping superseded request"
            );
            let _ = ctx.events.send(WorkerEvent::Done(Response {
                id: job.id,
                asset: job.asset,
                outcome: Err(EngineError::Stale),
            }));
            continue;
        }

        let Job { id, asset, op } = job;
        let stage = op.stage_name();
        let outcome = execute(&ctx, id, &asset, op);
        if let Err(err) = &outcome {
            debug!(worker = ctx.index, id, asset = %asset, stage, %err, "request failed");
        }
        let _ = ctx.events.send(WorkerEvent::Done(Response { id, asset, outcome }));
    }

    debug!(worker = ctx.index, "worker stopped");
}

fn report_phase(ctx: &WorkerContext, id: RequestId, phase: EditPhase) {
    let _ = ctx.events.send(WorkerEvent::Phase { id, phase });
}

fn execute(
    ctx: &WorkerContext,
    id: RequestId,
    asset: &AssetId,
    op: EditOp,
) -> Result<EditOutcome, EngineError> {
    match op {
        EditOp::Decode { bytes, format } => {
            report_phase(ctx, id, EditPhase::Decoding);
            let buffer = decode(&bytes, format)?;
            Ok(EditOutcome::Image(buffer))
        }

        EditOp::ApplyRotation { buffer, rotation } => {
            report_phase(ctx, id, EditPhase::Transforming);
            let spec = rotation.validate()?;
            Ok(EditOutcome::Image(apply_rotation(
                &buffer,
                spec.angle_degrees,
                spec.filter,
            )))
        }

        EditOp::ApplyCrop { buffer, crop } => {
            report_phase(ctx, id, EditPhase::Transforming);
            let rect = crop.validate()?;
            Ok(EditOutcome::Image(apply_crop(&buffer, &rect)))
        }

        EditOp::ApplyAdjustments {
            buffer,
            adjustments,
        } => {
            report_phase(ctx, id, EditPhase::Adjusting);
            let image = run_adjustments(ctx, asset, "apply-adjustments", buffer, &adjustments)?;
            Ok(EditOutcome::Image(image))
        }

        EditOp::ApplyToneCurve { mut buffer, curve } => {
            report_phase(ctx, id, EditPhase::Adjusting);
            let lut = ToneCurveLut::from_curve(&curve);
            apply_tone_curve(&mut buffer.pixels, &lut);
            Ok(EditOutcome::Image(buffer))
        }

        EditOp::ComputeHistogram { buffer } => {
            report_phase(ctx, id, EditPhase::Analyzing);
            Ok(EditOutcome::Analysis(analyze_buffer(&buffer)))
        }

        EditOp::RenderEdit {
            source,
            rotation,
            crop,
            adjustments,
            curve,
            preview_max_edge,
        } => {
            let mut image = match source {
                EditSource::Encoded { bytes, format } => {
                    report_phase(ctx, id, EditPhase::Decoding);
                    decode(&bytes, format)?
                }
                EditSource::Pixels(buffer) => buffer,
            };

            let rotation_spec = rotation.as_ref().map(|r| r.validate()).transpose()?;
            let crop_rect = crop.as_ref().map(|c| c.validate()).transpose()?;

            if rotation_spec.is_some() || crop_rect.is_some() {
                report_phase(ctx, id, EditPhase::Transforming);
                let spec = rotation_spec.unwrap_or_default();
                image = transform(&image, &spec, crop_rect.as_ref());
            }

            // Downscale before the tonal stages: per-pixel cost then scales
            // with the preview, not the source.
            if let Some(max_edge) = preview_max_edge {
                image = resize_to_fit(&image, max_edge, InterpolationFilter::Bilinear)?;
            }

            report_phase(ctx, id, EditPhase::Adjusting);
            if !adjustments.is_default() {
                image = run_adjustments(ctx, asset, "render-edit", image, &adjustments)?;
            }
            if !curve.is_linear() {
                let lut = ToneCurveLut::from_curve(&curve);
                apply_tone_curve(&mut image.pixels, &lut);
            }

            report_phase(ctx, id, EditPhase::Analyzing);
            let analysis = analyze_buffer(&image);

            Ok(EditOutcome::Rendered { image, analysis })
        }
    }
}

fn analyze_buffer(buffer: &PixelBuffer) -> AnalysisReport {
    let (histogram, clipping) = analyze(&buffer.pixels, buffer.width, buffer.height);
    AnalysisReport {
        has_shadow_clip: clipping.has_shadow_clipping(),
        has_highlight_clip: clipping.has_highlight_clipping(),
        histogram,
        clipping,
    }
}

/// Run the adjustment chain on the configured backend.
///
/// A lost device invalidates the cached GPU context before the error is
/// surfaced, so a retry starts from re-initialization.
fn run_adjustments(
    ctx: &WorkerContext,
    asset: &AssetId,
    stage: &'static str,
    mut buffer: PixelBuffer,
    adjustments: &Adjustments,
) -> Result<PixelBuffer, EngineError> {
    match ctx.backend {
        ComputeBackend::Cpu => {
            apply_adjustments(&mut buffer.pixels, adjustments);
            Ok(buffer)
        }
        ComputeBackend::Gpu => {
            gpu::apply_adjustments(&buffer, adjustments).map_err(|source| {
                if matches!(source, ComputeBackendError::DeviceLost) {
                    gpu::invalidate_context();
                }
                EngineError::Compute {
                    asset: asset.clone(),
                    stage,
                    source,
                }
            })
        }
    }
}
