//! Render worker - runs in a dedicated thread
//!
//! Owns the backend and executes exactly one job at a time: the scheduler
//! submits the next job only after the previous one's response has been
//! drained, so the single-flight invariant holds structurally.

use flume::{Receiver, Sender};

use crate::geometry::POINTS_PER_INCH;

use super::backend::RenderBackend;
use super::bitmap::{Bitmap, RenderOutput};
use super::request::{RenderError, RenderKey, RenderRequest};

/// A job handed to the worker
#[derive(Debug)]
pub(crate) struct JobSpec {
    pub key: RenderKey,
    pub request: RenderRequest,
    /// Render DPI for the point-to-pixel conversion
    pub dpi: f32,
}

pub(crate) enum WorkerRequest {
    Render(JobSpec),
    Shutdown,
}

pub(crate) enum WorkerResponse {
    Completed {
        key: RenderKey,
        request: RenderRequest,
        output: RenderOutput,
    },
    Failed {
        key: RenderKey,
        error: RenderError,
    },
}

/// Worker loop: drain jobs until shutdown or the scheduler goes away.
pub(crate) fn render_worker(
    mut backend: Box<dyn RenderBackend>,
    requests: Receiver<WorkerRequest>,
    responses: Sender<WorkerResponse>,
) {
    for request in requests {
        match request {
            WorkerRequest::Render(job) => {
                let response = match execute(backend.as_mut(), &job) {
                    Ok(output) => WorkerResponse::Completed {
                        key: job.key,
                        request: job.request,
                        output,
                    },
                    Err(error) => WorkerResponse::Failed {
                        key: job.key,
                        error,
                    },
                };
                if responses.send(response).is_err() {
                    break;
                }
            }
            WorkerRequest::Shutdown => break,
        }
    }
}

fn execute(backend: &mut dyn RenderBackend, job: &JobSpec) -> Result<RenderOutput, RenderError> {
    let request = &job.request;
    let page_index = request.page.saturating_sub(1);

    let info = backend
        .page_info(&request.doc, page_index)
        .map_err(|e| RenderError::Geometry(e.to_string()))?;

    let px_per_pt = job.dpi / POINTS_PER_INCH * request.scale;
    let width_px = ((info.width * px_per_pt).round() as u32).max(1);
    let height_px = ((info.height * px_per_pt).round() as u32).max(1);

    let pixels = backend
        .render_page(&request.doc, page_index, width_px, height_px)
        .map_err(|e| RenderError::Backend(e.to_string()))?;

    if !pixels.is_well_formed() {
        return Err(RenderError::Backend(format!(
            "pixel buffer size mismatch for {}x{}",
            pixels.width, pixels.height
        )));
    }

    Ok(RenderOutput::new(Bitmap::from_rgba(
        pixels.rgba,
        pixels.width,
        pixels.height,
    )))
}
