use glam::{Mat4, Vec3};
use tracing::trace;

use crate::material::Material;
use crate::pipeline::PipelineOptions;

/// Camera/view configuration for rendering.
#[derive(Debug, Clone, Copy)]
pub struct RenderView {
    /// Camera position in world space.
    pub eye: Vec3,
    /// Point the camera is looking at.
    pub target: Vec3,
    /// Field of view in degrees.
    pub fov_degrees: f32,
}

impl Default for RenderView {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 10.0, 10.0),
            target: Vec3::ZERO,
            fov_degrees: 60.0,
        }
    }
}

/// One mesh draw request.
#[derive(Debug, Clone)]
pub struct DrawWork {
    /// Asset key of the mesh to draw.
    pub mesh: String,
    pub model: Mat4,
    pub material: Material,
    pub options: PipelineOptions,
}

/// One compute dispatch request.
#[derive(Debug, Clone)]
pub struct ComputeWork {
    /// Asset key of the compute shader.
    pub shader: String,
    pub workgroups: [u32; 3],
}

/// Work item in submission order.
#[derive(Debug, Clone)]
pub enum FrameWork {
    Draw(DrawWork),
    Compute(ComputeWork),
}

/// Per-frame work queue.
///
/// Submission order is preserved exactly; the backend drains the queue once
/// per frame and owns any reordering it wants to do after that.
#[derive(Debug, Default)]
pub struct FrameQueue {
    work: Vec<FrameWork>,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_draw(&mut self, draw: DrawWork) {
        self.work.push(FrameWork::Draw(draw));
    }

    pub fn push_compute(&mut self, compute: ComputeWork) {
        self.work.push(FrameWork::Compute(compute));
    }

    pub fn len(&self) -> usize {
        self.work.len()
    }

    pub fn is_empty(&self) -> bool {
        self.work.is_empty()
    }

    /// Take the frame's work, leaving the queue empty for the next frame.
    pub fn drain(&mut self) -> Vec<FrameWork> {
        trace!(items = self.work.len(), "frame drained");
        std::mem::take(&mut self.work)
    }
}
