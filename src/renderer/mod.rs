//! WebGPU rendering module
//!
//! Tessellates a [`FrameSnapshot`](crate::sim::FrameSnapshot) into colored
//! triangles and draws them in a single alpha-blended pass.

pub mod pipeline;
pub mod shapes;
pub mod vertex;

pub use pipeline::{RenderState, stage_to_ndc};
pub use vertex::Vertex;

/// Renderer setup failures
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("no GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),

    #[error("surface reports no supported formats")]
    NoSurfaceFormat,
}
