//! Vertex type for the race renderer

use bytemuck::{Pod, Zeroable};
use glam::Vec2;

/// Colored 2D vertex (stage space until uploaded, NDC on the GPU)
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub color: [f32; 4],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x2, 1 => Float32x4];

    pub const fn new(x: f32, y: f32, color: [f32; 4]) -> Self {
        Self {
            position: [x, y],
            color,
        }
    }

    #[inline]
    pub fn at(pos: Vec2, color: [f32; 4]) -> Self {
        Self::new(pos.x, pos.y, color)
    }

    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Scale a color's alpha
#[inline]
pub fn with_alpha(color: [f32; 4], alpha: f32) -> [f32; 4] {
    [color[0], color[1], color[2], color[3] * alpha.clamp(0.0, 1.0)]
}

/// Colors for scene elements
pub mod colors {
    pub const BACKGROUND: [f32; 4] = [0.027, 0.031, 0.059, 1.0];
    pub const ROAD: [f32; 4] = [0.09, 0.094, 0.129, 1.0];
    pub const ROAD_EDGE: [f32; 4] = [1.0, 1.0, 1.0, 0.18];
    pub const DIVIDER: [f32; 4] = [1.0, 1.0, 1.0, 0.35];
    pub const FINISH_LIGHT: [f32; 4] = [0.95, 0.95, 0.95, 0.9];
    pub const FINISH_DARK: [f32; 4] = [0.08, 0.08, 0.08, 0.9];
    pub const CAR_BODY: [f32; 4] = [0.12, 0.12, 0.16, 1.0];
    pub const FLAME: [f32; 4] = [1.0, 0.55, 0.15, 1.0];
    pub const FLASH: [f32; 4] = [1.0, 1.0, 1.0, 1.0];
}
