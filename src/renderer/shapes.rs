//! Triangle tessellation of a race frame
//!
//! Everything is emitted in stage coordinates (1080x1920, y down). Text is not
//! drawn here; the host puts pop-text and the HUD in DOM overlays.

use glam::Vec2;
use std::f32::consts::PI;

use super::vertex::{Vertex, colors, with_alpha};
use crate::consts::{STAGE_HEIGHT, STAGE_WIDTH};
use crate::sim::{EffectKind, EffectView, FrameSnapshot, LaneView, ROAD};

/// Car sprite size at scale 1.0
const CAR_WIDTH: f32 = 84.0;
const CAR_LENGTH: f32 = 132.0;
/// Glow radius around a boosted car at scale 1.0
const GLOW_RADIUS: f32 = 120.0;
/// Particle radius at scale 1.0
const PARTICLE_RADIUS: f32 = 9.0;
const TRAIL_POINT_RADIUS: f32 = 6.0;
const FLAME_RADIUS: f32 = 70.0;

/// Two triangles covering the quad `a b c d` (in winding order)
pub fn quad(a: Vec2, b: Vec2, c: Vec2, d: Vec2, color: [f32; 4]) -> [Vertex; 6] {
    [
        Vertex::at(a, color),
        Vertex::at(b, color),
        Vertex::at(c, color),
        Vertex::at(c, color),
        Vertex::at(d, color),
        Vertex::at(a, color),
    ]
}

/// Axis-aligned rectangle centered on `center`
pub fn rect(center: Vec2, size: Vec2, color: [f32; 4]) -> [Vertex; 6] {
    let h = size / 2.0;
    quad(
        center + Vec2::new(-h.x, -h.y),
        center + Vec2::new(h.x, -h.y),
        center + Vec2::new(h.x, h.y),
        center + Vec2::new(-h.x, h.y),
        color,
    )
}

/// Filled circle as a triangle fan
pub fn circle(center: Vec2, radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    radial(center, radius, color, color, segments)
}

/// Soft glow: opaque center fading to transparent at the rim
pub fn glow(center: Vec2, radius: f32, color: [f32; 4], segments: u32) -> Vec<Vertex> {
    radial(center, radius, color, with_alpha(color, 0.0), segments)
}

fn radial(center: Vec2, radius: f32, inner: [f32; 4], outer: [f32; 4], segments: u32) -> Vec<Vertex> {
    let segments = segments.max(3);
    let mut vertices = Vec::with_capacity(segments as usize * 3);
    for i in 0..segments {
        let theta1 = (i as f32 / segments as f32) * 2.0 * PI;
        let theta2 = ((i + 1) as f32 / segments as f32) * 2.0 * PI;
        vertices.push(Vertex::at(center, inner));
        vertices.push(Vertex::at(center + Vec2::from_angle(theta1) * radius, outer));
        vertices.push(Vertex::at(center + Vec2::from_angle(theta2) * radius, outer));
    }
    vertices
}

/// Thick polyline that tapers and fades from `points[0]` to the last point
pub fn polyline(
    points: &[Vec2],
    width: (f32, f32),
    color: [f32; 4],
    alpha: (f32, f32),
) -> Vec<Vertex> {
    if points.len() < 2 {
        return Vec::new();
    }
    let last = (points.len() - 1) as f32;
    let mut vertices = Vec::with_capacity((points.len() - 1) * 6);

    for (i, pair) in points.windows(2).enumerate() {
        let (p1, p2) = (pair[0], pair[1]);
        let t1 = i as f32 / last;
        let t2 = (i + 1) as f32 / last;
        let w1 = crate::lerp(width.0, width.1, t1) / 2.0;
        let w2 = crate::lerp(width.0, width.1, t2) / 2.0;
        let c1 = with_alpha(color, crate::lerp(alpha.0, alpha.1, t1));
        let c2 = with_alpha(color, crate::lerp(alpha.0, alpha.1, t2));

        let dir = (p2 - p1).normalize_or_zero();
        let perp = dir.perp();

        vertices.push(Vertex::at(p1 + perp * w1, c1));
        vertices.push(Vertex::at(p1 - perp * w1, c1));
        vertices.push(Vertex::at(p2 + perp * w2, c2));

        vertices.push(Vertex::at(p2 + perp * w2, c2));
        vertices.push(Vertex::at(p1 - perp * w1, c1));
        vertices.push(Vertex::at(p2 - perp * w2, c2));
    }
    vertices
}

/// Static road: surface, edges, lane dividers and the checkered finish band
pub fn road() -> Vec<Vertex> {
    let [bl, br, tr, tl] = ROAD.outline();
    let mut vertices = Vec::with_capacity(512);
    vertices.extend(quad(bl, br, tr, tl, colors::ROAD));
    vertices.extend(polyline(&[bl, tl], (8.0, 3.0), colors::ROAD_EDGE, (1.0, 1.0)));
    vertices.extend(polyline(&[br, tr], (8.0, 3.0), colors::ROAD_EDGE, (1.0, 1.0)));

    for dash in ROAD.lane_dividers() {
        vertices.extend(polyline(
            &[dash.from, dash.to],
            (dash.width, dash.width),
            colors::DIVIDER,
            (1.0, 1.0),
        ));
    }

    for square in ROAD.finish_band() {
        let color = if square.light {
            colors::FINISH_LIGHT
        } else {
            colors::FINISH_DARK
        };
        vertices.extend(rect(square.min + square.size / 2.0, square.size, color));
    }
    vertices
}

/// Trail, glow and car body for one lane
pub fn lane(view: &LaneView) -> Vec<Vertex> {
    let mut vertices = polyline(
        &view.trail,
        (ROAD.trail_width(0.0), view.trail_width),
        view.color,
        (0.0, view.trail_opacity),
    );

    if view.glow > 0.0 {
        vertices.extend(glow(
            view.pos,
            GLOW_RADIUS * view.scale,
            with_alpha(view.color, 0.6 * view.glow),
            24,
        ));
    }

    let size = Vec2::new(CAR_WIDTH, CAR_LENGTH) * view.scale;
    vertices.extend(rect(view.pos, size, view.color));
    // Cockpit
    vertices.extend(rect(
        view.pos - Vec2::new(0.0, size.y * 0.12),
        size * Vec2::new(0.56, 0.3),
        colors::CAR_BODY,
    ));
    vertices
}

/// Geometry for a visual effect (pop-text has none)
pub fn effect(view: &EffectView<'_>, color: [f32; 4]) -> Vec<Vertex> {
    match view.kind {
        EffectKind::Particle => circle(
            view.pos,
            PARTICLE_RADIUS * view.scale,
            with_alpha(color, view.opacity),
            8,
        ),
        EffectKind::TrailPoint => circle(
            view.pos,
            TRAIL_POINT_RADIUS * view.scale,
            with_alpha(color, view.opacity),
            6,
        ),
        EffectKind::FlameGlow => glow(
            view.pos,
            FLAME_RADIUS * view.scale,
            with_alpha(colors::FLAME, view.intensity * 0.8),
            16,
        ),
        EffectKind::PopText => Vec::new(),
    }
}

/// Full-stage white flash
pub fn flash(intensity: f32) -> Option<[Vertex; 6]> {
    (intensity > 0.001).then(|| {
        rect(
            Vec2::new(STAGE_WIDTH, STAGE_HEIGHT) / 2.0,
            Vec2::new(STAGE_WIDTH, STAGE_HEIGHT),
            with_alpha(colors::FLASH, intensity * 0.5),
        )
    })
}

/// Tessellate a whole frame, back to front, with the shake offset applied
pub fn frame(snapshot: &FrameSnapshot<'_>) -> Vec<Vertex> {
    let mut vertices = road();

    for view in &snapshot.effects {
        if view.kind == EffectKind::TrailPoint {
            vertices.extend(effect(view, snapshot.lanes[view.lane].color));
        }
    }
    // Far lanes first so nearer cars overlap them
    let mut order: Vec<&LaneView> = snapshot.lanes.iter().collect();
    order.sort_by(|a, b| a.pos.y.total_cmp(&b.pos.y));
    for view in order {
        vertices.extend(lane(view));
    }
    for view in &snapshot.effects {
        if matches!(view.kind, EffectKind::FlameGlow | EffectKind::Particle) {
            vertices.extend(effect(view, snapshot.lanes[view.lane].color));
        }
    }

    if snapshot.shake != Vec2::ZERO {
        for v in &mut vertices {
            v.position[0] += snapshot.shake.x;
            v.position[1] += snapshot.shake.y;
        }
    }
    if let Some(overlay) = flash(snapshot.flash) {
        vertices.extend(overlay);
    }
    vertices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{EffectsScheduler, RaceState};

    #[test]
    fn test_circle_vertex_count() {
        assert_eq!(circle(Vec2::ZERO, 5.0, [1.0; 4], 12).len(), 36);
        // Degenerate segment counts are bumped to a triangle
        assert_eq!(circle(Vec2::ZERO, 5.0, [1.0; 4], 1).len(), 9);
    }

    #[test]
    fn test_glow_fades_to_rim() {
        let g = glow(Vec2::ZERO, 10.0, [1.0, 0.0, 0.0, 0.8], 8);
        assert_eq!(g[0].color[3], 0.8);
        assert_eq!(g[1].color[3], 0.0);
    }

    #[test]
    fn test_polyline_needs_two_points() {
        assert!(polyline(&[Vec2::ZERO], (4.0, 4.0), [1.0; 4], (1.0, 1.0)).is_empty());
        let line = polyline(
            &[Vec2::ZERO, Vec2::new(0.0, 10.0), Vec2::new(0.0, 20.0)],
            (4.0, 2.0),
            [1.0; 4],
            (0.0, 1.0),
        );
        assert_eq!(line.len(), 12);
        assert_eq!(line[0].color[3], 0.0);
        assert_eq!(line[11].color[3], 1.0);
        // Vertical segment widens along x
        assert!((line[0].position[0].abs() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_road_stays_on_stage() {
        for v in road() {
            assert!((0.0..=STAGE_WIDTH).contains(&v.position[0]));
            assert!((0.0..=STAGE_HEIGHT).contains(&v.position[1]));
        }
    }

    #[test]
    fn test_pop_text_has_no_geometry() {
        let state = RaceState::new(1);
        let mut fx = EffectsScheduler::new(0, 1);
        fx.spawn_pop(0, "+1", 1.0);
        let snap = FrameSnapshot::capture(&state, &fx, &[], None);
        assert!(effect(&snap.effects[0], [1.0; 4]).is_empty());
    }

    #[test]
    fn test_shake_moves_everything_but_flash() {
        let state = RaceState::new(1);
        let fx = EffectsScheduler::new(0, 1);
        let mut snap = FrameSnapshot::capture(&state, &fx, &[], Some(8));
        let still = frame(&snap);

        snap.shake = Vec2::new(5.0, -3.0);
        let shaken = frame(&snap);
        assert_eq!(still.len(), shaken.len());
        assert_eq!(shaken[0].position[0], still[0].position[0] + 5.0);
        assert_eq!(shaken[0].position[1], still[0].position[1] - 3.0);

        snap.flash = 1.0;
        let flashed = frame(&snap);
        assert_eq!(flashed.len(), shaken.len() + 6);
        assert_eq!(flashed.last().map(|v| v.position), Some([0.0, 0.0]));
    }
}
