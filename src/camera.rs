/*
 * Camera Module
 *
 * Zoom and pan for the viewer. The simulation works in world units with the
 * origin at the centre of the map; the camera maps those to window points
 * and back.
 */

use nannou::prelude::*;

const MIN_ZOOM: f32 = 0.5;
const MAX_ZOOM: f32 = 40.0;

pub struct Camera {
    pub center: Vec2,
    pub zoom: f32,
    drag_anchor: Option<Vec2>,
}

impl Camera {
    /// A camera showing the whole world inside `window_rect`.
    pub fn fit(world_size: f32, window_rect: Rect) -> Self {
        let span = window_rect.w().min(window_rect.h());
        let zoom = (0.9 * span / world_size.max(1.0)).clamp(MIN_ZOOM, MAX_ZOOM);
        Self {
            center: Vec2::ZERO,
            zoom,
            drag_anchor: None,
        }
    }

    pub fn world_to_screen(&self, point: Vec2, window_rect: Rect) -> Vec2 {
        (point - self.center) * self.zoom + window_rect.xy()
    }

    pub fn screen_to_world(&self, point: Vec2, window_rect: Rect) -> Vec2 {
        (point - window_rect.xy()) / self.zoom + self.center
    }

    // World lengths (radii, boid sizes) on screen
    pub fn scale(&self, length: f32) -> f32 {
        length * self.zoom
    }

    /// Zooms by `scroll` steps, keeping the world point under the cursor fixed.
    pub fn zoom_at(&mut self, scroll: f32, cursor: Vec2, window_rect: Rect) {
        let before = self.screen_to_world(cursor, window_rect);
        self.zoom = (self.zoom * (1.0 + scroll * 0.1)).clamp(MIN_ZOOM, MAX_ZOOM);
        let after = self.screen_to_world(cursor, window_rect);
        self.center += before - after;
    }

    pub fn start_drag(&mut self, cursor: Vec2) {
        self.drag_anchor = Some(cursor);
    }

    pub fn drag(&mut self, cursor: Vec2) {
        if let Some(anchor) = self.drag_anchor {
            self.center -= (cursor - anchor) / self.zoom;
            self.drag_anchor = Some(cursor);
        }
    }

    pub fn end_drag(&mut self) {
        self.drag_anchor = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }
}
