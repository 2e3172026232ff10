/*
 * Application Module
 *
 * The interactive viewer. It owns a BoidsManager, advances it a few ticks
 * per frame and draws what the read-only accessors expose:
 * - lakes and rooted boids as discs
 * - movable boids as triangles pointing along their facing angle,
 *   coloured by behaviour state
 * - optional vision ranges and relationship links
 *
 * nannou builds the model from a plain function, so the world is handed
 * over through a one-time cell filled by `run`.
 */

use log::info;
use nannou::prelude::*;
use nannou::winit::event::{MouseButton, MouseScrollDelta, TouchPhase};
use nannou_egui::Egui;
use once_cell::sync::OnceCell;

use crate::boid::BoidType;
use crate::camera::Camera;
use crate::environment::FlatTerrain;
use crate::manager::BoidsManager;
use crate::movable_boid::{MovableBoid, Prey};
use crate::state::MovableState;
use crate::ui::{self, Controls, PanelStats};

static WORLD: OnceCell<(BoidsManager<FlatTerrain>, f32)> = OnceCell::new();

pub struct Model {
    pub manager: BoidsManager<FlatTerrain>,
    pub initial: BoidsManager<FlatTerrain>,
    pub egui: Egui,
    pub camera: Camera,
    pub controls: Controls,
    pub stats: PanelStats,
    pub mouse_position: Vec2,
}

/// Opens the viewer on `manager`, advancing it by `dt` per tick. Blocks
/// until the window closes.
pub fn run(manager: BoidsManager<FlatTerrain>, dt: f32) {
    if WORLD.set((manager, dt)).is_err() {
        log::warn!("Viewer already started, ignoring the new world");
        return;
    }
    nannou::app(model).update(update).run();
}

pub fn model(app: &App) -> Model {
    let (manager, dt) = WORLD
        .get()
        .cloned()
        .expect("app::run stores the world before nannou starts");

    let window_id = app
        .new_window()
        .title("Boid Ecosystem")
        .size(1280, 800)
        .view(view)
        .mouse_moved(mouse_moved)
        .mouse_pressed(mouse_pressed)
        .mouse_released(mouse_released)
        .mouse_wheel(mouse_wheel)
        .raw_event(raw_window_event)
        .build()
        .expect("failed to open the viewer window");
    let window = app.window(window_id).expect("window was just created");
    let egui = Egui::from_window(&window);

    let camera = Camera::fit(manager.params().world_size, window.rect());
    info!(
        "Viewer opened with {} movable and {} rooted boids",
        manager.movable_boids().len(),
        manager.rooted_boids().len()
    );

    Model {
        initial: manager.clone(),
        manager,
        egui,
        camera,
        controls: Controls::new(dt),
        stats: PanelStats::default(),
        mouse_position: Vec2::ZERO,
    }
}

pub fn update(app: &App, model: &mut Model, update: Update) {
    model.stats.fps = app.fps();
    model.stats.frame_time = update.since_last;
    model.stats.zoom = model.camera.zoom;
    model.stats.night = model.manager.is_night();

    let requests = ui::update_ui(&mut model.egui, &mut model.controls, &model.stats);
    if requests.reset_world {
        model.manager = model.initial.clone();
    }
    if requests.reset_camera {
        model.camera = Camera::fit(model.manager.params().world_size, app.window_rect());
    }
    if requests.toggle_night {
        let night = model.manager.is_night();
        model.manager.environment_mut().set_night(!night);
    }

    let ticks = match (model.controls.paused, requests.step_once) {
        (false, _) => model.controls.ticks_per_frame,
        (true, true) => 1,
        (true, false) => 0,
    };
    for _ in 0..ticks {
        model.stats.last_report = model.manager.tick(model.controls.dt);
    }
    model.stats.census = model.manager.census();
}

fn state_color(state: MovableState) -> Rgb<u8> {
    match state {
        MovableState::Test => rgb(255, 0, 255),
        MovableState::Walk => rgb(220, 220, 220),
        MovableState::Stay => rgb(160, 160, 160),
        MovableState::FindFood => rgb(255, 200, 60),
        MovableState::Attack => rgb(230, 40, 40),
        MovableState::Eat => rgb(150, 90, 30),
        MovableState::Flee => rgb(255, 120, 200),
        MovableState::Lost => rgb(140, 100, 220),
        MovableState::Sleep => rgb(70, 70, 140),
        MovableState::FindWater => rgb(80, 180, 255),
        MovableState::Drink => rgb(30, 90, 200),
        MovableState::Mate => rgb(255, 80, 140),
        MovableState::Dead => rgb(60, 60, 60),
    }
}

fn to_screen(model: &Model, x: f32, y: f32, window_rect: Rect) -> Vec2 {
    model.camera.world_to_screen(vec2(x, y), window_rect)
}

fn draw_boid(draw: &Draw, model: &Model, boid: &MovableBoid, window_rect: Rect) {
    let size = match boid.species() {
        BoidType::Wolf => 1.6,
        _ => 1.0,
    };
    let size = model.camera.scale(size).max(3.0);
    let position = boid.position();
    let points = [
        pt2(size, 0.0),
        pt2(-size, size / 2.0),
        pt2(-size, -size / 2.0),
    ];

    draw.polygon()
        .color(state_color(boid.state()))
        .points(points)
        .xy(to_screen(model, position.x, position.y, window_rect))
        .rotate(boid.angle());
}

fn draw_links(draw: &Draw, model: &Model, boid: &MovableBoid, window_rect: Rect) {
    let position = boid.position();
    let from = to_screen(model, position.x, position.y, window_rect);

    let prey = match boid.prey() {
        Some(Prey::Movable(id)) => model.manager.agent(id).map(|a| (a.position(), RED)),
        Some(Prey::Rooted(id)) => model.manager.resource(id).map(|r| (r.position(), ORANGE)),
        None => None,
    };
    let leader = boid
        .leader()
        .filter(|&id| id != boid.id())
        .and_then(|id| model.manager.agent(id))
        .map(|leader| (leader.position(), LIGHTGRAY));

    for (target, color) in prey.into_iter().chain(leader) {
        draw.line()
            .start(from)
            .end(to_screen(model, target.x, target.y, window_rect))
            .color(color)
            .stroke_weight(1.0);
    }
}

pub fn view(app: &App, model: &Model, frame: Frame) {
    let draw = app.draw();
    let window_rect = app.window_rect();

    let background = if model.manager.is_night() {
        rgb(10u8, 12, 30)
    } else {
        rgb(28u8, 48, 28)
    };
    draw.background().color(background);

    // World bounds
    let half = model.manager.params().half_world();
    let corner_a = to_screen(model, -half, -half, window_rect);
    let corner_b = to_screen(model, half, half, window_rect);
    draw.rect()
        .xy((corner_a + corner_b) / 2.0)
        .wh(corner_b - corner_a)
        .no_fill()
        .stroke(GRAY)
        .stroke_weight(1.0);

    for lake in model.manager.environment().lakes() {
        draw.ellipse()
            .xy(to_screen(model, lake.center.x, lake.center.y, window_rect))
            .radius(model.camera.scale(lake.radius))
            .color(rgb(40u8, 90, 200));
    }

    for rooted in model.manager.rooted_boids() {
        let color = match rooted.species() {
            BoidType::Carrot => rgb(240u8, 130, 20),
            _ => rgb(20u8, 90, 30),
        };
        let position = rooted.position();
        draw.ellipse()
            .xy(to_screen(model, position.x, position.y, window_rect))
            .radius(model.camera.scale(rooted.boid().min_distance()).max(2.0))
            .color(color);
    }

    for boid in model.manager.movable_boids() {
        if model.controls.show_vision {
            let position = boid.position();
            draw.ellipse()
                .xy(to_screen(model, position.x, position.y, window_rect))
                .radius(model.camera.scale(boid.parameters().dist_view_max()))
                .no_fill()
                .stroke(rgba(1.0, 1.0, 1.0, 0.15))
                .stroke_weight(1.0);
        }
        if model.controls.show_links {
            draw_links(&draw, model, boid, window_rect);
        }
        draw_boid(&draw, model, boid, window_rect);
    }

    if let Err(err) = draw.to_frame(app, &frame) {
        log::error!("Failed to draw frame: {}", err);
    }
    if let Err(err) = model.egui.draw_to_frame(&frame) {
        log::error!("Failed to draw the panel: {}", err);
    }
}

pub fn mouse_moved(_app: &App, model: &mut Model, pos: Point2) {
    if model.camera.is_dragging() {
        model.camera.drag(pos);
    }
    model.mouse_position = pos;
}

pub fn mouse_pressed(_app: &App, model: &mut Model, button: MouseButton) {
    // Clicks on the panel must not move the camera
    if button == MouseButton::Left && !model.egui.ctx().is_pointer_over_area() {
        model.camera.start_drag(model.mouse_position);
    }
}

pub fn mouse_released(_app: &App, model: &mut Model, button: MouseButton) {
    if button == MouseButton::Left {
        model.camera.end_drag();
    }
}

pub fn mouse_wheel(app: &App, model: &mut Model, delta: MouseScrollDelta, _phase: TouchPhase) {
    let scroll = match delta {
        MouseScrollDelta::LineDelta(_, y) => y,
        MouseScrollDelta::PixelDelta(pos) => pos.y as f32 * 0.01,
    };
    model
        .camera
        .zoom_at(scroll, model.mouse_position, app.window_rect());
}

pub fn raw_window_event(_app: &App, model: &mut Model, event: &nannou::winit::event::WindowEvent) {
    model.egui.handle_raw_event(event);
}
