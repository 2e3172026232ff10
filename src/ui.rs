/*
 * UI Module
 *
 * The egui control panel of the viewer: pause, single step, simulation
 * speed, overlays, a census of the population and the last tick report.
 * The panel only edits Controls and returns what the user asked for; the
 * app module acts on it.
 */

use std::time::Duration;

use nannou_egui::{egui, Egui};

use crate::boid::BoidType;
use crate::debug::{Census, TickReport};
use crate::state::MovableState;

pub struct Controls {
    pub paused: bool,
    pub ticks_per_frame: u32,
    pub dt: f32,
    pub show_vision: bool,
    pub show_links: bool,
}

impl Controls {
    pub fn new(dt: f32) -> Self {
        Self {
            paused: false,
            ticks_per_frame: 1,
            dt,
            show_vision: false,
            show_links: false,
        }
    }
}

// Frame timing plus the latest simulation summaries
#[derive(Default)]
pub struct PanelStats {
    pub fps: f32,
    pub frame_time: Duration,
    pub zoom: f32,
    pub night: bool,
    pub census: Census,
    pub last_report: TickReport,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct UiRequests {
    pub step_once: bool,
    pub reset_world: bool,
    pub reset_camera: bool,
    pub toggle_night: bool,
}

pub fn update_ui(egui: &mut Egui, controls: &mut Controls, stats: &PanelStats) -> UiRequests {
    let mut requests = UiRequests::default();
    let ctx = egui.begin_frame();

    egui::Window::new("Ecosystem")
        .default_pos([10.0, 10.0])
        .show(&ctx, |ui| {
            ui.collapsing("Simulation", |ui| {
                ui.checkbox(&mut controls.paused, "Pause");
                if ui.button("Step").clicked() {
                    requests.step_once = true;
                }
                ui.add(egui::Slider::new(&mut controls.ticks_per_frame, 1..=20).text("Ticks per frame"));
                ui.add(egui::Slider::new(&mut controls.dt, 0.01..=0.5).text("Time step"));
                if ui.button("Reset world").clicked() {
                    requests.reset_world = true;
                }
                let label = if stats.night { "Make it day" } else { "Make it night" };
                if ui.button(label).clicked() {
                    requests.toggle_night = true;
                }
            });

            ui.collapsing("View", |ui| {
                ui.checkbox(&mut controls.show_vision, "Vision ranges");
                ui.checkbox(&mut controls.show_links, "Hunter, prey and leader links");
                ui.label(format!("Zoom: {:.2}x", stats.zoom));
                if ui.button("Reset camera").clicked() {
                    requests.reset_camera = true;
                }
            });

            ui.collapsing("Census", |ui| {
                let census = &stats.census;
                ui.label(format!("Tick: {}", census.tick));
                for species in BoidType::ALL.into_iter().filter(|s| s.is_movable()) {
                    ui.label(format!("{}: {}", species, census.species(species)));
                }
                ui.separator();
                for state in MovableState::ALL {
                    let count = census.state(state);
                    if count > 0 {
                        ui.label(format!("{}: {}", state, count));
                    }
                }
                ui.separator();
                ui.label(format!(
                    "Resources: {} ({:.0} food)",
                    census.resources, census.food_remaining
                ));
            });

            ui.separator();
            ui.label(format!("FPS: {:.1}", stats.fps));
            ui.label(format!(
                "Frame time: {:.2} ms",
                stats.frame_time.as_secs_f64() * 1000.0
            ));
            ui.label(stats.last_report.to_string());
        });

    requests
}
