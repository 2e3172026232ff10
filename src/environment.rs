/*
 * Environment Module
 *
 * The simulation only sees the terrain through the Environment trait:
 * height and biome lookups, the day/night flag and the closest lake.
 * FlatTerrain is a small in-crate implementation used by the binary, the
 * benchmarks and the tests; a real terrain generator plugs in the same way.
 */

use glam::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Biome {
    Sea,
    Lake,
    Beach,
    Plains,
    Mountain,
    Peak,
}

impl Biome {
    pub fn is_water(self) -> bool {
        matches!(self, Biome::Sea | Biome::Lake)
    }
}

pub trait Environment {
    fn height_at(&self, x: f32, y: f32) -> f32;

    fn biome_at(&self, x: f32, y: f32) -> Biome;

    fn is_night(&self) -> bool;

    /// Closest point on the shore of the nearest lake, if the map has any.
    fn nearest_lake(&self, position: Vec2) -> Option<Vec2>;

    /// Called once at the start of every tick.
    fn advance(&mut self, _dt: f32) {}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lake {
    pub center: Vec2,
    pub radius: f32,
}

impl Lake {
    fn contains(&self, point: Vec2) -> bool {
        point.distance_squared(self.center) <= self.radius * self.radius
    }

    fn shore_point(&self, from: Vec2) -> Vec2 {
        if self.contains(from) {
            return from;
        }
        self.center + (from - self.center).normalize_or_zero() * self.radius
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatTerrain {
    height: f32,
    lakes: Vec<Lake>,
    // Length of a full day or a full night, in simulated seconds
    half_day: Option<f32>,
    clock: f32,
    night: bool,
}

impl Default for FlatTerrain {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl FlatTerrain {
    pub fn new(height: f32) -> Self {
        Self {
            height,
            lakes: Vec::new(),
            half_day: None,
            clock: 0.0,
            night: false,
        }
    }

    pub fn with_lake(mut self, center: Vec2, radius: f32) -> Self {
        self.lakes.push(Lake {
            center,
            radius: radius.max(0.0),
        });
        self
    }

    pub fn with_day_length(mut self, half_day: f32) -> Self {
        self.half_day = (half_day > 0.0).then_some(half_day);
        self
    }

    pub fn lakes(&self) -> &[Lake] {
        &self.lakes
    }

    pub fn set_night(&mut self, night: bool) {
        self.night = night;
    }
}

impl Environment for FlatTerrain {
    fn height_at(&self, _x: f32, _y: f32) -> f32 {
        self.height
    }

    fn biome_at(&self, x: f32, y: f32) -> Biome {
        let point = Vec2::new(x, y);
        if self.lakes.iter().any(|lake| lake.contains(point)) {
            Biome::Lake
        } else {
            Biome::Plains
        }
    }

    fn is_night(&self) -> bool {
        self.night
    }

    fn nearest_lake(&self, position: Vec2) -> Option<Vec2> {
        self.lakes
            .iter()
            .map(|lake| lake.shore_point(position))
            .min_by(|a, b| {
                a.distance_squared(position)
                    .total_cmp(&b.distance_squared(position))
            })
    }

    fn advance(&mut self, dt: f32) {
        if let Some(half_day) = self.half_day {
            self.clock = (self.clock + dt) % (2.0 * half_day);
            self.night = self.clock >= half_day;
        }
    }
}
