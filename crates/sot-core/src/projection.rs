//! World-to-screen projection.
//!
//! The camera basis follows the engine's rotator convention (degrees, pitch
//! about Y, yaw about Z, roll about X). Camera-space axes are remapped as
//! `(right, up, forward) = (row1, row2, row0)`.

use serde::{Deserialize, Serialize};

use crate::memory::layout::actor::{DEFAULT_FOV, UNITS_PER_METER};

/// Position in display units (metres)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Convert raw engine units.
    pub fn from_raw(raw: [f32; 3]) -> Self {
        Self::new(
            raw[0] as f64 / UNITS_PER_METER,
            raw[1] as f64 / UNITS_PER_METER,
            raw[2] as f64 / UNITS_PER_METER,
        )
    }

    pub fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// All components exactly zero (unread or uninitialized)
    pub fn is_zero(self) -> bool {
        self.x == 0.0 && self.y == 0.0 && self.z == 0.0
    }

    fn as_array(self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

/// Camera orientation in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotator {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Rotator {
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraState {
    pub position: Vector3,
    pub rotation: Rotator,
    pub fov: f64,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            position: Vector3::ZERO,
            rotation: Rotator::default(),
            fov: DEFAULT_FOV,
        }
    }
}

impl CameraState {
    /// Decode a `x, y, z, pitch, yaw, roll` block of raw f32s.
    pub fn from_coords(coords: [f32; 6], fov: f64) -> Self {
        Self {
            position: Vector3::from_raw([coords[0], coords[1], coords[2]]),
            rotation: Rotator::new(coords[3] as f64, coords[4] as f64, coords[5] as f64),
            fov,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ScreenSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl ScreenSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Size of the primary monitor, if the platform can report it
    #[cfg(target_os = "windows")]
    pub fn primary_monitor() -> Option<Self> {
        use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

        // SAFETY: GetSystemMetrics has no preconditions.
        let (width, height) = unsafe { (GetSystemMetrics(SM_CXSCREEN), GetSystemMetrics(SM_CYSCREEN)) };
        (width > 0 && height > 0).then(|| Self::new(width as u32, height as u32))
    }

    #[cfg(not(target_os = "windows"))]
    pub fn primary_monitor() -> Option<Self> {
        None
    }

    /// Configured size, else the primary monitor, else 1920x1080.
    pub fn resolve(width: u32, height: u32) -> Self {
        if width > 0 && height > 0 {
            return Self::new(width, height);
        }
        Self::primary_monitor().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Projection {
    OnScreen { x: f64, y: f64 },
    OffScreen,
}

impl Projection {
    pub fn is_on_screen(&self) -> bool {
        matches!(self, Projection::OnScreen { .. })
    }
}

pub fn build_rotation_matrix(rotation: Rotator) -> [[f64; 3]; 3] {
    let (sp, cp) = rotation.pitch.to_radians().sin_cos();
    let (sy, cy) = rotation.yaw.to_radians().sin_cos();
    let (sr, cr) = rotation.roll.to_radians().sin_cos();

    [
        [cp * cy, cp * sy, sp],
        [sr * sp * cy - cr * sy, sr * sp * sy + cr * cy, -sr * cp],
        [-(cr * sp * cy + sr * sy), cy * sr - cr * sp * sy, cr * cp],
    ]
}

/// Dot product; an all-zero axis yields 0.
fn dot(v: [f64; 3], axis: [f64; 3]) -> f64 {
    if axis == [0.0; 3] {
        return 0.0;
    }
    v[0] * axis[0] + v[1] * axis[1] + v[2] * axis[2]
}

pub fn world_to_screen(camera: &CameraState, target: Vector3, screen: ScreenSize) -> Projection {
    let matrix = build_rotation_matrix(camera.rotation);
    let delta = target.sub(camera.position).as_array();

    let right = dot(delta, matrix[1]);
    let up = dot(delta, matrix[2]);
    let forward = dot(delta, matrix[0]);

    if forward < 1.0 {
        return Projection::OffScreen;
    }

    let width = screen.width as f64;
    let height = screen.height as f64;
    let center_x = width / 2.0;
    let center_y = height / 2.0;
    let scale = center_x / (camera.fov.to_radians() / 2.0).tan();

    let x = center_x + right * scale / forward;
    if !(0.0..=width).contains(&x) {
        return Projection::OffScreen;
    }
    let y = center_y - up * scale / forward;
    if !(0.0..=height).contains(&y) {
        return Projection::OffScreen;
    }

    Projection::OnScreen { x, y }
}

pub fn distance(a: Vector3, b: Vector3) -> f64 {
    a.sub(b).length()
}

/// Round to `digits` decimal places
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}
