//! Positional audio snapshot.
//!
//! A [`PositionalData`] value holds the avatar and camera pose reported by
//! the active provider together with its context and identity strings. The
//! registry keeps one shared snapshot behind an `RwLock`; readers get
//! clones.

use std::ops::{Add, Mul, Neg, Sub};

use serde::Serialize;

/// Three-component vector in the game's coordinate system (metres).
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vector3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

#[expect(
    clippy::float_arithmetic,
    reason = "vector maths is float arithmetic by definition"
)]
impl Vector3 {
    /// The zero vector.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a vector from its components.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Squared Euclidean length.
    #[must_use]
    pub fn norm_squared(self) -> f32 {
        self.dot(self)
    }

    /// Euclidean length.
    #[must_use]
    pub fn norm(self) -> f32 {
        self.norm_squared().sqrt()
    }

    /// Dot product.
    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product.
    #[must_use]
    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    /// Returns the unit vector in the same direction, or zero for a zero
    /// vector.
    #[must_use]
    pub fn normalized(self) -> Self {
        let length = self.norm();
        if length <= f32::EPSILON {
            return Self::ZERO;
        }
        self * (1.0 / length)
    }

    /// Component-wise equality within `tolerance`.
    #[must_use]
    pub fn approx_eq(self, other: Self, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.z - other.z).abs() <= tolerance
    }

    /// Returns `true` when every component is within `tolerance` of zero.
    #[must_use]
    pub fn is_zero(self, tolerance: f32) -> bool {
        self.approx_eq(Self::ZERO, tolerance)
    }

    /// Returns `true` when no component is NaN or infinite.
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Pointer to three consecutive floats, for plugins to write through.
    pub(crate) fn as_mut_ptr(&mut self) -> *mut f32 {
        std::ptr::from_mut(self).cast::<f32>()
    }
}

#[expect(clippy::float_arithmetic, reason = "vector addition")]
impl Add for Vector3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

#[expect(clippy::float_arithmetic, reason = "vector subtraction")]
impl Sub for Vector3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

#[expect(clippy::float_arithmetic, reason = "scalar multiplication")]
impl Mul<f32> for Vector3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vector3 {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

/// Avatar and camera pose plus the strings identifying the game session.
///
/// Zeroed whenever no plugin provides positional data.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PositionalData {
    pub(crate) avatar_position: Vector3,
    pub(crate) avatar_front: Vector3,
    pub(crate) avatar_top: Vector3,
    pub(crate) camera_position: Vector3,
    pub(crate) camera_front: Vector3,
    pub(crate) camera_top: Vector3,
    pub(crate) context: String,
    pub(crate) identity: String,
}

impl PositionalData {
    /// Creates a zeroed snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Avatar position.
    #[must_use]
    pub const fn avatar_position(&self) -> Vector3 {
        self.avatar_position
    }

    /// Direction the avatar faces.
    #[must_use]
    pub const fn avatar_front(&self) -> Vector3 {
        self.avatar_front
    }

    /// Avatar up axis.
    #[must_use]
    pub const fn avatar_top(&self) -> Vector3 {
        self.avatar_top
    }

    /// Camera position.
    #[must_use]
    pub const fn camera_position(&self) -> Vector3 {
        self.camera_position
    }

    /// Direction the camera faces.
    #[must_use]
    pub const fn camera_front(&self) -> Vector3 {
        self.camera_front
    }

    /// Camera up axis.
    #[must_use]
    pub const fn camera_top(&self) -> Vector3 {
        self.camera_top
    }

    /// Context string; users only hear each other positionally when their
    /// contexts match.
    #[must_use]
    pub fn context(&self) -> &str {
        &self.context
    }

    /// Identity string describing the local player in game.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns `true` when every vector is zero and both strings are empty.
    #[must_use]
    pub fn is_zeroed(&self) -> bool {
        *self == Self::default()
    }

    /// Zeroes every vector and clears both strings.
    pub fn reset(&mut self) {
        self.zero_vectors();
        self.context.clear();
        self.identity.clear();
    }

    pub(crate) fn zero_vectors(&mut self) {
        for vector in self.vectors_mut() {
            *vector = Vector3::ZERO;
        }
    }

    pub(crate) fn vectors_mut(&mut self) -> [&mut Vector3; 6] {
        [
            &mut self.avatar_position,
            &mut self.avatar_front,
            &mut self.avatar_top,
            &mut self.camera_position,
            &mut self.camera_front,
            &mut self.camera_top,
        ]
    }

    /// Replaces NaN or infinite vectors with zero. Returns how many were
    /// replaced.
    pub(crate) fn sanitize(&mut self) -> usize {
        let mut replaced = 0;
        for vector in self.vectors_mut() {
            if !vector.is_finite() {
                *vector = Vector3::ZERO;
                replaced += 1;
            }
        }
        replaced
    }

    /// Builder used by built-in providers and tests.
    #[must_use]
    pub fn with_avatar(mut self, position: Vector3, front: Vector3, top: Vector3) -> Self {
        self.avatar_position = position;
        self.avatar_front = front;
        self.avatar_top = top;
        self
    }

    /// Builder used by built-in providers and tests.
    #[must_use]
    pub fn with_camera(mut self, position: Vector3, front: Vector3, top: Vector3) -> Self {
        self.camera_position = position;
        self.camera_front = front;
        self.camera_top = top;
        self
    }
}
