use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// A point or direction in the sagittal (x-z) plane.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Vec2 {
    pub x: f32,
    pub z: f32,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, z: 0.0 };

    #[must_use]
    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }

    #[must_use]
    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.z * other.z
    }

    #[must_use]
    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Rotates the vector counter-clockwise (x towards z) by `angle` radians.
    #[must_use]
    pub fn rotate(self, angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(self.x * c - self.z * s, self.x * s + self.z * c)
    }

    /// Derivative of a rotation about a pivot: the vector turned by +90°.
    #[must_use]
    pub fn perp(self) -> Self {
        Self::new(-self.z, self.x)
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.z.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.z + rhs.z)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.z += rhs.z;
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.z * rhs)
    }
}

impl Neg for Vec2 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.z)
    }
}

/// A body point that can touch the ground, with the chain of generalised
/// coordinates that move it.
#[derive(Copy, Clone, Debug)]
pub struct ContactPoint {
    /// World position.
    pub pos: Vec2,
    /// `∂pos/∂q` for every generalised coordinate (zero for joints that do
    /// not move this point).
    pub jacobian: [Vec2; crate::cheetah::NQ],
}

impl ContactPoint {
    /// Point velocity for the given generalised velocity.
    #[must_use]
    pub fn velocity(&self, qvel: &[f32]) -> Vec2 {
        self.jacobian
            .iter()
            .zip(qvel)
            .fold(Vec2::ZERO, |acc, (j, &v)| acc + *j * v)
    }
}
