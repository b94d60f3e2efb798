//! Frame sizes and 2D affine transforms.
//!
//! Transforms use the row-vector convention common to media frameworks:
//!
//! ```text
//!                 | a  b  0 |
//! [x' y' 1] = [x y 1] | c  d  0 |
//!                 | tx ty 1 |
//! ```
//!
//! so `x' = a*x + c*y + tx` and `y' = b*x + d*y + ty`.

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing transform components.
pub const TRANSFORM_EPSILON: f64 = 1e-9;

/// A width/height pair in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Same size with width and height exchanged.
    pub fn swapped(&self) -> Self {
        Self {
            width: self.height,
            height: self.width,
        }
    }

    /// Uniformly scaled copy.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            width: self.width * factor,
            height: self.height * factor,
        }
    }

    /// Whether both dimensions are strictly positive and finite.
    pub fn is_drawable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Width over height, or `None` for degenerate sizes.
    pub fn aspect_ratio(&self) -> Option<f64> {
        self.is_drawable().then(|| self.width / self.height)
    }

    /// Pixel dimensions, rounded to the nearest integer.
    pub fn to_pixels(&self) -> (u32, u32) {
        (
            self.width.round().max(0.0) as u32,
            self.height.round().max(0.0) as u32,
        )
    }
}

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A 2D affine transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub tx: f64,
    pub ty: f64,
}

impl AffineTransform {
    pub const IDENTITY: AffineTransform = AffineTransform {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self {
            tx,
            ty,
            ..Self::IDENTITY
        }
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// Counter-clockwise rotation by `degrees`.
    pub fn rotation_degrees(degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Apply `self` first, then `other`.
    pub fn concat(&self, other: &AffineTransform) -> AffineTransform {
        AffineTransform {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            tx: self.tx * other.a + self.ty * other.c + other.tx,
            ty: self.tx * other.b + self.ty * other.d + other.ty,
        }
    }

    /// Scale applied before this transform.
    pub fn scaled(&self, sx: f64, sy: f64) -> AffineTransform {
        AffineTransform::scale(sx, sy).concat(self)
    }

    /// Map a point through this transform.
    pub fn apply(&self, point: Point) -> Point {
        Point {
            x: self.a * point.x + self.c * point.y + self.tx,
            y: self.b * point.x + self.d * point.y + self.ty,
        }
    }

    /// Rotation angle in degrees, in `(-180, 180]`.
    pub fn rotation_angle_degrees(&self) -> f64 {
        self.b.atan2(self.a).to_degrees()
    }

    pub fn is_identity(&self) -> bool {
        self.approx_eq(&Self::IDENTITY, TRANSFORM_EPSILON)
    }

    /// Component-wise comparison with tolerance.
    pub fn approx_eq(&self, other: &AffineTransform, epsilon: f64) -> bool {
        (self.a - other.a).abs() <= epsilon
            && (self.b - other.b).abs() <= epsilon
            && (self.c - other.c).abs() <= epsilon
            && (self.d - other.d).abs() <= epsilon
            && (self.tx - other.tx).abs() <= epsilon
            && (self.ty - other.ty).abs() <= epsilon
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}
