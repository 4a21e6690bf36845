// SPDX-License-Identifier: MIT
//
// Copyright (c) 2025 Alexandre Severino
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

use std::{f64::consts::TAU, fmt::Debug};

use crate::geometry::{Point2, Point3, Vector2, Vector3};

use super::surface::Surface;

const LENGTH_SAMPLES: usize = 64;
const LINEAR_TOL: f64 = 1e-9;

/// A 3D edge curve.
pub trait Curve3: Debug {
    fn domain(&self) -> (f64, f64);

    fn point_at(&self, t: f64) -> Point3;

    /// Unit tangent, `None` where the derivative vanishes.
    fn tangent_at(&self, t: f64) -> Option<Vector3>;

    fn is_linear(&self) -> bool {
        let (t0, t1) = self.domain();
        let a = self.point_at(t0);
        let b = self.point_at(t1);
        let chord = a.vector_to(&b);
        let len = chord.norm();
        if len <= LINEAR_TOL {
            return false;
        }
        (1..LENGTH_SAMPLES).all(|i| {
            let t = t0 + (t1 - t0) * i as f64 / LENGTH_SAMPLES as f64;
            chord.cross(&a.vector_to(&self.point_at(t))).norm() / len <= LINEAR_TOL
        })
    }

    /// Polyline length over a fixed sampling of the domain.
    fn length(&self) -> f64 {
        let (t0, t1) = self.domain();
        let mut prev = self.point_at(t0);
        let mut len = 0.0;
        for i in 1..=LENGTH_SAMPLES {
            let p = self.point_at(t0 + (t1 - t0) * i as f64 / LENGTH_SAMPLES as f64);
            len += prev.distance_to(&p);
            prev = p;
        }
        len
    }
}

/// A 2D trim curve in a face's parameter space.
pub trait Curve2: Debug {
    fn domain(&self) -> (f64, f64);

    fn point_at(&self, t: f64) -> Point2;

    fn tangent_at(&self, t: f64) -> Option<Vector2>;

    fn is_closed(&self) -> bool {
        let (t0, t1) = self.domain();
        self.point_at(t0).distance_to(&self.point_at(t1)) <= LINEAR_TOL
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line3 {
    pub a: Point3,
    pub b: Point3,
}

impl Line3 {
    pub fn new(a: Point3, b: Point3) -> Self {
        Line3 { a, b }
    }
}

impl Curve3 for Line3 {
    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn point_at(&self, t: f64) -> Point3 {
        self.a.lerp(&self.b, t)
    }

    fn tangent_at(&self, _t: f64) -> Option<Vector3> {
        self.a.vector_to(&self.b).normalized()
    }

    fn is_linear(&self) -> bool {
        true
    }

    fn length(&self) -> f64 {
        self.a.distance_to(&self.b)
    }
}

/// Circular arc `center + r (cos t x + sin t y)` for `t` in `[t0, t1]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arc3 {
    pub center: Point3,
    pub x_axis: Vector3,
    pub y_axis: Vector3,
    pub radius: f64,
    pub t0: f64,
    pub t1: f64,
}

impl Arc3 {
    /// Full circle in the plane spanned by the unit axes.
    pub fn circle(center: Point3, x_axis: Vector3, y_axis: Vector3, radius: f64) -> Self {
        Arc3 {
            center,
            x_axis,
            y_axis,
            radius,
            t0: 0.0,
            t1: TAU,
        }
    }
}

impl Curve3 for Arc3 {
    fn domain(&self) -> (f64, f64) {
        (self.t0, self.t1)
    }

    fn point_at(&self, t: f64) -> Point3 {
        let d = self.x_axis.scale(self.radius * t.cos()) + self.y_axis.scale(self.radius * t.sin());
        self.center + d
    }

    fn tangent_at(&self, t: f64) -> Option<Vector3> {
        (self.y_axis.scale(t.cos()) - self.x_axis.scale(t.sin())).normalized()
    }

    fn is_linear(&self) -> bool {
        false
    }

    fn length(&self) -> f64 {
        self.radius * (self.t1 - self.t0).abs()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line2 {
    pub a: Point2,
    pub b: Point2,
}

impl Line2 {
    pub fn new(a: Point2, b: Point2) -> Self {
        Line2 { a, b }
    }
}

impl Curve2 for Line2 {
    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn point_at(&self, t: f64) -> Point2 {
        self.a.lerp(&self.b, t)
    }

    fn tangent_at(&self, _t: f64) -> Option<Vector2> {
        self.a.vector_to(&self.b).normalized()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arc2 {
    pub center: Point2,
    pub radius: f64,
    pub t0: f64,
    pub t1: f64,
}

impl Arc2 {
    pub fn circle(center: Point2, radius: f64) -> Self {
        Arc2 {
            center,
            radius,
            t0: 0.0,
            t1: TAU,
        }
    }
}

impl Curve2 for Arc2 {
    fn domain(&self) -> (f64, f64) {
        (self.t0, self.t1)
    }

    fn point_at(&self, t: f64) -> Point2 {
        Point2::new([
            self.center[0] + self.radius * t.cos(),
            self.center[1] + self.radius * t.sin(),
        ])
    }

    fn tangent_at(&self, t: f64) -> Option<Vector2> {
        let s = if self.t1 >= self.t0 { 1.0 } else { -1.0 };
        Vector2::new([-t.sin() * s, t.cos() * s]).normalized()
    }
}

const BRACKET_SAMPLES: usize = 16;
const GOLDEN_ITERS: usize = 60;

/// Parameter in `[t0, t1]` of the trim point whose surface image is closest
/// to `p`. A sampled bracket is refined by golden-section search. `None`
/// when the curve or surface yields non-finite points.
pub fn curve_closest_param(
    curve: &dyn Curve2,
    surface: &dyn Surface,
    p: &Point3,
    range: (f64, f64),
) -> Option<f64> {
    let (t0, t1) = range;
    let dist = |t: f64| {
        let uv = curve.point_at(t);
        let q = surface.point_at(uv[0], uv[1]);
        q.is_finite().then(|| q.distance_squared_to(p))
    };

    let step = (t1 - t0) / BRACKET_SAMPLES as f64;
    let mut best = (t0, dist(t0)?);
    for i in 1..=BRACKET_SAMPLES {
        let t = t0 + step * i as f64;
        let d = dist(t)?;
        if d < best.1 {
            best = (t, d);
        }
    }

    let lo_bound = t0.min(t1);
    let hi_bound = t0.max(t1);
    let mut lo = (best.0 - step.abs()).max(lo_bound);
    let mut hi = (best.0 + step.abs()).min(hi_bound);
    let g = (5f64.sqrt() - 1.0) / 2.0;
    let mut c = hi - g * (hi - lo);
    let mut d = lo + g * (hi - lo);
    let mut fc = dist(c)?;
    let mut fd = dist(d)?;
    for _ in 0..GOLDEN_ITERS {
        if fc < fd {
            hi = d;
            d = c;
            fd = fc;
            c = hi - g * (hi - lo);
            fc = dist(c)?;
        } else {
            lo = c;
            c = d;
            fc = fd;
            d = lo + g * (hi - lo);
            fd = dist(d)?;
        }
    }
    let t = 0.5 * (lo + hi);
    Some(if dist(t)? <= best.1 { t } else { best.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brep::surface::PlaneSurface;
    use crate::geometry::Plane;

    #[test]
    fn circle_is_not_linear_but_line_is() {
        let c = Arc3::circle(
            Point3::new([0.0, 0.0, 0.0]),
            Vector3::new([1.0, 0.0, 0.0]),
            Vector3::new([0.0, 1.0, 0.0]),
            2.0,
        );
        assert!(!c.is_linear());
        assert!((c.length() - 4.0 * std::f64::consts::PI).abs() < 1e-9);
        let l = Line3::new(Point3::new([0.0, 0.0, 0.0]), Point3::new([3.0, 4.0, 0.0]));
        assert!(l.is_linear());
        assert_eq!(l.length(), 5.0);
    }

    #[test]
    fn closed_trim_detection() {
        assert!(Arc2::circle(Point2::new([0.0, 0.0]), 1.0).is_closed());
        assert!(!Line2::new(Point2::new([0.0, 0.0]), Point2::new([1.0, 0.0])).is_closed());
    }

    #[test]
    fn closest_param_on_plane_line() {
        let plane = Plane::from_frame(
            Point3::new([0.0, 0.0, 0.0]),
            Vector3::new([1.0, 0.0, 0.0]),
            Vector3::new([0.0, 1.0, 0.0]),
        )
        .unwrap();
        let s = PlaneSurface::new(plane, (0.0, 4.0), (0.0, 4.0));
        let trim = Line2::new(Point2::new([0.0, 0.0]), Point2::new([4.0, 0.0]));

        let t = curve_closest_param(&trim, &s, &Point3::new([1.0, 2.0, 3.0]), (0.0, 1.0)).unwrap();
        assert!((t - 0.25).abs() < 1e-6);

        // Clamped to the range end.
        let t = curve_closest_param(&trim, &s, &Point3::new([9.0, 0.0, 0.0]), (0.0, 0.5)).unwrap();
        assert!((t - 0.5).abs() < 1e-6);
    }
}
