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

use crate::geometry::{Plane, Point2, Point3, Vector3};

/// Surface oracle for one face.
pub trait Surface: Debug {
    /// `(u range, v range)`.
    fn domain(&self) -> ((f64, f64), (f64, f64));

    fn point_at(&self, u: f64, v: f64) -> Point3;

    /// Unit normal along `du x dv`, `None` at a parametric singularity.
    fn normal_at(&self, u: f64, v: f64) -> Option<Vector3>;

    /// Parameters and position of the surface point nearest `p`.
    fn closest_point(&self, p: &Point3) -> Option<(Point2, Point3)>;

    /// The supporting plane when the surface is flat.
    fn planar(&self) -> Option<Plane> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneSurface {
    pub plane: Plane,
    pub u: (f64, f64),
    pub v: (f64, f64),
}

impl PlaneSurface {
    pub fn new(plane: Plane, u: (f64, f64), v: (f64, f64)) -> Self {
        PlaneSurface { plane, u, v }
    }
}

impl Surface for PlaneSurface {
    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        (self.u, self.v)
    }

    fn point_at(&self, u: f64, v: f64) -> Point3 {
        self.plane.point_at(u, v)
    }

    fn normal_at(&self, _u: f64, _v: f64) -> Option<Vector3> {
        Some(self.plane.normal)
    }

    fn closest_point(&self, p: &Point3) -> Option<(Point2, Point3)> {
        let uv = self.plane.project(p);
        Some((uv, self.plane.point_at(uv[0], uv[1])))
    }

    fn planar(&self) -> Option<Plane> {
        Some(self.plane)
    }
}

/// Cylinder around `axis` through `origin`; `u` is the angle from
/// `x_axis`, `v` the height along the axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CylinderSurface {
    pub origin: Point3,
    pub x_axis: Vector3,
    pub y_axis: Vector3,
    pub axis: Vector3,
    pub radius: f64,
    pub height: f64,
}

impl CylinderSurface {
    fn radial(&self, u: f64) -> Vector3 {
        self.x_axis.scale(u.cos()) + self.y_axis.scale(u.sin())
    }
}

fn angle_of(x: f64, y: f64) -> f64 {
    let a = y.atan2(x);
    if a < 0.0 { a + TAU } else { a }
}

impl Surface for CylinderSurface {
    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        ((0.0, TAU), (0.0, self.height))
    }

    fn point_at(&self, u: f64, v: f64) -> Point3 {
        self.origin + self.radial(u).scale(self.radius) + self.axis.scale(v)
    }

    fn normal_at(&self, u: f64, _v: f64) -> Option<Vector3> {
        self.radial(u).normalized()
    }

    fn closest_point(&self, p: &Point3) -> Option<(Point2, Point3)> {
        let d = self.origin.vector_to(p);
        let x = d.dot(&self.x_axis);
        let y = d.dot(&self.y_axis);
        if x.abs() + y.abs() == 0.0 {
            return None;
        }
        let u = angle_of(x, y);
        let v = d.dot(&self.axis).clamp(0.0, self.height);
        Some((Point2::new([u, v]), self.point_at(u, v)))
    }
}

/// Cone with its apex at `apex`, opening along `axis` to `radius` at
/// `height`. The apex row `v = 0` is singular.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConeSurface {
    pub apex: Point3,
    pub x_axis: Vector3,
    pub y_axis: Vector3,
    pub axis: Vector3,
    pub radius: f64,
    pub height: f64,
}

impl ConeSurface {
    fn radial(&self, u: f64) -> Vector3 {
        self.x_axis.scale(u.cos()) + self.y_axis.scale(u.sin())
    }
}

impl Surface for ConeSurface {
    fn domain(&self) -> ((f64, f64), (f64, f64)) {
        ((0.0, TAU), (0.0, self.height))
    }

    fn point_at(&self, u: f64, v: f64) -> Point3 {
        let k = self.radius / self.height;
        self.apex + self.radial(u).scale(k * v) + self.axis.scale(v)
    }

    fn normal_at(&self, u: f64, v: f64) -> Option<Vector3> {
        if v.abs() <= f64::EPSILON * self.height.max(1.0) {
            return None;
        }
        (self.radial(u).scale(self.height) - self.axis.scale(self.radius)).normalized()
    }

    fn closest_point(&self, p: &Point3) -> Option<(Point2, Point3)> {
        let d = self.apex.vector_to(p);
        let x = d.dot(&self.x_axis);
        let y = d.dot(&self.y_axis);
        let u = if x.abs() + y.abs() == 0.0 { 0.0 } else { angle_of(x, y) };
        // Project onto the generator line at angle u.
        let k = self.radius / self.height;
        let dir = self.radial(u).scale(k) + self.axis;
        let v = (d.dot(&dir) / dir.norm_squared()).clamp(0.0, self.height);
        Some((Point2::new([u, v]), self.point_at(u, v)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cyl() -> CylinderSurface {
        CylinderSurface {
            origin: Point3::new([0.0, 0.0, 0.0]),
            x_axis: Vector3::new([1.0, 0.0, 0.0]),
            y_axis: Vector3::new([0.0, 1.0, 0.0]),
            axis: Vector3::new([0.0, 0.0, 1.0]),
            radius: 2.0,
            height: 3.0,
        }
    }

    #[test]
    fn cylinder_closest_point_round_trips() {
        let s = cyl();
        let p = s.point_at(1.0, 2.0);
        let (uv, q) = s.closest_point(&p).unwrap();
        assert!((uv[0] - 1.0).abs() < 1e-12 && (uv[1] - 2.0).abs() < 1e-12);
        assert!(q.distance_to(&p) < 1e-12);
    }

    #[test]
    fn cylinder_normal_matches_parametric_orientation() {
        let s = cyl();
        let (u, v, h) = (0.7, 1.0, 1e-6);
        let p = s.point_at(u, v);
        let du = p.vector_to(&s.point_at(u + h, v));
        let dv = p.vector_to(&s.point_at(u, v + h));
        let n = du.cross(&dv).normalized().unwrap();
        assert!(n.dot(&s.normal_at(u, v).unwrap()) > 0.999);
    }

    #[test]
    fn cone_apex_is_singular() {
        let s = ConeSurface {
            apex: Point3::new([0.0, 0.0, 0.0]),
            x_axis: Vector3::new([1.0, 0.0, 0.0]),
            y_axis: Vector3::new([0.0, 1.0, 0.0]),
            axis: Vector3::new([0.0, 0.0, 1.0]),
            radius: 1.0,
            height: 2.0,
        };
        assert!(s.normal_at(0.3, 0.0).is_none());
        let (u, v, h) = (2.0, 1.0, 1e-6);
        let p = s.point_at(u, v);
        let du = p.vector_to(&s.point_at(u + h, v));
        let dv = p.vector_to(&s.point_at(u, v + h));
        let n = du.cross(&dv).normalized().unwrap();
        assert!(n.dot(&s.normal_at(u, v).unwrap()) > 0.999);
    }
}
