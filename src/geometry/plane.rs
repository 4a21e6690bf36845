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

use crate::geometry::{Point2, Point3, Vector3};

/// A plane with an orthonormal in-plane frame.
///
/// `x_axis`, `y_axis` and `normal` form a right-handed basis, so projecting
/// into `(x, y)` preserves the orientation seen from the normal side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Plane {
    pub origin: Point3,
    pub x_axis: Vector3,
    pub y_axis: Vector3,
    pub normal: Vector3,
}

impl Plane {
    /// Plane through `origin` with the given normal. `None` for a zero normal.
    pub fn from_point_normal(origin: Point3, normal: Vector3) -> Option<Self> {
        let normal = normal.normalized()?;
        let x_axis = normal.any_perpendicular();
        let y_axis = normal.cross(&x_axis);
        Some(Plane {
            origin,
            x_axis,
            y_axis,
            normal,
        })
    }

    /// Plane from an in-plane frame. The y axis is re-orthogonalized.
    pub fn from_frame(origin: Point3, x_axis: Vector3, y_axis: Vector3) -> Option<Self> {
        let normal = x_axis.cross(&y_axis).normalized()?;
        let x_axis = x_axis.normalized()?;
        let y_axis = normal.cross(&x_axis);
        Some(Plane {
            origin,
            x_axis,
            y_axis,
            normal,
        })
    }

    pub fn from_points(p1: &Point3, p2: &Point3, p3: &Point3) -> Option<Self> {
        Self::from_frame(*p1, p1.vector_to(p2), p1.vector_to(p3))
    }

    /// In-plane coordinates of the orthogonal projection of `p`.
    pub fn project(&self, p: &Point3) -> Point2 {
        let d = self.origin.vector_to(p);
        Point2::new([d.dot(&self.x_axis), d.dot(&self.y_axis)])
    }

    pub fn closest_point(&self, p: &Point3) -> Point3 {
        let uv = self.project(p);
        self.point_at(uv[0], uv[1])
    }

    pub fn point_at(&self, u: f64, v: f64) -> Point3 {
        self.origin
            .add_vector(&(self.x_axis.scale(u) + self.y_axis.scale(v)))
    }

    /// Signed distance, positive on the normal side.
    pub fn distance(&self, p: &Point3) -> f64 {
        self.origin.vector_to(p).dot(&self.normal)
    }

    pub fn flipped(&self) -> Self {
        Plane {
            origin: self.origin,
            x_axis: self.x_axis,
            y_axis: -self.y_axis,
            normal: -self.normal,
        }
    }

    /// Least-squares plane through `pts`, normal oriented to agree with
    /// `reference` when one is given.
    pub fn fit(pts: &[Point3], reference: Option<&Vector3>) -> Option<Self> {
        if pts.len() < 3 {
            return None;
        }
        let inv = 1.0 / pts.len() as f64;
        let mut c = [0.0; 3];
        for p in pts {
            for (ci, pi) in c.iter_mut().zip(p.coords.iter()) {
                *ci += pi * inv;
            }
        }
        let centroid = Point3::new(c);

        let mut cov = [[0.0; 3]; 3];
        for p in pts {
            let d = centroid.vector_to(p);
            for (i, row) in cov.iter_mut().enumerate() {
                for (j, cell) in row.iter_mut().enumerate() {
                    *cell += d[i] * d[j];
                }
            }
        }

        let (vals, vecs) = jacobi_eigen(cov);
        let mut order = [0usize, 1, 2];
        order.sort_by(|&a, &b| vals[a].total_cmp(&vals[b]));
        let column = |k: usize| Vector3::new([vecs[0][k], vecs[1][k], vecs[2][k]]);

        let mut normal = column(order[0]).normalized()?;
        if let Some(r) = reference {
            if normal.dot(r) < 0.0 {
                normal = -normal;
            }
        }
        let x_axis = column(order[2]).normalized()?;
        let y_axis = normal.cross(&x_axis);
        Some(Plane {
            origin: centroid,
            x_axis,
            y_axis,
            normal,
        })
    }
}

/// Eigen-decomposition of a symmetric 3x3 matrix. Columns of the returned
/// matrix are the eigenvectors.
fn jacobi_eigen(mut a: [[f64; 3]; 3]) -> ([f64; 3], [[f64; 3]; 3]) {
    let mut v = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    for _ in 0..50 {
        let off = a[0][1].abs() + a[0][2].abs() + a[1][2].abs();
        if off < 1e-15 {
            break;
        }
        for (p, q) in [(0usize, 1usize), (0, 2), (1, 2)] {
            if a[p][q].abs() < 1e-300 {
                continue;
            }
            let theta = (a[q][q] - a[p][p]) / (2.0 * a[p][q]);
            let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
            let c = 1.0 / (t * t + 1.0).sqrt();
            let s = t * c;
            for k in 0..3 {
                let akp = a[k][p];
                let akq = a[k][q];
                a[k][p] = c * akp - s * akq;
                a[k][q] = s * akp + c * akq;
            }
            for k in 0..3 {
                let apk = a[p][k];
                let aqk = a[q][k];
                a[p][k] = c * apk - s * aqk;
                a[q][k] = s * apk + c * aqk;
            }
            for row in v.iter_mut() {
                let vkp = row[p];
                let vkq = row[q];
                row[p] = c * vkp - s * vkq;
                row[q] = s * vkp + c * vkq;
            }
        }
    }
    ([a[0][0], a[1][1], a[2][2]], v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_recovers_tilted_plane() {
        let n = Vector3::new([0.0, 1.0, 1.0]);
        let base = Plane::from_point_normal(Point3::new([1.0, 2.0, 3.0]), n).unwrap();
        let pts: Vec<Point3> = (0..5)
            .flat_map(|i| (0..4).map(move |j| (i as f64, j as f64 * 0.5)))
            .map(|(u, v)| base.point_at(u, v))
            .collect();
        let fit = Plane::fit(&pts, Some(&n)).unwrap();
        assert!(fit.normal.dot(&base.normal) > 1.0 - 1e-9);
        for p in &pts {
            assert!(fit.distance(p).abs() < 1e-9);
        }
    }

    #[test]
    fn projection_keeps_orientation() {
        let plane = Plane::from_point_normal(Point3::default(), Vector3::new([0.0, 0.0, 1.0])).unwrap();
        let a = plane.project(&Point3::new([0.0, 0.0, 0.0]));
        let b = plane.project(&Point3::new([1.0, 0.0, 0.0]));
        let c = plane.project(&Point3::new([0.0, 1.0, 0.0]));
        assert!(a.vector_to(&b).cross(&a.vector_to(&c)) > 0.0);
    }
}
