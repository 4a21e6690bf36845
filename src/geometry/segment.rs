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

use crate::geometry::point::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment<const N: usize> {
    pub a: Point<N>,
    pub b: Point<N>,
}

impl<const N: usize> Segment<N> {
    pub fn new(a: &Point<N>, b: &Point<N>) -> Self {
        Self { a: *a, b: *b }
    }

    pub fn length(&self) -> f64 {
        self.a.distance_to(&self.b)
    }

    pub fn midpoint(&self) -> Point<N> {
        self.a.midpoint(&self.b)
    }

    /// Parameter of the closest point on the segment, clamped to `[0, 1]`.
    pub fn closest_param(&self, p: &Point<N>) -> f64 {
        let ab = self.a.vector_to(&self.b);
        let len2 = ab.norm_squared();
        if len2 <= f64::EPSILON * f64::EPSILON {
            return 0.0;
        }
        (self.a.vector_to(p).dot(&ab) / len2).clamp(0.0, 1.0)
    }

    /// Distance from `p` to the segment (not the infinite line).
    pub fn distance_to_point(&self, p: &Point<N>) -> f64 {
        let t = self.closest_param(p);
        self.a.lerp(&self.b, t).distance_to(p)
    }
}

impl Segment<2> {
    /// Parameters `(s, t)` at which the supporting lines cross, `None` when
    /// parallel. Both are in `[0, 1]` when the segments themselves meet.
    pub fn line_intersection_params(&self, other: &Segment<2>) -> Option<(f64, f64)> {
        let r = self.a.vector_to(&self.b);
        let s = other.a.vector_to(&other.b);
        let denom = r.cross(&s);
        let scale = r.norm() * s.norm();
        if scale <= 0.0 || denom.abs() <= 1e-12 * scale {
            return None;
        }
        let qp = self.a.vector_to(&other.a);
        Some((qp.cross(&s) / denom, qp.cross(&r) / denom))
    }
}
