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

/// An axis‐aligned bounding box in N dimensions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb<const N: usize> {
    pub min: Point<N>,
    pub max: Point<N>,
}

impl<const N: usize> Aabb<N> {
    pub fn new(min: Point<N>, max: Point<N>) -> Self {
        Aabb { min, max }
    }

    pub fn min(&self) -> &Point<N> {
        &self.min
    }

    /// Access the maximum corner.
    pub fn max(&self) -> &Point<N> {
        &self.max
    }

    /// Build the smallest AABB containing two points.
    pub fn from_points(a: &Point<N>, b: &Point<N>) -> Self {
        let mins = std::array::from_fn(|i| a[i].min(b[i]));
        let maxs = std::array::from_fn(|i| a[i].max(b[i]));
        Aabb::new(Point::new(mins), Point::new(maxs))
    }

    pub fn from_point(p: &Point<N>) -> Self {
        Aabb::new(*p, *p)
    }

    /// Smallest box around all of `pts`, `None` when empty.
    pub fn around<'a>(pts: impl IntoIterator<Item = &'a Point<N>>) -> Option<Self> {
        let mut it = pts.into_iter();
        let first = Aabb::from_point(it.next()?);
        Some(it.fold(first, |acc, p| acc.including(p)))
    }

    pub fn including(&self, p: &Point<N>) -> Self {
        self.union(&Aabb::from_point(p))
    }

    /// Grow by `d` on every side.
    pub fn expanded(&self, d: f64) -> Self {
        Aabb::new(
            Point::new(std::array::from_fn(|i| self.min[i] - d)),
            Point::new(std::array::from_fn(|i| self.max[i] + d)),
        )
    }

    /// Grow only along axis `i`.
    pub fn expanded_axis(&self, i: usize, d: f64) -> Self {
        let mut out = *self;
        out.min[i] -= d;
        out.max[i] += d;
        out
    }

    pub fn union(&self, other: &Aabb<N>) -> Aabb<N> {
        let mins = std::array::from_fn(|i| self.min[i].min(other.min[i]));
        let maxs = std::array::from_fn(|i| self.max[i].max(other.max[i]));
        Aabb::new(Point::new(mins), Point::new(maxs))
    }

    /// Does this AABB intersect `other`? Touching boxes intersect.
    pub fn intersects(&self, other: &Aabb<N>) -> bool {
        for i in 0..N {
            if self.max[i] < other.min[i] || other.max[i] < self.min[i] {
                return false;
            }
        }
        true
    }

    pub fn contains(&self, p: &Point<N>) -> bool {
        (0..N).all(|i| p[i] >= self.min[i] && p[i] <= self.max[i])
    }

    /// Center coordinate along axis `i`.
    pub fn center(&self, i: usize) -> f64 {
        0.5 * (self.min[i] + self.max[i])
    }

    /// Length along axis `i`.
    pub fn extent(&self, i: usize) -> f64 {
        (self.max[i] - self.min[i]).abs()
    }

    /// Return the axis index with largest extent.
    pub fn longest_axis(&self) -> usize {
        let mut best_i = 0usize;
        let mut best = self.extent(0);
        for i in 1..N {
            let e = self.extent(i);
            if e > best {
                best_i = i;
                best = e;
            }
        }
        best_i
    }
}
