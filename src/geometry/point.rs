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

use std::ops::{Add, Index, IndexMut, Sub};

use crate::geometry::vector::Vector;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point<const N: usize> {
    pub coords: [f64; N],
}

impl<const N: usize> Default for Point<N> {
    fn default() -> Point<N> {
        Point { coords: [0.0; N] }
    }
}

impl<const N: usize> Point<N> {
    pub fn new(coords: [f64; N]) -> Self {
        Point { coords }
    }

    pub fn coords(&self) -> &[f64; N] {
        &self.coords
    }

    pub fn vector_to(&self, other: &Self) -> Vector<N> {
        Vector::new(std::array::from_fn(|i| other.coords[i] - self.coords[i]))
    }

    pub fn add_vector(&self, v: &Vector<N>) -> Self {
        Point::new(std::array::from_fn(|i| self.coords[i] + v.coords[i]))
    }

    pub fn midpoint(&self, other: &Self) -> Self {
        Point::new(std::array::from_fn(|i| 0.5 * (self.coords[i] + other.coords[i])))
    }

    /// Linear interpolation, `t = 0` gives `self`.
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        Point::new(std::array::from_fn(|i| {
            self.coords[i] + (other.coords[i] - self.coords[i]) * t
        }))
    }

    pub fn distance_squared_to(&self, other: &Self) -> f64 {
        (0..N)
            .map(|i| {
                let d = self.coords[i] - other.coords[i];
                d * d
            })
            .sum()
    }

    pub fn distance_to(&self, other: &Self) -> f64 {
        self.distance_squared_to(other).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.coords.iter().all(|c| c.is_finite())
    }
}

impl Point<2> {
    pub fn x(&self) -> f64 {
        self.coords[0]
    }
    pub fn y(&self) -> f64 {
        self.coords[1]
    }
}

impl Point<3> {
    pub fn x(&self) -> f64 {
        self.coords[0]
    }
    pub fn y(&self) -> f64 {
        self.coords[1]
    }
    pub fn z(&self) -> f64 {
        self.coords[2]
    }
}

impl<const N: usize> Index<usize> for Point<N> {
    type Output = f64;
    fn index(&self, i: usize) -> &Self::Output {
        &self.coords[i]
    }
}

impl<const N: usize> IndexMut<usize> for Point<N> {
    fn index_mut(&mut self, i: usize) -> &mut Self::Output {
        &mut self.coords[i]
    }
}

impl<const N: usize> Add<Vector<N>> for Point<N> {
    type Output = Point<N>;
    fn add(self, rhs: Vector<N>) -> Self::Output {
        self.add_vector(&rhs)
    }
}

impl<const N: usize> Sub<Point<N>> for Point<N> {
    type Output = Vector<N>;
    fn sub(self, rhs: Point<N>) -> Self::Output {
        rhs.vector_to(&self)
    }
}

impl<const N: usize> From<[f64; N]> for Point<N> {
    fn from(coords: [f64; N]) -> Self {
        Point { coords }
    }
}
