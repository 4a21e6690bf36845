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

use std::ops::{Add, Index, Mul, Neg, Sub};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector<const N: usize> {
    pub coords: [f64; N],
}

impl<const N: usize> Default for Vector<N> {
    fn default() -> Vector<N> {
        Vector { coords: [0.0; N] }
    }
}

impl<const N: usize> Vector<N> {
    pub fn new(coords: [f64; N]) -> Self {
        Vector { coords }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn dot(&self, other: &Self) -> f64 {
        (0..N).map(|i| self.coords[i] * other.coords[i]).sum()
    }

    pub fn norm_squared(&self) -> f64 {
        self.dot(self)
    }

    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    pub fn scale(&self, s: f64) -> Self {
        Vector::new(self.coords.map(|c| c * s))
    }

    /// Unit vector in the same direction, `None` for a (near) zero vector.
    pub fn normalized(&self) -> Option<Self> {
        let n = self.norm();
        if n <= f64::EPSILON || !n.is_finite() {
            None
        } else {
            Some(self.scale(1.0 / n))
        }
    }

}

impl Vector<2> {
    /// Z component of the 3D cross product.
    pub fn cross(&self, other: &Self) -> f64 {
        self.coords[0] * other.coords[1] - self.coords[1] * other.coords[0]
    }
}

impl Vector<3> {
    pub fn cross(&self, other: &Self) -> Self {
        let [ax, ay, az] = self.coords;
        let [bx, by, bz] = other.coords;
        Vector::new([ay * bz - az * by, az * bx - ax * bz, ax * by - ay * bx])
    }

    /// Some unit vector perpendicular to `self`.
    pub fn any_perpendicular(&self) -> Self {
        let [x, y, z] = self.coords;
        let helper = if x.abs() <= y.abs() && x.abs() <= z.abs() {
            Vector::new([1.0, 0.0, 0.0])
        } else if y.abs() <= z.abs() {
            Vector::new([0.0, 1.0, 0.0])
        } else {
            Vector::new([0.0, 0.0, 1.0])
        };
        let p = self.cross(&helper);
        p.normalized().unwrap_or(helper)
    }

    /// Angle in radians between two vectors, `None` if either is zero.
    pub fn angle_to(&self, other: &Self) -> Option<f64> {
        let a = self.normalized()?;
        let b = other.normalized()?;
        Some(a.dot(&b).clamp(-1.0, 1.0).acos())
    }
}

impl<const N: usize> Index<usize> for Vector<N> {
    type Output = f64;
    fn index(&self, i: usize) -> &Self::Output {
        &self.coords[i]
    }
}

impl<const N: usize> Add for Vector<N> {
    type Output = Vector<N>;
    fn add(self, rhs: Vector<N>) -> Self::Output {
        Vector::new(std::array::from_fn(|i| self.coords[i] + rhs.coords[i]))
    }
}

impl<const N: usize> Sub for Vector<N> {
    type Output = Vector<N>;
    fn sub(self, rhs: Vector<N>) -> Self::Output {
        Vector::new(std::array::from_fn(|i| self.coords[i] - rhs.coords[i]))
    }
}

impl<const N: usize> Mul<f64> for Vector<N> {
    type Output = Vector<N>;
    fn mul(self, rhs: f64) -> Self::Output {
        self.scale(rhs)
    }
}

impl<const N: usize> Neg for Vector<N> {
    type Output = Vector<N>;
    fn neg(self) -> Self::Output {
        self.scale(-1.0)
    }
}
