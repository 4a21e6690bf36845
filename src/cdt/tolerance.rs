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

use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

/// User tessellation tolerances. Zero means "not set".
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CdtTolerances {
    /// Absolute chord deviation bound.
    pub abs: f64,
    /// Minimum segment length as a fraction of the edge curve length.
    pub rel: f64,
    /// Angular tolerance in radians.
    pub norm: f64,
    /// Maximum edge length.
    pub absmax: f64,
}

impl Default for CdtTolerances {
    fn default() -> Self {
        CdtTolerances {
            abs: 0.0,
            rel: 0.01,
            norm: 0.0,
            absmax: 0.0,
        }
    }
}

impl CdtTolerances {
    pub fn with_abs(mut self, abs: f64) -> Self {
        self.abs = abs;
        self
    }

    pub fn with_rel(mut self, rel: f64) -> Self {
        self.rel = rel;
        self
    }

    pub fn with_norm(mut self, norm: f64) -> Self {
        self.norm = norm;
        self
    }

    pub fn with_absmax(mut self, absmax: f64) -> Self {
        self.absmax = absmax;
        self
    }

    /// Bounds for one edge whose curve has length `cp_len`.
    pub fn digest(&self, cp_len: f64) -> ToleranceSet {
        let max_dist = if self.absmax > 0.0 {
            self.absmax
        } else {
            1.1 * cp_len
        };
        let min_dist = (self.rel * cp_len).min(max_dist);
        let within_dist = if self.abs > 0.0 { self.abs } else { f64::INFINITY };
        let ang = if self.norm > 0.0 { self.norm } else { FRAC_PI_2 };
        ToleranceSet {
            min_dist,
            max_dist,
            within_dist,
            cos_within_ang: ang.cos(),
        }
    }
}

/// Per-edge split bounds derived from [`CdtTolerances`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ToleranceSet {
    pub min_dist: f64,
    pub max_dist: f64,
    /// Allowed midpoint deviation from the chord. Infinite when only the
    /// segment length limits it.
    pub within_dist: f64,
    pub cos_within_ang: f64,
}

/// Knobs for the repair driver and the proximity refinement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairSettings {
    /// Widest normal deviation, in degrees, a repair patch may absorb.
    pub max_angle: f64,
    /// `dot(tnorm, bnorm)` below this marks a triangle invalid.
    pub normal_threshold: f64,
    pub max_close_edge_iterations: usize,
    /// Candidate evaluations allowed while growing one patch.
    pub max_grow_steps: usize,
}

impl Default for RepairSettings {
    fn default() -> Self {
        RepairSettings {
            max_angle: 170.0,
            normal_threshold: 0.1,
            max_close_edge_iterations: 10,
            max_grow_steps: 100_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_tolerances_fall_back_to_edge_length() {
        let t = CdtTolerances::default().digest(10.0);
        assert!((t.max_dist - 11.0).abs() < 1e-12);
        assert!((t.min_dist - 0.1).abs() < 1e-12);
        assert!(t.within_dist.is_infinite());
        assert!(t.cos_within_ang.abs() < 1e-12);
    }

    #[test]
    fn explicit_tolerances_win() {
        let t = CdtTolerances::default()
            .with_abs(0.01)
            .with_absmax(2.0)
            .with_norm(0.5)
            .digest(10.0);
        assert_eq!(t.max_dist, 2.0);
        assert_eq!(t.within_dist, 0.01);
        assert!((t.cos_within_ang - 0.5f64.cos()).abs() < 1e-12);
    }
}
