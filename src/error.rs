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

//! Error types for tessellation and repair.

use thiserror::Error;

/// Failures surfaced by the pipeline and the whole-face entry points.
///
/// Low-level mutators (`tri_add`, `add_edge`, ...) never produce these; they
/// either complete or are no-ops.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CdtError {
    /// A B-rep edge curve could not be evaluated.
    #[error("curve evaluation failed on edge {edge}")]
    CurveEvaluation { edge: usize },

    /// A mandatory split produced no children. Aborts the whole model.
    #[error("forced split failed on edge {edge}")]
    ForcedSplit { edge: usize },

    /// More than two trims reference the same edge.
    #[error("edge {edge} is used by {count} trims")]
    TooManyTrims { edge: usize, count: usize },

    /// A boundary polygon is not closed when triangulation is requested.
    #[error("loop {loop_index} of face {face} is not closed")]
    OpenLoop { face: usize, loop_index: usize },

    /// The 2D triangulator could not produce a triangulation.
    #[error("2D triangulation failed for face {face}")]
    Triangulation { face: usize },

    /// The face mesh has an edge with more than two non-problem triangles.
    #[error("face {face} mesh is self-intersecting beyond repair")]
    SelfIntersectingMesh { face: usize },

    /// The repair seed set stopped shrinking.
    #[error("repair of face {face} stalled with {remaining} seeds left")]
    RepairStalled { face: usize, remaining: usize },

    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// Malformed debug snapshot.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Result type used throughout the crate.
pub type CdtResult<T> = Result<T, CdtError>;
