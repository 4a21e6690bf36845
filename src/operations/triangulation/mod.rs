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

use crate::geometry::Point2;

mod delaunay;

/// How loop constraints are honoured by [`triangulate_polygon`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TriangulationMode {
    /// Loop edges are forced into the triangulation.
    #[default]
    Constrained,
    /// Plain Delaunay over all points, filtered by triangle centroid.
    Delaunay,
}

/// A polygon with optional holes and Steiner points, all as indices into a
/// shared point slice.
#[derive(Clone, Debug, Default)]
pub struct PolygonInput {
    pub outer: Vec<usize>,
    pub holes: Vec<Vec<usize>>,
    pub steiner: Vec<usize>,
}

/// Triangulate a polygon given as index loops into `points`.
///
/// Returned triangles are counter-clockwise in the 2D frame and use the
/// caller's point indices. `None` when the triangulator fails, for example
/// on coincident input points.
pub fn triangulate_polygon(
    points: &[Point2],
    input: &PolygonInput,
    mode: TriangulationMode,
) -> Option<Vec<[usize; 3]>> {
    delaunay::triangulate_polygon(points, input, mode)
}
