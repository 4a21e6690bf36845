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

use std::f64::consts::TAU;

use brep_cdt::{
    geometry::Point2,
    kernel::predicates::{incircle, orient2d},
    operations::triangulation::{PolygonInput, TriangulationMode, triangulate_polygon},
};
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Points on an ellipse at sorted random angles: convex, with no four
/// points on a common circle.
fn random_convex(rng: &mut StdRng, n: usize) -> Vec<Point2> {
    let (a, b) = (rng.random_range(1.0..3.0), rng.random_range(0.5..1.0));
    let mut angles: Vec<f64> = (0..n).map(|_| rng.random_range(0.0..TAU)).collect();
    angles.sort_by(f64::total_cmp);
    angles.dedup_by(|x, y| (*x - *y).abs() < 0.05);
    angles
        .into_iter()
        .map(|t| Point2::new([a * t.cos(), b * t.sin()]))
        .collect()
}

#[test]
fn convex_polygons_triangulate_to_delaunay() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..50 {
        let n = rng.random_range(4..24);
        let pts = random_convex(&mut rng, n);
        let input = PolygonInput {
            outer: (0..pts.len()).collect(),
            ..PolygonInput::default()
        };
        for mode in [TriangulationMode::Delaunay, TriangulationMode::Constrained] {
            let tris = triangulate_polygon(&pts, &input, mode).unwrap();
            assert_eq!(tris.len(), pts.len() - 2);
            for t in &tris {
                let [a, b, c] = t.map(|i| pts[i]);
                assert!(orient2d(&a, &b, &c) > 0.0);
                for (i, d) in pts.iter().enumerate() {
                    if t.contains(&i) {
                        continue;
                    }
                    assert!(incircle(&a, &b, &c, d) <= 1e-9, "point {i} inside circumcircle of {t:?}");
                }
            }
        }
    }
}

#[test]
fn steiner_points_are_used() {
    let pts = vec![
        Point2::new([0.0, 0.0]),
        Point2::new([2.0, 0.0]),
        Point2::new([2.0, 2.0]),
        Point2::new([0.0, 2.0]),
        Point2::new([1.0, 1.0]),
    ];
    let input = PolygonInput {
        outer: vec![0, 1, 2, 3],
        holes: Vec::new(),
        steiner: vec![4],
    };
    let tris = triangulate_polygon(&pts, &input, TriangulationMode::Constrained).unwrap();
    assert_eq!(tris.len(), 4);
    assert!(tris.iter().all(|t| t.contains(&4)));
}
