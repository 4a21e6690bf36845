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

use brep_cdt::geometry::{Aabb, AabbTree, Point2};

fn p(x: f64, y: f64) -> Point2 {
    Point2::new([x, y])
}

fn bx(x0: f64, y0: f64, x1: f64, y1: f64) -> Aabb<2> {
    Aabb::from_points(&p(x0, y0), &p(x1, y1))
}

#[test]
fn test_aabb_union_and_intersection() {
    let a = Aabb::from_points(&p(0.0, 1.0), &p(2.0, -1.0));
    assert_eq!(*a.min(), p(0.0, -1.0));
    assert_eq!(*a.max(), p(2.0, 1.0));

    let b = bx(0.5, -0.5, 2.0, 0.5);
    let u = a.union(&b);
    assert_eq!(*u.min(), p(0.0, -1.0));
    assert_eq!(*u.max(), p(2.0, 1.0));

    let c = bx(2.5, 2.5, 3.0, 3.0);
    assert!(a.intersects(&b));
    assert!(!a.intersects(&c));
}

#[test]
fn test_aabb_axis_padding() {
    let flat = bx(0.0, 0.0, 1.0, 0.0);
    let padded = flat.expanded_axis(1, 0.25);
    assert_eq!(*padded.min(), p(0.0, -0.25));
    assert_eq!(*padded.max(), p(1.0, 0.25));
    assert!(padded.contains(&p(0.5, 0.2)));
    assert!(!flat.contains(&p(0.5, 0.2)));
}

#[test]
fn test_aabb_tree_build_and_query() {
    let items = vec![
        (bx(0.0, 0.0, 1.0, 1.0), 1),
        (bx(1.5, 1.5, 2.5, 2.5), 2),
        (bx(-1.0, -1.0, -0.5, -0.5), 3),
    ];
    let tree = AabbTree::build(items);
    assert_eq!(tree.len(), 3);

    let mut hits = Vec::new();
    tree.query(&bx(0.5, 0.5, 2.0, 2.0), &mut hits);
    let mut ids: Vec<i32> = hits.into_iter().copied().collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);
}

#[test]
fn test_aabb_tree_remove_and_reinsert() {
    let mut tree = AabbTree::new();
    for i in 0..10 {
        let x = i as f64;
        tree.insert(bx(x, 0.0, x + 0.5, 0.5), i);
    }
    assert_eq!(tree.len(), 10);

    assert!(tree.remove(&bx(3.0, 0.0, 3.5, 0.5), &3));
    assert!(!tree.remove(&bx(3.0, 0.0, 3.5, 0.5), &3));
    for i in 4..9 {
        let x = i as f64;
        assert!(tree.remove(&bx(x, 0.0, x + 0.5, 0.5), &i));
    }
    assert_eq!(tree.len(), 4);

    tree.insert(bx(3.0, 0.0, 3.5, 0.5), 30);
    let mut hits = Vec::new();
    tree.query(&bx(2.9, 0.1, 3.1, 0.2), &mut hits);
    assert_eq!(hits, vec![&30]);
}

#[test]
fn test_aabb_tree_search_stops_early() {
    let items = (0..8).map(|i| (bx(0.0, 0.0, 1.0, 1.0), i)).collect();
    let tree = AabbTree::build(items);
    let mut seen = 0;
    let visited = tree.search(&bx(0.2, 0.2, 0.3, 0.3), |_| {
        seen += 1;
        seen < 3
    });
    assert_eq!(visited, 3);
    assert_eq!(seen, 3);
}
