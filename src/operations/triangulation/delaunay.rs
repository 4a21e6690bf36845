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

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use smallvec::SmallVec;
use tracing::trace;

use super::{PolygonInput, TriangulationMode};
use crate::geometry::{Aabb, Point2, Segment};
use crate::kernel::predicates::{
    centroid2, incircle, is_point_on_segment, orient2d, point_in_polygon,
    segments_intersect_interior,
};

pub const SQRT_3: f64 = 1.7320508075688772;

/// Fixed seed for the insertion order shuffle.
const INSERTION_SEED: u64 = 0x5eed_cd70;
const MAX_LEGALIZE_PASSES: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
struct Edge(usize, usize);

impl Edge {
    #[inline]
    fn new(a: usize, b: usize) -> Self {
        if a < b { Edge(a, b) } else { Edge(b, a) }
    }
}

/// Counter-clockwise triangle over point indices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Triangle(pub(crate) usize, pub(crate) usize, pub(crate) usize);

#[derive(Default)]
struct Adj {
    // undirected edge -> up to 2 triangle indices
    edge2tris: AHashMap<Edge, SmallVec<[usize; 2]>>,
}

impl Adj {
    #[inline]
    fn add_tri(&mut self, ti: usize, t: Triangle) {
        for (u, v) in tri_edges(t) {
            self.edge2tris.entry(Edge::new(u, v)).or_default().push(ti);
        }
    }

    #[inline]
    fn remove_tri(&mut self, ti: usize, t: Triangle) {
        for (u, v) in tri_edges(t) {
            let e = Edge::new(u, v);
            if let Some(list) = self.edge2tris.get_mut(&e) {
                if let Some(pos) = list.iter().position(|&x| x == ti) {
                    list.swap_remove(pos);
                }
                if list.is_empty() {
                    self.edge2tris.remove(&e);
                }
            }
        }
    }

    #[inline]
    fn replace_tri(&mut self, ti: usize, old_t: Triangle, new_t: Triangle) {
        self.remove_tri(ti, old_t);
        self.add_tri(ti, new_t);
    }
}

#[cfg(test)]
#[derive(Clone, Debug)]
struct Delaunay {
    triangles: Vec<Triangle>,
}

#[cfg(test)]
impl Delaunay {
    /// Delaunay triangulation of `pts`. `None` for coincident points or
    /// non-finite input.
    fn build(pts: &[Point2]) -> Option<Self> {
        if pts.len() < 3 {
            return Some(Self { triangles: Vec::new() });
        }
        let mut builder = Builder::new(pts)?;
        builder.insert_all()?;
        Some(Self {
            triangles: builder.finished(),
        })
    }
}

struct Builder {
    points: Vec<Point2>,
    input_len: usize,
    tris: Vec<Triangle>,
    alive: Vec<bool>,
    adj: Adj,
    constrained: AHashSet<Edge>,
    delta: f64,
    area_eps: f64,
    circle_eps: f64,
}

impl Builder {
    fn new(pts: &[Point2]) -> Option<Self> {
        if pts.len() < 3 || pts.iter().any(|p| !p.is_finite()) {
            return None;
        }
        let bounds = Aabb::around(pts)?;
        let delta = bounds.extent(0).max(bounds.extent(1));
        if delta <= 0.0 {
            return None;
        }
        let cx = bounds.center(0);
        let cy = bounds.center(1);

        // Super-triangle that contains all points
        let r = 64.0 * delta + 1.0;
        let mut points = pts.to_vec();
        let s0 = points.len();
        points.push(Point2::new([cx, cy + 2.0 * r]));
        points.push(Point2::new([cx - SQRT_3 * r, cy - r]));
        points.push(Point2::new([cx + SQRT_3 * r, cy - r]));

        let mut b = Builder {
            points,
            input_len: s0,
            tris: Vec::new(),
            alive: Vec::new(),
            adj: Adj::default(),
            constrained: AHashSet::default(),
            delta,
            area_eps: 1e-12 * delta * delta,
            circle_eps: 1e-12 * delta * delta * delta * delta,
        };
        b.add_tri(Triangle(s0, s0 + 1, s0 + 2));
        Some(b)
    }

    fn add_tri(&mut self, t: Triangle) -> usize {
        let ti = self.tris.len();
        self.tris.push(t);
        self.alive.push(true);
        self.adj.add_tri(ti, t);
        ti
    }

    fn kill(&mut self, ti: usize) {
        if self.alive[ti] {
            self.alive[ti] = false;
            self.adj.remove_tri(ti, self.tris[ti]);
        }
    }

    fn ccw(&self, a: usize, b: usize, c: usize) -> Triangle {
        if orient2d(&self.points[a], &self.points[b], &self.points[c]) >= 0.0 {
            Triangle(a, b, c)
        } else {
            Triangle(a, c, b)
        }
    }

    fn insert_all(&mut self) -> Option<()> {
        let mut order: Vec<usize> = (0..self.input_len).collect();
        let mut rng = StdRng::seed_from_u64(INSERTION_SEED);
        order.shuffle(&mut rng);
        for pid in order {
            if !self.insert_point(pid) {
                trace!(pid, "point insertion failed");
                return None;
            }
        }
        Some(())
    }

    /// Triangle containing `p`, preferring the one it is deepest inside.
    fn locate(&self, p: &Point2) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (ti, t) in self.tris.iter().enumerate() {
            if !self.alive[ti] {
                continue;
            }
            let (a, b, c) = (&self.points[t.0], &self.points[t.1], &self.points[t.2]);
            let depth = orient2d(a, b, p).min(orient2d(b, c, p)).min(orient2d(c, a, p));
            if best.is_none_or(|(_, d)| depth > d) {
                best = Some((ti, depth));
            }
        }
        best.filter(|&(_, d)| d >= -self.area_eps).map(|(ti, _)| ti)
    }

    fn neighbor_across(&self, ti: usize, e: Edge) -> Option<usize> {
        self.adj
            .edge2tris
            .get(&e)?
            .iter()
            .copied()
            .find(|&o| o != ti)
    }

    fn edge_pair(&self, e: Edge) -> Option<(usize, usize)> {
        let list = self.adj.edge2tris.get(&e)?;
        (list.len() == 2).then(|| (list[0], list[1]))
    }

    fn edge_exists(&self, e: Edge) -> bool {
        self.adj.edge2tris.get(&e).is_some_and(|l| !l.is_empty())
    }

    /// Test if point is inside circumcircle of a CCW triangle
    fn point_in_circumcircle(&self, p: &Point2, t: Triangle) -> bool {
        incircle(&self.points[t.0], &self.points[t.1], &self.points[t.2], p) > 0.0
    }

    /// Insert a single point using Bowyer-Watson
    fn insert_point(&mut self, pid: usize) -> bool {
        let p = self.points[pid];
        let Some(start) = self.locate(&p) else {
            return false;
        };
        let t = self.tris[start];
        let dup_tol = 1e-10 * self.delta;
        if [t.0, t.1, t.2]
            .iter()
            .any(|&v| self.points[v].distance_to(&p) <= dup_tol)
        {
            return false;
        }

        // Connected cavity of triangles whose circumcircle contains p
        let mut bad: AHashSet<usize> = AHashSet::default();
        bad.insert(start);
        let mut stack = vec![start];
        while let Some(ti) = stack.pop() {
            for (u, v) in tri_edges(self.tris[ti]) {
                if let Some(nb) = self.neighbor_across(ti, Edge::new(u, v)) {
                    if !bad.contains(&nb) && self.point_in_circumcircle(&p, self.tris[nb]) {
                        bad.insert(nb);
                        stack.push(nb);
                    }
                }
            }
        }

        // Keep the cavity star-shaped as seen from p
        let limit = 4 * bad.len() + 16;
        for _ in 0..limit {
            let boundary = self.cavity_boundary(&bad);
            let offending = boundary
                .iter()
                .find(|&&(u, v, _)| orient2d(&self.points[u], &self.points[v], &p) <= self.area_eps)
                .copied();
            match offending {
                None => {
                    for &ti in &bad {
                        self.kill(ti);
                    }
                    for (u, v, _) in boundary {
                        self.add_tri(Triangle(u, v, pid));
                    }
                    return true;
                }
                Some((_, _, ti)) if ti != start => {
                    bad.remove(&ti);
                }
                Some((u, v, ti)) => match self.neighbor_across(ti, Edge::new(u, v)) {
                    Some(nb) if bad.insert(nb) => {}
                    _ => return false,
                },
            }
        }
        false
    }

    /// Directed cavity boundary edges, CCW as seen from inside the cavity.
    fn cavity_boundary(&self, bad: &AHashSet<usize>) -> Vec<(usize, usize, usize)> {
        let mut ordered: Vec<usize> = bad.iter().copied().collect();
        ordered.sort_unstable();
        let mut out = Vec::new();
        for ti in ordered {
            for (u, v) in tri_edges(self.tris[ti]) {
                let outside = self
                    .neighbor_across(ti, Edge::new(u, v))
                    .is_none_or(|nb| !bad.contains(&nb));
                if outside {
                    out.push((u, v, ti));
                }
            }
        }
        out
    }

    fn flip_shared_edge_with_adj(&mut self, e: Edge, t0_idx: usize, t1_idx: usize) -> Option<Edge> {
        let t0_old = self.tris[t0_idx];
        let t1_old = self.tris[t1_idx];
        let (u, v) = (e.0, e.1);

        let x = other_across(t0_old, e)?;
        let y = other_across(t1_old, e)?;
        if x == y {
            return None;
        }
        let new_e = Edge::new(x, y);
        if self.edge_exists(new_e) {
            return None;
        }

        // Only a strictly convex quad can be flipped
        let uv = Segment::new(&self.points[u], &self.points[v]);
        let xy = Segment::new(&self.points[x], &self.points[y]);
        if !segments_intersect_interior(&uv, &xy, 1e-12) {
            return None;
        }

        let t0_new = self.ccw(x, u, y);
        let t1_new = self.ccw(x, y, v);
        self.tris[t0_idx] = t0_new;
        self.tris[t1_idx] = t1_new;
        self.adj.replace_tri(t0_idx, t0_old, t0_new);
        self.adj.replace_tri(t1_idx, t1_old, t1_new);
        Some(new_e)
    }

    fn legalize_all(&mut self) {
        for _ in 0..MAX_LEGALIZE_PASSES {
            let mut edges: Vec<Edge> = self
                .adj
                .edge2tris
                .iter()
                .filter(|(_, l)| l.len() == 2)
                .map(|(e, _)| *e)
                .collect();
            edges.sort_unstable();

            let mut flipped = false;
            for e in edges {
                if self.constrained.contains(&e) {
                    continue;
                }
                let Some((t0, t1)) = self.edge_pair(e) else {
                    continue;
                };
                let t = self.tris[t0];
                let Some(b) = other_across(self.tris[t1], e) else {
                    continue;
                };
                let inc = incircle(
                    &self.points[t.0],
                    &self.points[t.1],
                    &self.points[t.2],
                    &self.points[b],
                );
                if inc > self.circle_eps && self.flip_shared_edge_with_adj(e, t0, t1).is_some() {
                    flipped = true;
                }
            }
            if !flipped {
                break;
            }
        }
    }

    fn insert_constraint(&mut self, a: usize, b: usize) -> bool {
        for [u, v] in split_constraint_chain(&self.points[..self.input_len], a, b, self.delta) {
            if !self.recover_edge(u, v) {
                trace!(u, v, "constraint recovery failed");
                return false;
            }
            self.constrained.insert(Edge::new(u, v));
        }
        true
    }

    fn crosses(&self, e: Edge, seg: &Segment<2>, a: usize, b: usize) -> bool {
        if e.0 == a || e.0 == b || e.1 == a || e.1 == b {
            return false;
        }
        let s = Segment::new(&self.points[e.0], &self.points[e.1]);
        segments_intersect_interior(seg, &s, 1e-12)
    }

    /// Flip edges crossing `(a, b)` until it appears.
    fn recover_edge(&mut self, a: usize, b: usize) -> bool {
        let target = Edge::new(a, b);
        if self.edge_exists(target) {
            return true;
        }
        let seg = Segment::new(&self.points[a], &self.points[b]);
        let mut crossing: Vec<Edge> = self
            .adj
            .edge2tris
            .keys()
            .copied()
            .filter(|&e| self.crosses(e, &seg, a, b))
            .collect();
        crossing.sort_unstable();
        if crossing.iter().any(|e| self.constrained.contains(e)) {
            return false;
        }

        let n = crossing.len() + 1;
        let limit = 64 * n * n + 1024;
        let mut queue: VecDeque<Edge> = crossing.into();
        let mut steps = 0usize;
        while let Some(e) = queue.pop_front() {
            steps += 1;
            if steps > limit {
                return false;
            }
            let Some((t0, t1)) = self.edge_pair(e) else {
                continue;
            };
            match self.flip_shared_edge_with_adj(e, t0, t1) {
                Some(ne) => {
                    if ne != target && self.crosses(ne, &seg, a, b) {
                        queue.push_back(ne);
                    }
                }
                None => queue.push_back(e),
            }
        }
        self.edge_exists(target)
    }

    /// Live triangles not touching the super-triangle.
    fn finished(&self) -> Vec<Triangle> {
        let n = self.input_len;
        self.tris
            .iter()
            .enumerate()
            .filter(|&(ti, t)| self.alive[ti] && t.0 < n && t.1 < n && t.2 < n)
            .map(|(_, t)| *t)
            .collect()
    }
}

pub(super) fn triangulate_polygon(
    points: &[Point2],
    input: &PolygonInput,
    mode: TriangulationMode,
) -> Option<Vec<[usize; 3]>> {
    if input.outer.len() < 3 {
        return None;
    }
    let mut local_of: AHashMap<usize, usize> = AHashMap::default();
    let mut global: Vec<usize> = Vec::new();
    for &g in input
        .outer
        .iter()
        .chain(input.holes.iter().flatten())
        .chain(input.steiner.iter())
    {
        if g >= points.len() {
            return None;
        }
        local_of.entry(g).or_insert_with(|| {
            global.push(g);
            global.len() - 1
        });
    }
    let pts: Vec<Point2> = global.iter().map(|&g| points[g]).collect();

    let mut builder = Builder::new(&pts)?;
    builder.insert_all()?;

    if mode == TriangulationMode::Constrained {
        for ring in std::iter::once(&input.outer).chain(input.holes.iter()) {
            for k in 0..ring.len() {
                let a = local_of[&ring[k]];
                let b = local_of[&ring[(k + 1) % ring.len()]];
                if a != b && !builder.insert_constraint(a, b) {
                    return None;
                }
            }
        }
        builder.legalize_all();
    }

    let outer_ring: Vec<Point2> = input.outer.iter().map(|&g| points[g]).collect();
    let hole_rings: Vec<Vec<Point2>> = input
        .holes
        .iter()
        .map(|h| h.iter().map(|&g| points[g]).collect())
        .collect();

    let mut out = Vec::new();
    for t in builder.finished() {
        let c = centroid2(&pts[t.0], &pts[t.1], &pts[t.2]);
        if !point_in_polygon(&c, &outer_ring) {
            continue;
        }
        if hole_rings.iter().any(|h| point_in_polygon(&c, h)) {
            continue;
        }
        if orient2d(&pts[t.0], &pts[t.1], &pts[t.2]) <= builder.area_eps {
            continue;
        }
        out.push([global[t.0], global[t.1], global[t.2]]);
    }
    Some(out)
}

#[inline]
fn other_across(t: Triangle, e: Edge) -> Option<usize> {
    let vs = [t.0, t.1, t.2];
    vs.into_iter().find(|&w| w != e.0 && w != e.1)
}

#[inline]
fn tri_edges(t: Triangle) -> [(usize, usize); 3] {
    [(t.0, t.1), (t.1, t.2), (t.2, t.0)]
}

/// Break `a -> b` at every input point lying on it.
fn split_constraint_chain(pts: &[Point2], a: usize, b: usize, scale: f64) -> Vec<[usize; 2]> {
    if a == b {
        return Vec::new();
    }
    let seg = Segment::new(&pts[a], &pts[b]);
    let eps = 1e-10 * scale;

    let mut mids: Vec<(f64, usize)> = Vec::new();
    for (k, p) in pts.iter().enumerate() {
        if k == a || k == b {
            continue;
        }
        if is_point_on_segment(p, &seg, eps) && seg.distance_to_point(p) <= eps {
            mids.push((seg.closest_param(p), k));
        }
    }
    if mids.is_empty() {
        return vec![[a, b]];
    }

    mids.sort_by(|(ti, _), (tj, _)| ti.total_cmp(tj));
    let mut out = Vec::with_capacity(mids.len() + 1);
    let mut prev = a;
    for &(_, m) in &mids {
        if prev != m {
            out.push([prev, m]);
        }
        prev = m;
    }
    if prev != b {
        out.push([prev, b]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new([x, y])
    }

    fn area(pts: &[Point2], t: &[usize; 3]) -> f64 {
        0.5 * orient2d(&pts[t[0]], &pts[t[1]], &pts[t[2]])
    }

    #[test]
    fn square_gives_two_triangles() {
        let pts = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)];
        let dt = Delaunay::build(&pts).unwrap();
        assert_eq!(dt.triangles.len(), 2);
    }

    #[test]
    fn grid_is_delaunay() {
        let mut pts = Vec::new();
        for i in 0..6 {
            for j in 0..5 {
                pts.push(p(i as f64 + 0.01 * j as f64, j as f64 * 0.7 + 0.02 * i as f64));
            }
        }
        let dt = Delaunay::build(&pts).unwrap();
        assert_eq!(dt.triangles.len(), 2 * 5 * 4);
        for t in &dt.triangles {
            for (k, q) in pts.iter().enumerate() {
                if k == t.0 || k == t.1 || k == t.2 {
                    continue;
                }
                assert!(incircle(&pts[t.0], &pts[t.1], &pts[t.2], q) <= 1e-9);
            }
        }
    }

    #[test]
    fn concave_polygon_keeps_loop_edges() {
        // a "C" shape: the notch forces edge recovery
        let pts = vec![
            p(0.0, 0.0),
            p(3.0, 0.0),
            p(3.0, 0.4),
            p(0.4, 0.4),
            p(0.4, 2.6),
            p(3.0, 2.6),
            p(3.0, 3.0),
            p(0.0, 3.0),
        ];
        let input = PolygonInput {
            outer: (0..8).collect(),
            ..Default::default()
        };
        let tris = triangulate_polygon(&pts, &input, TriangulationMode::Constrained).unwrap();
        assert_eq!(tris.len(), 6);
        let total: f64 = tris.iter().map(|t| area(&pts, t)).sum();
        let expected = 3.0 * 3.0 - 2.6 * 2.2;
        assert!((total - expected).abs() < 1e-9);
        for k in 0..8 {
            let e = Edge::new(k, (k + 1) % 8);
            assert!(tris.iter().any(|t| {
                tri_edges(Triangle(t[0], t[1], t[2]))
                    .iter()
                    .any(|&(u, v)| Edge::new(u, v) == e)
            }));
        }
    }

    #[test]
    fn hole_is_left_empty() {
        let pts = vec![
            p(0.0, 0.0),
            p(4.0, 0.0),
            p(4.0, 4.0),
            p(0.0, 4.0),
            p(1.0, 1.0),
            p(1.0, 3.0),
            p(3.0, 3.0),
            p(3.0, 1.0),
        ];
        let input = PolygonInput {
            outer: vec![0, 1, 2, 3],
            holes: vec![vec![4, 5, 6, 7]],
            steiner: Vec::new(),
        };
        let tris = triangulate_polygon(&pts, &input, TriangulationMode::Constrained).unwrap();
        let total: f64 = tris.iter().map(|t| area(&pts, t)).sum();
        assert!((total - 12.0).abs() < 1e-9);
        assert_eq!(tris.len(), 8);
    }

    #[test]
    fn coincident_points_fail() {
        let pts = [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 0.0), p(0.0, 1.0)];
        assert!(Delaunay::build(&pts).is_none());
    }
}
