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

//! Doubly linked 2D boundary polygons.
//!
//! A [`CPolygon`] keeps its own copy of the 2D points it uses, with `p2o`
//! mapping each local point back to the owner's numbering: mesh 2D indices
//! for face loops, mesh 3D indices for repair patches. Edges live in an
//! arena and link to each other through `prev`/`next` indices.

use std::collections::BTreeSet;

use ahash::AHashMap;
use smallvec::SmallVec;

use crate::geometry::{Point2, Segment};
use crate::kernel::predicates::point_in_polygon;
use crate::mesh::types::UEdge;
use crate::operations::triangulation::{PolygonInput, TriangulationMode, triangulate_polygon};

const ISECT_PARAM_TOL: f64 = 1e-12;

/// Parameter sub-range of a trim curve covered by one polygon edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrimRange {
    pub trim: usize,
    pub start: f64,
    pub end: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolyEdge {
    /// Local start and end vertex.
    pub v: [usize; 2],
    pub prev: Option<usize>,
    pub next: Option<usize>,
    pub trim: Option<TrimRange>,
    /// Shared-edge segment owning this edge, `None` for singular trims and
    /// repair patches.
    pub seg: Option<usize>,
}

impl PolyEdge {
    fn new(a: usize, b: usize) -> Self {
        PolyEdge {
            v: [a, b],
            prev: None,
            next: None,
            trim: None,
            seg: None,
        }
    }

    pub fn uedge(&self) -> UEdge {
        UEdge::new(self.v[0], self.v[1])
    }
}

#[derive(Clone, Debug, Default)]
pub struct CPolygon {
    pub pnts_2d: Vec<Point2>,
    pub p2o: Vec<usize>,
    o2p: AHashMap<usize, usize>,

    edges: Vec<Option<PolyEdge>>,
    poly: BTreeSet<usize>,
    active_edges: BTreeSet<UEdge>,
    v2pe: AHashMap<usize, SmallVec<[usize; 2]>>,

    pub uncontained: BTreeSet<usize>,
    pub flipped_face: BTreeSet<usize>,
    pub interior_points: BTreeSet<usize>,
    pub target_verts: BTreeSet<usize>,
    pub used_verts: BTreeSet<usize>,
    pub brep_edge_pnts: BTreeSet<usize>,
    pub self_isect_edges: BTreeSet<UEdge>,

    /// Mesh triangle handles claimed by a repair patch.
    pub visited_triangles: BTreeSet<usize>,
    pub unusable_triangles: BTreeSet<usize>,
    /// Passed over while growing; never claimed.
    pub skipped_triangles: BTreeSet<usize>,

    /// Output of [`CPolygon::cdt`], in owner numbering.
    pub tris: Vec<[usize; 3]>,
}

impl CPolygon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&mut self, p: Point2, owner: usize) -> usize {
        self.pnts_2d.push(p);
        self.p2o.push(owner);
        let local = self.pnts_2d.len() - 1;
        self.o2p.insert(owner, local);
        local
    }

    pub fn local_of(&self, owner: usize) -> Option<usize> {
        self.o2p.get(&owner).copied()
    }

    pub fn owner_of(&self, local: usize) -> Option<usize> {
        self.p2o.get(local).copied()
    }

    pub fn len(&self) -> usize {
        self.poly.len()
    }

    pub fn is_empty(&self) -> bool {
        self.poly.is_empty()
    }

    pub fn edge(&self, id: usize) -> Option<&PolyEdge> {
        self.edges.get(id).and_then(|e| e.as_ref())
    }

    pub fn edge_mut(&mut self, id: usize) -> Option<&mut PolyEdge> {
        self.edges.get_mut(id).and_then(|e| e.as_mut())
    }

    /// Live edges in id order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, &PolyEdge)> + '_ {
        self.poly
            .iter()
            .filter_map(|&id| self.edge(id).map(|e| (id, e)))
    }

    pub fn edge_ids(&self) -> Vec<usize> {
        self.poly.iter().copied().collect()
    }

    pub fn vertex_edge_count(&self, v: usize) -> usize {
        self.v2pe.get(&v).map_or(0, |l| l.len())
    }

    pub fn has_uedge(&self, ue: &UEdge) -> bool {
        self.active_edges.contains(ue)
    }

    pub fn find_edge(&self, a: usize, b: usize) -> Option<usize> {
        self.v2pe
            .get(&a)?
            .iter()
            .copied()
            .find(|&id| self.edge(id).is_some_and(|e| e.v == [a, b]))
    }

    pub fn find_uedge(&self, ue: &UEdge) -> Option<usize> {
        self.v2pe
            .get(&ue.v[0])?
            .iter()
            .copied()
            .find(|&id| self.edge(id).is_some_and(|e| e.uedge() == *ue))
    }

    fn insert_edge(&mut self, a: usize, b: usize) -> usize {
        let id = self.edges.len();
        self.edges.push(Some(PolyEdge::new(a, b)));
        self.poly.insert(id);
        self.v2pe.entry(a).or_default().push(id);
        if a != b {
            self.v2pe.entry(b).or_default().push(id);
        }
        self.active_edges.insert(UEdge::new(a, b));
        self.used_verts.insert(a);
        self.used_verts.insert(b);
        self.link(id);
        id
    }

    fn link(&mut self, id: usize) {
        let Some([a, b]) = self.edge(id).map(|e| e.v) else {
            return;
        };
        let mut prev = None;
        let mut next = None;
        for (oid, pe) in self.edges() {
            if oid == id {
                continue;
            }
            if pe.v[1] == a {
                prev = Some(oid);
            }
            if pe.v[0] == b {
                next = Some(oid);
            }
        }
        if let Some(p) = prev {
            if let Some(pe) = self.edge_mut(p) {
                pe.next = Some(id);
            }
        }
        if let Some(n) = next {
            if let Some(ne) = self.edge_mut(n) {
                ne.prev = Some(id);
            }
        }
        if let Some(e) = self.edge_mut(id) {
            e.prev = prev;
            e.next = next;
        }
    }

    /// Add the directed edge `a -> b`, linking it to its neighbours.
    pub fn add_ordered_edge(&mut self, a: usize, b: usize) -> usize {
        self.insert_edge(a, b)
    }

    /// Add an undirected edge, orienting it to continue the existing edges.
    pub fn add_edge(&mut self, ue: UEdge) -> usize {
        let mut v1 = None;
        let mut v2 = None;
        for (_, pe) in self.edges() {
            for &u in &ue.v {
                if pe.v[1] == u {
                    v1 = Some(u);
                }
                if pe.v[0] == u {
                    v2 = Some(u);
                }
            }
        }
        let (a, b) = match (v1, v2) {
            (Some(a), _) => (a, ue.other(a).unwrap_or(a)),
            (None, Some(b)) => (ue.other(b).unwrap_or(b), b),
            (None, None) => (ue.v[0], ue.v[1]),
        };
        self.insert_edge(a, b)
    }

    /// Remove an edge by id. An endpoint left without edges becomes
    /// uncontained.
    pub fn remove_edge_id(&mut self, id: usize) -> Option<PolyEdge> {
        let cull = self.edges.get_mut(id)?.take()?;
        self.poly.remove(&id);
        for v in cull.v {
            if let Some(list) = self.v2pe.get_mut(&v) {
                list.retain(|x| *x != id);
            }
        }
        let ue = cull.uedge();
        if self.find_uedge(&ue).is_none() {
            self.active_edges.remove(&ue);
        }
        for v in cull.v {
            if self.vertex_edge_count(v) == 0 {
                self.flipped_face.remove(&v);
                self.uncontained.insert(v);
            }
        }
        if let Some(p) = cull.prev.and_then(|p| self.edge_mut(p)) {
            if p.next == Some(id) {
                p.next = None;
            }
        }
        if let Some(n) = cull.next.and_then(|n| self.edge_mut(n)) {
            if n.prev == Some(id) {
                n.prev = None;
            }
        }
        Some(cull)
    }

    pub fn remove_edge(&mut self, ue: &UEdge) -> bool {
        match self.find_uedge(ue) {
            Some(id) => self.remove_edge_id(id).is_some(),
            None => false,
        }
    }

    /// Swap edges given in owner numbering: all removals happen first.
    pub fn replace_edges(&mut self, new_edges: &BTreeSet<UEdge>, old_edges: &BTreeSet<UEdge>) {
        for ue in old_edges {
            if let Some(l) = self.local_uedge(ue) {
                self.remove_edge(&l);
            }
        }
        for ue in new_edges {
            if let Some(l) = self.local_uedge(ue) {
                self.add_edge(l);
            }
        }
    }

    fn local_uedge(&self, ue: &UEdge) -> Option<UEdge> {
        Some(UEdge::new(self.local_of(ue.v[0])?, self.local_of(ue.v[1])?))
    }

    /// Number of the triangle's edges (owner numbering) on the loop.
    pub fn shared_edge_cnt(&self, tri: &[usize; 3]) -> usize {
        (0..3)
            .filter(|&i| {
                self.local_uedge(&UEdge::new(tri[i], tri[(i + 1) % 3]))
                    .is_some_and(|l| self.active_edges.contains(&l))
            })
            .count()
    }

    /// For a triangle with one loop edge, the vertex not on the loop.
    pub fn unshared_vertex(&self, tri: &[usize; 3]) -> Option<usize> {
        if self.shared_edge_cnt(tri) != 1 {
            return None;
        }
        tri.iter().copied().find(|&v| {
            self.local_of(v)
                .is_none_or(|l| self.vertex_edge_count(l) == 0)
        })
    }

    pub fn shared_vertices(&self, tri: &[usize; 3]) -> Option<(usize, usize)> {
        if self.shared_edge_cnt(tri) != 1 {
            return None;
        }
        let on_loop: SmallVec<[usize; 3]> = tri
            .iter()
            .copied()
            .filter(|&v| self.local_of(v).is_some_and(|l| self.vertex_edge_count(l) > 0))
            .collect();
        (on_loop.len() >= 2).then(|| (on_loop[0], on_loop[1]))
    }

    /// How directly a one-edge triangle heads toward the points the loop
    /// still has to reach: the smallest angle (radians) between the
    /// triangle's growth direction and the direction to any outside
    /// uncontained, flipped or target vertex. `None` when no such vertex
    /// lies ahead.
    pub fn ucv_angle(&mut self, tri: &[usize; 3]) -> Option<f64> {
        let nv = self.local_of(self.unshared_vertex(tri)?)?;
        let (s1, s2) = self.shared_vertices(tri)?;
        let (s1, s2) = (self.local_of(s1)?, self.local_of(s2)?);

        let line = Segment::new(&self.pnts_2d[s1], &self.pnts_2d[s2]);
        let pnew = self.pnts_2d[nv];
        let pline = line.a.lerp(&line.b, line.closest_param(&pnew));
        let vu = pline.vector_to(&pnew).normalized()?;

        let targets: Vec<usize> = self
            .uncontained
            .iter()
            .chain(self.flipped_face.iter())
            .chain(self.target_verts.iter())
            .copied()
            .collect();

        let mut best: Option<f64> = None;
        for v in targets {
            if !self.point_in_polygon(v, true) {
                continue;
            }
            let vt = pline.vector_to(&self.pnts_2d[v]);
            if vt.norm() < 0.01 * line.length() {
                return Some(0.0);
            }
            let Some(vt) = vt.normalized() else {
                continue;
            };
            let d = vu.dot(&vt);
            if d > 0.0 && best.is_none_or(|b| d > b) {
                best = Some(d);
            }
        }
        best.map(|d| d.clamp(-1.0, 1.0).acos())
    }

    /// Flags vertices used by more than two edges (recording them as
    /// uncontained unless they are B-rep edge points) and caches edges
    /// crossing another edge.
    pub fn self_intersecting(&mut self) -> bool {
        self.self_isect_edges.clear();
        let mut self_isect = false;

        let mut vecnt: AHashMap<usize, usize> = AHashMap::default();
        for (_, pe) in self.edges() {
            *vecnt.entry(pe.v[0]).or_default() += 1;
            *vecnt.entry(pe.v[1]).or_default() += 1;
        }
        let mut crowded: Vec<usize> = vecnt
            .iter()
            .filter(|&(_, &c)| c > 2)
            .map(|(&v, _)| v)
            .collect();
        crowded.sort_unstable();
        for v in crowded {
            self_isect = true;
            if !self.brep_edge_pnts.contains(&v) {
                self.uncontained.insert(v);
            }
        }

        let pv: Vec<[usize; 2]> = self.edges().map(|(_, e)| e.v).collect();
        let mut crossing = BTreeSet::new();
        for i in 0..pv.len() {
            let s1 = Segment::new(&self.pnts_2d[pv[i][0]], &self.pnts_2d[pv[i][1]]);
            for e2 in pv.iter().skip(i + 1) {
                let s2 = Segment::new(&self.pnts_2d[e2[0]], &self.pnts_2d[e2[1]]);
                let Some((a, b)) = s1.line_intersection_params(&s2) else {
                    continue;
                };
                let interior = |t: f64| t > ISECT_PARAM_TOL && t < 1.0 - ISECT_PARAM_TOL;
                if interior(a) && interior(b) {
                    self_isect = true;
                    crossing.insert(UEdge::new(pv[i][0], pv[i][1]));
                    crossing.insert(UEdge::new(e2[0], e2[1]));
                }
            }
        }
        self.self_isect_edges = crossing;
        self_isect
    }

    /// Loop vertices in walk order starting from the lowest edge id, `None`
    /// if the `next` chain is broken or does not cover every edge.
    pub fn walk(&self) -> Option<Vec<usize>> {
        let first = *self.poly.iter().next()?;
        let mut out = Vec::with_capacity(self.poly.len());
        let mut cur = first;
        loop {
            let pe = self.edge(cur)?;
            out.push(pe.v[0]);
            cur = pe.next?;
            if cur == first {
                break;
            }
            if out.len() > self.poly.len() {
                return None;
            }
        }
        (out.len() == self.poly.len()).then_some(out)
    }

    pub fn closed(&mut self) -> bool {
        if self.poly.len() < 3 {
            return false;
        }
        if !self.flipped_face.is_empty() {
            return false;
        }
        if self.self_intersecting() {
            return false;
        }
        if self.walk().is_none() {
            return false;
        }
        self.edges().all(|(_, e)| e.prev.is_some() && e.next.is_some())
    }

    fn ring(&self) -> Option<Vec<Point2>> {
        Some(self.walk()?.iter().map(|&v| self.pnts_2d[v]).collect())
    }

    /// Even-odd containment of a local vertex. A vertex on the first loop
    /// edge counts as inside; `flip` inverts the answer.
    pub fn point_in_polygon(&mut self, v: usize, flip: bool) -> bool {
        if v >= self.pnts_2d.len() || !self.closed() {
            return false;
        }
        if let Some((_, first)) = self.edges().next() {
            if first.v.contains(&v) {
                return true;
            }
        }
        let Some(ring) = self.ring() else {
            return false;
        };
        point_in_polygon(&self.pnts_2d[v], &ring) != flip
    }

    /// Containment of an arbitrary point, without the closure check.
    pub fn contains_point(&self, p: &Point2) -> bool {
        self.ring().is_some_and(|r| point_in_polygon(p, &r))
    }

    /// Moves uncontained vertices the loop now encloses into the interior
    /// set. Returns whether any uncontained vertex remains; an open loop
    /// always reports `true`.
    pub fn update_uncontained(&mut self) -> bool {
        if !self.closed() {
            return true;
        }
        if self.uncontained.is_empty() {
            return false;
        }
        let candidates: Vec<usize> = self.uncontained.iter().copied().collect();
        for v in candidates {
            if self.vertex_edge_count(v) > 0 {
                self.uncontained.remove(&v);
                continue;
            }
            if self.point_in_polygon(v, false) {
                self.uncontained.remove(&v);
                self.interior_points.insert(v);
                self.used_verts.insert(v);
            }
        }
        !self.uncontained.is_empty()
    }

    /// Owner indices of the loop, in walk order.
    pub fn owner_ring(&self) -> Option<Vec<usize>> {
        Some(self.walk()?.iter().map(|&v| self.p2o[v]).collect())
    }

    /// Triangulate the closed loop plus interior points into `tris`.
    pub fn cdt(&mut self, mode: TriangulationMode) -> bool {
        if !self.closed() {
            return false;
        }
        let Some(outer) = self.walk() else {
            return false;
        };
        let on_loop: BTreeSet<usize> = outer.iter().copied().collect();
        self.interior_points.retain(|v| !on_loop.contains(v));

        let input = PolygonInput {
            outer,
            holes: Vec::new(),
            steiner: self.interior_points.iter().copied().collect(),
        };
        match triangulate_polygon(&self.pnts_2d, &input, mode) {
            Some(ltris) => {
                self.tris = ltris
                    .iter()
                    .map(|t| [self.p2o[t[0]], self.p2o[t[1]], self.p2o[t[2]]])
                    .collect();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> CPolygon {
        let mut poly = CPolygon::new();
        for (i, (x, y)) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)].iter().enumerate() {
            poly.add_point(Point2::new([*x, *y]), 10 + i);
        }
        for i in 0..4 {
            poly.add_ordered_edge(i, (i + 1) % 4);
        }
        poly
    }

    #[test]
    fn closure_is_idempotent() {
        let mut poly = square();
        assert!(poly.closed());
        assert!(poly.closed());
        assert_eq!(poly.walk(), Some(vec![0, 1, 2, 3]));
    }

    #[test]
    fn removal_opens_loop_and_exposes_vertex() {
        let mut poly = square();
        assert!(poly.remove_edge(&UEdge::new(1, 2)));
        assert!(!poly.closed());
        assert!(poly.uncontained.is_empty());
        assert!(poly.remove_edge(&UEdge::new(2, 3)));
        assert!(poly.uncontained.contains(&2));
        // close over the gap: 1 -> 3
        poly.add_edge(UEdge::new(3, 1));
        assert!(poly.closed());
        assert!(poly.find_edge(1, 3).is_some());
    }

    #[test]
    fn crossing_edges_are_cached() {
        let mut poly = CPolygon::new();
        for (x, y) in [(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0)] {
            poly.add_point(Point2::new([x, y]), 0);
        }
        for i in 0..4 {
            poly.add_ordered_edge(i, (i + 1) % 4);
        }
        assert!(poly.self_intersecting());
        assert!(poly.self_isect_edges.contains(&UEdge::new(0, 1)));
        assert!(!poly.closed());
    }

    #[test]
    fn interior_point_is_absorbed_and_triangulated() {
        let mut poly = square();
        let c = poly.add_point(Point2::new([0.5, 0.5]), 99);
        poly.uncontained.insert(c);
        assert!(!poly.update_uncontained());
        assert!(poly.interior_points.contains(&c));
        assert!(poly.cdt(TriangulationMode::Constrained));
        assert_eq!(poly.tris.len(), 4);
        assert!(poly.tris.iter().all(|t| t.contains(&99)));
    }
}
