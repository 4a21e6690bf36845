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

use std::{
    cell::OnceCell,
    collections::{BTreeMap, BTreeSet},
};

use ahash::AHashMap;
use smallvec::SmallVec;
use tracing::warn;

use crate::{
    cdt::RepairSettings,
    geometry::{Aabb, AabbTree, Point2, Point3, Segment, Vector3},
    mesh::types::{Edge, Triangle, UEdge},
    polygon::CPolygon,
};

/// Undirected edges with exactly one triangle, split by whether they lie on
/// a B-rep edge.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeClassification {
    /// Count-1 edges that are B-rep edges.
    pub boundary: BTreeSet<UEdge>,
    /// Count-1 edges off the B-rep boundary, and edges with more than two
    /// triangles.
    pub problem: BTreeSet<UEdge>,
}

/// Repair engine counters for one face.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RepairStats {
    pub seeds_processed: usize,
    pub patches_committed: usize,
    pub patches_abandoned: usize,
    pub triangles_removed: usize,
    pub triangles_added: usize,
    /// Singularity seeds left as they were, plus rejected optimization
    /// patches.
    pub singularity_failures: usize,
}

/// The mesh of one B-rep face.
///
/// Points, normals and triangles are append-only arenas addressed by index;
/// a triangle leaves the mesh by dropping out of the active set. Every
/// mutation keeps the adjacency maps and the triangle tree in step.
#[derive(Clone, Debug, Default)]
pub struct CdtMesh {
    pub f_id: usize,
    pub planar: bool,
    pub reversed: bool,
    pub has_singularities: bool,
    pub settings: RepairSettings,

    pub pnts: Vec<Point3>,
    pub normals: Vec<Vector3>,
    /// Point index to normal index.
    pub nmap: AHashMap<usize, usize>,
    /// Session point id of each local point, when it has one.
    pub gids: Vec<Option<usize>>,
    p2ind: AHashMap<usize, usize>,

    /// Singular vertices.
    pub sv: BTreeSet<usize>,
    /// Points lying on B-rep edges.
    pub ep: BTreeSet<usize>,
    pub brep_edges: BTreeSet<UEdge>,

    /// Parameter-space points, mapped to 3D by `p2d3d`.
    pub pnts_2d: Vec<Point2>,
    pub p2d3d: Vec<usize>,
    pub outer_loop: CPolygon,
    pub inner_loops: BTreeMap<usize, CPolygon>,
    /// Steiner points, as `pnts_2d` indices.
    pub interior_pnts: BTreeSet<usize>,

    pub(crate) tris_vect: Vec<Triangle>,
    pub(crate) active: BTreeSet<usize>,
    tris_tree: AabbTree<3, usize>,

    pub(crate) edges2tris: AHashMap<Edge, SmallVec<[usize; 2]>>,
    pub(crate) uedges2tris: AHashMap<UEdge, SmallVec<[usize; 2]>>,
    pub(crate) v2edges: AHashMap<usize, BTreeSet<UEdge>>,
    pub(crate) v2tris: AHashMap<usize, BTreeSet<usize>>,

    edge_cache: OnceCell<EdgeClassification>,
    pub stats: RepairStats,
}

impl CdtMesh {
    pub fn new(f_id: usize) -> Self {
        CdtMesh {
            f_id,
            ..Default::default()
        }
    }

    pub fn add_point(&mut self, p: Point3) -> usize {
        self.pnts.push(p);
        self.gids.push(None);
        self.pnts.len() - 1
    }

    pub fn add_normal(&mut self, n: Vector3) -> usize {
        self.normals.push(n);
        self.normals.len() - 1
    }

    pub fn set_normal(&mut self, p: usize, n: usize) {
        self.nmap.insert(p, n);
    }

    /// Adds a session-level point once. Later calls with the same `gid`
    /// return the existing local index, so every 2D instance of a shared
    /// point resolves to one 3D vertex.
    pub fn add_shared_point(&mut self, gid: usize, p: Point3, normal: Option<Vector3>) -> usize {
        if let Some(&local) = self.p2ind.get(&gid) {
            return local;
        }
        let local = self.add_point(p);
        self.gids[local] = Some(gid);
        self.p2ind.insert(gid, local);
        match normal {
            Some(n) => {
                let ni = self.add_normal(n);
                self.set_normal(local, ni);
            }
            None => {
                self.sv.insert(local);
                self.has_singularities = true;
            }
        }
        local
    }

    pub fn local_point(&self, gid: usize) -> Option<usize> {
        self.p2ind.get(&gid).copied()
    }

    /// Adds a parameter-space point that maps to local 3D point `p3d`.
    pub fn add_point_2d(&mut self, uv: Point2, p3d: usize) -> usize {
        self.pnts_2d.push(uv);
        self.p2d3d.push(p3d);
        self.pnts_2d.len() - 1
    }

    pub fn tri(&self, ind: usize) -> Option<&Triangle> {
        if self.active.contains(&ind) {
            self.tris_vect.get(ind)
        } else {
            None
        }
    }

    pub fn tri_active(&self, ind: usize) -> bool {
        self.active.contains(&ind)
    }

    /// Active triangles in handle order.
    pub fn tris(&self) -> impl Iterator<Item = &Triangle> + '_ {
        self.active.iter().map(|&i| &self.tris_vect[i])
    }

    pub fn tri_count(&self) -> usize {
        self.active.len()
    }

    pub fn tri_aabb(&self, v: &[usize; 3]) -> Aabb<3> {
        Aabb::from_points(&self.pnts[v[0]], &self.pnts[v[1]]).including(&self.pnts[v[2]])
    }

    pub fn tris_search(&self, bb: &Aabb<3>) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        self.tris_tree.search(bb, |&ind| {
            out.insert(ind);
            true
        });
        out
    }

    /// Adds a triangle. Degenerate input is accepted as a no-op. An exact
    /// duplicate keeps whichever orientation agrees with the surface normal.
    pub fn tri_add(&mut self, v: [usize; 3]) -> bool {
        let cand = Triangle::new(v, self.tris_vect.len());
        if cand.is_degenerate() {
            return true;
        }
        if v.iter().any(|&i| i >= self.pnts.len()) {
            warn!(face = self.f_id, ?v, "triangle references unknown point");
            return false;
        }

        let bb = self.tri_aabb(&v);
        let dup = self
            .tris_search(&bb)
            .into_iter()
            .find(|&i| self.tris_vect[i] == cand);
        if let Some(orig) = dup {
            let original = self.tris_vect[orig];
            let orig_flipped = self.is_flipped(&original);
            let new_flipped = self.is_flipped(&cand);
            if orig_flipped && !new_flipped {
                self.tri_remove(orig);
            } else {
                return true;
            }
        }

        self.tris_vect.push(cand);
        self.link_tri(cand, bb);
        true
    }

    /// Re-activates a triangle at a fixed handle, padding the arena with
    /// inactive slots. Used when loading snapshots.
    pub(crate) fn restore_tri(&mut self, v: [usize; 3], ind: usize) -> bool {
        if ind < self.tris_vect.len() || v.iter().any(|&i| i >= self.pnts.len()) {
            return false;
        }
        let cand = Triangle::new(v, ind);
        if cand.is_degenerate() {
            return false;
        }
        while self.tris_vect.len() < ind {
            let pad = self.tris_vect.len();
            self.tris_vect.push(Triangle::new([0, 0, 0], pad));
        }
        self.tris_vect.push(cand);
        let bb = self.tri_aabb(&v);
        self.link_tri(cand, bb);
        true
    }

    fn link_tri(&mut self, cand: Triangle, bb: Aabb<3>) {
        let v = cand.v;
        self.active.insert(cand.ind);
        self.tris_tree.insert(bb, cand.ind);
        for e in cand.edges() {
            let ue = UEdge::from(e);
            self.edges2tris.entry(e).or_default().push(cand.ind);
            self.uedges2tris.entry(ue).or_default().push(cand.ind);
            self.v2edges.entry(e.v0).or_default().insert(ue);
            self.v2edges.entry(e.v1).or_default().insert(ue);
        }
        for &p in &v {
            self.v2tris.entry(p).or_default().insert(cand.ind);
        }
        self.edge_cache = OnceCell::new();
    }

    /// Removes an active triangle by handle. Absent handles are ignored.
    pub fn tri_remove(&mut self, ind: usize) {
        if !self.active.remove(&ind) {
            warn!(face = self.f_id, ind, "removing inactive triangle");
            return;
        }
        let t = self.tris_vect[ind];
        for e in t.edges() {
            let ue = UEdge::from(e);
            if let Some(l) = self.edges2tris.get_mut(&e) {
                l.retain(|x| *x != ind);
                if l.is_empty() {
                    self.edges2tris.remove(&e);
                }
            }
            let emptied = match self.uedges2tris.get_mut(&ue) {
                Some(l) => {
                    l.retain(|x| *x != ind);
                    l.is_empty()
                }
                None => false,
            };
            if emptied {
                self.uedges2tris.remove(&ue);
                for v in ue.v {
                    if let Some(s) = self.v2edges.get_mut(&v) {
                        s.remove(&ue);
                    }
                }
            }
        }
        for v in t.v {
            if let Some(s) = self.v2tris.get_mut(&v) {
                s.remove(&ind);
            }
        }
        let bb = self.tri_aabb(&t.v);
        self.tris_tree.remove(&bb, &ind);
        self.edge_cache = OnceCell::new();
    }

    /// Drops every triangle and adjacency entry, keeping points and loops.
    pub fn reset(&mut self) {
        self.tris_vect.clear();
        self.active.clear();
        self.tris_tree.clear();
        self.edges2tris.clear();
        self.uedges2tris.clear();
        self.v2edges.clear();
        self.v2tris.clear();
        self.edge_cache = OnceCell::new();
    }

    /// Geometric normal from the vertex winding.
    pub fn tnorm(&self, t: &Triangle) -> Option<Vector3> {
        let [a, b, c] = t.v.map(|i| self.pnts[i]);
        let n = a.vector_to(&b).cross(&a.vector_to(&c)).normalized()?;
        Some(if self.reversed { -n } else { n })
    }

    /// Average surface normal at the vertices, ignoring singular ones.
    pub fn bnorm(&self, t: &Triangle) -> Option<Vector3> {
        let mut sum = Vector3::zero();
        let mut cnt = 0;
        for v in t.v {
            if self.sv.contains(&v) {
                continue;
            }
            if let Some(n) = self.nmap.get(&v).and_then(|&ni| self.normals.get(ni)) {
                sum = sum + *n;
                cnt += 1;
            }
        }
        if cnt == 0 {
            return None;
        }
        let n = sum.normalized()?;
        Some(if self.reversed { -n } else { n })
    }

    pub fn tcenter(&self, t: &Triangle) -> Point3 {
        let mut c = [0.0; 3];
        for v in t.v {
            for (ci, pi) in c.iter_mut().zip(self.pnts[v].coords.iter()) {
                *ci += pi / 3.0;
            }
        }
        Point3::new(c)
    }

    /// Both normals exist and point more than ~84 degrees apart.
    pub fn invalid_normal(&self, t: &Triangle) -> bool {
        match (self.tnorm(t), self.bnorm(t)) {
            (Some(tn), Some(bn)) => tn.dot(&bn) < self.settings.normal_threshold,
            _ => false,
        }
    }

    /// The winding disagrees with the surface normal.
    pub fn is_flipped(&self, t: &Triangle) -> bool {
        match (self.tnorm(t), self.bnorm(t)) {
            (Some(tn), Some(bn)) => tn.dot(&bn) < 0.0,
            _ => false,
        }
    }

    pub fn brep_edge_pnt(&self, v: usize) -> bool {
        self.ep.contains(&v)
    }

    /// Nearest of the triangle's edges to `p`, measured to the clamped
    /// segment.
    pub fn closest_uedge(&self, t: &Triangle, p: &Point3) -> UEdge {
        let mut best = t.uedges()[0];
        let mut mdist = f64::MAX;
        for ue in t.uedges() {
            let d = self.uedge_dist(&ue, p);
            if d < mdist {
                mdist = d;
                best = ue;
            }
        }
        best
    }

    pub fn uedge_dist(&self, ue: &UEdge, p: &Point3) -> f64 {
        Segment::new(&self.pnts[ue.v[0]], &self.pnts[ue.v[1]]).distance_to_point(p)
    }

    pub(crate) fn edge_classification(&self) -> &EdgeClassification {
        self.edge_cache.get_or_init(|| {
            let mut ec = EdgeClassification::default();
            for (ue, tris) in &self.uedges2tris {
                match tris.len() {
                    1 if self.brep_edges.contains(ue) => {
                        ec.boundary.insert(*ue);
                    }
                    1 => {
                        ec.problem.insert(*ue);
                    }
                    n if n > 2 => {
                        ec.problem.insert(*ue);
                    }
                    _ => {}
                }
            }
            ec
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> CdtMesh {
        let mut m = CdtMesh::new(0);
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            let p = m.add_point(Point3::new([x, y, 0.0]));
            let n = m.add_normal(Vector3::new([0.0, 0.0, 1.0]));
            m.set_normal(p, n);
        }
        m
    }

    #[test]
    fn duplicate_keeps_correct_orientation() {
        let mut m = quad();
        assert!(m.tri_add([0, 2, 1]));
        assert!(m.is_flipped(&m.tris_vect[0]));
        assert!(m.tri_add([0, 1, 2]));
        assert_eq!(m.tri_count(), 1);
        let t = m.tris().next().copied().unwrap();
        assert_eq!(t.v, [0, 1, 2]);
        assert!(!m.tri_active(0));

        // the correct one stays
        assert!(m.tri_add([1, 0, 2]));
        assert_eq!(m.tri_count(), 1);
    }

    #[test]
    fn remove_clears_adjacency() {
        let mut m = quad();
        m.tri_add([0, 1, 2]);
        m.tri_add([0, 2, 3]);
        assert_eq!(m.uedges2tris[&UEdge::new(0, 2)].len(), 2);
        m.tri_remove(0);
        assert_eq!(m.uedges2tris[&UEdge::new(0, 2)].len(), 1);
        assert!(!m.uedges2tris.contains_key(&UEdge::new(0, 1)));
        assert!(!m.v2tris[&1].contains(&0));
        let near = m.tris_search(&Aabb::from_point(&Point3::new([0.9, 0.1, 0.0])));
        assert_eq!(near.into_iter().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn closest_edge_is_clamped() {
        let mut m = quad();
        m.tri_add([0, 1, 2]);
        let t = m.tris_vect[0];
        // the infinite line through 0-1 would be closer
        let ue = m.closest_uedge(&t, &Point3::new([3.0, 0.2, 0.0]));
        assert_eq!(ue, UEdge::new(1, 2));
    }
}
