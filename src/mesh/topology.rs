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

use std::collections::BTreeSet;

use tracing::{debug, trace};

use crate::{
    geometry::{Plane, Point3, Vector3},
    mesh::{
        core::CdtMesh,
        types::{Edge, Triangle, UEdge},
    },
    polygon::CPolygon,
};

pub(crate) fn ang_deg(a: &Vector3, b: &Vector3) -> f64 {
    a.angle_to(b).map_or(0.0, f64::to_degrees)
}

impl CdtMesh {
    /// Triangles sharing an edge with `t`.
    pub fn face_neighbors(&self, t: &Triangle) -> Vec<usize> {
        let mut out = Vec::new();
        for ue in t.uedges() {
            if let Some(list) = self.uedges2tris.get(&ue) {
                out.extend(list.iter().copied().filter(|&i| i != t.ind));
            }
        }
        out
    }

    pub fn vertex_face_neighbors(&self, v: usize) -> Vec<usize> {
        self.v2tris
            .get(&v)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn uedge_tris(&self, ue: &UEdge) -> &[usize] {
        self.uedges2tris.get(ue).map_or(&[], |l| l.as_slice())
    }

    pub fn edge_tris(&self, e: &Edge) -> &[usize] {
        self.edges2tris.get(e).map_or(&[], |l| l.as_slice())
    }

    pub fn get_boundary_edges(&self) -> &BTreeSet<UEdge> {
        &self.edge_classification().boundary
    }

    pub fn problem_edges(&self) -> &BTreeSet<UEdge> {
        &self.edge_classification().problem
    }

    /// Problem edges with a single triangle.
    fn dangling_edges(&self) -> BTreeSet<UEdge> {
        self.problem_edges()
            .iter()
            .filter(|ue| self.uedge_tris(ue).len() == 1)
            .copied()
            .collect()
    }

    pub fn tri_problem_edges(&self, t: &Triangle) -> bool {
        let pe = self.problem_edges();
        t.uedges().iter().any(|ue| pe.contains(ue))
    }

    /// Triangles touching a problem edge.
    pub fn problem_edge_tris(&self) -> BTreeSet<usize> {
        let mut out = BTreeSet::new();
        for ue in self.problem_edges() {
            out.extend(self.uedge_tris(ue).iter().copied());
        }
        out
    }

    /// Removes triangles with exactly one dangling edge. Returns how many
    /// were dropped.
    pub fn remove_dangling_tris(&mut self) -> usize {
        let dangling = self.dangling_edges();
        if dangling.is_empty() {
            return 0;
        }
        let mut cull = BTreeSet::new();
        for ue in &dangling {
            for &ti in self.uedge_tris(ue) {
                let t = self.tris_vect[ti];
                let cnt = t.uedges().iter().filter(|e| dangling.contains(e)).count();
                if cnt == 1 {
                    cull.insert(ti);
                }
            }
        }
        for &ti in &cull {
            trace!(face = self.f_id, tri = ti, "dropping dangling triangle");
            self.tri_remove(ti);
        }
        cull.len()
    }

    pub fn interior_incorrect_normals(&self) -> BTreeSet<usize> {
        self.tris()
            .filter(|t| self.invalid_normal(t))
            .map(|t| t.ind)
            .collect()
    }

    pub fn singularity_triangles(&self) -> BTreeSet<usize> {
        self.sv
            .iter()
            .flat_map(|&v| self.vertex_face_neighbors(v))
            .collect()
    }

    /// An edge carries more than two triangles that are not already
    /// attached to a dangling edge.
    pub fn self_intersecting_mesh(&self) -> bool {
        let mut pedge_tris = BTreeSet::new();
        for ue in self.dangling_edges() {
            pedge_tris.extend(self.uedge_tris(&ue).iter().copied());
        }
        for (ue, tris) in &self.uedges2tris {
            if tris.len() <= 2 {
                continue;
            }
            let valid_cnt = tris.iter().filter(|t| !pedge_tris.contains(t)).count();
            if valid_cnt > 2 {
                debug!(face = self.f_id, edge = ?ue, "self intersecting mesh edge");
                return true;
            }
        }
        false
    }

    /// Directed edges claimed by more than one triangle.
    pub fn directed_edge_conflicts(&self) -> Vec<Edge> {
        let mut out: Vec<Edge> = self
            .edges2tris
            .iter()
            .filter(|(_, l)| l.len() > 1)
            .map(|(e, _)| *e)
            .collect();
        out.sort_unstable();
        out
    }

    /// Largest geometric normal deviation between `seed` and `tris`, in
    /// degrees, clamped to `[10, 170]`.
    pub fn max_angle_delta(&self, seed: &Triangle, tris: &BTreeSet<usize>) -> f64 {
        let Some(sn) = self.tnorm(seed) else {
            return 170.0;
        };
        let dmax = tris
            .iter()
            .filter_map(|&i| self.tnorm(&self.tris_vect[i]))
            .map(|tn| ang_deg(&sn, &tn))
            .fold(0.0, f64::max);
        dmax.clamp(10.0, 170.0)
    }

    pub fn max_tri_angle(&self, plane: &Plane, tris: &BTreeSet<usize>) -> f64 {
        tris.iter()
            .filter_map(|&i| self.tnorm(&self.tris_vect[i]))
            .map(|tn| ang_deg(&tn, &plane.normal))
            .fold(0.0, f64::max)
    }

    /// Average surface normal over a vertex set.
    pub(crate) fn avg_normal<'a>(&self, verts: impl IntoIterator<Item = &'a usize>) -> Option<Vector3> {
        let mut sum = Vector3::zero();
        for v in verts {
            if let Some(n) = self.nmap.get(v).and_then(|&ni| self.normals.get(ni)) {
                sum = sum + *n;
            }
        }
        let n = sum.normalized()?;
        Some(if self.reversed { -n } else { n })
    }

    /// Least-squares plane through the vertices of `tris`, facing along the
    /// average surface normal.
    pub fn best_fit_plane(&self, tris: &BTreeSet<usize>) -> Option<Plane> {
        let verts: BTreeSet<usize> = tris.iter().flat_map(|&i| self.tris_vect[i].v).collect();
        self.fit_vertices(&verts)
    }

    pub(crate) fn fit_vertices(&self, verts: &BTreeSet<usize>) -> Option<Plane> {
        let pts: Vec<Point3> = verts.iter().map(|&v| self.pnts[v]).collect();
        let reference = self.avg_normal(verts);
        Plane::fit(&pts, reference.as_ref())
    }

    /// The quadrilateral loop around an interior edge, projected onto the
    /// plane fitted through its four points.
    pub fn uedge_polygon(&self, ue: &UEdge) -> Option<CPolygon> {
        let tris = self.uedge_tris(ue);
        if tris.len() != 2 {
            debug!(face = self.f_id, count = tris.len(), "edge is not interior");
            return None;
        }
        let (t1, t2) = (self.tris_vect[tris[0]], self.tris_vect[tris[1]]);
        let verts: BTreeSet<usize> = t1.v.iter().chain(t2.v.iter()).copied().collect();
        if verts.len() != 4 {
            return None;
        }
        let plane = self.fit_vertices(&verts)?;

        let mut poly = CPolygon::new();
        for &v in &verts {
            poly.add_point(plane.project(&self.pnts[v]), v);
        }
        for e in t1.uedges() {
            poly.add_edge(UEdge::new(poly.local_of(e.v[0])?, poly.local_of(e.v[1])?));
        }
        let new_edges: BTreeSet<UEdge> = t2.uedges().into_iter().filter(|e| e != ue).collect();
        poly.replace_edges(&new_edges, &BTreeSet::from([*ue]));
        Some(poly)
    }

    /// Whole-mesh consistency check. Never mutates the mesh; `verbosity`
    /// gates the diagnostic events.
    pub fn valid(&self, verbosity: u8) -> bool {
        let mut nret = true;
        for t in self.tris() {
            if self.invalid_normal(t) {
                if verbosity > 0 {
                    debug!(face = self.f_id, tri = t.ind, v = ?t.v, "invalid normal");
                }
                nret = false;
            }
        }

        let boundary = self.get_boundary_edges();
        let mut tret = true;
        if !self.planar {
            for t in self.tris() {
                let epnt_cnt = t.v.iter().filter(|v| self.ep.contains(v)).count();
                let bedge_cnt = t.uedges().iter().filter(|ue| boundary.contains(ue)).count();
                if epnt_cnt == 3 && bedge_cnt < 2 {
                    if verbosity > 0 {
                        debug!(face = self.f_id, tri = t.ind, bedge_cnt, "edge triangle off the boundary");
                    }
                    tret = false;
                }
            }
        }

        let eret = self.problem_edges().is_empty();
        if !eret && verbosity > 0 {
            debug!(face = self.f_id, count = self.problem_edges().len(), "problem edges in mesh");
        }

        let mut topret = true;
        for t in self.tris() {
            for e in t.edges() {
                let ue = UEdge::from(e);
                if !self.edge_tris(&e).contains(&t.ind) {
                    topret = false;
                }
                let utris = self.uedge_tris(&ue);
                if !utris.contains(&t.ind) {
                    topret = false;
                }
                if utris.len() != 2 && !self.brep_edges.contains(&ue) {
                    topret = false;
                }
                if !self.v2edges.get(&e.v0).is_some_and(|s| s.contains(&ue)) {
                    topret = false;
                }
            }
            for v in t.v {
                if !self.v2tris.get(&v).is_some_and(|s| s.contains(&t.ind)) {
                    topret = false;
                }
            }
        }
        if !topret && verbosity > 0 {
            debug!(face = self.f_id, "adjacency maps disagree with triangle set");
        }

        nret && tret && eret && topret
    }
}

#[cfg(test)]
mod tests {
    use crate::geometry::{Point3, Vector3};
    use crate::mesh::{CdtMesh, UEdge};

    fn strip() -> CdtMesh {
        // 0---1---2
        // | / | / |
        // 3---4---5
        let mut m = CdtMesh::new(7);
        m.planar = true;
        for (x, y) in [(0.0, 1.0), (1.0, 1.0), (2.0, 1.0), (0.0, 0.0), (1.0, 0.0), (2.0, 0.0)] {
            let p = m.add_point(Point3::new([x, y, 0.0]));
            let n = m.add_normal(Vector3::new([0.0, 0.0, 1.0]));
            m.set_normal(p, n);
            m.ep.insert(p);
        }
        for (a, b) in [(0, 1), (1, 2), (2, 5), (5, 4), (4, 3), (3, 0)] {
            m.brep_edges.insert(UEdge::new(a, b));
        }
        m.tri_add([3, 4, 1]);
        m.tri_add([3, 1, 0]);
        m.tri_add([4, 5, 2]);
        m.tri_add([4, 2, 1]);
        m
    }

    #[test]
    fn strip_is_valid_and_idempotent() {
        let m = strip();
        assert!(m.valid(0));
        assert!(m.valid(0));
        assert_eq!(m.get_boundary_edges().len(), 6);
        assert!(m.problem_edges().is_empty());
        assert!(!m.self_intersecting_mesh());
        assert!(m.directed_edge_conflicts().is_empty());
    }

    #[test]
    fn missing_triangle_leaves_problem_edges() {
        let mut m = strip();
        m.tri_remove(3);
        assert!(!m.valid(0));
        assert_eq!(
            m.problem_edges().iter().copied().collect::<Vec<_>>(),
            vec![UEdge::new(1, 4), UEdge::new(2, 4)]
        );
        assert_eq!(m.problem_edge_tris().into_iter().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn interior_edge_polygon_is_closed() {
        let m = strip();
        let mut poly = m.uedge_polygon(&UEdge::new(1, 4)).unwrap();
        assert!(poly.closed());
        assert_eq!(poly.len(), 4);
        assert!(m.uedge_polygon(&UEdge::new(0, 1)).is_none());
    }

    #[test]
    fn flipped_triangle_is_reported() {
        let mut m = strip();
        m.tri_remove(0);
        m.tri_add([3, 1, 4]);
        assert_eq!(m.interior_incorrect_normals().into_iter().collect::<Vec<_>>(), vec![4]);
        assert_eq!(m.directed_edge_conflicts().len(), 2);
        assert!(!m.valid(0));
    }
}
