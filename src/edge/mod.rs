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

//! Shared-edge subdivision.
//!
//! Each B-rep edge is cut into [`BEdgeSeg`]s. A segment is tied to one
//! polygon edge in each of the two faces bordering it, and every split
//! updates both faces with the same new session point so the face meshes
//! agree along the edge.

mod refine;
mod split;

pub use refine::CloseEdgeRound;
pub(crate) use refine::median;

use std::collections::BTreeSet;

use tracing::debug;

use crate::{
    cdt::CdtSession,
    error::{CdtError, CdtResult},
    geometry::{Aabb, AabbTree, Point2, Vector3},
    mesh::CdtMesh,
    polygon::{CPolygon, TrimRange},
};

/// How aggressively an edge is refined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EdgeType {
    /// No 3D curve: the trim collapses onto a surface singularity.
    Singular,
    Curved,
    /// Straight, bordering at least one curved surface.
    LinearNonPlanar,
    /// Straight, touching a curved edge at one of its vertices.
    LinearNearCurved,
    Linear,
}

/// One polygon edge in one face loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolyEdgeRef {
    pub face: usize,
    /// Position of the loop within the face; 0 is the outer loop.
    pub li: usize,
    pub pe: usize,
}

/// A piece `[edge_start, edge_end]` of a B-rep edge's parameter range.
#[derive(Clone, Debug, PartialEq)]
pub struct BEdgeSeg {
    pub edge: usize,
    pub edge_type: EdgeType,
    /// Length of the whole edge curve.
    pub cp_len: f64,
    pub edge_start: f64,
    pub edge_end: f64,
    /// Session points at the segment ends.
    pub e_start: usize,
    pub e_end: usize,
    /// Session points at the ends of the whole edge.
    pub e_root_start: usize,
    pub e_root_end: usize,
    pub tan_start: Option<Vector3>,
    pub tan_end: Option<Vector3>,
    /// The polygon edge in each bordering face.
    pub tseg: [Option<PolyEdgeRef>; 2],
}

impl BEdgeSeg {
    pub fn span(&self) -> f64 {
        self.edge_end - self.edge_start
    }
}

/// Slack added to every edge box so boxes meeting on a shared extent
/// overlap despite rounding.
const EDGE_BOX_TOL: f64 = 2.328_306_436_538_696_3e-10;

/// Box of a 2D polygon edge. With `padded`, an axis whose extent is under
/// half the chord grows by 0.51 of the half chord so near-axis-aligned
/// edges still catch their neighbours.
pub(crate) fn edge_box(a: &Point2, b: &Point2, padded: bool) -> Aabb<2> {
    let mut bb = Aabb::from_points(a, b).expanded(EDGE_BOX_TOL);
    if padded {
        let half = 0.5 * a.distance_to(b);
        for i in 0..2 {
            if bb.extent(i) < half {
                bb = bb.expanded_axis(i, 0.51 * half);
            }
        }
    }
    bb
}

impl CdtSession<'_> {
    /// Classifies every edge and creates one segment per curve edge.
    pub fn initialize_edge_containers(&mut self) {
        let brep = self.brep;
        self.pnts.clear();
        self.segs.clear();
        self.vert_pnts.clear();
        for v in &brep.vertices {
            let gid = self.add_session_point(v.point);
            self.vert_pnts.push(gid);
        }

        let curved: Vec<bool> = brep
            .edges
            .iter()
            .map(|e| e.curve.as_deref().is_some_and(|c| !c.is_linear()))
            .collect();
        let vert_curved: Vec<bool> = (0..brep.vertices.len())
            .map(|v| brep.vertex_edges(v).any(|e| curved[e]))
            .collect();

        self.edge_types = brep
            .edges
            .iter()
            .enumerate()
            .map(|(i, e)| {
                if e.curve.is_none() {
                    EdgeType::Singular
                } else if curved[i] {
                    EdgeType::Curved
                } else if e.trims.iter().any(|&t| {
                    brep.face_of_trim(t)
                        .is_some_and(|f| brep.faces[f].surface.planar().is_none())
                }) {
                    EdgeType::LinearNonPlanar
                } else if e.vertices.iter().any(|&v| vert_curved[v]) {
                    EdgeType::LinearNearCurved
                } else {
                    EdgeType::Linear
                }
            })
            .collect();

        self.e2segs = vec![BTreeSet::new(); brep.edges.len()];
        for (i, e) in brep.edges.iter().enumerate() {
            let Some(curve) = e.curve.as_deref() else {
                continue;
            };
            let (d0, d1) = curve.domain();
            let seg = BEdgeSeg {
                edge: i,
                edge_type: self.edge_types[i],
                cp_len: curve.length(),
                edge_start: d0,
                edge_end: d1,
                e_start: self.vert_pnts[e.vertices[0]],
                e_end: self.vert_pnts[e.vertices[1]],
                e_root_start: self.vert_pnts[e.vertices[0]],
                e_root_end: self.vert_pnts[e.vertices[1]],
                tan_start: curve.tangent_at(d0),
                tan_end: curve.tangent_at(d1),
                tseg: [None, None],
            };
            self.segs.push(Some(seg));
            self.e2segs[i].insert(self.segs.len() - 1);
        }
        debug!(edges = brep.edges.len(), segments = self.segs.len(), "edge containers ready");
    }

    /// Builds one polygon per face loop from its trims and links each
    /// polygon edge to its edge segment.
    pub fn initialize_loop_polygons(&mut self) -> CdtResult<()> {
        let brep = self.brep;
        self.fmeshes = (0..brep.faces.len())
            .map(|f| {
                let mut fm = CdtMesh::new(f);
                fm.planar = brep.faces[f].surface.planar().is_some();
                fm.reversed = brep.faces[f].reversed;
                fm.settings = self.settings;
                fm
            })
            .collect();
        self.face_trees = vec![AabbTree::new(); brep.faces.len()];
        self.unsplit_singular.clear();

        for (face, bface) in brep.faces.iter().enumerate() {
            for (li, &bl) in bface.loops.iter().enumerate() {
                let trims = &brep.loops[bl].trims;
                let mut poly = CPolygon::new();
                let mut fv = None;
                let mut cv = None;
                let mut links = Vec::with_capacity(trims.len());

                // The last trim closes back onto the first point, so a loop
                // of one closed trim starts as a self-loop.
                for (k, &ti) in trims.iter().enumerate() {
                    let trim = &brep.trims[ti];
                    let (t0, t1) = trim.curve.domain();
                    let pv = match cv {
                        Some(v) => v,
                        None => {
                            let v = self.add_trim_point(face, &mut poly, ti, t0, trim.vertices[0]);
                            fv = Some(v);
                            v
                        }
                    };
                    let nv = match fv {
                        Some(v) if k + 1 == trims.len() => v,
                        _ => self.add_trim_point(face, &mut poly, ti, t1, trim.vertices[1]),
                    };
                    let pe = poly.add_ordered_edge(pv, nv);
                    if let Some(e) = poly.edge_mut(pe) {
                        e.trim = Some(TrimRange { trim: ti, start: t0, end: t1 });
                    }
                    links.push((pe, ti));
                    cv = Some(nv);
                }

                for &(pe, ti) in &links {
                    let r = PolyEdgeRef { face, li, pe };
                    match brep.trims[ti].edge {
                        Some(edge) => self.link_trim_edge(r, edge, &mut poly)?,
                        None => {
                            self.unsplit_singular.insert(r);
                            self.fmeshes[face].has_singularities = true;
                        }
                    }
                    if let Some(pedge) = poly.edge(pe) {
                        let bb = edge_box(&poly.pnts_2d[pedge.v[0]], &poly.pnts_2d[pedge.v[1]], true);
                        self.face_trees[face].insert(bb, r);
                    }
                }

                let fm = &mut self.fmeshes[face];
                if li == 0 {
                    fm.outer_loop = poly;
                } else {
                    fm.inner_loops.insert(li, poly);
                }
            }
        }
        Ok(())
    }

    /// Ties polygon edge `r` to the (single) initial segment of `edge`.
    fn link_trim_edge(&mut self, r: PolyEdgeRef, edge: usize, poly: &mut CPolygon) -> CdtResult<()> {
        let Some(&sid) = self.e2segs.get(edge).and_then(|s| s.first()) else {
            return Ok(());
        };
        let Some(seg) = self.segs[sid].as_mut() else {
            return Ok(());
        };
        let slot = seg.tseg.iter().position(Option::is_none).ok_or(CdtError::TooManyTrims {
            edge,
            count: 3,
        })?;
        seg.tseg[slot] = Some(r);
        if let Some(e) = poly.edge_mut(r.pe) {
            e.seg = Some(sid);
        }
        Ok(())
    }

    /// Adds the point of trim `ti` at parameter `t`, anchored to the
    /// session point of B-rep vertex `vertex`.
    fn add_trim_point(&mut self, face: usize, poly: &mut CPolygon, ti: usize, t: f64, vertex: usize) -> usize {
        let brep = self.brep;
        let trim = &brep.trims[ti];
        let bface = &brep.faces[face];
        let uv = trim.curve.point_at(t);
        let gid = self.vert_pnts[vertex];
        let normal = trim
            .edge
            .and_then(|_| bface.surface.normal_at(uv[0], uv[1]))
            .map(|n| if bface.reversed { -n } else { n });
        let fm = &mut self.fmeshes[face];
        let p3 = fm.add_shared_point(gid, self.pnts[gid], normal);
        fm.ep.insert(p3);
        let p2 = fm.add_point_2d(uv, p3);
        poly.add_point(uv, p2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new([x, y])
    }

    #[test]
    fn touching_edge_boxes_overlap() {
        let flat = edge_box(&p(0.0, 0.0), &p(1.0, 0.0), false);
        let upright = edge_box(&p(0.5, 1e-12), &p(0.5, 1.0), false);
        assert!(flat.intersects(&upright));

        let diag = edge_box(&p(0.0, 0.0), &p(1.0, 1.0), true);
        let next = edge_box(&p(1.0 + 1e-12, 1.0 + 1e-12), &p(2.0, 2.0), true);
        assert!(diag.intersects(&next));

        let apart = edge_box(&p(0.5, 1e-6), &p(0.5, 1.0), false);
        assert!(!flat.intersects(&apart));
    }
}
