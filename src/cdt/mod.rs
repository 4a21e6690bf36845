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

//! Whole-model tessellation.
//!
//! A [`CdtSession`] owns every per-face mesh and the shared-edge segments
//! of one B-rep. [`CdtSession::tessellate`] runs the setup passes in their
//! required order, then triangulates, repairs and validates each face on
//! its own.

mod sample;
mod tolerance;

pub use tolerance::{CdtTolerances, RepairSettings, ToleranceSet};

use std::collections::BTreeSet;

use ahash::AHashMap;
use tracing::{debug, info, info_span, warn};

use crate::{
    brep::Brep,
    edge::{BEdgeSeg, EdgeType, PolyEdgeRef},
    error::{CdtError, CdtResult},
    geometry::{AabbTree, Point3},
    mesh::{CdtMesh, RepairStats, UEdge},
    polygon::{CPolygon, PolyEdge},
};

/// Outcome for one face.
#[derive(Clone, Debug, PartialEq)]
pub enum FaceStatus {
    /// Valid straight out of the triangulator.
    Ok,
    /// Valid after local repair.
    Repaired,
    Invalid(CdtError),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FaceReport {
    pub face: usize,
    pub status: FaceStatus,
    pub triangles: usize,
    pub stats: RepairStats,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TessellationReport {
    pub faces: Vec<FaceReport>,
}

impl TessellationReport {
    pub fn all_valid(&self) -> bool {
        self.faces
            .iter()
            .all(|f| !matches!(f.status, FaceStatus::Invalid(_)))
    }

    pub fn invalid_faces(&self) -> Vec<usize> {
        self.faces
            .iter()
            .filter(|f| matches!(f.status, FaceStatus::Invalid(_)))
            .map(|f| f.face)
            .collect()
    }
}

/// Tessellation state for one B-rep.
///
/// Session point ids identify 3D points across faces: every face mesh
/// that uses a point maps the same id to its own local index.
#[derive(Debug)]
pub struct CdtSession<'a> {
    pub(crate) brep: &'a Brep,
    pub tol: CdtTolerances,
    pub settings: RepairSettings,

    pub(crate) pnts: Vec<Point3>,
    /// Session point of each B-rep vertex.
    pub(crate) vert_pnts: Vec<usize>,
    pub(crate) fmeshes: Vec<CdtMesh>,

    /// Segment arena; a split empties the parent's slot.
    pub(crate) segs: Vec<Option<BEdgeSeg>>,
    /// Live segments of each B-rep edge.
    pub(crate) e2segs: Vec<BTreeSet<usize>>,
    pub(crate) edge_types: Vec<EdgeType>,

    pub(crate) face_trees: Vec<AabbTree<2, PolyEdgeRef>>,
    pub(crate) unsplit_singular: BTreeSet<PolyEdgeRef>,
    /// Median curved-segment length per B-rep loop.
    pub(crate) l_median_len: Vec<Option<f64>>,
    /// Shortest segment touching each vertex point.
    pub(crate) v_min_seg_len: AHashMap<usize, f64>,
}

impl<'a> CdtSession<'a> {
    pub fn new(brep: &'a Brep, tol: CdtTolerances) -> Self {
        CdtSession {
            brep,
            tol,
            settings: RepairSettings::default(),
            pnts: Vec::new(),
            vert_pnts: Vec::new(),
            fmeshes: Vec::new(),
            segs: Vec::new(),
            e2segs: Vec::new(),
            edge_types: Vec::new(),
            face_trees: Vec::new(),
            unsplit_singular: BTreeSet::new(),
            l_median_len: Vec::new(),
            v_min_seg_len: AHashMap::default(),
        }
    }

    pub fn with_settings(mut self, settings: RepairSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn brep(&self) -> &'a Brep {
        self.brep
    }

    pub fn point(&self, id: usize) -> Option<&Point3> {
        self.pnts.get(id)
    }

    pub(crate) fn add_session_point(&mut self, p: Point3) -> usize {
        self.pnts.push(p);
        self.pnts.len() - 1
    }

    pub fn mesh(&self, face: usize) -> Option<&CdtMesh> {
        self.fmeshes.get(face)
    }

    pub fn mesh_mut(&mut self, face: usize) -> Option<&mut CdtMesh> {
        self.fmeshes.get_mut(face)
    }

    pub fn meshes(&self) -> &[CdtMesh] {
        &self.fmeshes
    }

    pub fn edge_type(&self, edge: usize) -> Option<EdgeType> {
        self.edge_types.get(edge).copied()
    }

    pub fn segment(&self, id: usize) -> Option<&BEdgeSeg> {
        self.segs.get(id).and_then(Option::as_ref)
    }

    /// Live segments of a B-rep edge, in creation order.
    pub fn segments(&self, edge: usize) -> impl Iterator<Item = (usize, &BEdgeSeg)> + '_ {
        self.e2segs
            .get(edge)
            .into_iter()
            .flatten()
            .filter_map(|&id| self.segment(id).map(|s| (id, s)))
    }

    /// Loop polygon `li` of `face`; slot 0 is the outer loop.
    pub fn loop_polygon(&self, face: usize, li: usize) -> Option<&CPolygon> {
        let fm = self.fmeshes.get(face)?;
        if li == 0 {
            Some(&fm.outer_loop)
        } else {
            fm.inner_loops.get(&li)
        }
    }

    pub(crate) fn loop_polygon_mut(&mut self, face: usize, li: usize) -> Option<&mut CPolygon> {
        let fm = self.fmeshes.get_mut(face)?;
        if li == 0 {
            Some(&mut fm.outer_loop)
        } else {
            fm.inner_loops.get_mut(&li)
        }
    }

    pub fn poly_edge(&self, r: PolyEdgeRef) -> Option<&PolyEdge> {
        self.loop_polygon(r.face, r.li)?.edge(r.pe)
    }

    /// Every boundary polygon edge of `face`.
    pub fn face_trim_edges(&self, face: usize) -> Vec<PolyEdgeRef> {
        let Some(fm) = self.fmeshes.get(face) else {
            return Vec::new();
        };
        let mut out: Vec<PolyEdgeRef> = fm
            .outer_loop
            .edge_ids()
            .into_iter()
            .map(|pe| PolyEdgeRef { face, li: 0, pe })
            .collect();
        for (&li, lp) in &fm.inner_loops {
            out.extend(lp.edge_ids().into_iter().map(|pe| PolyEdgeRef { face, li, pe }));
        }
        out
    }

    /// Session point behind a polygon vertex.
    pub fn poly_vertex_point(&self, face: usize, li: usize, v: usize) -> Option<usize> {
        let fm = self.fmeshes.get(face)?;
        let p2 = self.loop_polygon(face, li)?.owner_of(v)?;
        let p3 = *fm.p2d3d.get(p2)?;
        *fm.gids.get(p3)?
    }

    /// Runs the full pipeline. Fails only for whole-model errors; face
    /// failures are reported per face.
    pub fn tessellate(&mut self) -> CdtResult<TessellationReport> {
        let _span = info_span!("tessellate", faces = self.brep.faces.len()).entered();
        self.prepare()?;
        let faces = (0..self.fmeshes.len())
            .map(|f| self.tessellate_face(f))
            .collect::<Vec<_>>();
        let report = TessellationReport { faces };
        info!(invalid = ?report.invalid_faces(), "tessellation finished");
        Ok(report)
    }

    /// The ordered setup passes that touch both faces of shared edges.
    pub fn prepare(&mut self) -> CdtResult<()> {
        self.brep.validate()?;
        self.initialize_edge_containers();
        self.initialize_loop_polygons()?;
        self.initialize_edge_segs()?;
        self.tol_curved_edges_split();
        self.curved_edges_refine();
        self.tol_linear_edges_split();
        self.refine_close_edges();
        self.finalize_rtrees();
        Ok(())
    }

    /// Triangulates, repairs and validates one prepared face.
    pub fn tessellate_face(&mut self, face: usize) -> FaceReport {
        let _span = info_span!("face", face).entered();
        self.finalize_face_boundary(face);
        let added = self.sample_interior(face);
        debug!(face, added, "interior points sampled");

        let Some(fm) = self.fmeshes.get_mut(face) else {
            return FaceReport {
                face,
                status: FaceStatus::Invalid(CdtError::InvalidTopology(format!("no mesh for face {face}"))),
                triangles: 0,
                stats: RepairStats::default(),
            };
        };

        let status = match fm.cdt() {
            Err(e) => FaceStatus::Invalid(e),
            Ok(()) => {
                let was_valid = fm.valid(0);
                match fm.repair() {
                    Err(e) => FaceStatus::Invalid(e),
                    Ok(()) if !fm.valid(1) => FaceStatus::Invalid(CdtError::InvalidTopology(
                        format!("face {face} failed validation"),
                    )),
                    Ok(()) if was_valid && fm.stats.patches_committed == 0 => FaceStatus::Ok,
                    Ok(()) => FaceStatus::Repaired,
                }
            }
        };
        if let FaceStatus::Invalid(e) = &status {
            warn!(face, error = %e, "face is invalid");
        }
        FaceReport {
            face,
            status,
            triangles: fm.tri_count(),
            stats: fm.stats,
        }
    }

    /// Records the loop edges and points of `face` as B-rep boundary data
    /// in its mesh.
    pub(crate) fn finalize_face_boundary(&mut self, face: usize) {
        let refs = self.face_trim_edges(face);
        let mut edges = Vec::with_capacity(refs.len());
        for r in refs {
            let Some(pe) = self.poly_edge(r) else { continue };
            let Some(poly) = self.loop_polygon(r.face, r.li) else { continue };
            let (Some(a), Some(b)) = (poly.owner_of(pe.v[0]), poly.owner_of(pe.v[1])) else {
                continue;
            };
            edges.push((a, b));
        }
        let Some(fm) = self.fmeshes.get_mut(face) else {
            return;
        };
        for (a, b) in edges {
            let (a3, b3) = (fm.p2d3d[a], fm.p2d3d[b]);
            fm.ep.insert(a3);
            fm.ep.insert(b3);
            if a3 != b3 {
                fm.brep_edges.insert(UEdge::new(a3, b3));
            }
        }
    }
}
