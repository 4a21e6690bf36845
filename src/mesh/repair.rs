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

//! Local patch repair.
//!
//! A repair patch projects every mesh point into one plane and grows a
//! [`CPolygon`] outward from a valid triangle next to the seed until the
//! bad data is enclosed. The enclosed triangles are then replaced by a
//! fresh triangulation of the loop.
//!
//! Patch polygons add the mesh points in index order, so local and mesh
//! point indices coincide inside this module.

use std::{cmp::Ordering, collections::BTreeSet};

use tracing::{debug, info_span, trace, warn};

use crate::{
    error::{CdtError, CdtResult},
    geometry::Plane,
    kernel::predicates::{near_equal, point_in_polygon},
    mesh::{
        core::CdtMesh,
        topology::ang_deg,
        types::{Triangle, UEdge},
    },
    operations::triangulation::{PolygonInput, TriangulationMode, triangulate_polygon},
    polygon::CPolygon,
};

/// Why [`CdtMesh::tri_process`] refused a triangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TriRejection {
    /// A vertex with more than one problem edge; it was recorded as
    /// uncontained.
    Uncontained,
    /// One shared edge but every vertex already on the loop.
    SelfIntersecting,
}

/// How a triangle would change the loop.
#[derive(Clone, Debug, PartialEq)]
pub enum TriProcess {
    /// `count` is the number of triangle edges not on the loop. Only 1 and
    /// 2 can be incorporated.
    NewEdges {
        count: usize,
        new_edges: BTreeSet<UEdge>,
        shared_edges: BTreeSet<UEdge>,
        vert: Option<usize>,
    },
    Rejected(TriRejection),
}

/// A triangle next to the loop, ranked for incorporation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriCandidate {
    pub tri: Triangle,
    pub isect_edge: bool,
    pub uses_uncontained: bool,
    pub contains_uncontained: bool,
    pub all_bedge: bool,
    /// Radians between the growth direction and the closest outside
    /// point of interest.
    pub angle_to_nearest_uncontained: Option<f64>,
}

impl TriCandidate {
    fn new(tri: Triangle) -> Self {
        TriCandidate {
            tri,
            isect_edge: false,
            uses_uncontained: false,
            contains_uncontained: false,
            all_bedge: false,
            angle_to_nearest_uncontained: None,
        }
    }

    fn flagged(&self) -> bool {
        self.isect_edge || self.uses_uncontained || self.contains_uncontained || self.all_bedge
    }

    /// `Less` means `self` is tried first.
    pub fn priority(&self, other: &Self) -> Ordering {
        other
            .isect_edge
            .cmp(&self.isect_edge)
            .then(other.uses_uncontained.cmp(&self.uses_uncontained))
            .then(other.contains_uncontained.cmp(&self.contains_uncontained))
            .then(other.all_bedge.cmp(&self.all_bedge))
            .then_with(|| {
                match (self.angle_to_nearest_uncontained, other.angle_to_nearest_uncontained) {
                    (Some(a), Some(b)) => a.total_cmp(&b),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            })
            .then(self.tri.ind.cmp(&other.tri.ind))
    }
}

struct Patch {
    poly: CPolygon,
    plane: Plane,
}

enum SeedOutcome {
    Committed,
    Unchanged,
    Abandoned,
    Rejected,
}

/// Validity of a mesh before a non-repairing commit.
struct ValidityMark {
    valid: bool,
    problems: usize,
    conflicts: usize,
}

impl ValidityMark {
    fn take(mesh: &CdtMesh) -> Self {
        ValidityMark {
            valid: mesh.valid(0),
            problems: mesh.problem_edges().len(),
            conflicts: mesh.directed_edge_conflicts().len(),
        }
    }

    /// Triangles at handles `first_new..` were just added.
    fn degraded_by(&self, mesh: &CdtMesh, first_new: usize) -> Option<&'static str> {
        let inverted = (first_new..mesh.tris_vect.len())
            .filter_map(|i| mesh.tri(i))
            .any(|t| mesh.invalid_normal(t));
        if inverted {
            return Some("inverted triangle");
        }
        if mesh.problem_edges().len() > self.problems {
            return Some("problem edges added");
        }
        if mesh.directed_edge_conflicts().len() > self.conflicts {
            return Some("orientation conflicts added");
        }
        if self.valid && !mesh.valid(0) {
            return Some("mesh no longer valid");
        }
        None
    }
}

fn same_candidates(a: &[TriCandidate], b: &[TriCandidate]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.tri.v == y.tri.v)
}

impl CdtMesh {
    /// Triangulate the face loops and Steiner points into the mesh,
    /// replacing any existing triangles. Each triangle is wound to agree
    /// with the surface normal.
    pub fn cdt(&mut self) -> CdtResult<()> {
        let face = self.f_id;
        if !self.outer_loop.closed() {
            return Err(CdtError::OpenLoop { face, loop_index: 0 });
        }
        let mut holes = Vec::with_capacity(self.inner_loops.len());
        for (&li, lp) in self.inner_loops.iter_mut() {
            if !lp.closed() {
                return Err(CdtError::OpenLoop { face, loop_index: li });
            }
            holes.push(lp.owner_ring().ok_or(CdtError::OpenLoop { face, loop_index: li })?);
        }
        let outer = self
            .outer_loop
            .owner_ring()
            .ok_or(CdtError::OpenLoop { face, loop_index: 0 })?;

        let input = PolygonInput {
            outer,
            holes,
            steiner: self.interior_pnts.iter().copied().collect(),
        };
        let tris_2d = triangulate_polygon(&self.pnts_2d, &input, TriangulationMode::Constrained)
            .ok_or(CdtError::Triangulation { face })?;

        self.reset();
        for t in tris_2d {
            let mut v = t.map(|i| self.p2d3d[i]);
            if self.invalid_normal(&Triangle::new(v, 0)) {
                v.swap(1, 2);
            }
            self.tri_add(v);
        }
        debug!(face, tris = self.tri_count(), "face triangulated");
        Ok(())
    }

    /// Repairs inverted and non-manifold triangles in place.
    ///
    /// Succeeds when no problem edge is left. Singularity clean-up
    /// failures are only counted in [`CdtMesh::stats`], and a clean-up
    /// patch never leaves the mesh less valid.
    pub fn repair(&mut self) -> CdtResult<()> {
        let face = self.f_id;
        let _span = info_span!("repair", face).entered();

        if self.self_intersecting_mesh() {
            return Err(CdtError::SelfIntersectingMesh { face });
        }

        self.remove_dangling_tris();

        let mut seeds = self.interior_incorrect_normals();
        seeds.extend(self.problem_edge_tris());
        let mut st_size = seeds.len();
        while let Some(&seed) = seeds.first() {
            let ok = self.process_seed_tri(seed, true, self.settings.max_angle, None, &mut seeds);
            seeds.retain(|&t| self.tri_active(t));
            if !ok || seeds.len() >= st_size {
                warn!(face, seed, remaining = seeds.len(), "repair seed made no progress");
                return Err(CdtError::RepairStalled { face, remaining: seeds.len() });
            }
            st_size = seeds.len();
        }

        for e in self.directed_edge_conflicts() {
            for &t in self.edge_tris(&e) {
                for v in self.tris_vect[t].v {
                    seeds.extend(self.vertex_face_neighbors(v));
                }
            }
        }
        if !seeds.is_empty() {
            debug!(face, seeds = seeds.len(), "directed edge conflicts");
            let mut skipped = BTreeSet::new();
            loop {
                seeds.retain(|&t| self.tri_active(t));
                let Some(seed) = seeds.iter().copied().find(|s| !skipped.contains(s)) else {
                    break;
                };
                let before = seeds.len();
                let ok = self.process_seed_tri(seed, true, self.settings.max_angle, None, &mut seeds);
                seeds.retain(|&t| self.tri_active(t));
                if ok && seeds.len() < before {
                    skipped.clear();
                } else {
                    skipped.insert(seed);
                }
            }
            if !seeds.is_empty() {
                warn!(face, remaining = seeds.len(), "directed edge conflicts left unresolved");
            }
        }

        if self.has_singularities {
            let s_tris = self.singularity_triangles();
            if s_tris.len() > 2 {
                let mut seeds = s_tris.clone();
                while let Some(&seed) = seeds.first() {
                    let deg = self.max_angle_delta(&self.tris_vect[seed], &s_tris);
                    let outcome = self.seed_patch(seed, false, deg, None, &mut seeds);
                    seeds.remove(&seed);
                    seeds.retain(|&t| self.tri_active(t));
                    if matches!(outcome, SeedOutcome::Abandoned) {
                        self.stats.singularity_failures += 1;
                        debug!(face, seed, "singularity clean-up failed");
                    }
                }
            }
        }

        let remaining = self.problem_edges().len();
        if remaining > 0 {
            return Err(CdtError::RepairStalled { face, remaining });
        }
        Ok(())
    }

    /// Re-grows patches around triangles deviating more than `deg`
    /// degrees from the surface normal. No-op on planar faces.
    pub fn optimize(&mut self, deg: f64) -> bool {
        if self.planar {
            return false;
        }
        let mut seeds: BTreeSet<usize> = self
            .tris()
            .filter(|t| match (self.tnorm(t), self.bnorm(t)) {
                (Some(tn), Some(bn)) => ang_deg(&tn, &bn) > deg,
                _ => false,
            })
            .map(|t| t.ind)
            .collect();
        self.optimize_process(deg, None, &mut seeds);
        true
    }

    /// Optimizes around `seeds`, limited by their largest deviation from
    /// `plane` (or from their own best-fit plane).
    pub fn optimize_seeds(&mut self, seeds: &BTreeSet<usize>, plane: Option<&Plane>) -> bool {
        if self.planar {
            return false;
        }
        let fit = match plane {
            Some(p) => Some(*p),
            None => self.best_fit_plane(seeds),
        };
        let Some(fit) = fit else {
            return false;
        };
        let deg = self.max_tri_angle(&fit, seeds).min(170.0);
        let mut seeds = seeds.clone();
        self.optimize_process(deg, plane, &mut seeds);
        true
    }

    fn optimize_process(&mut self, deg: f64, plane: Option<&Plane>, seeds: &mut BTreeSet<usize>) {
        while let Some(seed) = seeds.pop_first() {
            if self.tri_active(seed) {
                self.process_seed_tri(seed, false, deg, plane, seeds);
            }
        }
    }

    /// Builds, grows and commits one patch. Claimed triangles are removed
    /// from the mesh and from `seeds`.
    ///
    /// Outside of `repairing`, a patch that would leave the mesh less
    /// valid than it found it is rolled back and counted in
    /// [`RepairStats::singularity_failures`].
    pub fn process_seed_tri(
        &mut self,
        seed: usize,
        repairing: bool,
        deg: f64,
        plane: Option<&Plane>,
        seeds: &mut BTreeSet<usize>,
    ) -> bool {
        matches!(
            self.seed_patch(seed, repairing, deg, plane, seeds),
            SeedOutcome::Committed | SeedOutcome::Unchanged
        )
    }

    fn seed_patch(
        &mut self,
        seed: usize,
        repairing: bool,
        deg: f64,
        plane: Option<&Plane>,
        seeds: &mut BTreeSet<usize>,
    ) -> SeedOutcome {
        self.stats.seeds_processed += 1;
        let Some(seed_tri) = self.tri(seed).copied() else {
            return SeedOutcome::Abandoned;
        };
        let Some(mut patch) = self.build_initial_loop(&seed_tri, repairing, plane, seeds) else {
            debug!(face = self.f_id, seed, "no valid starting loop");
            self.stats.patches_abandoned += 1;
            return SeedOutcome::Abandoned;
        };

        match self.grow_loop(&mut patch, deg, repairing, &seed_tri, plane.is_none()) {
            None => {
                debug!(face = self.f_id, seed, "loop growth failed");
                self.stats.patches_abandoned += 1;
                SeedOutcome::Abandoned
            }
            Some(0) => SeedOutcome::Unchanged,
            Some(_) => {
                let guard = (!repairing).then(|| (self.clone(), ValidityMark::take(self)));
                let first_new = self.tris_vect.len();
                let mut removed = 0;
                for &t in &patch.poly.visited_triangles {
                    if self.tri_active(t) {
                        self.tri_remove(t);
                        removed += 1;
                    }
                }
                let added = patch.poly.tris.len();
                for &t in &patch.poly.tris {
                    self.tri_add(t);
                }

                if let Some((backup, mark)) = guard {
                    if let Some(reason) = mark.degraded_by(self, first_new) {
                        debug!(face = self.f_id, seed, reason, "patch rejected");
                        let stats = self.stats;
                        *self = backup;
                        self.stats = stats;
                        self.stats.singularity_failures += 1;
                        return SeedOutcome::Rejected;
                    }
                }

                for t in &patch.poly.visited_triangles {
                    seeds.remove(t);
                }
                self.stats.triangles_removed += removed;
                self.stats.triangles_added += added;
                self.stats.patches_committed += 1;
                trace!(face = self.f_id, seed, removed, added, "patch committed");
                SeedOutcome::Committed
            }
        }
    }

    fn build_initial_loop(
        &self,
        seed: &Triangle,
        repairing: bool,
        plane: Option<&Plane>,
        seeds: &BTreeSet<usize>,
    ) -> Option<Patch> {
        let plane = match plane {
            Some(p) => *p,
            None => {
                let n = self.bnorm(seed).or_else(|| self.tnorm(seed))?;
                Plane::from_point_normal(self.tcenter(seed), n)?
            }
        };

        let mut poly = CPolygon::new();
        for (i, p) in self.pnts.iter().enumerate() {
            poly.add_point(plane.project(p), i);
            if self.brep_edge_pnt(i) {
                poly.brep_edge_pnts.insert(i);
            }
        }

        let start = if repairing {
            for v in seed.v {
                if !self.brep_edge_pnt(v) {
                    poly.uncontained.insert(v);
                }
            }
            let usable = |t: &usize| *t != seed.ind && !seeds.contains(t);
            self.face_neighbors(seed)
                .into_iter()
                .find(usable)
                .or_else(|| {
                    seed.v
                        .iter()
                        .flat_map(|&v| self.vertex_face_neighbors(v))
                        .find(usable)
                })?
        } else {
            seed.ind
        };

        let t = self.tris_vect[start];
        for ue in t.uedges() {
            poly.add_edge(ue);
        }
        poly.visited_triangles.insert(start);

        poly.closed().then_some(Patch { poly, plane })
    }

    /// Grows the patch loop. Returns the number of replacement triangles,
    /// `Some(0)` when there is nothing to do, `None` on failure.
    fn grow_loop(
        &self,
        patch: &mut Patch,
        deg: f64,
        stop_on_contained: bool,
        target: &Triangle,
        reproject: bool,
    ) -> Option<usize> {
        let mut angle = deg;
        if stop_on_contained
            && patch.poly.uncontained.is_empty()
            && patch.poly.visited_triangles.len() > 1
        {
            return Some(0);
        }
        if !(0.0..=170.0).contains(&deg) {
            warn!(face = self.f_id, deg, "angle limit out of range");
            return None;
        }

        if !patch.poly.visited_triangles.contains(&target.ind) {
            for v in target.v {
                if !patch.poly.used_verts.contains(&v) {
                    patch.poly.target_verts.insert(v);
                }
            }
        }
        patch.poly.unusable_triangles.clear();

        let mut ptris = self.polygon_tris(patch, angle, stop_on_contained, true);
        if ptris.is_empty() {
            return if stop_on_contained { None } else { Some(0) };
        }
        let mut stack: Vec<TriCandidate> = ptris.iter().rev().copied().collect();
        let mut steps = 0;

        while let Some(cand) = stack.pop() {
            steps += 1;
            if steps > self.settings.max_grow_steps {
                warn!(face = self.f_id, steps, "loop growth step limit reached");
                return None;
            }
            let ct = cand.tri;
            match self.tri_process(&mut patch.poly, &ct) {
                TriProcess::Rejected(TriRejection::Uncontained) if stop_on_contained => {
                    patch.poly.visited_triangles.insert(ct.ind);
                }
                TriProcess::Rejected(TriRejection::Uncontained) => {
                    patch.poly.skipped_triangles.insert(ct.ind);
                }
                TriProcess::Rejected(TriRejection::SelfIntersecting) => {
                    patch.poly.unusable_triangles.insert(ct.ind);
                }
                TriProcess::NewEdges {
                    count,
                    new_edges,
                    shared_edges,
                    vert,
                } => {
                    if count == 0 || count > 2 {
                        debug!(face = self.f_id, tri = ct.ind, count, "fatal loop growth error");
                        return None;
                    }
                    let flipped = self.is_flipped(&ct);
                    let poly = &mut patch.poly;

                    if stop_on_contained && count == 2 && flipped {
                        if let Some(v) = vert {
                            if self.brep_edge_pnt(v) {
                                for tv in ct.v {
                                    if !self.brep_edge_pnt(tv) {
                                        poly.flipped_face.insert(tv);
                                    }
                                }
                            } else {
                                poly.flipped_face.insert(v);
                            }
                        }
                    }

                    let mut use_tri = true;
                    let seeded_interior = poly.len() == 3 && !poly.interior_points.is_empty();
                    if !seeded_interior
                        && stop_on_contained
                        && count == 2
                        && !flipped
                        && !cand.flagged()
                        && cand.angle_to_nearest_uncontained.is_none()
                    {
                        use_tri = false;
                    }

                    if use_tri {
                        poly.replace_edges(&new_edges, &shared_edges);
                        poly.visited_triangles.insert(ct.ind);
                    }
                }
            }

            let h_uc = patch.poly.update_uncontained();

            if patch.poly.visited_triangles.contains(&target.ind)
                && stop_on_contained
                && !h_uc
                && (patch.poly.interior_points.len() > 1 || patch.poly.len() > 3)
            {
                return self
                    .oriented_polycdt(patch, reproject)
                    .then_some(patch.poly.tris.len());
            }

            if stack.is_empty() {
                if !stop_on_contained && reproject {
                    angle *= 0.75;
                }
                let ntris = self.polygon_tris(patch, angle, stop_on_contained, false);
                if same_candidates(&ptris, &ntris) {
                    if h_uc || (stop_on_contained && patch.poly.len() <= 3) {
                        debug!(face = self.f_id, "candidate set repeated without progress");
                        return None;
                    }
                    return self.oriented_polycdt(patch, reproject).then_some(1);
                }
                stack = ntris.iter().rev().copied().collect();
                ptris = ntris;
                if !stop_on_contained && stack.is_empty() {
                    return self.oriented_polycdt(patch, reproject).then_some(1);
                }
            }
        }
        None
    }

    /// Unvisited triangles on the loop edges, best candidate first.
    fn polygon_tris(
        &self,
        patch: &mut Patch,
        angle: f64,
        brep_norm: bool,
        initial: bool,
    ) -> Vec<TriCandidate> {
        let mut initial_set = BTreeSet::new();
        for (_, pe) in patch.poly.edges() {
            let isect = patch.poly.self_isect_edges.contains(&pe.uedge());
            let ue = UEdge::new(patch.poly.p2o[pe.v[0]], patch.poly.p2o[pe.v[1]]);
            for &ti in self.uedge_tris(&ue) {
                if patch.poly.visited_triangles.contains(&ti)
                    || patch.poly.skipped_triangles.contains(&ti)
                {
                    continue;
                }
                let t = &self.tris_vect[ti];
                if isect || (initial && t.v.iter().all(|&v| self.brep_edge_pnt(v))) {
                    initial_set.insert(ti);
                    continue;
                }
                let tn = if brep_norm { self.bnorm(t) } else { self.tnorm(t) };
                let d_ang = tn.map_or(0.0, |n| ang_deg(&patch.plane.normal, &n));
                if d_ang > angle && !near_equal(d_ang, angle, 1e-12) {
                    continue;
                }
                initial_set.insert(ti);
            }
        }

        let poly = &mut patch.poly;
        let mut out = Vec::with_capacity(initial_set.len());
        for ti in initial_set {
            let t = self.tris_vect[ti];
            let mut c = TriCandidate::new(t);

            if t.uedges().iter().any(|ue| poly.self_isect_edges.contains(ue)) {
                c.isect_edge = true;
            } else if t
                .v
                .iter()
                .any(|v| poly.uncontained.contains(v) || poly.flipped_face.contains(v))
            {
                c.uses_uncontained = true;
            } else {
                let tri2d = t.v.map(|v| poly.pnts_2d[v]);
                c.contains_uncontained = poly
                    .uncontained
                    .iter()
                    .chain(poly.flipped_face.iter())
                    .any(|&u| point_in_polygon(&poly.pnts_2d[u], &tri2d));
                if !c.contains_uncontained {
                    c.all_bedge = t.v.iter().all(|&v| self.brep_edge_pnt(v));
                }
                if !c.flagged() && poly.shared_edge_cnt(&t.v) == 1 {
                    c.angle_to_nearest_uncontained = poly.ucv_angle(&t.v);
                }
            }
            if c.flagged() || c.angle_to_nearest_uncontained.is_some() {
                poly.unusable_triangles.remove(&ti);
            }
            out.push(c);
        }
        out.sort_by(|a, b| a.priority(b));
        out
    }

    /// Classifies how `t` would extend the loop.
    pub fn tri_process(&self, poly: &mut CPolygon, t: &Triangle) -> TriProcess {
        let problem = self.problem_edges();
        let ue = t.uedges();
        let shared = ue.map(|e| poly.has_uedge(&e));

        let mut new_edges = BTreeSet::new();
        let mut shared_edges = BTreeSet::new();
        for (e, s) in ue.iter().zip(shared) {
            if s {
                shared_edges.insert(*e);
            } else {
                new_edges.insert(*e);
            }
        }
        let shared_cnt = shared_edges.len();
        let mut vert = None;

        match shared_cnt {
            0 => {
                for v in t.v {
                    if self.brep_edge_pnt(v) {
                        continue;
                    }
                    let bad = ue.iter().filter(|e| e.has_vertex(v) && problem.contains(e)).count();
                    if bad > 1 {
                        poly.uncontained.insert(v);
                        return TriProcess::Rejected(TriRejection::Uncontained);
                    }
                }
            }
            1 => match poly.unshared_vertex(&t.v) {
                Some(nv) => {
                    let bad = ue.iter().filter(|e| e.has_vertex(nv) && problem.contains(e)).count();
                    if bad > 1 {
                        poly.uncontained.insert(nv);
                        return TriProcess::Rejected(TriRejection::Uncontained);
                    }
                    vert = Some(nv);
                }
                None => return TriProcess::Rejected(TriRejection::SelfIntersecting),
            },
            2 => {
                vert = t
                    .v
                    .iter()
                    .copied()
                    .find(|&v| shared_edges.iter().all(|e| e.has_vertex(v)));
            }
            _ => {}
        }

        TriProcess::NewEdges {
            count: 3 - shared_cnt,
            new_edges,
            shared_edges,
            vert,
        }
    }

    /// Triangulates the patch loop. When a strict majority of the new
    /// triangles disagree with the surface normal, all of them are flipped.
    fn oriented_polycdt(&self, patch: &mut Patch, reproject: bool) -> bool {
        if reproject {
            self.best_fit_plane_reproject(patch);
        }
        if !patch.poly.cdt(TriangulationMode::Constrained) {
            return false;
        }
        let flip_cnt = patch
            .poly
            .tris
            .iter()
            .filter(|v| self.is_flipped(&Triangle::new(**v, 0)))
            .count();
        if flip_cnt > patch.poly.tris.len() / 2 {
            trace!(face = self.f_id, flip_cnt, "flipping patch triangles");
            for t in patch.poly.tris.iter_mut() {
                t.swap(1, 2);
            }
        }
        true
    }

    /// Refits the projection plane through the loop and interior points.
    /// The refit is dropped if it opens the loop or pushes an interior
    /// point outside.
    fn best_fit_plane_reproject(&self, patch: &mut Patch) -> bool {
        let poly = &mut patch.poly;
        let mut averts: BTreeSet<usize> = BTreeSet::new();
        for (_, pe) in poly.edges() {
            averts.insert(poly.p2o[pe.v[0]]);
            averts.insert(poly.p2o[pe.v[1]]);
        }
        averts.extend(poly.interior_points.iter().map(|&v| poly.p2o[v]));

        let Some(fit) = self.fit_vertices(&averts) else {
            return false;
        };
        let cached = poly.pnts_2d.clone();
        for (i, p) in self.pnts.iter().enumerate() {
            poly.pnts_2d[i] = fit.project(p);
        }

        let mut valid = poly.closed();
        if valid {
            let interior: Vec<usize> = poly.interior_points.iter().copied().collect();
            valid = interior.into_iter().all(|v| poly.point_in_polygon(v, false));
        }
        if !valid {
            poly.pnts_2d = cached;
            return false;
        }
        patch.plane = fit;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(ind: usize) -> TriCandidate {
        TriCandidate::new(Triangle::new([ind, ind + 1, ind + 2], ind))
    }

    #[test]
    fn candidate_priority_order() {
        let mut a = cand(0);
        let mut b = cand(1);
        assert_eq!(a.priority(&b), Ordering::Less);

        b.all_bedge = true;
        assert_eq!(a.priority(&b), Ordering::Greater);

        a.contains_uncontained = true;
        assert_eq!(a.priority(&b), Ordering::Less);

        b.uses_uncontained = true;
        assert_eq!(a.priority(&b), Ordering::Greater);

        a.isect_edge = true;
        assert_eq!(a.priority(&b), Ordering::Less);
    }

    #[test]
    fn smaller_angle_wins_and_none_ranks_last() {
        let mut a = cand(5);
        let mut b = cand(1);
        a.angle_to_nearest_uncontained = Some(0.2);
        assert_eq!(a.priority(&b), Ordering::Less);
        b.angle_to_nearest_uncontained = Some(0.1);
        assert_eq!(a.priority(&b), Ordering::Greater);
    }
}
