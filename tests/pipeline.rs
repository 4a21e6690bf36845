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

use std::collections::{BTreeMap, BTreeSet};

use brep_cdt::{
    CdtSession, CdtTolerances, FaceStatus,
    brep::{
        Curve3,
        primitives::{block, cone, cylinder},
    },
    edge::EdgeType,
    geometry::Point3,
    mesh::UEdge,
};

fn unit_block() -> brep_cdt::brep::Brep {
    block(Point3::new([0.0; 3]), Point3::new([1.0; 3]))
}

fn uedge_set(mesh: &brep_cdt::CdtMesh) -> BTreeSet<UEdge> {
    mesh.tris().flat_map(|t| t.uedges()).collect()
}

/// Every face is consistently wound, and across the whole model each
/// B-rep edge, keyed by session point ids, carries exactly two triangles.
fn assert_closed_manifold(s: &CdtSession<'_>) {
    let mut brep_tris: BTreeMap<UEdge, usize> = BTreeMap::new();
    for mesh in s.meshes() {
        let conflicts = mesh.directed_edge_conflicts();
        assert!(conflicts.is_empty(), "face {}: {conflicts:?}", mesh.f_id);
        for ue in &mesh.brep_edges {
            let [a, b] = ue.v.map(|v| mesh.gids[v].expect("boundary point without session id"));
            *brep_tris.entry(UEdge::new(a, b)).or_default() += mesh.uedge_tris(ue).len();
        }
    }
    assert!(!brep_tris.is_empty());
    for (ue, n) in brep_tris {
        assert_eq!(n, 2, "edge {ue:?}");
    }
}

#[test]
fn block_faces_are_two_triangles() {
    let brep = unit_block();
    let mut s = CdtSession::new(&brep, CdtTolerances::default());
    let report = s.tessellate().unwrap();
    assert!(report.all_valid());
    assert_eq!(report.faces.len(), 6);

    for f in &report.faces {
        assert_eq!(f.status, FaceStatus::Ok);
        assert_eq!(f.triangles, 2);
        let mesh = s.mesh(f.face).unwrap();
        let boundary = mesh.get_boundary_edges();
        assert_eq!(boundary.len(), 4);
        assert_eq!(*boundary, mesh.brep_edges);
        let interior: Vec<_> = uedge_set(mesh).difference(boundary).copied().collect();
        assert_eq!(interior.len(), 1);
        assert!(mesh.valid(0));
    }
    assert_closed_manifold(&s);
}

#[test]
fn block_edges_stay_single_segments() {
    let brep = unit_block();
    let mut s = CdtSession::new(&brep, CdtTolerances::default());
    s.prepare().unwrap();
    for e in 0..brep.edges.len() {
        assert_eq!(s.edge_type(e), Some(EdgeType::Linear));
        assert_eq!(s.segments(e).count(), 1);
    }
}

#[test]
fn circle_edges_get_at_least_three_segments() {
    let brep = cylinder(1.0, 2.0);
    let mut s = CdtSession::new(&brep, CdtTolerances::default());
    s.prepare().unwrap();
    for e in 0..2 {
        assert_eq!(s.edge_type(e), Some(EdgeType::Curved));
        assert!(s.segments(e).count() >= 3);
    }
    assert_eq!(s.edge_type(2), Some(EdgeType::LinearNonPlanar));
}

#[test]
fn split_segments_cover_the_edge_contiguously() {
    let brep = cylinder(1.0, 2.0);
    let mut s = CdtSession::new(&brep, CdtTolerances::default());
    s.prepare().unwrap();
    let mut segs: Vec<_> = s.segments(0).map(|(_, seg)| (seg.edge_start, seg.edge_end)).collect();
    segs.sort_by(|a, b| a.0.total_cmp(&b.0));
    let (d0, d1) = brep.edges[0].curve.as_ref().unwrap().domain();
    assert!((segs[0].0 - d0).abs() < 1e-12);
    assert!((segs[segs.len() - 1].1 - d1).abs() < 1e-12);
    for w in segs.windows(2) {
        assert!((w[0].1 - w[1].0).abs() < 1e-12);
    }
}

/// Both polygon edges of every segment resolve to the segment's own end
/// points, in the direction their trims run.
fn assert_shared_identity(s: &CdtSession<'_>, edges: usize) {
    let brep = s.brep();
    for e in 0..edges {
        for (_, seg) in s.segments(e) {
            for r in seg.tseg.iter().flatten() {
                let pe = s.poly_edge(*r).unwrap();
                let trim = &brep.trims[pe.trim.unwrap().trim];
                let a = s.poly_vertex_point(r.face, r.li, pe.v[0]).unwrap();
                let b = s.poly_vertex_point(r.face, r.li, pe.v[1]).unwrap();
                let (start, end) = if trim.reversed { (b, a) } else { (a, b) };
                assert_eq!((start, end), (seg.e_start, seg.e_end), "edge {e}");
            }
        }
    }
}

#[test]
fn shared_edges_use_identical_points() {
    let brep = cylinder(1.0, 2.0);
    let mut s = CdtSession::new(&brep, CdtTolerances::default());
    s.prepare().unwrap();
    assert_shared_identity(&s, brep.edges.len());

    let brep = unit_block();
    let mut s = CdtSession::new(&brep, CdtTolerances::default().with_absmax(0.3));
    s.prepare().unwrap();
    for e in 0..brep.edges.len() {
        assert_eq!(s.segments(e).count(), 4);
    }
    assert_shared_identity(&s, brep.edges.len());
}

#[test]
fn cylinder_tessellates_validly() {
    let brep = cylinder(1.0, 2.0);
    let mut s = CdtSession::new(&brep, CdtTolerances::default());
    let report = s.tessellate().unwrap();
    assert!(report.all_valid(), "{:?}", report.invalid_faces());
    for f in &report.faces {
        let mesh = s.mesh(f.face).unwrap();
        assert!(f.triangles > 0);
        assert!(mesh.valid(0));
        assert!(mesh.problem_edges().is_empty());
    }
    // Curved faces get Steiner points.
    let side = s.mesh(0).unwrap();
    assert!(!side.interior_pnts.is_empty());
    assert_closed_manifold(&s);
}

/// Tessellates a cone and checks both faces, the apex handling and that
/// singularity clean-up left the side face valid.
fn assert_cone_tessellates(tol: CdtTolerances) {
    let brep = cone(1.0, 2.0);
    let mut s = CdtSession::new(&brep, tol);
    let report = s.tessellate().unwrap();
    assert_eq!(report.faces.len(), 2);

    let side = s.mesh(0).unwrap();
    assert!(side.has_singularities);
    assert_eq!(side.sv.len(), 1);
    let apex = *side.sv.first().unwrap();
    assert!(side.pnts[apex].distance_to(&Point3::new([0.0; 3])) < 1e-12);
    assert!(side.tris().all(|t| !t.is_degenerate()));
    assert!(side.tris().any(|t| t.has_vertex(apex)));

    assert!(
        !matches!(report.faces[0].status, FaceStatus::Invalid(_)),
        "{:?}",
        report.faces[0].status
    );
    assert!(side.valid(0));
    assert!(side.problem_edges().is_empty());
    assert!(side.tris().all(|t| !side.invalid_normal(t)));

    // The cap is an ordinary planar disk.
    assert!(matches!(report.faces[1].status, FaceStatus::Ok));
    assert!(report.all_valid(), "{:?}", report.invalid_faces());
}

#[test]
fn cone_apex_is_one_singular_point() {
    assert_cone_tessellates(CdtTolerances::default());
}

#[test]
fn cone_stays_valid_with_tight_normal_tolerance() {
    assert_cone_tessellates(CdtTolerances::default().with_norm(0.2));
}

#[test]
fn close_parallel_edges_split_one_at_a_time() {
    // A thin slab: on its side faces the two long edges are 0.1 apart.
    let brep = block(Point3::new([0.0; 3]), Point3::new([1.0, 1.0, 0.1]));
    let mut s = CdtSession::new(&brep, CdtTolerances::default());
    s.initialize_edge_containers();
    s.initialize_loop_polygons().unwrap();
    s.initialize_edge_segs().unwrap();

    let face = 2;
    let ws = s.face_trim_edges(face);
    let long: Vec<usize> = ws
        .iter()
        .filter_map(|r| s.segment(s.poly_edge(*r)?.seg?))
        .filter(|seg| (seg.cp_len - 1.0).abs() < 1e-12)
        .map(|seg| seg.edge)
        .collect();
    assert_eq!(long.len(), 2);

    let round = s.close_edges_round(face, &ws);
    assert_eq!(round.splits, 1);
    let mut counts: Vec<usize> = long.iter().map(|&e| s.segments(e).count()).collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 2]);
}

#[test]
fn refinement_pass_converges_on_thin_slab() {
    let brep = block(Point3::new([0.0; 3]), Point3::new([1.0, 1.0, 0.1]));
    let mut s = CdtSession::new(&brep, CdtTolerances::default());
    let report = s.tessellate().unwrap();
    assert!(report.all_valid(), "{:?}", report.invalid_faces());
    assert!(s.segments(0).count() > 1);
    assert_closed_manifold(&s);
}
