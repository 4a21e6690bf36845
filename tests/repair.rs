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

use brep_cdt::{
    CdtMesh, CdtSession, CdtTolerances,
    brep::primitives::{block, cone, cylinder},
    geometry::{Plane, Point2, Point3, Vector3},
    mesh::UEdge,
    polygon::CPolygon,
};

/// 3x3 grid in the z = 0 plane, fanned around the centre point 4. Every
/// outer point sits on the face boundary.
fn grid_fan(invert_first: bool) -> CdtMesh {
    let mut m = CdtMesh::new(0);
    m.planar = true;
    let n = m.add_normal(Vector3::new([0.0, 0.0, 1.0]));
    for row in 0..3 {
        for col in 0..3 {
            let p = m.add_point(Point3::new([col as f64, row as f64, 0.0]));
            m.set_normal(p, n);
            if p != 4 {
                m.ep.insert(p);
            }
        }
    }
    let ring = [0, 1, 2, 5, 8, 7, 6, 3];
    for i in 0..ring.len() {
        m.brep_edges.insert(UEdge::new(ring[i], ring[(i + 1) % ring.len()]));
    }
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[(i + 1) % ring.len()]);
        if i == 0 && invert_first {
            m.tri_add([b, a, 4]);
        } else {
            m.tri_add([a, b, 4]);
        }
    }
    m
}

#[test]
fn clean_fan_is_valid() {
    let m = grid_fan(false);
    assert_eq!(m.tri_count(), 8);
    assert!(m.valid(0));
    assert_eq!(*m.get_boundary_edges(), m.brep_edges);
}

#[test]
fn inverted_triangle_is_repaired() {
    let mut m = grid_fan(true);
    assert!(!m.valid(0));
    assert_eq!(m.interior_incorrect_normals().len(), 1);

    m.repair().unwrap();
    assert!(!m.tri_active(0));
    assert_eq!(m.tri_count(), 8);
    assert!(m.interior_incorrect_normals().is_empty());
    assert_eq!(*m.get_boundary_edges(), m.brep_edges);
    assert!(m.valid(1));
    assert!(m.stats.patches_committed >= 1);
}

#[test]
fn degenerate_triangles_are_ignored() {
    let mut m = grid_fan(false);
    assert!(m.tri_add([0, 0, 1]));
    assert!(m.tri_add([4, 4, 4]));
    assert_eq!(m.tri_count(), 8);
}

#[test]
fn duplicate_keeps_the_oriented_copy() {
    let mut m = grid_fan(false);
    let before = m.tri_count();
    assert!(m.tri_add([1, 0, 4]));
    assert_eq!(m.tri_count(), before);
    assert!(m.tris().all(|t| !m.is_flipped(t)));
}

#[test]
fn closed_and_valid_are_idempotent() {
    let mut poly = CPolygon::new();
    let pts = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)];
    let ids: Vec<usize> = pts
        .iter()
        .enumerate()
        .map(|(i, &(x, y))| poly.add_point(Point2::new([x, y]), i))
        .collect();
    for i in 0..ids.len() {
        poly.add_ordered_edge(ids[i], ids[(i + 1) % ids.len()]);
    }
    let first = poly.closed();
    assert!(first);
    assert_eq!(poly.closed(), first);

    let m = grid_fan(true);
    let snapshot = m.serialize();
    let v = m.valid(0);
    assert_eq!(m.valid(0), v);
    assert_eq!(m.serialize(), snapshot);
}

#[test]
fn open_polygon_is_not_closed() {
    let mut poly = CPolygon::new();
    let a = poly.add_point(Point2::new([0.0, 0.0]), 0);
    let b = poly.add_point(Point2::new([1.0, 0.0]), 1);
    let c = poly.add_point(Point2::new([0.0, 1.0]), 2);
    poly.add_ordered_edge(a, b);
    poly.add_ordered_edge(b, c);
    assert!(!poly.closed());
}

#[test]
fn snapshot_round_trips_a_tessellated_face() {
    let brep = block(Point3::new([0.0; 3]), Point3::new([2.0, 1.0, 1.0]));
    let mut s = CdtSession::new(&brep, CdtTolerances::default().with_absmax(0.4));
    s.tessellate().unwrap();

    let mesh = s.mesh(0).unwrap();
    assert!(mesh.tri_count() > 2);
    let text = mesh.serialize();
    let back = CdtMesh::deserialize(&text).unwrap();
    assert_eq!(back.tri_count(), mesh.tri_count());
    assert_eq!(back.pnts, mesh.pnts);
    assert_eq!(back.brep_edges, mesh.brep_edges);
    assert_eq!(back.serialize(), text);
}

#[test]
fn triangles_next_to_a_hole_report_problem_edges() {
    let mut m = grid_fan(false);
    // [2, 5, 4]
    m.tri_remove(2);
    let t0 = *m.tri(0).unwrap();
    let t1 = *m.tri(1).unwrap();
    assert!(!m.tri_problem_edges(&t0));
    assert!(m.tri_problem_edges(&t1));
    assert!(m.problem_edges().contains(&UEdge::new(4, 5)));
}

#[test]
fn optimize_skips_planar_and_keeps_aligned_faces() {
    let mut m = grid_fan(false);
    assert!(!m.optimize(10.0));
    m.planar = false;
    assert!(m.optimize(10.0));
    assert_eq!(m.tri_count(), 8);
    assert!(m.valid(0));
}

#[test]
fn singularity_clean_up_keeps_a_valid_cone_side_valid() {
    let brep = cone(1.0, 2.0);
    for tol in [CdtTolerances::default(), CdtTolerances::default().with_norm(0.2)] {
        let mut s = CdtSession::new(&brep, tol);
        s.tessellate().unwrap();
        let m = s.mesh_mut(0).unwrap();
        m.stats = Default::default();
        m.cdt().unwrap();
        assert!(m.valid(0));
        assert!(m.has_singularities);

        m.repair().unwrap();
        assert!(m.valid(0));
        assert!(m.problem_edges().is_empty());
        assert!(m.directed_edge_conflicts().is_empty());
        assert!(m.tris().all(|t| !m.invalid_normal(t)));
    }
}

#[test]
fn optimize_keeps_a_curved_face_valid() {
    let brep = cylinder(1.0, 2.0);
    let mut s = CdtSession::new(&brep, CdtTolerances::default());
    s.tessellate().unwrap();
    let m = s.mesh_mut(0).unwrap();
    assert!(m.valid(0));
    assert!(m.optimize(5.0));
    assert!(m.valid(0));
    assert!(m.problem_edges().is_empty());
    assert!(m.directed_edge_conflicts().is_empty());
}

#[test]
fn rejected_patches_leave_the_mesh_untouched() {
    let mut m = grid_fan(false);
    m.planar = false;
    let before = m.serialize();
    // Projecting onto a plane across the surface folds the fan.
    let plane = Plane::from_point_normal(Point3::new([1.0, 1.0, 0.0]), Vector3::new([1.0, 0.0, 0.0])).unwrap();
    let seeds: BTreeSet<usize> = m.tris().map(|t| t.ind).collect();
    assert!(m.optimize_seeds(&seeds, Some(&plane)));
    assert!(m.valid(0));
    assert!(m.problem_edges().is_empty());
    if m.stats.patches_committed == 0 {
        assert_eq!(m.serialize(), before);
    }
}

#[test]
fn best_fit_plane_follows_the_surface_normal() {
    let mut m = grid_fan(false);
    let seeds: BTreeSet<usize> = [0, 1, 2].into_iter().collect();
    let plane = m.best_fit_plane(&seeds).unwrap();
    assert!(plane.normal.dot(&Vector3::new([0.0, 0.0, 1.0])) > 1.0 - 1e-9);
    assert!(plane.distance(&Point3::new([1.0, 1.0, 0.0])).abs() < 1e-9);
    // planar faces are never re-grown
    assert!(!m.optimize_seeds(&seeds, Some(&plane)));
    assert_eq!(m.tri_count(), 8);
}

#[test]
fn snapshot_files_load_back() {
    let m = grid_fan(true);
    let path = std::env::temp_dir().join(format!("brep-cdt-snapshot-{}.txt", std::process::id()));
    m.save(&path).unwrap();
    let back = CdtMesh::load(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(back.serialize(), m.serialize());
    assert_eq!(back.interior_incorrect_normals().len(), 1);
}
