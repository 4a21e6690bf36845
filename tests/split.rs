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

use brep_cdt::{CdtSession, CdtTolerances, brep::primitives::block, geometry::Point3};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn splits_partition_their_parent(
        fracs in prop::collection::vec(0.2f64..0.8, 1..8),
        picks in prop::collection::vec(any::<prop::sample::Index>(), 8),
        edge in 0usize..12,
    ) {
        let brep = block(Point3::new([0.0; 3]), Point3::new([1.0, 2.0, 0.5]));
        let mut s = CdtSession::new(&brep, CdtTolerances::default());
        s.initialize_edge_containers();
        s.initialize_loop_polygons().unwrap();
        s.initialize_edge_segs().unwrap();
        let total: f64 = s.segments(edge).map(|(_, seg)| seg.span()).sum();

        for (f, pick) in fracs.iter().zip(&picks) {
            let ids: Vec<usize> = s.segments(edge).map(|(id, _)| id).collect();
            let id = ids[pick.index(ids.len())];
            let parent = s.segment(id).unwrap().clone();
            let t = parent.edge_start + f * parent.span();

            let kids = s.split_edge_seg(id, true, Some(t), true);
            prop_assert_eq!(kids.len(), 2);
            prop_assert!(s.segment(id).is_none());
            let a = s.segment(kids[0]).unwrap();
            let b = s.segment(kids[1]).unwrap();
            prop_assert!(a.span() > 0.0 && a.span() < parent.span());
            prop_assert!(b.span() > 0.0 && b.span() < parent.span());
            prop_assert!((a.span() + b.span() - parent.span()).abs() < 1e-12);
            prop_assert_eq!(a.edge_start, parent.edge_start);
            prop_assert_eq!(b.edge_end, parent.edge_end);
            prop_assert_eq!(a.e_start, parent.e_start);
            prop_assert_eq!(b.e_end, parent.e_end);
            prop_assert_eq!(a.e_end, b.e_start);
        }

        let covered: f64 = s.segments(edge).map(|(_, seg)| seg.span()).sum();
        prop_assert!((covered - total).abs() < 1e-9);
        prop_assert_eq!(s.segments(edge).count(), fracs.len() + 1);

        for &ti in &brep.edges[edge].trims {
            let face = brep.face_of_trim(ti).unwrap();
            let mut outer = s.mesh(face).unwrap().outer_loop.clone();
            prop_assert!(outer.closed());
        }
    }
}

#[test]
fn unforced_split_respects_tolerances() {
    let brep = block(Point3::new([0.0; 3]), Point3::new([1.0; 3]));
    let mut s = CdtSession::new(&brep, CdtTolerances::default());
    s.initialize_edge_containers();
    s.initialize_loop_polygons().unwrap();
    s.initialize_edge_segs().unwrap();
    let (id, _) = s.segments(0).next().unwrap();
    assert!(s.split_edge_seg(id, false, None, true).is_empty());
    assert_eq!(s.split_edge_seg(id, true, None, true).len(), 2);
}

#[test]
fn split_outside_the_segment_is_refused() {
    let brep = block(Point3::new([0.0; 3]), Point3::new([1.0; 3]));
    let mut s = CdtSession::new(&brep, CdtTolerances::default());
    s.initialize_edge_containers();
    s.initialize_loop_polygons().unwrap();
    let (id, seg) = s.segments(0).next().map(|(id, seg)| (id, seg.clone())).unwrap();
    assert!(s.split_edge_seg(id, true, Some(seg.edge_end + 1.0), true).is_empty());
    assert!(s.split_edge_seg(id, true, Some(seg.edge_start), true).is_empty());
    assert_eq!(s.segments(0).count(), 1);
}
