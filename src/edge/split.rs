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

use tracing::{trace, warn};

use super::{BEdgeSeg, EdgeType, PolyEdgeRef, edge_box};
use crate::{
    brep::curve_closest_param,
    cdt::CdtSession,
    geometry::{Aabb, Point2, Point3, Segment, Vector3},
    polygon::TrimRange,
};

/// 3D identity of a new cut point.
enum CutPoint {
    /// A new session point shared with the other face.
    Shared(usize),
    /// An existing local mesh point.
    Local(usize),
}

/// Where a polygon edge gets cut.
struct TrimCut {
    r: PolyEdgeRef,
    v: [usize; 2],
    range: TrimRange,
    tmid: f64,
    uv: Point2,
}

impl CdtSession<'_> {
    /// Surface normal of `face` at `uv`, flipped for reversed faces. `None`
    /// at singular points.
    pub(crate) fn face_normal(&self, face: usize, uv: &Point2) -> Option<Vector3> {
        let bface = self.brep.faces.get(face)?;
        let n = bface.surface.normal_at(uv[0], uv[1])?;
        Some(if bface.reversed { -n } else { n })
    }

    pub(crate) fn seg_len(&self, seg: &BEdgeSeg) -> f64 {
        self.pnts[seg.e_start].distance_to(&self.pnts[seg.e_end])
    }

    /// Decides whether a segment still violates its tolerances, given the
    /// curve point `mid` at its parameter midpoint.
    pub fn tol_need_split(&self, seg: &BEdgeSeg, mid: &Point3) -> bool {
        let p0 = self.pnts[seg.e_start];
        let p1 = self.pnts[seg.e_end];
        let seg_len = p0.distance_to(&p1);
        let ts = self.tol.digest(seg.cp_len);
        let (mut max_allowed, mut min_allowed) = (ts.max_dist, ts.min_dist);
        let max_chord_dev = if ts.within_dist.is_finite() {
            ts.within_dist
        } else {
            seg_len
        };

        match seg.edge_type {
            EdgeType::LinearNonPlanar => {
                let m = seg
                    .tseg
                    .iter()
                    .flatten()
                    .filter(|r| !self.fmeshes[r.face].planar)
                    .filter_map(|r| self.loop_median_len(r.face, r.li))
                    .reduce(f64::min);
                let Some(m) = m else {
                    warn!(edge = seg.edge, "no loop median for non-planar linear edge");
                    return false;
                };
                max_allowed = 5.0 * m;
                min_allowed = 0.2 * m;
            }
            EdgeType::LinearNearCurved => {
                let s = [seg.e_root_start, seg.e_root_end]
                    .iter()
                    .filter_map(|v| self.v_min_seg_len.get(v).copied())
                    .reduce(f64::min);
                let Some(s) = s else {
                    warn!(edge = seg.edge, "no curved segment length at edge vertices");
                    return false;
                };
                max_allowed = 2.0 * s;
                min_allowed = 0.5 * s;
            }
            _ => {}
        }

        if seg_len > max_allowed {
            return true;
        }
        if seg_len < min_allowed || seg_len <= f64::EPSILON * seg.cp_len.max(1.0) {
            return false;
        }
        if seg.edge_type > EdgeType::Curved {
            return false;
        }

        if Segment::new(&p0, &p1).distance_to_point(mid) > max_chord_dev {
            return true;
        }

        let unit = |v: &Option<Vector3>| v.and_then(|v| v.normalized());
        if let (Some(a), Some(b)) = (unit(&seg.tan_start), unit(&seg.tan_end)) {
            if a.dot(&b) < ts.cos_within_ang {
                return true;
            }
        }

        let ntol = 1e-9;
        seg.tseg.iter().flatten().any(|r| {
            let fm = &self.fmeshes[r.face];
            let normal = |gid: usize| {
                let local = fm.local_point(gid)?;
                let ni = *fm.nmap.get(&local)?;
                fm.normals.get(ni)?.normalized()
            };
            match (normal(seg.e_start), normal(seg.e_end)) {
                (Some(a), Some(b)) => a.dot(&b) < ts.cos_within_ang - ntol,
                _ => false,
            }
        })
    }

    /// Splits segment `id` at edge parameter `t` (the interval midpoint by
    /// default), updating the trim polygons of both bordering faces.
    /// Returns the two new segment ids, or nothing when no split happened.
    pub fn split_edge_seg(&mut self, id: usize, force: bool, t: Option<f64>, update_trees: bool) -> Vec<usize> {
        let brep = self.brep;
        let Some(seg) = self.segment(id).cloned() else {
            return Vec::new();
        };
        let [Some(r1), Some(r2)] = seg.tseg else {
            return Vec::new();
        };
        let Some(curve) = brep.edges[seg.edge].curve.as_deref() else {
            return Vec::new();
        };

        let emid = t.unwrap_or(0.5 * (seg.edge_start + seg.edge_end));
        if !(emid > seg.edge_start.min(seg.edge_end) && emid < seg.edge_start.max(seg.edge_end)) {
            return Vec::new();
        }
        let p = curve.point_at(emid);
        if !p.is_finite() {
            warn!(edge = seg.edge, t = emid, "curve evaluation failed");
            return Vec::new();
        }
        if !force && !self.tol_need_split(&seg, &p) {
            return Vec::new();
        }

        let s = (emid - seg.edge_start) / seg.span();
        let (Some(c1), Some(c2)) = (self.trim_cut(r1, s, &p, seg.cp_len), self.trim_cut(r2, s, &p, seg.cp_len)) else {
            warn!(edge = seg.edge, "segment is not linked to both faces");
            return Vec::new();
        };

        let gid = self.add_session_point(p);
        let halves = [c1, c2].map(|c| self.apply_trim_cut(c, CutPoint::Shared(gid), update_trees));
        let tan = curve.tangent_at(emid);

        let id1 = self.segs.len();
        let id2 = id1 + 1;
        let mut seg1 = BEdgeSeg {
            edge_end: emid,
            e_end: gid,
            tan_end: tan,
            tseg: [None, None],
            ..seg.clone()
        };
        let mut seg2 = BEdgeSeg {
            edge_start: emid,
            e_start: gid,
            tan_start: tan,
            tseg: [None, None],
            ..seg.clone()
        };
        for (k, (ne1, ne2)) in halves.into_iter().enumerate() {
            let reversed = self
                .poly_edge(ne1)
                .and_then(|e| e.trim)
                .is_some_and(|tr| brep.trims[tr.trim].reversed);
            let (a, b) = if reversed { (ne2, ne1) } else { (ne1, ne2) };
            seg1.tseg[k] = Some(a);
            seg2.tseg[k] = Some(b);
            self.set_edge_seg(a, id1);
            self.set_edge_seg(b, id2);
        }

        self.segs[id] = None;
        self.segs.push(Some(seg1));
        self.segs.push(Some(seg2));
        let set = &mut self.e2segs[seg.edge];
        set.remove(&id);
        set.insert(id1);
        set.insert(id2);
        trace!(edge = seg.edge, t = emid, "split edge segment");
        vec![id1, id2]
    }

    /// Splits a singular trim edge in 2D. Both halves map to the same 3D
    /// point.
    pub fn split_singular_seg(&mut self, r: PolyEdgeRef, update_trees: bool) -> Vec<PolyEdgeRef> {
        let Some(pe) = self.poly_edge(r) else {
            return Vec::new();
        };
        let Some(range) = pe.trim else {
            return Vec::new();
        };
        if pe.seg.is_some() {
            return Vec::new();
        }
        let Some(p3) = self
            .loop_polygon(r.face, r.li)
            .and_then(|p| p.owner_of(pe.v[0]))
            .and_then(|o| self.fmeshes[r.face].p2d3d.get(o).copied())
        else {
            return Vec::new();
        };
        let tmid = 0.5 * (range.start + range.end);
        let uv = self.brep.trims[range.trim].curve.point_at(tmid);
        let cut = TrimCut {
            r,
            v: pe.v,
            range,
            tmid,
            uv,
        };
        self.unsplit_singular.remove(&r);
        let (a, b) = self.apply_trim_cut(cut, CutPoint::Local(p3), update_trees);
        self.unsplit_singular.insert(a);
        self.unsplit_singular.insert(b);
        vec![a, b]
    }

    fn set_edge_seg(&mut self, r: PolyEdgeRef, id: usize) {
        if let Some(e) = self.loop_polygon_mut(r.face, r.li).and_then(|p| p.edge_mut(r.pe)) {
            e.seg = Some(id);
        }
    }

    /// Locates the trim parameter of the edge point `p`, which sits at
    /// fraction `s` of the segment.
    fn trim_cut(&self, r: PolyEdgeRef, s: f64, p: &Point3, cp_len: f64) -> Option<TrimCut> {
        let pe = self.poly_edge(r)?;
        let range = pe.trim?;
        let trim = self.brep.trims.get(range.trim)?;
        let surface = &*self.brep.faces.get(r.face)?.surface;

        let frac = if trim.reversed { 1.0 - s } else { s };
        let mut tmid = range.start + frac * (range.end - range.start);
        let mut uv = trim.curve.point_at(tmid);
        let guess = surface.point_at(uv[0], uv[1]);
        if guess.distance_to(p) > 1e-6 * cp_len.max(1.0) {
            if let Some(t) = curve_closest_param(&*trim.curve, surface, p, (range.start, range.end)) {
                tmid = t;
                uv = trim.curve.point_at(t);
            }
        }
        Some(TrimCut {
            r,
            v: pe.v,
            range,
            tmid,
            uv,
        })
    }

    /// Replaces the cut polygon edge with two halves meeting at a new 2D
    /// point.
    fn apply_trim_cut(&mut self, cut: TrimCut, point: CutPoint, update_trees: bool) -> (PolyEdgeRef, PolyEdgeRef) {
        let TrimCut { r, v, range, tmid, uv } = cut;
        let normal = self.face_normal(r.face, &uv);

        let fm = &mut self.fmeshes[r.face];
        let p3 = match point {
            CutPoint::Shared(gid) => {
                let local = fm.add_shared_point(gid, self.pnts[gid], normal);
                fm.ep.insert(local);
                local
            }
            CutPoint::Local(local) => local,
        };
        let p2 = fm.add_point_2d(uv, p3);

        let old_box = self.poly_box(r, true);
        let Some(poly) = self.loop_polygon_mut(r.face, r.li) else {
            return (r, r);
        };
        poly.remove_edge_id(r.pe);
        let lp = poly.add_point(uv, p2);
        let ne1 = poly.add_ordered_edge(v[0], lp);
        let ne2 = poly.add_ordered_edge(lp, v[1]);
        if let Some(e) = poly.edge_mut(ne1) {
            e.trim = Some(TrimRange { end: tmid, ..range });
        }
        if let Some(e) = poly.edge_mut(ne2) {
            e.trim = Some(TrimRange { start: tmid, ..range });
        }
        poly.uncontained.remove(&v[0]);
        poly.uncontained.remove(&v[1]);

        let a = PolyEdgeRef { pe: ne1, ..r };
        let b = PolyEdgeRef { pe: ne2, ..r };
        if update_trees {
            if let Some(bb) = old_box {
                self.face_trees[r.face].remove(&bb, &r);
            }
            for n in [a, b] {
                if let Some(bb) = self.poly_box(n, true) {
                    self.face_trees[r.face].insert(bb, n);
                }
            }
        }
        (a, b)
    }

    /// 2D box of a polygon edge.
    pub(crate) fn poly_box(&self, r: PolyEdgeRef, padded: bool) -> Option<Aabb<2>> {
        let poly = self.loop_polygon(r.face, r.li)?;
        let pe = poly.edge(r.pe)?;
        Some(edge_box(&poly.pnts_2d[pe.v[0]], &poly.pnts_2d[pe.v[1]], padded))
    }

    /// 2D length of a polygon edge.
    pub(crate) fn poly_edge_len(&self, r: PolyEdgeRef) -> Option<f64> {
        let poly = self.loop_polygon(r.face, r.li)?;
        let pe = poly.edge(r.pe)?;
        Some(poly.pnts_2d[pe.v[0]].distance_to(&poly.pnts_2d[pe.v[1]]))
    }
}
