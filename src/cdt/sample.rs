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

use std::collections::BTreeMap;

use super::CdtSession;
use crate::{
    brep::Surface,
    edge::{PolyEdgeRef, median},
    geometry::{Aabb, Point2, Segment},
};

/// Subdivision depth limit for parameter-space sampling.
const MAX_SAMPLE_DEPTH: usize = 12;

/// Axis along which a parameter cell must still be halved, if any. Lengths
/// are two-piece chords through the cell middle so cells spanning a full
/// period are not mistaken for points.
fn split_axis(surface: &dyn Surface, lo: &Point2, hi: &Point2, max_len: f64, cos_ang: f64, planar: bool) -> Option<usize> {
    let at = |u: f64, v: f64| surface.point_at(u, v);
    let chord = |a: (f64, f64), b: (f64, f64)| {
        let (pa, pb) = (at(a.0, a.1), at(b.0, b.1));
        let pm = at(0.5 * (a.0 + b.0), 0.5 * (a.1 + b.1));
        pa.distance_to(&pm) + pm.distance_to(&pb)
    };
    let (u0, v0, u1, v1) = (lo[0], lo[1], hi[0], hi[1]);
    let u_len = chord((u0, v0), (u1, v0)).max(chord((u0, v1), (u1, v1)));
    let v_len = chord((u0, v0), (u0, v1)).max(chord((u1, v0), (u1, v1)));
    let axis = if u_len >= v_len { 0 } else { 1 };

    let diag = chord((u0, v0), (u1, v1)).max(chord((u1, v0), (u0, v1)));
    if diag > max_len {
        return Some(axis);
    }
    if planar {
        return None;
    }
    let mid = lo.midpoint(hi);
    let nc = surface.normal_at(mid[0], mid[1]).and_then(|n| n.normalized())?;
    [(u0, v0), (u1, v0), (u0, v1), (u1, v1)]
        .into_iter()
        .filter_map(|(u, v)| surface.normal_at(u, v).and_then(|n| n.normalized()))
        .any(|n| n.dot(&nc) < cos_ang)
        .then_some(axis)
}

impl CdtSession<'_> {
    /// Adds Steiner points inside `face` so curved faces are not spanned by
    /// a few long triangles. Returns how many points were added.
    pub fn sample_interior(&mut self, face: usize) -> usize {
        let brep = self.brep;
        let Some(bface) = brep.faces.get(face) else {
            return 0;
        };
        let surface = &*bface.surface;
        let planar = surface.planar().is_some();
        let absmax = self.tol.absmax;
        if planar && absmax <= 0.0 {
            return 0;
        }
        let Some(fm) = self.fmeshes.get(face) else {
            return 0;
        };
        let outer = &fm.outer_loop;
        let Some(bb) = Aabb::around(outer.pnts_2d.iter()) else {
            return 0;
        };

        let loop_lens = outer
            .edges()
            .filter_map(|(_, e)| {
                let a = fm.p2d3d[outer.owner_of(e.v[0])?];
                let b = fm.p2d3d[outer.owner_of(e.v[1])?];
                Some(fm.pnts[a].distance_to(&fm.pnts[b]))
            })
            .filter(|&l| l > 0.0)
            .collect();
        let max_len = match median(loop_lens) {
            Some(m) if !planar && absmax > 0.0 => absmax.min(m),
            Some(m) if !planar => m,
            _ => absmax,
        };
        if max_len <= 0.0 {
            return 0;
        }
        let cos_ang = self.tol.digest(max_len).cos_within_ang;

        // Leaf corners keyed by their exact bits, with the smallest
        // touching cell size.
        let mut corners: BTreeMap<(u64, u64), (Point2, f64)> = BTreeMap::new();
        let mut cells = vec![(*bb.min(), *bb.max(), 0)];
        while let Some((lo, hi, depth)) = cells.pop() {
            let axis = (depth < MAX_SAMPLE_DEPTH)
                .then(|| split_axis(surface, &lo, &hi, max_len, cos_ang, planar))
                .flatten();
            if let Some(a) = axis {
                let m = 0.5 * (lo[a] + hi[a]);
                let (mut lo2, mut hi1) = (lo, hi);
                lo2.coords[a] = m;
                hi1.coords[a] = m;
                cells.push((lo, hi1, depth + 1));
                cells.push((lo2, hi, depth + 1));
                continue;
            }
            let size = (hi[0] - lo[0]).min(hi[1] - lo[1]);
            for c in [lo, Point2::new([hi[0], lo[1]]), Point2::new([lo[0], hi[1]]), hi] {
                let e = corners
                    .entry((c[0].to_bits(), c[1].to_bits()))
                    .or_insert((c, size));
                e.1 = e.1.min(size);
            }
        }

        let tree = &self.face_trees[face];
        let edge_dist = |r: &PolyEdgeRef, p: &Point2| {
            let poly = self.loop_polygon(r.face, r.li)?;
            let e = poly.edge(r.pe)?;
            Some(Segment::new(&poly.pnts_2d[e.v[0]], &poly.pnts_2d[e.v[1]]).distance_to_point(p))
        };
        let keep: Vec<Point2> = corners
            .into_values()
            .filter(|(p, _)| outer.contains_point(p))
            .filter(|(p, _)| !fm.inner_loops.values().any(|h| h.contains_point(p)))
            .filter(|(p, size)| {
                let d = 0.3 * size;
                let mut near = false;
                tree.search(&Aabb::from_point(p).expanded(d), |r| {
                    near = edge_dist(r, p).is_some_and(|dist| dist <= d);
                    !near
                });
                !near
            })
            .map(|(p, _)| p)
            .collect();

        let added = keep.len();
        for uv in keep {
            let p3 = surface.point_at(uv[0], uv[1]);
            let normal = self.face_normal(face, &uv);
            let fm = &mut self.fmeshes[face];
            let local = fm.add_point(p3);
            match normal {
                Some(n) => {
                    let ni = fm.add_normal(n);
                    fm.set_normal(local, ni);
                }
                None => {
                    fm.sv.insert(local);
                }
            }
            let p2 = fm.add_point_2d(uv, local);
            fm.interior_pnts.insert(p2);
        }
        added
    }
}
