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

use tracing::{debug, info_span};

use super::{EdgeType, PolyEdgeRef};
use crate::{
    cdt::CdtSession,
    error::{CdtError, CdtResult},
    geometry::AabbTree,
    kernel::predicates::near_equal,
};

/// Middle value; the mean of the two middle values for an even count.
pub(crate) fn median(mut v: Vec<f64>) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    v.sort_by(f64::total_cmp);
    let n = v.len();
    Some(if n % 2 == 1 {
        v[n / 2]
    } else {
        0.5 * (v[n / 2 - 1] + v[n / 2])
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Proximity {
    Recheck,
    Split,
}

/// Result of one proximity refinement round on a face.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CloseEdgeRound {
    /// Segments split this round.
    pub splits: usize,
    /// Worklist for the next round.
    pub next: Vec<PolyEdgeRef>,
}

impl CdtSession<'_> {
    /// Mandatory splits: closed edges are cut once, curved edges get two
    /// more levels so every curve has at least a few segments.
    pub fn initialize_edge_segs(&mut self) -> CdtResult<()> {
        let brep = self.brep;
        for edge in 0..brep.edges.len() {
            let Some(&first) = self.e2segs[edge].first() else {
                continue;
            };
            let bedge = &brep.edges[edge];
            let closed = bedge.vertices[0] == bedge.vertices[1]
                || bedge.trims.iter().any(|&t| brep.trims[t].curve.is_closed());

            let mut level = vec![first];
            if closed {
                level = self.split_edge_seg(first, true, None, true);
                if level.is_empty() {
                    return Err(CdtError::ForcedSplit { edge });
                }
            }
            if self.edge_types[edge] == EdgeType::Curved {
                for _ in 0..2 {
                    let mut next = Vec::with_capacity(level.len() * 2);
                    for s in level {
                        let halves = self.split_edge_seg(s, true, None, true);
                        if halves.is_empty() {
                            return Err(CdtError::ForcedSplit { edge });
                        }
                        next.extend(halves);
                    }
                    level = next;
                }
            }
        }
        Ok(())
    }

    fn edges_of_type(&self, pred: impl Fn(EdgeType) -> bool) -> Vec<usize> {
        (0..self.edge_types.len())
            .filter(|&e| pred(self.edge_types[e]))
            .collect()
    }

    /// Splits every segment of `edge` until it meets its tolerances.
    fn tol_split_edge(&mut self, edge: usize) {
        let mut ws: Vec<usize> = self.e2segs[edge].iter().copied().collect();
        while let Some(s) = ws.pop() {
            ws.extend(self.split_edge_seg(s, false, None, false));
        }
    }

    pub fn tol_curved_edges_split(&mut self) {
        let _span = info_span!("tol_curved_edges_split").entered();
        for edge in self.edges_of_type(|t| t == EdgeType::Curved) {
            self.tol_split_edge(edge);
        }
    }

    pub fn tol_linear_edges_split(&mut self) {
        let _span = info_span!("tol_linear_edges_split").entered();
        self.update_vert_edge_seg_lengths();
        self.update_loop_median_edge_seg_lengths();
        for edge in self.edges_of_type(|t| t > EdgeType::Curved) {
            self.tol_split_edge(edge);
        }
    }

    fn edge_seg_lens(&self, edge: usize) -> Vec<f64> {
        self.segments(edge).map(|(_, s)| self.seg_len(s)).collect()
    }

    pub fn edge_median_seg_len(&self, edge: usize) -> Option<f64> {
        median(self.edge_seg_lens(edge))
    }

    /// Shortest curved segment at each vertex.
    pub(crate) fn update_vert_edge_seg_lengths(&mut self) {
        let brep = self.brep;
        self.v_min_seg_len.clear();
        for (v, &gid) in self.vert_pnts.iter().enumerate() {
            let m = brep
                .vertex_edges(v)
                .filter(|&e| self.edge_types[e] == EdgeType::Curved)
                .flat_map(|e| self.edge_seg_lens(e))
                .reduce(f64::min);
            if let Some(m) = m {
                self.v_min_seg_len.insert(gid, m);
            }
        }
    }

    /// Median curved segment length of each loop.
    pub(crate) fn update_loop_median_edge_seg_lengths(&mut self) {
        let brep = self.brep;
        let mut per_loop = vec![Vec::new(); brep.loops.len()];
        for edge in self.edges_of_type(|t| t == EdgeType::Curved) {
            for (_, seg) in self.segments(edge) {
                let len = self.seg_len(seg);
                for r in seg.tseg.iter().flatten() {
                    if let Some(&bl) = brep.faces[r.face].loops.get(r.li) {
                        per_loop[bl].push(len);
                    }
                }
            }
        }
        self.l_median_len = per_loop.into_iter().map(median).collect();
    }

    pub(crate) fn loop_median_len(&self, face: usize, li: usize) -> Option<f64> {
        let bl = *self.brep.faces.get(face)?.loops.get(li)?;
        self.l_median_len.get(bl).copied().flatten()
    }

    /// Evens out curved edges meeting at a vertex: segments longer than
    /// twice a finer neighbour's median are force-split.
    pub fn curved_edges_refine(&mut self) {
        let _span = info_span!("curved_edges_refine").entered();
        let brep = self.brep;
        let curved = self.edges_of_type(|t| t == EdgeType::Curved);
        let medians: BTreeMap<usize, f64> = curved
            .iter()
            .filter_map(|&e| Some((e, self.edge_median_seg_len(e)?)))
            .collect();

        let mut targets = Vec::new();
        for (&edge, &lmed) in &medians {
            let target = brep.edges[edge]
                .vertices
                .iter()
                .flat_map(|&v| brep.vertex_edges(v))
                .filter(|&e2| e2 != edge)
                .filter_map(|e2| medians.get(&e2).copied())
                .filter(|&m| m < lmed)
                .map(|m| 2.0 * m)
                .reduce(f64::min);
            if let Some(t) = target {
                targets.push((edge, t));
            }
        }

        for (edge, target) in targets {
            let mut ws: Vec<usize> = self.e2segs[edge].iter().copied().collect();
            while let Some(s) = ws.pop() {
                let long = self.segment(s).is_some_and(|seg| self.seg_len(seg) > target);
                if long {
                    ws.extend(self.split_edge_seg(s, true, None, false));
                }
            }
        }
        self.update_vert_edge_seg_lengths();
        self.update_loop_median_edge_seg_lengths();
    }

    /// Rebuilds the 2D index of a face's trim edges.
    pub fn rebuild_face_tree(&mut self, face: usize, padded: bool) {
        let items = self
            .face_trim_edges(face)
            .into_iter()
            .filter_map(|r| Some((self.poly_box(r, padded)?, r)))
            .collect();
        if let Some(tree) = self.face_trees.get_mut(face) {
            *tree = AabbTree::build(items);
        }
    }

    /// Splits trim edges whose 2D boxes overlap a non-adjacent edge of the
    /// same face, so nearby boundaries do not produce slivers.
    pub fn refine_close_edges(&mut self) {
        let _span = info_span!("refine_close_edges").entered();
        for face in 0..self.fmeshes.len() {
            self.rebuild_face_tree(face, true);
            let mut ws = self.face_trim_edges(face);
            for round in 0..self.settings.max_close_edge_iterations {
                if ws.is_empty() {
                    break;
                }
                let CloseEdgeRound { splits, next } = self.close_edges_round(face, &ws);
                debug!(face, round, splits, "close edge round");
                if splits == 0 {
                    break;
                }
                ws = next;
            }
        }
    }

    /// One proximity round over `ws`. Expects the face index to hold padded
    /// boxes of the current trim edges.
    pub fn close_edges_round(&mut self, face: usize, ws: &[PolyEdgeRef]) -> CloseEdgeRound {
        let mut status: BTreeMap<PolyEdgeRef, Proximity> = BTreeMap::new();
        for &r in ws {
            let (Some(pe), Some(len), Some(bb)) = (self.poly_edge(r), self.poly_edge_len(r), self.poly_box(r, true)) else {
                continue;
            };
            let neighbour = |o: &PolyEdgeRef| o.li == r.li && (Some(o.pe) == pe.prev || Some(o.pe) == pe.next);
            let mut st = None;
            self.face_trees[face].search(&bb, |o| {
                if *o == r || neighbour(o) {
                    return true;
                }
                let Some(olen) = self.poly_edge_len(*o) else {
                    return true;
                };
                let shorter = if near_equal(len, olen, 1e-9 * len.max(olen)) {
                    *o < r
                } else {
                    len < olen
                };
                if shorter {
                    st = Some(Proximity::Recheck);
                    true
                } else {
                    st = Some(Proximity::Split);
                    false
                }
            });
            if let Some(st) = st {
                status.insert(r, st);
            }
        }

        let mut out = CloseEdgeRound::default();
        let mut pending: BTreeSet<PolyEdgeRef> = ws.iter().copied().collect();
        while let Some(r) = pending.pop_first() {
            let Some(pe) = self.poly_edge(r) else {
                continue;
            };
            let Some(seg) = pe.seg.and_then(|sid| Some((sid, self.segment(sid)?))) else {
                match status.get(&r) {
                    Some(Proximity::Split) => {
                        let halves = self.split_singular_seg(r, true);
                        if halves.is_empty() {
                            out.next.push(r);
                        } else {
                            out.splits += 1;
                            out.next.extend(halves);
                        }
                    }
                    Some(Proximity::Recheck) => out.next.push(r),
                    None => {}
                }
                continue;
            };
            let (sid, seg) = seg;
            let local: Vec<PolyEdgeRef> = seg.tseg.iter().flatten().filter(|t| t.face == face).copied().collect();
            for t in seg.tseg.iter().flatten() {
                pending.remove(t);
            }
            match local.iter().filter_map(|t| status.get(t)).max() {
                Some(Proximity::Split) => {
                    let halves = self.split_edge_seg(sid, true, None, true);
                    if halves.is_empty() {
                        out.next.extend(local);
                        continue;
                    }
                    out.splits += 1;
                    for h in halves {
                        if let Some(s) = self.segment(h) {
                            out.next.extend(s.tseg.iter().flatten().filter(|t| t.face == face));
                        }
                    }
                }
                Some(Proximity::Recheck) => out.next.extend(local),
                None => {}
            }
        }
        out
    }

    /// Replaces the refinement indices with tight boxes of the final trim
    /// edges.
    pub fn finalize_rtrees(&mut self) {
        for face in 0..self.fmeshes.len() {
            self.rebuild_face_tree(face, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_odd_and_even_counts() {
        assert_eq!(median(vec![3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(Vec::new()), None);
    }
}
