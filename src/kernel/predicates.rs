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

use num_traits::Float;

use crate::geometry::point::Point;
use crate::geometry::segment::Segment;
use crate::geometry::Point2;

/// `|a - b| <= tol`, also true for two equal infinities.
#[inline]
pub fn near_equal<T: Float>(a: T, b: T, tol: T) -> bool {
    a == b || (a - b).abs() <= tol
}

#[inline]
pub fn near_zero<T: Float>(a: T, tol: T) -> bool {
    a.abs() <= tol
}

/// Tolerance scaled to the magnitude of the operands.
#[inline]
pub fn near_equal_rel<T: Float>(a: T, b: T) -> bool {
    let scale = T::one().max(a.abs()).max(b.abs());
    near_equal(a, b, T::epsilon() * T::from(16.0).unwrap_or_else(T::one) * scale)
}

pub fn are_equal<const N: usize>(p1: &Point<N>, p2: &Point<N>, eps: f64) -> bool {
    for i in 0..N {
        if (p1.coords[i] - p2.coords[i]).abs() >= eps {
            return false;
        }
    }
    true
}

pub fn are_collinear<const N: usize>(a: &Point<N>, b: &Point<N>, c: &Point<N>, eps: f64) -> bool {
    for i in 0..N {
        let ui = b.coords[i] - a.coords[i];
        let vi = c.coords[i] - a.coords[i];

        if ui.abs() > eps {
            // first non-zero component gives the scale factor
            let r = vi / ui;
            for j in (i + 1)..N {
                let uj = b.coords[j] - a.coords[j];
                let vj = c.coords[j] - a.coords[j];
                if (vj - uj * r).abs() > eps {
                    return false;
                }
            }
            return true;
        } else if vi.abs() > eps {
            return false;
        }
    }
    // A and B coincide; collinear iff C coincides too
    true
}

pub fn is_point_on_segment<const N: usize>(p: &Point<N>, seg: &Segment<N>, eps: f64) -> bool {
    if !are_collinear(p, &seg.a, &seg.b, eps) {
        return false;
    }
    for i in 0..N {
        let (lo, hi) = if seg.a[i] < seg.b[i] {
            (seg.a[i], seg.b[i])
        } else {
            (seg.b[i], seg.a[i])
        };
        if p[i] < lo - eps || p[i] > hi + eps {
            return false;
        }
    }
    true
}

/// Twice the signed area of `abc`; positive when counter-clockwise.
#[inline]
pub fn orient2d(a: &Point2, b: &Point2, c: &Point2) -> f64 {
    (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])
}

/// Positive when `d` lies inside the circumcircle of the CCW triangle `abc`.
pub fn incircle(a: &Point2, b: &Point2, c: &Point2, d: &Point2) -> f64 {
    let adx = a[0] - d[0];
    let ady = a[1] - d[1];
    let bdx = b[0] - d[0];
    let bdy = b[1] - d[1];
    let cdx = c[0] - d[0];
    let cdy = c[1] - d[1];

    let ad = adx * adx + ady * ady;
    let bd = bdx * bdx + bdy * bdy;
    let cd = cdx * cdx + cdy * cdy;

    adx * (bdy * cd - bd * cdy) - ady * (bdx * cd - bd * cdx) + ad * (bdx * cdy - bdy * cdx)
}

pub fn centroid2(a: &Point2, b: &Point2, c: &Point2) -> Point2 {
    Point2::new([(a[0] + b[0] + c[0]) / 3.0, (a[1] + b[1] + c[1]) / 3.0])
}

/// Even-odd ray crossing test against a closed ring (last point connects
/// back to the first).
pub fn point_in_polygon(p: &Point2, ring: &[Point2]) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (pi, pj) = (&ring[i], &ring[j]);
        if (pi[1] > p[1]) != (pj[1] > p[1]) {
            let x = (pj[0] - pi[0]) * (p[1] - pi[1]) / (pj[1] - pi[1]) + pi[0];
            if p[0] < x {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// True when the two segments cross at a point interior to both.
///
/// Parameters within `eps` of either end do not count, so segments that only
/// share an endpoint are not reported.
pub fn segments_intersect_interior(s1: &Segment<2>, s2: &Segment<2>, eps: f64) -> bool {
    match s1.line_intersection_params(s2) {
        Some((s, t)) => s > eps && s < 1.0 - eps && t > eps && t < 1.0 - eps,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new([x, y])
    }

    #[test]
    fn orientation_and_incircle_signs() {
        let (a, b, c) = (p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0));
        assert!(orient2d(&a, &b, &c) > 0.0);
        assert!(orient2d(&a, &c, &b) < 0.0);
        assert!(incircle(&a, &b, &c, &p(0.4, 0.4)) > 0.0);
        assert!(incircle(&a, &b, &c, &p(2.0, 2.0)) < 0.0);
    }

    #[test]
    fn even_odd_on_concave_ring() {
        let ring = [p(0.0, 0.0), p(4.0, 0.0), p(4.0, 4.0), p(2.0, 1.0), p(0.0, 4.0)];
        assert!(point_in_polygon(&p(1.0, 0.5), &ring));
        assert!(!point_in_polygon(&p(2.0, 3.0), &ring));
        assert!(!point_in_polygon(&p(5.0, 1.0), &ring));
    }

    #[test]
    fn shared_endpoint_is_not_a_crossing() {
        let s1 = Segment::new(&p(0.0, 0.0), &p(1.0, 1.0));
        let s2 = Segment::new(&p(1.0, 1.0), &p(2.0, 0.0));
        let s3 = Segment::new(&p(0.0, 1.0), &p(1.0, 0.0));
        assert!(!segments_intersect_interior(&s1, &s2, 1e-9));
        assert!(segments_intersect_interior(&s1, &s3, 1e-9));
    }

    #[test]
    fn float_tolerances() {
        assert!(near_equal(1.0f64, 1.0 + 1e-10, 1e-9));
        assert!(!near_equal(1.0f32, 1.1, 1e-3));
        assert!(near_zero(-1e-12f64, 1e-9));
        assert!(near_equal_rel(1e6f64, 1e6 + 1e-10));
    }
}
