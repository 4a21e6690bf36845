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

//! Debug snapshots of a face mesh.
//!
//! A snapshot stores just enough to replay a repair offline: points,
//! normals, the active triangles with their handles, the orientation flag
//! and the singular and B-rep point sets. It is not an interchange format.

use std::{
    fmt::Write as _,
    fs,
    io,
    path::Path,
    str::{FromStr, Lines},
};

use crate::{
    error::{CdtError, CdtResult},
    geometry::{Point3, Vector3},
    mesh::{core::CdtMesh, types::UEdge},
};

const VERSION: &str = "V2";

impl CdtMesh {
    /// Writes the snapshot text.
    pub fn serialize(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = self.write_snapshot(&mut out);
        out
    }

    fn write_snapshot(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "{VERSION}")?;

        writeln!(out, "POINTS {}", self.pnts.len())?;
        for p in &self.pnts {
            writeln!(out, "{:?} {:?} {:?}", p[0], p[1], p[2])?;
        }
        writeln!(out, "NORMALS {}", self.normals.len())?;
        for n in &self.normals {
            writeln!(out, "{:?} {:?} {:?}", n[0], n[1], n[2])?;
        }

        let mut nmap: Vec<(usize, usize)> = self.nmap.iter().map(|(&p, &n)| (p, n)).collect();
        nmap.sort_unstable();
        writeln!(out, "NORMALMAP {}", nmap.len())?;
        for (p, n) in nmap {
            writeln!(out, "{p} {n}")?;
        }

        writeln!(out, "TRIANGLES {}", self.tri_count())?;
        for t in self.tris() {
            writeln!(out, "{} {} {} {}", t.v[0], t.v[1], t.v[2], t.ind)?;
        }

        writeln!(out, "REVERSED {}", u8::from(self.reversed))?;
        writeln!(out, "FACE_ID {}", self.f_id)?;

        writeln!(out, "SINGULARITIES {}", self.sv.len())?;
        for v in &self.sv {
            writeln!(out, "{v}")?;
        }
        writeln!(out, "BREP_EDGE_POINTS {}", self.ep.len())?;
        for v in &self.ep {
            writeln!(out, "{v}")?;
        }
        writeln!(out, "BREP_EDGES {}", self.brep_edges.len())?;
        for ue in &self.brep_edges {
            writeln!(out, "{} {}", ue.v[0], ue.v[1])?;
        }
        Ok(())
    }

    /// Rebuilds a mesh from snapshot text. Triangle handles are preserved;
    /// adjacency and the spatial index are rebuilt.
    pub fn deserialize(text: &str) -> CdtResult<CdtMesh> {
        let mut r = Reader::new(text);
        let tag = r.line()?;
        if tag.trim() != VERSION {
            return Err(r.error(format!("unsupported snapshot version {:?}", tag.trim())));
        }

        let mut m = CdtMesh::default();

        for _ in 0..r.section("POINTS")? {
            let [x, y, z] = r.values::<f64, 3>()?;
            m.add_point(Point3::new([x, y, z]));
        }
        for _ in 0..r.section("NORMALS")? {
            let [x, y, z] = r.values::<f64, 3>()?;
            m.add_normal(Vector3::new([x, y, z]));
        }
        for _ in 0..r.section("NORMALMAP")? {
            let [p, n] = r.values::<usize, 2>()?;
            if p >= m.pnts.len() || n >= m.normals.len() {
                return Err(r.error(format!("normal map entry {p} -> {n} out of range")));
            }
            m.set_normal(p, n);
        }

        let mut tris = Vec::new();
        for _ in 0..r.section("TRIANGLES")? {
            tris.push(r.values::<usize, 4>()?);
        }

        m.reversed = r.section("REVERSED")? != 0;
        m.f_id = r.section("FACE_ID")?;

        for _ in 0..r.section("SINGULARITIES")? {
            let [v] = r.values::<usize, 1>()?;
            m.sv.insert(v);
        }
        m.has_singularities = !m.sv.is_empty();
        for _ in 0..r.section("BREP_EDGE_POINTS")? {
            let [v] = r.values::<usize, 1>()?;
            m.ep.insert(v);
        }
        for _ in 0..r.section("BREP_EDGES")? {
            let [a, b] = r.values::<usize, 2>()?;
            m.brep_edges.insert(UEdge::new(a, b));
        }

        tris.sort_unstable_by_key(|t| t[3]);
        for [a, b, c, ind] in tris {
            if !m.restore_tri([a, b, c], ind) {
                return Err(CdtError::Parse {
                    line: 0,
                    message: format!("triangle {ind} ({a} {b} {c}) cannot be restored"),
                });
            }
        }
        Ok(m)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        fs::write(path, self.serialize())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> CdtResult<CdtMesh> {
        let text = fs::read_to_string(path).map_err(|e| CdtError::Parse {
            line: 0,
            message: e.to_string(),
        })?;
        CdtMesh::deserialize(&text)
    }
}

struct Reader<'a> {
    lines: Lines<'a>,
    line_no: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Reader {
            lines: text.lines(),
            line_no: 0,
        }
    }

    fn error(&self, message: String) -> CdtError {
        CdtError::Parse {
            line: self.line_no,
            message,
        }
    }

    /// Next non-blank line.
    fn line(&mut self) -> CdtResult<&'a str> {
        loop {
            self.line_no += 1;
            match self.lines.next() {
                Some(l) if l.trim().is_empty() => continue,
                Some(l) => return Ok(l),
                None => return Err(self.error("unexpected end of snapshot".into())),
            }
        }
    }

    /// Reads a `KEY value` header line.
    fn section(&mut self, key: &str) -> CdtResult<usize> {
        let l = self.line()?;
        let mut parts = l.split_whitespace();
        if parts.next() != Some(key) {
            return Err(self.error(format!("expected {key}")));
        }
        let count = parts
            .next()
            .ok_or_else(|| self.error(format!("{key} without a value")))?;
        count
            .parse()
            .map_err(|_| self.error(format!("bad {key} value {count:?}")))
    }

    fn values<T: FromStr + Copy + Default, const K: usize>(&mut self) -> CdtResult<[T; K]> {
        let l = self.line()?;
        let mut out = [T::default(); K];
        let mut parts = l.split_whitespace();
        for slot in out.iter_mut() {
            let tok = parts
                .next()
                .ok_or_else(|| self.error(format!("expected {K} values")))?;
            *slot = tok
                .parse()
                .map_err(|_| self.error(format!("bad value {tok:?}")))?;
        }
        if parts.next().is_some() {
            return Err(self.error(format!("expected {K} values")));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_snapshot_reports_line() {
        let err = CdtMesh::deserialize("V2\nPOINTS 2\n0 0 0\n").unwrap_err();
        assert!(matches!(err, CdtError::Parse { line: 4, .. }), "{err:?}");
    }

    #[test]
    fn wrong_version_is_rejected() {
        let err = CdtMesh::deserialize("V1\n").unwrap_err();
        assert!(matches!(err, CdtError::Parse { line: 1, .. }));
    }
}
