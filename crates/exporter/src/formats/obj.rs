//! Wavefront OBJ (ASCII)

use std::io::{self, Write};

use crate::normalize::NormalizedMesh;

/// All `v` lines, then all `vn` lines, then `f` lines with 1-based `v//vn` pairs
pub fn write_obj<W: Write>(mesh: &NormalizedMesh<'_>, out: &mut W) -> io::Result<()> {
    for v in &mesh.vertices {
        writeln!(out, "v {} {} {}", v.x, v.y, v.z)?;
    }
    for n in &mesh.normals {
        writeln!(out, "vn {} {} {}", n.x, n.y, n.z)?;
    }
    for [a, b, c] in mesh.triangles() {
        let (a, b, c) = (a + 1, b + 1, c + 1);
        writeln!(out, "f {a}//{a} {b}//{b} {c}//{c}")?;
    }
    Ok(())
}
