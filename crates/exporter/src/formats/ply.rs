//! Stanford PLY (ASCII)

use std::io::{self, Write};

use crate::normalize::NormalizedMesh;

/// Header, one `x y z` line per vertex, one `3 i j k` line per face (0-based)
///
/// Normals are not written.
pub fn write_ply<W: Write>(mesh: &NormalizedMesh<'_>, out: &mut W) -> io::Result<()> {
    writeln!(out, "ply")?;
    writeln!(out, "format ascii 1.0")?;
    writeln!(out, "element vertex {}", mesh.vertices.len())?;
    writeln!(out, "property float x")?;
    writeln!(out, "property float y")?;
    writeln!(out, "property float z")?;
    writeln!(out, "element face {}", mesh.triangle_count())?;
    writeln!(out, "property list uchar int vertex_index")?;
    writeln!(out, "end_header")?;

    for v in &mesh.vertices {
        writeln!(out, "{} {} {}", v.x, v.y, v.z)?;
    }
    for [a, b, c] in mesh.triangles() {
        writeln!(out, "3 {a} {b} {c}")?;
    }
    Ok(())
}
