//! Mesh serializers
//!
//! One writer per format, all consuming the same normalized mesh. Text
//! formats use `Display` for floats, which always emits `.` as the decimal
//! separator.

mod obj;
mod ply;
mod stl;

use std::io::{self, Write};

use contracts::MeshFormat;

use crate::normalize::NormalizedMesh;

pub use self::obj::write_obj;
pub use self::ply::write_ply;
pub use self::stl::{write_stl, STL_HEADER_LEN};

/// Serialize `mesh` in `format`
pub fn write_mesh<W: Write>(format: MeshFormat, mesh: &NormalizedMesh<'_>, out: &mut W) -> io::Result<()> {
    match format {
        MeshFormat::Obj => write_obj(mesh, out),
        MeshFormat::Ply => write_ply(mesh, out),
        MeshFormat::Stl => write_stl(mesh, out),
    }
}

/// Serialize into a fresh buffer
pub fn encode(format: MeshFormat, mesh: &NormalizedMesh<'_>) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(estimated_size(format, mesh));
    write_mesh(format, mesh, &mut buffer)?;
    Ok(buffer)
}

fn estimated_size(format: MeshFormat, mesh: &NormalizedMesh<'_>) -> usize {
    match format {
        MeshFormat::Stl => STL_HEADER_LEN + 4 + mesh.triangle_count() * 50,
        MeshFormat::Obj => mesh.vertices.len() * 64 + mesh.triangle_count() * 32,
        MeshFormat::Ply => 256 + mesh.vertices.len() * 32 + mesh.triangle_count() * 24,
    }
}
