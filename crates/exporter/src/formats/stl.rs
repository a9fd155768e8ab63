//! Binary STL

use std::io::{self, Write};

use nalgebra::{Point3, Vector3};

use crate::normalize::NormalizedMesh;

/// Fixed header length
pub const STL_HEADER_LEN: usize = 80;

const HEADER_TEXT: &[u8] = b"binary STL exported by depth-fusion";

/// 80-byte header, u32 LE triangle count, then 50 bytes per triangle
///
/// Each triangle carries the normal of its first vertex.
pub fn write_stl<W: Write>(mesh: &NormalizedMesh<'_>, out: &mut W) -> io::Result<()> {
    let mut header = [0u8; STL_HEADER_LEN];
    header[..HEADER_TEXT.len()].copy_from_slice(HEADER_TEXT);
    out.write_all(&header)?;

    let count = u32::try_from(mesh.triangle_count())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many triangles for STL"))?;
    out.write_all(&count.to_le_bytes())?;

    for [a, b, c] in mesh.triangles() {
        write_vector(out, &mesh.normals[a])?;
        for i in [a, b, c] {
            write_point(out, &mesh.vertices[i])?;
        }
        out.write_all(&0u16.to_le_bytes())?;
    }
    Ok(())
}

fn write_vector<W: Write>(out: &mut W, v: &Vector3<f32>) -> io::Result<()> {
    for component in [v.x, v.y, v.z] {
        out.write_all(&component.to_le_bytes())?;
    }
    Ok(())
}

fn write_point<W: Write>(out: &mut W, p: &Point3<f32>) -> io::Result<()> {
    write_vector(out, &p.coords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::single_triangle;
    use crate::normalize::{normalize, CenteringMode};

    fn f32_at(bytes: &[u8], offset: usize) -> f32 {
        f32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    #[test]
    fn test_single_triangle_is_134_bytes() {
        let mesh = single_triangle();
        let normalized = normalize(&mesh, CenteringMode::Horizontal).unwrap();
        let mut out = Vec::new();
        write_stl(&normalized, &mut out).unwrap();

        assert_eq!(out.len(), 134);
        assert_eq!(&out[..HEADER_TEXT.len()], HEADER_TEXT);
        assert_eq!(u32::from_le_bytes(out[80..84].try_into().unwrap()), 1);

        // normal, then first vertex
        assert_eq!(f32_at(&out, 84 + 8), 1.0);
        assert_eq!(f32_at(&out, 96), -1.0);
        assert_eq!(f32_at(&out, 96 + 4), -0.5);
        assert_eq!(f32_at(&out, 96 + 8), 2.0);
        assert_eq!(&out[132..134], &[0, 0]);
    }
}
