//! Centering and axis conversion
//!
//! Output space flips Y and Z relative to the sensor space. The mesh is
//! centred on its bounding box in X and Z, and in Y only when requested.

use contracts::{ContractError, MeshSnapshot};
use nalgebra::{Point3, Vector3};

/// Which axes are centred before export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CenteringMode {
    /// X and Z; vertical placement is kept
    #[default]
    Horizontal,
    /// X, Y and Z
    All,
}

impl CenteringMode {
    pub fn from_center_vertical(center_vertical: bool) -> Self {
        if center_vertical {
            Self::All
        } else {
            Self::Horizontal
        }
    }
}

/// Validated mesh in output coordinates
#[derive(Debug, Clone)]
pub struct NormalizedMesh<'a> {
    pub vertices: Vec<Point3<f32>>,
    pub normals: Vec<Vector3<f32>>,
    pub triangle_indices: &'a [u32],
    /// Offset subtracted from every vertex, in sensor space
    pub center: Point3<f32>,
}

impl NormalizedMesh<'_> {
    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.len() / 3
    }

    /// Vertex indices of every triangle
    pub fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.triangle_indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
    }
}

/// Negate without producing `-0`
fn flip(v: f32) -> f32 {
    0.0 - v
}

/// Validate `mesh` and convert it to output coordinates
///
/// # Errors
/// `InvalidMesh` when the snapshot fails validation.
pub fn normalize(
    mesh: &MeshSnapshot,
    mode: CenteringMode,
) -> Result<NormalizedMesh<'_>, ContractError> {
    mesh.validate()?;

    let center = match mesh.bounds() {
        Some(bounds) => {
            let c = bounds.center();
            let y = match mode {
                CenteringMode::Horizontal => 0.0,
                CenteringMode::All => c.y,
            };
            Point3::new(c.x, y, c.z)
        }
        None => Point3::origin(),
    };

    let vertices = mesh
        .vertices
        .iter()
        .map(|v| Point3::new(v.x - center.x, flip(v.y - center.y), flip(v.z - center.z)))
        .collect();
    let normals = mesh
        .normals
        .iter()
        .map(|n| Vector3::new(n.x, flip(n.y), flip(n.z)))
        .collect();

    Ok(NormalizedMesh {
        vertices,
        normals,
        triangle_indices: &mesh.triangle_indices,
        center,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshSnapshot {
        MeshSnapshot {
            vertices: vec![
                Point3::new(-1.0, 2.0, 0.0),
                Point3::new(3.0, 4.0, 10.0),
                Point3::new(0.0, 6.0, 4.0),
            ],
            normals: vec![Vector3::new(0.0, 1.0, -1.0); 3],
            triangle_indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_horizontal_centering() {
        let mesh = triangle();
        let out = normalize(&mesh, CenteringMode::Horizontal).unwrap();

        assert_eq!(out.center, Point3::new(1.0, 0.0, 5.0));
        for (orig, v) in mesh.vertices.iter().zip(&out.vertices) {
            assert_eq!(v.x, orig.x - 1.0);
            assert_eq!(v.y, -orig.y);
            assert_eq!(v.z, -(orig.z - 5.0));
        }
    }

    #[test]
    fn test_full_centering() {
        let mesh = triangle();
        let out = normalize(&mesh, CenteringMode::All).unwrap();
        assert_eq!(out.center, Point3::new(1.0, 4.0, 5.0));
        assert_eq!(out.vertices[0].y, 2.0);
        assert_eq!(out.vertices[2].y, -2.0);
    }

    #[test]
    fn test_normals_flip_y_and_z() {
        let mesh = triangle();
        let out = normalize(&mesh, CenteringMode::Horizontal).unwrap();
        assert_eq!(out.normals[0], Vector3::new(0.0, -1.0, 1.0));
    }

    #[test]
    fn test_no_negative_zero() {
        let mut mesh = triangle();
        mesh.vertices[0].y = 0.0;
        let out = normalize(&mesh, CenteringMode::Horizontal).unwrap();
        assert!(out.vertices[0].y.is_sign_positive());
    }

    #[test]
    fn test_invalid_mesh_rejected() {
        let mut mesh = triangle();
        mesh.vertices.push(Point3::origin());
        assert!(matches!(
            normalize(&mesh, CenteringMode::Horizontal),
            Err(ContractError::InvalidMesh { .. })
        ));
    }
}
