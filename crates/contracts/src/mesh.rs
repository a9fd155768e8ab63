//! MeshSnapshot - engine mesh output
//!
//! The engine emits an unindexed triangle soup: every triangle owns its three
//! vertices, normals are per vertex, and the index list runs one-to-one with
//! the vertex list.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Immutable mesh produced on demand by the engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshSnapshot {
    /// Vertex positions, grouped in triangles
    pub vertices: Vec<Point3<f32>>,

    /// Per-vertex normals
    pub normals: Vec<Vector3<f32>>,

    /// Per-triangle vertex indices (length is a multiple of 3)
    pub triangle_indices: Vec<u32>,
}

/// Axis-aligned bounds of a mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshBounds {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl MeshBounds {
    /// Midpoint of the bounds
    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            (self.max.x - self.min.x) / 2.0 + self.min.x,
            (self.max.y - self.min.y) / 2.0 + self.min.y,
            (self.max.z - self.min.z) / 2.0 + self.min.z,
        )
    }
}

impl MeshSnapshot {
    /// Number of triangles described by the index list
    pub fn triangle_count(&self) -> usize {
        self.triangle_indices.len() / 3
    }

    /// Whether the snapshot holds no geometry
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Check the unindexed-triangle layout
    ///
    /// # Errors
    /// `InvalidMesh` when the vertex list is empty, its length is not a multiple
    /// of 3, the index or normal count differs from the vertex count, or an
    /// index points past the vertex list.
    pub fn validate(&self) -> Result<(), ContractError> {
        let vertex_count = self.vertices.len();

        if vertex_count == 0 {
            return Err(ContractError::invalid_mesh("mesh has no vertices"));
        }
        if vertex_count % 3 != 0 {
            return Err(ContractError::invalid_mesh(format!(
                "vertex count {vertex_count} is not a multiple of 3"
            )));
        }
        if self.triangle_indices.len() != vertex_count {
            return Err(ContractError::invalid_mesh(format!(
                "index count {} does not match vertex count {vertex_count}",
                self.triangle_indices.len()
            )));
        }
        if self.normals.len() != vertex_count {
            return Err(ContractError::invalid_mesh(format!(
                "normal count {} does not match vertex count {vertex_count}",
                self.normals.len()
            )));
        }
        if let Some(bad) = self
            .triangle_indices
            .iter()
            .find(|&&i| i as usize >= vertex_count)
        {
            return Err(ContractError::invalid_mesh(format!(
                "triangle index {bad} out of range for {vertex_count} vertices"
            )));
        }
        Ok(())
    }

    /// Axis-aligned bounds, `None` for an empty mesh
    pub fn bounds(&self) -> Option<MeshBounds> {
        let first = *self.vertices.first()?;
        let bounds = self.vertices.iter().fold(
            MeshBounds {
                min: first,
                max: first,
            },
            |acc, v| MeshBounds {
                min: Point3::new(acc.min.x.min(v.x), acc.min.y.min(v.y), acc.min.z.min(v.z)),
                max: Point3::new(acc.max.x.max(v.x), acc.max.y.max(v.y), acc.max.z.max(v.z)),
            },
        );
        Some(bounds)
    }
}

/// Supported mesh file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeshFormat {
    /// Wavefront OBJ (ASCII, vertices + normals + faces)
    Obj,
    /// Stanford PLY (ASCII, vertices + faces)
    Ply,
    /// Binary STL
    #[default]
    Stl,
}

impl MeshFormat {
    /// All formats, in menu order
    pub const ALL: [MeshFormat; 3] = [MeshFormat::Obj, MeshFormat::Ply, MeshFormat::Stl];

    /// File extension without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Obj => "obj",
            Self::Ply => "ply",
            Self::Stl => "stl",
        }
    }

    /// Select a format from a file extension
    ///
    /// # Errors
    /// `UnrecognizedExportFormat` for any other extension
    pub fn from_extension(ext: &str) -> Result<Self, ContractError> {
        match ext.to_ascii_lowercase().as_str() {
            "obj" => Ok(Self::Obj),
            "ply" => Ok(Self::Ply),
            "stl" => Ok(Self::Stl),
            _ => Err(ContractError::UnrecognizedExportFormat {
                format: ext.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for MeshFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

impl std::str::FromStr for MeshFormat {
    type Err = ContractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_extension(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> MeshSnapshot {
        MeshSnapshot {
            vertices: vec![
                Point3::new(-1.0, 0.0, 0.0),
                Point3::new(3.0, 1.0, 10.0),
                Point3::new(0.0, 2.0, 5.0),
            ],
            normals: vec![Vector3::z(); 3],
            triangle_indices: vec![0, 1, 2],
        }
    }

    #[test]
    fn test_valid_triangle() {
        let mesh = triangle();
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn test_empty_mesh_rejected() {
        let err = MeshSnapshot::default().validate().unwrap_err();
        assert!(matches!(err, ContractError::InvalidMesh { .. }));
    }

    #[test]
    fn test_four_vertices_six_indices_rejected() {
        let mesh = MeshSnapshot {
            vertices: vec![Point3::origin(); 4],
            normals: vec![Vector3::z(); 4],
            triangle_indices: vec![0, 1, 2, 1, 2, 3],
        };
        let err = mesh.validate().unwrap_err();
        assert!(err.to_string().contains("not a multiple of 3"), "got: {err}");
    }

    #[test]
    fn test_index_count_mismatch_rejected() {
        let mut mesh = triangle();
        mesh.triangle_indices.extend([0, 1, 2]);
        let err = mesh.validate().unwrap_err();
        assert!(err.to_string().contains("index count"), "got: {err}");
    }

    #[test]
    fn test_bounds_center() {
        let bounds = triangle().bounds().unwrap();
        let center = bounds.center();
        assert_eq!(center.x, 1.0);
        assert_eq!(center.z, 5.0);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(MeshFormat::from_extension("STL").unwrap(), MeshFormat::Stl);
        assert_eq!("obj".parse::<MeshFormat>().unwrap(), MeshFormat::Obj);
        let err = MeshFormat::from_extension("fbx").unwrap_err();
        assert!(matches!(err, ContractError::UnrecognizedExportFormat { .. }));
    }
}
