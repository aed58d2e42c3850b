//! Shared unit meshes instanced by the board renderer.

use std::collections::HashMap;

use glam::Vec3;

/// Vertex for the shared unit meshes.
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MeshVertex {
    /// Position in model space.
    pub position: [f32; 3],
    /// Outward surface normal.
    pub normal: [f32; 3],
}

/// A unit mesh ready for upload: vertex and index arrays.
pub struct Mesh {
    /// Vertex array.
    pub vertices: Vec<MeshVertex>,
    /// Triangle list indices.
    pub indices: Vec<u32>,
}

impl Mesh {
    /// Number of indices to draw.
    #[must_use]
    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }
}

/// Generate a unit icosphere with the given subdivision level.
///
/// Starts from a golden-ratio icosahedron and splits every triangle into
/// four per level, sharing midpoint vertices across edges.
#[must_use]
pub fn icosphere(subdivisions: u32) -> Mesh {
    let phi = (1.0 + 5.0_f32.sqrt()) / 2.0;
    let inv_len = 1.0 / (1.0 + phi * phi).sqrt();

    // 12 vertices of icosahedron (normalized to unit sphere)
    let mut positions: Vec<Vec3> = vec![
        Vec3::new(-1.0, phi, 0.0) * inv_len,
        Vec3::new(1.0, phi, 0.0) * inv_len,
        Vec3::new(-1.0, -phi, 0.0) * inv_len,
        Vec3::new(1.0, -phi, 0.0) * inv_len,
        Vec3::new(0.0, -1.0, phi) * inv_len,
        Vec3::new(0.0, 1.0, phi) * inv_len,
        Vec3::new(0.0, -1.0, -phi) * inv_len,
        Vec3::new(0.0, 1.0, -phi) * inv_len,
        Vec3::new(phi, 0.0, -1.0) * inv_len,
        Vec3::new(phi, 0.0, 1.0) * inv_len,
        Vec3::new(-phi, 0.0, -1.0) * inv_len,
        Vec3::new(-phi, 0.0, 1.0) * inv_len,
    ];

    // 20 triangles of icosahedron (CCW winding for outward-facing normals)
    #[rustfmt::skip]
    let mut indices: Vec<u32> = vec![
        0, 5, 11,   0, 1, 5,    0, 7, 1,    0, 10, 7,   0, 11, 10,
        1, 9, 5,    5, 4, 11,   11, 2, 10,  10, 6, 7,   7, 8, 1,
        3, 4, 9,    3, 2, 4,    3, 6, 2,    3, 8, 6,    3, 9, 8,
        4, 5, 9,    2, 11, 4,   6, 10, 2,   8, 7, 6,    9, 1, 8,
    ];

    let mut midpoint_cache: HashMap<(u32, u32), u32> = HashMap::new();

    for _ in 0..subdivisions {
        let mut new_indices = Vec::with_capacity(indices.len() * 4);

        for tri in indices.chunks(3) {
            let v0 = tri[0];
            let v1 = tri[1];
            let v2 = tri[2];

            let a = midpoint(&mut positions, &mut midpoint_cache, v0, v1);
            let b = midpoint(&mut positions, &mut midpoint_cache, v1, v2);
            let c = midpoint(&mut positions, &mut midpoint_cache, v2, v0);

            new_indices.extend_from_slice(&[v0, a, c]);
            new_indices.extend_from_slice(&[v1, b, a]);
            new_indices.extend_from_slice(&[v2, c, b]);
            new_indices.extend_from_slice(&[a, b, c]);
        }

        indices = new_indices;
    }

    // Unit sphere: normal = position
    let vertices = positions
        .iter()
        .map(|&p| MeshVertex {
            position: p.to_array(),
            normal: p.to_array(),
        })
        .collect();

    Mesh { vertices, indices }
}

fn midpoint(
    positions: &mut Vec<Vec3>,
    cache: &mut HashMap<(u32, u32), u32>,
    v0: u32,
    v1: u32,
) -> u32 {
    // Consistent ordering for the cache key
    let key = if v0 < v1 { (v0, v1) } else { (v1, v0) };

    if let Some(&idx) = cache.get(&key) {
        return idx;
    }

    let p0 = positions[v0 as usize];
    let p1 = positions[v1 as usize];
    let mid = ((p0 + p1) * 0.5).normalize();

    let idx = positions.len() as u32;
    positions.push(mid);
    let _ = cache.insert(key, idx);
    idx
}

/// Generate a unit cube spanning [-1, 1] on every axis, with flat-shaded
/// face normals.
#[must_use]
pub fn cube() -> Mesh {
    // (normal, four corners in CCW order viewed from outside)
    let faces: [(Vec3, [Vec3; 4]); 6] = [
        (
            Vec3::X,
            [
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(1.0, 1.0, -1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(1.0, -1.0, 1.0),
            ],
        ),
        (
            Vec3::NEG_X,
            [
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(-1.0, 1.0, 1.0),
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(-1.0, -1.0, -1.0),
            ],
        ),
        (
            Vec3::Y,
            [
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(-1.0, 1.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(1.0, 1.0, -1.0),
            ],
        ),
        (
            Vec3::NEG_Y,
            [
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(-1.0, -1.0, -1.0),
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(1.0, -1.0, 1.0),
            ],
        ),
        (
            Vec3::Z,
            [
                Vec3::new(-1.0, -1.0, 1.0),
                Vec3::new(1.0, -1.0, 1.0),
                Vec3::new(1.0, 1.0, 1.0),
                Vec3::new(-1.0, 1.0, 1.0),
            ],
        ),
        (
            Vec3::NEG_Z,
            [
                Vec3::new(1.0, -1.0, -1.0),
                Vec3::new(-1.0, -1.0, -1.0),
                Vec3::new(-1.0, 1.0, -1.0),
                Vec3::new(1.0, 1.0, -1.0),
            ],
        ),
    ];

    let mut vertices = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (normal, corners) in faces {
        let base = vertices.len() as u32;
        for corner in corners {
            vertices.push(MeshVertex {
                position: corner.to_array(),
                normal: normal.to_array(),
            });
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    Mesh { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icosphere_vertex_counts() {
        // 12 + 30 midpoints per level: 12, 42, 162, ...
        assert_eq!(icosphere(0).vertices.len(), 12);
        assert_eq!(icosphere(1).vertices.len(), 42);
        assert_eq!(icosphere(2).vertices.len(), 162);
    }

    #[test]
    fn test_icosphere_triangle_counts_quadruple() {
        assert_eq!(icosphere(0).indices.len(), 60);
        assert_eq!(icosphere(1).indices.len(), 240);
        assert_eq!(icosphere(2).indices.len(), 960);
    }

    #[test]
    fn test_icosphere_vertices_on_unit_sphere() {
        for vertex in &icosphere(2).vertices {
            let len = Vec3::from(vertex.position).length();
            assert!((len - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_cube_counts() {
        let mesh = cube();
        assert_eq!(mesh.vertices.len(), 24);
        assert_eq!(mesh.indices.len(), 36);
        assert_eq!(mesh.index_count(), 36);
    }

    #[test]
    fn test_cube_normals_face_outward() {
        for vertex in &cube().vertices {
            let dot = Vec3::from(vertex.position).dot(Vec3::from(vertex.normal));
            assert!(dot > 0.0);
        }
    }
}
