//! Vertex and face buffers shared by the PLY parser, the asset pipeline and
//! the draw backend.

use glam::Vec3;

/// Indexed triangle mesh, or a point cloud when `indices` is empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    /// Linear RGBA, one per vertex when present.
    pub colors: Option<Vec<[f32; 4]>>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn is_point_cloud(&self) -> bool {
        self.indices.is_empty()
    }

    /// Scale every position by the same factor. Normals are direction-only
    /// and stay as they are.
    pub fn scale(&mut self, factor: f32) {
        for p in &mut self.positions {
            p[0] *= factor;
            p[1] *= factor;
            p[2] *= factor;
        }
    }

    /// Recompute smooth vertex normals from the faces.
    ///
    /// Face normals are accumulated unnormalized, so larger triangles weigh
    /// more, then each vertex normal is normalized. Vertices touched by no
    /// face (and point clouds) keep a zero normal.
    pub fn compute_vertex_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.positions.len()];

        for tri in self.indices.chunks_exact(3) {
            let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
            if a >= acc.len() || b >= acc.len() || c >= acc.len() {
                continue;
            }
            let pa = Vec3::from_array(self.positions[a]);
            let pb = Vec3::from_array(self.positions[b]);
            let pc = Vec3::from_array(self.positions[c]);
            let n = (pc - pb).cross(pa - pb);
            acc[a] += n;
            acc[b] += n;
            acc[c] += n;
        }

        self.normals = acc
            .into_iter()
            .map(|n| n.normalize_or_zero().to_array())
            .collect();
    }

    /// Axis-aligned bounds as `(min, max)`, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut it = self.positions.iter().map(|p| Vec3::from_array(*p));
        let first = it.next()?;
        Some(it.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    /// A `width` x `height` quad in the XY plane facing +Z, centered on the
    /// origin. Rotate by -90deg about X to lay it flat as a floor.
    pub fn plane(width: f32, height: f32) -> Self {
        let (hw, hh) = (width * 0.5, height * 0.5);
        Self {
            positions: vec![
                [-hw, hh, 0.0],
                [hw, hh, 0.0],
                [-hw, -hh, 0.0],
                [hw, -hh, 0.0],
            ],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            colors: None,
            indices: vec![0, 2, 1, 2, 3, 1],
        }
    }

    /// Plane UVs in the same vertex order as [`MeshData::plane`].
    pub fn plane_uvs() -> Vec<[f32; 2]> {
        vec![[0.0, 1.0], [1.0, 1.0], [0.0, 0.0], [1.0, 0.0]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_triangle() -> MeshData {
        MeshData {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            indices: vec![0, 1, 2],
            ..Default::default()
        }
    }

    #[test]
    fn normals_follow_counter_clockwise_winding() {
        let mut mesh = single_triangle();
        mesh.compute_vertex_normals();
        for n in &mesh.normals {
            assert!((Vec3::from_array(*n) - Vec3::Z).length() < 1e-6);
        }
    }

    #[test]
    fn shared_vertex_normal_is_unit_length() {
        // Two triangles folded along the x axis.
        let mut mesh = MeshData {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            indices: vec![0, 1, 2, 0, 3, 1],
            ..Default::default()
        };
        mesh.compute_vertex_normals();
        let shared = Vec3::from_array(mesh.normals[0]);
        assert!((shared.length() - 1.0).abs() < 1e-6);
        assert!(shared.y > 0.0 && shared.z > 0.0);
    }

    #[test]
    fn unreferenced_vertices_keep_zero_normal() {
        let mut mesh = single_triangle();
        mesh.positions.push([5.0, 5.0, 5.0]);
        mesh.compute_vertex_normals();
        assert_eq!(mesh.normals.len(), 4);
        assert_eq!(mesh.normals[3], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn scale_is_uniform() {
        let mut mesh = single_triangle();
        mesh.scale(0.5);
        let (lo, hi) = mesh.bounds().unwrap();
        assert_eq!(lo, Vec3::ZERO);
        assert_eq!(hi, Vec3::new(0.5, 0.5, 0.0));
    }

    #[test]
    fn plane_faces_positive_z() {
        let mut plane = MeshData::plane(200.0, 200.0);
        assert_eq!(plane.triangle_count(), 2);
        plane.compute_vertex_normals();
        assert!(plane.normals.iter().all(|n| *n == [0.0, 0.0, 1.0]));
        let (lo, hi) = plane.bounds().unwrap();
        assert_eq!(lo, Vec3::new(-100.0, -100.0, 0.0));
        assert_eq!(hi, Vec3::new(100.0, 100.0, 0.0));
    }

    #[test]
    fn empty_mesh_has_no_bounds() {
        assert!(MeshData::default().bounds().is_none());
        assert!(MeshData::default().is_point_cloud());
    }
}
