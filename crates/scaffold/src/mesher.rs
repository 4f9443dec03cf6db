//! Polygonization of the edge map.
//!
//! Every physical edge shared by three or more surface leaves becomes one
//! polygon through those leaves' dual vertices. The vertices are ordered by
//! angle in a fitted plane and fan-triangulated from the first one.

use std::collections::HashMap;

use glam::Vec3;
use tracing::{debug, warn};

use crate::edge_roots::{EdgeEntry, EdgeMap};
use crate::octree::Octree;
use crate::types::ScaffoldMesh;

/// Edges with fewer contributors cannot span a polygon.
pub const MIN_POLYGON_LEAVES: usize = 3;

/// Squared length below which a fitted normal is treated as zero.
const NORMAL_EPSILON_SQ: f32 = 1e-12;

/// Counts gathered while triangulating.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeshingStats {
    pub triangulated_edges: usize,
    /// Entries with fewer than [`MIN_POLYGON_LEAVES`] contributors.
    pub skipped_edges: usize,
    /// Fan triangles dropped because two corners welded together.
    pub degenerate_triangles: usize,
    /// Polygons whose fitted normal had to fall back.
    pub normal_fallbacks: usize,
}

/// Deduplicates vertices by exact position, keeping first-seen order.
#[derive(Debug, Default)]
struct VertexWelder {
    vertices: Vec<Vec3>,
    lookup: HashMap<[u32; 3], u32>,
}

impl VertexWelder {
    fn index_of(&mut self, position: Vec3) -> u32 {
        // Adding zero folds -0.0 into 0.0
        let key = (position + Vec3::ZERO).to_array().map(f32::to_bits);
        let next = self.vertices.len() as u32;
        *self.lookup.entry(key).or_insert_with(|| {
            self.vertices.push(position);
            next
        })
    }
}

/// Turn every edge entry with enough contributors into a triangle fan.
pub fn triangulate_edges(tree: &Octree, edges: &EdgeMap) -> (ScaffoldMesh, MeshingStats) {
    let mut welder = VertexWelder::default();
    let mut indices = Vec::new();
    let mut stats = MeshingStats::default();

    for (_, entry) in edges.iter() {
        if entry.leaves.len() < MIN_POLYGON_LEAVES {
            stats.skipped_edges += 1;
            continue;
        }
        let Some(polygon) = order_polygon(tree, entry, &mut stats) else {
            stats.skipped_edges += 1;
            continue;
        };

        let corner_ids: Vec<u32> = polygon.iter().map(|&p| welder.index_of(p)).collect();
        for i in 1..corner_ids.len() - 1 {
            let tri = [corner_ids[0], corner_ids[i], corner_ids[i + 1]];
            if tri[0] == tri[1] || tri[1] == tri[2] || tri[0] == tri[2] {
                stats.degenerate_triangles += 1;
                continue;
            }
            indices.extend(tri);
        }
        stats.triangulated_edges += 1;
    }

    let mesh = ScaffoldMesh {
        vertices: welder.vertices,
        indices,
    };
    debug!(
        vertices = mesh.vertices.len(),
        triangles = mesh.triangle_count(),
        triangulated_edges = stats.triangulated_edges,
        skipped_edges = stats.skipped_edges,
        "edge map triangulated"
    );
    (mesh, stats)
}

/// Dual vertices around one edge, sorted by angle and wound so that the fan
/// faces away from increasing density.
fn order_polygon(tree: &Octree, entry: &EdgeEntry, stats: &mut MeshingStats) -> Option<Vec<Vec3>> {
    let points: Vec<Vec3> = entry
        .leaves
        .iter()
        .filter_map(|&id| tree.node(id).vertex_position)
        .collect();
    if points.len() < MIN_POLYGON_LEAVES {
        return None;
    }

    let centroid = mean(&points);
    let mut normal = fitted_normal(&points, centroid);
    let mut sort_points = points.clone();
    let mut sort_center = centroid;

    if normal.length_squared() < NORMAL_EPSILON_SQ {
        stats.normal_fallbacks += 1;
        // Order by the leaf cells instead; their centers are never collinear
        // for leaves that genuinely surround an edge.
        sort_points = entry
            .leaves
            .iter()
            .filter(|&&id| tree.node(id).vertex_position.is_some())
            .map(|&id| tree.node(id).center)
            .collect();
        sort_center = mean(&sort_points);
        normal = fitted_normal(&sort_points, sort_center);
        if normal.length_squared() < NORMAL_EPSILON_SQ {
            warn!(leaves = entry.leaves.len(), "degenerate polygon, ordering around edge axis");
            normal = entry.direction();
        }
    }
    let normal = normal.normalize_or_zero();
    if normal == Vec3::ZERO {
        return None;
    }

    let u = normal.any_orthonormal_vector();
    let w = normal.cross(u);
    let mut order: Vec<(f32, usize)> = sort_points
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let d = p - sort_center;
            (d.dot(w).atan2(d.dot(u)), i)
        })
        .collect();
    order.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));

    let mut polygon: Vec<Vec3> = order.into_iter().map(|(_, i)| points[i]).collect();
    // Counter-clockwise about `normal`; outward means against low -> high
    if normal.dot(entry.direction()) > 0.0 {
        polygon.reverse();
    }
    Some(polygon)
}

/// Newell-style normal: sum of cross products of consecutive
/// centroid-relative vectors, closing the loop.
fn fitted_normal(points: &[Vec3], centroid: Vec3) -> Vec3 {
    let n = points.len();
    (0..n)
        .map(|i| (points[i] - centroid).cross(points[(i + 1) % n] - centroid))
        .sum()
}

fn mean(points: &[Vec3]) -> Vec3 {
    points.iter().copied().sum::<Vec3>() / points.len().max(1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge_roots::EdgeKey;
    use crate::octree::NodeId;
    use crate::types::Aabb;

    /// Depth-1 tree over [0,2]^3 whose four lower leaves surround the z edge
    /// at x = y = 1.
    fn square_around_z_edge(vertex: impl Fn(Vec3) -> Vec3) -> (Octree, EdgeMap) {
        let mut tree = Octree::uniform(Aabb::new(Vec3::ZERO, Vec3::splat(2.0)), 1);
        let lower: Vec<NodeId> = tree.node(tree.root()).children.unwrap()[..4].to_vec();
        for &id in &lower {
            let center = tree.node(id).center;
            let node = tree.node_mut(id);
            node.contains_surface = true;
            node.vertex_position = Some(vertex(center));
        }

        let (low, high) = (Vec3::new(1.0, 1.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
        let key = key_of(low, high);
        let mut edges = EdgeMap::new();
        // Contribution order starts mid-loop
        for &i in &[1usize, 3, 2, 0] {
            edges.record(key, low, high, lower[i]);
        }
        (tree, edges)
    }

    /// On the depth-1 tree over [0,2]^3 lattice points equal world positions.
    fn key_of(low: Vec3, high: Vec3) -> EdgeKey {
        EdgeKey::new(low.as_uvec3(), high.as_uvec3())
    }

    fn face_normal([a, b, c]: [Vec3; 3]) -> Vec3 {
        (b - a).cross(c - a)
    }

    #[test]
    fn test_square_faces_against_density_gradient() {
        let (tree, edges) = square_around_z_edge(|c| c);
        let (mesh, stats) = triangulate_edges(&tree, &edges);

        assert_eq!(stats.triangulated_edges, 1);
        assert_eq!(stats.normal_fallbacks, 0);
        assert_eq!(mesh.vertices.len(), 4);
        assert_eq!(mesh.triangle_count(), 2);
        // Density grows along +z, so the surface faces -z
        for tri in mesh.triangles() {
            let n = face_normal(tri);
            assert!(n.z < 0.0, "triangle normal {n:?} points inward");
            assert!(n.x.abs() < 1e-6 && n.y.abs() < 1e-6);
        }
    }

    #[test]
    fn test_winding_follows_edge_orientation() {
        let (tree, mut edges) = square_around_z_edge(|c| c);
        // Same edge recorded the other way round
        let (low, high) = (Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 1.0, 0.0));
        let key = key_of(low, high);
        let mut flipped = EdgeMap::new();
        for (_, entry) in edges.iter() {
            for &leaf in &entry.leaves {
                flipped.record(key, low, high, leaf);
            }
        }
        edges = flipped;

        let (mesh, _) = triangulate_edges(&tree, &edges);
        for tri in mesh.triangles() {
            assert!(face_normal(tri).z > 0.0);
        }
    }

    #[test]
    fn test_collinear_vertices_fall_back_to_cell_centers() {
        // Squash every dual vertex onto a line through the edge
        let (tree, edges) = square_around_z_edge(|c| Vec3::new(c.x, 1.0, 0.5));
        let (mesh, stats) = triangulate_edges(&tree, &edges);
        assert_eq!(stats.normal_fallbacks, 1);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.vertices.len()));
        for v in &mesh.vertices {
            assert!(v.is_finite());
        }
    }

    #[test]
    fn test_too_few_contributors_are_skipped() {
        let mut tree = Octree::uniform(Aabb::new(Vec3::ZERO, Vec3::splat(2.0)), 1);
        let children = tree.node(tree.root()).children.unwrap();
        for &id in &children[..2] {
            let center = tree.node(id).center;
            tree.node_mut(id).vertex_position = Some(center);
        }
        let (low, high) = (Vec3::new(1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 1.0));
        let key = key_of(low, high);
        let mut edges = EdgeMap::new();
        edges.record(key, low, high, children[0]);
        edges.record(key, low, high, children[1]);

        let (mesh, stats) = triangulate_edges(&tree, &edges);
        assert!(mesh.is_empty());
        assert_eq!(stats.skipped_edges, 1);
    }

    #[test]
    fn test_welder_merges_equal_positions() {
        let mut welder = VertexWelder::default();
        let a = welder.index_of(Vec3::new(0.0, 1.0, 2.0));
        let b = welder.index_of(Vec3::new(-0.0, 1.0, 2.0));
        let c = welder.index_of(Vec3::ONE);
        assert_eq!(a, b);
        assert_eq!(c, 1);
        assert_eq!(welder.vertices.len(), 2);
    }
}
