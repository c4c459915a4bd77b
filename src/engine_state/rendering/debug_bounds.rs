//! Axis-aligned chunk bounds for the debug wireframe overlay.
//!
//! Bounds are derived purely from a chunk coordinate and the chunk edge
//! length, so the overlay can be drawn for any coordinate, generated or not.

use cgmath::{EuclideanSpace, Point3, Vector3};

use crate::engine_state::voxels::chunk::{Chunk, CHUNK_DIMENSION};

/// Line-list indices into [`ChunkBounds::corners`] drawing the 12 box edges.
pub const WIREFRAME_INDICES: [u32; 24] = [
    0, 1, 1, 3, 3, 2, 2, 0, // bottom (y = min)
    4, 5, 5, 7, 7, 6, 6, 4, // top (y = max)
    0, 4, 1, 5, 2, 6, 3, 7, // verticals
];

/// An axis-aligned box stored as centre and half extents.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ChunkBounds {
    center: Point3<f32>,
    half_extents: Vector3<f32>,
}

impl ChunkBounds {
    /// Creates a box from its two extreme corners, in either order.
    pub fn from_min_max(a: Point3<f32>, b: Point3<f32>) -> Self {
        let min = Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z));
        let max = Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z));
        ChunkBounds {
            center: min.midpoint(max),
            half_extents: (max - min) / 2.0,
        }
    }

    /// The world-space box covered by the chunk at `position`.
    pub fn for_chunk(position: Point3<i32>) -> Self {
        let min = Chunk::world_origin_of(position);
        let edge = CHUNK_DIMENSION as f32;
        Self::from_min_max(min, min + Vector3::new(edge, edge, edge))
    }

    /// Centre of the box.
    pub fn center(&self) -> Point3<f32> {
        self.center
    }

    /// Half the box size along each axis.
    pub fn half_extents(&self) -> Vector3<f32> {
        self.half_extents
    }

    /// Smallest corner.
    pub fn min(&self) -> Point3<f32> {
        self.center - self.half_extents
    }

    /// Largest corner.
    pub fn max(&self) -> Point3<f32> {
        self.center + self.half_extents
    }

    /// The eight corners. Bit 0 of the index selects max x, bit 1 max z and
    /// bit 2 max y, matching [`WIREFRAME_INDICES`].
    pub fn corners(&self) -> [Point3<f32>; 8] {
        let (min, max) = (self.min(), self.max());
        std::array::from_fn(|i| {
            Point3::new(
                if i & 1 == 0 { min.x } else { max.x },
                if i & 4 == 0 { min.y } else { max.y },
                if i & 2 == 0 { min.z } else { max.z },
            )
        })
    }

    /// Whether `point` lies inside or on the box.
    pub fn contains_point(&self, point: Point3<f32>) -> bool {
        let delta = point - self.center;
        delta.x.abs() <= self.half_extents.x
            && delta.y.abs() <= self.half_extents.y
            && delta.z.abs() <= self.half_extents.z
    }

    /// Whether two boxes overlap or touch.
    pub fn intersects(&self, other: &ChunkBounds) -> bool {
        let delta = other.center - self.center;
        let reach = self.half_extents + other.half_extents;
        delta.x.abs() <= reach.x && delta.y.abs() <= reach.y && delta.z.abs() <= reach.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_bounds_span_one_edge_length() {
        let bounds = ChunkBounds::for_chunk(Point3::new(1, 0, -1));
        assert_eq!(bounds.min(), Point3::new(32.0, 0.0, -32.0));
        assert_eq!(bounds.max(), Point3::new(64.0, 32.0, 0.0));
        assert_eq!(bounds.center(), Point3::new(48.0, 16.0, -16.0));
    }

    #[test]
    fn wireframe_edges_are_axis_aligned_and_full_length() {
        let bounds = ChunkBounds::for_chunk(Point3::new(0, 0, 0));
        let corners = bounds.corners();
        for edge in WIREFRAME_INDICES.chunks(2) {
            let delta = corners[edge[1] as usize] - corners[edge[0] as usize];
            let lengths = [delta.x.abs(), delta.y.abs(), delta.z.abs()];
            assert_eq!(lengths.iter().filter(|l| **l == 32.0).count(), 1);
            assert_eq!(lengths.iter().filter(|l| **l == 0.0).count(), 2);
        }
    }

    #[test]
    fn containment_is_inclusive() {
        let bounds = ChunkBounds::for_chunk(Point3::new(0, 0, 0));
        assert!(bounds.contains_point(Point3::new(0.0, 0.0, 0.0)));
        assert!(bounds.contains_point(Point3::new(32.0, 16.0, 5.0)));
        assert!(!bounds.contains_point(Point3::new(32.5, 16.0, 5.0)));
    }

    #[test]
    fn neighbours_touch_and_distant_chunks_do_not() {
        let origin = ChunkBounds::for_chunk(Point3::new(0, 0, 0));
        let neighbour = ChunkBounds::for_chunk(Point3::new(1, 0, 0));
        let far = ChunkBounds::for_chunk(Point3::new(3, 0, 0));
        let small_inside = ChunkBounds::from_min_max(
            Point3::new(10.0, 10.0, 10.0),
            Point3::new(12.0, 12.0, 12.0),
        );

        assert!(origin.intersects(&neighbour));
        assert!(!origin.intersects(&far));
        assert!(origin.intersects(&small_inside));
        assert!(small_inside.intersects(&origin));
    }
}
