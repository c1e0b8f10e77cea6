//! De-duplicated, sign-paired plane storage.

use std::collections::HashMap;

use crate::{Plane, DIST_EPSILON, NORMAL_EPSILON};

/// Append-only table of planes shared by every brush of a map.
///
/// Planes are stored in pairs: the canonical orientation (positive dominant
/// normal component) at an even index and its negation at the following odd
/// index, so `index ^ 1` always finds the opposite plane. Indices never change
/// once handed out and no entry is ever modified.
#[derive(Debug, Clone, Default)]
pub struct PlaneTable {
    planes: Vec<Plane>,
    /// Even pair indices bucketed by rounded absolute distance, which both
    /// orientations of a plane share.
    buckets: HashMap<i64, Vec<usize>>,
}

fn bucket_of(dist: f64) -> i64 {
    dist.abs().round() as i64
}

impl PlaneTable {
    /// Creates an empty plane table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of planes, counting both members of every pair.
    #[inline]
    pub fn len(&self) -> usize {
        self.planes.len()
    }

    /// Returns `true` if no plane was added yet.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }

    /// Returns the plane stored at `index`.
    ///
    /// # Panics
    /// Panics if `index` was not returned by this table.
    #[inline]
    pub fn get_plane(&self, index: usize) -> &Plane {
        &self.planes[index]
    }

    /// Iterates over all planes in index order.
    pub fn iter(&self) -> impl Iterator<Item = &Plane> {
        self.planes.iter()
    }

    /// Looks up a plane without adding it.
    pub fn find_plane(&self, plane: &Plane) -> Option<usize> {
        let bucket = bucket_of(plane.dist());

        // a distance close to a rounding boundary can land in a neighbour bucket
        for b in [bucket - 1, bucket, bucket + 1] {
            let Some(indices) = self.buckets.get(&b) else {
                continue;
            };
            for &index in indices {
                if self.planes[index].epsilon_eq(plane, NORMAL_EPSILON, DIST_EPSILON) {
                    return Some(index);
                }
                if self.planes[index + 1].epsilon_eq(plane, NORMAL_EPSILON, DIST_EPSILON) {
                    return Some(index + 1);
                }
            }
        }

        None
    }

    /// Returns the index of `plane`, adding it (and its negation) if no
    /// matching plane is stored yet.
    ///
    /// The returned index refers to the orientation that was asked for.
    pub fn add_or_find_plane(&mut self, plane: &Plane) -> usize {
        if let Some(index) = self.find_plane(plane) {
            return index;
        }

        let canonical = if plane.is_canonical() { *plane } else { -*plane };
        let index = self.planes.len();
        self.planes.push(canonical);
        self.planes.push(-canonical);
        self.buckets
            .entry(bucket_of(canonical.dist()))
            .or_default()
            .push(index);

        if plane.is_canonical() {
            index
        } else {
            index + 1
        }
    }
}
