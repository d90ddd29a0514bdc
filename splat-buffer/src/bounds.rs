/// Axis aligned bounds tracking for splat positions
use glam::Vec3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplatBounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Default for SplatBounds {
    fn default() -> Self {
        Self::new()
    }
}

impl SplatBounds {
    /// Create new bounds initialised to infinity values
    pub fn new() -> Self {
        Self {
            min: Vec3::INFINITY,
            max: Vec3::NEG_INFINITY,
        }
    }

    /// Bounds spanning exactly the given corners.
    pub fn from_corners(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Update bounds with a new point
    pub fn update(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Grow these bounds to enclose another set.
    /// Used to reduce per-chunk bounds computed in parallel.
    pub fn merge(mut self, other: &SplatBounds) -> Self {
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self
    }

    /// True until at least one point has been added.
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Get world space dimensions
    pub fn dimensions(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            self.max - self.min
        }
    }

    pub fn center(&self) -> Vec3 {
        if self.is_empty() {
            Vec3::ZERO
        } else {
            (self.min + self.max) * 0.5
        }
    }

    /// Closed containment test; points on any face are inside.
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.cmpge(self.min).all() && point.cmple(self.max).all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_bounds_are_empty() {
        let bounds = SplatBounds::new();
        assert!(bounds.is_empty());
        assert_eq!(bounds.dimensions(), Vec3::ZERO);
    }

    #[test]
    fn update_and_merge_cover_all_points() {
        let mut a = SplatBounds::new();
        a.update(Vec3::new(1.0, 2.0, 3.0));
        a.update(Vec3::new(-1.0, 0.0, 5.0));

        let mut b = SplatBounds::new();
        b.update(Vec3::new(4.0, -2.0, 0.0));

        let merged = a.merge(&b);
        assert_eq!(merged.min, Vec3::new(-1.0, -2.0, 0.0));
        assert_eq!(merged.max, Vec3::new(4.0, 2.0, 5.0));
        assert!(merged.contains_point(Vec3::new(4.0, 2.0, 5.0)));
        assert!(!merged.contains_point(Vec3::new(4.1, 2.0, 5.0)));
    }
}
