//! Grid geometry: block regions, overlap tests and pricing zones.
//!
//! The grid is a fixed rectangle of unit blocks (conventionally 100×100).
//! A [`Region`] is an axis-aligned rectangle of blocks identified by its
//! origin and extents. Overlap uses half-open intervals, so two regions
//! overlap iff they share at least one unit block.
//!
//! Zone boundaries are configuration ([`ZoneBands`]), not hard-coded:
//! a row is Gold, Silver or Bronze depending on where it falls relative
//! to the configured band edges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned rectangle of unit blocks on the grid.
///
/// Extents are counted in blocks and must be at least 1 for the region
/// to be valid; validity against a concrete grid is checked by
/// [`Region::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub min_block_x: u32,
    pub min_block_y: u32,
    pub blocks_x: u32,
    pub blocks_y: u32,
}

impl Region {
    pub fn new(min_block_x: u32, min_block_y: u32, blocks_x: u32, blocks_y: u32) -> Self {
        Self {
            min_block_x,
            min_block_y,
            blocks_x,
            blocks_y,
        }
    }

    /// True iff the two rectangles share at least one unit block.
    ///
    /// Half-open interval test; arithmetic is widened to u64 so extreme
    /// coordinates cannot wrap.
    pub fn overlaps(&self, other: &Region) -> bool {
        let (ax0, ax1) = (self.min_block_x as u64, self.min_block_x as u64 + self.blocks_x as u64);
        let (bx0, bx1) = (
            other.min_block_x as u64,
            other.min_block_x as u64 + other.blocks_x as u64,
        );
        let (ay0, ay1) = (self.min_block_y as u64, self.min_block_y as u64 + self.blocks_y as u64);
        let (by0, by1) = (
            other.min_block_y as u64,
            other.min_block_y as u64 + other.blocks_y as u64,
        );
        !(ax1 <= bx0 || bx1 <= ax0 || ay1 <= by0 || by1 <= ay0)
    }

    /// Number of unit blocks covered.
    pub fn block_count(&self) -> u64 {
        self.blocks_x as u64 * self.blocks_y as u64
    }

    /// Top row of the region; a selection is priced by the zone of this row.
    pub fn top_row(&self) -> u32 {
        self.min_block_y
    }

    /// Check extents and grid containment.
    ///
    /// Returns a human-readable reason on failure so callers can surface
    /// it directly in an `InvalidSelection` rejection.
    pub fn validate(&self, grid: &GridBounds) -> Result<(), String> {
        if self.blocks_x == 0 || self.blocks_y == 0 {
            return Err(format!(
                "region extents must be at least 1x1, got {}x{}",
                self.blocks_x, self.blocks_y
            ));
        }
        let max_x = self.min_block_x as u64 + self.blocks_x as u64;
        let max_y = self.min_block_y as u64 + self.blocks_y as u64;
        if max_x > grid.width as u64 || max_y > grid.height as u64 {
            return Err(format!(
                "region ({},{}) {}x{} exceeds grid bounds {}x{}",
                self.min_block_x, self.min_block_y, self.blocks_x, self.blocks_y, grid.width, grid.height
            ));
        }
        Ok(())
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{}) {}x{}",
            self.min_block_x, self.min_block_y, self.blocks_x, self.blocks_y
        )
    }
}

/// Total grid size in blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridBounds {
    pub width: u32,
    pub height: u32,
}

impl Default for GridBounds {
    fn default() -> Self {
        Self {
            width: 100,
            height: 100,
        }
    }
}

/// Pricing zone of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Zone {
    Gold,
    Silver,
    Bronze,
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Gold => write!(f, "gold"),
            Zone::Silver => write!(f, "silver"),
            Zone::Bronze => write!(f, "bronze"),
        }
    }
}

/// Configured row bands for zone classification.
///
/// Gold covers rows `0..=gold_end`, Silver covers
/// `silver_start..=silver_end`, everything else is Bronze. Rows falling
/// in a gap between the bands classify as Bronze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneBands {
    pub gold_end: u32,
    pub silver_start: u32,
    pub silver_end: u32,
}

impl Default for ZoneBands {
    fn default() -> Self {
        Self {
            gold_end: 9,
            silver_start: 10,
            silver_end: 39,
        }
    }
}

impl ZoneBands {
    pub fn zone_of(&self, row: u32) -> Zone {
        if row <= self.gold_end {
            Zone::Gold
        } else if row >= self.silver_start && row <= self.silver_end {
            Zone::Silver
        } else {
            Zone::Bronze
        }
    }

    /// Zone a region is priced in: the zone of its top row.
    pub fn zone_of_region(&self, region: &Region) -> Zone {
        self.zone_of(region.top_row())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x: u32, y: u32, w: u32, h: u32) -> Region {
        Region::new(x, y, w, h)
    }

    #[test]
    fn test_overlap_shared_cell() {
        // Shares cell (1,1).
        let a = r(0, 0, 2, 2);
        let b = r(1, 1, 2, 2);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_overlap_edge_adjacent_is_disjoint() {
        // b starts exactly where a ends; half-open intervals do not touch.
        let a = r(0, 0, 2, 2);
        let b = r(2, 0, 1, 1);
        assert!(!a.overlaps(&b));
        assert!(!b.overlaps(&a));

        let below = r(0, 2, 2, 2);
        assert!(!a.overlaps(&below));
    }

    #[test]
    fn test_overlap_contained() {
        let outer = r(0, 0, 10, 10);
        let inner = r(3, 3, 2, 2);
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn test_overlap_same_region() {
        let a = r(5, 5, 3, 3);
        assert!(a.overlaps(&a));
    }

    #[test]
    fn test_overlap_far_apart() {
        let a = r(0, 0, 2, 2);
        let b = r(50, 50, 2, 2);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_overlap_extreme_coordinates_no_wrap() {
        let a = r(u32::MAX - 1, 0, 1, 1);
        let b = r(0, 0, 1, 1);
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn test_block_count() {
        assert_eq!(r(0, 0, 2, 3).block_count(), 6);
        assert_eq!(r(10, 10, 1, 1).block_count(), 1);
    }

    #[test]
    fn test_validate_ok() {
        let grid = GridBounds::default();
        assert!(r(0, 0, 100, 100).validate(&grid).is_ok());
        assert!(r(99, 99, 1, 1).validate(&grid).is_ok());
    }

    #[test]
    fn test_validate_zero_extent() {
        let grid = GridBounds::default();
        assert!(r(0, 0, 0, 1).validate(&grid).is_err());
        assert!(r(0, 0, 1, 0).validate(&grid).is_err());
    }

    #[test]
    fn test_validate_out_of_bounds() {
        let grid = GridBounds::default();
        assert!(r(99, 0, 2, 1).validate(&grid).is_err());
        assert!(r(0, 100, 1, 1).validate(&grid).is_err());
    }

    #[test]
    fn test_zone_boundaries() {
        let bands = ZoneBands::default();
        // gold_end=9, silver_start=10, silver_end=39
        assert_eq!(bands.zone_of(0), Zone::Gold);
        assert_eq!(bands.zone_of(9), Zone::Gold);
        assert_eq!(bands.zone_of(10), Zone::Silver);
        assert_eq!(bands.zone_of(39), Zone::Silver);
        assert_eq!(bands.zone_of(40), Zone::Bronze);
        assert_eq!(bands.zone_of(99), Zone::Bronze);
    }

    #[test]
    fn test_zone_gap_is_bronze() {
        let bands = ZoneBands {
            gold_end: 4,
            silver_start: 10,
            silver_end: 20,
        };
        assert_eq!(bands.zone_of(7), Zone::Bronze);
    }

    #[test]
    fn test_zone_of_region_uses_top_row() {
        let bands = ZoneBands::default();
        // Starts in gold, spills into silver; priced gold.
        let straddle = r(0, 8, 1, 5);
        assert_eq!(bands.zone_of_region(&straddle), Zone::Gold);
    }
}
