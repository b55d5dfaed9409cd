//! Mask tables — sparse `(x, dB)` points with linear interpolation
//!
//! Shared representation for spectral emission/selectivity masks and antenna
//! radiation-pattern envelopes: an ordered list of `(offset_or_angle,
//! attenuation_dB)` points. Duplicate abscissae collapse with the latest
//! value winning; lookups extrapolate flat on both sides and interpolate
//! linearly in the dB domain in between.
//!
//! # Example
//!
//! ```rust
//! use afc_core::mask::MaskTable;
//!
//! let mask = MaskTable::from_points([(0.0, 0.0), (20.0, 30.0), (40.0, 40.0)]);
//! assert_eq!(mask.interpolate_db(10.0), Some(15.0));
//! assert_eq!(mask.interpolate_db(-5.0), Some(0.0));  // flat left
//! assert_eq!(mask.interpolate_db(100.0), Some(40.0)); // flat right
//! ```

use serde::{Deserialize, Serialize};

/// Ordered sparse attenuation table.
///
/// Serializes as a bare list of `(x, dB)` pairs; deserialization re-applies
/// the sort/collapse invariant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(f64, f64)>", into = "Vec<(f64, f64)>")]
pub struct MaskTable {
    points: Vec<(f64, f64)>,
}

impl From<Vec<(f64, f64)>> for MaskTable {
    fn from(points: Vec<(f64, f64)>) -> Self {
        Self::from_points(points)
    }
}

impl From<MaskTable> for Vec<(f64, f64)> {
    fn from(mask: MaskTable) -> Self {
        mask.points
    }
}

impl MaskTable {
    /// Build a table from arbitrary-order points. Points sharing an abscissa
    /// (within 1e-9) collapse, latest wins.
    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut pts: Vec<(f64, f64)> = points.into_iter().collect();
        // Stable sort keeps insertion order among equal keys so the last
        // duplicate survives the collapse below.
        pts.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        let mut cleaned: Vec<(f64, f64)> = Vec::with_capacity(pts.len());
        for (x, y) in pts {
            match cleaned.last_mut() {
                Some(last) if (last.0 - x).abs() < 1e-9 => *last = (x, y),
                _ => cleaned.push((x, y)),
            }
        }
        Self { points: cleaned }
    }

    /// Build from integer-keyed sparse entries (the parameter-set form).
    pub fn from_offsets<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (i32, f64)>,
    {
        Self::from_points(entries.into_iter().map(|(k, v)| (k as f64, v)))
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Sorted view of the points.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Attenuation at `x`, or `None` for an empty table.
    pub fn interpolate_db(&self, x: f64) -> Option<f64> {
        let pts = &self.points;
        let first = pts.first()?;
        if x <= first.0 {
            return Some(first.1);
        }
        for w in pts.windows(2) {
            let (x0, y0) = w[0];
            let (x1, y1) = w[1];
            if x <= x1 {
                if (x1 - x0).abs() < 1e-12 {
                    return Some(y0);
                }
                let t = (x - x0) / (x1 - x0);
                return Some(y0 + t * (y1 - y0));
            }
        }
        pts.last().map(|&(_, y)| y)
    }

    /// Overlay `other` on top of this table: offsets present in `other`
    /// replace this table's values, everything else is kept as a floor.
    pub fn merged_with(&self, other: &MaskTable) -> MaskTable {
        MaskTable::from_points(
            self.points
                .iter()
                .chain(other.points.iter())
                .copied()
                .collect::<Vec<_>>(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_interpolation() {
        let m = MaskTable::from_points([(0.0, 0.0), (20.0, 30.0), (40.0, 40.0)]);
        assert_eq!(m.interpolate_db(10.0), Some(15.0));
        let v = m.interpolate_db(25.0).unwrap();
        assert!((v - 32.5).abs() < 1e-9, "at 25: {v}, expected 32.5");
    }

    #[test]
    fn test_flat_extrapolation() {
        let m = MaskTable::from_points([(10.0, 20.0), (40.0, 35.0)]);
        assert_eq!(m.interpolate_db(-3.0), Some(20.0));
        assert_eq!(m.interpolate_db(0.0), Some(20.0));
        assert_eq!(m.interpolate_db(120.0), Some(35.0));
    }

    #[test]
    fn test_empty_table() {
        let m = MaskTable::default();
        assert!(m.is_empty());
        assert_eq!(m.interpolate_db(10.0), None);
    }

    #[test]
    fn test_duplicate_collapse_latest_wins() {
        let m = MaskTable::from_points([(20.0, 30.0), (20.0, 27.0)]);
        assert_eq!(m.len(), 1);
        assert_eq!(m.interpolate_db(20.0), Some(27.0));
    }

    #[test]
    fn test_unsorted_input() {
        let m = MaskTable::from_points([(40.0, 40.0), (0.0, 0.0), (20.0, 30.0)]);
        assert_eq!(m.interpolate_db(30.0), Some(35.0));
    }

    #[test]
    fn test_merge_overlay() {
        let floor = MaskTable::from_offsets([(10, 20.0), (20, 30.0), (40, 35.0)]);
        let device = MaskTable::from_offsets([(20, 33.0)]);
        let merged = floor.merged_with(&device);
        assert_eq!(merged.interpolate_db(20.0), Some(33.0), "device value wins");
        assert_eq!(merged.interpolate_db(10.0), Some(20.0), "floor retained");
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_deserialization_restores_order() {
        let m: MaskTable = serde_json::from_str("[[40.0, 35.0], [10.0, 20.0]]").unwrap();
        assert_eq!(m.points(), &[(10.0, 20.0), (40.0, 35.0)]);
        let wire = serde_json::to_string(&m).unwrap();
        assert_eq!(wire, "[[10.0,20.0],[40.0,35.0]]");
    }

    #[test]
    fn test_single_point() {
        let m = MaskTable::from_points([(20.0, 30.0)]);
        assert_eq!(m.interpolate_db(5.0), Some(30.0));
        assert_eq!(m.interpolate_db(20.0), Some(30.0));
        assert_eq!(m.interpolate_db(60.0), Some(30.0));
    }
}
