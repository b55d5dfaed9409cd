//! Antenna discrimination — FS receiver off-axis gain
//!
//! Two pattern models for the victim antenna: a parabolic main-beam
//! approximation parameterized by beamwidth, and manufacturer Radiation
//! Pattern Envelope (RPE) tables interpolated piecewise-linearly. Azimuth
//! and elevation attenuations sum, and the effective gain never drops below
//! the backlobe floor.
//!
//! # Example
//!
//! ```rust
//! use afc_core::antenna::{AntennaPattern, off_axis_azimuth_deg};
//!
//! let pattern = AntennaPattern::default();
//! // Boresight: full gain
//! assert_eq!(pattern.effective_gain_dbi(0.0, 0.0), 30.0);
//! // Far off axis in both planes: clamped at the backlobe floor
//! assert_eq!(pattern.effective_gain_dbi(90.0, 90.0), -10.0);
//!
//! // An AP bearing 100 deg from a receiver pointed at 80 deg is 20 deg off axis
//! assert_eq!(off_axis_azimuth_deg(80.0, 100.0), 20.0);
//! ```

use serde::{Deserialize, Serialize};

use crate::mask::MaskTable;

/// Parabolic main-beam pattern with sidelobe and backlobe floors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AntennaPattern {
    /// Boresight gain in dBi.
    pub g_max_dbi: f64,
    /// 3 dB beamwidth in azimuth, degrees.
    pub hpbw_az_deg: f64,
    /// 3 dB beamwidth in elevation, degrees.
    pub hpbw_el_deg: f64,
    /// Maximum per-plane attenuation before the sidelobe region takes over.
    pub sidelobe_floor_db: f64,
    /// Minimum gain anywhere, dBi.
    pub backlobe_floor_dbi: f64,
}

impl Default for AntennaPattern {
    fn default() -> Self {
        Self {
            g_max_dbi: 30.0,
            hpbw_az_deg: 3.0,
            hpbw_el_deg: 3.0,
            sidelobe_floor_db: 20.0,
            backlobe_floor_dbi: -10.0,
        }
    }
}

impl AntennaPattern {
    /// A pattern with the stock beamwidths but a specific boresight gain.
    pub fn with_gain(g_max_dbi: f64) -> Self {
        Self {
            g_max_dbi,
            ..Self::default()
        }
    }

    /// Effective gain at the given off-axis angles.
    ///
    /// Per-plane attenuation is `min(12·(Δ/HPBW)², sidelobe_floor)`; the two
    /// planes sum and the result clamps at the backlobe floor.
    pub fn effective_gain_dbi(&self, azimuth_offaxis_deg: f64, elevation_offaxis_deg: f64) -> f64 {
        let a_az =
            parabolic_attenuation_db(azimuth_offaxis_deg.abs(), self.hpbw_az_deg, self.sidelobe_floor_db);
        let a_el =
            parabolic_attenuation_db(elevation_offaxis_deg.abs(), self.hpbw_el_deg, self.sidelobe_floor_db);
        (self.g_max_dbi - (a_az + a_el)).max(self.backlobe_floor_dbi)
    }
}

fn parabolic_attenuation_db(delta_deg: f64, hpbw_deg: f64, sidelobe_floor_db: f64) -> f64 {
    if hpbw_deg <= 0.0 {
        return sidelobe_floor_db;
    }
    (12.0 * (delta_deg / hpbw_deg).powi(2)).min(sidelobe_floor_db)
}

/// Azimuth off-axis angle between an antenna boresight and a target bearing,
/// mapped to `[0, 180]` degrees.
pub fn off_axis_azimuth_deg(antenna_azimuth_deg: f64, bearing_to_target_deg: f64) -> f64 {
    (((bearing_to_target_deg - antenna_azimuth_deg + 180.0).rem_euclid(360.0)) - 180.0).abs()
}

/// RPE attenuation at an off-axis angle. An empty (absent) envelope applies
/// no discrimination.
pub fn rpe_attenuation_db(angle_deg: f64, rpe: &MaskTable) -> f64 {
    rpe.interpolate_db(angle_deg.abs()).unwrap_or(0.0)
}

/// Effective gain from azimuth + elevation RPE tables, clamped at the
/// backlobe floor.
pub fn combined_rpe_gain_dbi(
    g_max_dbi: f64,
    az_offaxis_deg: f64,
    el_offaxis_deg: f64,
    az_rpe: &MaskTable,
    el_rpe: &MaskTable,
    backlobe_floor_dbi: f64,
) -> f64 {
    let att = rpe_attenuation_db(az_offaxis_deg, az_rpe) + rpe_attenuation_db(el_offaxis_deg, el_rpe);
    (g_max_dbi - att).max(backlobe_floor_dbi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boresight_full_gain() {
        let p = AntennaPattern::default();
        assert_eq!(p.effective_gain_dbi(0.0, 0.0), 30.0);
    }

    #[test]
    fn test_half_power_at_half_beamwidth() {
        // At delta = HPBW/2 the parabolic model gives exactly 3 dB
        let p = AntennaPattern::default();
        let g = p.effective_gain_dbi(1.5, 0.0);
        assert!((g - 27.0).abs() < 1e-9, "gain at HPBW/2 = {g}, expected 27");
    }

    #[test]
    fn test_sidelobe_floor_per_plane() {
        let p = AntennaPattern::default();
        // 30 deg off a 3 deg beam hits the 20 dB sidelobe floor in one plane
        let g = p.effective_gain_dbi(30.0, 0.0);
        assert_eq!(g, 10.0);
        // Both planes at the floor: 30 - 40 = -10, the backlobe clamp
        let g2 = p.effective_gain_dbi(30.0, 30.0);
        assert_eq!(g2, -10.0);
    }

    #[test]
    fn test_backlobe_clamp() {
        let p = AntennaPattern {
            backlobe_floor_dbi: -6.0,
            ..AntennaPattern::default()
        };
        assert_eq!(p.effective_gain_dbi(180.0, 180.0), -6.0);
    }

    #[test]
    fn test_off_axis_wraps() {
        assert_eq!(off_axis_azimuth_deg(350.0, 10.0), 20.0);
        assert_eq!(off_axis_azimuth_deg(10.0, 350.0), 20.0);
        assert_eq!(off_axis_azimuth_deg(0.0, 180.0), 180.0);
        assert_eq!(off_axis_azimuth_deg(90.0, 90.0), 0.0);
    }

    #[test]
    fn test_off_axis_negative_bearing() {
        assert_eq!(off_axis_azimuth_deg(0.0, -30.0), 30.0);
    }

    #[test]
    fn test_rpe_interpolation_and_floor() {
        let az = MaskTable::from_points([(0.0, 0.0), (10.0, 25.0), (60.0, 40.0)]);
        let el = MaskTable::default();
        let g = combined_rpe_gain_dbi(38.0, 5.0, 0.0, &az, &el, -10.0);
        assert!((g - 25.5).abs() < 1e-9, "5 deg off: {g}, expected 38 - 12.5");

        // Way off axis both tables saturate, clamped at backlobe
        let g2 = combined_rpe_gain_dbi(38.0, 170.0, 0.0, &az, &el, -10.0);
        assert_eq!(g2, -2.0);
    }

    #[test]
    fn test_empty_rpe_applies_no_discrimination() {
        let g = combined_rpe_gain_dbi(30.0, 45.0, 0.0, &MaskTable::default(), &MaskTable::default(), -10.0);
        assert_eq!(g, 30.0);
    }

    #[test]
    fn test_rpe_uses_absolute_angle() {
        let az = MaskTable::from_points([(0.0, 0.0), (20.0, 30.0)]);
        assert_eq!(rpe_attenuation_db(-10.0, &az), 15.0);
    }
}
