//! Incumbent records — fixed-service receivers and their protection sites
//!
//! A typed replacement for the loosely-keyed ULS-style records AFC feeds
//! arrive as. Field aliases (`rx_lat` vs `lat`, `freq_center_mhz` vs
//! `center_mhz`, ...) normalize at the deserialization boundary and unknown
//! fields are rejected outright. A record expands into one or more
//! [`ProtectionSite`]s: the primary receiver plus any passive repeaters,
//! each imposing an independent protection constraint.

use serde::{Deserialize, Serialize};

use crate::mask::MaskTable;

/// Linear polarization tag of an FS antenna.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarization {
    #[serde(rename = "H", alias = "h")]
    Horizontal,
    #[serde(rename = "V", alias = "v")]
    Vertical,
}

/// A passive repeater (billboard reflector / back-to-back antenna) attached
/// to an FS link. Unset fields inherit from the primary receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PassiveSite {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub gain_dbi: Option<f64>,
    #[serde(default, alias = "az_deg")]
    pub azimuth_deg: Option<f64>,
    #[serde(default)]
    pub height_m: Option<f64>,
    #[serde(default)]
    pub polarization: Option<Polarization>,
    #[serde(default)]
    pub rpe_az: Option<MaskTable>,
    #[serde(default)]
    pub rpe_el: Option<MaskTable>,
}

/// One registered FS receiver record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IncumbentRecord {
    /// Link identifier (call sign / path id).
    #[serde(default, alias = "link_id")]
    pub id: Option<String>,
    /// FS channel center frequency in MHz.
    #[serde(alias = "freq_center_mhz", alias = "fs_center_mhz")]
    pub center_mhz: f64,
    /// FS channel bandwidth in MHz.
    #[serde(alias = "fs_bandwidth_mhz")]
    pub bandwidth_mhz: f64,
    /// Receiver latitude in degrees.
    #[serde(alias = "rx_lat")]
    pub lat: f64,
    /// Receiver longitude in degrees.
    #[serde(alias = "rx_lon")]
    pub lon: f64,
    /// Boresight gain in dBi; parameter-set default when unset.
    #[serde(default, alias = "rx_antenna_gain_dbi", alias = "rx_gain_dbi")]
    pub antenna_gain_dbi: Option<f64>,
    /// Antenna azimuth, degrees from true north.
    #[serde(default, alias = "rx_antenna_azimuth_deg", alias = "rx_azimuth_deg")]
    pub azimuth_deg: Option<f64>,
    /// Antenna height above ground in meters.
    #[serde(default, alias = "rx_antenna_height_m")]
    pub antenna_height_m: Option<f64>,
    #[serde(default)]
    pub polarization: Option<Polarization>,
    /// Azimuth radiation pattern envelope `(angle_deg, att_dB)`.
    #[serde(default, alias = "rx_rpe_az")]
    pub rpe_az: Option<MaskTable>,
    /// Elevation radiation pattern envelope.
    #[serde(default, alias = "rx_rpe_el")]
    pub rpe_el: Option<MaskTable>,
    /// ULS emission designator, e.g. `25M0F7W`.
    #[serde(default)]
    pub emission_designator: Option<String>,
    /// Explicit receiver noise bandwidth in Hz, when known.
    #[serde(default)]
    pub rx_noise_bandwidth_hz: Option<f64>,
    /// Passive repeaters protected alongside the primary receiver.
    #[serde(default)]
    pub passive_sites: Vec<PassiveSite>,
}

/// A single protection constraint: the primary FS receiver or one passive
/// site, with inheritance already applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ProtectionSite {
    pub id: String,
    pub center_mhz: f64,
    pub bandwidth_mhz: f64,
    pub lat: f64,
    pub lon: f64,
    pub gain_dbi: Option<f64>,
    pub azimuth_deg: f64,
    pub height_m: Option<f64>,
    pub polarization: Option<Polarization>,
    pub rpe_az: Option<MaskTable>,
    pub rpe_el: Option<MaskTable>,
    pub emission_designator: Option<String>,
    pub rx_noise_bandwidth_hz: Option<f64>,
}

impl ProtectionSite {
    /// Polarization mismatch toward an arbitrarily-oriented AP: 3 dB
    /// cross-pol discrimination when the FS polarization is known, else the
    /// parameter-set default.
    pub fn polarization_mismatch_db(&self, default_db: f64) -> f64 {
        if self.polarization.is_some() {
            3.0
        } else {
            default_db
        }
    }
}

impl IncumbentRecord {
    /// Expand the record into its protection sites: the primary receiver
    /// first, then passive sites in declaration order with ids suffixed
    /// `:PS1`, `:PS2`, ...
    pub fn protection_sites(&self) -> Vec<ProtectionSite> {
        let root_id = self.id.clone().unwrap_or_else(|| "unknown".into());
        let mut sites = Vec::with_capacity(1 + self.passive_sites.len());
        sites.push(ProtectionSite {
            id: root_id.clone(),
            center_mhz: self.center_mhz,
            bandwidth_mhz: self.bandwidth_mhz,
            lat: self.lat,
            lon: self.lon,
            gain_dbi: self.antenna_gain_dbi,
            azimuth_deg: self.azimuth_deg.unwrap_or(0.0),
            height_m: self.antenna_height_m,
            polarization: self.polarization,
            rpe_az: self.rpe_az.clone(),
            rpe_el: self.rpe_el.clone(),
            emission_designator: self.emission_designator.clone(),
            rx_noise_bandwidth_hz: self.rx_noise_bandwidth_hz,
        });
        for (n, ps) in self.passive_sites.iter().enumerate() {
            sites.push(ProtectionSite {
                id: format!("{}:PS{}", root_id, n + 1),
                center_mhz: self.center_mhz,
                bandwidth_mhz: self.bandwidth_mhz,
                lat: ps.lat,
                lon: ps.lon,
                gain_dbi: ps.gain_dbi.or(self.antenna_gain_dbi),
                azimuth_deg: ps
                    .azimuth_deg
                    .or(self.azimuth_deg)
                    .unwrap_or(0.0),
                height_m: ps.height_m.or(self.antenna_height_m),
                polarization: ps.polarization.or(self.polarization),
                rpe_az: ps.rpe_az.clone().or_else(|| self.rpe_az.clone()),
                rpe_el: ps.rpe_el.clone().or_else(|| self.rpe_el.clone()),
                emission_designator: self.emission_designator.clone(),
                rx_noise_bandwidth_hz: self.rx_noise_bandwidth_hz,
            });
        }
        sites
    }
}

/// Expand a batch of records into a flat site list, preserving input order.
pub fn expand_protection_sites(incumbents: &[IncumbentRecord]) -> Vec<ProtectionSite> {
    incumbents
        .iter()
        .flat_map(IncumbentRecord::protection_sites)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> IncumbentRecord {
        IncumbentRecord {
            id: Some("FS_IST_6025_A".into()),
            center_mhz: 6025.0,
            bandwidth_mhz: 20.0,
            lat: 41.02,
            lon: 28.98,
            antenna_gain_dbi: Some(34.0),
            azimuth_deg: Some(120.0),
            antenna_height_m: Some(45.0),
            polarization: Some(Polarization::Horizontal),
            rpe_az: None,
            rpe_el: None,
            emission_designator: Some("25M0F7W".into()),
            rx_noise_bandwidth_hz: None,
            passive_sites: vec![PassiveSite {
                lat: 41.05,
                lon: 29.01,
                gain_dbi: None,
                azimuth_deg: Some(300.0),
                height_m: None,
                polarization: None,
                rpe_az: None,
                rpe_el: None,
            }],
        }
    }

    #[test]
    fn test_expansion_primary_plus_passive() {
        let sites = record().protection_sites();
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].id, "FS_IST_6025_A");
        assert_eq!(sites[1].id, "FS_IST_6025_A:PS1");
    }

    #[test]
    fn test_passive_inherits_unset_fields() {
        let sites = record().protection_sites();
        let ps = &sites[1];
        assert_eq!(ps.gain_dbi, Some(34.0), "gain inherited from primary");
        assert_eq!(ps.azimuth_deg, 300.0, "own azimuth wins");
        assert_eq!(ps.height_m, Some(45.0));
        assert_eq!(ps.polarization, Some(Polarization::Horizontal));
        assert_eq!(ps.center_mhz, 6025.0);
    }

    #[test]
    fn test_missing_id_defaults_to_unknown() {
        let mut rec = record();
        rec.id = None;
        let sites = rec.protection_sites();
        assert_eq!(sites[0].id, "unknown");
        assert_eq!(sites[1].id, "unknown:PS1");
    }

    #[test]
    fn test_alias_normalization() {
        let json = r#"{
            "link_id": "L1",
            "freq_center_mhz": 6100.0,
            "bandwidth_mhz": 40.0,
            "rx_lat": 41.0,
            "rx_lon": 29.0,
            "rx_antenna_gain_dbi": 32.0,
            "rx_antenna_azimuth_deg": 210.0
        }"#;
        let rec: IncumbentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.id.as_deref(), Some("L1"));
        assert_eq!(rec.center_mhz, 6100.0);
        assert_eq!(rec.antenna_gain_dbi, Some(32.0));
        assert_eq!(rec.azimuth_deg, Some(210.0));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let json = r#"{
            "center_mhz": 6100.0,
            "bandwidth_mhz": 40.0,
            "lat": 41.0,
            "lon": 29.0,
            "frobnicate": 1
        }"#;
        assert!(serde_json::from_str::<IncumbentRecord>(json).is_err());
    }

    #[test]
    fn test_rpe_table_roundtrip() {
        let json = r#"{
            "center_mhz": 6100.0,
            "bandwidth_mhz": 40.0,
            "lat": 41.0,
            "lon": 29.0,
            "rpe_az": [[0.0, 0.0], [10.0, 25.0]]
        }"#;
        let rec: IncumbentRecord = serde_json::from_str(json).unwrap();
        let rpe = rec.rpe_az.unwrap();
        assert_eq!(rpe.interpolate_db(5.0), Some(12.5));
    }

    #[test]
    fn test_polarization_mismatch_placeholder() {
        let sites = record().protection_sites();
        assert_eq!(sites[0].polarization_mismatch_db(0.5), 3.0);
        let mut rec = record();
        rec.polarization = None;
        rec.passive_sites.clear();
        assert_eq!(rec.protection_sites()[0].polarization_mismatch_db(0.5), 0.5);
    }

    #[test]
    fn test_batch_expansion_order() {
        let mut second = record();
        second.id = Some("B".into());
        second.passive_sites.clear();
        let sites = expand_protection_sites(&[record(), second]);
        let ids: Vec<_> = sites.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["FS_IST_6025_A", "FS_IST_6025_A:PS1", "B"]);
    }
}
