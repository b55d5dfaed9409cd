//! Aggregate interference — many APs against each FS receiver
//!
//! Evaluates a deployed set of APs on one channel: each AP's contribution
//! at a protection site is computed with the same path-loss and
//! antenna-discrimination chain as the allocator, the contributions sum in
//! linear milliwatts, and the resulting I/N is checked against the
//! protection limit. An empty contribution set sums to −∞ dBm and passes
//! automatically.
//!
//! # Example
//!
//! ```rust
//! use afc_core::aggregate::aggregate_interference_dbm;
//!
//! // Two equal -100 dBm interferers add 3 dB
//! let agg = aggregate_interference_dbm(&[-100.0, -100.0]);
//! assert!((agg - (-96.99)).abs() < 0.01);
//! assert_eq!(aggregate_interference_dbm(&[]), f64::NEG_INFINITY);
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::acir::{acir_from_masks, merge_with_defaults};
use crate::antenna::{combined_rpe_gain_dbi, off_axis_azimuth_deg, AntennaPattern};
use crate::error::AfcResult;
use crate::fs_bandwidth::resolve_noise_bandwidth_hz;
use crate::geodesy::{haversine_distance_m, initial_bearing_deg};
use crate::grant_table::spectral_overlap_mhz;
use crate::incumbent::{expand_protection_sites, IncumbentRecord};
use crate::link_budget::{dbm_from_milliwatts, milliwatts_from_dbm, noise_power_dbm};
use crate::mask::MaskTable;
use crate::params::AfcParams;
use crate::propagation::{select_path_loss_db, Environment, ItmParams, PathModel};

/// One deployed AP: position and the EIRP it radiates on the channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApSite {
    pub lat: f64,
    pub lon: f64,
    pub eirp_dbm: f64,
}

/// Knobs of an aggregate evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateOptions {
    pub inr_limit_db: f64,
    pub environment: Option<Environment>,
    pub path_model: PathModel,
}

impl Default for AggregateOptions {
    fn default() -> Self {
        Self {
            inr_limit_db: -6.0,
            environment: None,
            path_model: PathModel::Auto,
        }
    }
}

/// Aggregate INR at one protection site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSiteResult {
    /// Protection-site id (passive sites suffixed `:PS<n>`).
    pub site_id: String,
    /// Aggregate interference in dBm; −∞ with no contributions.
    pub i_agg_dbm: f64,
    pub noise_dbm: f64,
    pub inr_db: f64,
    pub passes: bool,
    /// Per-AP contributions in dBm, AP input order.
    pub components_dbm: Vec<f64>,
}

/// Aggregate outcome for one channel across every site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateChannelSummary {
    pub center_mhz: f64,
    pub bandwidth_mhz: f64,
    /// Per-site results, incumbent input order.
    pub results: Vec<AggregateSiteResult>,
    /// Id of the site with the highest INR, if any site was evaluated.
    pub worst_site_id: Option<String>,
    pub worst_inr_db: f64,
    pub all_pass: bool,
}

/// Sum interference powers (dBm) in linear milliwatts and return dBm.
pub fn aggregate_interference_dbm(components_dbm: &[f64]) -> f64 {
    dbm_from_milliwatts(components_dbm.iter().map(|&c| milliwatts_from_dbm(c)).sum())
}

/// INR of an aggregate set of contributions against a noise power.
pub fn inr_db_from_components(components_dbm: &[f64], noise_dbm: f64) -> f64 {
    aggregate_interference_dbm(components_dbm) - noise_dbm
}

/// Evaluate aggregate INR on one channel for every protection site of every
/// incumbent, in input order.
pub fn evaluate_aggregate_inr_for_channel(
    params: Option<&AfcParams>,
    incumbents: &[IncumbentRecord],
    aps: &[ApSite],
    center_mhz: f64,
    bandwidth_mhz: f64,
    opts: &AggregateOptions,
) -> AfcResult<Vec<AggregateSiteResult>> {
    let nf_db = params.map_or(4.5, |p| p.incumbent.noise_figure_db);
    let l_rx_db = params.map_or(0.0, |p| p.incumbent.rx_losses_db);
    let default_pol_db = params.map_or(0.0, |p| p.incumbent.polarization_mismatch_db);
    let default_gain_dbi = params.map_or(30.0, |p| p.incumbent.antenna_gain_dbi);
    let default_bw_hz = params.map_or(20e6, |p| p.incumbent.bandwidth_hz);
    let (tx_mask, rx_mask) = match params {
        Some(p) => merge_with_defaults(&p.acir.tx_mask(), &p.acir.rx_mask()),
        None => merge_with_defaults(&MaskTable::default(), &MaskTable::default()),
    };

    let f_hz = center_mhz * 1e6;
    let sites = expand_protection_sites(incumbents);
    debug!(center_mhz, aps = aps.len(), sites = sites.len(), "aggregate evaluation");

    let mut results = Vec::with_capacity(sites.len());
    for site in &sites {
        let n_bw_hz = resolve_noise_bandwidth_hz(
            site.emission_designator.as_deref(),
            site.rx_noise_bandwidth_hz,
            Some(site.bandwidth_mhz * 1e6),
            default_bw_hz,
        );
        let n_dbm = noise_power_dbm(n_bw_hz, nf_db)?;

        let overlap = spectral_overlap_mhz(center_mhz, bandwidth_mhz, site.center_mhz, site.bandwidth_mhz);
        let acir_db = if overlap > 0.0 {
            None
        } else {
            let offset = (center_mhz - site.center_mhz).abs();
            Some(acir_from_masks(offset, &tx_mask, &rx_mask)?)
        };

        let mut components = Vec::with_capacity(aps.len());
        for ap in aps {
            let d_m = haversine_distance_m(ap.lat, ap.lon, site.lat, site.lon);
            let model = match (opts.path_model, site.height_m) {
                (PathModel::Itm(itm), Some(h)) => PathModel::Itm(ItmParams {
                    rx_height_m: h,
                    ..itm
                }),
                (m, _) => m,
            };
            let pl_db = select_path_loss_db(&model, d_m, f_hz, opts.environment, false, None)?;

            let brg = initial_bearing_deg(ap.lat, ap.lon, site.lat, site.lon);
            let delta_az = off_axis_azimuth_deg(site.azimuth_deg, (brg + 180.0) % 360.0);
            let g_max = site.gain_dbi.unwrap_or(default_gain_dbi);
            let g_eff = match (&site.rpe_az, &site.rpe_el) {
                (Some(az), el) => combined_rpe_gain_dbi(
                    g_max,
                    delta_az,
                    0.0,
                    az,
                    el.as_ref().unwrap_or(&MaskTable::default()),
                    -10.0,
                ),
                _ => AntennaPattern::with_gain(g_max).effective_gain_dbi(delta_az, 0.0),
            };

            let mut i_dbm = ap.eirp_dbm - pl_db + g_eff
                - l_rx_db
                - site.polarization_mismatch_db(default_pol_db);
            if let Some(acir) = acir_db {
                i_dbm -= acir;
            }
            components.push(i_dbm);
        }

        let i_agg_dbm = aggregate_interference_dbm(&components);
        let inr_db = i_agg_dbm - n_dbm;
        results.push(AggregateSiteResult {
            site_id: site.id.clone(),
            i_agg_dbm,
            noise_dbm: n_dbm,
            inr_db,
            passes: inr_db <= opts.inr_limit_db + 1e-9,
            components_dbm: components,
        });
    }
    Ok(results)
}

/// Evaluate several channels and attach a worst-case summary to each.
pub fn evaluate_aggregate_inr_across(
    params: Option<&AfcParams>,
    incumbents: &[IncumbentRecord],
    aps: &[ApSite],
    channels: &[(f64, f64)],
    opts: &AggregateOptions,
) -> AfcResult<Vec<AggregateChannelSummary>> {
    let mut summaries = Vec::with_capacity(channels.len());
    for &(center_mhz, bandwidth_mhz) in channels {
        let results =
            evaluate_aggregate_inr_for_channel(params, incumbents, aps, center_mhz, bandwidth_mhz, opts)?;
        let worst = results
            .iter()
            .max_by(|a, b| a.inr_db.partial_cmp(&b.inr_db).unwrap_or(std::cmp::Ordering::Equal));
        summaries.push(AggregateChannelSummary {
            center_mhz,
            bandwidth_mhz,
            worst_site_id: worst.map(|r| r.site_id.clone()),
            worst_inr_db: worst.map_or(f64::NEG_INFINITY, |r| r.inr_db),
            all_pass: results.iter().all(|r| r.passes),
            results,
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn incumbent() -> IncumbentRecord {
        IncumbentRecord {
            id: Some("FS_IST_6025_A".into()),
            center_mhz: 6025.0,
            bandwidth_mhz: 20.0,
            lat: 41.02,
            lon: 28.98,
            antenna_gain_dbi: None,
            azimuth_deg: None,
            antenna_height_m: None,
            polarization: None,
            rpe_az: None,
            rpe_el: None,
            emission_designator: None,
            rx_noise_bandwidth_hz: None,
            passive_sites: vec![],
        }
    }

    fn three_aps() -> Vec<ApSite> {
        vec![
            ApSite { lat: 41.015, lon: 28.979, eirp_dbm: 30.0 },
            ApSite { lat: 41.017, lon: 28.990, eirp_dbm: 27.0 },
            ApSite { lat: 41.010, lon: 28.975, eirp_dbm: 24.0 },
        ]
    }

    #[test]
    fn test_linear_sum_doubling() {
        let agg = aggregate_interference_dbm(&[-90.0, -90.0]);
        assert!((agg - (-86.9897)).abs() < 1e-3, "two equal terms add ~3 dB, got {agg}");
    }

    #[test]
    fn test_empty_sum_is_neg_infinity_and_passes() {
        assert_eq!(aggregate_interference_dbm(&[]), f64::NEG_INFINITY);
        let results = evaluate_aggregate_inr_for_channel(
            None,
            &[incumbent()],
            &[],
            6025.0,
            20.0,
            &AggregateOptions::default(),
        )
        .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].inr_db, f64::NEG_INFINITY);
        assert!(results[0].passes, "no interferers must pass automatically");
    }

    #[test]
    fn test_neg_infinity_component_drops_out() {
        let agg = aggregate_interference_dbm(&[f64::NEG_INFINITY, -90.0]);
        assert!((agg - (-90.0)).abs() < 1e-9);
    }

    #[test]
    fn test_cochannel_cluster_fails_adjacent_passes() {
        let opts = AggregateOptions {
            environment: Some(Environment::Urban),
            ..AggregateOptions::default()
        };
        let inc = [incumbent()];
        let co = evaluate_aggregate_inr_for_channel(None, &inc, &three_aps(), 6025.0, 20.0, &opts)
            .unwrap();
        assert!(!co[0].passes, "close co-channel cluster should fail, INR = {}", co[0].inr_db);

        let adj = evaluate_aggregate_inr_for_channel(None, &inc, &three_aps(), 6065.0, 20.0, &opts)
            .unwrap();
        assert!(
            adj[0].inr_db < co[0].inr_db - 25.0,
            "ACIR should knock the adjacent INR down: {} vs {}",
            adj[0].inr_db,
            co[0].inr_db
        );
    }

    #[test]
    fn test_components_in_ap_order_and_sum() {
        let results = evaluate_aggregate_inr_for_channel(
            None,
            &[incumbent()],
            &three_aps(),
            6025.0,
            20.0,
            &AggregateOptions::default(),
        )
        .unwrap();
        let r = &results[0];
        assert_eq!(r.components_dbm.len(), 3);
        let manual = aggregate_interference_dbm(&r.components_dbm);
        assert!((manual - r.i_agg_dbm).abs() < 1e-9);
        assert!((r.inr_db - (r.i_agg_dbm - r.noise_dbm)).abs() < 1e-12);
    }

    #[test]
    fn test_results_in_input_order() {
        let mut far = incumbent();
        far.id = Some("FS_FAR".into());
        far.lat = 42.0;
        let results = evaluate_aggregate_inr_for_channel(
            None,
            &[far, incumbent()],
            &three_aps(),
            6025.0,
            20.0,
            &AggregateOptions::default(),
        )
        .unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.site_id.as_str()).collect();
        assert_eq!(ids, ["FS_FAR", "FS_IST_6025_A"]);
    }

    #[test]
    fn test_worst_case_summary() {
        let mut far = incumbent();
        far.id = Some("FS_FAR".into());
        far.lat = 42.0;
        let summaries = evaluate_aggregate_inr_across(
            None,
            &[far, incumbent()],
            &three_aps(),
            &[(6025.0, 20.0), (6065.0, 20.0)],
            &AggregateOptions::default(),
        )
        .unwrap();
        assert_eq!(summaries.len(), 2);
        let s = &summaries[0];
        assert_eq!(s.worst_site_id.as_deref(), Some("FS_IST_6025_A"));
        assert!((s.worst_inr_db - s.results[1].inr_db).abs() < 1e-12);
        assert_eq!(s.all_pass, s.results.iter().all(|r| r.passes));
    }

    #[test]
    fn test_params_noise_bandwidth_precedence() {
        // An emission designator on the record must win over channel bandwidth
        let mut inc = incumbent();
        inc.emission_designator = Some("10M0F7W".into());
        let with_ed = evaluate_aggregate_inr_for_channel(
            None,
            &[inc],
            &three_aps(),
            6025.0,
            20.0,
            &AggregateOptions::default(),
        )
        .unwrap();
        let without = evaluate_aggregate_inr_for_channel(
            None,
            &[incumbent()],
            &three_aps(),
            6025.0,
            20.0,
            &AggregateOptions::default(),
        )
        .unwrap();
        // Half the bandwidth -> 3 dB less noise
        let dn = without[0].noise_dbm - with_ed[0].noise_dbm;
        assert!((dn - 3.0103).abs() < 1e-3, "noise delta = {dn}");
    }
}
