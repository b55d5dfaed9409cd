//! Grant table — most-restrictive allowed EIRP per Wi-Fi channel
//!
//! The innermost loop of the AFC engine. For every candidate channel
//! (center frequency, bandwidth) the [`Evaluator`] walks every protection
//! site of every incumbent: geometry → path loss → antenna discrimination →
//! noise → spectral-overlap classification → ACIR → single-path allocation,
//! and keeps the minimum allowed EIRP together with which site limited it.
//! The per-site loop is a commutative minimum, so channels can be evaluated
//! in parallel against the read-only parameter set (see the `parallel`
//! feature).
//!
//! # Example
//!
//! ```rust
//! use afc_core::grant_table::{ApPlacement, EvalOptions, Evaluator};
//! use afc_core::params::AfcParams;
//!
//! let params = AfcParams::default_6ghz();
//! let eval = Evaluator::new(&params, &[], EvalOptions::default());
//! let ap = ApPlacement::FixedDistance { distance_m: 3000.0 };
//! let rows = eval.build_grant_table(&ap, 5925.0, 6025.0, &[20.0]).unwrap();
//! assert!(!rows.is_empty());
//! // With no incumbents every channel rides the regulatory cap
//! assert!(rows.iter().all(|r| r.allowed_eirp_dbm == 36.0));
//! ```

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::acir::{acir_from_masks, merge_with_defaults};
use crate::allocator::{allowed_eirp_dbm_for_path, psd_from_eirp_dbm};
use crate::antenna::{combined_rpe_gain_dbi, off_axis_azimuth_deg, AntennaPattern};
use crate::error::AfcResult;
use crate::fs_bandwidth::resolve_for_site;
use crate::geodesy::{haversine_distance_m, initial_bearing_deg};
use crate::incumbent::{expand_protection_sites, IncumbentRecord, ProtectionSite};
use crate::link_budget::noise_power_dbm;
use crate::mask::MaskTable;
use crate::params::AfcParams;
use crate::propagation::{select_path_loss_db, Environment, ItmParams, PathModel};

/// The 6 GHz channel grid is anchored at channel 1's center.
pub const GRID_ORIGIN_MHZ: f64 = 5955.0;

/// UNII-5 block (MHz).
pub const UNII_5_MHZ: (f64, f64) = (5925.0, 6425.0);
/// UNII-7 block (MHz).
pub const UNII_7_MHZ: (f64, f64) = (6525.0, 6875.0);

/// The channelable 6 GHz blocks, skipping the UNII-6 gap.
pub fn six_ghz_band_blocks() -> [(f64, f64); 2] {
    [UNII_5_MHZ, UNII_7_MHZ]
}

/// Channel centers (MHz) within `[lower, upper]` for one bandwidth.
///
/// Centers sit on the 5955-anchored grid stepped by the bandwidth, and a
/// center is only emitted when the whole channel fits inside the band.
pub fn enumerate_centers_mhz(lower_mhz: f64, upper_mhz: f64, bandwidth_mhz: f64) -> Vec<f64> {
    let mut centers = Vec::new();
    if bandwidth_mhz <= 0.0 {
        return centers;
    }
    let step = bandwidth_mhz;
    let n0 = ((lower_mhz - GRID_ORIGIN_MHZ + step - 1e-9) / step).floor();
    let mut c = GRID_ORIGIN_MHZ + n0 * step;
    while c + bandwidth_mhz / 2.0 <= upper_mhz + 1e-9 {
        let lo = c - bandwidth_mhz / 2.0;
        let hi = c + bandwidth_mhz / 2.0;
        if lo >= lower_mhz - 1e-9 && hi <= upper_mhz + 1e-9 {
            centers.push(c);
        }
        c += step;
    }
    centers
}

/// 6 GHz channel number: `f_center = 5955 + 5·(ch − 1)`.
pub fn channel_number_from_center_mhz(center_mhz: f64) -> i32 {
    (1.0 + (center_mhz - GRID_ORIGIN_MHZ) / 5.0).round() as i32
}

/// Spectral overlap in MHz between an AP channel and an FS channel;
/// non-positive means disjoint.
pub fn spectral_overlap_mhz(
    center_mhz: f64,
    bandwidth_mhz: f64,
    fs_center_mhz: f64,
    fs_bandwidth_mhz: f64,
) -> f64 {
    let ch_hi = center_mhz + bandwidth_mhz / 2.0;
    let ch_lo = center_mhz - bandwidth_mhz / 2.0;
    let fs_hi = fs_center_mhz + fs_bandwidth_mhz / 2.0;
    let fs_lo = fs_center_mhz - fs_bandwidth_mhz / 2.0;
    ch_hi.min(fs_hi) - ch_lo.max(fs_lo)
}

/// Minimum usable device power; channels allocated below either floor are
/// denied rather than granted at an unusable level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceConstraints {
    pub min_eirp_dbm: f64,
    pub min_psd_dbm_per_mhz: f64,
}

impl Default for DeviceConstraints {
    fn default() -> Self {
        Self {
            min_eirp_dbm: 0.0,
            min_psd_dbm_per_mhz: -10.0,
        }
    }
}

/// Grant decision for one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Grant,
    Deny,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Decision::Grant => "grant",
            Decision::Deny => "deny",
        })
    }
}

/// Whether the limiting constraint was co-channel or adjacent-channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LimitingMode {
    Co,
    Adj,
}

/// One decision entry of the grant table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrantRow {
    pub channel_number: i32,
    pub center_mhz: f64,
    pub bandwidth_mhz: f64,
    /// Offset to the limiting FS center, rounded MHz (legacy trace field).
    pub offset_mhz: i32,
    /// Path loss of the limiting path; +inf when nothing constrains.
    pub path_loss_db: f64,
    pub noise_dbm: f64,
    pub allowed_eirp_dbm: f64,
    pub allowed_psd_dbm_per_mhz: f64,
    pub decision: Decision,
    /// Site that set the minimum, `None` when the regulatory cap binds.
    pub limiting_incumbent: Option<String>,
    pub limiting_mode: Option<LimitingMode>,
    pub acir_db_used: Option<f64>,
}

/// AP placement: real coordinates, or a fixed distance to every site for
/// hypothetical what-if tables (no bearing, so boresight gain applies).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApPlacement {
    Coordinates { lat: f64, lon: f64 },
    FixedDistance { distance_m: f64 },
}

/// Knobs of one evaluation batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalOptions {
    /// I/N protection criterion in dB.
    pub inr_limit_db: f64,
    /// Extra protection margin subtracted from the criterion.
    pub protection_margin_db: f64,
    pub environment: Option<Environment>,
    pub path_model: PathModel,
    pub indoor: bool,
    pub penetration_db: Option<f64>,
    pub constraints: DeviceConstraints,
    /// Caller override for the FS noise bandwidth (explicit-bandwidth slot
    /// of the precedence chain).
    pub fs_bandwidth_override_hz: Option<f64>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            inr_limit_db: -6.0,
            protection_margin_db: 0.0,
            environment: None,
            path_model: PathModel::Auto,
            indoor: false,
            penetration_db: None,
            constraints: DeviceConstraints::default(),
            fs_bandwidth_override_hz: None,
        }
    }
}

/// Outcome of evaluating one (center, bandwidth) pair across all sites.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelEvaluation {
    pub allowed_eirp_dbm: f64,
    pub path_loss_db: f64,
    pub noise_dbm: f64,
    pub offset_mhz: i32,
    pub limiting_incumbent: Option<String>,
    pub limiting_mode: Option<LimitingMode>,
    pub acir_db_used: Option<f64>,
}

/// Per-request evaluation context: expanded protection sites plus the ACIR
/// interpolators, built once and shared across every channel.
#[derive(Debug, Clone)]
pub struct Evaluator<'a> {
    params: &'a AfcParams,
    sites: Vec<ProtectionSite>,
    tx_mask: MaskTable,
    rx_mask: MaskTable,
    opts: EvalOptions,
}

impl<'a> Evaluator<'a> {
    pub fn new(params: &'a AfcParams, incumbents: &[IncumbentRecord], opts: EvalOptions) -> Self {
        let (tx_mask, rx_mask) = merge_with_defaults(&params.acir.tx_mask(), &params.acir.rx_mask());
        Self {
            params,
            sites: expand_protection_sites(incumbents),
            tx_mask,
            rx_mask,
            opts,
        }
    }

    pub fn options(&self) -> &EvalOptions {
        &self.opts
    }

    /// Number of protection sites after incumbent expansion.
    pub fn site_count(&self) -> usize {
        self.sites.len()
    }

    /// Evaluate one channel against every protection site and keep the most
    /// restrictive allocation.
    pub fn evaluate_channel(
        &self,
        ap: &ApPlacement,
        center_mhz: f64,
        bandwidth_mhz: f64,
    ) -> AfcResult<ChannelEvaluation> {
        let inr_limit = self.opts.inr_limit_db - self.opts.protection_margin_db;
        let cap = self.params.limits.max_eirp_dbm;

        let mut worst: Option<(f64, &ProtectionSite, f64, f64, LimitingMode, Option<f64>)> = None;
        for site in &self.sites {
            let (eirp, pl, n_dbm, mode, acir) =
                self.evaluate_path(ap, site, center_mhz, bandwidth_mhz, inr_limit)?;
            match worst {
                Some((best, ..)) if eirp >= best => {}
                _ => worst = Some((eirp, site, pl, n_dbm, mode, acir)),
            }
        }

        Ok(match worst {
            Some((eirp, site, pl, n_dbm, mode, acir)) => {
                let capped = eirp.min(cap);
                let cap_binds = eirp >= cap;
                ChannelEvaluation {
                    allowed_eirp_dbm: capped,
                    path_loss_db: pl,
                    noise_dbm: n_dbm,
                    offset_mhz: (center_mhz - site.center_mhz).abs().round() as i32,
                    limiting_incumbent: (!cap_binds).then(|| site.id.clone()),
                    limiting_mode: (!cap_binds).then_some(mode),
                    acir_db_used: if cap_binds { None } else { acir },
                }
            }
            // No protection sites: the regulatory cap is the only constraint.
            None => ChannelEvaluation {
                allowed_eirp_dbm: cap,
                path_loss_db: f64::INFINITY,
                noise_dbm: noise_power_dbm(
                    self.params.incumbent.bandwidth_hz,
                    self.params.incumbent.noise_figure_db,
                )?,
                offset_mhz: 0,
                limiting_incumbent: None,
                limiting_mode: None,
                acir_db_used: None,
            },
        })
    }

    /// One AP → site path: geometry, path loss, discrimination, noise,
    /// co/adjacent classification and the single-path allocation (uncapped;
    /// the caller applies the regulatory cap after the min).
    fn evaluate_path(
        &self,
        ap: &ApPlacement,
        site: &ProtectionSite,
        center_mhz: f64,
        bandwidth_mhz: f64,
        inr_limit_db: f64,
    ) -> AfcResult<(f64, f64, f64, LimitingMode, Option<f64>)> {
        let f_hz = center_mhz * 1e6;

        let (distance_m, bearing_deg) = match *ap {
            ApPlacement::Coordinates { lat, lon } => (
                haversine_distance_m(lat, lon, site.lat, site.lon),
                Some(initial_bearing_deg(lat, lon, site.lat, site.lon)),
            ),
            ApPlacement::FixedDistance { distance_m } => (distance_m, None),
        };

        // ITM takes the site's antenna height when the record carries one.
        let model = match (self.opts.path_model, site.height_m) {
            (PathModel::Itm(itm), Some(h)) => PathModel::Itm(ItmParams {
                rx_height_m: h,
                ..itm
            }),
            (m, _) => m,
        };
        let pl_db = select_path_loss_db(
            &model,
            distance_m,
            f_hz,
            self.opts.environment,
            self.opts.indoor,
            self.opts.penetration_db,
        )?;

        let g_max = site
            .gain_dbi
            .unwrap_or(self.params.incumbent.antenna_gain_dbi);
        let g_eff = match bearing_deg {
            Some(brg) => {
                // The site looks back along the reciprocal bearing.
                let delta_az = off_axis_azimuth_deg(site.azimuth_deg, (brg + 180.0) % 360.0);
                match (&site.rpe_az, &site.rpe_el) {
                    (Some(az), el) => combined_rpe_gain_dbi(
                        g_max,
                        delta_az,
                        0.0,
                        az,
                        el.as_ref().unwrap_or(&MaskTable::default()),
                        -10.0,
                    ),
                    _ => AntennaPattern::with_gain(g_max).effective_gain_dbi(delta_az, 0.0),
                }
            }
            None => g_max,
        };

        let n_bw_hz = resolve_for_site(site, self.opts.fs_bandwidth_override_hz, self.params);
        let n_dbm = noise_power_dbm(n_bw_hz, self.params.incumbent.noise_figure_db)?;

        let overlap = spectral_overlap_mhz(center_mhz, bandwidth_mhz, site.center_mhz, site.bandwidth_mhz);
        let (mode, acir_db) = if overlap > 0.0 {
            (LimitingMode::Co, None)
        } else {
            let offset = (center_mhz - site.center_mhz).abs();
            (
                LimitingMode::Adj,
                Some(acir_from_masks(offset, &self.tx_mask, &self.rx_mask)?),
            )
        };

        let eirp = allowed_eirp_dbm_for_path(
            n_dbm,
            inr_limit_db,
            pl_db,
            g_eff,
            self.params.incumbent.rx_losses_db,
            site.polarization_mismatch_db(self.params.incumbent.polarization_mismatch_db),
            acir_db,
            None,
        );

        Ok((eirp, pl_db, n_dbm, mode, acir_db))
    }

    /// Evaluate one channel and fold in PSD and the device-floor decision.
    pub fn grant_row(
        &self,
        ap: &ApPlacement,
        center_mhz: f64,
        bandwidth_mhz: f64,
    ) -> AfcResult<GrantRow> {
        let eval = self.evaluate_channel(ap, center_mhz, bandwidth_mhz)?;
        let psd = psd_from_eirp_dbm(eval.allowed_eirp_dbm, bandwidth_mhz)?;
        let cons = &self.opts.constraints;
        let decision = if eval.allowed_eirp_dbm >= cons.min_eirp_dbm
            && psd >= cons.min_psd_dbm_per_mhz
        {
            Decision::Grant
        } else {
            Decision::Deny
        };
        Ok(GrantRow {
            channel_number: channel_number_from_center_mhz(center_mhz),
            center_mhz,
            bandwidth_mhz,
            offset_mhz: eval.offset_mhz,
            path_loss_db: eval.path_loss_db,
            noise_dbm: eval.noise_dbm,
            allowed_eirp_dbm: eval.allowed_eirp_dbm,
            allowed_psd_dbm_per_mhz: psd,
            decision,
            limiting_incumbent: eval.limiting_incumbent,
            limiting_mode: eval.limiting_mode,
            acir_db_used: eval.acir_db_used,
        })
    }

    /// Grant table over one band range and a set of bandwidths.
    pub fn build_grant_table(
        &self,
        ap: &ApPlacement,
        lower_mhz: f64,
        upper_mhz: f64,
        bandwidths_mhz: &[f64],
    ) -> AfcResult<Vec<GrantRow>> {
        debug!(
            lower_mhz,
            upper_mhz,
            sites = self.sites.len(),
            "building grant table"
        );
        let mut rows = Vec::new();
        for &bw in bandwidths_mhz {
            for center in enumerate_centers_mhz(lower_mhz, upper_mhz, bw) {
                rows.push(self.grant_row(ap, center, bw)?);
            }
        }
        Ok(rows)
    }

    /// Grant table across several band blocks (e.g. UNII-5 + UNII-7).
    pub fn build_grant_table_blocks(
        &self,
        ap: &ApPlacement,
        blocks: &[(f64, f64)],
        bandwidths_mhz: &[f64],
    ) -> AfcResult<Vec<GrantRow>> {
        let mut rows = Vec::new();
        for &(lo, hi) in blocks {
            rows.extend(self.build_grant_table(ap, lo, hi, bandwidths_mhz)?);
        }
        Ok(rows)
    }

    /// Parallel grant table over channel centers. Row order matches the
    /// sequential builder; safe because the evaluator is read-only.
    #[cfg(feature = "parallel")]
    pub fn build_grant_table_par(
        &self,
        ap: &ApPlacement,
        lower_mhz: f64,
        upper_mhz: f64,
        bandwidths_mhz: &[f64],
    ) -> AfcResult<Vec<GrantRow>> {
        use rayon::prelude::*;
        let jobs: Vec<(f64, f64)> = bandwidths_mhz
            .iter()
            .flat_map(|&bw| {
                enumerate_centers_mhz(lower_mhz, upper_mhz, bw)
                    .into_iter()
                    .map(move |c| (c, bw))
            })
            .collect();
        jobs.par_iter()
            .map(|&(center, bw)| self.grant_row(ap, center, bw))
            .collect()
    }
}
