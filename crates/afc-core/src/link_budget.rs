//! Link-budget primitives — decibel arithmetic for incumbent protection
//!
//! EIRP, thermal receiver noise, interference at the victim terminals, I/N
//! and the allowed-interference threshold. All quantities live in the
//! dBm/dB hybrid domain used by link-budget engineers; whenever powers must
//! be summed, the sum happens in linear milliwatts and comes back through
//! `10·log10`.
//!
//! # Example
//!
//! ```rust
//! use afc_core::link_budget::{eirp_dbm, noise_power_dbm, i_threshold_dbm};
//!
//! let eirp = eirp_dbm(30.0, 6.0, 1.0);
//! assert!((eirp - 35.0).abs() < 1e-12);
//!
//! // 20 MHz receiver with a 4.5 dB noise figure
//! let n = noise_power_dbm(20e6, 4.5).unwrap();
//! assert!((n - (-96.49)).abs() < 0.01);
//!
//! // I/N <= -6 dB protection criterion
//! let i_max = i_threshold_dbm(n, -6.0);
//! assert!(i_max < n);
//! ```

use crate::error::{AfcError, AfcResult};

/// Thermal noise density at 290 K in dBm/Hz.
pub const THERMAL_NOISE_DBM_PER_HZ: f64 = -174.0;

/// EIRP in dBm: `P_tx + G_tx − L_tx`.
pub fn eirp_dbm(p_tx_dbm: f64, g_tx_dbi: f64, l_tx_losses_db: f64) -> f64 {
    p_tx_dbm + g_tx_dbi - l_tx_losses_db
}

/// Receiver noise power in dBm: `−174 + 10·log10(B) + NF`.
///
/// Fails when the noise bandwidth is not positive.
pub fn noise_power_dbm(b_rx_hz: f64, nf_db: f64) -> AfcResult<f64> {
    if b_rx_hz <= 0.0 {
        return Err(AfcError::NonPositiveBandwidth(b_rx_hz));
    }
    Ok(THERMAL_NOISE_DBM_PER_HZ + 10.0 * b_rx_hz.log10() + nf_db)
}

/// Interference at the incumbent receiver terminals in dBm.
///
/// `I = EIRP − PL + G_rx − L_rx − L_pol`
pub fn interference_dbm(
    eirp_dbm: f64,
    path_loss_db: f64,
    g_rx_dbi: f64,
    l_rx_losses_db: f64,
    l_polarization_db: f64,
) -> f64 {
    eirp_dbm - path_loss_db + g_rx_dbi - l_rx_losses_db - l_polarization_db
}

/// I/N in dB.
pub fn inr_db(i_dbm: f64, n_dbm: f64) -> f64 {
    i_dbm - n_dbm
}

/// Allowed interference threshold: `I_thresh = N + INR_limit`.
///
/// The 6 GHz protection criterion uses `INR_limit = −6 dB`.
pub fn i_threshold_dbm(n_dbm: f64, inr_limit_db: f64) -> f64 {
    n_dbm + inr_limit_db
}

/// Interference margin `I_thresh − I`. Positive means protected.
pub fn interference_margin_db(i_dbm: f64, i_thresh_dbm: f64) -> f64 {
    i_thresh_dbm - i_dbm
}

/// dBm to linear milliwatts.
#[inline]
pub fn milliwatts_from_dbm(dbm: f64) -> f64 {
    10.0_f64.powf(dbm / 10.0)
}

/// Linear milliwatts to dBm. Zero (or negative) power maps to −∞ dBm.
#[inline]
pub fn dbm_from_milliwatts(mw: f64) -> f64 {
    if mw <= 0.0 {
        f64::NEG_INFINITY
    } else {
        10.0 * mw.log10()
    }
}
