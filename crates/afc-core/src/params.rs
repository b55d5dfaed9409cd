//! Parameter model — immutable per-jurisdiction protection parameters
//!
//! One [`AfcParams`] value bundles the incumbent-receiver defaults, the
//! regulatory EIRP cap and the ACIR mask tables. It is built once (by an
//! external loader), validated on construction, and passed by reference into
//! every evaluation — there is no process-global parameter state, so tests
//! and multi-tenant deployments can run different parameter sets
//! side by side.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{AfcError, AfcResult};
use crate::mask::MaskTable;

/// Default FS receiver characteristics applied when an incumbent record
/// leaves a field unset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IncumbentReceiverParams {
    /// Receiver noise figure in dB.
    pub noise_figure_db: f64,
    /// Reference noise bandwidth in Hz (last resort of the precedence chain).
    pub bandwidth_hz: f64,
    /// Boresight antenna gain in dBi.
    pub antenna_gain_dbi: f64,
    /// Receiver feeder/implementation losses in dB.
    pub rx_losses_db: f64,
    /// Polarization mismatch loss in dB.
    pub polarization_mismatch_db: f64,
}

impl Default for IncumbentReceiverParams {
    fn default() -> Self {
        Self {
            noise_figure_db: 4.5,
            bandwidth_hz: 20e6,
            antenna_gain_dbi: 30.0,
            rx_losses_db: 1.0,
            polarization_mismatch_db: 0.0,
        }
    }
}

/// Regulatory device limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegulatoryLimits {
    /// Maximum EIRP a standard-power device may be granted, dBm.
    pub max_eirp_dbm: f64,
}

impl Default for RegulatoryLimits {
    fn default() -> Self {
        Self { max_eirp_dbm: 36.0 }
    }
}

/// Sparse ACLR/ACS tables keyed by integer channel offset in MHz.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AcirSpec {
    /// Tx out-of-channel leakage attenuation by offset (ACLR-like).
    pub a_tx_db_by_offset_mhz: BTreeMap<i32, f64>,
    /// Rx selectivity attenuation by offset (ACS-like).
    pub a_rx_db_by_offset_mhz: BTreeMap<i32, f64>,
}

impl AcirSpec {
    pub fn new<T, R>(tx: T, rx: R) -> Self
    where
        T: IntoIterator<Item = (i32, f64)>,
        R: IntoIterator<Item = (i32, f64)>,
    {
        Self {
            a_tx_db_by_offset_mhz: tx.into_iter().collect(),
            a_rx_db_by_offset_mhz: rx.into_iter().collect(),
        }
    }

    /// Tx mask as an interpolation table.
    pub fn tx_mask(&self) -> MaskTable {
        MaskTable::from_offsets(self.a_tx_db_by_offset_mhz.iter().map(|(&k, &v)| (k, v)))
    }

    /// Rx mask as an interpolation table.
    pub fn rx_mask(&self) -> MaskTable {
        MaskTable::from_offsets(self.a_rx_db_by_offset_mhz.iter().map(|(&k, &v)| (k, v)))
    }
}

/// Validated, immutable parameter set for one evaluation batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AfcParams {
    pub incumbent: IncumbentReceiverParams,
    pub limits: RegulatoryLimits,
    pub acir: AcirSpec,
}

impl AfcParams {
    /// Construct a parameter set, enforcing the construction contracts:
    /// positive noise figure and bandwidth, a finite EIRP cap and non-empty
    /// ACIR tables.
    pub fn new(
        incumbent: IncumbentReceiverParams,
        limits: RegulatoryLimits,
        acir: AcirSpec,
    ) -> AfcResult<Self> {
        if incumbent.noise_figure_db <= 0.0 {
            return Err(AfcError::InvalidParameterSet(format!(
                "noise figure must be positive, got {} dB",
                incumbent.noise_figure_db
            )));
        }
        if incumbent.bandwidth_hz <= 0.0 {
            return Err(AfcError::InvalidParameterSet(format!(
                "reference bandwidth must be positive, got {} Hz",
                incumbent.bandwidth_hz
            )));
        }
        if !limits.max_eirp_dbm.is_finite() {
            return Err(AfcError::InvalidParameterSet(format!(
                "regulatory EIRP cap must be finite, got {}",
                limits.max_eirp_dbm
            )));
        }
        if acir.a_tx_db_by_offset_mhz.is_empty() || acir.a_rx_db_by_offset_mhz.is_empty() {
            return Err(AfcError::InvalidParameterSet(
                "ACIR tables must not be empty".into(),
            ));
        }
        Ok(Self {
            incumbent,
            limits,
            acir,
        })
    }

    /// Stock 6 GHz parameter set: 4.5 dB NF / 20 MHz receiver, 30 dBi
    /// boresight, 36 dBm cap, conservative two-point ACIR tables.
    pub fn default_6ghz() -> Self {
        Self {
            incumbent: IncumbentReceiverParams::default(),
            limits: RegulatoryLimits::default(),
            acir: AcirSpec::new([(20, 30.0), (40, 35.0)], [(20, 30.0), (40, 35.0)]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_acir() -> AcirSpec {
        AcirSpec::new([(20, 30.0)], [(20, 30.0)])
    }

    #[test]
    fn test_valid_construction() {
        let p = AfcParams::new(
            IncumbentReceiverParams::default(),
            RegulatoryLimits::default(),
            valid_acir(),
        );
        assert!(p.is_ok());
    }

    #[test]
    fn test_rejects_nonpositive_noise_figure() {
        let mut inc = IncumbentReceiverParams::default();
        inc.noise_figure_db = 0.0;
        let err = AfcParams::new(inc, RegulatoryLimits::default(), valid_acir()).unwrap_err();
        assert!(matches!(err, AfcError::InvalidParameterSet(_)));
    }

    #[test]
    fn test_rejects_nonpositive_bandwidth() {
        let mut inc = IncumbentReceiverParams::default();
        inc.bandwidth_hz = -1.0;
        assert!(AfcParams::new(inc, RegulatoryLimits::default(), valid_acir()).is_err());
    }

    #[test]
    fn test_rejects_infinite_cap() {
        let limits = RegulatoryLimits {
            max_eirp_dbm: f64::INFINITY,
        };
        assert!(AfcParams::new(IncumbentReceiverParams::default(), limits, valid_acir()).is_err());
    }

    #[test]
    fn test_rejects_empty_acir_tables() {
        let acir = AcirSpec {
            a_tx_db_by_offset_mhz: BTreeMap::new(),
            a_rx_db_by_offset_mhz: BTreeMap::from([(20, 30.0)]),
        };
        assert!(AfcParams::new(
            IncumbentReceiverParams::default(),
            RegulatoryLimits::default(),
            acir
        )
        .is_err());
    }

    #[test]
    fn test_default_6ghz_is_valid() {
        let p = AfcParams::default_6ghz();
        assert!(AfcParams::new(p.incumbent, p.limits, p.acir.clone()).is_ok());
    }

    #[test]
    fn test_masks_reflect_tables() {
        let p = AfcParams::default_6ghz();
        assert_eq!(p.acir.tx_mask().interpolate_db(20.0), Some(30.0));
        assert_eq!(p.acir.rx_mask().interpolate_db(40.0), Some(35.0));
    }
}
