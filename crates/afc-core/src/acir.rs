//! ACIR engine — adjacent-channel interference ratio from sparse masks
//!
//! Combines the transmitter out-of-channel leakage mask (ACLR-like) and the
//! receiver selectivity mask (ACS-like) into an effective ACIR at an
//! arbitrary center-frequency offset. Each mask is interpolated separately,
//! then the two leak paths combine like parallel resistors in the linear
//! domain:
//!
//! ```text
//! ACIR_lin = 1 / (10^(-A_tx/10) + 10^(-A_rx/10))
//! ```
//!
//! # Example
//!
//! ```rust
//! use afc_core::acir::{acir_db, acir_from_masks};
//! use afc_core::mask::MaskTable;
//!
//! // Equal 30 dB masks combine ~3 dB below either one
//! assert!((acir_db(30.0, 30.0) - 26.99).abs() < 0.01);
//!
//! let tx = MaskTable::from_offsets([(20, 30.0), (40, 35.0)]);
//! let rx = MaskTable::from_offsets([(20, 30.0), (40, 35.0)]);
//! let a20 = acir_from_masks(20.0, &tx, &rx).unwrap();
//! let a40 = acir_from_masks(40.0, &tx, &rx).unwrap();
//! assert!(a40 > a20);
//! ```

use crate::error::{AfcError, AfcResult};
use crate::mask::MaskTable;

/// ACIR in dB from Tx leakage and Rx selectivity attenuations.
pub fn acir_db(a_tx_db: f64, a_rx_db: f64) -> f64 {
    let a_tx_lin = 10.0_f64.powf(-a_tx_db / 10.0);
    let a_rx_lin = 10.0_f64.powf(-a_rx_db / 10.0);
    -10.0 * (a_tx_lin + a_rx_lin).log10()
}

/// ACIR at a center-frequency offset from two mask tables.
///
/// Each mask interpolates independently at the offset; empty tables are a
/// programming error.
pub fn acir_from_masks(
    offset_mhz: f64,
    tx_mask: &MaskTable,
    rx_mask: &MaskTable,
) -> AfcResult<f64> {
    let a_tx = tx_mask
        .interpolate_db(offset_mhz)
        .ok_or(AfcError::EmptyMaskTable("tx leakage"))?;
    let a_rx = rx_mask
        .interpolate_db(offset_mhz)
        .ok_or(AfcError::EmptyMaskTable("rx selectivity"))?;
    Ok(acir_db(a_tx, a_rx))
}

/// Built-in conservative Tx leakage floor for 6 GHz devices.
pub fn default_tx_mask() -> MaskTable {
    MaskTable::from_offsets([
        (10, 20.0),
        (20, 30.0),
        (30, 33.0),
        (40, 35.0),
        (80, 45.0),
        (120, 50.0),
    ])
}

/// Built-in conservative Rx selectivity floor for FS receivers.
pub fn default_rx_mask() -> MaskTable {
    MaskTable::from_offsets([
        (10, 18.0),
        (20, 30.0),
        (30, 32.0),
        (40, 35.0),
        (80, 43.0),
        (120, 48.0),
    ])
}

/// Overlay device-specific mask entries on the built-in floors, so offsets
/// not covered by measurements still resolve.
pub fn merge_with_defaults(tx: &MaskTable, rx: &MaskTable) -> (MaskTable, MaskTable) {
    (
        default_tx_mask().merged_with(tx),
        default_rx_mask().merged_with(rx),
    )
}

/// Tabulate ACIR across a set of offsets, for inspection or caching.
pub fn acir_profile(
    tx_mask: &MaskTable,
    rx_mask: &MaskTable,
    offsets_mhz: &[f64],
) -> AfcResult<Vec<(f64, f64)>> {
    offsets_mhz
        .iter()
        .map(|&off| acir_from_masks(off, tx_mask, rx_mask).map(|a| (off, a)))
        .collect()
}
