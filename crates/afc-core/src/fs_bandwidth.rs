//! FS receiver noise bandwidth — emission designators and precedence
//!
//! Resolves the noise bandwidth of a fixed-service receiver from the
//! sources a ULS-style record may carry, in strict precedence order:
//!
//! 1. necessary bandwidth parsed from the emission designator,
//! 2. explicit receiver noise bandwidth in the record (or caller override),
//! 3. recorded channel bandwidth,
//! 4. parameter-set default.
//!
//! A higher-precedence source only wins when it yields a strictly positive
//! value; otherwise resolution falls through to the next source.
//!
//! # Example
//!
//! ```rust
//! use afc_core::fs_bandwidth::parse_emission_designator_bw_hz;
//!
//! assert_eq!(parse_emission_designator_bw_hz("25M0F7W"), Some(25_000_000.0));
//! assert_eq!(parse_emission_designator_bw_hz("200K0F3E"), Some(200_000.0));
//! assert_eq!(parse_emission_designator_bw_hz("XYZ"), None);
//! ```

use crate::incumbent::ProtectionSite;
use crate::params::AfcParams;

fn unit_scale(unit: char) -> Option<f64> {
    match unit.to_ascii_uppercase() {
        'H' => Some(1.0),
        'K' => Some(1e3),
        'M' => Some(1e6),
        'G' => Some(1e9),
        _ => None,
    }
}

/// Parse the necessary bandwidth out of an emission designator.
///
/// Scans for the first `<digits><H|K|M|G><digit>` group, where the unit
/// letter stands in for the decimal point: `25M0` is 25.0 MHz, `5M50` reads
/// as 5.5 MHz, `200K0` is 200 kHz. Returns `None` when no such group
/// exists, letting the caller fall through to the next bandwidth source.
pub fn parse_emission_designator_bw_hz(designator: &str) -> Option<f64> {
    let bytes = designator.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        let scale = match unit_scale(b as char) {
            Some(s) => s,
            None => continue,
        };
        // Up to three digits immediately before the unit, one right after.
        let start = (0..i.min(3))
            .take_while(|&k| bytes[i - 1 - k].is_ascii_digit())
            .count();
        if start == 0 {
            continue;
        }
        let frac = match bytes.get(i + 1) {
            Some(d) if d.is_ascii_digit() => (d - b'0') as f64,
            _ => continue,
        };
        let whole: f64 = designator[i - start..i].parse().ok()?;
        return Some((whole + frac / 10.0) * scale);
    }
    None
}

/// Resolve a noise bandwidth in Hz by strict precedence over the available
/// sources. `default_hz` is always returned as the last resort.
pub fn resolve_noise_bandwidth_hz(
    emission_designator: Option<&str>,
    explicit_rx_bw_hz: Option<f64>,
    channel_bw_hz: Option<f64>,
    default_hz: f64,
) -> f64 {
    if let Some(bw) = emission_designator.and_then(parse_emission_designator_bw_hz) {
        if bw > 0.0 {
            return bw;
        }
    }
    if let Some(bw) = explicit_rx_bw_hz {
        if bw > 0.0 {
            return bw;
        }
    }
    if let Some(bw) = channel_bw_hz {
        if bw > 0.0 {
            return bw;
        }
    }
    default_hz
}

/// Resolve the noise bandwidth for one protection site against a parameter
/// set, with an optional caller override taking the explicit-bandwidth slot.
pub fn resolve_for_site(
    site: &ProtectionSite,
    override_rx_bw_hz: Option<f64>,
    params: &AfcParams,
) -> f64 {
    resolve_noise_bandwidth_hz(
        site.emission_designator.as_deref(),
        override_rx_bw_hz.or(site.rx_noise_bandwidth_hz),
        Some(site.bandwidth_mhz * 1e6),
        params.incumbent.bandwidth_hz,
    )
}
