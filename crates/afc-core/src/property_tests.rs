//! Property-based tests over the numerical core.
//!
//! These pin the allocator invariants across randomized inputs rather than
//! hand-picked values: FSPL inversion, ACIR monotonicity, the PSD/EIRP
//! identity, adjacent-channel relief and the min-over-sites rule.

use proptest::prelude::*;

use crate::allocator::allowed_eirp_dbm_for_path;
use crate::fs_bandwidth::{parse_emission_designator_bw_hz, resolve_noise_bandwidth_hz};
use crate::grant_table::{ApPlacement, EvalOptions, Evaluator};
use crate::incumbent::IncumbentRecord;
use crate::mask::MaskTable;
use crate::params::AfcParams;
use crate::propagation::{fspl_db, invert_fspl_distance_m};

fn incumbent(center_mhz: f64, lat: f64, lon: f64) -> IncumbentRecord {
    IncumbentRecord {
        id: Some(format!("FS_{lat:.4}_{lon:.4}")),
        center_mhz,
        bandwidth_mhz: 20.0,
        lat,
        lon,
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

/// Non-decreasing mask over fixed offsets, built from non-negative steps.
fn nondecreasing_mask() -> impl Strategy<Value = MaskTable> {
    proptest::collection::vec(0.0..10.0f64, 6).prop_map(|steps| {
        let offsets = [10, 20, 30, 40, 80, 120];
        let mut att = 15.0;
        let mut points = Vec::new();
        for (off, step) in offsets.iter().zip(steps) {
            att += step;
            points.push((*off, att));
        }
        MaskTable::from_offsets(points)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_fspl_round_trip(d in 0.1..500_000.0f64, f in 1e9..8e9f64) {
        let pl = fspl_db(d, f).unwrap();
        let back = invert_fspl_distance_m(pl, f).unwrap();
        prop_assert!(((back - d) / d).abs() < 1e-9, "{} m -> {} m", d, back);
    }

    #[test]
    fn prop_acir_monotone_for_nondecreasing_masks(
        tx in nondecreasing_mask(),
        rx in nondecreasing_mask(),
        o1 in 10.0..120.0f64,
        o2 in 10.0..120.0f64,
    ) {
        let (lo, hi) = if o1 <= o2 { (o1, o2) } else { (o2, o1) };
        let a_lo = crate::acir::acir_from_masks(lo, &tx, &rx).unwrap();
        let a_hi = crate::acir::acir_from_masks(hi, &tx, &rx).unwrap();
        prop_assert!(a_hi >= a_lo - 1e-9, "ACIR({hi}) = {a_hi} < ACIR({lo}) = {a_lo}");
    }

    #[test]
    fn prop_psd_eirp_identity(
        distance_m in 50.0..50_000.0f64,
        bw_idx in 0usize..4,
    ) {
        let params = AfcParams::default_6ghz();
        let inc = vec![incumbent(6025.0, 41.02, 28.98)];
        let eval = Evaluator::new(&params, &inc, EvalOptions::default());
        let ap = ApPlacement::FixedDistance { distance_m };
        let bw = [20.0, 40.0, 80.0, 160.0][bw_idx];
        let rows = eval.build_grant_table(&ap, 5925.0, 6425.0, &[bw]).unwrap();
        for r in rows {
            let expect = r.allowed_eirp_dbm - 10.0 * r.bandwidth_mhz.log10();
            prop_assert!((r.allowed_psd_dbm_per_mhz - expect).abs() < 1e-9);
        }
    }

    #[test]
    fn prop_adjacent_relief_nonnegative(
        n_dbm in -110.0..-80.0f64,
        pl_db in 60.0..160.0f64,
        g_rx in 0.0..45.0f64,
        acir in 0.0..60.0f64,
    ) {
        let co = allowed_eirp_dbm_for_path(n_dbm, -6.0, pl_db, g_rx, 1.0, 0.0, None, Some(36.0));
        let adj =
            allowed_eirp_dbm_for_path(n_dbm, -6.0, pl_db, g_rx, 1.0, 0.0, Some(acir), Some(36.0));
        prop_assert!(adj >= co, "adjacent {adj} tighter than co-channel {co}");
    }

    #[test]
    fn prop_min_over_sites(
        lats in proptest::collection::vec(41.0..41.5f64, 1..5),
    ) {
        let params = AfcParams::default_6ghz();
        let incumbents: Vec<_> = lats
            .iter()
            .map(|&lat| incumbent(6025.0, lat, 29.0 + (lat - 41.0)))
            .collect();
        let ap = ApPlacement::Coordinates { lat: 41.015, lon: 28.979 };
        let all = Evaluator::new(&params, &incumbents, EvalOptions::default());
        let combined = all.evaluate_channel(&ap, 6025.0, 20.0).unwrap();

        let mut singleton_min = f64::INFINITY;
        for inc in &incumbents {
            let one = Evaluator::new(&params, std::slice::from_ref(inc), EvalOptions::default());
            let e = one.evaluate_channel(&ap, 6025.0, 20.0).unwrap();
            singleton_min = singleton_min.min(e.allowed_eirp_dbm);
        }
        prop_assert!(
            (combined.allowed_eirp_dbm - singleton_min).abs() < 1e-9,
            "combined {} vs singleton minimum {}",
            combined.allowed_eirp_dbm,
            singleton_min
        );
    }

    #[test]
    fn prop_mask_interpolation_bounded(
        points in proptest::collection::vec((0.0..200.0f64, 0.0..60.0f64), 1..8),
        x in -50.0..250.0f64,
    ) {
        let mask = MaskTable::from_points(points.clone());
        let v = mask.interpolate_db(x).unwrap();
        let min = mask.points().iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max = mask.points().iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(v >= min - 1e-9 && v <= max + 1e-9, "{v} outside [{min}, {max}]");
    }

    #[test]
    fn prop_designator_precedence(
        whole in 1u32..1000,
        frac in 0u32..10,
        unit_idx in 0usize..4,
        explicit in 1e3..1e9f64,
    ) {
        let unit = ['H', 'K', 'M', 'G'][unit_idx];
        let designator = format!("{whole}{unit}{frac}F7W");
        let scale = [1.0, 1e3, 1e6, 1e9][unit_idx];
        let expected = (whole as f64 + frac as f64 / 10.0) * scale;
        prop_assert_eq!(parse_emission_designator_bw_hz(&designator), Some(expected));
        // A parseable designator wins over every downstream source
        let resolved =
            resolve_noise_bandwidth_hz(Some(&designator), Some(explicit), Some(explicit), 20e6);
        prop_assert!((resolved - expected).abs() < 1e-6);
    }

    #[test]
    fn prop_bearing_in_range(
        lat1 in -80.0..80.0f64, lon1 in -180.0..180.0f64,
        lat2 in -80.0..80.0f64, lon2 in -180.0..180.0f64,
    ) {
        let b = crate::geodesy::initial_bearing_deg(lat1, lon1, lat2, lon2);
        prop_assert!((0.0..360.0).contains(&b), "bearing {b}");
    }
}
