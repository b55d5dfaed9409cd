//! End-to-end AFC walk-through
//!
//! Run with: cargo run --example end_to_end -p afc-core
//!
//! Builds a grant table for an AP in Istanbul against two FS links, then
//! answers one channel-based and one frequency-based spectrum inquiry.

use afc_core::aggregate::{ApSite, AggregateOptions};
use afc_core::grant_table::{ApPlacement, Decision, EvalOptions, Evaluator};
use afc_core::incumbent::IncumbentRecord;
use afc_core::inquiry::InquiryHandler;
use afc_core::params::AfcParams;
use afc_core::propagation::Environment;
use serde_json::json;

fn main() {
    let params = AfcParams::default_6ghz();
    let incumbents: Vec<IncumbentRecord> = serde_json::from_value(json!([
        {
            "link_id": "FS_IST_6025_A",
            "freq_center_mhz": 6025.0,
            "bandwidth_mhz": 20.0,
            "rx_lat": 41.02, "rx_lon": 28.98,
            "rx_antenna_gain_dbi": 34.0,
            "rx_antenna_azimuth_deg": 120.0,
            "emission_designator": "25M0F7W"
        },
        {
            "link_id": "FS_IST_6175_B",
            "freq_center_mhz": 6175.0,
            "bandwidth_mhz": 40.0,
            "rx_lat": 41.05, "rx_lon": 29.10
        }
    ]))
    .expect("incumbent records");

    let ap = ApPlacement::Coordinates { lat: 41.015, lon: 28.979 };
    let opts = EvalOptions {
        environment: Some(Environment::Urban),
        ..EvalOptions::default()
    };
    let eval = Evaluator::new(&params, &incumbents, opts);

    println!("Grant table, 20 MHz channels over UNII-5:");
    let rows = eval
        .build_grant_table(&ap, 5925.0, 6425.0, &[20.0])
        .expect("grant table");
    for r in &rows {
        println!(
            "  ch {:3}  {:.0} MHz  EIRP {:7.2} dBm  PSD {:7.2} dBm/MHz  {}  {}",
            r.channel_number,
            r.center_mhz,
            r.allowed_eirp_dbm,
            r.allowed_psd_dbm_per_mhz,
            r.decision,
            r.limiting_incumbent.as_deref().unwrap_or("-")
        );
    }
    let granted = rows.iter().filter(|r| r.decision == Decision::Grant).count();
    println!("  {} of {} channels granted\n", granted, rows.len());

    let handler = InquiryHandler::new(&params, &incumbents);

    println!("Channel-based inquiry (NR-U class 300):");
    let resp = handler
        .handle(&json!({
            "location": {"lat": 41.015, "lon": 28.979},
            "environment": "urban",
            "inquiredChannels": [{"globalOperatingClass": 300, "channelCfi": [800000, 804000]}]
        }))
        .expect("inquiry");
    println!("{}\n", serde_json::to_string_pretty(&resp).unwrap());

    println!("Frequency-based inquiry with bin merging:");
    let resp = handler
        .handle(&json!({
            "location": {"lat": 41.015, "lon": 28.979},
            "environment": "urban",
            "inquiredFrequencyRange": [{"lowMHz": 6015.0, "highMHz": 6040.0}]
        }))
        .expect("inquiry");
    println!("{}\n", serde_json::to_string_pretty(&resp).unwrap());

    println!("Aggregate check, three APs on 6025/20:");
    let aps = [
        ApSite { lat: 41.015, lon: 28.979, eirp_dbm: 30.0 },
        ApSite { lat: 41.017, lon: 28.990, eirp_dbm: 27.0 },
        ApSite { lat: 41.010, lon: 28.975, eirp_dbm: 24.0 },
    ];
    let summaries = handler
        .evaluate_aggregate(&aps, &[(6025.0, 20.0)], &AggregateOptions::default())
        .expect("aggregate");
    for s in &summaries {
        println!(
            "  {:.0}/{:.0} MHz  worst INR {:.2} dB at {}  all_pass={}",
            s.center_mhz,
            s.bandwidth_mhz,
            s.worst_inr_db,
            s.worst_site_id.as_deref().unwrap_or("-"),
            s.all_pass
        );
    }
}
