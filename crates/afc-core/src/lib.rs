//! # AFC Core — 6 GHz Incumbent-Protection Engine
//!
//! This crate decides how much power an unlicensed 6 GHz access point may
//! radiate without degrading registered fixed-service (FS) microwave links.
//! It implements the Automated Frequency Coordination (AFC) decision core:
//!
//! - **Link budget**: EIRP, thermal noise, interference and I/N arithmetic
//! - **Geodesy**: great-circle distances and bearings on a spherical earth
//! - **Propagation**: FSPL, WINNER-II-style, two-slope and ITM-like models
//!   with environment and penetration adders
//! - **Antenna discrimination**: parabolic patterns and RPE tables
//! - **ACIR**: adjacent-channel rejection combined from ACLR/ACS masks
//! - **Grant tables**: per-channel most-restrictive allowed EIRP/PSD across
//!   every protection site of every incumbent
//! - **Aggregate evaluation**: many APs summed at each FS receiver
//! - **Spectrum inquiry**: the channel-based and frequency-based
//!   request/response protocol with standardized response codes
//!
//! ## Pipeline
//!
//! ```text
//! request → validate → [per channel] → expand sites → geometry → path loss
//!         → antenna discrimination → noise → overlap co/adj → ACIR
//!         → invert I/N → min over sites → cap → PSD/decision → response
//! ```
//!
//! ## Example
//!
//! ```rust
//! use afc_core::grant_table::{ApPlacement, EvalOptions, Evaluator};
//! use afc_core::incumbent::IncumbentRecord;
//! use afc_core::params::AfcParams;
//! use afc_core::propagation::Environment;
//!
//! let params = AfcParams::default_6ghz();
//! let incumbents: Vec<IncumbentRecord> = serde_json::from_str(r#"[{
//!     "link_id": "FS_IST_6025_A",
//!     "freq_center_mhz": 6025.0, "bandwidth_mhz": 20.0,
//!     "rx_lat": 41.02, "rx_lon": 28.98
//! }]"#).unwrap();
//!
//! let opts = EvalOptions { environment: Some(Environment::Urban), ..EvalOptions::default() };
//! let eval = Evaluator::new(&params, &incumbents, opts);
//! let ap = ApPlacement::Coordinates { lat: 41.015, lon: 28.979 };
//! let rows = eval.build_grant_table(&ap, 5925.0, 6425.0, &[20.0]).unwrap();
//! assert!(rows.iter().any(|r| r.limiting_incumbent.is_some()));
//! ```
//!
//! The engine is pure and single-threaded per request: parameter sets and
//! incumbent lists are immutable after construction, so channels may be
//! evaluated concurrently (enable the `parallel` feature for a
//! rayon-backed grant-table builder).

pub mod acir;
pub mod aggregate;
pub mod allocator;
pub mod antenna;
pub mod error;
pub mod fs_bandwidth;
pub mod geodesy;
pub mod grant_table;
pub mod incumbent;
pub mod inquiry;
pub mod link_budget;
pub mod mask;
pub mod params;
pub mod propagation;

#[cfg(test)]
mod property_tests;

pub use error::{AfcError, AfcResult};
pub use grant_table::{ApPlacement, Decision, EvalOptions, Evaluator, GrantRow};
pub use incumbent::{IncumbentRecord, PassiveSite, ProtectionSite};
pub use inquiry::{InquiryHandler, InquiryResponse, ResponseCode};
pub use params::AfcParams;
