//! Propagation models — path loss from AP to incumbent receiver
//!
//! Implements the path-loss models used by the incumbent-protection flow:
//! free-space (FSPL), a WINNER-II-style log-distance model, a two-slope
//! model, and an ITM-like placeholder with the Longley-Rice I/O contract but
//! a heuristic interior. A tagged [`PathModel`] selector dispatches in a
//! single match; environment and building-penetration adders compose
//! additively on top of the selected model.
//!
//! # Example
//!
//! ```rust
//! use afc_core::propagation::{fspl_db, invert_fspl_distance_m, PathModel};
//!
//! // FSPL at 100 m / 6 GHz is ~87.98 dB and inverts back to the distance
//! let pl = fspl_db(100.0, 6e9).unwrap();
//! assert!((pl - 87.98).abs() < 0.01);
//! let d = invert_fspl_distance_m(pl, 6e9).unwrap();
//! assert!((d - 100.0).abs() < 1e-6);
//!
//! // The auto selector uses WINNER-II below 5 km
//! let auto = PathModel::Auto.path_loss_db(300.0, 6e9).unwrap();
//! assert!(auto > pl - 20.0);
//! ```

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::error::{AfcError, AfcResult};

/// Speed of light in m/s.
const C: f64 = 299_792_458.0;

/// Distance below which the auto selector prefers WINNER-II over ITM.
pub const AUTO_WINNER_THRESHOLD_M: f64 = 5_000.0;

// ---------------------------------------------------------------------------
// Core models
// ---------------------------------------------------------------------------

/// Free-space path loss: `20·log10(4π·d·f/c)`.
pub fn fspl_db(distance_m: f64, frequency_hz: f64) -> AfcResult<f64> {
    if distance_m <= 0.0 {
        return Err(AfcError::NonPositiveDistance(distance_m));
    }
    if frequency_hz <= 0.0 {
        return Err(AfcError::NonPositiveFrequency(frequency_hz));
    }
    Ok(20.0 * (4.0 * PI * distance_m * frequency_hz / C).log10())
}

/// Invert FSPL to a distance: `d = c/(4π·f) · 10^(FSPL/20)`.
pub fn invert_fspl_distance_m(fspl_db_value: f64, frequency_hz: f64) -> AfcResult<f64> {
    if frequency_hz <= 0.0 {
        return Err(AfcError::NonPositiveFrequency(frequency_hz));
    }
    Ok(C / (4.0 * PI * frequency_hz) * 10.0_f64.powf(fspl_db_value / 20.0))
}

/// WINNER-II-style log-distance model.
///
/// `PL(d) = FSPL(d0) + 10·n·log10(d/d0) + L_add`, anchored at the free-space
/// loss of the reference distance. Distances inside the reference distance
/// clamp to it, so the output is monotonic and never undercuts `FSPL(d0)`.
pub fn winner2_path_loss_db(
    distance_m: f64,
    frequency_hz: f64,
    exponent: f64,
    reference_distance_m: f64,
    additional_loss_db: f64,
) -> AfcResult<f64> {
    if distance_m <= 0.0 {
        return Err(AfcError::NonPositiveDistance(distance_m));
    }
    let d0 = reference_distance_m.max(1e-3);
    let pl_d0 = fspl_db(d0, frequency_hz)?;
    Ok(pl_d0 + 10.0 * exponent * (distance_m.max(d0) / d0).log10() + additional_loss_db)
}

/// Two-slope model: exponent `n1` out to a breakpoint, `n2` beyond.
pub fn two_slope_path_loss_db(
    distance_m: f64,
    frequency_hz: f64,
    breakpoint_m: f64,
    n1: f64,
    n2: f64,
    additional_loss_db: f64,
) -> AfcResult<f64> {
    if distance_m <= 0.0 {
        return Err(AfcError::NonPositiveDistance(distance_m));
    }
    let d0 = 1.0;
    let pl_d0 = fspl_db(d0, frequency_hz)?;
    let pl = if distance_m <= breakpoint_m {
        pl_d0 + 10.0 * n1 * (distance_m.max(d0) / d0).log10()
    } else {
        let pl_bp = pl_d0 + 10.0 * n1 * (breakpoint_m / d0).log10();
        pl_bp + 10.0 * n2 * (distance_m / breakpoint_m).log10()
    };
    Ok(pl + additional_loss_db)
}

/// Radio climate for the ITM-like excess term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Climate {
    Continental,
    Maritime,
    Tropical,
}

impl Climate {
    fn excess_db(self) -> f64 {
        match self {
            Climate::Continental => 3.0,
            Climate::Maritime => 2.0,
            Climate::Tropical => 1.0,
        }
    }
}

/// Parameters for the ITM-like placeholder model.
///
/// The interface mirrors a Longley-Rice binding (site heights, climate,
/// time reliability); the interior is a heuristic excess on top of FSPL and
/// is intended to be swapped for a real ITM implementation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItmParams {
    /// Transmitter height above ground in meters.
    pub tx_height_m: f64,
    /// Receiver height above ground in meters.
    pub rx_height_m: f64,
    /// Radio climate; `None` adds no climate excess.
    pub climate: Option<Climate>,
    /// Time reliability percentage (50/90/99). Values above 50 add margin.
    pub reliability_pct: f64,
}

impl Default for ItmParams {
    fn default() -> Self {
        Self {
            tx_height_m: 10.0,
            rx_height_m: 10.0,
            climate: None,
            reliability_pct: 50.0,
        }
    }
}

/// ITM-like path loss: FSPL plus a height/distance/climate excess.
///
/// The excess term is clamped at zero so the model never undercuts free
/// space and stays monotonic in distance.
pub fn itm_path_loss_db(distance_m: f64, frequency_hz: f64, itm: &ItmParams) -> AfcResult<f64> {
    let base = fspl_db(distance_m, frequency_hz)?;
    let h_tx = itm.tx_height_m.max(1.0);
    let h_rx = itm.rx_height_m.max(1.0);
    // Taller sites clear more of the terrain; harsher climates fade more.
    let height_term = -2.0 * (h_tx * h_rx).log10();
    let dist_term = 6.0 * (distance_m.max(1.0) / 1000.0).log10();
    let climate_term = itm.climate.map_or(0.0, Climate::excess_db);
    let rel_term = 0.05 * (itm.reliability_pct - 50.0).max(0.0);
    Ok(base + (dist_term + climate_term + rel_term + height_term).max(0.0))
}

// ---------------------------------------------------------------------------
// Environment and penetration adders
// ---------------------------------------------------------------------------

/// Deployment environment tag carried by spectrum-inquiry requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Urban,
    Suburban,
    Rural,
    Indoor,
}

impl Environment {
    /// Clutter loss preset added on top of the propagation model.
    pub fn extra_loss_db(self) -> f64 {
        match self {
            Environment::Urban => 8.0,
            Environment::Suburban => 4.0,
            Environment::Rural => 1.0,
            Environment::Indoor => 12.0,
        }
    }

    /// Parse the request-level tag (`"urban"`, `"suburban"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "urban" => Some(Environment::Urban),
            "suburban" => Some(Environment::Suburban),
            "rural" => Some(Environment::Rural),
            "indoor" => Some(Environment::Indoor),
            _ => None,
        }
    }
}

/// Building penetration loss: explicit override wins, else 12 dB when
/// indoor, else 0 dB.
pub fn penetration_loss_db(indoor: bool, override_db: Option<f64>) -> f64 {
    match override_db {
        Some(v) => v.max(0.0),
        None if indoor => 12.0,
        None => 0.0,
    }
}

// ---------------------------------------------------------------------------
// Selector
// ---------------------------------------------------------------------------

/// Tagged path-loss model selector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "model")]
pub enum PathModel {
    /// WINNER-II below [`AUTO_WINNER_THRESHOLD_M`], ITM-like beyond.
    Auto,
    Fspl,
    Winner2 {
        exponent: f64,
        reference_distance_m: f64,
        additional_loss_db: f64,
    },
    TwoSlope {
        breakpoint_m: f64,
        n1: f64,
        n2: f64,
        additional_loss_db: f64,
    },
    Itm(ItmParams),
}

impl PathModel {
    /// WINNER-II with the stock parameters (n = 2.1, d0 = 1 m).
    pub fn winner2_default() -> Self {
        PathModel::Winner2 {
            exponent: 2.1,
            reference_distance_m: 1.0,
            additional_loss_db: 0.0,
        }
    }

    /// Two-slope with the stock parameters (breakpoint 100 m, n1 = 2, n2 = 3.5).
    pub fn two_slope_default() -> Self {
        PathModel::TwoSlope {
            breakpoint_m: 100.0,
            n1: 2.0,
            n2: 3.5,
            additional_loss_db: 0.0,
        }
    }

    /// Parse the request-level selector (`"auto"`, `"fspl"`, `"winner"`,
    /// `"two_slope"`, `"itm"`); unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "auto" => Some(PathModel::Auto),
            "fspl" => Some(PathModel::Fspl),
            "winner" | "winner2" => Some(Self::winner2_default()),
            "two_slope" => Some(Self::two_slope_default()),
            "itm" => Some(PathModel::Itm(ItmParams::default())),
            _ => None,
        }
    }

    /// Path loss of the bare model, without environment or penetration adders.
    pub fn path_loss_db(&self, distance_m: f64, frequency_hz: f64) -> AfcResult<f64> {
        match *self {
            PathModel::Auto => {
                if distance_m < AUTO_WINNER_THRESHOLD_M {
                    Self::winner2_default().path_loss_db(distance_m, frequency_hz)
                } else {
                    itm_path_loss_db(distance_m, frequency_hz, &ItmParams::default())
                }
            }
            PathModel::Fspl => fspl_db(distance_m, frequency_hz),
            PathModel::Winner2 {
                exponent,
                reference_distance_m,
                additional_loss_db,
            } => winner2_path_loss_db(
                distance_m,
                frequency_hz,
                exponent,
                reference_distance_m,
                additional_loss_db,
            ),
            PathModel::TwoSlope {
                breakpoint_m,
                n1,
                n2,
                additional_loss_db,
            } => two_slope_path_loss_db(
                distance_m,
                frequency_hz,
                breakpoint_m,
                n1,
                n2,
                additional_loss_db,
            ),
            PathModel::Itm(ref itm) => itm_path_loss_db(distance_m, frequency_hz, itm),
        }
    }
}

impl Default for PathModel {
    fn default() -> Self {
        PathModel::Auto
    }
}

/// Total path loss: selected model plus environment and penetration adders.
pub fn select_path_loss_db(
    model: &PathModel,
    distance_m: f64,
    frequency_hz: f64,
    environment: Option<Environment>,
    indoor: bool,
    penetration_override_db: Option<f64>,
) -> AfcResult<f64> {
    let mut pl = model.path_loss_db(distance_m, frequency_hz)?;
    if let Some(env) = environment {
        pl += env.extra_loss_db();
    }
    pl += penetration_loss_db(indoor, penetration_override_db);
    Ok(pl)
}
