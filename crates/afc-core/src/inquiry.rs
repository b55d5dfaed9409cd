//! Spectrum inquiry — request validation, dispatch and response assembly
//!
//! JSON-based request/response protocol over the grant engine. A request is
//! classified (channel-based or frequency-based), validated against the
//! protocol rules, and answered with a structured response: classified
//! failures always come back as a response carrying a response code and
//! supplemental parameter lists, never as an error. Only engine misuse
//! (non-positive bandwidths, empty masks) escapes as [`crate::AfcError`].
//!
//! # Example
//!
//! ```rust
//! use afc_core::inquiry::{InquiryHandler, ResponseCode};
//! use afc_core::params::AfcParams;
//! use serde_json::json;
//!
//! let params = AfcParams::default_6ghz();
//! let handler = InquiryHandler::new(&params, &[]);
//! let request = json!({
//!     "location": {"lat": 41.015, "lon": 28.979},
//!     "inquiredChannels": [{"globalOperatingClass": 300, "channelCfi": [800000]}]
//! });
//! let resp = handler.handle(&request).unwrap();
//! assert_eq!(resp.response_code, ResponseCode::Success);
//! assert_eq!(resp.available_channel_info.unwrap()[0].max_eirp.len(), 1);
//! ```

use std::collections::BTreeMap;

use chrono::{Duration, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::aggregate::{
    evaluate_aggregate_inr_across, AggregateChannelSummary, AggregateOptions, ApSite,
};
use crate::error::AfcResult;
use crate::grant_table::{ApPlacement, DeviceConstraints, EvalOptions, Evaluator};
use crate::incumbent::IncumbentRecord;
use crate::params::AfcParams;
use crate::propagation::{Environment, PathModel};

/// Protocol response codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    Success,
    DeviceDisallowed,
    MissingParam,
    InvalidValue,
    UnexpectedParam,
    UnsupportedBasis,
}

impl ResponseCode {
    /// Wire value of the code.
    pub fn code(self) -> i32 {
        match self {
            ResponseCode::Success => 0,
            ResponseCode::DeviceDisallowed => 101,
            ResponseCode::MissingParam => 102,
            ResponseCode::InvalidValue => 103,
            ResponseCode::UnexpectedParam => 106,
            ResponseCode::UnsupportedBasis => 301,
        }
    }
}

impl Serialize for ResponseCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.code())
    }
}

/// Parameter lists attached to a failure response.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SupplementalInfo {
    #[serde(rename = "missingParams", skip_serializing_if = "Option::is_none")]
    pub missing_params: Option<Vec<String>>,
    #[serde(rename = "invalidParams", skip_serializing_if = "Option::is_none")]
    pub invalid_params: Option<Vec<String>>,
    #[serde(rename = "unexpectedParams", skip_serializing_if = "Option::is_none")]
    pub unexpected_params: Option<Vec<String>>,
}

/// Inclusive frequency span in MHz.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrequencyRange {
    #[serde(rename = "lowMHz")]
    pub low_mhz: f64,
    #[serde(rename = "highMHz")]
    pub high_mhz: f64,
}

/// One span of the frequency-based answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableFrequencyInfo {
    #[serde(rename = "frequencyRange")]
    pub frequency_range: FrequencyRange,
    #[serde(rename = "maxPsd")]
    pub max_psd: f64,
}

/// One item of the channel-based answer; `max_eirp` parallels `channel_cfi`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailableChannelInfo {
    #[serde(rename = "globalOperatingClass", skip_serializing_if = "Option::is_none")]
    pub global_operating_class: Option<u32>,
    #[serde(rename = "bandwidthMHz", skip_serializing_if = "Option::is_none")]
    pub bandwidth_mhz: Option<f64>,
    #[serde(rename = "channelCfi")]
    pub channel_cfi: Vec<i64>,
    #[serde(rename = "maxEirp")]
    pub max_eirp: Vec<f64>,
}

/// The spectrum-inquiry response object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InquiryResponse {
    #[serde(rename = "responseCode")]
    pub response_code: ResponseCode,
    #[serde(rename = "supplementalInfo", skip_serializing_if = "Option::is_none")]
    pub supplemental_info: Option<SupplementalInfo>,
    #[serde(rename = "availabilityExpireTime", skip_serializing_if = "Option::is_none")]
    pub availability_expire_time: Option<String>,
    #[serde(rename = "availableFrequencyInfo", skip_serializing_if = "Option::is_none")]
    pub available_frequency_info: Option<Vec<AvailableFrequencyInfo>>,
    #[serde(rename = "availableChannelInfo", skip_serializing_if = "Option::is_none")]
    pub available_channel_info: Option<Vec<AvailableChannelInfo>>,
}

impl InquiryResponse {
    fn failure(code: ResponseCode, supplemental: Option<SupplementalInfo>) -> Self {
        Self {
            response_code: code,
            supplemental_info: supplemental,
            availability_expire_time: None,
            available_frequency_info: None,
            available_channel_info: None,
        }
    }

    fn missing(params: Vec<String>) -> Self {
        Self::failure(
            ResponseCode::MissingParam,
            Some(SupplementalInfo {
                missing_params: Some(params),
                ..SupplementalInfo::default()
            }),
        )
    }

    fn invalid(params: Vec<String>) -> Self {
        Self::failure(
            ResponseCode::InvalidValue,
            Some(SupplementalInfo {
                invalid_params: Some(params),
                ..SupplementalInfo::default()
            }),
        )
    }

    fn unexpected(params: Vec<String>) -> Self {
        Self::failure(
            ResponseCode::UnexpectedParam,
            Some(SupplementalInfo {
                unexpected_params: Some(params),
                ..SupplementalInfo::default()
            }),
        )
    }
}

/// NR-U operating-class → channel-bandwidth mapping (MHz), extensible via
/// [`InquiryHandler::with_operating_class`].
pub fn default_operating_classes() -> BTreeMap<u32, f64> {
    BTreeMap::from([(300, 20.0), (301, 40.0), (302, 60.0), (303, 80.0), (304, 100.0)])
}

/// Channel center frequency in MHz from a channel frequency index:
/// `F = 3000 + 15·(CFI − 600000)/1000`.
pub fn cfi_to_center_mhz(cfi: i64) -> f64 {
    3000.0 + 15.0 * (cfi as f64 - 600_000.0) / 1000.0
}

/// Stateless request handler bound to one parameter set and incumbent list.
#[derive(Debug, Clone)]
pub struct InquiryHandler<'a> {
    params: &'a AfcParams,
    incumbents: &'a [IncumbentRecord],
    certified_ids: Option<Vec<String>>,
    disallowed_ids: Vec<String>,
    disallowed_pairs: Vec<(String, String)>,
    operating_classes: BTreeMap<u32, f64>,
    constraints: DeviceConstraints,
    expiry_secs: i64,
}

impl<'a> InquiryHandler<'a> {
    pub fn new(params: &'a AfcParams, incumbents: &'a [IncumbentRecord]) -> Self {
        Self {
            params,
            incumbents,
            certified_ids: None,
            disallowed_ids: Vec::new(),
            disallowed_pairs: Vec::new(),
            operating_classes: default_operating_classes(),
            constraints: DeviceConstraints::default(),
            expiry_secs: 900,
        }
    }

    /// Enforce a certification-id allowlist.
    pub fn with_certified_ids<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        self.certified_ids = Some(ids.into_iter().collect());
        self
    }

    /// Reject specific certification ids outright.
    pub fn with_disallowed_ids<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        self.disallowed_ids = ids.into_iter().collect();
        self
    }

    /// Reject specific `(certification id, serial number)` pairs.
    pub fn with_disallowed_pairs<I: IntoIterator<Item = (String, String)>>(mut self, pairs: I) -> Self {
        self.disallowed_pairs = pairs.into_iter().collect();
        self
    }

    /// Add or override an operating-class → bandwidth entry.
    pub fn with_operating_class(mut self, class: u32, bandwidth_mhz: f64) -> Self {
        self.operating_classes.insert(class, bandwidth_mhz);
        self
    }

    pub fn with_device_constraints(mut self, constraints: DeviceConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Availability lifetime stamped on success responses (default 900 s).
    pub fn with_expiry_secs(mut self, secs: i64) -> Self {
        self.expiry_secs = secs;
        self
    }

    fn expiry_iso8601(&self) -> String {
        (Utc::now() + Duration::seconds(self.expiry_secs))
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    }

    /// Process one available-spectrum-inquiry request.
    ///
    /// Classified protocol failures come back as `Ok(response)`; only engine
    /// misuse surfaces as `Err`.
    pub fn handle(&self, request: &Value) -> AfcResult<InquiryResponse> {
        // -- location ------------------------------------------------------
        let location = request
            .get("location")
            .or_else(|| request.get("device").and_then(|d| d.get("location")));
        let location = match location {
            Some(Value::Object(loc)) => loc,
            _ => return Ok(InquiryResponse::missing(vec!["location".into()])),
        };

        let mut missing = Vec::new();
        let lat = location.get("lat").and_then(as_number);
        let lon = location.get("lon").and_then(as_number);
        if lat.is_none() {
            missing.push("location.lat".to_string());
        }
        if lon.is_none() {
            missing.push("location.lon".to_string());
        }

        let horizontal: Vec<String> = ["ellipse", "linearPolygon", "radialPolygon"]
            .iter()
            .filter(|f| location.contains_key(**f))
            .map(|f| f.to_string())
            .collect();
        if horizontal.len() > 1 {
            return Ok(InquiryResponse::unexpected(horizontal));
        }
        if !missing.is_empty() {
            return Ok(InquiryResponse::missing(missing));
        }
        let ap = ApPlacement::Coordinates {
            lat: lat.unwrap(),
            lon: lon.unwrap(),
        };

        // -- certification -------------------------------------------------
        if let Some(resp) = self.check_certification(request) {
            return Ok(resp);
        }

        // -- dispatch ------------------------------------------------------
        let freq_req = request.get("inquiredFrequencyRange").and_then(Value::as_array);
        let chan_req = request.get("inquiredChannels").and_then(Value::as_array);
        if freq_req.is_some() && chan_req.is_some() {
            return Ok(InquiryResponse::unexpected(vec![
                "inquiredFrequencyRange".into(),
                "inquiredChannels".into(),
            ]));
        }

        let opts = match eval_options_from_request(request, self.constraints) {
            Ok(opts) => opts,
            Err(invalid) => return Ok(InquiryResponse::invalid(invalid)),
        };

        if let Some(ranges) = freq_req {
            if request.get("minDesiredPower").is_some() {
                return Ok(InquiryResponse::unexpected(vec!["minDesiredPower".into()]));
            }
            return self.handle_frequency_based(request, ranges, &ap, opts);
        }

        match chan_req {
            Some(items) if !items.is_empty() => {
                self.handle_channel_based(request, items, &ap, opts)
            }
            _ => Ok(InquiryResponse::missing(vec!["inquiredChannels".into()])),
        }
    }

    fn check_certification(&self, request: &Value) -> Option<InquiryResponse> {
        let cert = request.get("certification")?.as_object()?;
        let id = cert.get("id").and_then(Value::as_str)?;
        if let Some(allow) = &self.certified_ids {
            if !allow.iter().any(|a| a == id) {
                return Some(InquiryResponse::invalid(vec!["certification.id".into()]));
            }
        }
        if self.disallowed_ids.iter().any(|d| d == id) {
            return Some(InquiryResponse::failure(ResponseCode::DeviceDisallowed, None));
        }
        if let Some(serial) = cert.get("serialNumber").and_then(Value::as_str) {
            if self
                .disallowed_pairs
                .iter()
                .any(|(d_id, d_serial)| d_id == id && d_serial == serial)
            {
                return Some(InquiryResponse::failure(ResponseCode::DeviceDisallowed, None));
            }
        }
        None
    }

    /// Frequency-based query: 1 MHz bins centered at `f + 0.5`, evaluated by
    /// the grant kernel (PSD equals EIRP numerically at 1 MHz), then merged.
    fn handle_frequency_based(
        &self,
        request: &Value,
        ranges: &[Value],
        ap: &ApPlacement,
        opts: EvalOptions,
    ) -> AfcResult<InquiryResponse> {
        let merge_bins = request
            .get("mergeBins")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let merge_tol_db = request
            .get("mergeToleranceDb")
            .and_then(as_number)
            .unwrap_or(1e-6);

        let evaluator = Evaluator::new(self.params, self.incumbents, opts);
        debug!(ranges = ranges.len(), merge_bins, "frequency-based inquiry");

        let mut entries: Vec<AvailableFrequencyInfo> = Vec::new();
        for range in ranges {
            let lo = range
                .get("lowMHz")
                .or_else(|| range.get("startMHz"))
                .and_then(as_number);
            let hi = range
                .get("highMHz")
                .or_else(|| range.get("endMHz"))
                .and_then(as_number);
            let (lo, hi) = match (lo, hi) {
                (Some(lo), Some(hi)) if hi > lo => (lo, hi),
                _ => {
                    return Ok(InquiryResponse::invalid(vec![
                        "inquiredFrequencyRange".into(),
                    ]))
                }
            };

            // (low, high, psd) per 1 MHz bin
            let mut bins: Vec<(f64, f64, f64)> = Vec::new();
            for f in (lo.floor() as i64)..(hi.floor() as i64) {
                let center = f as f64 + 0.5;
                let eval = evaluator.evaluate_channel(ap, center, 1.0)?;
                bins.push((f as f64, f as f64 + 1.0, eval.allowed_eirp_dbm));
            }

            if merge_bins {
                let mut merged: Vec<(f64, f64, f64)> = Vec::new();
                for bin in bins {
                    match merged.last_mut() {
                        Some(last)
                            if (last.2 - bin.2).abs() < merge_tol_db
                                && (last.1 - bin.0).abs() < 1e-9 =>
                        {
                            last.1 = bin.1;
                        }
                        _ => merged.push(bin),
                    }
                }
                bins = merged;
            }

            entries.extend(bins.into_iter().map(|(low, high, psd)| AvailableFrequencyInfo {
                frequency_range: FrequencyRange {
                    low_mhz: low,
                    high_mhz: high,
                },
                max_psd: psd,
            }));
        }

        entries.sort_by(|a, b| {
            a.frequency_range
                .low_mhz
                .partial_cmp(&b.frequency_range.low_mhz)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(InquiryResponse {
            response_code: ResponseCode::Success,
            supplemental_info: None,
            availability_expire_time: Some(self.expiry_iso8601()),
            available_frequency_info: Some(entries),
            available_channel_info: None,
        })
    }

    /// Channel-based query: resolve the bandwidth per item, map CFIs to
    /// centers, and answer every requested channel in input order.
    fn handle_channel_based(
        &self,
        request: &Value,
        items: &[Value],
        ap: &ApPlacement,
        opts: EvalOptions,
    ) -> AfcResult<InquiryResponse> {
        let request_bw = request.get("bandwidthMHz").and_then(as_number);
        let evaluator = Evaluator::new(self.params, self.incumbents, opts);
        debug!(items = items.len(), "channel-based inquiry");

        // Validate every item up front; no partial answers on failure.
        let mut invalid: Vec<String> = Vec::new();
        let mut plan: Vec<(Option<u32>, f64, Vec<i64>)> = Vec::new();
        for item in items {
            let item = match item.as_object() {
                Some(obj) => obj,
                None => {
                    invalid.push("inquiredChannels[]".into());
                    continue;
                }
            };
            let class = match item.get("globalOperatingClass") {
                Some(v) => match v.as_u64() {
                    Some(c) => Some(c as u32),
                    None => {
                        invalid.push("globalOperatingClass".into());
                        continue;
                    }
                },
                None => None,
            };
            let cfis = match item.get("channelCfi") {
                None => {
                    // Without explicit CFIs there is no channel basis to answer.
                    return Ok(InquiryResponse::failure(ResponseCode::UnsupportedBasis, None));
                }
                Some(v) => match v.as_array().map(|arr| {
                    arr.iter().map(Value::as_i64).collect::<Option<Vec<i64>>>()
                }) {
                    Some(Some(cfis)) => cfis,
                    _ => {
                        invalid.push("channelCfi".into());
                        continue;
                    }
                },
            };
            let bandwidth = match class {
                Some(c) => match self.operating_classes.get(&c) {
                    Some(&bw) => bw,
                    None => {
                        invalid.push("globalOperatingClass".into());
                        continue;
                    }
                },
                None => item
                    .get("bandwidthMHz")
                    .and_then(as_number)
                    .or(request_bw)
                    .unwrap_or(20.0),
            };
            plan.push((class, bandwidth, cfis));
        }
        if !invalid.is_empty() {
            let mut unique: Vec<String> = Vec::new();
            for p in invalid {
                if !unique.contains(&p) {
                    unique.push(p);
                }
            }
            return Ok(InquiryResponse::invalid(unique));
        }

        let mut infos = Vec::with_capacity(plan.len());
        for (class, bandwidth_mhz, cfis) in plan {
            let mut max_eirp = Vec::with_capacity(cfis.len());
            for &cfi in &cfis {
                let center = cfi_to_center_mhz(cfi);
                let eval = evaluator.evaluate_channel(ap, center, bandwidth_mhz)?;
                max_eirp.push(eval.allowed_eirp_dbm);
            }
            infos.push(AvailableChannelInfo {
                global_operating_class: class,
                bandwidth_mhz: class.is_none().then_some(bandwidth_mhz),
                channel_cfi: cfis,
                max_eirp,
            });
        }

        Ok(InquiryResponse {
            response_code: ResponseCode::Success,
            supplemental_info: None,
            availability_expire_time: Some(self.expiry_iso8601()),
            available_frequency_info: None,
            available_channel_info: Some(infos),
        })
    }

    /// Supplemental aggregate evaluation over this handler's incumbents:
    /// given deployed APs and channels, report per-site INR and worst cases.
    pub fn evaluate_aggregate(
        &self,
        aps: &[ApSite],
        channels: &[(f64, f64)],
        opts: &AggregateOptions,
    ) -> AfcResult<Vec<AggregateChannelSummary>> {
        evaluate_aggregate_inr_across(Some(self.params), self.incumbents, aps, channels, opts)
    }
}

/// Numeric extraction tolerant of numbers-in-strings, matching what ULS
/// tooling tends to emit.
fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Evaluation knobs read from the request body; unknown tag values are
/// protocol errors, reported as the invalid parameter list.
fn eval_options_from_request(
    request: &Value,
    constraints: DeviceConstraints,
) -> Result<EvalOptions, Vec<String>> {
    let mut invalid = Vec::new();

    let environment = match request.get("environment").and_then(Value::as_str) {
        Some(name) => match Environment::from_name(name) {
            Some(env) => Some(env),
            None => {
                invalid.push("environment".to_string());
                None
            }
        },
        None => Some(Environment::Urban),
    };
    let path_model = match request.get("pathModel").and_then(Value::as_str) {
        Some(name) => match PathModel::from_name(name) {
            Some(model) => model,
            None => {
                invalid.push("pathModel".to_string());
                PathModel::Auto
            }
        },
        None => PathModel::Auto,
    };
    if !invalid.is_empty() {
        return Err(invalid);
    }

    Ok(EvalOptions {
        environment,
        path_model,
        protection_margin_db: request
            .get("protectionMarginDb")
            .and_then(as_number)
            .unwrap_or(0.0),
        constraints,
        ..EvalOptions::default()
    })
}
