//! Association fee normalisation
//!
//! A listing carries up to two fees with free-form frequencies. Each fee is
//! converted to monthly and annual amounts and routed to either the HOA
//! subfields (31A/31B) or the condo subfields (31C/31D). Canonical 31 is the
//! annual HOA + condo total.

use serde::Serialize;
use std::fmt;

/// Normalised fee frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FeeFrequency {
    Monthly,
    Quarterly,
    Annually,
    Unknown,
}

impl FeeFrequency {
    pub fn normalize(input: Option<&str>) -> Self {
        let Some(s) = input.map(|s| s.trim().to_lowercase()).filter(|s| !s.is_empty()) else {
            return FeeFrequency::Unknown;
        };
        if s.contains("month") {
            FeeFrequency::Monthly
        } else if s.contains("quarter") || s.contains("qtr") {
            FeeFrequency::Quarterly
        } else if s.contains("year") || s.contains("annual") {
            FeeFrequency::Annually
        } else {
            FeeFrequency::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FeeFrequency::Monthly => "Monthly",
            FeeFrequency::Quarterly => "Quarterly",
            FeeFrequency::Annually => "Annually",
            FeeFrequency::Unknown => "Unknown",
        }
    }

    /// Payments per year; Unknown converts as Monthly
    pub fn per_year(&self) -> f64 {
        match self {
            FeeFrequency::Monthly | FeeFrequency::Unknown => 12.0,
            FeeFrequency::Quarterly => 4.0,
            FeeFrequency::Annually => 1.0,
        }
    }
}

impl fmt::Display for FeeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Condo, condominium, co-op
pub fn is_condo_like(property_type: &str) -> bool {
    let t = property_type.to_lowercase();
    ["condo", "condominium", "co-op", "coop"]
        .iter()
        .any(|k| t.contains(k))
}

/// One fee converted both ways
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NormalizedFee {
    pub monthly: f64,
    pub annual: f64,
    pub frequency: FeeFrequency,
}

impl NormalizedFee {
    pub fn new(amount: f64, frequency: Option<&str>) -> Self {
        let frequency = FeeFrequency::normalize(frequency);
        let annual = amount * frequency.per_year();
        Self {
            monthly: round2(annual / 12.0),
            annual: round2(annual),
            frequency,
        }
    }
}

/// Fee tuples ready to emit, as `(token, value)` pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeeRouting {
    pub hoa: Option<NormalizedFee>,
    pub condo: Option<NormalizedFee>,
    pub primary_frequency: Option<FeeFrequency>,
    pub secondary_frequency: Option<FeeFrequency>,
}

impl FeeRouting {
    /// Route the primary fee by property type; a second fee goes to the other
    /// category
    pub fn route(
        condo_like: bool,
        primary: Option<(f64, Option<&str>)>,
        secondary: Option<(f64, Option<&str>)>,
    ) -> Self {
        let mut routing = FeeRouting::default();
        let primary = primary
            .filter(|(amount, _)| *amount > 0.0)
            .map(|(amount, freq)| NormalizedFee::new(amount, freq));
        let secondary = secondary
            .filter(|(amount, _)| *amount > 0.0)
            .map(|(amount, freq)| NormalizedFee::new(amount, freq));

        routing.primary_frequency = primary.map(|f| f.frequency);
        routing.secondary_frequency = secondary.map(|f| f.frequency);
        if condo_like {
            routing.condo = primary;
            routing.hoa = secondary;
        } else {
            routing.hoa = primary;
            routing.condo = secondary;
        }
        routing
    }

    /// Annual HOA + condo total for canonical 31
    pub fn annual_total(&self) -> Option<f64> {
        if self.hoa.is_none() && self.condo.is_none() {
            return None;
        }
        Some(round2(
            self.hoa.map_or(0.0, |f| f.annual) + self.condo.map_or(0.0, |f| f.annual),
        ))
    }

    pub fn tokens(&self) -> Vec<(&'static str, serde_json::Value)> {
        let mut out = Vec::new();
        if let Some(fee) = self.hoa {
            out.push(("31A", fee.monthly.into()));
            out.push(("31B", fee.annual.into()));
        }
        if let Some(fee) = self.condo {
            out.push(("31C", fee.monthly.into()));
            out.push(("31D", fee.annual.into()));
        }
        if let Some(total) = self.annual_total() {
            out.push(("31", total.into()));
        }
        if let Some(freq) = self.primary_frequency {
            out.push(("31E", freq.label().into()));
        }
        if let Some(freq) = self.secondary_frequency {
            out.push(("31F", freq.label().into()));
        }
        out
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_frequency_normalisation() {
        assert_eq!(FeeFrequency::normalize(Some("Monthly")), FeeFrequency::Monthly);
        assert_eq!(FeeFrequency::normalize(Some("per QTR")), FeeFrequency::Quarterly);
        assert_eq!(FeeFrequency::normalize(Some("Annually")), FeeFrequency::Annually);
        assert_eq!(FeeFrequency::normalize(Some("Yearly")), FeeFrequency::Annually);
        assert_eq!(FeeFrequency::normalize(Some("")), FeeFrequency::Unknown);
        assert_eq!(FeeFrequency::normalize(None), FeeFrequency::Unknown);
    }

    #[test]
    fn test_unknown_frequency_converts_as_monthly() {
        let routing = FeeRouting::route(false, Some((300.0, None)), None);
        let tokens = routing.tokens();
        assert!(tokens.contains(&("31A", json!(300.0))));
        assert!(tokens.contains(&("31B", json!(3600.0))));
        assert!(tokens.contains(&("31", json!(3600.0))));
        assert!(tokens.contains(&("31E", json!("Unknown"))));
        assert!(!tokens.iter().any(|(t, _)| t.starts_with("31C")));
    }

    #[test]
    fn test_condo_routes_to_condo_subfields() {
        assert!(is_condo_like("Residential Condominium"));
        assert!(is_condo_like("Co-Op"));
        assert!(!is_condo_like("Single Family Residence"));

        let routing = FeeRouting::route(true, Some((300.0, Some("Monthly"))), None);
        let tokens = routing.tokens();
        assert!(tokens.contains(&("31C", json!(300.0))));
        assert!(tokens.contains(&("31D", json!(3600.0))));
        assert!(tokens.contains(&("31", json!(3600.0))));
        assert!(!tokens.iter().any(|(t, _)| *t == "31A"));
    }

    #[test]
    fn test_two_fees_sum_into_canonical_total() {
        let routing = FeeRouting::route(
            true,
            Some((1200.0, Some("Quarterly"))),
            Some((600.0, Some("Annual"))),
        );
        assert_eq!(routing.condo.unwrap().monthly, 400.0);
        assert_eq!(routing.hoa.unwrap().monthly, 50.0);
        assert_eq!(routing.annual_total(), Some(5400.0));
        assert!(routing.tokens().contains(&("31F", json!("Annually"))));
    }
}
