//! Full-address decomposition
//!
//! `"123 Main St, Springfield, IL 62704"` → street / city / state / zip by
//! positional comma split, with a regex for the trailing state + ZIP part.
//! Parts that cannot be identified stay unset.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `IL 62704`, `IL 62704-1234`, `Illinois 62704`
static STATE_ZIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<state>[A-Za-z][A-Za-z .]*?)\s+(?P<zip>\d{5})(?:-\d{4})?$")
        .expect("state/zip pattern is valid")
});

/// `Springfield IL 62704` when the city is not comma-separated
static CITY_STATE_ZIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<city>.+?)\s+(?P<state>[A-Z]{2})\s+(?P<zip>\d{5})(?:-\d{4})?$")
        .expect("city/state/zip pattern is valid")
});

static ZIP_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<zip>\d{5})(?:-\d{4})?$").expect("zip pattern is valid"));

/// Decomposed address
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressParts {
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
}

impl AddressParts {
    /// Split a full address; never fails, unidentified parts stay `None`
    pub fn parse(full: &str) -> Self {
        let parts: Vec<&str> = full
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();

        let mut out = AddressParts::default();
        match parts.as_slice() {
            [] => {}
            [street] => out.street = Some(street.to_string()),
            [street, rest] => {
                out.street = Some(street.to_string());
                if let Some(caps) = CITY_STATE_ZIP_RE.captures(rest) {
                    out.city = Some(caps["city"].to_string());
                    out.state = Some(caps["state"].to_string());
                    out.zip = Some(caps["zip"].to_string());
                } else {
                    out.city = Some(rest.to_string());
                }
            }
            [street, middle @ .., last] => {
                out.street = Some(street.to_string());
                // City sits right before state/zip; unit parts in between are dropped
                out.city = middle.last().map(|c| c.to_string());
                if let Some(caps) = STATE_ZIP_RE.captures(last) {
                    out.state = Some(caps["state"].trim().to_string());
                    out.zip = Some(caps["zip"].to_string());
                } else if let Some(caps) = ZIP_ONLY_RE.captures(last) {
                    out.zip = Some(caps["zip"].to_string());
                } else if last.chars().all(|c| c.is_ascii_alphabetic() || c == ' ') {
                    out.state = Some(last.to_string());
                }
            }
        }
        out
    }

    /// Rebuild `"street, city, ST zip"` from whatever parts are set
    pub fn to_full_address(&self) -> String {
        let state_zip = match (&self.state, &self.zip) {
            (Some(state), Some(zip)) => Some(format!("{} {}", state, zip)),
            (Some(state), None) => Some(state.clone()),
            (None, Some(zip)) => Some(zip.clone()),
            (None, None) => None,
        };

        [self.street.clone(), self.city.clone(), state_zip]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// First comma-separated part, substituted for `{community}` in search
    /// templates
    pub fn community(full: &str) -> String {
        full.split(',').next().unwrap_or_default().trim().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.street.is_none() && self.city.is_none() && self.state.is_none() && self.zip.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_address_round_trip() {
        let parts = AddressParts::parse("123 Main St, Springfield, IL 62704");
        assert_eq!(parts.street.as_deref(), Some("123 Main St"));
        assert_eq!(parts.city.as_deref(), Some("Springfield"));
        assert_eq!(parts.state.as_deref(), Some("IL"));
        assert_eq!(parts.zip.as_deref(), Some("62704"));

        let rebuilt = AddressParts::parse(&parts.to_full_address());
        assert_eq!(rebuilt, parts);
    }

    #[test]
    fn test_zip_plus_four_and_unit() {
        let parts = AddressParts::parse("500 Bay Dr, Unit 4, Clearwater, FL 33767-1234");
        assert_eq!(parts.street.as_deref(), Some("500 Bay Dr"));
        assert_eq!(parts.city.as_deref(), Some("Clearwater"));
        assert_eq!(parts.state.as_deref(), Some("FL"));
        assert_eq!(parts.zip.as_deref(), Some("33767"));
    }

    #[test]
    fn test_city_state_zip_without_commas() {
        let parts = AddressParts::parse("123 Main St, Springfield IL 62704");
        assert_eq!(parts.city.as_deref(), Some("Springfield"));
        assert_eq!(parts.state.as_deref(), Some("IL"));
        assert_eq!(parts.zip.as_deref(), Some("62704"));
    }

    #[test]
    fn test_unparseable_parts_stay_unset() {
        let parts = AddressParts::parse("somewhere near the lake");
        assert_eq!(parts.street.as_deref(), Some("somewhere near the lake"));
        assert!(parts.city.is_none());
        assert!(parts.zip.is_none());

        let parts = AddressParts::parse("1 A St, Town, ???");
        assert!(parts.state.is_none());
        assert!(parts.zip.is_none());

        assert!(AddressParts::parse("  ").is_empty());
    }
}
