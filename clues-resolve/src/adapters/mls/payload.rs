//! RESO-style MLS listing payload
//!
//! Read attribute by attribute: unknown attributes are ignored and every
//! attribute is optional. An attribute of the wrong type is retried in a
//! converted form (`"1998"` for a number, `33774` for text, `"Y"` for a flag)
//! and otherwise dropped on its own; the rest of the listing still maps.
//! List attributes accept either a JSON array or a single string.

use crate::schema::coerce::{parse_number, to_bool};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Number, Value};

/// List attribute: `["Tile", "Metal"]` or `"Tile"`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringList(pub Vec<String>);

impl StringList {
    pub fn items(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str).filter(|s| !s.trim().is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.items().next().is_none()
    }

    pub fn first(&self) -> Option<&str> {
        self.items().next()
    }

    /// `", "`-joined, `None` when empty
    pub fn joined(&self) -> Option<String> {
        let parts: Vec<&str> = self.items().collect();
        (!parts.is_empty()).then(|| parts.join(", "))
    }
}

impl<'de> Deserialize<'de> for StringList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Option::<Repr>::deserialize(deserializer)? {
            None => StringList::default(),
            Some(Repr::One(s)) => StringList(vec![s]),
            Some(Repr::Many(items)) => StringList(items),
        })
    }
}

/// One photo or document attached to a listing
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MlsMedia {
    #[serde(rename = "MediaURL")]
    pub media_url: Option<String>,
    pub order: Option<u32>,
    #[serde(rename = "PreferredPhotoYN")]
    pub preferred_photo_yn: Option<bool>,
}

/// Listing attributes the adapter reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct MlsListing {
    // Address & identity
    pub listing_id: Option<String>,
    pub listing_key: Option<String>,
    pub standard_status: Option<String>,
    pub mls_status: Option<String>,
    pub listing_contract_date: Option<String>,
    pub on_market_date: Option<String>,
    pub unparsed_address: Option<String>,
    pub street_number: Option<String>,
    pub street_name: Option<String>,
    pub city: Option<String>,
    pub state_or_province: Option<String>,
    pub postal_code: Option<String>,
    pub subdivision_name: Option<String>,
    pub county_or_parish: Option<String>,
    pub parcel_number: Option<String>,

    // Pricing
    pub list_price: Option<f64>,
    pub close_date: Option<String>,
    pub close_price: Option<f64>,
    pub tax_assessed_value: Option<f64>,

    // Basics
    pub bedrooms_total: Option<f64>,
    pub bathrooms_full: Option<f64>,
    pub bathrooms_half: Option<f64>,
    pub bathrooms_total_integer: Option<f64>,
    pub living_area: Option<f64>,
    pub building_area_total: Option<f64>,
    pub lot_size_square_feet: Option<f64>,
    pub lot_size_acres: Option<f64>,
    pub year_built: Option<f64>,
    pub property_type: Option<String>,
    pub property_sub_type: Option<String>,
    pub stories: Option<f64>,
    pub stories_total: Option<f64>,
    pub architectural_style: StringList,
    pub levels: StringList,
    pub garage_spaces: Option<f64>,
    pub parking_total: Option<f64>,

    // HOA & taxes
    #[serde(rename = "AssociationYN")]
    pub association_yn: Option<bool>,
    pub association_fee: Option<f64>,
    pub association_fee_frequency: Option<String>,
    pub association_fee2: Option<f64>,
    pub association_fee2_frequency: Option<String>,
    pub association_name: Option<String>,
    pub association_fee_includes: StringList,
    pub ownership: Option<String>,
    pub tax_annual_amount: Option<f64>,
    pub tax_year: Option<f64>,
    #[serde(rename = "HomesteadYN")]
    pub homestead_yn: Option<bool>,

    // Structure
    pub roof: StringList,
    pub year_roof_installed: Option<f64>,
    pub permit_roof: Option<String>,
    pub exterior_construction: StringList,
    pub construction_materials: StringList,
    pub exterior_features: StringList,
    pub foundation_details: StringList,
    pub water_heater_type: Option<String>,
    pub garage_type: Option<String>,
    #[serde(rename = "AttachedGarageYN")]
    pub attached_garage_yn: Option<bool>,
    pub heating: StringList,
    pub cooling: StringList,
    #[serde(rename = "PermitHVAC")]
    pub permit_hvac: Option<String>,
    pub laundry_features: StringList,
    pub property_condition: StringList,

    // Interior / exterior
    pub flooring: StringList,
    pub interior_features: StringList,
    pub appliances: StringList,
    #[serde(rename = "FireplaceYN")]
    pub fireplace_yn: Option<bool>,
    #[serde(rename = "PoolPrivateYN")]
    pub pool_private_yn: Option<bool>,
    pub pool_features: StringList,
    pub patio_and_porch_features: StringList,
    pub fencing: StringList,
    pub lot_features: StringList,
    pub topography: StringList,
    pub vegetation: StringList,

    // Renovations & permits
    pub renovations: Option<String>,
    pub permit_additions: Option<String>,

    // Schools & location
    pub school_district: Option<String>,
    pub elevation: Option<f64>,
    pub elementary_school: Option<String>,
    pub middle_or_junior_school: Option<String>,
    pub high_school: Option<String>,

    // Market, utilities, environment
    pub financing: StringList,
    pub flood_zone: Option<String>,
    pub electric: StringList,
    pub water_source: StringList,
    pub sewer: StringList,
    pub gas: StringList,
    pub view: StringList,
    pub green_energy_generation: StringList,
    pub accessibility_features: StringList,
    pub special_listing_conditions: StringList,
    pub pets_allowed: StringList,

    // Stellar parking / building / legal
    #[serde(rename = "CarportYN")]
    pub carport_yn: Option<bool>,
    pub carport_spaces: Option<f64>,
    pub parking_features: StringList,
    pub assigned_parking_spaces: Option<f64>,
    pub unit_floor: Option<f64>,
    pub building_floors: Option<f64>,
    pub building_name: Option<String>,
    pub building_number: Option<String>,
    #[serde(rename = "ElevatorYN")]
    pub elevator_yn: Option<bool>,
    pub floors_in_unit: Option<f64>,
    pub legal_description: Option<String>,
    #[serde(rename = "CDDYN")]
    pub cdd_yn: Option<bool>,
    #[serde(rename = "CDDAnnualFee")]
    pub cdd_annual_fee: Option<f64>,
    pub direction_faces: Option<String>,

    // Waterfront & leasing
    #[serde(rename = "WaterfrontYN")]
    pub waterfront_yn: Option<bool>,
    pub waterfront_feet: Option<f64>,
    pub canal_frontage: Option<f64>,
    #[serde(rename = "WaterAccessYN")]
    pub water_access_yn: Option<bool>,
    #[serde(rename = "WaterViewYN")]
    pub water_view_yn: Option<bool>,
    pub water_body_name: Option<String>,
    #[serde(rename = "LeaseConsideredYN")]
    pub lease_considered_yn: Option<bool>,
    pub minimum_lease_type: Option<String>,
    pub lease_term: Option<String>,
    #[serde(rename = "LeaseRestrictionsYN")]
    pub lease_restrictions_yn: Option<bool>,
    pub pet_size_limit: Option<String>,
    pub max_pet_weight: Option<f64>,
    #[serde(rename = "AssociationApprovalRequiredYN")]
    pub association_approval_required_yn: Option<bool>,
    pub community_features: StringList,

    // Free text & media
    pub public_remarks: Option<String>,
    pub remarks: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub media: Vec<MlsMedia>,
    #[serde(rename = "VirtualTourURLUnbranded")]
    pub virtual_tour_url_unbranded: Option<String>,
    #[serde(rename = "VirtualTourURLBranded")]
    pub virtual_tour_url_branded: Option<String>,
    pub days_on_market: Option<f64>,
    pub cumulative_days_on_market: Option<f64>,
}

impl MlsListing {
    /// Read a listing from its attribute map
    ///
    /// Returns the listing plus the names of attributes dropped because no
    /// form of their value fits the attribute's type.
    pub fn from_attributes(
        attributes: &Map<String, Value>,
    ) -> Result<(Self, Vec<String>), serde_json::Error> {
        let mut kept = Map::new();
        let mut dropped = Vec::new();
        for (name, value) in attributes {
            let accepted = std::iter::once(value.clone())
                .chain(alternate_forms(value))
                .find(|candidate| attribute_fits(name, candidate));
            match accepted {
                Some(value) => {
                    kept.insert(name.clone(), value);
                }
                None => dropped.push(name.clone()),
            }
        }
        let listing = serde_json::from_value(Value::Object(kept))?;
        Ok((listing, dropped))
    }

    /// Street from `UnparsedAddress`, else number + name
    pub fn street(&self) -> Option<String> {
        non_blank(self.unparsed_address.as_deref()).map(str::to_string).or_else(|| {
            let parts: Vec<&str> = [self.street_number.as_deref(), self.street_name.as_deref()]
                .into_iter()
                .flatten()
                .filter(|s| !s.trim().is_empty())
                .collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        })
    }

    /// `PublicRemarks`, else `Remarks`
    pub fn remarks_text(&self) -> Option<&str> {
        non_blank(self.public_remarks.as_deref()).or_else(|| non_blank(self.remarks.as_deref()))
    }

    /// Both type attributes, for condo detection
    pub fn type_text(&self) -> String {
        [self.property_type.as_deref(), self.property_sub_type.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn attribute_fits(name: &str, value: &Value) -> bool {
    let mut single = Map::new();
    single.insert(name.to_string(), value.clone());
    serde_json::from_value::<MlsListing>(Value::Object(single)).is_ok()
}

/// Converted forms tried after the raw value
fn alternate_forms(value: &Value) -> Vec<Value> {
    match value {
        Value::String(s) => [
            parse_number(s).and_then(Number::from_f64).map(Value::Number),
            to_bool(value).map(Value::Bool),
        ]
        .into_iter()
        .flatten()
        .collect(),
        Value::Number(n) => vec![Value::String(n.to_string())],
        Value::Bool(b) => vec![Value::String(if *b { "Yes" } else { "No" }.to_string())],
        _ => Vec::new(),
    }
}

pub(crate) fn non_blank(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unknown_attributes_ignored() {
        let listing: MlsListing = serde_json::from_value(json!({
            "ListPrice": 450000,
            "SomeVendorExtension": {"nested": true},
            "Roof": "Tile",
            "Heating": ["Central", "Electric"],
        }))
        .unwrap();
        assert_eq!(listing.list_price, Some(450000.0));
        assert_eq!(listing.roof.first(), Some("Tile"));
        assert_eq!(listing.heating.joined().as_deref(), Some("Central, Electric"));
    }

    fn read(value: Value) -> (MlsListing, Vec<String>) {
        MlsListing::from_attributes(value.as_object().unwrap()).unwrap()
    }

    #[test]
    fn test_mistyped_attributes_converted() {
        let (listing, dropped) = read(json!({
            "PostalCode": 33774,
            "StreetNumber": 123,
            "YearBuilt": "1998",
            "ListPrice": "$450,000",
            "HomesteadYN": "Y",
        }));
        assert!(dropped.is_empty());
        assert_eq!(listing.postal_code.as_deref(), Some("33774"));
        assert_eq!(listing.street_number.as_deref(), Some("123"));
        assert_eq!(listing.year_built, Some(1998.0));
        assert_eq!(listing.list_price, Some(450000.0));
        assert_eq!(listing.homestead_yn, Some(true));
    }

    #[test]
    fn test_unusable_attribute_dropped_alone() {
        let (listing, dropped) = read(json!({
            "ListPrice": 450000,
            "BedroomsTotal": "three",
            "Media": "not a list",
        }));
        assert_eq!(dropped.len(), 2);
        assert!(dropped.contains(&"BedroomsTotal".to_string()));
        assert!(dropped.contains(&"Media".to_string()));
        assert_eq!(listing.list_price, Some(450000.0));
        assert_eq!(listing.bedrooms_total, None);
    }

    #[test]
    fn test_street_fallback() {
        let listing: MlsListing = serde_json::from_value(json!({
            "StreetNumber": "12609",
            "StreetName": "130th Street",
        }))
        .unwrap();
        assert_eq!(listing.street().as_deref(), Some("12609 130th Street"));
    }
}
