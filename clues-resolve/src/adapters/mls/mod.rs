//! Structured MLS adapter (`Stellar MLS`)
//!
//! Maps a RESO-style listing onto field tuples at High confidence unless an
//! inference lowers it.
//!
//! # Mapping kinds
//! - **Direct**: attribute copied as-is (`ListPrice` → 10)
//! - **Derived**: arithmetic on attributes (price per sqft, tax rate, fees)
//! - **Inference chains**: first available attribute wins, later links at
//!   Medium confidence (stories, garage type, exterior material)
//! - **Remarks mining**: condition, smart-home, accessibility, special
//!   assessments and renovations from free text (see [`remarks`])

pub mod fees;
pub mod payload;
pub mod remarks;

use super::address::AddressParts;
use super::source_confidence::STELLAR_MLS;
use super::{AdapterContext, AdapterOutput, SourceAdapter};
use crate::error::{AdapterError, AdapterResult};
use crate::types::{Confidence, ExtractionMethod, SourceTuple};
use async_trait::async_trait;
use chrono::{Datelike, Utc};
use fees::{is_condo_like, FeeRouting};
use payload::{non_blank, MlsListing, StringList};
use remarks::RemarksTaxonomy;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collects tuples for one listing
struct Emitter {
    tuples: Vec<SourceTuple>,
}

impl Emitter {
    fn new() -> Self {
        Self { tuples: Vec::new() }
    }

    fn emit(&mut self, token: &str, value: impl Into<Value>) {
        self.emit_with(token, value, Confidence::High);
    }

    fn emit_with(&mut self, token: &str, value: impl Into<Value>, confidence: Confidence) {
        let value = value.into();
        let blank = match &value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Array(items) => items.is_empty(),
            _ => false,
        };
        if blank {
            return;
        }
        self.tuples.push(
            SourceTuple::new(token, value, STELLAR_MLS, confidence)
                .with_method(ExtractionMethod::Direct),
        );
    }

    fn opt<T: Into<Value>>(&mut self, token: &str, value: Option<T>) {
        if let Some(value) = value {
            self.emit(token, value);
        }
    }

    fn text(&mut self, token: &str, value: Option<&str>) {
        self.opt(token, non_blank(value));
    }

    fn joined(&mut self, token: &str, list: &StringList) {
        self.opt(token, list.joined());
    }
}

/// Structured MLS listing adapter
#[derive(Debug, Clone)]
pub struct MlsAdapter {
    taxonomy: Arc<RemarksTaxonomy>,
    current_year: Option<i32>,
}

impl MlsAdapter {
    pub fn new(taxonomy: Arc<RemarksTaxonomy>) -> Self {
        Self {
            taxonomy,
            current_year: None,
        }
    }

    /// Adapter with the built-in remarks taxonomy
    pub fn standard() -> clues_common::Result<Self> {
        Ok(Self::new(Arc::new(RemarksTaxonomy::standard()?)))
    }

    /// Pin the year used for roof age and renovation filtering
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = Some(year);
        self
    }

    fn current_year(&self) -> i32 {
        self.current_year.unwrap_or_else(|| Utc::now().year())
    }

    /// Deserialize and map a raw payload
    ///
    /// Attributes whose value cannot be read are dropped one by one.
    ///
    /// # Errors
    /// `MalformedPayload` when the payload is not a JSON object.
    pub fn adapt_value(&self, payload: &Value) -> AdapterResult<AdapterOutput> {
        let Some(attributes) = payload.as_object() else {
            return Err(AdapterError::MalformedPayload(format!(
                "MLS payload must be a JSON object, got {}",
                json_kind(payload)
            )));
        };
        let (listing, dropped) = MlsListing::from_attributes(attributes)?;
        for attribute in &dropped {
            warn!(
                attribute = %attribute,
                value = %attributes[attribute.as_str()],
                "MLS attribute has an unusable value, dropped"
            );
        }
        Ok(self.map_listing(&listing))
    }

    /// Map a deserialized listing
    pub fn map_listing(&self, listing: &MlsListing) -> AdapterOutput {
        let mut out = Emitter::new();
        let mut output = AdapterOutput::default();
        let current_year = self.current_year();

        Self::map_identity(listing, &mut out, &mut output);
        map_pricing_and_basics(listing, &mut out);
        map_fees_and_taxes(listing, &mut out);
        map_structure(listing, &mut out, current_year);
        self.map_condition(listing, &mut out);
        map_interior_exterior(listing, &mut out);
        map_renovations_and_permits(listing, &mut out, current_year);
        map_location_and_utilities(listing, &mut out);
        output.remarks_excised = self.map_remarks_features(listing, &mut out);
        map_stellar_fields(listing, &mut out);
        output.passthrough = passthrough(listing);

        info!(
            listing = listing.listing_id.as_deref().unwrap_or("-"),
            tuples = out.tuples.len(),
            passthrough = output.passthrough.len(),
            "MLS listing mapped"
        );
        output.tuples = out.tuples;
        output
    }

    fn map_identity(l: &MlsListing, out: &mut Emitter, output: &mut AdapterOutput) {
        let parts = AddressParts {
            street: l.street(),
            city: non_blank(l.city.as_deref()).map(str::to_string),
            state: non_blank(l.state_or_province.as_deref()).map(str::to_string),
            zip: non_blank(l.postal_code.as_deref()).map(str::to_string),
        };
        if !parts.is_empty() {
            out.emit("1_full_address", parts.to_full_address());
            output.address = Some(parts);
        }

        out.text(
            "2_mls_primary",
            non_blank(l.listing_id.as_deref()).or(l.listing_key.as_deref()),
        );
        out.text(
            "4_listing_status",
            non_blank(l.standard_status.as_deref()).or(l.mls_status.as_deref()),
        );
        out.text(
            "5_listing_date",
            non_blank(l.listing_contract_date.as_deref()).or(l.on_market_date.as_deref()),
        );
        out.text("6_neighborhood", l.subdivision_name.as_deref());
        out.text("7_county", l.county_or_parish.as_deref());
        out.text("8_zip_code", l.postal_code.as_deref());
        out.text("9_parcel_id", l.parcel_number.as_deref());
    }

    fn map_condition(&self, l: &MlsListing, out: &mut Emitter) {
        if let Some(condition) = l.property_condition.first() {
            out.emit("48_interior_condition", condition);
            return;
        }
        if let Some(tier) = l
            .remarks_text()
            .and_then(|remarks| self.taxonomy.classify_condition(remarks))
        {
            debug!(tier, "Condition inferred from remarks");
            out.emit_with("48_interior_condition", tier, Confidence::Medium);
        }
    }

    /// Fields 134, 135, 138; returns remarks with mined sentences removed
    fn map_remarks_features(&self, l: &MlsListing, out: &mut Emitter) -> Option<String> {
        let text = l.remarks_text();
        let mut mined_sentences: Vec<String> = Vec::new();
        let mut keep = |sentences: Vec<String>| {
            for s in sentences {
                if !mined_sentences.contains(&s) {
                    mined_sentences.push(s);
                }
            }
        };

        // 134: structured smart features first
        let smart: Vec<&str> = l
            .interior_features
            .items()
            .filter(|f| {
                let f = f.to_lowercase();
                f.contains("smart") || f.contains("automation")
            })
            .collect();
        if !smart.is_empty() {
            out.emit("134_smart_home_features", smart.join(", "));
        } else if let Some(text) = text {
            let mined = remarks::mine_keywords(text, &self.taxonomy.smart_home);
            if !mined.is_empty() {
                out.emit_with("134_smart_home_features", mined.found.join(", "), Confidence::Medium);
                keep(mined.sentences);
            }
        }

        // 135
        if !l.accessibility_features.is_empty() {
            out.joined("135_accessibility_modifications", &l.accessibility_features);
        } else if let Some(text) = text {
            let mined = remarks::mine_keywords(text, &self.taxonomy.accessibility);
            if !mined.is_empty() {
                out.emit_with(
                    "135_accessibility_modifications",
                    mined.found.join(", "),
                    Confidence::Medium,
                );
                keep(mined.sentences);
            }
        }

        // 138: listing conditions, else the first remarks sentence
        let conditions: Vec<&str> = l
            .special_listing_conditions
            .items()
            .filter(|c| {
                let c = c.to_lowercase();
                self.taxonomy
                    .listing_conditions
                    .iter()
                    .any(|k| c.contains(&k.label))
            })
            .collect();
        if !conditions.is_empty() {
            out.emit("138_special_assessments", conditions.join("; "));
        } else if let Some(sentence) =
            text.and_then(|r| remarks::first_sentence_with(r, &self.taxonomy.special_assessments))
        {
            out.emit_with("138_special_assessments", sentence.clone(), Confidence::Medium);
            keep(vec![sentence]);
        }

        text.map(|r| remarks::excise(r, &mined_sentences))
    }
}

#[async_trait]
impl SourceAdapter for MlsAdapter {
    fn name(&self) -> &'static str {
        "mls"
    }

    async fn adapt(&self, payload: &Value, _ctx: &AdapterContext) -> AdapterResult<AdapterOutput> {
        self.adapt_value(payload)
    }
}

// ============================================================================
// Field groups
// ============================================================================

fn map_pricing_and_basics(l: &MlsListing, out: &mut Emitter) {
    out.opt("10_listing_price", l.list_price);
    if let (Some(price), Some(sqft)) = (l.list_price, l.living_area) {
        if sqft > 0.0 {
            out.emit("11_price_per_sqft", round2(price / sqft));
        }
    }
    out.text("13_last_sale_date", l.close_date.as_deref());
    out.opt("14_last_sale_price", l.close_price);
    out.opt("15_assessed_value", l.tax_assessed_value);

    out.opt("17_bedrooms", l.bedrooms_total);
    out.opt("18_full_bathrooms", l.bathrooms_full);
    out.opt("19_half_bathrooms", l.bathrooms_half);
    out.opt("20_total_bathrooms", l.bathrooms_total_integer);
    out.opt("21_living_sqft", l.living_area.map(f64::round));
    out.opt("22_total_sqft_under_roof", l.building_area_total.map(f64::round));
    out.opt("23_lot_size_sqft", l.lot_size_square_feet.map(f64::round));
    out.opt("24_lot_size_acres", l.lot_size_acres);
    out.opt("25_year_built", l.year_built);

    out.text(
        "26_property_type",
        non_blank(l.property_type.as_deref()).or(l.property_sub_type.as_deref()),
    );

    // Stories: explicit count, then style keywords, then Levels
    if let Some(stories) = l.stories.or(l.stories_total) {
        out.emit("27_stories", stories);
    } else if let Some(stories) = l.architectural_style.joined().and_then(|s| stories_from_text(&s)) {
        out.emit_with("27_stories", stories, Confidence::Medium);
    } else if let Some(levels) = l.levels.joined() {
        let value = stories_from_text(&levels).map(Value::from).unwrap_or(Value::from(levels));
        out.emit_with("27_stories", value, Confidence::Medium);
    }

    out.opt("28_garage_spaces", l.garage_spaces);
    out.opt("29_parking_total", l.parking_total);
}

fn map_fees_and_taxes(l: &MlsListing, out: &mut Emitter) {
    out.opt("30_hoa_yn", l.association_yn);

    let routing = FeeRouting::route(
        is_condo_like(&l.type_text()),
        l.association_fee
            .map(|amount| (amount, l.association_fee_frequency.as_deref())),
        l.association_fee2
            .map(|amount| (amount, l.association_fee2_frequency.as_deref())),
    );
    for (token, value) in routing.tokens() {
        out.emit(token, value);
    }

    out.text("32_hoa_name", l.association_name.as_deref());
    out.joined("33_hoa_includes", &l.association_fee_includes);
    out.text("34_ownership_type", l.ownership.as_deref());
    out.opt("35_annual_taxes", l.tax_annual_amount);
    out.opt("36_tax_year", l.tax_year);

    if let (Some(taxes), Some(assessed)) = (l.tax_annual_amount, l.tax_assessed_value) {
        if assessed > 0.0 {
            out.emit("37_property_tax_rate", round2(taxes / assessed * 100.0));
        }
    }
    if l.homestead_yn == Some(true) {
        out.emit("38_tax_exemptions", "Homestead");
    }
}

fn map_structure(l: &MlsListing, out: &mut Emitter, current_year: i32) {
    out.text("39_roof_type", l.roof.first());

    if let Some(year) = l.year_roof_installed.map(|y| y as i32).filter(|y| *y > 0) {
        let age = (current_year - year).max(0);
        out.emit("40_roof_age_est", format!("{} years (installed {})", age, year));
    } else if let Some(permit) = non_blank(l.permit_roof.as_deref()) {
        out.emit_with("40_roof_age_est", format!("Recent permit: {}", permit), Confidence::Medium);
    }

    // Exterior: construction, then materials, then first exterior feature
    if let Some(exterior) = l.exterior_construction.joined() {
        out.emit("41_exterior_material", exterior);
    } else if let Some(materials) = l.construction_materials.joined() {
        out.emit("41_exterior_material", materials);
    } else {
        out.text("41_exterior_material", l.exterior_features.first());
    }

    out.text("42_foundation", l.foundation_details.first());
    out.text("43_water_heater_type", l.water_heater_type.as_deref());

    if let Some(garage) = non_blank(l.garage_type.as_deref()) {
        out.emit("44_garage_type", garage);
    } else if let Some(attached) = l.attached_garage_yn {
        let kind = if attached { "Attached" } else { "Detached" };
        out.emit_with("44_garage_type", kind, Confidence::Medium);
    }

    let hvac: Vec<&str> = l.heating.items().chain(l.cooling.items()).collect();
    if !hvac.is_empty() {
        out.emit("45_hvac_type", hvac.join(", "));
    }
    if let Some(permit) = non_blank(l.permit_hvac.as_deref()) {
        out.emit_with("46_hvac_age", format!("Recent permit: {}", permit), Confidence::Medium);
    }
    out.joined("47_laundry_type", &l.laundry_features);
}

fn map_interior_exterior(l: &MlsListing, out: &mut Emitter) {
    out.joined("49_flooring_type", &l.flooring);

    let kitchen: Vec<&str> = l
        .interior_features
        .items()
        .filter(|f| {
            let f = f.to_lowercase();
            f.contains("kitchen") || f.contains("granite") || f.contains("stainless")
        })
        .collect();
    if !kitchen.is_empty() {
        out.emit("50_kitchen_features", kitchen.join(", "));
    }

    let appliances: Vec<Value> = l.appliances.items().map(Value::from).collect();
    out.emit("51_appliances_included", appliances);
    out.opt("52_fireplace_yn", l.fireplace_yn);
    out.opt("54_pool_yn", l.pool_private_yn);
    out.text("55_pool_type", l.pool_features.first());
    out.joined("56_deck_patio", &l.patio_and_porch_features);
    out.joined("57_fence", &l.fencing);

    // Flood terms in lot features belong to 119, not landscaping
    let landscaping: Vec<&str> = l.lot_features.items().filter(|f| !is_flood_term(f)).collect();
    if !landscaping.is_empty() {
        out.emit("58_landscaping", landscaping.join(", "));
    }
}

fn map_renovations_and_permits(l: &MlsListing, out: &mut Emitter, current_year: i32) {
    let mut renovations: Vec<String> = Vec::new();
    if let Some(structured) = non_blank(l.renovations.as_deref()) {
        renovations.push(structured.trim().to_string());
    }
    if let Some(text) = l.remarks_text() {
        let year_built = l.year_built.map(|y| y as i32);
        for mention in remarks::renovation_mentions(text, year_built, current_year) {
            let lower = mention.to_lowercase();
            if !renovations.iter().any(|r| r.to_lowercase().contains(&lower)) {
                renovations.push(mention);
            }
        }
    }
    if renovations.is_empty() {
        let updated: Vec<&str> = l
            .interior_features
            .items()
            .filter(|f| {
                let f = f.to_lowercase();
                ["updated", "renovated", "remodeled", "new", "upgraded", "modern"]
                    .iter()
                    .any(|k| f.contains(k))
            })
            .collect();
        if !updated.is_empty() {
            renovations.push(format!("Updated features: {}", updated.join(", ")));
        }
    }
    if !renovations.is_empty() {
        renovations.truncate(3);
        let confidence = if non_blank(l.renovations.as_deref()).is_some() {
            Confidence::High
        } else {
            Confidence::Medium
        };
        out.emit_with("59_recent_renovations", renovations.join("; "), confidence);
    }

    if let Some(permit) = non_blank(l.permit_roof.as_deref()) {
        out.emit("60_permit_history_roof", permit);
    } else if let Some(mention) = l.remarks_text().and_then(remarks::roof_work_mention) {
        out.emit_with("60_permit_history_roof", mention, Confidence::Medium);
    }
    out.text("61_permit_history_hvac", l.permit_hvac.as_deref());
    out.text("62_permit_history_other", l.permit_additions.as_deref());
}

fn map_location_and_utilities(l: &MlsListing, out: &mut Emitter) {
    out.text("63_school_district", l.school_district.as_deref());
    out.opt("64_elevation_feet", l.elevation);
    out.text("65_elementary_school", l.elementary_school.as_deref());
    out.text("68_middle_school", l.middle_or_junior_school.as_deref());
    out.text("71_high_school", l.high_school.as_deref());

    out.joined("102_financing_terms", &l.financing);

    out.joined("104_electric_provider", &l.electric);
    out.joined("106_water_provider", &l.water_source);
    out.joined("108_sewer_provider", &l.sewer);
    out.joined("109_natural_gas", &l.gas);

    if let Some(zone) = non_blank(l.flood_zone.as_deref()) {
        out.emit("119_flood_zone", zone);
    } else {
        let flood: Vec<&str> = l.lot_features.items().filter(|f| is_flood_term(f)).collect();
        if !flood.is_empty() {
            out.emit("119_flood_zone", flood.join(", "));
        }
    }

    out.joined("131_view_type", &l.view);

    let mut lot: Vec<&str> = Vec::new();
    for feature in l
        .lot_features
        .items()
        .chain(l.topography.items())
        .chain(l.vegetation.items())
    {
        if !lot.contains(&feature) {
            lot.push(feature);
        }
    }
    if !lot.is_empty() {
        out.emit("132_lot_features", lot.join(", "));
    }

    let ev: Vec<&str> = l
        .green_energy_generation
        .items()
        .filter(|f| {
            let f = f.to_lowercase();
            f.contains("electric vehicle")
                || f.split(|c: char| !c.is_ascii_alphanumeric()).any(|w| w == "ev")
        })
        .collect();
    if !ev.is_empty() {
        out.emit("133_ev_charging", ev.join(", "));
    }

    out.joined("136_pet_policy", &l.pets_allowed);
}

fn map_stellar_fields(l: &MlsListing, out: &mut Emitter) {
    out.opt("139_carport_yn", l.carport_yn);
    out.opt("140_carport_spaces", l.carport_spaces);
    out.opt("141_garage_attached_yn", l.attached_garage_yn);
    out.joined("142_parking_features", &l.parking_features);
    out.opt("143_assigned_parking_spaces", l.assigned_parking_spaces);

    out.opt("144_floor_number", l.unit_floor);
    out.opt("145_building_total_floors", l.building_floors);
    out.text(
        "146_building_name_number",
        non_blank(l.building_name.as_deref()).or(l.building_number.as_deref()),
    );
    out.opt("147_building_elevator_yn", l.elevator_yn);
    out.opt("148_floors_in_unit", l.floors_in_unit);

    out.text("149_subdivision_name", l.subdivision_name.as_deref());
    out.text("150_legal_description", l.legal_description.as_deref());
    out.opt("151_homestead_yn", l.homestead_yn);
    out.opt("152_cdd_yn", l.cdd_yn);
    out.opt("153_annual_cdd_fee", l.cdd_annual_fee);
    out.text("154_front_exposure", l.direction_faces.as_deref());

    out.opt("155_water_frontage_yn", l.waterfront_yn);
    if let Some(feet) = l.waterfront_feet {
        out.emit("156_waterfront_feet", feet);
    } else if let Some(canal) = l.canal_frontage {
        out.emit_with("156_waterfront_feet", canal, Confidence::Medium);
    }
    out.opt("157_water_access_yn", l.water_access_yn);
    out.opt("158_water_view_yn", l.water_view_yn);
    out.text("159_water_body_name", l.water_body_name.as_deref());

    out.opt("160_can_be_leased_yn", l.lease_considered_yn);
    out.text(
        "161_minimum_lease_period",
        non_blank(l.minimum_lease_type.as_deref()).or(l.lease_term.as_deref()),
    );
    out.opt("162_lease_restrictions_yn", l.lease_restrictions_yn);
    out.text("163_pet_size_limit", l.pet_size_limit.as_deref());
    out.opt("164_max_pet_weight", l.max_pet_weight);
    out.opt("165_association_approval_yn", l.association_approval_required_yn);

    out.joined("166_community_features", &l.community_features);
    out.joined("167_interior_features", &l.interior_features);
    out.joined("168_exterior_features", &l.exterior_features);
}

fn passthrough(l: &MlsListing) -> BTreeMap<String, Value> {
    let mut map = BTreeMap::new();
    if let Some(text) = l.remarks_text() {
        map.insert("property_description".to_string(), Value::from(text.trim()));
    }
    if let (Some(lat), Some(lon)) = (l.latitude, l.longitude) {
        map.insert("latitude".to_string(), Value::from(lat));
        map.insert("longitude".to_string(), Value::from(lon));
    }

    let mut photos: Vec<_> = l
        .media
        .iter()
        .filter(|m| non_blank(m.media_url.as_deref()).is_some())
        .collect();
    photos.sort_by_key(|m| m.order.unwrap_or(999));
    let primary = photos
        .iter()
        .find(|m| m.preferred_photo_yn == Some(true))
        .or_else(|| photos.first())
        .and_then(|m| m.media_url.clone());
    if let Some(url) = primary {
        map.insert("property_photo_url".to_string(), Value::from(url));
        let urls: Vec<Value> = photos
            .iter()
            .filter_map(|m| m.media_url.clone())
            .map(Value::from)
            .collect();
        map.insert("property_photos".to_string(), Value::from(urls));
    }

    if let Some(tour) = non_blank(l.virtual_tour_url_unbranded.as_deref())
        .or_else(|| non_blank(l.virtual_tour_url_branded.as_deref()))
    {
        map.insert("virtual_tour_url".to_string(), Value::from(tour));
    }
    if let Some(dom) = l.days_on_market {
        map.insert("DaysOnMarket".to_string(), Value::from(dom));
    }
    if let Some(cdom) = l.cumulative_days_on_market {
        map.insert("CumulativeDaysOnMarket".to_string(), Value::from(cdom));
    }
    map
}

// ============================================================================
// Helpers
// ============================================================================

/// Story count from style or level wording
fn stories_from_text(text: &str) -> Option<u32> {
    let t = text.to_lowercase();
    let words: Vec<&str> = t.split(|c: char| !c.is_ascii_alphanumeric()).collect();
    let has = |phrases: &[&str], word: &str| {
        phrases.iter().any(|p| t.contains(p)) || words.contains(&word)
    };
    if has(&["one story", "1 story", "ranch", "single level"], "one") {
        Some(1)
    } else if has(&["two story", "2 story", "two-story"], "two") {
        Some(2)
    } else if has(&["three story", "3 story", "tri-level"], "three") {
        Some(3)
    } else {
        None
    }
}

fn is_flood_term(feature: &str) -> bool {
    let f = feature.to_lowercase();
    f.contains("flood") || f.contains("fema")
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn adapter() -> MlsAdapter {
        MlsAdapter::standard().unwrap().with_current_year(2024)
    }

    fn value_of<'a>(output: &'a AdapterOutput, token: &str) -> Option<&'a SourceTuple> {
        output.tuples.iter().find(|t| t.token == token)
    }

    #[test]
    fn test_direct_and_derived_fields() {
        let output = adapter()
            .adapt_value(&json!({
                "ListingId": "U8123456",
                "UnparsedAddress": "12609 130th Street",
                "City": "Largo",
                "StateOrProvince": "FL",
                "PostalCode": "33774",
                "ListPrice": 450000,
                "LivingArea": 1850,
                "TaxAnnualAmount": 5400,
                "TaxAssessedValue": 360000,
                "HomesteadYN": true,
                "BedroomsTotal": 3,
            }))
            .unwrap();

        assert_eq!(
            value_of(&output, "1_full_address").unwrap().value,
            json!("12609 130th Street, Largo, FL 33774")
        );
        assert_eq!(value_of(&output, "11_price_per_sqft").unwrap().value, json!(243.24));
        assert_eq!(value_of(&output, "37_property_tax_rate").unwrap().value, json!(1.5));
        assert_eq!(value_of(&output, "38_tax_exemptions").unwrap().value, json!("Homestead"));
        assert_eq!(output.address.as_ref().unwrap().zip.as_deref(), Some("33774"));
        assert!(output
            .tuples
            .iter()
            .all(|t| t.source == STELLAR_MLS && t.method == Some(ExtractionMethod::Direct)));
    }

    #[test]
    fn test_hoa_fee_unknown_frequency() {
        let output = adapter()
            .adapt_value(&json!({ "AssociationFee": 300, "PropertyType": "Residential" }))
            .unwrap();
        assert_eq!(value_of(&output, "31A").unwrap().value, json!(300.0));
        assert_eq!(value_of(&output, "31B").unwrap().value, json!(3600.0));
        assert_eq!(value_of(&output, "31").unwrap().value, json!(3600.0));
        assert_eq!(value_of(&output, "31E").unwrap().value, json!("Unknown"));
    }

    #[test]
    fn test_stories_inference_chain() {
        let output = adapter()
            .adapt_value(&json!({ "ArchitecturalStyle": ["Ranch"] }))
            .unwrap();
        let stories = value_of(&output, "27_stories").unwrap();
        assert_eq!(stories.value, json!(1));
        assert_eq!(stories.confidence, Confidence::Medium);

        let output = adapter()
            .adapt_value(&json!({ "StoriesTotal": 2, "ArchitecturalStyle": ["Ranch"] }))
            .unwrap();
        let stories = value_of(&output, "27_stories").unwrap();
        assert_eq!(stories.value, json!(2.0));
        assert_eq!(stories.confidence, Confidence::High);
    }

    #[test]
    fn test_garage_type_inferred_from_attached_flag() {
        let output = adapter()
            .adapt_value(&json!({ "AttachedGarageYN": true }))
            .unwrap();
        let garage = value_of(&output, "44_garage_type").unwrap();
        assert_eq!(garage.value, json!("Attached"));
        assert_eq!(garage.confidence, Confidence::Medium);
        assert_eq!(value_of(&output, "141_garage_attached_yn").unwrap().value, json!(true));
    }

    #[test]
    fn test_condition_from_remarks_and_excision() {
        let output = adapter()
            .adapt_value(&json!({
                "PublicRemarks": "Immaculate pool home on a quiet street. Includes a Nest thermostat throughout the house. Wheelchair accessible entry with a ramp. Close to shopping.",
            }))
            .unwrap();

        let condition = value_of(&output, "48_interior_condition").unwrap();
        assert_eq!(condition.value, json!("Excellent"));
        assert_eq!(condition.confidence, Confidence::Medium);
        assert_eq!(value_of(&output, "134_smart_home_features").unwrap().value, json!("nest"));
        assert_eq!(
            value_of(&output, "135_accessibility_modifications").unwrap().value,
            json!("wheelchair, accessible, ramp")
        );
        assert_eq!(
            output.remarks_excised.as_deref(),
            Some("Immaculate pool home on a quiet street. Close to shopping.")
        );
        assert!(output.passthrough.contains_key("property_description"));
        assert!(output
            .passthrough
            .keys()
            .all(|k| crate::adapters::PASSTHROUGH_KEYS.contains(&k.as_str())));
    }

    #[test]
    fn test_structured_condition_wins_over_remarks() {
        let output = adapter()
            .adapt_value(&json!({
                "PropertyCondition": ["Updated/Remodeled"],
                "PublicRemarks": "Fixer upper priced to sell quickly.",
            }))
            .unwrap();
        let condition = value_of(&output, "48_interior_condition").unwrap();
        assert_eq!(condition.value, json!("Updated/Remodeled"));
        assert_eq!(condition.confidence, Confidence::High);
    }

    #[test]
    fn test_flood_terms_leave_landscaping() {
        let output = adapter()
            .adapt_value(&json!({ "LotFeatures": ["Landscaped", "FEMA Flood Zone AE"] }))
            .unwrap();
        assert_eq!(value_of(&output, "58_landscaping").unwrap().value, json!("Landscaped"));
        assert_eq!(
            value_of(&output, "119_flood_zone").unwrap().value,
            json!("FEMA Flood Zone AE")
        );
    }

    #[test]
    fn test_photos_prefer_flagged_photo() {
        let output = adapter()
            .adapt_value(&json!({
                "Media": [
                    { "MediaURL": "https://img/2.jpg", "Order": 2 },
                    { "MediaURL": "https://img/1.jpg", "Order": 1 },
                    { "MediaURL": "https://img/3.jpg", "Order": 3, "PreferredPhotoYN": true },
                ]
            }))
            .unwrap();
        assert_eq!(output.passthrough["property_photo_url"], json!("https://img/3.jpg"));
        assert_eq!(
            output.passthrough["property_photos"],
            json!(["https://img/1.jpg", "https://img/2.jpg", "https://img/3.jpg"])
        );
    }

    #[test]
    fn test_roof_age_and_renovations() {
        let output = adapter()
            .adapt_value(&json!({
                "YearRoofInstalled": 2019,
                "YearBuilt": 1998,
                "PublicRemarks": "Kitchen remodeled in 2021 with quartz counters.",
            }))
            .unwrap();
        assert_eq!(
            value_of(&output, "40_roof_age_est").unwrap().value,
            json!("5 years (installed 2019)")
        );
        let renovations = value_of(&output, "59_recent_renovations").unwrap();
        assert_eq!(renovations.value, json!("Kitchen remodeled in 2021"));
        assert_eq!(renovations.confidence, Confidence::Medium);
    }

    #[test]
    fn test_malformed_payloads() {
        assert!(matches!(
            adapter().adapt_value(&json!([1, 2, 3])),
            Err(AdapterError::MalformedPayload(_))
        ));
        assert!(matches!(
            adapter().adapt_value(&json!("ListPrice=450000")),
            Err(AdapterError::MalformedPayload(_))
        ));
    }

    #[test]
    fn test_mistyped_attribute_keeps_other_fields() {
        let output = adapter()
            .adapt_value(&json!({
                "ListPrice": 450000,
                "BedroomsTotal": 3,
                "PostalCode": 33774,
                "GarageSpaces": "lots",
            }))
            .unwrap();
        assert_eq!(value_of(&output, "10_listing_price").unwrap().value, json!(450000.0));
        assert_eq!(value_of(&output, "17_bedrooms").unwrap().value, json!(3.0));
        assert_eq!(value_of(&output, "8_zip_code").unwrap().value, json!("33774"));
        assert!(value_of(&output, "28_garage_spaces").is_none());
    }

    #[test]
    fn test_square_footage_rounded() {
        let output = adapter()
            .adapt_value(&json!({
                "LivingArea": 1850.6,
                "BuildingAreaTotal": 2100.4,
                "LotSizeSquareFeet": 7405.5,
            }))
            .unwrap();
        assert_eq!(value_of(&output, "21_living_sqft").unwrap().value, json!(1851.0));
        assert_eq!(value_of(&output, "22_total_sqft_under_roof").unwrap().value, json!(2100.0));
        assert_eq!(value_of(&output, "23_lot_size_sqft").unwrap().value, json!(7406.0));
    }

    #[test]
    fn test_missing_attributes_only_omit_tuples() {
        let output = adapter().adapt_value(&json!({})).unwrap();
        assert!(output.tuples.is_empty());
        assert!(output.address.is_none());
    }
}
