//! Built-in 181-field catalogue (plus AVM and fee subfields)
//!
//! Numbering follows the 168-field layout extended with the Market
//! Performance block (169-181). Legacy keys that older payloads still send
//! are kept as aliases.

use super::{FieldDefinition, FieldGroup, FieldGroup::*};
use crate::types::{FieldId, FieldType, FieldType::*};

const MAX_PRICE: f64 = 1_000_000_000.0;

pub const FEE_FREQUENCIES: [&str; 4] = ["Monthly", "Quarterly", "Annually", "Unknown"];

pub const CONDITION_OPTIONS: [&str; 7] = [
    "Excellent",
    "Good",
    "Average",
    "Fair",
    "Poor",
    "Renovated",
    "Needs Work",
];

fn field(num: u16, key: &str, label: &str, group: FieldGroup, ty: FieldType) -> FieldDefinition {
    FieldDefinition::new(FieldId::new(num), key, label, group, ty)
}

fn subfield(
    num: u16,
    sub: char,
    key: &str,
    label: &str,
    group: FieldGroup,
    ty: FieldType,
) -> FieldDefinition {
    FieldDefinition::new(FieldId::sub(num, sub), key, label, group, ty)
}

/// Every field of the standard schema, in id order
pub fn standard_fields() -> Vec<FieldDefinition> {
    let mut fields = Vec::with_capacity(195);
    fields.extend(address_and_pricing());
    fields.extend(basics_and_fees());
    fields.extend(structure_and_features());
    fields.extend(schools_and_location());
    fields.extend(market_and_utilities());
    fields.extend(environment_and_additional());
    fields.extend(stellar_mls());
    fields.extend(market_performance());
    fields
}

fn address_and_pricing() -> Vec<FieldDefinition> {
    vec![
        field(1, "full_address", "Full Address", AddressIdentity, Text).required(),
        field(2, "mls_primary", "MLS Primary", AddressIdentity, Text),
        field(3, "mls_secondary", "MLS Secondary", AddressIdentity, Text),
        field(4, "listing_status", "Listing Status", AddressIdentity, Select).options(&[
            "Active",
            "Pending",
            "Active Under Contract",
            "Sold",
            "Closed",
            "Expired",
            "Withdrawn",
            "Off-Market",
        ]),
        field(5, "listing_date", "Listing Date", AddressIdentity, Date),
        field(6, "neighborhood", "Neighborhood", AddressIdentity, Text),
        field(7, "county", "County", AddressIdentity, Text),
        field(8, "zip_code", "ZIP Code", AddressIdentity, Text),
        field(9, "parcel_id", "Parcel ID", AddressIdentity, Text),
        field(10, "listing_price", "Listing Price", PricingValue, Currency)
            .required()
            .range(0.0, MAX_PRICE),
        field(11, "price_per_sqft", "Price Per Sq Ft", PricingValue, Currency)
            .range(0.0, 50_000.0),
        field(12, "market_value_estimate", "Market Value Estimate", PricingValue, Currency)
            .range(0.0, MAX_PRICE),
        field(13, "last_sale_date", "Last Sale Date", PricingValue, Date),
        field(14, "last_sale_price", "Last Sale Price", PricingValue, Currency)
            .range(0.0, MAX_PRICE),
        field(15, "assessed_value", "Assessed Value", PricingValue, Currency)
            .range(0.0, MAX_PRICE),
        field(16, "avms", "AVM Average", PricingValue, Currency).calculated(),
        subfield(16, 'a', "zestimate", "Zestimate", PricingValue, Currency).range(0.0, MAX_PRICE),
        subfield(16, 'b', "redfin_estimate", "Redfin Estimate", PricingValue, Currency)
            .range(0.0, MAX_PRICE),
        subfield(16, 'c', "first_american_avm", "First American AVM", PricingValue, Currency)
            .range(0.0, MAX_PRICE),
        subfield(16, 'd', "quantarium_avm", "Quantarium AVM", PricingValue, Currency)
            .range(0.0, MAX_PRICE),
        subfield(16, 'e', "ice_avm", "ICE AVM", PricingValue, Currency).range(0.0, MAX_PRICE),
        subfield(
            16,
            'f',
            "collateral_analytics_avm",
            "Collateral Analytics AVM",
            PricingValue,
            Currency,
        )
        .range(0.0, MAX_PRICE),
    ]
}

fn basics_and_fees() -> Vec<FieldDefinition> {
    vec![
        field(17, "bedrooms", "Bedrooms", PropertyBasics, Number)
            .required()
            .range(0.0, 20.0),
        field(18, "full_bathrooms", "Full Bathrooms", PropertyBasics, Number)
            .required()
            .range(0.0, 20.0),
        field(19, "half_bathrooms", "Half Bathrooms", PropertyBasics, Number).range(0.0, 10.0),
        field(20, "total_bathrooms", "Total Bathrooms", PropertyBasics, Number).range(0.0, 30.0),
        field(21, "living_sqft", "Living Sq Ft", PropertyBasics, Number)
            .required()
            .range(0.0, 50_000.0),
        field(22, "total_sqft_under_roof", "Total Sq Ft Under Roof", PropertyBasics, Number)
            .range(0.0, 100_000.0),
        field(23, "lot_size_sqft", "Lot Size (Sq Ft)", PropertyBasics, Number),
        field(24, "lot_size_acres", "Lot Size (Acres)", PropertyBasics, Number),
        field(25, "year_built", "Year Built", PropertyBasics, Number)
            .required()
            .range(1700.0, 2100.0),
        field(26, "property_type", "Property Type", PropertyBasics, Select)
            .required()
            .options(&[
                "Single Family",
                "Condo",
                "Townhouse",
                "Villa",
                "Multi-Family",
                "Mobile Home",
                "Land",
                "Commercial",
            ]),
        field(27, "stories", "Stories", PropertyBasics, Number).range(0.0, 200.0),
        field(28, "garage_spaces", "Garage Spaces", PropertyBasics, Number).range(0.0, 50.0),
        field(29, "parking_total", "Parking Total", PropertyBasics, Text),
        field(30, "hoa_yn", "HOA", HoaTaxes, Boolean),
        field(31, "association_fee", "Association Fees (Annual Total)", HoaTaxes, Currency)
            .alias("hoa_fee_annual"),
        subfield(31, 'A', "hoa_fee_monthly", "HOA Fee (Monthly)", HoaTaxes, Currency),
        subfield(31, 'B', "hoa_fee_annual", "HOA Fee (Annual)", HoaTaxes, Currency),
        subfield(31, 'C', "condo_fee_monthly", "Condo Fee (Monthly)", HoaTaxes, Currency),
        subfield(31, 'D', "condo_fee_annual", "Condo Fee (Annual)", HoaTaxes, Currency),
        subfield(
            31,
            'E',
            "fee_frequency_primary",
            "Fee Frequency (Primary)",
            HoaTaxes,
            Select,
        )
        .options(&FEE_FREQUENCIES),
        subfield(
            31,
            'F',
            "fee_frequency_secondary",
            "Fee Frequency (Secondary)",
            HoaTaxes,
            Select,
        )
        .options(&FEE_FREQUENCIES),
        field(32, "hoa_name", "HOA Name", HoaTaxes, Text),
        field(33, "hoa_includes", "HOA Includes", HoaTaxes, Text),
        field(34, "ownership_type", "Ownership Type", HoaTaxes, Select).options(&[
            "Fee Simple",
            "Leasehold",
            "Condominium",
            "Co-op",
            "Timeshare",
        ]),
        field(35, "annual_taxes", "Annual Taxes", HoaTaxes, Currency).range(0.0, 10_000_000.0),
        field(36, "tax_year", "Tax Year", HoaTaxes, Number).range(1900.0, 2100.0),
        field(37, "property_tax_rate", "Property Tax Rate", HoaTaxes, Percentage)
            .range(0.0, 100.0),
        field(38, "tax_exemptions", "Tax Exemptions", HoaTaxes, Text),
    ]
}

fn structure_and_features() -> Vec<FieldDefinition> {
    vec![
        field(39, "roof_type", "Roof Type", StructureSystems, Select).options(&[
            "Shingle", "Tile", "Metal", "Flat", "Slate", "Other",
        ]),
        field(40, "roof_age_est", "Roof Age (Est)", StructureSystems, Text),
        field(41, "exterior_material", "Exterior Material", StructureSystems, Select).options(&[
            "Block/Stucco",
            "Brick",
            "Wood",
            "Vinyl Siding",
            "Fiber Cement",
            "Concrete",
            "Other",
        ]),
        field(42, "foundation", "Foundation", StructureSystems, Select).options(&[
            "Slab",
            "Crawl Space",
            "Basement",
            "Pier/Beam",
            "Other",
        ]),
        field(43, "water_heater_type", "Water Heater Type", StructureSystems, Text),
        field(44, "garage_type", "Garage Type", StructureSystems, Text),
        field(45, "hvac_type", "HVAC Type", StructureSystems, Text),
        field(46, "hvac_age", "HVAC Age", StructureSystems, Text),
        field(47, "laundry_type", "Laundry Type", StructureSystems, Text),
        field(48, "interior_condition", "Interior Condition", StructureSystems, Select)
            .options(&CONDITION_OPTIONS),
        field(49, "flooring_type", "Flooring Type", InteriorFeatures, Text),
        field(50, "kitchen_features", "Kitchen Features", InteriorFeatures, Text),
        field(51, "appliances_included", "Appliances Included", InteriorFeatures, Multiselect)
            .options(&[
                "Refrigerator",
                "Dishwasher",
                "Range/Oven",
                "Microwave",
                "Washer",
                "Dryer",
                "Disposal",
                "Wine Cooler",
            ]),
        field(52, "fireplace_yn", "Fireplace", InteriorFeatures, Boolean),
        field(53, "primary_br_location", "Primary BR Location", InteriorFeatures, Text),
        field(54, "pool_yn", "Pool", ExteriorFeatures, Boolean),
        field(55, "pool_type", "Pool Type", ExteriorFeatures, Select).options(&[
            "N/A",
            "In-ground",
            "Above-ground",
            "In-ground Heated",
            "Community",
        ]),
        field(56, "deck_patio", "Deck/Patio", ExteriorFeatures, Text),
        field(57, "fence", "Fence", ExteriorFeatures, Text),
        field(58, "landscaping", "Landscaping", ExteriorFeatures, Text),
        field(59, "recent_renovations", "Recent Renovations", PermitsRenovations, Text),
        field(60, "permit_history_roof", "Permit History - Roof", PermitsRenovations, Text),
        field(61, "permit_history_hvac", "Permit History - HVAC", PermitsRenovations, Text),
        field(62, "permit_history_other", "Permit History - Other", PermitsRenovations, Text),
    ]
}

fn schools_and_location() -> Vec<FieldDefinition> {
    vec![
        field(63, "school_district", "School District", AssignedSchools, Text),
        field(64, "elevation_feet", "Elevation (feet)", AssignedSchools, Number),
        field(65, "elementary_school", "Elementary School", AssignedSchools, Text)
            .alias("assigned_elementary"),
        field(66, "elementary_rating", "Elementary Rating", AssignedSchools, Text),
        field(67, "elementary_distance_mi", "Elementary Distance (mi)", AssignedSchools, Number)
            .range(0.0, 500.0),
        field(68, "middle_school", "Middle School", AssignedSchools, Text)
            .alias("assigned_middle"),
        field(69, "middle_rating", "Middle Rating", AssignedSchools, Text),
        field(70, "middle_distance_mi", "Middle Distance (mi)", AssignedSchools, Number)
            .range(0.0, 500.0),
        field(71, "high_school", "High School", AssignedSchools, Text).alias("assigned_high"),
        field(72, "high_rating", "High Rating", AssignedSchools, Text),
        field(73, "high_distance_mi", "High Distance (mi)", AssignedSchools, Number)
            .range(0.0, 500.0),
        field(74, "walk_score", "Walk Score", LocationScores, Number).range(0.0, 100.0),
        field(75, "transit_score", "Transit Score", LocationScores, Number).range(0.0, 100.0),
        field(76, "bike_score", "Bike Score", LocationScores, Number).range(0.0, 100.0),
        field(77, "safety_score", "Safety", LocationScores, Number).range(0.0, 100.0),
        field(78, "noise_level", "Noise Level", LocationScores, Text),
        field(79, "traffic_level", "Traffic Level", LocationScores, Text),
        field(80, "walkability_description", "Walkability Description", LocationScores, Text),
        field(81, "public_transit_access", "Public Transit Access", LocationScores, Text),
        field(82, "commute_to_city_center", "Commute to City Center", LocationScores, Text)
            .alias("commute_time_city"),
        field(83, "distance_grocery_mi", "Distance to Grocery (mi)", DistancesAmenities, Number),
        field(84, "distance_hospital_mi", "Distance to Hospital (mi)", DistancesAmenities, Number),
        field(85, "distance_airport_mi", "Distance to Airport (mi)", DistancesAmenities, Number),
        field(86, "distance_park_mi", "Distance to Park (mi)", DistancesAmenities, Number),
        field(87, "distance_beach_mi", "Distance to Beach (mi)", DistancesAmenities, Number),
        field(88, "violent_crime_index", "Violent Crime Index", SafetyCrime, Text)
            .alias("crime_index_violent"),
        field(89, "property_crime_index", "Property Crime Index", SafetyCrime, Text)
            .alias("crime_index_property"),
        field(90, "neighborhood_safety_rating", "Neighborhood Safety Rating", SafetyCrime, Text),
    ]
}

fn market_and_utilities() -> Vec<FieldDefinition> {
    vec![
        field(
            91,
            "median_home_price_neighborhood",
            "Median Home Price (Neighborhood)",
            MarketInvestment,
            Currency,
        )
        .range(0.0, MAX_PRICE)
        .alias("median_home_price_area"),
        field(
            92,
            "price_per_sqft_recent_avg",
            "Price Per Sq Ft (Recent Avg)",
            MarketInvestment,
            Currency,
        )
        .alias("price_per_sqft_avg"),
        field(93, "price_to_rent_ratio", "Price to Rent Ratio", MarketInvestment, Number),
        field(94, "price_vs_median_percent", "Price vs Median %", MarketInvestment, Percentage)
            .calculated(),
        field(95, "days_on_market_avg", "Days on Market (Avg)", MarketInvestment, Number),
        field(96, "inventory_surplus", "Inventory Surplus", MarketInvestment, Text),
        field(97, "insurance_est_annual", "Insurance Estimate (Annual)", MarketInvestment, Currency),
        field(98, "rental_estimate_monthly", "Rental Estimate (Monthly)", MarketInvestment, Currency)
            .range(0.0, 1_000_000.0),
        field(99, "rental_yield_est", "Rental Yield (Est)", MarketInvestment, Percentage)
            .calculated(),
        field(
            100,
            "vacancy_rate_neighborhood",
            "Vacancy Rate (Neighborhood)",
            MarketInvestment,
            Percentage,
        )
        .range(0.0, 100.0)
        .alias("vacancy_rate_area"),
        field(101, "cap_rate_est", "Cap Rate (Est)", MarketInvestment, Percentage).calculated(),
        field(102, "financing_terms", "Financing Terms", MarketInvestment, Text),
        field(103, "comparable_sales", "Comparable Sales", MarketInvestment, Text),
        field(104, "electric_provider", "Electric Provider", UtilitiesConnectivity, Text),
        field(105, "avg_electric_bill", "Avg Electric Bill", UtilitiesConnectivity, Text),
        field(106, "water_provider", "Water Provider", UtilitiesConnectivity, Text),
        field(107, "avg_water_bill", "Avg Water Bill", UtilitiesConnectivity, Text),
        field(108, "sewer_provider", "Sewer Provider", UtilitiesConnectivity, Text),
        field(109, "natural_gas", "Natural Gas", UtilitiesConnectivity, Text),
        field(110, "trash_provider", "Trash Provider", UtilitiesConnectivity, Text),
        field(
            111,
            "internet_providers_top3",
            "Internet Providers (Top 3)",
            UtilitiesConnectivity,
            Text,
        )
        .alias("internet_providers"),
        field(112, "max_internet_speed", "Max Internet Speed", UtilitiesConnectivity, Text),
        field(113, "fiber_available", "Fiber Available", UtilitiesConnectivity, Text),
        field(114, "cable_tv_provider", "Cable TV Provider", UtilitiesConnectivity, Text),
        field(115, "cell_coverage_quality", "Cell Coverage Quality", UtilitiesConnectivity, Text),
        field(
            116,
            "emergency_services_distance",
            "Emergency Services Distance",
            UtilitiesConnectivity,
            Text,
        ),
    ]
}

fn environment_and_additional() -> Vec<FieldDefinition> {
    vec![
        field(117, "air_quality_index", "Air Quality Index", EnvironmentRisk, Text),
        field(118, "air_quality_grade", "Air Quality Grade", EnvironmentRisk, Text),
        field(119, "flood_zone", "Flood Zone", EnvironmentRisk, Text),
        field(120, "flood_risk_level", "Flood Risk Level", EnvironmentRisk, Text),
        field(121, "climate_risk", "Climate Risk", EnvironmentRisk, Text)
            .alias("climate_risk_summary"),
        field(122, "wildfire_risk", "Wildfire Risk", EnvironmentRisk, Text),
        field(123, "earthquake_risk", "Earthquake Risk", EnvironmentRisk, Text),
        field(124, "hurricane_risk", "Hurricane Risk", EnvironmentRisk, Text),
        field(125, "tornado_risk", "Tornado Risk", EnvironmentRisk, Text),
        field(126, "radon_risk", "Radon Risk", EnvironmentRisk, Text),
        field(127, "superfund_site_nearby", "Superfund Site Nearby", EnvironmentRisk, Text),
        field(128, "sea_level_rise_risk", "Sea Level Rise Risk", EnvironmentRisk, Text),
        field(129, "noise_level_db_est", "Noise Level (dB Est)", EnvironmentRisk, Text),
        field(130, "solar_potential", "Solar Potential", EnvironmentRisk, Text),
        field(131, "view_type", "View Type", AdditionalFeatures, Text),
        field(132, "lot_features", "Lot Features", AdditionalFeatures, Text),
        field(133, "ev_charging", "EV Charging", AdditionalFeatures, Text).alias("ev_charging_yn"),
        field(134, "smart_home_features", "Smart Home Features", AdditionalFeatures, Text),
        field(
            135,
            "accessibility_modifications",
            "Accessibility Modifications",
            AdditionalFeatures,
            Text,
        )
        .alias("accessibility_mods"),
        field(136, "pet_policy", "Pet Policy", AdditionalFeatures, Text),
        field(137, "age_restrictions", "Age Restrictions", AdditionalFeatures, Text),
        field(138, "special_assessments", "Special Assessments", AdditionalFeatures, Text),
    ]
}

fn stellar_mls() -> Vec<FieldDefinition> {
    vec![
        field(139, "carport_yn", "Carport Y/N", MlsParking, Boolean),
        field(140, "carport_spaces", "Carport Spaces", MlsParking, Number),
        field(141, "garage_attached_yn", "Garage Attached Y/N", MlsParking, Boolean),
        field(142, "parking_features", "Parking Features", MlsParking, Text),
        field(143, "assigned_parking_spaces", "Assigned Parking Spaces", MlsParking, Number),
        field(144, "floor_number", "Floor Number", MlsBuilding, Number),
        field(145, "building_total_floors", "Building Total Floors", MlsBuilding, Number),
        field(146, "building_name_number", "Building Name/Number", MlsBuilding, Text),
        field(147, "building_elevator_yn", "Building Elevator Y/N", MlsBuilding, Boolean),
        field(148, "floors_in_unit", "Floors in Unit", MlsBuilding, Number),
        field(149, "subdivision_name", "Subdivision Name", MlsLegal, Text),
        field(150, "legal_description", "Legal Description", MlsLegal, Text),
        field(151, "homestead_yn", "Homestead Exemption", MlsLegal, Boolean),
        field(152, "cdd_yn", "CDD Y/N", MlsLegal, Boolean),
        field(153, "annual_cdd_fee", "Annual CDD Fee", MlsLegal, Currency),
        field(154, "front_exposure", "Front Exposure", MlsLegal, Text),
        field(155, "water_frontage_yn", "Water Frontage Y/N", MlsWaterfront, Boolean),
        field(156, "waterfront_feet", "Waterfront Feet", MlsWaterfront, Number),
        field(157, "water_access_yn", "Water Access Y/N", MlsWaterfront, Boolean),
        field(158, "water_view_yn", "Water View Y/N", MlsWaterfront, Boolean),
        field(159, "water_body_name", "Water Body Name", MlsWaterfront, Text),
        field(160, "can_be_leased_yn", "Can Be Leased Y/N", MlsLeasing, Boolean),
        field(161, "minimum_lease_period", "Minimum Lease Period", MlsLeasing, Text),
        field(162, "lease_restrictions_yn", "Lease Restrictions Y/N", MlsLeasing, Boolean),
        field(163, "pet_size_limit", "Pet Size Limit", MlsLeasing, Text),
        field(164, "max_pet_weight", "Max Pet Weight (lbs)", MlsLeasing, Number),
        field(165, "association_approval_yn", "Association Approval Req", MlsLeasing, Boolean),
        field(166, "community_features", "Community Features", MlsFeatures, Text),
        field(167, "interior_features", "Interior Features", MlsFeatures, Text),
        field(168, "exterior_features", "Exterior Features", MlsFeatures, Text),
    ]
}

fn market_performance() -> Vec<FieldDefinition> {
    vec![
        field(169, "months_of_inventory", "Months of Inventory", MarketPerformance, Number),
        field(170, "new_listings_30d", "New Listings (30d)", MarketPerformance, Number),
        field(171, "homes_sold_30d", "Homes Sold (30d)", MarketPerformance, Number),
        field(172, "median_dom_zip", "Median DOM (ZIP)", MarketPerformance, Number),
        field(173, "price_reduced_percent", "Price Reduced %", MarketPerformance, Percentage)
            .range(0.0, 100.0),
        field(174, "homes_under_contract", "Homes Under Contract", MarketPerformance, Number),
        field(175, "market_type", "Market Type", MarketPerformance, Select)
            .options(&["Buyer's Market", "Seller's Market", "Balanced"])
            .alias("buyer_vs_seller_market"),
        field(
            176,
            "avg_sale_to_list_percent",
            "Avg Sale-to-List %",
            MarketPerformance,
            Percentage,
        )
        .range(0.0, 200.0),
        field(177, "avg_days_to_pending", "Avg Days to Pending", MarketPerformance, Number),
        field(
            178,
            "multiple_offers_likelihood",
            "Multiple Offers Likelihood",
            MarketPerformance,
            Text,
        ),
        field(179, "appreciation_percent", "Appreciation %", MarketPerformance, Percentage)
            .range(-100.0, 1000.0),
        field(180, "price_trend", "Price Trend", MarketPerformance, Select)
            .options(&["Rising", "Stable", "Declining"]),
        field(
            181,
            "market_volatility_score",
            "Market Volatility Score",
            MarketPerformance,
            Number,
        )
        .calculated(),
    ]
}
