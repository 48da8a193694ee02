//! Canonical audience-targeting record.
//!
//! Every targeting-like shape the completion service produces is normalized
//! into this one schema before it touches a draft (see `draftdesk-targeting`).

use serde::{Deserialize, Serialize};

/// Canonical targeting record attached to an ad-set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Targeting {
    #[serde(default)]
    pub geo_locations: GeoLocations,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_min: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age_max: Option<u8>,
    /// 1 = male, 2 = female. Absent means all genders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genders: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<InterestSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub behaviors: Vec<InterestSpec>,
    /// Interests mirrored into the platform's flexible-spec shape.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flexible_spec: Vec<FlexibleSpec>,
    #[serde(default)]
    pub audience_mode: AudienceMode,
    #[serde(default)]
    pub targeting_automation: TargetingAutomation,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocations {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub countries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<RegionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cities: Vec<CitySpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionSpec {
    pub key: String,
}

/// City targeting always carries a radius and a distance unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitySpec {
    pub key: String,
    pub radius: u32,
    pub distance_unit: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlexibleSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interests: Vec<InterestSpec>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudienceMode {
    #[default]
    Advantage,
    Manual,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetingAutomation {
    pub advantage_audience: u8,
}

impl Targeting {
    pub fn has_geography(&self) -> bool {
        !self.geo_locations.countries.is_empty()
            || !self.geo_locations.regions.is_empty()
            || !self.geo_locations.cities.is_empty()
    }

    /// Gender hint used when synthesizing ad-set names.
    pub fn gender_hint(&self) -> &'static str {
        match self.genders.as_deref() {
            Some([1]) => "Men",
            Some([2]) => "Women",
            _ => "All",
        }
    }
}

impl AudienceMode {
    pub fn label(&self) -> &'static str {
        match self {
            AudienceMode::Advantage => "Advantage",
            AudienceMode::Manual => "Manual",
        }
    }
}
