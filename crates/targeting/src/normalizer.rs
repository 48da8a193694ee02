//! Pure targeting normalization. No network calls; idempotent by contract:
//! normalizing an already-canonical record returns it unchanged.

use draftdesk_core::config::DraftingConfig;
use draftdesk_core::targeting::{
    AudienceMode, CitySpec, FlexibleSpec, GeoLocations, InterestSpec, RegionSpec, Targeting,
    TargetingAutomation,
};
use serde_json::Value;
use tracing::debug;

enum GeoGuess {
    Region(&'static str),
    Country(&'static str),
}

/// Free-text location guesses. Matched as lowercase substrings, first hit
/// wins.
const LOCATION_KEYWORDS: &[(&str, GeoGuess)] = &[
    ("paulo", GeoGuess::Region("454")),
    ("rio de janeiro", GeoGuess::Region("452")),
    ("rio", GeoGuess::Region("452")),
    ("minas", GeoGuess::Region("448")),
    ("brasil", GeoGuess::Country("BR")),
    ("brazil", GeoGuess::Country("BR")),
    ("portugal", GeoGuess::Country("PT")),
    ("estados unidos", GeoGuess::Country("US")),
    ("united states", GeoGuess::Country("US")),
    ("eua", GeoGuess::Country("US")),
    ("usa", GeoGuess::Country("US")),
    ("mexico", GeoGuess::Country("MX")),
    ("argentina", GeoGuess::Country("AR")),
];

/// Converts an arbitrary targeting-like object into the canonical record.
pub fn normalize(value: &Value, cfg: &DraftingConfig) -> Targeting {
    if let Some(canonical) = try_canonical(value, cfg) {
        return canonical;
    }

    let geo_locations = resolve_geography(value, cfg);
    let (age_min, age_max) = resolve_ages(value);
    let genders = resolve_genders(value);
    let interests = resolve_named_specs(value.get("interests"));
    let behaviors = resolve_named_specs(value.get("behaviors"));

    let flexible_spec = if interests.is_empty() {
        Vec::new()
    } else {
        vec![FlexibleSpec {
            interests: interests.clone(),
        }]
    };

    let audience_mode = resolve_audience_mode(value, &interests, &behaviors, genders.as_deref(), age_min, age_max);
    let targeting_automation = TargetingAutomation {
        advantage_audience: u8::from(audience_mode == AudienceMode::Advantage),
    };

    Targeting {
        geo_locations,
        age_min,
        age_max,
        genders,
        interests,
        behaviors,
        flexible_spec,
        audience_mode,
        targeting_automation,
    }
}

/// True when the raw value carries any geography signal the normalizer can
/// resolve without falling back to the default country. The validation gate
/// uses this before any draft or wizard is produced.
pub fn has_geography_signal(value: &Value) -> bool {
    if value
        .get("geo_locations")
        .is_some_and(|g| geo_object_non_empty(g))
    {
        return true;
    }
    if value
        .get("locations")
        .and_then(Value::as_array)
        .is_some_and(|a| !a.is_empty())
    {
        return true;
    }
    if value
        .get("countries")
        .and_then(Value::as_array)
        .is_some_and(|a| !a.is_empty())
    {
        return true;
    }
    free_text_location(value).is_some_and(|text| guess_location(&text).is_some())
}

// ─── Canonical passthrough ──────────────────────────────────────────────

/// A record that already carries the canonical markers is passed through
/// unchanged (modulo defaulted city radius metadata, which canonical
/// records always have).
fn try_canonical(value: &Value, _cfg: &DraftingConfig) -> Option<Targeting> {
    if !value.get("geo_locations").is_some_and(Value::is_object)
        || value.get("targeting_automation").is_none()
    {
        return None;
    }
    serde_json::from_value::<Targeting>(value.clone()).ok()
}

// ─── Geography ──────────────────────────────────────────────────────────

fn resolve_geography(value: &Value, cfg: &DraftingConfig) -> GeoLocations {
    // Explicit structured geo_locations.
    if let Some(geo) = value.get("geo_locations") {
        if geo_object_non_empty(geo) {
            return parse_geo_object(geo, cfg);
        }
    }

    // Array of named locations (split by type) or bare keys (assumed cities).
    if let Some(locations) = value.get("locations").and_then(Value::as_array) {
        if !locations.is_empty() {
            return parse_location_array(locations, cfg);
        }
    }

    // Flat countries list.
    if let Some(countries) = value.get("countries").and_then(Value::as_array) {
        let countries: Vec<String> = countries
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
        if !countries.is_empty() {
            return GeoLocations {
                countries,
                ..Default::default()
            };
        }
    }

    // Free-text guess against the keyword table.
    if let Some(text) = free_text_location(value) {
        if let Some(geo) = guess_location(&text) {
            debug!(location = %text, "Resolved free-text location via keyword table");
            return geo;
        }
    }

    // Last tier: single fallback country.
    GeoLocations {
        countries: vec![cfg.fallback_country.clone()],
        ..Default::default()
    }
}

fn geo_object_non_empty(geo: &Value) -> bool {
    ["countries", "regions", "cities"].iter().any(|k| {
        geo.get(k)
            .and_then(Value::as_array)
            .is_some_and(|a| !a.is_empty())
    })
}

fn parse_geo_object(geo: &Value, cfg: &DraftingConfig) -> GeoLocations {
    let countries = geo
        .get("countries")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let regions = geo
        .get("regions")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(parse_region).collect())
        .unwrap_or_default();

    let cities = geo
        .get("cities")
        .and_then(Value::as_array)
        .map(|a| a.iter().filter_map(|c| parse_city(c, cfg)).collect())
        .unwrap_or_default();

    GeoLocations {
        countries,
        regions,
        cities,
    }
}

fn parse_region(value: &Value) -> Option<RegionSpec> {
    let key = match value {
        Value::String(s) => s.clone(),
        Value::Object(_) => value
            .get("key")
            .or_else(|| value.get("name"))
            .and_then(Value::as_str)?
            .to_string(),
        _ => return None,
    };
    (!key.is_empty()).then_some(RegionSpec { key })
}

fn parse_city(value: &Value, cfg: &DraftingConfig) -> Option<CitySpec> {
    let key = match value {
        Value::String(s) => s.clone(),
        Value::Object(_) => value
            .get("key")
            .or_else(|| value.get("name"))
            .and_then(Value::as_str)?
            .to_string(),
        _ => return None,
    };
    if key.is_empty() {
        return None;
    }
    let radius = value
        .get("radius")
        .and_then(Value::as_u64)
        .map(|r| r as u32)
        .unwrap_or(cfg.city_radius);
    let distance_unit = value
        .get("distance_unit")
        .and_then(Value::as_str)
        .unwrap_or(&cfg.city_radius_unit)
        .to_string();
    Some(CitySpec {
        key,
        radius,
        distance_unit,
    })
}

fn parse_location_array(locations: &[Value], cfg: &DraftingConfig) -> GeoLocations {
    let mut geo = GeoLocations::default();
    for entry in locations {
        match entry {
            // Bare keys are assumed to be cities.
            Value::String(_) => {
                if let Some(city) = parse_city(entry, cfg) {
                    geo.cities.push(city);
                }
            }
            Value::Object(_) => {
                let kind = entry
                    .get("type")
                    .and_then(Value::as_str)
                    .unwrap_or("city")
                    .to_ascii_lowercase();
                match kind.as_str() {
                    "country" => {
                        if let Some(key) = entry
                            .get("key")
                            .or_else(|| entry.get("name"))
                            .and_then(Value::as_str)
                        {
                            geo.countries.push(key.to_string());
                        }
                    }
                    "region" | "state" => {
                        if let Some(region) = parse_region(entry) {
                            geo.regions.push(region);
                        }
                    }
                    _ => {
                        if let Some(city) = parse_city(entry, cfg) {
                            geo.cities.push(city);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    geo
}

fn free_text_location(value: &Value) -> Option<String> {
    match value.get("location") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.to_lowercase()),
        _ => match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.to_lowercase()),
            _ => None,
        },
    }
}

fn guess_location(text: &str) -> Option<GeoLocations> {
    for (keyword, guess) in LOCATION_KEYWORDS {
        if text.contains(keyword) {
            return Some(match guess {
                GeoGuess::Region(key) => GeoLocations {
                    regions: vec![RegionSpec {
                        key: (*key).to_string(),
                    }],
                    ..Default::default()
                },
                GeoGuess::Country(code) => GeoLocations {
                    countries: vec![(*code).to_string()],
                    ..Default::default()
                },
            });
        }
    }
    None
}

// ─── Demographics / interests ───────────────────────────────────────────

fn resolve_ages(value: &Value) -> (Option<u8>, Option<u8>) {
    let clamp = |v: u64| -> u8 { v.clamp(13, 65) as u8 };
    let age_min = value.get("age_min").and_then(Value::as_u64).map(clamp);
    let age_max = value.get("age_max").and_then(Value::as_u64).map(clamp);
    (age_min, age_max)
}

fn resolve_genders(value: &Value) -> Option<Vec<u8>> {
    let genders = value.get("genders").and_then(Value::as_array)?;
    let parsed: Vec<u8> = genders
        .iter()
        .filter_map(|g| match g {
            Value::Number(n) => n.as_u64().filter(|v| (1..=2).contains(v)).map(|v| v as u8),
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "male" | "men" | "masculino" | "1" => Some(1),
                "female" | "women" | "feminino" | "2" => Some(2),
                _ => None,
            },
            _ => None,
        })
        .collect();
    (!parsed.is_empty()).then_some(parsed)
}

fn resolve_named_specs(value: Option<&Value>) -> Vec<InterestSpec> {
    let Some(entries) = value.and_then(Value::as_array) else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| match entry {
            Value::String(name) if !name.is_empty() => Some(InterestSpec {
                id: None,
                name: name.clone(),
            }),
            Value::Object(_) => {
                let name = entry.get("name").and_then(Value::as_str)?.to_string();
                let id = entry
                    .get("id")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .filter(|i| !i.is_empty());
                Some(InterestSpec { id, name })
            }
            _ => None,
        })
        .collect()
}

fn resolve_audience_mode(
    value: &Value,
    interests: &[InterestSpec],
    behaviors: &[InterestSpec],
    genders: Option<&[u8]>,
    age_min: Option<u8>,
    age_max: Option<u8>,
) -> AudienceMode {
    if let Some(mode) = value.get("audience_mode").and_then(Value::as_str) {
        return match mode.to_ascii_lowercase().as_str() {
            "manual" => AudienceMode::Manual,
            _ => AudienceMode::Advantage,
        };
    }
    let has_manual_signal = !interests.is_empty()
        || !behaviors.is_empty()
        || genders.is_some_and(|g| !g.is_empty())
        || age_min.is_some()
        || age_max.is_some();
    if has_manual_signal {
        AudienceMode::Manual
    } else {
        AudienceMode::Advantage
    }
}
