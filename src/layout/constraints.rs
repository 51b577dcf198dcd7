//! Free-text prompt -> layout constraints.
//!
//! The prompt text itself comes from an external collaborator (a language
//! model or a file on disk); this module only turns untrusted text into a
//! typed [`LayoutConstraints`] value. Strategy per field: try a JSON-shaped
//! fragment first, fall back to regex extraction over the raw prompt, fall
//! back to the field default. `grass_ratio` is clamped into `[0, 1]`.

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingDensity {
    Sparse,
    #[default]
    Medium,
    Dense,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringMode {
    Clustered,
    Distributed,
    #[default]
    Random,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildingSize {
    Small,
    #[default]
    Medium,
    Large,
}

/// Typed constraints consumed by the layout generator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutConstraints {
    pub building_density: BuildingDensity,
    pub clustering: ClusteringMode,
    pub grass_ratio: f32,
    pub building_size_hint: BuildingSize,
}

impl Default for LayoutConstraints {
    fn default() -> Self {
        LayoutConstraints {
            building_density: BuildingDensity::Medium,
            clustering: ClusteringMode::Random,
            grass_ratio: 0.3,
            building_size_hint: BuildingSize::Medium,
        }
    }
}

/// JSON shape the external model is asked to produce. All fields optional;
/// anything missing or malformed falls through to regex extraction.
#[derive(Debug, Default, Deserialize)]
struct RawConstraints {
    building_density: Option<String>,
    clustering: Option<String>,
    grass_ratio: Option<f32>,
    building_size_hint: Option<String>,
}

/// Parse a free-text prompt into constraints. Never fails; unparseable
/// fields take their defaults.
#[must_use]
pub fn parse(prompt: &str) -> LayoutConstraints {
    let raw = extract_json_fragment(prompt)
        .and_then(|fragment| serde_json::from_str::<RawConstraints>(&fragment).ok())
        .unwrap_or_default();

    let defaults = LayoutConstraints::default();

    let building_density = raw
        .building_density
        .as_deref()
        .and_then(density_from_str)
        .or_else(|| regex_capture(prompt, r"(?i)\b(sparse|dense)\b").and_then(|s| density_from_str(&s)))
        .unwrap_or(defaults.building_density);

    let clustering = raw
        .clustering
        .as_deref()
        .and_then(clustering_from_str)
        .or_else(|| {
            regex_capture(prompt, r"(?i)\b(clustered|distributed|random)\b")
                .and_then(|s| clustering_from_str(&s))
        })
        .unwrap_or(defaults.clustering);

    let grass_ratio = raw
        .grass_ratio
        .or_else(|| {
            regex_capture(prompt, r"(?i)grass[^0-9]*([0-9]*\.?[0-9]+)")
                .and_then(|s| s.parse::<f32>().ok())
        })
        .unwrap_or(defaults.grass_ratio)
        .clamp(0.0, 1.0);

    let building_size_hint = raw
        .building_size_hint
        .as_deref()
        .and_then(size_from_str)
        .or_else(|| regex_capture(prompt, r"(?i)\b(small|large)\b").and_then(|s| size_from_str(&s)))
        .unwrap_or(defaults.building_size_hint);

    LayoutConstraints {
        building_density,
        clustering,
        grass_ratio,
        building_size_hint,
    }
}

fn density_from_str(s: &str) -> Option<BuildingDensity> {
    match s.trim().to_ascii_lowercase().as_str() {
        "sparse" => Some(BuildingDensity::Sparse),
        "medium" => Some(BuildingDensity::Medium),
        "dense" => Some(BuildingDensity::Dense),
        _ => None,
    }
}

fn clustering_from_str(s: &str) -> Option<ClusteringMode> {
    match s.trim().to_ascii_lowercase().as_str() {
        "clustered" => Some(ClusteringMode::Clustered),
        "distributed" => Some(ClusteringMode::Distributed),
        "random" => Some(ClusteringMode::Random),
        _ => None,
    }
}

fn size_from_str(s: &str) -> Option<BuildingSize> {
    match s.trim().to_ascii_lowercase().as_str() {
        "small" => Some(BuildingSize::Small),
        "medium" => Some(BuildingSize::Medium),
        "large" => Some(BuildingSize::Large),
        _ => None,
    }
}

/// First capture group of `pattern` in `text`.
fn regex_capture(text: &str, pattern: &str) -> Option<String> {
    let re = Regex::new(pattern).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// First balanced `{ ... }` fragment in the text, for the JSON attempt.
fn extract_json_fragment(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (i, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(text[start..=start + i].to_string());
                }
            }
            _ => {}
        }
    }
    None
}
