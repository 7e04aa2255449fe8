//! Autocomplete listings computed over filtered documents.
use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::document::Document;

/// Autocomplete lists are capped at this many entries.
pub const LISTING_LIMIT: usize = 10;

fn contains_ci(haystack: &str, needle: Option<&str>) -> bool {
    match needle {
        Some(needle) => haystack.to_lowercase().contains(&needle.to_lowercase()),
        None => true,
    }
}

/// Distinct non-empty string values of `field`, array fields unwound, sorted,
/// first `limit` kept. With `needle`, unwound elements must contain it too.
pub fn distinct_values(
    docs: &[Document],
    field: &str,
    needle: Option<&str>,
    limit: usize,
) -> Vec<String> {
    let mut values = BTreeSet::new();
    for doc in docs {
        let candidates: Vec<&Value> = match doc.get(field) {
            Some(Value::Array(items)) => items.iter().collect(),
            Some(value) => vec![value],
            None => Vec::new(),
        };
        for candidate in candidates {
            if let Some(s) = candidate.as_str() {
                let s = s.trim();
                if !s.is_empty() && contains_ci(s, needle) {
                    values.insert(s.to_string());
                }
            }
        }
    }
    values.into_iter().take(limit).collect()
}

/// A cemetery name together with the area it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CemeteryListing {
    pub name: String,
    pub area: String,
    pub area_id: Option<String>,
}

/// Unwind each area's `cemetries`, keep names matching `needle`, group to
/// unique (name, area, areaId) triples, sort and cap. Areas that share a
/// cemetery name therefore list it once per area.
pub fn unique_cemeteries(
    areas: &[Document],
    needle: Option<&str>,
    limit: usize,
) -> Vec<CemeteryListing> {
    let mut triples = BTreeSet::new();
    for area in areas {
        let area_name = area.str_field("area").unwrap_or_default().trim().to_string();
        let area_id = match area.get("areaId") {
            Some(Value::String(id)) if !id.is_empty() => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        };
        let Some(Value::Array(names)) = area.get("cemetries") else {
            continue;
        };
        for name in names.iter().filter_map(Value::as_str) {
            let name = name.trim();
            if name.is_empty() || !contains_ci(name, needle) {
                continue;
            }
            triples.insert(CemeteryListing {
                name: name.to_string(),
                area: area_name.clone(),
                area_id: area_id.clone(),
            });
        }
    }
    triples.into_iter().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(content: Value) -> Document {
        Document::new(content.as_object().unwrap().clone())
    }

    #[test]
    fn distinct_values_sorts_dedupes_and_caps() {
        let docs: Vec<Document> = (0..15)
            .map(|i| doc(json!({"area": format!("Місто {i:02}")})))
            .chain([doc(json!({"area": "Місто 00"})), doc(json!({"area": ""})), doc(json!({}))])
            .collect();
        let values = distinct_values(&docs, "area", None, LISTING_LIMIT);
        assert_eq!(values.len(), 10);
        assert_eq!(values[0], "Місто 00");
        assert_eq!(values[9], "Місто 09");
    }

    #[test]
    fn distinct_values_unwinds_arrays_and_filters_elements() {
        let docs = vec![
            doc(json!({"cemetries": ["Янівське", "Личаківське"]})),
            doc(json!({"cemetries": ["Личаківське", ""]})),
        ];
        assert_eq!(
            distinct_values(&docs, "cemetries", None, 10),
            vec!["Личаківське".to_string(), "Янівське".to_string()]
        );
        assert_eq!(
            distinct_values(&docs, "cemetries", Some("янів"), 10),
            vec!["Янівське".to_string()]
        );
    }

    #[test]
    fn unique_cemeteries_groups_per_area() {
        let areas = vec![
            doc(json!({"area": "Львів", "areaId": "702550", "cemetries": ["Центральне", "Личаківське"]})),
            doc(json!({"area": "Самбір", "areaId": "694864", "cemetries": ["Центральне"]})),
            doc(json!({"area": "Львів", "areaId": "702550", "cemetries": ["Центральне"]})),
        ];
        let listing = unique_cemeteries(&areas, Some("центр"), LISTING_LIMIT);
        assert_eq!(
            listing,
            vec![
                CemeteryListing {
                    name: "Центральне".into(),
                    area: "Львів".into(),
                    area_id: Some("702550".into())
                },
                CemeteryListing {
                    name: "Центральне".into(),
                    area: "Самбір".into(),
                    area_id: Some("694864".into())
                },
            ]
        );
    }

    #[test]
    fn unique_cemeteries_serializes_camel_case() {
        let listing = CemeteryListing {
            name: "A".into(),
            area: "B".into(),
            area_id: None,
        };
        assert_eq!(
            serde_json::to_value(listing).unwrap(),
            json!({"name": "A", "area": "B", "areaId": null})
        );
    }
}
