// src/services/response_normalizer.rs
use crate::errors::StyleLensError;
use crate::models::{AnalysisRequest, AnalysisResponse, WardrobeItemRef};
use log::debug;
use serde_json::{Map, Value};

const SUGGESTIONS: &str = "suggestions";
const COMPLETE_OUTFIT: &str = "completeOutfit";
const EXISTING_ITEM: &str = "existingItem";
const SHOPPING_KEYWORDS: &str = "shoppingKeywords";
const SHOPPING_OPTIONS: &str = "shoppingOptions";

/// Turns the model's raw reply into an [`AnalysisResponse`] whose entries all carry an
/// id, whose wardrobe references are full objects (or null), and whose outfit items
/// always have a `shoppingOptions` list. Pure: no I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseNormalizer;

impl ResponseNormalizer {
    pub fn new() -> Self {
        Self
    }

    pub fn normalize(
        &self,
        raw: &str,
        request: &AnalysisRequest,
    ) -> Result<AnalysisResponse, StyleLensError> {
        let body = extract_json_body(strip_code_fences(raw));

        let parsed: Value = serde_json::from_str(body).map_err(|e| {
            StyleLensError::MalformedOutput {
                message: format!("Failed to parse analysis JSON: {}", e),
                source: Some(e),
            }
        })?;

        let mut object = match parsed {
            Value::Object(map) => map,
            other => {
                return Err(StyleLensError::malformed(format!(
                    "Expected a JSON object, got {}",
                    json_type(&other)
                )));
            }
        };

        let wardrobe = request.wardrobe();

        if let Some(Value::Array(entries)) = object.get_mut(SUGGESTIONS) {
            for (index, entry) in entries.iter_mut().enumerate() {
                if let Value::Object(entry) = entry {
                    ensure_id(entry, "suggestion", index);
                    if entry.contains_key(EXISTING_ITEM) || entry.contains_key(SHOPPING_KEYWORDS) {
                        normalize_outfit_item(entry, wardrobe);
                    }
                }
            }
        }

        if let Some(Value::Array(entries)) = object.get_mut(COMPLETE_OUTFIT) {
            for (index, entry) in entries.iter_mut().enumerate() {
                if let Value::Object(entry) = entry {
                    ensure_id(entry, "outfit-item", index);
                    normalize_outfit_item(entry, wardrobe);
                }
            }
        }

        Ok(AnalysisResponse::new(object))
    }
}

/// Removes a surrounding markdown code fence (with or without a language tag).
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Only a bare language tag is dropped; content on the fence line is kept.
    let rest = match rest.split_once('\n') {
        Some((tag, body)) if is_language_tag(tag.trim()) => body,
        _ => rest,
    };
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn is_language_tag(line: &str) -> bool {
    line.is_empty()
        || line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

/// Falls back to the outermost `{ ... }` span when the model added prose around the JSON.
fn extract_json_body(text: &str) -> &str {
    if text.starts_with('{') {
        return text;
    }
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            debug!("Extracted JSON body from surrounding text");
            &text[start..=end]
        }
        _ => text,
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn ensure_id(entry: &mut Map<String, Value>, prefix: &str, index: usize) {
    let replacement = match entry.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => return,
        Some(Value::Number(n)) => n.to_string(),
        _ => format!("{}-{}", prefix, index),
    };
    entry.insert("id".to_string(), Value::String(replacement));
}

fn normalize_outfit_item(entry: &mut Map<String, Value>, wardrobe: &[WardrobeItemRef]) {
    let resolved = match entry.get(EXISTING_ITEM) {
        Some(Value::Object(_)) => None,
        Some(Value::String(id)) => Some(resolve(id.trim(), wardrobe)),
        Some(Value::Number(n)) => Some(resolve(&n.to_string(), wardrobe)),
        _ => Some(Value::Null),
    };
    if let Some(value) = resolved {
        entry.insert(EXISTING_ITEM.to_string(), value);
    }

    if !matches!(entry.get(SHOPPING_OPTIONS), Some(Value::Array(_))) {
        entry.insert(SHOPPING_OPTIONS.to_string(), Value::Array(Vec::new()));
    }
}

fn resolve(id: &str, wardrobe: &[WardrobeItemRef]) -> Value {
    wardrobe
        .iter()
        .find(|item| item.id == id)
        .and_then(|item| serde_json::to_value(item).ok())
        .unwrap_or_else(|| {
            debug!("Wardrobe reference {:?} did not match any item", id);
            Value::Null
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use serde_json::json;

    fn item(id: &str, category: &str) -> WardrobeItemRef {
        WardrobeItemRef {
            id: id.to_string(),
            category: category.to_string(),
            primary_color: Some("charcoal".into()),
            secondary_color: None,
            material: None,
            pattern: None,
            brand: None,
            size: None,
        }
    }

    fn request(wardrobe: Vec<WardrobeItemRef>) -> AnalysisRequest {
        AnalysisRequest::OutfitFromWardrobe(OutfitFromWardrobeRequest {
            occasion: "business casual".into(),
            style_preference: None,
            measurements: None,
            shoe_size: None,
            wardrobe,
        })
    }

    #[test]
    fn fenced_and_bare_json_normalize_identically() {
        let bare = r#"{"analysis": "Sharp.", "suggestions": [{"title": "Loafers"}]}"#;
        let fenced = format!("```json\n{}\n```", bare);
        let plain_fence = format!("```\n{}\n```\n", bare);
        let normalizer = ResponseNormalizer::new();
        let req = request(vec![]);

        let expected = normalizer.normalize(bare, &req).unwrap();
        assert_eq!(normalizer.normalize(&fenced, &req).unwrap(), expected);
        assert_eq!(normalizer.normalize(&plain_fence, &req).unwrap(), expected);
    }

    #[test]
    fn prose_around_json_is_discarded() {
        let raw = "Here is your outfit:\n{\"analysis\": \"ok\", \"completeOutfit\": []}\nEnjoy!";
        let response = ResponseNormalizer::new().normalize(raw, &request(vec![])).unwrap();
        assert_eq!(response.analysis(), Some("ok"));
    }

    #[test]
    fn invalid_json_is_a_malformed_output_error() {
        let err = ResponseNormalizer::new()
            .normalize("```json\n{\"analysis\": \n```", &request(vec![]))
            .unwrap_err();
        match err {
            StyleLensError::MalformedOutput { source, .. } => assert!(source.is_some()),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn non_object_reply_is_rejected() {
        let err = ResponseNormalizer::new()
            .normalize("[1, 2, 3]", &request(vec![]))
            .unwrap_err();
        assert!(matches!(err, StyleLensError::MalformedOutput { .. }));
    }

    #[test]
    fn missing_ids_are_derived_from_position() {
        let raw = json!({
            "analysis": "x",
            "suggestions": [{"title": "a"}, {"id": "keep-me", "title": "b"}, {"id": "", "title": "c"}],
            "completeOutfit": [{"type": "top"}, {"id": 7, "type": "shoes"}]
        })
        .to_string();
        let response = ResponseNormalizer::new().normalize(&raw, &request(vec![])).unwrap();

        let ids: Vec<&str> = response
            .suggestions()
            .unwrap()
            .iter()
            .map(|s| s["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["suggestion-0", "keep-me", "suggestion-2"]);

        let outfit = response.complete_outfit().unwrap();
        assert_eq!(outfit[0]["id"], "outfit-item-0");
        assert_eq!(outfit[1]["id"], "7");
    }

    #[test]
    fn string_reference_resolves_to_wardrobe_item() {
        let raw = json!({
            "analysis": "x",
            "completeOutfit": [
                {"type": "outerwear", "existingItem": "item-42"},
                {"type": "bottom", "existingItem": "item-404"}
            ]
        })
        .to_string();
        let wardrobe = vec![item("item-1", "Jeans"), item("item-42", "Trench Coat")];
        let response = ResponseNormalizer::new().normalize(&raw, &request(wardrobe)).unwrap();
        let outfit = response.complete_outfit().unwrap();

        assert_eq!(
            outfit[0]["existingItem"],
            json!({"id": "item-42", "category": "Trench Coat", "primaryColor": "charcoal"})
        );
        assert_eq!(outfit[1]["existingItem"], Value::Null);
    }

    #[test]
    fn embedded_objects_pass_through_unchanged() {
        let embedded = json!({"id": "w5", "category": "Scarf", "note": "model supplied"});
        let raw = json!({
            "analysis": "x",
            "completeOutfit": [{"type": "accessory", "existingItem": embedded.clone()}]
        })
        .to_string();
        let response = ResponseNormalizer::new()
            .normalize(&raw, &request(vec![item("w5", "Scarf")]))
            .unwrap();
        assert_eq!(response.complete_outfit().unwrap()[0]["existingItem"], embedded);
    }

    #[test]
    fn outfit_items_always_have_shopping_options() {
        let raw = json!({
            "analysis": "x",
            "completeOutfit": [
                {"type": "shoes", "shoppingKeywords": "brown derby shoes"},
                {"type": "bag", "shoppingOptions": null},
                {"type": "top", "shoppingOptions": [{"title": "Oxford shirt"}]},
                {"type": "belt", "shoppingOptions": "see any department store"},
                {"type": "hat", "shoppingOptions": {"title": "Fedora"}}
            ],
            "suggestions": [
                {"title": "plain idea"},
                {"title": "buy this", "shoppingKeywords": "silk scarf"}
            ]
        })
        .to_string();
        let response = ResponseNormalizer::new().normalize(&raw, &request(vec![])).unwrap();
        let outfit = response.complete_outfit().unwrap();

        assert_eq!(outfit[0]["shoppingOptions"], json!([]));
        assert_eq!(outfit[0]["existingItem"], Value::Null);
        assert_eq!(outfit[1]["shoppingOptions"], json!([]));
        assert_eq!(outfit[2]["shoppingOptions"], json!([{"title": "Oxford shirt"}]));
        assert_eq!(outfit[3]["shoppingOptions"], json!([]));
        assert_eq!(outfit[4]["shoppingOptions"], json!([]));

        let suggestions = response.suggestions().unwrap();
        assert!(suggestions[0].get("shoppingOptions").is_none());
        assert_eq!(suggestions[1]["shoppingOptions"], json!([]));
    }

    #[test]
    fn strip_code_fences_handles_single_line_fence() {
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn json_opening_on_the_fence_line_is_kept() {
        let raw = "```{\n\"analysis\": \"ok\",\n\"completeOutfit\": []\n}\n```";
        assert!(strip_code_fences(raw).starts_with('{'));

        let response = ResponseNormalizer::new().normalize(raw, &request(vec![])).unwrap();
        assert_eq!(response.analysis(), Some("ok"));
        assert_eq!(response.complete_outfit().unwrap().len(), 0);
    }

    #[test]
    fn language_tags_are_dropped_before_the_body() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```JSON5 \n{}\n```"), "{}");
        assert_eq!(strip_code_fences("```[1,\n2]\n```"), "[1,\n2]");
    }
}
