// src/services/prompt_builder.rs
use crate::models::*;

const ROLE_PREAMBLE: &str = "You are an expert personal stylist and fashion consultant. \
You give specific, practical outfit advice that respects the user's body, budget and the \
clothes they already own. You only ever answer with a single JSON object.";

const GARMENT_RULE: &str = "Every \"type\" value must be exactly one of:";

const JSON_ONLY_RULE: &str = "Return ONLY the JSON object. Do not wrap it in markdown code \
fences and do not add commentary before or after it.";

const MATCH_CHECK_SHAPE: &str = r#"{
  "analysis": "2-4 sentences on how well the photographed piece fits the user's wardrobe",
  "matchScore": 0-100,
  "suggestions": [
    {
      "type": "<garment type>",
      "title": "short name of the pairing",
      "reason": "why it works",
      "existingItem": "<wardrobe item id or null>"
    }
  ]
}"#;

const OUTFIT_SHAPE: &str = r#"{
  "analysis": "2-4 sentences explaining the outfit",
  "completeOutfit": [
    {
      "type": "<garment type>",
      "description": "what to wear in this slot",
      "existingItem": "<wardrobe item id or null>",
      "shoppingKeywords": "search terms when existingItem is null, otherwise null"
    }
  ]
}"#;

const SHOPPING_OUTFIT_SHAPE: &str = r#"{
  "analysis": "2-4 sentences explaining the outfit",
  "completeOutfit": [
    {
      "type": "<garment type>",
      "description": "what to buy for this slot",
      "shoppingKeywords": "search terms for this piece",
      "priceRange": "expected price range"
    }
  ]
}"#;

const FIND_SHAPE: &str = r#"{
  "analysis": "2-4 sentences describing the photographed piece and what pairs with it",
  "suggestions": [
    {
      "type": "<garment type>",
      "title": "short name of the piece to look for",
      "reason": "why it pairs well",
      "shoppingKeywords": "search terms for this piece",
      "priceRange": "expected price range"
    }
  ]
}"#;

const CATEGORIZATION_SHAPE: &str = r#"{
  "analysis": "one sentence summary of what was photographed",
  "suggestions": [
    {
      "type": "<garment type>",
      "category": "specific category, e.g. Blazer, Chinos, Ankle Boots",
      "primaryColor": "main color",
      "secondaryColor": "secondary color or null",
      "material": "best guess of the fabric or null",
      "pattern": "solid, striped, floral, ... or null",
      "brand": "visible brand or null",
      "description": "short description"
    }
  ]
}"#;

/// Turns an [`AnalysisRequest`] into the instruction text sent with the images.
/// Output depends only on the request, so identical requests give identical prompts.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, request: &AnalysisRequest) -> String {
        self.build_for_images(request, request.images().len())
    }

    /// Builds the prompt for the `image_count` images that will actually accompany it,
    /// which is fewer than the request carried when some failed to prepare.
    pub fn build_for_images(&self, request: &AnalysisRequest, image_count: usize) -> String {
        let mut sections = vec![ROLE_PREAMBLE.to_string()];

        if let Some(context) = body_context(request.measurements(), request.shoe_size()) {
            sections.push(context);
        }

        let (task, shape) = match request {
            AnalysisRequest::InstantMatchCheck(r) => (instant_match_check_task(r), MATCH_CHECK_SHAPE),
            AnalysisRequest::ClosetMatch(r) => (closet_match_task(r), OUTFIT_SHAPE),
            AnalysisRequest::FindToMatch(r) => (find_to_match_task(r), FIND_SHAPE),
            AnalysisRequest::OutfitFromWardrobe(r) => (outfit_from_wardrobe_task(r), OUTFIT_SHAPE),
            AnalysisRequest::OutfitFromShopping(r) => {
                (outfit_from_shopping_task(r), SHOPPING_OUTFIT_SHAPE)
            }
            AnalysisRequest::MixedOutfit(r) => (mixed_outfit_task(r), OUTFIT_SHAPE),
            AnalysisRequest::WardrobeItemCategorization(_) => {
                (categorization_task(image_count), CATEGORIZATION_SHAPE)
            }
            AnalysisRequest::SingleItemRegeneration(r) => (regeneration_task(r), OUTFIT_SHAPE),
        };
        sections.push(task);
        sections.push(response_format(shape));

        sections.join("\n\n")
    }
}

fn format_number(value: f32) -> String {
    if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

fn body_context(measurements: Option<&BodyMeasurements>, shoe_size: Option<&str>) -> Option<String> {
    let mut sentences = Vec::new();

    if let Some(m) = measurements {
        let metrics = [
            ("height", m.height_cm, "cm"),
            ("weight", m.weight_kg, "kg"),
            ("chest", m.chest_cm, "cm"),
            ("waist", m.waist_cm, "cm"),
            ("hip", m.hips_cm, "cm"),
            ("inseam", m.inseam_cm, "cm"),
        ];
        for (label, value, unit) in metrics {
            if let Some(value) = value.filter(|v| *v > 0.0) {
                sentences.push(format!(
                    "The user's {} is {} {}.",
                    label,
                    format_number(value),
                    unit
                ));
            }
        }
        if let Some(shape) = m.body_shape.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            sentences.push(format!("The user describes their body shape as {}.", shape));
        }
    }

    if let Some(size) = shoe_size.map(str::trim).filter(|s| !s.is_empty()) {
        sentences.push(format!("The user's shoe size is {}.", size));
    }

    if sentences.is_empty() {
        None
    } else {
        Some(format!(
            "ABOUT THE USER:\n{}\nUse this to recommend flattering fits and correct sizes.",
            sentences.join(" ")
        ))
    }
}

fn preference_lines(
    occasion: Option<&str>,
    style_preference: Option<&str>,
    price_tier: Option<PriceTier>,
) -> String {
    let mut lines = Vec::new();
    if let Some(occasion) = occasion.map(str::trim).filter(|s| !s.is_empty()) {
        lines.push(format!("Occasion: {}.", occasion));
    }
    if let Some(style) = style_preference.map(str::trim).filter(|s| !s.is_empty()) {
        lines.push(format!("Preferred style: {}.", style));
    }
    if let Some(tier) = price_tier {
        lines.push(format!(
            "Budget: {} ({}).",
            tier.label(),
            tier.range_hint()
        ));
    }
    lines.join("\n")
}

fn describe_item(item: &WardrobeItemRef) -> String {
    let mut parts = vec![item.category.clone()];
    match (item.primary_color.as_deref(), item.secondary_color.as_deref()) {
        (Some(primary), Some(secondary)) => parts.push(format!("color: {} / {}", primary, secondary)),
        (Some(primary), None) => parts.push(format!("color: {}", primary)),
        (None, Some(secondary)) => parts.push(format!("color: {}", secondary)),
        (None, None) => {}
    }
    let extras = [
        ("material", &item.material),
        ("pattern", &item.pattern),
        ("brand", &item.brand),
        ("size", &item.size),
    ];
    for (label, value) in extras {
        if let Some(value) = value {
            parts.push(format!("{}: {}", label, value));
        }
    }
    parts.join("; ")
}

fn wardrobe_listing(wardrobe: &[WardrobeItemRef]) -> String {
    if wardrobe.is_empty() {
        return "The user has not added any items to their wardrobe yet.".to_string();
    }
    let items: Vec<String> = wardrobe
        .iter()
        .enumerate()
        .map(|(index, item)| format!("{}. [id: {}] {}", index + 1, item.id, describe_item(item)))
        .collect();
    format!(
        "THE USER'S WARDROBE ({} items). Refer to these only by their exact id:\n{}",
        wardrobe.len(),
        items.join("\n")
    )
}

fn with_preferences(task: &str, preferences: String) -> String {
    if preferences.is_empty() {
        task.to_string()
    } else {
        format!("{}\n{}", task, preferences)
    }
}

fn instant_match_check_task(r: &InstantMatchCheckRequest) -> String {
    let task = with_preferences(
        "TASK: The photo shows a garment the user is considering buying. Decide how well it \
         works with what they already own and score the match from 0 to 100. List up to 4 \
         pairings; use \"existingItem\" for the id of the wardrobe piece it pairs with.",
        preference_lines(None, r.style_preference.as_deref(), None),
    );
    format!("{}\n\n{}", task, wardrobe_listing(&r.wardrobe))
}

fn closet_match_task(r: &ClosetMatchRequest) -> String {
    let task = with_preferences(
        "TASK: The photo shows a new piece. Build one complete outfit around it using items \
         from the user's wardrobe. Include the photographed piece as its own entry with \
         \"existingItem\": null. For any slot the wardrobe cannot fill, set \"existingItem\" \
         to null and give \"shoppingKeywords\".",
        preference_lines(r.occasion.as_deref(), r.style_preference.as_deref(), None),
    );
    format!("{}\n\n{}", task, wardrobe_listing(&r.wardrobe))
}

fn find_to_match_task(r: &FindToMatchRequest) -> String {
    with_preferences(
        "TASK: The photo shows a piece the user already owns. Recommend 3 to 5 pieces to buy \
         that pair well with it, each with concrete shopping keywords.",
        preference_lines(r.occasion.as_deref(), r.style_preference.as_deref(), r.price_tier),
    )
}

fn outfit_from_wardrobe_task(r: &OutfitFromWardrobeRequest) -> String {
    let task = with_preferences(
        "TASK: Put together one complete outfit using ONLY items from the user's wardrobe. \
         Set \"existingItem\" to the id of the chosen item. If no wardrobe item can fill a \
         necessary slot, keep the slot with \"existingItem\": null and suggest \
         \"shoppingKeywords\" instead.",
        preference_lines(Some(&r.occasion), r.style_preference.as_deref(), None),
    );
    format!("{}\n\n{}", task, wardrobe_listing(&r.wardrobe))
}

fn outfit_from_shopping_task(r: &OutfitFromShoppingRequest) -> String {
    with_preferences(
        "TASK: Design one complete outfit made entirely of new pieces to buy. Cover every \
         slot needed for the occasion, including shoes.",
        preference_lines(Some(&r.occasion), r.style_preference.as_deref(), r.price_tier),
    )
}

fn mixed_outfit_task(r: &MixedOutfitRequest) -> String {
    let task = with_preferences(
        "TASK: Design one complete outfit that mixes pieces from the user's wardrobe with new \
         pieces to buy. Use at least one wardrobe item when the wardrobe has a suitable one. \
         Wardrobe pieces set \"existingItem\" to their id; new pieces set \"existingItem\" to \
         null and give \"shoppingKeywords\".",
        preference_lines(Some(&r.occasion), r.style_preference.as_deref(), r.price_tier),
    );
    format!("{}\n\n{}", task, wardrobe_listing(&r.wardrobe))
}

fn categorization_task(image_count: usize) -> String {
    format!(
        "TASK: Catalogue the clothing in the {} photo(s) so it can be added to the user's \
         wardrobe. Return one entry per distinct garment, in the order the photos were given.",
        image_count
    )
}

fn regeneration_task(r: &SingleItemRegenerationRequest) -> String {
    let target = r.target_garment.label();
    let current: Vec<String> = r
        .current_outfit
        .iter()
        .map(|slot| match &slot.existing_item_id {
            Some(id) => format!(
                "- {}: {} (wardrobe item {})",
                slot.garment_type.label(),
                slot.description,
                id
            ),
            None => format!("- {}: {}", slot.garment_type.label(), slot.description),
        })
        .collect();
    let replaced = r
        .current_outfit
        .iter()
        .find(|slot| slot.garment_type == r.target_garment)
        .map(|slot| slot.description.as_str());

    let mut task = format!(
        "TASK: The user is editing the outfit below and wants a new {target}. Replace ONLY \
         the {target} slot and keep everything else as it is. Recommend a DIFFERENT {target} \
         than the current one. Return \"completeOutfit\" with exactly one entry whose \
         \"type\" is \"{target}\". Prefer a wardrobe item (set \"existingItem\" to its id); \
         otherwise set \"existingItem\" to null and give \"shoppingKeywords\".",
    );
    if let Some(replaced) = replaced {
        task.push_str(&format!("\nDo not suggest \"{}\" again.", replaced));
    }
    let task = with_preferences(
        &task,
        preference_lines(Some(&r.occasion), r.style_preference.as_deref(), r.price_tier),
    );

    let outfit = if current.is_empty() {
        "CURRENT OUTFIT: (empty)".to_string()
    } else {
        format!("CURRENT OUTFIT:\n{}", current.join("\n"))
    };

    format!("{}\n\n{}\n\n{}", task, outfit, wardrobe_listing(&r.wardrobe))
}

fn response_format(shape: &str) -> String {
    let labels: Vec<&str> = GarmentType::ALL.iter().map(GarmentType::label).collect();
    format!(
        "RESPONSE FORMAT:\nReply with JSON in exactly this shape:\n{}\n{} {}.\n{}",
        shape,
        GARMENT_RULE,
        labels.join(", "),
        JSON_ONLY_RULE
    )
}
