// src/models.rs
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;
use uuid::Uuid;

/// Garment slots the model is allowed to use in its replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GarmentType {
    Top,
    Bottom,
    Dress,
    Outerwear,
    Shoes,
    Accessory,
    Bag,
}

impl GarmentType {
    pub const ALL: [GarmentType; 7] = [
        GarmentType::Top,
        GarmentType::Bottom,
        GarmentType::Dress,
        GarmentType::Outerwear,
        GarmentType::Shoes,
        GarmentType::Accessory,
        GarmentType::Bag,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GarmentType::Top => "top",
            GarmentType::Bottom => "bottom",
            GarmentType::Dress => "dress",
            GarmentType::Outerwear => "outerwear",
            GarmentType::Shoes => "shoes",
            GarmentType::Accessory => "accessory",
            GarmentType::Bag => "bag",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceTier {
    Budget,
    MidRange,
    Premium,
    Luxury,
}

impl PriceTier {
    pub fn label(&self) -> &'static str {
        match self {
            PriceTier::Budget => "budget",
            PriceTier::MidRange => "mid-range",
            PriceTier::Premium => "premium",
            PriceTier::Luxury => "luxury",
        }
    }

    pub fn range_hint(&self) -> &'static str {
        match self {
            PriceTier::Budget => "under $50 per item",
            PriceTier::MidRange => "$50 to $150 per item",
            PriceTier::Premium => "$150 to $400 per item",
            PriceTier::Luxury => "above $400 per item",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BodyMeasurements {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chest_cm: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waist_cm: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hips_cm: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inseam_cm: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_shape: Option<String>,
}

/// A garment owned by the user. Read-only for this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeItemRef {
    pub id: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
}

/// One slot of the outfit currently shown to the user, used when regenerating a single piece.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitSlot {
    pub garment_type: GarmentType,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub existing_item_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ImageInput {
    /// Base64 JPEG prepared by the caller; sent as is.
    Encoded { data: String },
    File { path: PathBuf },
    /// Bytes stored earlier through the upload endpoint.
    Upload { id: Uuid },
    #[serde(skip)]
    Bytes(Bytes),
}

/// Returned by the upload endpoint; `id` is what `ImageInput::Upload` refers to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub id: Uuid,
    pub filename: String,
    pub content_type: String,
    pub size: usize,
    pub width: u32,
    pub height: u32,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantMatchCheckRequest {
    pub images: Vec<ImageInput>,
    #[serde(default)]
    pub style_preference: Option<String>,
    #[serde(default)]
    pub wardrobe: Vec<WardrobeItemRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClosetMatchRequest {
    pub images: Vec<ImageInput>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub style_preference: Option<String>,
    pub wardrobe: Vec<WardrobeItemRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindToMatchRequest {
    pub images: Vec<ImageInput>,
    #[serde(default)]
    pub occasion: Option<String>,
    #[serde(default)]
    pub style_preference: Option<String>,
    #[serde(default)]
    pub price_tier: Option<PriceTier>,
    #[serde(default)]
    pub measurements: Option<BodyMeasurements>,
    #[serde(default)]
    pub shoe_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitFromWardrobeRequest {
    pub occasion: String,
    #[serde(default)]
    pub style_preference: Option<String>,
    #[serde(default)]
    pub measurements: Option<BodyMeasurements>,
    #[serde(default)]
    pub shoe_size: Option<String>,
    pub wardrobe: Vec<WardrobeItemRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutfitFromShoppingRequest {
    pub occasion: String,
    #[serde(default)]
    pub style_preference: Option<String>,
    #[serde(default)]
    pub price_tier: Option<PriceTier>,
    #[serde(default)]
    pub measurements: Option<BodyMeasurements>,
    #[serde(default)]
    pub shoe_size: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MixedOutfitRequest {
    pub occasion: String,
    #[serde(default)]
    pub style_preference: Option<String>,
    #[serde(default)]
    pub price_tier: Option<PriceTier>,
    #[serde(default)]
    pub measurements: Option<BodyMeasurements>,
    #[serde(default)]
    pub shoe_size: Option<String>,
    pub wardrobe: Vec<WardrobeItemRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WardrobeItemCategorizationRequest {
    pub images: Vec<ImageInput>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SingleItemRegenerationRequest {
    pub occasion: String,
    #[serde(default)]
    pub style_preference: Option<String>,
    #[serde(default)]
    pub price_tier: Option<PriceTier>,
    #[serde(default)]
    pub measurements: Option<BodyMeasurements>,
    #[serde(default)]
    pub shoe_size: Option<String>,
    #[serde(default)]
    pub wardrobe: Vec<WardrobeItemRef>,
    pub target_garment: GarmentType,
    pub current_outfit: Vec<OutfitSlot>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum AnalysisRequest {
    InstantMatchCheck(InstantMatchCheckRequest),
    ClosetMatch(ClosetMatchRequest),
    FindToMatch(FindToMatchRequest),
    OutfitFromWardrobe(OutfitFromWardrobeRequest),
    OutfitFromShopping(OutfitFromShoppingRequest),
    MixedOutfit(MixedOutfitRequest),
    WardrobeItemCategorization(WardrobeItemCategorizationRequest),
    SingleItemRegeneration(SingleItemRegenerationRequest),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind {
    InstantMatchCheck,
    ClosetMatch,
    FindToMatch,
    OutfitFromWardrobe,
    OutfitFromShopping,
    MixedOutfit,
    WardrobeItemCategorization,
    SingleItemRegeneration,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::InstantMatchCheck => "instant-match-check",
            RequestKind::ClosetMatch => "closet-match",
            RequestKind::FindToMatch => "find-to-match",
            RequestKind::OutfitFromWardrobe => "outfit-from-wardrobe",
            RequestKind::OutfitFromShopping => "outfit-from-shopping",
            RequestKind::MixedOutfit => "mixed-outfit",
            RequestKind::WardrobeItemCategorization => "wardrobe-item-categorization",
            RequestKind::SingleItemRegeneration => "single-item-regeneration",
        }
    }
}

impl AnalysisRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            AnalysisRequest::InstantMatchCheck(_) => RequestKind::InstantMatchCheck,
            AnalysisRequest::ClosetMatch(_) => RequestKind::ClosetMatch,
            AnalysisRequest::FindToMatch(_) => RequestKind::FindToMatch,
            AnalysisRequest::OutfitFromWardrobe(_) => RequestKind::OutfitFromWardrobe,
            AnalysisRequest::OutfitFromShopping(_) => RequestKind::OutfitFromShopping,
            AnalysisRequest::MixedOutfit(_) => RequestKind::MixedOutfit,
            AnalysisRequest::WardrobeItemCategorization(_) => {
                RequestKind::WardrobeItemCategorization
            }
            AnalysisRequest::SingleItemRegeneration(_) => RequestKind::SingleItemRegeneration,
        }
    }

    pub fn images(&self) -> &[ImageInput] {
        match self {
            AnalysisRequest::InstantMatchCheck(r) => &r.images,
            AnalysisRequest::ClosetMatch(r) => &r.images,
            AnalysisRequest::FindToMatch(r) => &r.images,
            AnalysisRequest::WardrobeItemCategorization(r) => &r.images,
            AnalysisRequest::OutfitFromWardrobe(_)
            | AnalysisRequest::OutfitFromShopping(_)
            | AnalysisRequest::MixedOutfit(_)
            | AnalysisRequest::SingleItemRegeneration(_) => &[],
        }
    }

    /// Variants whose prompt talks about a photographed garment.
    pub fn requires_images(&self) -> bool {
        matches!(
            self.kind(),
            RequestKind::InstantMatchCheck
                | RequestKind::ClosetMatch
                | RequestKind::FindToMatch
                | RequestKind::WardrobeItemCategorization
        )
    }

    pub fn is_cacheable(&self) -> bool {
        self.images().is_empty()
    }

    pub fn occasion(&self) -> Option<&str> {
        match self {
            AnalysisRequest::ClosetMatch(r) => r.occasion.as_deref(),
            AnalysisRequest::FindToMatch(r) => r.occasion.as_deref(),
            AnalysisRequest::OutfitFromWardrobe(r) => Some(&r.occasion),
            AnalysisRequest::OutfitFromShopping(r) => Some(&r.occasion),
            AnalysisRequest::MixedOutfit(r) => Some(&r.occasion),
            AnalysisRequest::SingleItemRegeneration(r) => Some(&r.occasion),
            AnalysisRequest::InstantMatchCheck(_)
            | AnalysisRequest::WardrobeItemCategorization(_) => None,
        }
    }

    pub fn style_preference(&self) -> Option<&str> {
        match self {
            AnalysisRequest::InstantMatchCheck(r) => r.style_preference.as_deref(),
            AnalysisRequest::ClosetMatch(r) => r.style_preference.as_deref(),
            AnalysisRequest::FindToMatch(r) => r.style_preference.as_deref(),
            AnalysisRequest::OutfitFromWardrobe(r) => r.style_preference.as_deref(),
            AnalysisRequest::OutfitFromShopping(r) => r.style_preference.as_deref(),
            AnalysisRequest::MixedOutfit(r) => r.style_preference.as_deref(),
            AnalysisRequest::SingleItemRegeneration(r) => r.style_preference.as_deref(),
            AnalysisRequest::WardrobeItemCategorization(_) => None,
        }
    }

    pub fn price_tier(&self) -> Option<PriceTier> {
        match self {
            AnalysisRequest::FindToMatch(r) => r.price_tier,
            AnalysisRequest::OutfitFromShopping(r) => r.price_tier,
            AnalysisRequest::MixedOutfit(r) => r.price_tier,
            AnalysisRequest::SingleItemRegeneration(r) => r.price_tier,
            AnalysisRequest::InstantMatchCheck(_)
            | AnalysisRequest::ClosetMatch(_)
            | AnalysisRequest::OutfitFromWardrobe(_)
            | AnalysisRequest::WardrobeItemCategorization(_) => None,
        }
    }

    pub fn measurements(&self) -> Option<&BodyMeasurements> {
        match self {
            AnalysisRequest::FindToMatch(r) => r.measurements.as_ref(),
            AnalysisRequest::OutfitFromWardrobe(r) => r.measurements.as_ref(),
            AnalysisRequest::OutfitFromShopping(r) => r.measurements.as_ref(),
            AnalysisRequest::MixedOutfit(r) => r.measurements.as_ref(),
            AnalysisRequest::SingleItemRegeneration(r) => r.measurements.as_ref(),
            AnalysisRequest::InstantMatchCheck(_)
            | AnalysisRequest::ClosetMatch(_)
            | AnalysisRequest::WardrobeItemCategorization(_) => None,
        }
    }

    pub fn shoe_size(&self) -> Option<&str> {
        match self {
            AnalysisRequest::FindToMatch(r) => r.shoe_size.as_deref(),
            AnalysisRequest::OutfitFromWardrobe(r) => r.shoe_size.as_deref(),
            AnalysisRequest::OutfitFromShopping(r) => r.shoe_size.as_deref(),
            AnalysisRequest::MixedOutfit(r) => r.shoe_size.as_deref(),
            AnalysisRequest::SingleItemRegeneration(r) => r.shoe_size.as_deref(),
            AnalysisRequest::InstantMatchCheck(_)
            | AnalysisRequest::ClosetMatch(_)
            | AnalysisRequest::WardrobeItemCategorization(_) => None,
        }
    }

    pub fn wardrobe(&self) -> &[WardrobeItemRef] {
        match self {
            AnalysisRequest::InstantMatchCheck(r) => &r.wardrobe,
            AnalysisRequest::ClosetMatch(r) => &r.wardrobe,
            AnalysisRequest::OutfitFromWardrobe(r) => &r.wardrobe,
            AnalysisRequest::MixedOutfit(r) => &r.wardrobe,
            AnalysisRequest::SingleItemRegeneration(r) => &r.wardrobe,
            AnalysisRequest::FindToMatch(_)
            | AnalysisRequest::OutfitFromShopping(_)
            | AnalysisRequest::WardrobeItemCategorization(_) => &[],
        }
    }

    pub fn target_garment(&self) -> Option<GarmentType> {
        match self {
            AnalysisRequest::SingleItemRegeneration(r) => Some(r.target_garment),
            _ => None,
        }
    }
}

/// Model reply after normalization. The schema depends on the request kind, but it
/// always carries an `analysis` string and a `suggestions` or `completeOutfit` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnalysisResponse(Map<String, Value>);

impl AnalysisResponse {
    pub fn new(body: Map<String, Value>) -> Self {
        Self(body)
    }

    pub fn analysis(&self) -> Option<&str> {
        self.0.get("analysis").and_then(Value::as_str)
    }

    pub fn suggestions(&self) -> Option<&Vec<Value>> {
        self.0.get("suggestions").and_then(Value::as_array)
    }

    pub fn complete_outfit(&self) -> Option<&Vec<Value>> {
        self.0.get("completeOutfit").and_then(Value::as_array)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}
