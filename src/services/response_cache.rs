// src/services/response_cache.rs
use crate::models::{AnalysisRequest, AnalysisResponse};
use log::{debug, info};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// The request fields that change what the prompt asks for. Wardrobe items contribute
/// only their identifiers, and the regeneration outfit snapshot is not included.
#[derive(Serialize)]
struct FingerprintFields<'a> {
    kind: &'static str,
    occasion: Option<&'a str>,
    style_preference: Option<&'a str>,
    price_tier: Option<&'static str>,
    target_garment: Option<&'static str>,
    wardrobe_ids: Vec<&'a str>,
    image_count: usize,
}

pub fn fingerprint(request: &AnalysisRequest) -> String {
    let mut wardrobe_ids: Vec<&str> = request.wardrobe().iter().map(|i| i.id.as_str()).collect();
    wardrobe_ids.sort_unstable();

    let fields = FingerprintFields {
        kind: request.kind().as_str(),
        occasion: request.occasion(),
        style_preference: request.style_preference(),
        price_tier: request.price_tier().map(|t| t.label()),
        target_garment: request.target_garment().map(|g| g.label()),
        wardrobe_ids,
        image_count: request.images().len(),
    };

    let bytes = serde_json::to_vec(&fields).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{}:{}", request.kind().as_str(), hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub payload: AnalysisResponse,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-memory response cache for image-free requests. Nothing survives a restart.
#[derive(Default)]
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, request: &AnalysisRequest) -> Option<AnalysisResponse> {
        if !request.is_cacheable() {
            return None;
        }
        let key = fingerprint(request);
        let now = Instant::now();

        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(&key) {
                None => {
                    debug!("Cache miss for {}", key);
                    return None;
                }
                Some(entry) if !entry.is_expired(now) => {
                    debug!("Cache hit for {}", key);
                    return Some(entry.payload.clone());
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.get(&key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(&key);
            debug!("Evicted expired cache entry {}", key);
        }
        None
    }

    /// Stores `payload` for `request`. Returns false when the request carries images.
    pub fn set(&self, request: &AnalysisRequest, payload: AnalysisResponse, ttl: Duration) -> bool {
        if !request.is_cacheable() {
            return false;
        }
        let key = fingerprint(request);
        let now = Instant::now();
        let entry = CacheEntry {
            key: key.clone(),
            payload,
            created_at: now,
            expires_at: now + ttl,
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), entry);
        debug!("Cached response {} for {:?}", key, ttl);
        true
    }

    pub fn invalidate(&self, request: &AnalysisRequest) -> bool {
        let key = fingerprint(request);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweeps on a fixed interval until the cache is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(strong) = cache.upgrade() else {
                    break;
                };
                let removed = strong.sweep();
                if removed > 0 {
                    info!("Cache sweep removed {} expired entries", removed);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::*;
    use serde_json::{Map, json};

    fn item(id: &str, category: &str) -> WardrobeItemRef {
        WardrobeItemRef {
            id: id.to_string(),
            category: category.to_string(),
            primary_color: None,
            secondary_color: None,
            material: None,
            pattern: None,
            brand: None,
            size: None,
        }
    }

    fn wardrobe_request(occasion: &str, wardrobe: Vec<WardrobeItemRef>) -> AnalysisRequest {
        AnalysisRequest::OutfitFromWardrobe(OutfitFromWardrobeRequest {
            occasion: occasion.to_string(),
            style_preference: Some("minimal".into()),
            measurements: None,
            shoe_size: None,
            wardrobe,
        })
    }

    fn regeneration(current_outfit: Vec<OutfitSlot>) -> AnalysisRequest {
        AnalysisRequest::SingleItemRegeneration(SingleItemRegenerationRequest {
            occasion: "brunch".into(),
            style_preference: None,
            price_tier: Some(PriceTier::Budget),
            measurements: None,
            shoe_size: None,
            wardrobe: vec![],
            target_garment: GarmentType::Shoes,
            current_outfit,
        })
    }

    fn payload(analysis: &str) -> AnalysisResponse {
        let mut body = Map::new();
        body.insert("analysis".into(), json!(analysis));
        body.insert("completeOutfit".into(), json!([]));
        AnalysisResponse::new(body)
    }

    #[test]
    fn fingerprint_ignores_wardrobe_order() {
        let a = wardrobe_request("office", vec![item("w1", "Blazer"), item("w2", "Loafers")]);
        let b = wardrobe_request("office", vec![item("w2", "Loafers"), item("w1", "Blazer")]);
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_separates_distinct_requests() {
        let office = wardrobe_request("office", vec![item("w1", "Blazer")]);
        let wedding = wardrobe_request("wedding", vec![item("w1", "Blazer")]);
        let more_items = wardrobe_request("office", vec![item("w1", "Blazer"), item("w3", "Scarf")]);
        let shopping = AnalysisRequest::OutfitFromShopping(OutfitFromShoppingRequest {
            occasion: "office".into(),
            style_preference: Some("minimal".into()),
            price_tier: None,
            measurements: None,
            shoe_size: None,
        });

        assert_ne!(fingerprint(&office), fingerprint(&wedding));
        assert_ne!(fingerprint(&office), fingerprint(&more_items));
        assert_ne!(fingerprint(&office), fingerprint(&shopping));
    }

    #[test]
    fn changed_wardrobe_content_with_same_ids_hits_stale_entry() {
        let cache = ResponseCache::new();
        let before = wardrobe_request("office", vec![item("w1", "Blazer")]);
        let mut recoloured = item("w1", "Blazer");
        recoloured.primary_color = Some("red".into());
        let after = wardrobe_request("office", vec![recoloured]);

        cache.set(&before, payload("navy blazer look"), Duration::from_secs(300));
        assert_eq!(
            cache.get(&after).and_then(|p| p.analysis().map(str::to_string)),
            Some("navy blazer look".to_string())
        );
    }

    #[test]
    fn regeneration_outfit_snapshot_is_not_fingerprinted() {
        let first = regeneration(vec![OutfitSlot {
            garment_type: GarmentType::Dress,
            description: "green midi dress".into(),
            existing_item_id: None,
        }]);
        let second = regeneration(vec![OutfitSlot {
            garment_type: GarmentType::Bottom,
            description: "wide leg jeans".into(),
            existing_item_id: Some("w9".into()),
        }]);
        assert_eq!(fingerprint(&first), fingerprint(&second));
    }

    #[test]
    fn image_requests_bypass_cache() {
        let cache = ResponseCache::new();
        let request = AnalysisRequest::WardrobeItemCategorization(
            WardrobeItemCategorizationRequest {
                images: vec![ImageInput::Encoded { data: "abc".into() }],
            },
        );
        assert!(!cache.set(&request, payload("shirt"), Duration::from_secs(300)));
        assert!(cache.get(&request).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache = ResponseCache::new();
        let request = wardrobe_request("office", vec![item("w1", "Blazer")]);
        cache.set(&request, payload("look"), Duration::from_secs(300));
        assert!(cache.invalidate(&request));
        assert!(!cache.invalidate(&request));
        assert!(cache.get(&request).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn expired_entries_are_evicted_on_read() {
        let cache = ResponseCache::new();
        let request = wardrobe_request("office", vec![item("w1", "Blazer")]);
        cache.set(&request, payload("look"), Duration::from_secs(300));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(&request).is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&request).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_drops_only_expired_entries() {
        let cache = ResponseCache::new();
        let short = wardrobe_request("office", vec![item("w1", "Blazer")]);
        let long = wardrobe_request("gala", vec![item("w1", "Blazer")]);
        cache.set(&short, payload("short"), Duration::from_secs(10));
        cache.set(&long, payload("long"), Duration::from_secs(600));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get(&long).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn background_sweeper_runs_on_interval() {
        let cache = Arc::new(ResponseCache::new());
        let request = wardrobe_request("office", vec![item("w1", "Blazer")]);
        cache.set(&request, payload("look"), Duration::from_secs(5));
        let handle = cache.spawn_sweeper(Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(cache.is_empty());
        handle.abort();
    }
}
