// src/handlers.rs
use crate::{AppState, errors::StyleLensError, models::*};
use actix_multipart::Multipart;
use actix_web::{HttpResponse, web};
use futures_util::TryStreamExt;
use log::info;
use uuid::Uuid;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/uploads", web::post().to(upload_images))
            .route("/analyze", web::post().to(analyze))
            .route("/cache", web::delete().to(invalidate_cache)),
    )
    .route("/health", web::get().to(health_check));
}

pub async fn upload_images(
    mut payload: Multipart,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StyleLensError> {
    let mut receipts = Vec::new();

    while let Some(mut field) = payload
        .try_next()
        .await
        .map_err(|e| StyleLensError::Validation(e.to_string()))?
    {
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .ok_or_else(|| StyleLensError::Validation("No filename provided".to_string()))?
            .to_string();

        let content_type = field
            .content_type()
            .map(|ct| ct.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        // Collect image data
        let mut image_data = Vec::new();
        while let Some(chunk) = field
            .try_next()
            .await
            .map_err(|e| StyleLensError::Validation(e.to_string()))?
        {
            image_data.extend_from_slice(&chunk);
        }

        let (width, height) = data.image_processor.validate_image(&image_data)?;

        let id = Uuid::new_v4();
        let size = image_data.len();
        data.image_store.store_image(&id, image_data).await?;

        receipts.push(UploadReceipt {
            id,
            filename,
            content_type,
            size,
            width,
            height,
            uploaded_at: chrono::Utc::now(),
        });
    }

    if receipts.is_empty() {
        return Err(StyleLensError::Validation("No images in upload".to_string()));
    }

    info!("Stored {} uploaded image(s)", receipts.len());
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "uploads": receipts,
        "count": receipts.len()
    })))
}

pub async fn analyze(
    body: web::Json<AnalysisRequest>,
    data: web::Data<AppState>,
) -> Result<HttpResponse, StyleLensError> {
    let request = body.into_inner();
    let response = data.orchestrator.analyze(&request).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn invalidate_cache(
    body: web::Json<AnalysisRequest>,
    data: web::Data<AppState>,
) -> HttpResponse {
    let invalidated = data.orchestrator.cache().invalidate(&body);
    HttpResponse::Ok().json(serde_json::json!({ "invalidated": invalidated }))
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "stylelens",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
