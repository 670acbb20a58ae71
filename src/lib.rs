// src/lib.rs
use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod services;

use crate::services::{ImageProcessor, ImageStore, VisionOrchestrator};

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<VisionOrchestrator>,
    pub image_store: Arc<dyn ImageStore>,
    pub image_processor: Arc<ImageProcessor>,
}
