// src/services/mod.rs
pub mod image_processor;
pub mod llm_service;
pub mod orchestrator;
pub mod prompt_builder;
pub mod redis_service;
pub mod response_cache;
pub mod response_normalizer;
pub mod retry;

pub use image_processor::{ImageProcessor, PreparedImage};
pub use llm_service::{AnthropicVisionClient, VisionClient};
pub use orchestrator::VisionOrchestrator;
pub use prompt_builder::PromptBuilder;
pub use redis_service::{ImageStore, MemoryImageStore, RedisImageStore};
pub use response_cache::ResponseCache;
pub use response_normalizer::ResponseNormalizer;
pub use retry::{RetryExecutor, RetryPolicy, Sleeper, TokioSleeper};
