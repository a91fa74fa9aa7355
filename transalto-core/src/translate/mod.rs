//! Translation through a remote service: chunking, per-document caching and
//! the service client itself.

pub mod cache;
pub mod chunker;
pub mod service;
pub mod translator;

pub use cache::{unique_units, TranslationCache};
pub use chunker::{chunk_text, DEFAULT_CHUNK_CHARS};
pub use service::{
    default_models, parse_model_catalog, LindatService, ServiceError, TranslationService,
    DEFAULT_API_URL,
};
pub use translator::Translator;
