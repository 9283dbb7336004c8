pub mod llm_service;
pub mod pdf_service;
pub mod template;
pub mod text_extractor;

pub use llm_service::{Filler, LlmService};
pub use pdf_service::PdfService;
pub use template::build_skeleton;
pub use text_extractor::{detect_media_type, MediaType, TextExtractor};
