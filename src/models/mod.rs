pub mod batch;
pub mod fill_result;

pub use batch::{BatchRequest, UploadedFile};
pub use fill_result::{BatchResult, FillResult, ResponseFormat};
