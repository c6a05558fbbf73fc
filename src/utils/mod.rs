pub mod error;
pub mod text;

pub use error::{AppError, Result};
pub use text::{contains_brand, contains_model, normalize};
