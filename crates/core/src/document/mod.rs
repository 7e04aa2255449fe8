pub mod id;
pub mod model;
pub mod validate;

pub use id::{Collection, DocumentId, InvalidId};
pub use model::Document;
