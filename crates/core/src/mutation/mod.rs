pub mod types;

pub use types::Patch;
