#![forbid(unsafe_code)]

mod error;
pub use error::{Error, Result};

pub mod class;
pub mod config;
pub mod definition;
pub(crate) mod docs;
pub mod files;
mod gen;
pub(crate) mod input_gen;
mod merge;
pub(crate) mod result_gen;
pub(crate) mod types;
pub(crate) mod walker;
pub(crate) mod writer;

pub use gen::Generator;
pub use merge::ClassMerger;

// re-export
pub(crate) use bytes::BytesMut;

// common types used in this crate
pub(crate) type JsonValue = serde_json::Value;

pub(crate) mod strings {
    /// re-export inflector string conversions
    pub use inflector::cases::{pascalcase::to_pascal_case, snakecase::to_snake_case};
}
