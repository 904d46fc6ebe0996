//! Conversion from store documents to returned values

mod converter;
mod errors;
mod processor;

pub use converter::{read, write, DocumentConverter, JsonConverter};
pub use errors::{ConversionError, ConversionResult};
pub use processor::{ResultConverter, ResultProcessor, ReturnedType};
