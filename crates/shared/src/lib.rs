pub mod drawing;
pub mod engine;
pub mod error;
pub mod geo;
pub mod grid;
pub mod models;
pub mod render;
pub mod staging;
pub mod store;

pub use engine::{AnnotationEngine, Clock, EngineConfig, MapEvent, Outcome, SystemClock};
pub use error::{EngineError, StorageError};
pub use store::{CollectionStorage, MemoryStorage};
