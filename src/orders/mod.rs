pub mod error;
pub mod handlers;
pub mod models;
pub mod notifier;
pub mod price_calculator;
pub mod reifier;
pub mod repository;
pub mod service;


pub use error::*;
pub use handlers::*;
pub use models::*;
pub use notifier::*;
pub use price_calculator::*;
pub use reifier::{canonical_id, reify, Archetype, ReifiedLine};
pub use repository::*;
pub use service::*;
