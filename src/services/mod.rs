pub mod auth;
pub mod cold_start;
pub mod enrichment;
pub mod neighbors;
pub mod providers;
pub mod recommendations;
pub mod resolver;

pub use auth::{hash_password, verify_password, Claims, TokenIssuer};
pub use enrichment::{Enricher, RetryPolicy};
pub use providers::{CatalogError, CatalogProvider, TmdbProvider};
pub use recommendations::RecommendationService;
