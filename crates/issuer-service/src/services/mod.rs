pub mod key_cache;
pub mod token_service;
pub mod verification_service;

pub use key_cache::{KeyCache, KeyPair};
pub use token_service::{TokenRequest, TokenService};
pub use verification_service::{CacheKeyResolver, LocalTokenVerifier};
