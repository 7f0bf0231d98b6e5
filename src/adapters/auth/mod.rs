//! Authentication adapters.
//!
//! Implementations of the `IdentityVerifier` and `ProfileResolver` ports:
//!
//! - `clerk` - Clerk JWKS verification and Backend API directory lookups
//! - `mock` - Test implementations that don't require external services

mod clerk;
mod mock;

pub use clerk::{ClerkConfig, ClerkDirectoryClient, ClerkIdentityVerifier, DEFAULT_JWKS_CACHE};
pub use mock::{MockIdentityVerifier, MockProfileResolver};
