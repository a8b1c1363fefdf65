//! Authentication adapters.
//!
//! Implementations of the `SessionValidator` port:
//!
//! - `firebase` - Firebase ID token validation against Google's JWKS
//! - `mock` - Token table for tests

mod firebase;
mod mock;

pub use firebase::{FirebaseConfig, FirebaseSessionValidator, FIREBASE_JWKS_URL};
pub use mock::MockSessionValidator;
