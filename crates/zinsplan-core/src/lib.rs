pub mod error;
pub mod types;

#[cfg(feature = "mezzanine")]
pub mod mezzanine;

pub use error::ZinsplanError;
pub use types::*;

/// Standard result type for all zinsplan operations
pub type ZinsplanResult<T> = Result<T, ZinsplanError>;
