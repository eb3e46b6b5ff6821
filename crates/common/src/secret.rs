//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports from the [`secrecy`] crate. Use [`SecretString`] for any
//! value that must never appear in logs - in Parley that is the database
//! connection string, which can embed credentials. `Debug` on these types
//! prints a redaction marker, so structs that derive `Debug` stay safe to
//! log; reading the value requires an explicit [`ExposeSecret`] call, and
//! the backing memory is zeroized on drop.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
