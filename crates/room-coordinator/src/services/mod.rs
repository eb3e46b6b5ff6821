//! Production implementations of the external collaborator interfaces.
//!
//! Both collaborators are black boxes behind the traits in `common`:
//! the identity service over HTTP, the participation store over Postgres.

pub mod identity;
pub mod store;

pub use identity::HttpIdentityService;
pub use store::PgParticipationStore;
