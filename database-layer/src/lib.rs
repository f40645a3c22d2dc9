//! Database layer for the insurance records service
//!
//! Provides the PostgreSQL connection pool, the embedded schema migrations and
//! the error type shared by every repository built on top of it.
//!
//! # Schema guarantees
//!
//! The migrations back the two application invariants with constraints:
//!
//! - `insurance_details_no_active_overlap` excludes two active contracts of the
//!   same recipient with intersecting service-date ranges
//! - `insurance_providers_single_default` allows a single default provider
//!
//! Repositories still perform the supersession and default-flag sequences in a
//! transaction; the constraints turn a lost race into a
//! [`DatabaseError::ConstraintViolation`] instead of corrupt data.

pub mod connection;
pub mod error;
pub mod migration;

pub use connection::*;
pub use error::*;
pub use migration::run_migrations;
