//! Insurance records for home-care billing
//!
//! Providers (payers) and insurance details: the authorization a recipient
//! holds from a provider, prescribed by a doctor, over a service-date range.
//!
//! - Listing with search, date filter, sorting and pagination ([`query`])
//! - Active-contract supersession on create and update ([`supersession`])
//! - A single default provider at any time ([`repository`])

pub mod error;
pub mod models;
pub mod query;
pub mod repository;
pub mod service;
pub mod supersession;

pub use error::*;
pub use models::*;
pub use query::*;
pub use repository::*;
pub use service::*;
pub use supersession::*;
