pub mod health;
pub mod insurance_details;
pub mod insurance_providers;
