pub mod bands;
pub mod catalog;
pub mod constants;
pub mod diffphot_errors;
pub mod magnitude;
pub mod mock;
pub mod params;
pub mod provider;
pub mod reduction;
mod regression;
pub mod report;
pub mod selection;
pub mod session;
pub mod settings;
pub mod transform;
