//! Weekly aggregation of the daily series and per-100k hospitalization rates.

pub mod aggregate;
pub mod rates;
pub mod types;
pub mod utility;

pub use aggregate::weekly_means;
pub use rates::{HospitalizationRates, compute_weekly_rates};
pub use types::{WeeklyHospitalization, WeeklyRateRecord};
