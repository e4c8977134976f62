//! Vaccination dose data normalized into population-wide vaccination status.
//!
//! Dose counts arrive per (ISO week, age group, vaccine product). The
//! [`policy`] module maps a product's dose columns to status counts, the
//! [`normalize`] module builds weekly running totals for a target group and
//! [`status`] summarises every age group over the whole period.

pub mod normalize;
pub mod policy;
pub mod status;

pub use normalize::{ADULT_AGGREGATE_GROUP, VaccinationWeekSummary, normalize_vaccination};
pub use policy::{BoosterPolicy, VaccineKind};
pub use status::{GroupStatusRow, vaccination_status_by_group};
