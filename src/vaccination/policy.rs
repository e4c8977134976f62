//! How dose columns translate into vaccination status.

use serde::{Deserialize, Serialize};

/// Products that complete the primary scheme with a single dose.
pub const SINGLE_DOSE_PRODUCTS: &[&str] = &["JANSS"];

/// Two-dose products the per-group status table counts.
pub const MULTI_DOSE_PRODUCTS: &[&str] = &["COM", "MOD", "AZ"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VaccineKind {
    SingleDose,
    MultiDose,
}

impl VaccineKind {
    /// Unlisted products, `UNK` included, are treated as multi-dose.
    pub fn of(product: &str) -> Self {
        if SINGLE_DOSE_PRODUCTS.contains(&product) {
            VaccineKind::SingleDose
        } else {
            VaccineKind::MultiDose
        }
    }

    /// Kind of a listed product, `None` for anything else.
    pub fn known(product: &str) -> Option<Self> {
        if SINGLE_DOSE_PRODUCTS.contains(&product) {
            Some(VaccineKind::SingleDose)
        } else if MULTI_DOSE_PRODUCTS.contains(&product) {
            Some(VaccineKind::MultiDose)
        } else {
            None
        }
    }
}

/// Raw dose counts for one product.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DoseCounts {
    pub first_dose: u64,
    pub second_dose: u64,
    pub additional_dose_1: u64,
}

/// People counted into each status by one product's doses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub completing_scheme: u64,
    pub at_least_one_dose: u64,
    pub boosted: u64,
}

impl std::ops::AddAssign for StatusCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.completing_scheme = self.completing_scheme.saturating_add(rhs.completing_scheme);
        self.at_least_one_dose = self.at_least_one_dose.saturating_add(rhs.at_least_one_dose);
        self.boosted = self.boosted.saturating_add(rhs.boosted);
    }
}

/// What counts as "boosted" for single-dose products.
///
/// The upstream data does not say whether a single-dose product's second and
/// additional dose columns are boosters or a late second primary dose. This is
/// the one place that decides; multi-dose products always count
/// `DoseAdditional1` only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum BoosterPolicy {
    /// Single-dose: second dose plus first additional dose.
    #[default]
    SecondAndAdditional,
    /// Single-dose: first additional dose only, same as multi-dose products.
    AdditionalOnly,
}

impl BoosterPolicy {
    pub fn boosted(self, kind: VaccineKind, doses: &DoseCounts) -> u64 {
        match (kind, self) {
            (VaccineKind::SingleDose, BoosterPolicy::SecondAndAdditional) => {
                doses.second_dose.saturating_add(doses.additional_dose_1)
            }
            (VaccineKind::SingleDose, BoosterPolicy::AdditionalOnly)
            | (VaccineKind::MultiDose, _) => doses.additional_dose_1,
        }
    }

    pub fn classify(self, kind: VaccineKind, doses: &DoseCounts) -> StatusCounts {
        let completing_scheme = match kind {
            VaccineKind::SingleDose => doses.first_dose,
            VaccineKind::MultiDose => doses.second_dose,
        };
        StatusCounts {
            completing_scheme,
            at_least_one_dose: doses.first_dose,
            boosted: self.boosted(kind, doses),
        }
    }
}
