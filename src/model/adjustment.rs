use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

use crate::utils::parse;

pub const PRODUCTION_BONUS: &str = "production_bonus";
pub const ATTENDANCE_BONUS: &str = "attendance_bonus";
pub const SENIORITY_BONUS: &str = "seniority_bonus";
pub const ELITE_BONUS: &str = "elite_bonus";
pub const RESPONSIBILITY_BONUS: &str = "responsibility_bonus";
pub const SOCIAL_CONTRIBUTION: &str = "social_contribution";
pub const SALARY_ADVANCE: &str = "salary_advance";

/// Social contribution withheld when HR did not set a non-zero one for the month.
pub const DEFAULT_SOCIAL_CONTRIBUTION: f64 = 15000.0;

/// Manual salary overrides of one employee for one month.
///
/// The field set is open: HR can store any named value, the calculator only
/// reads the ones it knows and treats the rest as annotations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(
    value_type = Object,
    example = json!({"production_bonus": 25000, "salary_advance": "50 000"})
)]
pub struct SalaryAdjustment(pub Map<String, Value>);

impl SalaryAdjustment {
    pub fn amount(&self, field: &str, default: f64) -> f64 {
        self.0
            .get(field)
            .map(|value| parse::amount(value, default))
            .unwrap_or(default)
    }

    pub fn bonuses(&self) -> Bonuses {
        Bonuses {
            production: self.amount(PRODUCTION_BONUS, 0.0),
            attendance: self.amount(ATTENDANCE_BONUS, 0.0),
            seniority: self.amount(SENIORITY_BONUS, 0.0),
            elite: self.amount(ELITE_BONUS, 0.0),
            responsibility: self.amount(RESPONSIBILITY_BONUS, 0.0),
        }
    }

    /// An explicit zero counts as unset.
    pub fn social_contribution(&self) -> f64 {
        match self.amount(SOCIAL_CONTRIBUTION, DEFAULT_SOCIAL_CONTRIBUTION) {
            v if v == 0.0 => DEFAULT_SOCIAL_CONTRIBUTION,
            v => v,
        }
    }

    pub fn salary_advance(&self) -> f64 {
        self.amount(SALARY_ADVANCE, 0.0)
    }

    /// Overlays `patch` field by field.
    pub fn merge(&mut self, patch: Map<String, Value>) {
        self.0.extend(patch);
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bonuses {
    pub production: f64,
    pub attendance: f64,
    pub seniority: f64,
    pub elite: f64,
    pub responsibility: f64,
}

impl Bonuses {
    pub fn total(&self) -> f64 {
        self.production + self.attendance + self.seniority + self.elite + self.responsibility
    }
}
