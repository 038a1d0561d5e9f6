//! Progressive income tax withheld on gross pay.

/// One marginal band: `[lower, upper)` taxed at `rate`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub lower: f64,
    pub upper: Option<f64>,
    pub rate: f64,
}

pub const INCOME_TAX_BRACKETS: [Bracket; 5] = [
    Bracket { lower: 0.0, upper: Some(350_000.0), rate: 0.00 },
    Bracket { lower: 350_000.0, upper: Some(400_000.0), rate: 0.05 },
    Bracket { lower: 400_000.0, upper: Some(500_000.0), rate: 0.10 },
    Bracket { lower: 500_000.0, upper: Some(600_000.0), rate: 0.15 },
    Bracket { lower: 600_000.0, upper: None, rate: 0.20 },
];

/// Withheld instead of a computed total of exactly zero.
pub const MINIMUM_TAX: f64 = 2000.0;

impl Bracket {
    fn portion(&self, base: f64) -> f64 {
        let top = self.upper.map_or(base, |upper| base.min(upper));
        (top - self.lower).max(0.0) * self.rate
    }
}

/// Sum of the marginal amounts over `brackets`, floored at [`MINIMUM_TAX`] when it comes to zero.
pub fn progressive_tax(gross: f64, brackets: &[Bracket]) -> f64 {
    let base = gross.max(0.0);
    let total: f64 = brackets.iter().map(|b| b.portion(base)).sum();
    if total == 0.0 { MINIMUM_TAX } else { total }
}

/// [`progressive_tax`] over the statutory schedule.
pub fn income_tax(gross: f64) -> f64 {
    progressive_tax(gross, &INCOME_TAX_BRACKETS)
}
