use crate::models::{FilterRule, FundamentalMetrics, PassedFilter};
use std::fmt;

/// Rule table, in reporting order. Thresholds are fixed, not configuration.
pub const RULES: [FilterRule; 5] = [
    FilterRule::Pbr,
    FilterRule::Per,
    FilterRule::Roe,
    FilterRule::DebtRatio,
    FilterRule::DividendYield,
];

impl FilterRule {
    pub fn metric(self, m: &FundamentalMetrics) -> Option<f64> {
        match self {
            FilterRule::Pbr => m.pbr,
            FilterRule::Per => m.per,
            FilterRule::Roe => m.roe,
            FilterRule::DebtRatio => m.debt_ratio,
            FilterRule::DividendYield => m.dividend_yield_pct,
        }
    }

    pub fn passes(self, value: f64) -> bool {
        match self {
            FilterRule::Pbr => value > 0.0 && value < 1.0,
            FilterRule::Per => value > 0.0 && value < 15.0,
            FilterRule::Roe => value > 15.0,
            FilterRule::DebtRatio => value < 100.0,
            FilterRule::DividendYield => value > 2.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FilterRule::Pbr => "PBR",
            FilterRule::Per => "PER",
            FilterRule::Roe => "ROE",
            FilterRule::DebtRatio => "Debt ratio",
            FilterRule::DividendYield => "Dividend",
        }
    }

    fn is_percent(self) -> bool {
        matches!(self, FilterRule::Roe | FilterRule::DebtRatio | FilterRule::DividendYield)
    }
}

impl fmt::Display for PassedFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.2}", self.rule.name(), self.value)?;
        if self.rule.is_percent() {
            f.write_str("%")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Scorecard {
    /// Number of satisfied rules, 0..=5.
    pub score: u8,
    pub passed: Vec<PassedFilter>,
}

/// Count satisfied rules. An absent metric simply fails its rule.
pub fn score(metrics: &FundamentalMetrics) -> Scorecard {
    let passed: Vec<PassedFilter> = RULES
        .iter()
        .filter_map(|&rule| {
            let value = rule.metric(metrics)?;
            rule.passes(value).then_some(PassedFilter { rule, value })
        })
        .collect();

    Scorecard { score: passed.len() as u8, passed }
}
