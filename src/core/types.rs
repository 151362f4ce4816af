use serde::Serialize;

/// Number of simulated years in every projection.
pub const PROJECTION_YEARS: usize = 80;

/// Age from which the pension is paid.
pub const PENSION_START_AGE: u32 = 65;

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioParameters {
    pub start_year: i32,
    pub current_age: u32,
    pub current_salary: f64,
    pub salary_growth_rate: f64,
    pub savings_rate: f64,
    pub current_portfolio: f64,
    pub pre_retirement_return: f64,
    pub post_retirement_return: f64,
    pub inflation_rate: f64,
    pub safe_withdrawal_rate: f64,
    pub tax_drag_rate: f64,
    pub pension_annual_amount: f64,
    pub desired_annual_spending: f64,
    pub target_retirement_age: u32,
    pub nest_egg_target: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionRow {
    pub year: i32,
    pub age: u32,
    pub nominal_salary: f64,
    pub nominal_savings_contribution: f64,
    pub nominal_portfolio_value: f64,
    pub real_portfolio_value: f64,
    pub real_sustainable_withdrawal: f64,
    pub real_pension_income: f64,
    pub can_retire: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionResult {
    pub rows: Vec<ProjectionRow>,
    pub first_retirement_index: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RetirementSummary {
    pub year: i32,
    pub age: u32,
    pub years_until_retirement: u32,
    pub nominal_portfolio_value: f64,
    pub real_portfolio_value: f64,
}

impl ProjectionResult {
    pub fn first_retirement_row(&self) -> Option<&ProjectionRow> {
        self.first_retirement_index.and_then(|idx| self.rows.get(idx))
    }

    pub fn retirement_summary(&self) -> Option<RetirementSummary> {
        let start_age = self.rows.first()?.age;
        let row = self.first_retirement_row()?;
        Some(RetirementSummary {
            year: row.year,
            age: row.age,
            years_until_retirement: row.age - start_age,
            nominal_portfolio_value: row.nominal_portfolio_value,
            real_portfolio_value: row.real_portfolio_value,
        })
    }

    /// Real portfolio value at `age`, linearly interpolated between rows.
    ///
    /// Ages before the first row or after the last one take that row's value.
    /// An empty projection yields 0.
    pub fn real_portfolio_at_age(&self, age: f64) -> f64 {
        let (Some(first), Some(last)) = (self.rows.first(), self.rows.last()) else {
            return 0.0;
        };
        if age.is_nan() {
            return f64::NAN;
        }
        if age <= first.age as f64 {
            return first.real_portfolio_value;
        }
        if age >= last.age as f64 {
            return last.real_portfolio_value;
        }

        let upper = self
            .rows
            .partition_point(|row| (row.age as f64) <= age)
            .min(self.rows.len() - 1);
        let hi = &self.rows[upper];
        let lo = &self.rows[upper - 1];
        let span = (hi.age - lo.age) as f64;
        if span <= 0.0 {
            return lo.real_portfolio_value;
        }
        let weight = (age - lo.age as f64) / span;
        lo.real_portfolio_value + (hi.real_portfolio_value - lo.real_portfolio_value) * weight
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GoalVariable {
    SavingsRate,
    SalaryGrowth,
    PreRetirementReturn,
}

impl GoalVariable {
    /// Search interval for the variable, as fractions.
    pub fn bounds(self) -> (f64, f64) {
        match self {
            GoalVariable::SavingsRate => (0.0, 1.0),
            GoalVariable::SalaryGrowth => (0.0, 0.5),
            GoalVariable::PreRetirementReturn => (0.0, 0.3),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GoalVariable::SavingsRate => "savings rate",
            GoalVariable::SalaryGrowth => "salary growth",
            GoalVariable::PreRetirementReturn => "pre-retirement return",
        }
    }

    pub fn apply(self, params: &mut ScenarioParameters, value: f64) {
        match self {
            GoalVariable::SavingsRate => params.savings_rate = value,
            GoalVariable::SalaryGrowth => params.salary_growth_rate = value,
            GoalVariable::PreRetirementReturn => params.pre_retirement_return = value,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GoalSolveConfig {
    pub x_tolerance: f64,
    pub relative_tolerance: f64,
    pub max_iterations: u32,
}

impl Default for GoalSolveConfig {
    fn default() -> Self {
        Self {
            x_tolerance: 2e-12,
            relative_tolerance: 4.0 * f64::EPSILON,
            max_iterations: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolveIteration {
    pub iteration: u32,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub candidate_value: f64,
    pub gap: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalSolution {
    pub variable: GoalVariable,
    pub solved_value: f64,
    pub achieved_real_portfolio: f64,
    pub residual_gap: f64,
    pub search_min: f64,
    pub search_max: f64,
    pub iterations: Vec<GoalSolveIteration>,
    pub converged: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error(
        "target unaffordable even with extreme settings: {} gap is {gap_at_low:.2} at the lower bound and {gap_at_high:.2} at the upper bound",
        .variable.label()
    )]
    TargetUnreachable {
        variable: GoalVariable,
        gap_at_low: f64,
        gap_at_high: f64,
    },
    #[error("invalid solver configuration: {0}")]
    InvalidConfig(String),
}
