use super::types::{
    PENSION_START_AGE, PROJECTION_YEARS, ProjectionResult, ProjectionRow, ScenarioParameters,
};

#[derive(Debug, Clone, Copy)]
struct YearState {
    salary_path: f64,
    portfolio: f64,
    retired: bool,
}

pub fn project(params: &ScenarioParameters) -> ProjectionResult {
    let mut rows = Vec::with_capacity(PROJECTION_YEARS);
    let mut first_retirement_index = None;
    let mut state = YearState {
        salary_path: params.current_salary,
        portfolio: params.current_portfolio,
        retired: false,
    };

    for index in 0..PROJECTION_YEARS {
        if index > 0 {
            state.salary_path *= 1.0 + params.salary_growth_rate;
        }

        // The regime is fixed by rows before this one; the triggering year
        // itself still earns, saves and grows at the pre-retirement rate.
        let nominal_salary = if state.retired { 0.0 } else { state.salary_path };
        let nominal_savings_contribution = nominal_salary * params.savings_rate;
        if index > 0 {
            state.portfolio = apply_year_growth(params, &state, nominal_savings_contribution);
        }

        let age = params.current_age + index as u32;
        let real_portfolio_value = deflate(state.portfolio, params.inflation_rate, index);
        let real_sustainable_withdrawal = sustainable_withdrawal(params, real_portfolio_value);
        let real_pension_income = pension_income(params, age);
        let can_retire = is_retirement_eligible(
            params,
            age,
            real_sustainable_withdrawal + real_pension_income,
        );

        if can_retire && !state.retired {
            state.retired = true;
            first_retirement_index = Some(index);
        }

        rows.push(ProjectionRow {
            year: params.start_year + index as i32,
            age,
            nominal_salary,
            nominal_savings_contribution,
            nominal_portfolio_value: state.portfolio,
            real_portfolio_value,
            real_sustainable_withdrawal,
            real_pension_income,
            can_retire,
        });
    }

    ProjectionResult {
        rows,
        first_retirement_index,
    }
}

fn apply_year_growth(params: &ScenarioParameters, state: &YearState, contribution: f64) -> f64 {
    let rate = if state.retired {
        params.post_retirement_return
    } else {
        params.pre_retirement_return
    };
    state.portfolio + contribution + state.portfolio * rate
}

fn deflate(nominal: f64, inflation_rate: f64, years_elapsed: usize) -> f64 {
    nominal / (1.0 + inflation_rate).powi(years_elapsed as i32)
}

fn sustainable_withdrawal(params: &ScenarioParameters, real_portfolio: f64) -> f64 {
    real_portfolio * params.safe_withdrawal_rate * (1.0 - params.tax_drag_rate)
}

fn pension_income(params: &ScenarioParameters, age: u32) -> f64 {
    if age >= PENSION_START_AGE {
        params.pension_annual_amount
    } else {
        0.0
    }
}

fn is_retirement_eligible(params: &ScenarioParameters, age: u32, real_income: f64) -> bool {
    real_income >= params.desired_annual_spending && age >= params.target_retirement_age
}
