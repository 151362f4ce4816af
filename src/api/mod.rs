use axum::{
    Router,
    extract::{Json, Query},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    GoalSolution, GoalSolveIteration, GoalVariable, PROJECTION_YEARS, ProjectionResult,
    ProjectionRow, RetirementSummary, ScenarioParameters, SolveError, project, solve_goal,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::Solve(SolveError::InvalidConfig(_)) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Solve(SolveError::TargetUnreachable { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Serialization(_) | ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error_response(self.status(), &self.to_string())
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliGoalVariable {
    SavingsRate,
    SalaryGrowth,
    PreRetReturn,
}

impl From<CliGoalVariable> for GoalVariable {
    fn from(value: CliGoalVariable) -> Self {
        match value {
            CliGoalVariable::SavingsRate => GoalVariable::SavingsRate,
            CliGoalVariable::SalaryGrowth => GoalVariable::SalaryGrowth,
            CliGoalVariable::PreRetReturn => GoalVariable::PreRetirementReturn,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum ApiGoalVariable {
    #[serde(alias = "savingsRate", alias = "savings_rate")]
    SavingsRate,
    #[serde(alias = "salaryGrowth", alias = "salary_growth")]
    SalaryGrowth,
    #[serde(
        alias = "preRetReturn",
        alias = "pre_ret_return",
        alias = "pre-retirement-return"
    )]
    PreRetReturn,
}

impl From<ApiGoalVariable> for CliGoalVariable {
    fn from(value: ApiGoalVariable) -> Self {
        match value {
            ApiGoalVariable::SavingsRate => CliGoalVariable::SavingsRate,
            ApiGoalVariable::SalaryGrowth => CliGoalVariable::SalaryGrowth,
            ApiGoalVariable::PreRetReturn => CliGoalVariable::PreRetReturn,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "fire-planner",
    about = "Deterministic FIRE projection with a goal-seek for savings rate, salary growth or return"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Project the scenario for 80 years and report the first year retirement is affordable
    Project {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, help = "Print the JSON response instead of a table")]
        json: bool,
    },
    /// Solve for one input so the real portfolio hits the nest-egg target at the target age
    Solve {
        #[command(flatten)]
        scenario: ScenarioArgs,
        #[arg(long, value_enum, default_value_t = CliGoalVariable::SavingsRate)]
        solve_for: CliGoalVariable,
        #[arg(long, help = "Print the JSON response instead of a message")]
        json: bool,
    },
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    #[arg(long, help = "Calendar year of the first projected row; defaults to this year")]
    start_year: Option<i32>,
    #[arg(long, default_value_t = 24)]
    current_age: u32,
    #[arg(long, default_value_t = 45_000.0, help = "Current annual salary")]
    current_salary: f64,
    #[arg(long, default_value_t = 3.0, help = "Annual salary growth in percent")]
    salary_growth: f64,
    #[arg(long, default_value_t = 25.0, help = "Share of salary saved in percent")]
    savings_rate: f64,
    #[arg(long, default_value_t = 7_000.0)]
    current_portfolio: f64,
    #[arg(
        long,
        default_value_t = 6.0,
        help = "Investment return before retirement in percent"
    )]
    pre_retirement_return: f64,
    #[arg(
        long,
        default_value_t = 5.0,
        help = "Investment return after retirement in percent"
    )]
    post_retirement_return: f64,
    #[arg(long, default_value_t = 2.0, help = "Inflation in percent")]
    inflation: f64,
    #[arg(long, default_value_t = 4.0, help = "Safe withdrawal rate in percent")]
    safe_withdrawal_rate: f64,
    #[arg(long, default_value_t = 20.0, help = "Withdrawal tax drag in percent")]
    tax_drag: f64,
    #[arg(
        long,
        default_value_t = 7_000.0,
        help = "Annual pension from age 65 in today's money"
    )]
    pension: f64,
    #[arg(
        long,
        default_value_t = 10_000.0,
        help = "Desired annual spending in today's money"
    )]
    desired_spending: f64,
    #[arg(long, default_value_t = 35)]
    target_retirement_age: u32,
    #[arg(
        long,
        default_value_t = 5_000_000.0,
        help = "Nest-egg target in today's money, used by the goal-seek"
    )]
    nest_egg_target: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ScenarioPayload {
    start_year: Option<i32>,
    current_age: Option<u32>,
    current_salary: Option<f64>,
    salary_growth: Option<f64>,
    savings_rate: Option<f64>,
    current_portfolio: Option<f64>,
    pre_retirement_return: Option<f64>,
    post_retirement_return: Option<f64>,
    inflation: Option<f64>,
    safe_withdrawal_rate: Option<f64>,
    tax_drag: Option<f64>,
    pension: Option<f64>,
    desired_spending: Option<f64>,
    target_retirement_age: Option<u32>,
    nest_egg_target: Option<f64>,

    solve_for: Option<ApiGoalVariable>,
}

#[derive(Debug)]
struct ApiRequest {
    params: ScenarioParameters,
    solve_for: CliGoalVariable,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    projection_years: usize,
    first_retirement_index: Option<usize>,
    retirement: Option<RetirementSummary>,
    message: String,
    rows: Vec<ProjectionRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SolveResponse {
    variable: GoalVariable,
    target_retirement_age: u32,
    nest_egg_target: f64,
    solved_value: f64,
    solved_percent: f64,
    achieved_real_portfolio: f64,
    converged: bool,
    message: String,
    iterations: Vec<GoalSolveIteration>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    status: u16,
}

fn check_range(name: &str, value: f64, min: f64, max: f64) -> Result<(), ApiError> {
    if !value.is_finite() || value < min || value > max {
        return Err(ApiError::InvalidInput(format!(
            "{name} must be between {min} and {max}"
        )));
    }
    Ok(())
}

fn build_params(args: ScenarioArgs) -> Result<ScenarioParameters, ApiError> {
    if !(18..=99).contains(&args.current_age) {
        return Err(ApiError::InvalidInput(
            "--current-age must be between 18 and 99".to_string(),
        ));
    }

    if args.target_retirement_age <= args.current_age || args.target_retirement_age > 99 {
        return Err(ApiError::InvalidInput(
            "--target-retirement-age must be > --current-age and <= 99".to_string(),
        ));
    }

    for (name, value, min, max) in [
        ("--current-salary", args.current_salary, 0.0, 1e9),
        ("--current-portfolio", args.current_portfolio, 0.0, 1e9),
        ("--salary-growth", args.salary_growth, 0.0, 30.0),
        ("--savings-rate", args.savings_rate, 0.0, 100.0),
        ("--pre-retirement-return", args.pre_retirement_return, 0.0, 30.0),
        (
            "--post-retirement-return",
            args.post_retirement_return,
            0.0,
            30.0,
        ),
        ("--inflation", args.inflation, 0.0, 20.0),
        ("--safe-withdrawal-rate", args.safe_withdrawal_rate, 2.0, 10.0),
        ("--tax-drag", args.tax_drag, 0.0, 50.0),
        ("--pension", args.pension, 0.0, 100_000.0),
        ("--desired-spending", args.desired_spending, 0.0, 1e7),
        ("--nest-egg-target", args.nest_egg_target, 0.0, 1e9),
    ] {
        check_range(name, value, min, max)?;
    }

    Ok(ScenarioParameters {
        start_year: args
            .start_year
            .unwrap_or_else(|| chrono::Local::now().year()),
        current_age: args.current_age,
        current_salary: args.current_salary,
        salary_growth_rate: args.salary_growth / 100.0,
        savings_rate: args.savings_rate / 100.0,
        current_portfolio: args.current_portfolio,
        pre_retirement_return: args.pre_retirement_return / 100.0,
        post_retirement_return: args.post_retirement_return / 100.0,
        inflation_rate: args.inflation / 100.0,
        safe_withdrawal_rate: args.safe_withdrawal_rate / 100.0,
        tax_drag_rate: args.tax_drag / 100.0,
        pension_annual_amount: args.pension,
        desired_annual_spending: args.desired_spending,
        target_retirement_age: args.target_retirement_age,
        nest_egg_target: args.nest_egg_target,
    })
}

pub fn run_project_command(args: ScenarioArgs, json: bool) -> Result<String, ApiError> {
    let params = build_params(args)?;
    let projection = project(&params);
    if json {
        let response = build_project_response(&projection);
        return Ok(serde_json::to_string_pretty(&response)?);
    }
    Ok(format!(
        "{}\n\n{}",
        retirement_message(&projection),
        render_projection_table(&projection)
    ))
}

pub fn run_solve_command(
    args: ScenarioArgs,
    solve_for: CliGoalVariable,
    json: bool,
) -> Result<String, ApiError> {
    let params = build_params(args)?;
    let solution = solve_goal(&params, solve_for.into())?;
    if !solution.converged {
        warn!(
            variable = solution.variable.label(),
            "goal-seek hit the iteration limit; reporting best estimate"
        );
    }
    if json {
        let response = build_solve_response(&params, &solution);
        return Ok(serde_json::to_string_pretty(&response)?);
    }
    Ok(solve_message(&solution))
}

pub async fn run_http_server(port: u16) -> Result<(), ApiError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/solve",
            get(solve_get_handler).post(solve_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "FIRE planner API listening");
    info!("Local access: http://127.0.0.1:{port}/api/project");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(Query(payload): Query<ScenarioPayload>) -> Response {
    project_handler_impl(payload)
}

async fn project_post_handler(Json(payload): Json<ScenarioPayload>) -> Response {
    project_handler_impl(payload)
}

async fn solve_get_handler(Query(payload): Query<ScenarioPayload>) -> Response {
    solve_handler_impl(payload)
}

async fn solve_post_handler(Json(payload): Json<ScenarioPayload>) -> Response {
    solve_handler_impl(payload)
}

fn project_handler_impl(payload: ScenarioPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    let projection = project(&request.params);
    info!(
        current_age = request.params.current_age,
        first_retirement_index = ?projection.first_retirement_index,
        "projection served"
    );
    json_response(StatusCode::OK, build_project_response(&projection))
}

fn solve_handler_impl(payload: ScenarioPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(err) => return err.into_response(),
    };

    match solve_goal(&request.params, request.solve_for.into()) {
        Ok(solution) => {
            info!(
                variable = solution.variable.label(),
                solved_value = solution.solved_value,
                converged = solution.converged,
                "goal-seek served"
            );
            json_response(
                StatusCode::OK,
                build_solve_response(&request.params, &solution),
            )
        }
        Err(err) => {
            info!(%err, "goal-seek target unreachable");
            ApiError::from(err).into_response()
        }
    }
}

fn with_cache_control(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)).into_response())
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
            status: status.as_u16(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, ApiError> {
    let payload = serde_json::from_str::<ScenarioPayload>(json)?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ScenarioPayload) -> Result<ApiRequest, ApiError> {
    let mut args = default_scenario_args();
    let mut solve_for = CliGoalVariable::SavingsRate;

    if let Some(v) = payload.start_year {
        args.start_year = Some(v);
    }
    if let Some(v) = payload.current_age {
        args.current_age = v;
    }
    if let Some(v) = payload.current_salary {
        args.current_salary = v;
    }
    if let Some(v) = payload.salary_growth {
        args.salary_growth = v;
    }
    if let Some(v) = payload.savings_rate {
        args.savings_rate = v;
    }
    if let Some(v) = payload.current_portfolio {
        args.current_portfolio = v;
    }
    if let Some(v) = payload.pre_retirement_return {
        args.pre_retirement_return = v;
    }
    if let Some(v) = payload.post_retirement_return {
        args.post_retirement_return = v;
    }
    if let Some(v) = payload.inflation {
        args.inflation = v;
    }
    if let Some(v) = payload.safe_withdrawal_rate {
        args.safe_withdrawal_rate = v;
    }
    if let Some(v) = payload.tax_drag {
        args.tax_drag = v;
    }
    if let Some(v) = payload.pension {
        args.pension = v;
    }
    if let Some(v) = payload.desired_spending {
        args.desired_spending = v;
    }
    if let Some(v) = payload.target_retirement_age {
        args.target_retirement_age = v;
    }
    if let Some(v) = payload.nest_egg_target {
        args.nest_egg_target = v;
    }

    if let Some(v) = payload.solve_for {
        solve_for = v.into();
    }

    let params = build_params(args)?;
    Ok(ApiRequest { params, solve_for })
}

fn default_scenario_args() -> ScenarioArgs {
    ScenarioArgs {
        start_year: None,
        current_age: 24,
        current_salary: 45_000.0,
        salary_growth: 3.0,
        savings_rate: 25.0,
        current_portfolio: 7_000.0,
        pre_retirement_return: 6.0,
        post_retirement_return: 5.0,
        inflation: 2.0,
        safe_withdrawal_rate: 4.0,
        tax_drag: 20.0,
        pension: 7_000.0,
        desired_spending: 10_000.0,
        target_retirement_age: 35,
        nest_egg_target: 5_000_000.0,
    }
}

fn build_project_response(projection: &ProjectionResult) -> ProjectResponse {
    ProjectResponse {
        projection_years: projection.rows.len(),
        first_retirement_index: projection.first_retirement_index,
        retirement: projection.retirement_summary(),
        message: retirement_message(projection),
        rows: projection.rows.clone(),
    }
}

fn build_solve_response(params: &ScenarioParameters, solution: &GoalSolution) -> SolveResponse {
    SolveResponse {
        variable: solution.variable,
        target_retirement_age: params.target_retirement_age,
        nest_egg_target: params.nest_egg_target,
        solved_value: solution.solved_value,
        solved_percent: solution.solved_value * 100.0,
        achieved_real_portfolio: solution.achieved_real_portfolio,
        converged: solution.converged,
        message: solve_message(solution),
        iterations: solution.iterations.clone(),
    }
}

fn retirement_message(projection: &ProjectionResult) -> String {
    match projection.retirement_summary() {
        Some(summary) => format!(
            "You can retire in {} at age {} with a real portfolio of {} ({} years from now, nominal portfolio {})",
            summary.year,
            summary.age,
            format_amount(summary.real_portfolio_value),
            summary.years_until_retirement,
            format_amount(summary.nominal_portfolio_value),
        ),
        None => format!(
            "The portfolio never meets the criteria within {PROJECTION_YEARS} years."
        ),
    }
}

fn solve_message(solution: &GoalSolution) -> String {
    format!(
        "Required {} ≈ {:.2} %",
        solution.variable.label(),
        solution.solved_value * 100.0
    )
}

fn render_projection_table(projection: &ProjectionResult) -> String {
    let mut out = format!(
        "{:>6} {:>4} {:>14} {:>12} {:>16} {:>16} {:>15} {:>11}\n",
        "Year",
        "Age",
        "Salary",
        "Savings",
        "Portfolio",
        "Real Portfolio",
        "Real Withdrawal",
        "Can Retire?"
    );
    for row in &projection.rows {
        out.push_str(&format!(
            "{:>6} {:>4} {:>14} {:>12} {:>16} {:>16} {:>15} {:>11}\n",
            row.year,
            row.age,
            format_amount(row.nominal_salary),
            format_amount(row.nominal_savings_contribution),
            format_amount(row.nominal_portfolio_value),
            format_amount(row.real_portfolio_value),
            format_amount(row.real_sustainable_withdrawal),
            if row.can_retire { "YES" } else { "" },
        ));
    }
    out
}

/// Whole units with thousands separators, e.g. `1,234,568`.
fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let rounded = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(rounded.len() + rounded.len() / 3);
    for (i, ch) in rounded.chars().enumerate() {
        if i > 0 && (rounded.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if value < 0.0 && rounded != "0" {
        format!("-{grouped}")
    } else {
        grouped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_args() -> ScenarioArgs {
        let mut args = default_scenario_args();
        args.start_year = Some(2025);
        args
    }

    #[test]
    fn build_params_converts_percent_inputs_to_fractions() {
        let params = build_params(sample_args()).expect("valid inputs");
        assert_eq!(params.start_year, 2025);
        assert_eq!(params.current_age, 24);
        assert_approx(params.salary_growth_rate, 0.03);
        assert_approx(params.savings_rate, 0.25);
        assert_approx(params.pre_retirement_return, 0.06);
        assert_approx(params.post_retirement_return, 0.05);
        assert_approx(params.inflation_rate, 0.02);
        assert_approx(params.safe_withdrawal_rate, 0.04);
        assert_approx(params.tax_drag_rate, 0.20);
        assert_approx(params.pension_annual_amount, 7_000.0);
        assert_approx(params.nest_egg_target, 5_000_000.0);
    }

    #[test]
    fn build_params_defaults_start_year_to_current_year() {
        let mut args = sample_args();
        args.start_year = None;
        let params = build_params(args).expect("valid inputs");
        assert_eq!(params.start_year, chrono::Local::now().year());
    }

    #[test]
    fn build_params_rejects_target_age_not_after_current_age() {
        let mut args = sample_args();
        args.target_retirement_age = args.current_age;
        let err = build_params(args).expect_err("must reject target age");
        assert!(matches!(err, ApiError::InvalidInput(_)));
        assert!(err.to_string().contains("--target-retirement-age"));
    }

    #[test]
    fn build_params_rejects_out_of_range_rates() {
        let mut args = sample_args();
        args.safe_withdrawal_rate = 1.0;
        let err = build_params(args).expect_err("must reject swr");
        assert!(err.to_string().contains("--safe-withdrawal-rate"));

        let mut args = sample_args();
        args.savings_rate = f64::NAN;
        let err = build_params(args).expect_err("must reject NaN");
        assert!(err.to_string().contains("--savings-rate"));

        let mut args = sample_args();
        args.current_age = 17;
        let err = build_params(args).expect_err("must reject age");
        assert!(err.to_string().contains("--current-age"));
    }

    #[test]
    fn api_request_from_json_parses_web_keys() {
        let json = r#"{
          "startYear": 2030,
          "currentAge": 30,
          "currentSalary": 80000,
          "salaryGrowth": 4,
          "savingsRate": 40,
          "currentPortfolio": 25000,
          "preRetirementReturn": 7,
          "postRetirementReturn": 4,
          "inflation": 2.5,
          "safeWithdrawalRate": 3.5,
          "taxDrag": 15,
          "pension": 9000,
          "desiredSpending": 40000,
          "targetRetirementAge": 50,
          "nestEggTarget": 1000000,
          "solveFor": "pre-ret-return"
        }"#;
        let request = api_request_from_json(json).expect("json should parse");
        let params = request.params;

        assert_eq!(params.start_year, 2030);
        assert_eq!(params.current_age, 30);
        assert_approx(params.current_salary, 80_000.0);
        assert_approx(params.salary_growth_rate, 0.04);
        assert_approx(params.savings_rate, 0.40);
        assert_approx(params.current_portfolio, 25_000.0);
        assert_approx(params.pre_retirement_return, 0.07);
        assert_approx(params.post_retirement_return, 0.04);
        assert_approx(params.inflation_rate, 0.025);
        assert_approx(params.safe_withdrawal_rate, 0.035);
        assert_approx(params.tax_drag_rate, 0.15);
        assert_approx(params.pension_annual_amount, 9_000.0);
        assert_approx(params.desired_annual_spending, 40_000.0);
        assert_eq!(params.target_retirement_age, 50);
        assert_approx(params.nest_egg_target, 1_000_000.0);
        assert_eq!(request.solve_for, CliGoalVariable::PreRetReturn);
    }

    #[test]
    fn api_request_from_json_accepts_camel_case_goal_alias() {
        let request =
            api_request_from_json(r#"{"solveFor": "salaryGrowth"}"#).expect("json should parse");
        assert_eq!(request.solve_for, CliGoalVariable::SalaryGrowth);
        assert_eq!(request.params.current_age, 24);
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let params = build_params(sample_args()).expect("valid inputs");
        let projection = project(&params);
        let response = build_project_response(&projection);
        assert_eq!(response.projection_years, PROJECTION_YEARS);
        assert_eq!(response.first_retirement_index, Some(18));

        let json = serde_json::to_string(&response).expect("response should serialize");
        assert!(json.contains("\"firstRetirementIndex\":18"));
        assert!(json.contains("\"retirement\""));
        assert!(json.contains("\"yearsUntilRetirement\":18"));
        assert!(json.contains("\"realPortfolioValue\""));
        assert!(json.contains("\"realSustainableWithdrawal\""));
        assert!(json.contains("\"canRetire\""));
        assert!(json.contains("You can retire in 2043 at age 42"));
    }

    #[test]
    fn project_handler_returns_ok_and_no_store() {
        let payload = ScenarioPayload {
            start_year: Some(2025),
            ..ScenarioPayload::default()
        };
        let response = project_handler_impl(payload);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CACHE_CONTROL)
                .and_then(|v| v.to_str().ok()),
            Some("no-store")
        );
    }

    #[test]
    fn project_handler_rejects_invalid_input() {
        let payload = ScenarioPayload {
            current_age: Some(40),
            target_retirement_age: Some(35),
            ..ScenarioPayload::default()
        };
        let response = project_handler_impl(payload);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn solve_handler_reports_unreachable_as_unprocessable() {
        let payload = ScenarioPayload {
            start_year: Some(2025),
            target_retirement_age: Some(25),
            nest_egg_target: Some(1e9),
            ..ScenarioPayload::default()
        };
        let response = solve_handler_impl(payload);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn solve_handler_returns_solution() {
        let payload = ScenarioPayload {
            start_year: Some(2025),
            nest_egg_target: Some(300_000.0),
            solve_for: Some(ApiGoalVariable::SalaryGrowth),
            ..ScenarioPayload::default()
        };
        let response = solve_handler_impl(payload);
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn solve_command_prints_required_percent() {
        let mut args = sample_args();
        args.nest_egg_target = 300_000.0;
        let out = run_solve_command(args, CliGoalVariable::SavingsRate, false).expect("solves");
        assert_eq!(out, "Required savings rate ≈ 45.29 %");
    }

    #[test]
    fn solve_command_json_includes_iterations() {
        let mut args = sample_args();
        args.nest_egg_target = 300_000.0;
        let out = run_solve_command(args, CliGoalVariable::PreRetReturn, true).expect("solves");
        let value: serde_json::Value = serde_json::from_str(&out).expect("valid json");
        assert_eq!(value["variable"], "pre-retirement-return");
        assert_eq!(value["converged"], true);
        assert!(value["iterations"].as_array().is_some_and(|it| !it.is_empty()));
        let percent = value["solvedPercent"].as_f64().expect("number");
        assert!((percent - 16.21).abs() < 0.01);
    }

    #[test]
    fn solve_command_surfaces_unreachable_error() {
        let mut args = sample_args();
        args.target_retirement_age = 25;
        args.nest_egg_target = 1e9;
        let err = run_solve_command(args, CliGoalVariable::SavingsRate, false)
            .expect_err("must be unreachable");
        assert!(matches!(
            err,
            ApiError::Solve(SolveError::TargetUnreachable { .. })
        ));
        assert!(err.to_string().contains("target unaffordable"));
    }

    #[test]
    fn project_command_renders_table_with_banner() {
        let out = run_project_command(sample_args(), false).expect("projects");
        let mut lines = out.lines();
        let banner = lines.next().expect("banner");
        assert!(banner.starts_with("You can retire in 2043 at age 42"));
        assert!(out.contains("Real Withdrawal"));
        // Banner, blank line, header, 80 rows.
        assert_eq!(out.lines().count(), 3 + PROJECTION_YEARS);
        assert_eq!(out.matches("YES").count(), 62);
    }

    #[test]
    fn project_command_reports_horizon_exhaustion() {
        let mut args = sample_args();
        args.desired_spending = 10_000_000.0;
        args.pension = 0.0;
        let out = run_project_command(args, false).expect("projects");
        assert!(out.starts_with("The portfolio never meets the criteria within 80 years."));
    }

    #[test]
    fn format_amount_groups_thousands() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.4), "999");
        assert_eq!(format_amount(1_000.0), "1,000");
        assert_eq!(format_amount(1_234_567.8), "1,234,568");
        assert_eq!(format_amount(-45_000.0), "-45,000");
    }

    #[test]
    fn cli_parses_solve_subcommand_with_percent_flags() {
        let cli = Cli::try_parse_from([
            "fire-planner",
            "solve",
            "--solve-for",
            "salary-growth",
            "--savings-rate",
            "30",
            "--nest-egg-target",
            "250000",
        ])
        .expect("cli should parse");
        match cli.command {
            Command::Solve {
                scenario,
                solve_for,
                json,
            } => {
                assert_eq!(solve_for, CliGoalVariable::SalaryGrowth);
                assert!(!json);
                assert_approx(scenario.savings_rate, 30.0);
                assert_approx(scenario.nest_egg_target, 250_000.0);
                assert_eq!(scenario.current_age, 24);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
