use tracing::debug;

use super::engine::project;
use super::types::{
    GoalSolution, GoalSolveConfig, GoalSolveIteration, GoalVariable, ScenarioParameters,
    SolveError,
};

pub fn solve_goal(
    params: &ScenarioParameters,
    variable: GoalVariable,
) -> Result<GoalSolution, SolveError> {
    solve_goal_with_config(params, variable, GoalSolveConfig::default())
}

/// Finds the value of `variable` at which the real portfolio at the target
/// retirement age equals the nest-egg target, holding every other input fixed.
///
/// Uses Brent's method over the variable's fixed bounds. The bounds must
/// bracket a sign change of the gap, otherwise the target is unreachable.
pub fn solve_goal_with_config(
    params: &ScenarioParameters,
    variable: GoalVariable,
    config: GoalSolveConfig,
) -> Result<GoalSolution, SolveError> {
    validate_config(config)?;

    let (search_min, search_max) = variable.bounds();
    let mut trial = params.clone();
    let mut gap = |value: f64| gap_to_target(&mut trial, variable, value);

    let gap_at_low = gap(search_min);
    let gap_at_high = gap(search_max);
    debug!(
        variable = variable.label(),
        gap_at_low, gap_at_high, "goal-seek bracket evaluated"
    );

    let bracketed = gap_at_low * gap_at_high <= 0.0;
    if !bracketed {
        return Err(SolveError::TargetUnreachable {
            variable,
            gap_at_low,
            gap_at_high,
        });
    }

    let mut iterations = Vec::with_capacity(config.max_iterations as usize);
    let (solved_value, converged) = if gap_at_low == 0.0 {
        (search_min, true)
    } else if gap_at_high == 0.0 {
        (search_max, true)
    } else {
        brent_root(
            &mut gap,
            (search_min, gap_at_low),
            (search_max, gap_at_high),
            config,
            &mut iterations,
        )
    };

    let residual_gap = gap(solved_value);
    debug!(
        variable = variable.label(),
        solved_value,
        residual_gap,
        iterations = iterations.len(),
        converged,
        "goal-seek finished"
    );

    Ok(GoalSolution {
        variable,
        solved_value,
        achieved_real_portfolio: residual_gap + params.nest_egg_target,
        residual_gap,
        search_min,
        search_max,
        iterations,
        converged,
    })
}

fn gap_to_target(trial: &mut ScenarioParameters, variable: GoalVariable, value: f64) -> f64 {
    variable.apply(trial, value);
    let projection = project(trial);
    projection.real_portfolio_at_age(trial.target_retirement_age as f64) - trial.nest_egg_target
}

/// Brent's bracketing root finder. `low` and `high` are `(x, f(x))` pairs with
/// opposite, non-zero signs. Returns the best estimate and whether it converged.
fn brent_root<F>(
    f: &mut F,
    low: (f64, f64),
    high: (f64, f64),
    config: GoalSolveConfig,
    iterations: &mut Vec<GoalSolveIteration>,
) -> (f64, bool)
where
    F: FnMut(f64) -> f64,
{
    let (mut x_pre, mut f_pre) = low;
    let (mut x_cur, mut f_cur) = high;
    let (mut x_blk, mut f_blk) = (0.0, 0.0);
    let mut s_pre = 0.0;
    let mut s_cur = 0.0;

    for it in 1..=config.max_iterations {
        if f_pre * f_cur < 0.0 {
            x_blk = x_pre;
            f_blk = f_pre;
            s_pre = x_cur - x_pre;
            s_cur = s_pre;
        }
        // Keep the best estimate in x_cur.
        if f_blk.abs() < f_cur.abs() {
            x_pre = x_cur;
            x_cur = x_blk;
            x_blk = x_pre;
            f_pre = f_cur;
            f_cur = f_blk;
            f_blk = f_pre;
        }

        let delta = (config.x_tolerance + config.relative_tolerance * x_cur.abs()) / 2.0;
        let s_bis = (x_blk - x_cur) / 2.0;
        if f_cur == 0.0 || s_bis.abs() < delta {
            return (x_cur, true);
        }

        if s_pre.abs() > delta && f_cur.abs() < f_pre.abs() {
            let s_try = if x_pre == x_blk {
                // secant
                -f_cur * (x_cur - x_pre) / (f_cur - f_pre)
            } else {
                // inverse quadratic
                let d_pre = (f_pre - f_cur) / (x_pre - x_cur);
                let d_blk = (f_blk - f_cur) / (x_blk - x_cur);
                -f_cur * (f_blk * d_blk - f_pre * d_pre) / (d_blk * d_pre * (f_blk - f_pre))
            };
            if 2.0 * s_try.abs() < s_pre.abs().min(3.0 * s_bis.abs() - delta) {
                s_pre = s_cur;
                s_cur = s_try;
            } else {
                s_pre = s_bis;
                s_cur = s_bis;
            }
        } else {
            s_pre = s_bis;
            s_cur = s_bis;
        }

        x_pre = x_cur;
        f_pre = f_cur;
        if s_cur.abs() > delta {
            x_cur += s_cur;
        } else {
            x_cur += if s_bis > 0.0 { delta } else { -delta };
        }
        f_cur = f(x_cur);

        iterations.push(GoalSolveIteration {
            iteration: it,
            lower_bound: x_pre.min(x_blk),
            upper_bound: x_pre.max(x_blk),
            candidate_value: x_cur,
            gap: f_cur,
        });
    }

    (x_cur, false)
}

fn validate_config(config: GoalSolveConfig) -> Result<(), SolveError> {
    if !config.x_tolerance.is_finite() || config.x_tolerance <= 0.0 {
        return Err(SolveError::InvalidConfig(
            "x_tolerance must be > 0".to_string(),
        ));
    }
    if !config.relative_tolerance.is_finite() || config.relative_tolerance < 0.0 {
        return Err(SolveError::InvalidConfig(
            "relative_tolerance must be >= 0".to_string(),
        ));
    }
    if config.max_iterations == 0 {
        return Err(SolveError::InvalidConfig(
            "max_iterations must be > 0".to_string(),
        ));
    }
    Ok(())
}
