mod engine;
mod solver;
mod types;

pub use engine::project;
pub use solver::{solve_goal, solve_goal_with_config};
pub use types::{
    GoalSolution, GoalSolveConfig, GoalSolveIteration, GoalVariable, PENSION_START_AGE,
    PROJECTION_YEARS, ProjectionResult, ProjectionRow, RetirementSummary, ScenarioParameters,
    SolveError,
};
