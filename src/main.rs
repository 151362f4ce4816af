use clap::Parser;
use fire_planner::api::{
    ApiError, Cli, Command, run_http_server, run_project_command, run_solve_command,
};
use fire_planner::core::SolveError;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("FIRE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    let outcome = match cli.command {
        Command::Project { scenario, json } => run_project_command(scenario, json).map(Some),
        Command::Solve {
            scenario,
            solve_for,
            json,
        } => run_solve_command(scenario, solve_for, json).map(Some),
        Command::Serve { port } => run_http_server(port).await.map(|()| None),
    };

    match outcome {
        Ok(Some(output)) => println!("{output}"),
        Ok(None) => {}
        Err(ApiError::Solve(err @ SolveError::TargetUnreachable { .. })) => {
            eprintln!("Target unaffordable even with extreme settings. ({err})");
            std::process::exit(2);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}
