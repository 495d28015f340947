use std::net::SocketAddr;
use std::path::PathBuf;

use axum::{
    Router,
    extract::Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::core::{Profile, ProfileError, compute_scenarios, run_monte_carlo};

#[derive(Parser, Debug)]
#[command(
    name = "nestegg",
    about = "Retirement projection and Monte Carlo engine (mandatory distributions + inherited accounts)"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run a one-off projection for a profile JSON file and print the result.
    Project {
        #[arg(long, help = "Path to a profile JSON file")]
        profile: PathBuf,
        #[arg(long, help = "Run the Monte Carlo simulation instead of the deterministic scenarios")]
        monte_carlo: bool,
    },
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub async fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Serve { port } => run_http_server(port)
            .await
            .map_err(|e| format!("server error: {e}")),
        Command::Project {
            profile,
            monte_carlo,
        } => {
            let output = run_projection_command(&profile, monte_carlo)?;
            println!("{output}");
            Ok(())
        }
    }
}

fn run_projection_command(path: &PathBuf, monte_carlo: bool) -> Result<String, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    let profile: Profile =
        serde_json::from_str(&raw).map_err(|e| format!("invalid profile JSON: {e}"))?;

    if monte_carlo {
        let result = run_monte_carlo(&profile).map_err(|e| e.to_string())?;
        serde_json::to_string_pretty(&result).map_err(|e| e.to_string())
    } else {
        let results = compute_scenarios(&profile).map_err(|e| e.to_string())?;
        serde_json::to_string_pretty(&results).map_err(|e| e.to_string())
    }
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/api/health", get(health_handler))
        .route("/api/scenarios", post(scenarios_handler))
        .route("/api/monte-carlo", post(monte_carlo_handler))
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    println!("nestegg HTTP API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn health_handler() -> Response {
    json_response(StatusCode::OK, serde_json::json!({ "status": "ok" }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn scenarios_handler(Json(profile): Json<Profile>) -> Response {
    match compute_scenarios(&profile) {
        Ok(results) => json_response(StatusCode::OK, results),
        Err(e) => profile_error_response(e),
    }
}

async fn monte_carlo_handler(Json(profile): Json<Profile>) -> Response {
    match run_monte_carlo(&profile) {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(e) => profile_error_response(e),
    }
}

fn profile_error_response(error: ProfileError) -> Response {
    error_response(StatusCode::BAD_REQUEST, &error.to_string())
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{GuaranteedIncome, InheritedAccount, InheritedStrategy};
    use std::fs;

    fn sample_profile() -> Profile {
        Profile {
            current_age: 45,
            retirement_age: 65,
            life_expectancy: 90,
            pre_tax_balance: 400_000.0,
            roth_balance: 80_000.0,
            pre_tax_contribution: 20_000.0,
            annual_expenses: 55_000.0,
            social_security: Some(GuaranteedIncome {
                amount: 28_000.0,
                start_age: 67,
                cola_rate: 0.02,
            }),
            inherited: Some(InheritedAccount {
                balance: 60_000.0,
                year_inherited: 2024,
                strategy: InheritedStrategy::SpreadEvenly,
                beneficiary_age: Some(44),
                owner_rmd_started: false,
            }),
            monte_carlo_runs: 32,
            seed: Some(3),
            ..Profile::default()
        }
    }

    #[test]
    fn cli_parses_serve_with_port() {
        let cli = Cli::try_parse_from(["nestegg", "serve", "--port", "9000"]).expect("parses");
        assert!(matches!(cli.command, Command::Serve { port: 9000 }));
    }

    #[test]
    fn cli_parses_project_with_monte_carlo_flag() {
        let cli = Cli::try_parse_from([
            "nestegg",
            "project",
            "--profile",
            "profile.json",
            "--monte-carlo",
        ])
        .expect("parses");
        match cli.command {
            Command::Project {
                profile,
                monte_carlo,
            } => {
                assert_eq!(profile, PathBuf::from("profile.json"));
                assert!(monte_carlo);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn scenario_response_serializes_with_camel_case_keys() {
        let results = compute_scenarios(&sample_profile()).expect("valid profile");
        let json = serde_json::to_string(&results).expect("serializes");
        assert!(json.contains("\"expected\""));
        assert!(json.contains("\"optimistic\""));
        assert!(json.contains("\"pessimistic\""));
        assert!(json.contains("\"balanceAtRetirement\""));
        assert!(json.contains("\"yearsMoneyLasts\""));
        assert!(json.contains("\"inheritedDistribution\""));
        assert!(json.contains("\"startingBalance\""));
    }

    #[test]
    fn monte_carlo_response_serializes_with_camel_case_keys() {
        let result = run_monte_carlo(&sample_profile()).expect("valid profile");
        let json = serde_json::to_string(&result).expect("serializes");
        assert!(json.contains("\"successRate\""));
        assert!(json.contains("\"meanFinalBalance\""));
        assert!(json.contains("\"percentile10\""));
        assert!(json.contains("\"median\""));
        assert!(json.contains("\"warnings\""));
    }

    #[test]
    fn error_response_serializes_error_field() {
        let error = compute_scenarios(&Profile {
            current_age: 70,
            retirement_age: 65,
            ..Profile::default()
        })
        .expect_err("invalid profile");
        let body = ErrorResponse {
            error: error.to_string(),
        };
        let json = serde_json::to_string(&body).expect("serializes");
        assert!(json.contains("\"error\""));
        assert!(json.contains("retirementAge"));
    }

    #[test]
    fn project_command_reads_profile_and_prints_scenarios() {
        let dir = std::env::temp_dir().join("nestegg-api-test");
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("profile.json");
        fs::write(
            &path,
            serde_json::to_string(&sample_profile()).expect("serializes"),
        )
        .expect("write profile");

        let output = run_projection_command(&path, false).expect("projection runs");
        assert!(output.contains("\"expected\""));

        let output = run_projection_command(&path, true).expect("monte carlo runs");
        assert!(output.contains("\"successRate\""));
    }

    #[test]
    fn project_command_reports_invalid_json() {
        let dir = std::env::temp_dir().join("nestegg-api-test");
        fs::create_dir_all(&dir).expect("temp dir");
        let path = dir.join("broken.json");
        fs::write(&path, "{ not json").expect("write file");

        let err = run_projection_command(&path, false).expect_err("must fail");
        assert!(err.contains("invalid profile JSON"));
    }
}
