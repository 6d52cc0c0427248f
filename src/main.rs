//! User API (v1)
//!
//! A CRUD service for users, assembled by a dependency-injection container
//! and served with Tokio, Hyper and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────┐
//!                     │                     USER API                      │
//!                     │                                                   │
//!   CLI (clap)        │   ┌────────┐   ┌───────────┐   ┌──────────────┐   │
//!   ──────────────────┼──▶│ config │──▶│ container │──▶│ HttpServer   │   │
//!   serve / migrate   │   └────────┘   └─────┬─────┘   └──────┬───────┘   │
//!   health / version  │                      │                │           │
//!                     │          resolves in │ order          │ dispatch  │
//!                     │                      ▼                ▼           │
//!   Client Request    │   ┌────────┐   ┌───────────┐   ┌──────────────┐   │
//!   ──────────────────┼──▶│  net   │──▶│  routing  │──▶│  handlers    │   │
//!                     │   │listener│   │   table   │   │ user, health │   │
//!                     │   └────────┘   └───────────┘   └──────┬───────┘   │
//!                     │                                       ▼           │
//!                     │                               ┌──────────────┐    │
//!                     │                               │  repository  │    │
//!                     │                               │ mem/postgres │    │
//!                     │                               └──────────────┘    │
//!                     │                                                   │
//!                     │   Cross-cutting: observability, lifecycle         │
//!                     └───────────────────────────────────────────────────┘
//! ```

use std::process::ExitCode;

use user_api::cli::{self, Cli};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse_args();

    match cli::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
