use std::{future::Future, process};

use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;
use transgate::{
    application::error::AppError,
    config,
    infra::{
        bootstrap,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};

#[tokio::main]
async fn main() {
    match run().await {
        Ok(code) => {
            if code != 0 {
                process::exit(code);
            }
        }
        Err(error) => {
            report_application_error(&error);
            process::exit(1);
        }
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<i32, AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await.map(|()| 0),
        config::Command::Probe(_) => run_probe(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let gateway = bootstrap::start_gateway(&settings).await;
    let router = http::build_router(
        ApiState::from(&gateway),
        settings.server.max_request_bytes.get() as usize,
    );

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "transgate::server",
        addr = %settings.server.addr,
        ready = gateway.is_ready(),
        "listening"
    );

    let served = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)));

    let grace = settings.server.graceful_shutdown;
    if tokio::time::timeout(grace, gateway.shutdown()).await.is_err() {
        warn!(
            target = "transgate::server",
            grace_seconds = grace.as_secs(),
            "backend shutdown exceeded the grace period"
        );
    }

    served
}

/// Start backend and cache once, print the health report, report readiness via exit code.
async fn run_probe(settings: config::Settings) -> Result<i32, AppError> {
    let gateway = bootstrap::start_gateway(&settings).await;
    let report = gateway.health().report().await;
    let ready = report.model_loaded;
    let body = serde_json::to_string_pretty(&http::api::handlers::health_response(report))
        .map_err(|err| AppError::unexpected(format!("failed to encode health report: {err}")))?;
    println!("{body}");

    gateway.shutdown().await;
    Ok(if ready { 0 } else { 2 })
}

fn shutdown_signal() -> impl Future<Output = ()> {
    async {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(target = "transgate::server", error = %err, "ctrl-c handler failed");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(err) => {
                    error!(target = "transgate::server", error = %err, "SIGTERM handler failed");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }
        info!(target = "transgate::server", "shutdown signal received");
    }
}
