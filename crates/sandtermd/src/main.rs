use std::{process::ExitCode, sync::Arc};

use clap::Parser;
use sandterm_core::SANDBOX_POLICY;
use sandterm_docker::DockerLauncher;
use sandterm_platform::SandboxLauncher;
use sandterm_transport::serve;
use sandtermd::{Args, GatewayConfig, SessionDispatcher};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("sandtermd error: {err}");
            ExitCode::from(1)
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = GatewayConfig::from(Args::parse());
    let listener = TcpListener::bind(config.listen).await?;

    info!(
        listen = %listener.local_addr()?,
        shell = %config.launch.shell_path.display(),
        runtime = %config.launch.runtime_path.display(),
        image = %config.launch.image,
        memory_mib = SANDBOX_POLICY.memory_mib,
        cpus = SANDBOX_POLICY.cpus,
        pids_limit = SANDBOX_POLICY.pids_limit,
        version = env!("CARGO_PKG_VERSION"),
        "starting sandtermd"
    );

    let launcher: Arc<dyn SandboxLauncher> = Arc::new(DockerLauncher::new(config.launch));
    serve(
        listener,
        Arc::new(SessionDispatcher::from(launcher)),
        shutdown_signal(),
    )
    .await?;

    info!("sandtermd stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %err, "ctrl-c handler unavailable");
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
                tracing::warn!(error = %err, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    info!("shutdown requested");
}
