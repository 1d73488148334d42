//! `cellflow` -- command-line front end for the single-cell workflow service.
//!
//! Walks the same three steps as the web wizard (upload, select model,
//! configure), submits the job and follows it until it finishes.
//!
//! # Environment variables
//!
//! | Variable                        | Default                        | Description                    |
//! |---------------------------------|--------------------------------|--------------------------------|
//! | `CELLFLOW_API_URL`              | `http://localhost:8000/api/v1` | Service base URL               |
//! | `CELLFLOW_REQUEST_TIMEOUT_SECS` | `30`                           | Per-request timeout            |
//! | `CELLFLOW_POLL_INTERVAL_SECS`   | `2`                            | Seconds between status polls   |
//! | `RUST_LOG`                      | `cellflow=info,...`            | Log filter                     |
//!
//! Command-line flags take precedence over the environment.

mod args;
mod output;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cellflow_client::api::ServiceApi;
use cellflow_client::catalog::CatalogAgent;
use cellflow_client::config::ClientConfig;
use cellflow_client::poller::{PollConfig, PollEvent, StatusPoller};
use cellflow_client::submission::SubmissionController;
use cellflow_client::transfer::{TransferAgent, UploadFile};
use cellflow_core::workflow::WorkflowStatus;
use cellflow_core::wizard::{WizardAction, WizardState};

use args::{Cli, Cmd, JobArgs, ModelsArgs, RunArgs};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = client_config(&cli)?;
    let api = Arc::new(ServiceApi::new(&config)?);

    tracing::debug!(
        base_url = %config.base_url,
        poll_interval_secs = config.poll_interval.as_secs_f64(),
        "Client configured",
    );

    match &cli.cmd {
        Cmd::Run(run_args) => run(&api, &config, run_args, cli.json).await,
        Cmd::Watch(JobArgs { job_id }) => follow(&api, &config, job_id, cli.json).await,
        Cmd::Status(JobArgs { job_id }) => {
            let poller = StatusPoller::new(Arc::clone(&api), PollConfig::from(&config));
            let record = poller.fetch_once(job_id).await?;
            output::record(&record, cli.json);
            if record.status == WorkflowStatus::Completed {
                output::results(&api, job_id, &record, cli.json);
            }
            Ok(())
        }
        Cmd::List => {
            let records = api
                .list_workflows()
                .await
                .context("Failed to list workflows")?;
            output::workflows(&records, cli.json);
            Ok(())
        }
        Cmd::Models(ModelsArgs { model_type }) => {
            let mut agent = CatalogAgent::new(Arc::clone(&api));
            if let Some(model_type) = model_type {
                agent = agent.with_model_type(model_type.as_str());
            }
            let catalog = agent.list_compatible_models().await?;
            output::models(&catalog, cli.json);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "cellflow=info,cellflow_client=info".into());

    // Logs go to stderr so stdout stays parseable with `--json`.
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Environment configuration with command-line overrides applied.
fn client_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut config = ClientConfig::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config.base_url = api_url.clone();
    }
    if let Some(secs) = cli.request_timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.poll_interval_secs {
        config.poll_interval = Duration::from_secs(secs);
    }
    config.validate()?;
    Ok(config)
}

async fn run(
    api: &Arc<ServiceApi>,
    config: &ClientConfig,
    args: &RunArgs,
    json: bool,
) -> anyhow::Result<()> {
    let wizard = WizardState::new();

    // Step 1: upload.
    let file = UploadFile::from_path(&args.file).await?;
    let handle = TransferAgent::new(Arc::clone(api)).upload(file).await?;
    let wizard = wizard
        .apply(WizardAction::FileUploaded(handle))?
        .apply(WizardAction::Next)?;

    // Step 2: the model has to be one the service currently offers.
    let catalog = CatalogAgent::new(Arc::clone(api))
        .list_compatible_models()
        .await?;
    if catalog.is_empty() {
        bail!("The service offers no models compatible with single-cell workflows");
    }
    if !catalog.contains(args.model) {
        let offered: Vec<&str> = catalog.models().iter().map(|m| m.id.as_str()).collect();
        bail!(
            "Model '{}' is not offered by the service (available: {})",
            args.model,
            offered.join(", ")
        );
    }
    let wizard = wizard
        .apply(WizardAction::ModelSelected(args.model))?
        .apply(WizardAction::Next)?;

    // Step 3: configure and submit.
    let wizard = wizard
        .apply(WizardAction::EmbeddingModeSelected(args.embedding_mode))?
        .apply(WizardAction::SubmissionStarted)?;

    let controller = SubmissionController::new(Arc::clone(api));
    let job = match controller.submit(wizard.spec()).await {
        Ok(job) => job,
        Err(e) => {
            let wizard = wizard.apply(WizardAction::SubmissionFailed)?;
            tracing::debug!(step = wizard.step().label(), "Wizard unlocked after failure");
            return Err(e.into());
        }
    };
    output::submitted(&job, json);

    if args.no_watch {
        return Ok(());
    }
    follow(api, config, &job.id, json).await
}

/// Follow a workflow until it finishes, fails, or the user interrupts.
async fn follow(
    api: &Arc<ServiceApi>,
    config: &ClientConfig,
    job_id: &str,
    json: bool,
) -> anyhow::Result<()> {
    let poller = StatusPoller::new(Arc::clone(api), PollConfig::from(config));
    let mut watch = poller.watch(job_id);

    let cancel = watch.cancel_handle();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel.cancel();
    });

    while let Some(event) = watch.next().await {
        match event {
            PollEvent::Snapshot(record) => output::record(&record, json),
            PollEvent::Retrying(e) => {
                tracing::warn!(job_id, error = %e, "Status check failed, retrying");
            }
            PollEvent::Finished(record) => {
                output::record(&record, json);
                if record.status == WorkflowStatus::Failed {
                    bail!(
                        "Workflow {} failed: {}",
                        record.id,
                        record.error_message.as_deref().unwrap_or("unknown error")
                    );
                }
                output::results(api, job_id, &record, json);
            }
            PollEvent::Fatal(e) => return Err(e.into()),
        }
    }

    if watch.is_cancelled() {
        tracing::info!(job_id, "Stopped watching; the workflow keeps running on the service");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), cancelling watch");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, cancelling watch");
        }
    }
}
