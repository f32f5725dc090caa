//! `clinker-runner` -- submit one optimization job and follow it to the end.
//!
//! Job parameters are given as `name=value` arguments. Progress is
//! printed as it arrives; on success every comparison group is printed
//! as a table. Ctrl-C cancels the job.
//!
//! # Environment variables
//!
//! | Variable         | Required | Default     | Description                      |
//! |------------------|----------|-------------|----------------------------------|
//! | `OPT_UID`        | yes      | --          | User identifier sent with calls  |
//! | `OPT_COMPANY_ID` | yes      | --          | Company identifier               |
//! | `OPT_TASK_ID`    | no       | random UUID | Task identifier for this job     |
//!
//! Client settings (`OPTIMIZER_API_URL`, `POLL_INTERVAL_MS`, ...) are
//! read by [`ClientConfig::from_env`].

use std::sync::Arc;

use anyhow::Context;
use clinker_client::api::OptimizerApi;
use clinker_client::config::ClientConfig;
use clinker_client::endpoints::Endpoints;
use clinker_client::events::SessionEvent;
use clinker_client::session::TaskSession;
use clinker_core::compare::MetricGroup;
use clinker_core::types::{JobHandle, JobState};
use clinker_runner::{parse_parameters, progress_line, render_table};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clinker_runner=info,clinker_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env()?;
    let uid = std::env::var("OPT_UID").context("OPT_UID environment variable is required")?;
    let company_id = std::env::var("OPT_COMPANY_ID")
        .context("OPT_COMPANY_ID environment variable is required")?;
    let task_id = std::env::var("OPT_TASK_ID").unwrap_or_else(|_| uuid::Uuid::new_v4().to_string());

    let handle = JobHandle::new(uid, task_id, company_id)?;
    let parameters = parse_parameters(std::env::args().skip(1))?;

    tracing::info!(
        api_url = %config.api_url,
        task_id = handle.task_id(),
        parameters = parameters.len(),
        "Starting clinker-runner",
    );

    let api = Arc::new(OptimizerApi::new(config.api_url.clone()));
    let session = TaskSession::new(Endpoints::shared(api), config);

    let (tx, mut rx) = mpsc::unbounded_channel();
    session.start(handle, parameters, Arc::new(tx)).await;

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let done = event.is_terminal();
                report(&session, event).await;
                if done {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupt received, cancelling job");
                session.cancel().await;
            }
        }
    }

    session.wait().await;

    match session.state().await {
        JobState::Ready | JobState::Cancelled => Ok(()),
        state => anyhow::bail!("optimization job ended in state {state}"),
    }
}

async fn report(session: &TaskSession, event: SessionEvent) {
    match event {
        SessionEvent::Stage { snapshot, .. } => println!("{}", progress_line(&snapshot)),
        SessionEvent::Ready { results, .. } => {
            println!("Received {} scenario(s)", results.len());
            for group in MetricGroup::ALL {
                if let Some(rows) = session.compare(group, false).await {
                    println!();
                    print!("{}", render_table(&results, group, &rows));
                }
            }
        }
        SessionEvent::Failed { error, .. } => tracing::error!(error = %error, "Optimization failed"),
        SessionEvent::Cancelled { .. } => println!("Cancelled"),
    }
}
