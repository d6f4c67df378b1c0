//! Auditlens terminal viewer for audit event history.

#![forbid(unsafe_code)]

mod commands;
mod viewer_config;

use std::sync::Arc;

use auditlens_application::{
    AuditViewSession, PagedFetchController, ScrollSettings, ScrollSignal, ViewEvent, ViewHandle,
    ViewSnapshot,
};
use auditlens_core::{AppError, AppResult};
use auditlens_domain::AuditRecord;
use auditlens_infrastructure::ReqwestAuditTransport;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::commands::{Command, help};
use crate::viewer_config::{ViewerConfig, init_tracing};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let config = ViewerConfig::load()?;
    let transport =
        ReqwestAuditTransport::with_options(config.http_timeout, config.accept_invalid_certs)?;
    let controller = Arc::new(PagedFetchController::from_config(
        Arc::new(transport),
        &config.view,
    )?);
    let session =
        AuditViewSession::new(controller.clone(), config.profile()?, config.view.page_size)?;

    info!(
        resource = %config.resource,
        clause_style = config.clause_style.as_str(),
        primary = %controller.resolver().primary_base(),
        fallback = %controller.resolver().fallback_base(),
        page_size = config.view.page_size,
        "auditlens-viewer started"
    );

    let handle = ViewHandle::spawn(session, ScrollSettings::from_config(&config.view));
    let mut snapshots = handle.subscribe();
    handle.send(ViewEvent::Mount).await?;

    println!("{}", help());
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = line.map_err(|error| {
                    AppError::Internal(format!("failed to read viewer input: {error}"))
                })?;
                let Some(line) = line else {
                    break;
                };

                match Command::from_line(line.as_str()) {
                    Ok(None) => {}
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => run_command(&handle, &controller, command).await?,
                    Err(error) => println!("{error}"),
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                print_summary(&snapshot);
            }
        }
    }

    handle.stop().await?;
    info!("auditlens-viewer stopped");

    Ok(())
}

async fn run_command(
    handle: &ViewHandle,
    controller: &PagedFetchController,
    command: Command,
) -> AppResult<()> {
    match command {
        Command::Filter(args) => handle.send(ViewEvent::ApplyFilter(args.criteria())).await,
        Command::Clear => handle.send(ViewEvent::ClearFilter).await,
        Command::Scroll { distance } => {
            handle
                .send(ViewEvent::Scroll(ScrollSignal::new(distance)))
                .await
        }
        Command::More => handle.send(ViewEvent::Scroll(ScrollSignal::new(0))).await,
        Command::Show { count } => {
            let snapshot = handle.snapshot();
            let skip = snapshot.records.len().saturating_sub(count);
            for record in snapshot.records.iter().skip(skip) {
                println!("{}", format_record(record));
            }
            Ok(())
        }
        Command::Entities => {
            let names = controller.fetch_entity_names().await;
            println!("entities: {}", names.join(", "));
            Ok(())
        }
        Command::Help => {
            println!("{}", help());
            Ok(())
        }
        Command::Quit => Ok(()),
    }
}

fn print_summary(snapshot: &ViewSnapshot) {
    println!(
        "records={} phase={} has_more={} next_offset={}",
        snapshot.records.len(),
        snapshot.phase.as_str(),
        snapshot.has_more,
        snapshot.offset
    );

    if let Some(error) = &snapshot.last_error {
        println!("error: {error}");
    }
}

fn format_record(record: &AuditRecord) -> String {
    format!(
        "{} {} {} {} {} {} {}",
        record.timestamp,
        record.actor,
        record.action,
        record.http_method,
        record.operation,
        record.entity_name,
        record.api_path
    )
}
