//! Command handlers
//!
//! Each handler runs one invocation against the selected store and prints
//! its result. Query failures surface as [`QueryError`] so `main` can show
//! the matching suggestion.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use log::info;
use mail::query::build_criteria;
use mail::{
    ActionHandler, CancellationToken, EngineSettings, FilterArgs, InMemoryMailStore, MailStore,
    MessageId, OperationContext, QueryEngine, QueryError, QueryRequest, SortSpec,
    SqliteMailStore,
};
use serde_json::json;

use crate::cli::ViewFlags;
use crate::output;

/// Open the SQLite mailbox at `db`, or the demo mailbox when none is given
pub fn open_store(db: Option<&Path>) -> Result<Arc<dyn MailStore>> {
    match db {
        Some(path) => {
            let store = SqliteMailStore::new(path)
                .with_context(|| format!("Failed to open mailbox: {}", path.display()))?;
            info!("Opened mailbox {}", path.display());
            Ok(Arc::new(store))
        }
        None => {
            info!("No --db given, using the demo mailbox");
            Ok(Arc::new(InMemoryMailStore::with_fixture()))
        }
    }
}

pub fn folders(store: &dyn MailStore) -> Result<()> {
    let folders = store.list_folders()?;
    output::print_folders(&folders);
    Ok(())
}

/// Shared body of `read` and `find`
pub fn query(
    store: Arc<dyn MailStore>,
    settings: EngineSettings,
    operation: &str,
    args: FilterArgs,
    view: ViewFlags,
) -> Result<()> {
    let criteria = build_criteria(&args)?;
    let chunk_size = view.chunk_size.unwrap_or(settings.chunk_size);

    let mut engine = QueryEngine::new(store, OperationContext::new(settings));
    let request = QueryRequest::new(operation, criteria)
        .sorted_by(SortSpec::new(view.sort_by, view.order));
    let results = engine.execute(&request)?;

    if let Some(regression) = results.regression().filter(|r| r.is_regression()) {
        info!(
            "'{}' took {:.3}s against a baseline of {:.3}s",
            regression.operation, regression.duration_secs, regression.baseline.duration_secs
        );
    }

    if view.stream {
        let total = results.len();
        let stream = results.stream(chunk_size, CancellationToken::new())?;
        if stream.large_result_warning() {
            eprintln!("Warning: {} results; consider adding filters.", total);
        }
        for chunk in stream {
            let chunk = chunk?;
            println!("-- chunk {} ({} messages) --", chunk.sequence, chunk.items.len());
            for message in &chunk.items {
                output::print_message_line(message);
            }
        }
        println!("\n{} messages streamed", total);
        return Ok(());
    }

    let mut pager = match view.page_size {
        Some(page_size) => results.paginate(page_size)?,
        None => results.into_paginator()?,
    };
    let total_pages = pager.total_pages();
    if total_pages > 0 && !pager.go_to_page(view.page) {
        return Err(QueryError::InvalidArgument {
            field: "page",
            message: format!("page {} is out of range (1-{})", view.page, total_pages),
        }
        .into());
    }

    if view.json {
        let body = json!({ "page": pager.get_page_info(), "messages": pager.get_current_page() });
        println!("{}", serde_json::to_string_pretty(&body)?);
    } else {
        output::print_page(&pager);
    }
    Ok(())
}

pub fn open(store: Arc<dyn MailStore>, id: &str) -> Result<()> {
    let handler = ActionHandler::new(store);
    let message = handler.open_message(&MessageId::new(id))?;
    output::print_message(&message);
    Ok(())
}

pub fn move_messages(store: Arc<dyn MailStore>, ids: &[String], target: &str) -> Result<()> {
    let handler = ActionHandler::new(store);
    let ids: Vec<MessageId> = ids.iter().map(|id| MessageId::new(id.as_str())).collect();
    let report = handler.move_messages(&ids, target);

    for id in &report.moved {
        println!("Moved {} to {}", id, target);
    }
    for (id, reason) in &report.failed {
        eprintln!("Could not move {}: {}", id, reason);
    }
    if !report.all_moved() {
        bail!(
            "{} of {} messages could not be moved",
            report.failed.len(),
            ids.len()
        );
    }
    Ok(())
}
