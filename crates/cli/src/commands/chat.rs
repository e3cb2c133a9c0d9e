//! `switchboard chat`: run the workflow against stdin/stdout.

use std::io::Write;
use switchboard_core::session::CurrentNode;
use switchboard_core::store::{InMemorySessionStore, SessionStore};
use switchboard_workflow::{Emitter, WorkflowError, WorkflowEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

pub async fn run(user: &str) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let engine = super::build_engine(&config)?;

    let store = InMemorySessionStore::new(engine.entry());
    let (session, _) = store.get_or_create(user).await;
    let (emitter, mut events) = Emitter::channel();

    println!();
    println!("  Switchboard Chat");
    println!("  Model:  {}", config.model);
    println!("  User:   {user}");
    println!("  Node:   {}", engine.entry());
    println!();
    println!("  Type your message and press Enter. Type 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            break;
        }

        print!("  Assistant > ");
        std::io::stdout().flush()?;

        let cancel = CancellationToken::new();
        let turn = engine.handle_user_message(&session, line, &emitter, &cancel);
        tokio::pin!(turn);

        let result = loop {
            tokio::select! {
                result = &mut turn => break result,
                Some(event) = events.recv() => print_event(&event)?,
                _ = tokio::signal::ctrl_c() => cancel.cancel(),
            }
        };
        while let Ok(event) = events.try_recv() {
            print_event(&event)?;
        }

        println!();
        match result {
            Ok(report) if report.current_node == CurrentNode::Finished => break,
            Ok(report) => tracing::debug!(node = %report.node, transition = ?report.transition, "Turn finished"),
            Err(WorkflowError::AlreadyComplete) => break,
            Err(e) => eprintln!("  [Error] {e}"),
        }
    }

    println!();
    println!("  Goodbye!");
    println!();
    Ok(())
}

fn print_event(event: &WorkflowEvent) -> std::io::Result<()> {
    let mut out = std::io::stdout();
    match event {
        WorkflowEvent::AiMessageStream(delta) => {
            write!(out, "{delta}")?;
            out.flush()
        }
        other => match summarize(other) {
            Some(line) => writeln!(out, "{line}"),
            None => Ok(()),
        },
    }
}

/// One-line rendering of a non-streaming event.
fn summarize(event: &WorkflowEvent) -> Option<String> {
    match event {
        // The text was already streamed.
        WorkflowEvent::AiMessageStream(_)
        | WorkflowEvent::AiMessage { .. }
        | WorkflowEvent::Authenticated { .. } => None,
        WorkflowEvent::Error { message } => Some(format!("  [error] {message}")),
        WorkflowEvent::UserData(data)
        | WorkflowEvent::RoutingDecided(data)
        | WorkflowEvent::InterviewScheduled(data)
        | WorkflowEvent::SalesCompleted(data)
        | WorkflowEvent::ProductInfo(data) => Some(format!("  [{}] {data}", event.event_name())),
        WorkflowEvent::WorkflowComplete(summary) => Some(format!(
            "  [{}] {}",
            event.event_name(),
            serde_json::to_string(summary).unwrap_or_default()
        )),
    }
}
