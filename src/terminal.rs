//! Line-oriented terminal front-end
//!
//! Reads drafts from stdin and prints the conversation as it changes. Each
//! message is printed once, in log order; notifications and status changes
//! are printed as they happen.

use crate::config::ChatConfig;
use crate::model::Origin;
use crate::runtime::{open_conversation, ConversationHandle};
use crate::state_machine::ConvContext;
use crate::transport::{HttpTransport, Transport, TransportError};
use crate::view::ConversationView;
use std::collections::HashSet;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

const QUIT: &str = "/quit";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("Failed to create thread: {0}")]
    Thread(#[from] TransportError),
    #[error("Failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

/// Open a conversation and drive it from stdin until `/quit` or EOF
pub async fn run_chat(config: ChatConfig) -> Result<(), ChatError> {
    let transport = HttpTransport::new(&config.api_url)?;

    let thread_id = match config.thread_id.clone() {
        Some(thread_id) => thread_id,
        None => {
            let thread_id = transport.create_thread().await?;
            println!("Created thread {thread_id} (set THREADCHAT_THREAD_ID to reuse it)");
            thread_id
        }
    };
    if config.assistant_id.is_none() {
        eprintln!("THREADCHAT_ASSISTANT_ID is not set; messages cannot be sent");
    }

    let context = ConvContext::new(Some(thread_id), config.assistant_id.clone())
        .with_max_run_polls(config.max_run_polls);
    let handle = open_conversation(transport, context, config.timing());

    let stop = CancellationToken::new();
    let printer = tokio::spawn(print_updates(subscribe(&handle), stop.clone()));

    let result = read_drafts(&handle).await;

    handle.close().await;
    stop.cancel();
    if let Err(e) = printer.await {
        tracing::error!(error = %e, "Printer task failed");
    }
    result
}

async fn read_drafts(handle: &ConversationHandle) -> Result<(), ChatError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim_end();
        if line == QUIT {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        if handle.set_draft(line).await.is_err() || handle.send().await.is_err() {
            tracing::warn!("Conversation closed while sending");
            break;
        }
    }
    Ok(())
}

struct Subscriptions {
    views: tokio::sync::watch::Receiver<ConversationView>,
    notifications: tokio::sync::broadcast::Receiver<crate::view::Notification>,
}

fn subscribe(handle: &ConversationHandle) -> Subscriptions {
    Subscriptions {
        views: handle.subscribe_view(),
        notifications: handle.notifications(),
    }
}

async fn print_updates(mut subs: Subscriptions, stop: CancellationToken) {
    let mut printer = Printer::default();
    for line in printer.render(&subs.views.borrow_and_update()) {
        println!("{line}");
    }

    loop {
        tokio::select! {
            biased;

            () = stop.cancelled() => break,
            changed = subs.views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = subs.views.borrow_and_update().clone();
                for line in printer.render(&view) {
                    println!("{line}");
                }
            }
            notification = subs.notifications.recv() => match notification {
                Ok(notification) => println!("{notification}"),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Dropped notifications");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
}

/// Turns successive views into the lines not yet printed
#[derive(Debug, Default)]
struct Printer {
    seen: HashSet<String>,
    label: &'static str,
    placeholder: Option<&'static str>,
}

impl Printer {
    fn render(&mut self, view: &ConversationView) -> Vec<String> {
        let mut out = Vec::new();

        let placeholder = view.placeholder();
        if placeholder != self.placeholder {
            if let Some(text) = placeholder {
                out.push(format!("({text})"));
            }
            self.placeholder = placeholder;
        }

        for message in &view.messages {
            if !self.seen.insert(message.id.clone()) {
                continue;
            }
            let who = match message.origin {
                Origin::User => "you",
                Origin::Assistant => "assistant",
            };
            for (i, line) in message.lines().enumerate() {
                if i == 0 {
                    out.push(format!("{who}> {line}"));
                } else {
                    out.push(format!("{:width$}  {line}", "", width = who.len()));
                }
            }
        }

        let label = view.status_label();
        if label != self.label {
            if view.is_busy() {
                out.push(label.to_string());
            }
            self.label = label;
        }

        out
    }
}
