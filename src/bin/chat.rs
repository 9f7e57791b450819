//! Terminal chat client
//!
//! Reads one message per line, streams the reply to stdout as it arrives.
//! Ctrl-C aborts the reply in progress, or exits at the prompt. `/history`
//! prints the transcript and `/quit` exits.

use chat_relay::{
    ChatError, ChatObserver, ClientConfig, ConversationController, ErrorKind, RelayClient, Role,
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::{wrappers::LinesStream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Prints deltas as they stream in
struct TerminalObserver;

impl ChatObserver for TerminalObserver {
    fn on_delta(&mut self, text: &str) {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }

    fn on_done(&mut self) {
        println!();
    }

    fn on_error(&mut self, error: &ChatError) {
        println!();
        eprintln!("error: {error}");
    }
}

fn prompt() {
    print!("you> ");
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so they never interleave with the reply
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env();
    tracing::info!(relay = %config.relay_url, "Starting chat client");
    let mut controller = ConversationController::new(RelayClient::new(&config)?);

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    prompt();

    loop {
        // Once installed, the signal listener replaces the default SIGINT exit,
        // so an idle Ctrl-C has to end the session here
        let next = tokio::select! {
            line = lines.next() => line,
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let Some(line) = next else { break };
        let line = line?;
        match line.trim() {
            "/quit" | "/exit" => break,
            "/history" => {
                for turn in controller.transcript().turns() {
                    let who = match turn.role {
                        Role::User => "you",
                        Role::Assistant => "assistant",
                    };
                    println!("{who}> {}", turn.content);
                }
                prompt();
                continue;
            }
            "" => {
                prompt();
                continue;
            }
            _ => {}
        }

        print!("assistant> ");
        let _ = std::io::stdout().flush();

        let cancel = CancellationToken::new();
        let mut observer = TerminalObserver;
        let send = controller.send_conversation_with_cancel(&line, &mut observer, cancel.clone());
        tokio::pin!(send);
        let result = tokio::select! {
            result = &mut send => result,
            _ = tokio::signal::ctrl_c() => {
                cancel.cancel();
                send.await
            }
        };
        match result {
            Ok(None) => println!("(no reply)"),
            Err(e) if e.kind == ErrorKind::Cancelled => {
                tracing::debug!("Round-trip cancelled from the terminal");
            }
            Ok(Some(_)) | Err(_) => {}
        }

        prompt();
    }

    Ok(())
}
