//! Terminal chat front end
//!
//! Reads one message per line from stdin and prints each reply. When a
//! transcript path is configured the conversation is written there as
//! rendered HTML on exit.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chat_relay::client::{ChatSession, Submission, Transport};
use chat_relay::config::ClientConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ClientConfig::from_file(Path::new(&path))?,
        None => ClientConfig::from_env(),
    };
    tracing::info!("Talking to relay at {}", config.relay_url);

    let session = ChatSession::new(Transport::new(&config.relay_url));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match session.submit(&line).await {
            Submission::Ignored => continue,
            Submission::Busy => eprintln!("(still waiting for the previous reply)"),
            Submission::Reply(text) => println!("{}\n", text),
            Submission::Failed(message) => eprintln!("{}\n", message),
        }
    }

    if let Some(path) = &config.transcript {
        let conversation = session.snapshot().await;
        tokio::fs::write(path, conversation.to_html()).await?;
        tracing::info!(
            "Wrote {} messages to {}",
            conversation.len(),
            path.display()
        );
    }

    Ok(())
}
