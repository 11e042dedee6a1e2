//! One-shot analysis of a single message

use std::sync::Arc;

use colored::Colorize;
use tokio::io::AsyncReadExt;

use crate::cli::CommandContext;
use crate::error::Result;
use crate::listener::IncomingMessage;

const SENDER: &str = "cli";

/// Analyze the link in `text`, or in stdin when `text` is empty
pub async fn run(ctx: CommandContext, text: Vec<String>) -> Result<()> {
    let text = if text.is_empty() {
        let mut input = String::new();
        tokio::io::stdin().read_to_string(&mut input).await?;
        input
    } else {
        text.join(" ")
    };

    let message = IncomingMessage::new(text, SENDER);
    let outcome = ctx
        .listener
        .on_message(&message, Arc::clone(&ctx.sink))
        .await;
    ctx.shutdown().await;

    if outcome.is_none() {
        eprintln!("{} No timings link found", "○".dimmed());
    }
    Ok(())
}
