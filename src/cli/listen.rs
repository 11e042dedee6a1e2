//! Long-running mode: every stdin line is a chat message

use std::sync::Arc;

use log::{debug, warn};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinSet;

use crate::cli::CommandContext;
use crate::error::Result;
use crate::listener::IncomingMessage;

/// Answer messages concurrently until stdin closes, then drain and shut down
pub async fn run(ctx: CommandContext, sender: String) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut handlers = JoinSet::new();
    let mut answered = 0usize;
    debug!(
        "Listening for links starting with {}",
        ctx.config.extractor.host_prefix
    );

    let read = loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        };
        if line.trim().is_empty() {
            continue;
        }

        let listener = Arc::clone(&ctx.listener);
        let sink = Arc::clone(&ctx.sink);
        let message = IncomingMessage::new(line, sender.clone());
        handlers.spawn(async move { listener.on_message(&message, sink).await.is_some() });

        // Reap finished handlers so the set does not grow with the input
        while let Some(done) = handlers.try_join_next() {
            answered += tally(done);
        }
    };

    while let Some(done) = handlers.join_next().await {
        answered += tally(done);
    }
    debug!("Answered {answered} message(s)");

    ctx.shutdown().await;
    read?;
    Ok(())
}

fn tally(done: std::result::Result<bool, tokio::task::JoinError>) -> usize {
    match done {
        Ok(answered) => usize::from(answered),
        Err(err) => {
            warn!("Message handler failed: {err}");
            0
        }
    }
}
