use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use avatar_voice::config::AppConfig;
use avatar_voice::kernel::event::{Event, InputEvent};
use avatar_voice::protocol::{ChannelBus, HostEnvelope};
use avatar_voice::services::{ConsoleAvatar, ConsoleRecognizer, HttpChatClient, HttpTokenClient};
use avatar_voice::{Collaborators, Reactor, ReactorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = AppConfig::from_env().context("loading configuration")?;
    tracing::info!(api = %config.api_base_url, "avatar voice kernel booting");

    let (tx, rx) = mpsc::channel(100);
    let (bus, mut outbound) = ChannelBus::new();
    let recognizer = Arc::new(ConsoleRecognizer::new());

    let services = Collaborators {
        chat: Arc::new(HttpChatClient::new(&config.api_base_url, config.http_timeout)),
        tokens: Arc::new(HttpTokenClient::new(&config.api_base_url, config.http_timeout)),
        avatar: Arc::new(ConsoleAvatar::new(tx.clone())),
        recognizer: recognizer.clone(),
        bus: Arc::new(bus),
    };
    let reactor = Reactor::new(rx, tx, ReactorConfig::from(&config), services);

    // Outbound host messages, one JSON object per line.
    tokio::spawn(async move {
        while let Some(message) = outbound.recv().await {
            match serde_json::to_string(&message) {
                Ok(line) => println!("[HOST] {}", line),
                Err(e) => tracing::warn!(error = %e, "outbound message not serializable"),
            }
        }
    });

    // Stdin: JSON lines are host envelopes, anything else is a final transcript.
    // Typed speech is only heard while the recognizer is listening.
    let input_tx = reactor.sender();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        println!(
            "Send {} to begin, then speak by typing.",
            r#"{"origin":"http://localhost","data":{"type":"START_AVATAR"}}"#
        );

        while let Ok(Some(line)) = lines.next_line().await {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let input = if line.starts_with('{') {
                match serde_json::from_str::<HostEnvelope>(line) {
                    Ok(envelope) => InputEvent::Host(envelope),
                    Err(e) => {
                        tracing::warn!(error = %e, "malformed host envelope");
                        continue;
                    }
                }
            } else if recognizer.is_listening() {
                InputEvent::final_transcript(line)
            } else {
                println!("(not listening)");
                continue;
            };
            if input_tx.send(Event::Input(input)).await.is_err() {
                break;
            }
        }
    });

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown requested");
            signal.cancel();
        }
    });

    reactor.run(shutdown).await;
    Ok(())
}
