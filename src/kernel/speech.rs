use std::time::Duration;

use tracing::debug;

use crate::error::AvatarError;
use crate::services::AvatarClient;

/// Programmatic speech: cut off whatever the avatar is saying, let the audio
/// path settle, then start the new utterance.
pub async fn speak_after_interrupt(
    avatar: &dyn AvatarClient,
    text: &str,
    settle: Duration,
) -> Result<(), AvatarError> {
    if let Err(e) = avatar.interrupt().await {
        debug!(error = %e, "interrupt before speech failed");
    }
    tokio::time::sleep(settle).await;
    avatar.speak(text).await
}
