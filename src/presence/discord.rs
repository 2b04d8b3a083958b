use anyhow::{anyhow, Result};
use discord_rich_presence::{
    activity::{Activity, ActivityType, Assets, Timestamps},
    DiscordIpc, DiscordIpcClient,
};
use log::{info, warn};
use std::sync::Mutex;

use super::track::PresenceRecord;

const DISCORD_APP_ID: &str = "1302459809471266838";

/// The remote presence display as seen by the sync loop. Kept as a trait so
/// the loop's clear/update branches can be exercised against a recording
/// fake.
pub trait PresenceSink: Send + Sync {
    fn set_listening(&self, record: &PresenceRecord) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// Discord Rich Presence over the local IPC socket.
///
/// While no client is connected every operation is a silent no-op, matching
/// the original shell's behavior when Discord is not running.
pub struct DiscordPresence {
    client: Mutex<Option<DiscordIpcClient>>,
}

impl DiscordPresence {
    pub fn new() -> Self {
        Self {
            client: Mutex::new(None),
        }
    }

    /// Run the blocking IPC handshake off the async runtime. Failure is
    /// logged by the caller and is non-fatal; the loop simply has nowhere to
    /// publish until a restart.
    pub async fn connect(&self) -> Result<()> {
        let client = tokio::task::spawn_blocking(|| {
            let mut client = DiscordIpcClient::new(DISCORD_APP_ID);
            client
                .connect()
                .map_err(|e| anyhow!("discord ipc connect failed: {e}"))?;
            Ok::<_, anyhow::Error>(client)
        })
        .await
        .map_err(|e| anyhow!("discord connect worker join failed: {e}"))??;

        *self.client.lock().unwrap() = Some(client);
        info!("Connected to Discord RPC");
        Ok(())
    }

    pub fn disconnect(&self) {
        if let Some(mut client) = self.client.lock().unwrap().take() {
            if let Err(e) = client.close() {
                warn!("Failed to close Discord RPC connection: {e}");
            }
        }
    }
}

impl PresenceSink for DiscordPresence {
    fn set_listening(&self, record: &PresenceRecord) -> Result<()> {
        let mut guard = self.client.lock().unwrap();
        let Some(client) = guard.as_mut() else {
            return Ok(());
        };

        let mut activity = Activity::new()
            .activity_type(ActivityType::Listening)
            .details(&record.details)
            .state(&record.state)
            .timestamps(
                Timestamps::new()
                    .start(record.start_ms)
                    .end(record.end_ms),
            );
        if !record.large_image_key.is_empty() {
            activity = activity.assets(Assets::new().large_image(&record.large_image_key));
        }

        client
            .set_activity(activity)
            .map_err(|e| anyhow!("failed to set activity: {e}"))
    }

    fn clear(&self) -> Result<()> {
        let mut guard = self.client.lock().unwrap();
        let Some(client) = guard.as_mut() else {
            return Ok(());
        };
        client
            .clear_activity()
            .map_err(|e| anyhow!("failed to clear activity: {e}"))
    }
}
