use anyhow::{Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use std::sync::Arc;
use tauri::WebviewWindow;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::page::{PageBridge, PageQuery};

use super::discord::PresenceSink;
use super::track::{PresenceRecord, TrackSnapshot};

const SYNC_INTERVAL_SECS: u64 = 10;
const SYNC_TIMEOUT_SECS: u64 = 8;

/// Outcome of one cycle, decided before touching the remote display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Clear,
    Update(PresenceRecord),
}

/// Mirror the hosted page's playback state into the presence display every
/// ten seconds until cancelled.
///
/// Each tick runs under a timeout so a stalled page query or IPC write can
/// never wedge the loop; a failed tick is logged and the next tick proceeds
/// independently, which is sound because the whole operation is idempotent.
pub async fn presence_loop(
    webview: WebviewWindow,
    page: Arc<PageBridge>,
    sink: Arc<dyn PresenceSink>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(SYNC_INTERVAL_SECS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fut = sync_once(&webview, &page, sink.as_ref());
                match tokio::time::timeout(Duration::from_secs(SYNC_TIMEOUT_SECS), fut).await {
                    Ok(Ok(())) => {},
                    Ok(Err(err)) => error!("presence sync failed: {err:?}"),
                    Err(_) => warn!("presence sync timeout (> {SYNC_TIMEOUT_SECS}s)"),
                }
            }
            _ = cancel_token.cancelled() => {
                info!("presence loop shutting down");
                break;
            }
        }
    }
}

async fn sync_once(
    webview: &WebviewWindow,
    page: &PageBridge,
    sink: &dyn PresenceSink,
) -> Result<()> {
    let playing = page
        .query(webview, PageQuery::IsPlaying)
        .await?
        .as_bool()
        .unwrap_or(false);

    // The snapshot query is only worth a round trip while something plays;
    // the default snapshot carries is_playing = false and plans a clear.
    let snapshot = if playing {
        let value = page.query(webview, PageQuery::TrackSnapshot).await?;
        serde_json::from_value::<TrackSnapshot>(value).context("malformed track snapshot")?
    } else {
        TrackSnapshot::default()
    };

    apply(plan_sync(&snapshot, Utc::now().timestamp_millis()), sink)
}

/// Decide what this cycle should do to the remote display.
pub fn plan_sync(snapshot: &TrackSnapshot, now_ms: i64) -> SyncAction {
    if snapshot.is_playing {
        SyncAction::Update(PresenceRecord::compose(snapshot, now_ms))
    } else {
        SyncAction::Clear
    }
}

fn apply(action: SyncAction, sink: &dyn PresenceSink) -> Result<()> {
    match action {
        SyncAction::Clear => sink.clear(),
        SyncAction::Update(record) => sink.set_listening(&record),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<PresenceRecord>>,
        clears: Mutex<u32>,
    }

    impl PresenceSink for RecordingSink {
        fn set_listening(&self, record: &PresenceRecord) -> Result<()> {
            self.updates.lock().unwrap().push(record.clone());
            Ok(())
        }

        fn clear(&self) -> Result<()> {
            *self.clears.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn playing_snapshot() -> TrackSnapshot {
        TrackSnapshot {
            is_playing: true,
            title: "Song Name".into(),
            author: "Someone".into(),
            artwork_url: "url(\"https://i1.sndcdn.com/artworks-50x50.jpg\")".into(),
            elapsed_label: "0:30".into(),
            total_label: "3:20".into(),
        }
    }

    #[test]
    fn not_playing_plans_a_clear() {
        let action = plan_sync(&TrackSnapshot::default(), 1_000);
        assert_eq!(action, SyncAction::Clear);
    }

    #[test]
    fn clear_invokes_only_the_clear_operation() {
        let sink = RecordingSink::default();
        apply(SyncAction::Clear, &sink).unwrap();
        assert_eq!(*sink.clears.lock().unwrap(), 1);
        assert!(sink.updates.lock().unwrap().is_empty());
    }

    #[test]
    fn playing_plans_an_update_with_derived_fields() {
        let now = 1_700_000_000_000;
        let SyncAction::Update(record) = plan_sync(&playing_snapshot(), now) else {
            panic!("expected an update");
        };
        assert!(record.details.starts_with("Song Name"));
        assert!(record.state.starts_with("Someone"));
        assert_eq!(
            record.large_image_key,
            "https://i1.sndcdn.com/artworks-500x500.jpg"
        );
        assert_eq!(record.start_ms, now - 30_000);
        assert_eq!(record.end_ms, now + 170_000);
    }

    #[test]
    fn update_reaches_the_sink_unchanged() {
        let sink = RecordingSink::default();
        let now = 42;
        let action = plan_sync(&playing_snapshot(), now);
        apply(action.clone(), &sink).unwrap();

        let updates = sink.updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(SyncAction::Update(updates[0].clone()), action);
        assert_eq!(*sink.clears.lock().unwrap(), 0);
    }
}
