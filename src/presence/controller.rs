use anyhow::{bail, Context, Result};
use std::sync::Arc;
use tauri::WebviewWindow;
use tokio_util::sync::CancellationToken;

use crate::page::PageBridge;

use super::discord::PresenceSink;
use super::loop_worker::presence_loop;

/// Owns the sync loop task: one loop per process, started once the main
/// window exists and cancelled on exit. Page reloads do not restart it; a
/// loading page just times queries out until it is interactive again.
pub struct PresenceController {
    handle: Option<tauri::async_runtime::JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl PresenceController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start(
        &mut self,
        webview: WebviewWindow,
        page: Arc<PageBridge>,
        sink: Arc<dyn PresenceSink>,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("presence loop already active");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle =
            tauri::async_runtime::spawn(presence_loop(webview, page, sink, token_clone));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("presence loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for PresenceController {
    fn default() -> Self {
        Self::new()
    }
}
