use anyhow::{Context, Result};
use log::warn;
use std::sync::{Arc, Mutex};
use tauri::{
    menu::{Menu, MenuItem},
    AppHandle, Manager, Runtime, WebviewUrl, WebviewWindow, WebviewWindowBuilder,
};
use tauri_plugin_clipboard_manager::ClipboardExt;

use crate::blocker::AdBlocker;
use crate::page;
use crate::settings::{SettingsStore, UserSettings, WindowBounds};

pub const MAIN_WINDOW: &str = "main";
const WINDOW_TITLE: &str = "SoundCloud";
const START_URL: &str = "https://soundcloud.com/discover";
const ALLOWED_DOMAIN: &str = "soundcloud.com";

const DEFAULT_WIDTH: f64 = 1366.0;
const DEFAULT_HEIGHT: f64 = 768.0;

pub fn is_allowed_host(host: &str) -> bool {
    host == ALLOWED_DOMAIN || host.ends_with(&format!(".{ALLOWED_DOMAIN}"))
}

/// Navigation filter: allow-listed hosts only, then the content filter's
/// document check while an engine occupies the slot. Toggling the ad blocker
/// off empties the slot, so the document check drops out immediately.
pub(crate) fn navigation_allowed(url: &tauri::Url, blocker: &Mutex<Option<AdBlocker>>) -> bool {
    let allowed = url.host_str().map(is_allowed_host).unwrap_or(false);
    if !allowed {
        warn!(
            "Navigation to {url} blocked. Only {ALLOWED_DOMAIN} and its subdomains are allowed."
        );
        return false;
    }
    if let Some(engine) = blocker.lock().unwrap().as_ref() {
        if engine.should_block_navigation(url.as_str()) {
            warn!("Navigation to {url} blocked by the content filter");
            return false;
        }
    }
    true
}

/// Build the shell window: saved geometry, pinned title, domain-restricted
/// navigation, session proxy when configured, and the shortcut/context-menu
/// initialization script.
pub fn build_main_window(
    app: &AppHandle,
    settings: &UserSettings,
    blocker: Arc<Mutex<Option<AdBlocker>>>,
) -> Result<WebviewWindow> {
    let start_url = START_URL.parse().context("invalid start url")?;

    let nav_blocker = blocker;
    let mut builder = WebviewWindowBuilder::new(app, MAIN_WINDOW, WebviewUrl::External(start_url))
        .title(WINDOW_TITLE)
        .initialization_script(page::inject::INIT_SCRIPT)
        .on_navigation(move |url| navigation_allowed(url, &nav_blocker));

    builder = match settings.bounds {
        Some(bounds) => builder
            .inner_size(bounds.width, bounds.height)
            .position(bounds.x, bounds.y),
        None => builder.inner_size(DEFAULT_WIDTH, DEFAULT_HEIGHT),
    };

    if settings.proxy_enabled {
        if let Some(proxy) = &settings.proxy_data {
            let proxy_url = proxy
                .url()
                .parse()
                .context("configured proxy is not a valid url")?;
            builder = builder.proxy_url(proxy_url);
        }
    }

    let window = builder.build().context("failed to build main window")?;

    if settings.maximized {
        window.maximize().context("failed to restore maximized state")?;
    }

    Ok(window)
}

/// Record the current geometry so the next launch restores it. Invoked on
/// close-to-tray; failures only cost the saved position.
pub fn persist_bounds<R: Runtime>(window: &tauri::Window<R>, settings: &SettingsStore) {
    let maximized = window.is_maximized().unwrap_or(false);
    if let (Ok(position), Ok(size)) = (window.outer_position(), window.inner_size()) {
        let bounds = WindowBounds {
            x: position.x as f64,
            y: position.y as f64,
            width: size.width as f64,
            height: size.height as f64,
        };
        if let Err(err) = settings.update_bounds(bounds, maximized) {
            warn!("Failed to persist window bounds: {err:?}");
        }
    }
}

/// Pop the right-click menu at the cursor. The page forwards its contextmenu
/// event here; item activations arrive in [`handle_menu_event`].
pub fn show_context_menu<R: Runtime>(window: &WebviewWindow<R>) -> tauri::Result<()> {
    let menu = Menu::with_items(
        window,
        &[
            &MenuItem::with_id(window, "nav-back", "Back", true, None::<&str>)?,
            &MenuItem::with_id(window, "nav-forward", "Forward", true, None::<&str>)?,
            &MenuItem::with_id(window, "nav-refresh", "Refresh", true, None::<&str>)?,
            &MenuItem::with_id(
                window,
                "copy-link",
                "Copy link of current page",
                true,
                None::<&str>,
            )?,
        ],
    )?;
    window.popup_menu(&menu)
}

pub fn handle_menu_event(app: &AppHandle, id: &str) {
    let Some(window) = app.get_webview_window(MAIN_WINDOW) else {
        return;
    };

    match id {
        "nav-back" => run_script(&window, "history.back()"),
        "nav-forward" => run_script(&window, "history.forward()"),
        "nav-refresh" => run_script(&window, "location.reload()"),
        "copy-link" => match window.url() {
            Ok(url) => {
                if let Err(err) = app.clipboard().write_text(url.to_string()) {
                    warn!("Failed to copy page link: {err}");
                }
            }
            Err(err) => warn!("Failed to read page url: {err}"),
        },
        _ => {}
    }
}

pub fn reload(app: &AppHandle) {
    if let Some(window) = app.get_webview_window(MAIN_WINDOW) {
        run_script(&window, "location.reload()");
    }
}

fn run_script<R: Runtime>(window: &WebviewWindow<R>, script: &str) {
    if let Err(err) = window.eval(script) {
        warn!("Failed to run {script}: {err}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_domain_and_subdomains() {
        assert!(is_allowed_host("soundcloud.com"));
        assert!(is_allowed_host("on.soundcloud.com"));
        assert!(is_allowed_host("api-v2.soundcloud.com"));
    }

    #[test]
    fn rejects_lookalike_and_foreign_hosts() {
        assert!(!is_allowed_host("example.com"));
        assert!(!is_allowed_host("soundcloud.com.evil.com"));
        assert!(!is_allowed_host("notsoundcloud.com"));
    }

    #[test]
    fn navigation_consults_the_engine_only_while_attached() {
        let slot = Mutex::new(Some(AdBlocker::from_filter_lines(&[
            "||soundcloud.com/charts^$document".to_string(),
        ])));
        let url: tauri::Url = "https://soundcloud.com/charts".parse().unwrap();

        assert!(!navigation_allowed(&url, &slot));

        // Toggling the blocker off empties the slot.
        slot.lock().unwrap().take();
        assert!(navigation_allowed(&url, &slot));
    }

    #[test]
    fn navigation_rejects_off_domain_targets_without_an_engine() {
        let slot = Mutex::new(None);
        let url: tauri::Url = "https://example.com/".parse().unwrap();
        assert!(!navigation_allowed(&url, &slot));
    }
}
