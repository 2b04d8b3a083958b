mod blocker;
mod page;
mod presence;
mod settings;
mod tray;
mod window;

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
};

use blocker::AdBlocker;
use log::{error, info, warn};
use page::PageBridge;
use presence::{DiscordPresence, PresenceController, PresenceSink};
use settings::{ProxySettings, SettingsStore};
use tauri::{AppHandle, Manager, State};
use tauri_plugin_dialog::DialogExt;
use tokio::sync::Mutex as AsyncMutex;

pub(crate) struct AppState {
    settings: SettingsStore,
    page: Arc<PageBridge>,
    presence: Arc<DiscordPresence>,
    presence_loop: AsyncMutex<PresenceController>,
    blocker: Arc<Mutex<Option<AdBlocker>>>,
    data_dir: PathBuf,
}

/// Response channel for the page query contract: the script evaluated by a
/// [`page::PageQuery`] delivers its value back through this command.
#[tauri::command]
fn page_response(id: u64, value: serde_json::Value, state: State<AppState>) {
    state.page.resolve(id, value);
}

#[tauri::command]
fn toggle_dark_mode(app: AppHandle, state: State<AppState>) -> Result<(), String> {
    let enabled = state.settings.toggle_dark_mode().map_err(|e| e.to_string())?;
    window::reload(&app);
    acknowledge(
        &app,
        if enabled {
            "Dark mode enabled"
        } else {
            "Dark mode disabled"
        },
    );
    Ok(())
}

#[tauri::command]
fn toggle_ad_blocker(app: AppHandle, state: State<AppState>) -> Result<(), String> {
    let enabled = state
        .settings
        .toggle_ad_blocker()
        .map_err(|e| e.to_string())?;

    if enabled {
        if state.blocker.lock().unwrap().is_none() {
            spawn_blocker_load(state.data_dir.join("engine.bin"), state.blocker.clone());
        }
    } else {
        // The navigation filter consults the slot directly, so disabling
        // must empty it; re-enabling reloads from the engine.bin cache.
        state.blocker.lock().unwrap().take();
    }

    window::reload(&app);
    acknowledge(
        &app,
        if enabled {
            "Adblocker enabled"
        } else {
            "Adblocker disabled"
        },
    );
    Ok(())
}

/// Apply the proxy URI from the F3 prompt. `0` disables. Either change only
/// takes effect on the next launch, so the app exits once acknowledged.
#[tauri::command]
fn set_proxy(uri: String, app: AppHandle, state: State<AppState>) -> Result<(), String> {
    if uri == "0" {
        state.settings.update_proxy(None).map_err(|e| e.to_string())?;
        acknowledge_then_exit(
            &app,
            "The proxy will be disabled after the application is restarted",
        );
        return Ok(());
    }

    match url::Url::parse(&uri) {
        Ok(parsed) if parsed.host_str().is_some() => {
            let host = match parsed.port() {
                Some(port) => format!("{}:{port}", parsed.host_str().unwrap_or_default()),
                None => parsed.host_str().unwrap_or_default().to_string(),
            };
            let proxy = ProxySettings {
                protocol: format!("{}:", parsed.scheme()),
                host,
                user: parsed.username().to_string(),
                password: parsed.password().unwrap_or_default().to_string(),
            };
            state
                .settings
                .update_proxy(Some(proxy))
                .map_err(|e| e.to_string())?;
            acknowledge_then_exit(
                &app,
                "The proxy will be applied after the application is restarted",
            );
        }
        _ => acknowledge(&app, "Failed to setup proxy"),
    }
    Ok(())
}

#[tauri::command]
fn show_context_menu(window: tauri::WebviewWindow) -> Result<(), String> {
    window::show_context_menu(&window).map_err(|e| e.to_string())
}

/// Fire-and-forget acknowledgement box, matching the original shell's
/// after-the-fact dialogs.
fn acknowledge(app: &AppHandle, message: &str) {
    app.dialog().message(message).title(" ").show(|_| {});
}

fn acknowledge_then_exit(app: &AppHandle, message: &str) {
    let handle = app.clone();
    app.dialog()
        .message(message)
        .title(" ")
        .show(move |_| handle.exit(0));
}

fn spawn_blocker_load(cache_path: PathBuf, slot: Arc<Mutex<Option<AdBlocker>>>) {
    tauri::async_runtime::spawn(async move {
        match AdBlocker::load(&cache_path).await {
            Ok(engine) => {
                *slot.lock().unwrap() = Some(engine);
                info!("Content filter ready");
            }
            Err(err) => error!("Failed to build content filter: {err:?}"),
        }
    });
}

fn inject_css<R: tauri::Runtime>(webview: &tauri::Webview<R>, css: &str) {
    let Ok(encoded) = serde_json::to_string(css) else {
        return;
    };
    let script = format!(
        "(function(){{var style=document.createElement('style');style.textContent={encoded};document.head.appendChild(style);}})();"
    );
    if let Err(err) = webview.eval(&script) {
        warn!("Failed to inject stylesheet: {err}");
    }
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("SoundCloud shell starting up...");

    tauri::Builder::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_clipboard_manager::init())
        .setup(|app| {
            let result = (|| -> anyhow::Result<()> {
                let app_data_dir = app
                    .path()
                    .app_data_dir()
                    .map_err(|err| anyhow::anyhow!(err))?;
                std::fs::create_dir_all(&app_data_dir)?;

                let settings = SettingsStore::new(app_data_dir.join("settings.json"))?;
                let startup = settings.snapshot();

                let blocker: Arc<Mutex<Option<AdBlocker>>> = Arc::new(Mutex::new(None));
                if startup.ad_blocker {
                    spawn_blocker_load(app_data_dir.join("engine.bin"), blocker.clone());
                }

                // Presence login happens once at startup; failure is logged
                // and non-fatal, the loop just has nowhere to publish.
                let presence = Arc::new(DiscordPresence::new());
                {
                    let presence = presence.clone();
                    tauri::async_runtime::spawn(async move {
                        if let Err(err) = presence.connect().await {
                            error!("{err:?}");
                        }
                    });
                }

                let page = Arc::new(PageBridge::new());

                let webview = window::build_main_window(app.handle(), &startup, blocker.clone())?;

                let mut controller = PresenceController::new();
                controller.start(
                    webview,
                    page.clone(),
                    presence.clone() as Arc<dyn PresenceSink>,
                )?;

                tray::init(app).map_err(|err| anyhow::anyhow!("tray setup failed: {err}"))?;

                app.manage(AppState {
                    settings,
                    page,
                    presence,
                    presence_loop: AsyncMutex::new(controller),
                    blocker,
                    data_dir: app_data_dir,
                });

                Ok(())
            })();

            result.map_err(|err| err.into())
        })
        .on_page_load(|webview, payload| {
            if !matches!(payload.event(), tauri::webview::PageLoadEvent::Finished) {
                return;
            }
            let Some(state) = webview.try_state::<AppState>() else {
                return;
            };

            if state.settings.dark_mode() {
                inject_css(&webview, page::dark::DARK_MODE_CSS);
            }

            if state.settings.ad_blocker() {
                if let Some(engine) = state.blocker.lock().unwrap().as_ref() {
                    if let Some(sheet) = engine.hiding_stylesheet(payload.url().as_str()) {
                        inject_css(&webview, &sheet);
                    }
                }
            }
        })
        .on_window_event(|window, event| {
            if let tauri::WindowEvent::CloseRequested { api, .. } = event {
                if window.label() == window::MAIN_WINDOW {
                    let state = window.state::<AppState>();
                    window::persist_bounds(window, &state.settings);
                    api.prevent_close();
                    let _ = window.hide();
                }
            }
        })
        .on_menu_event(|app, event| window::handle_menu_event(app, event.id().as_ref()))
        .invoke_handler(tauri::generate_handler![
            page_response,
            toggle_dark_mode,
            toggle_ad_blocker,
            set_proxy,
            show_context_menu,
        ])
        .build(tauri::generate_context!())
        .expect("error while building tauri application")
        .run(|app, event| {
            if let tauri::RunEvent::Exit = event {
                let state = app.state::<AppState>();
                tauri::async_runtime::block_on(async {
                    if let Err(err) = state.presence_loop.lock().await.stop().await {
                        warn!("Presence loop shutdown failed: {err:?}");
                    }
                });
                state.presence.disconnect();
            }
        });
}
