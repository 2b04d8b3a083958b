//! Initialization script evaluated before soundcloud.com starts loading.
//!
//! Wires the in-window keyboard shortcuts and the context-menu forwarder to
//! the shell commands. Navigation-only shortcuts stay inside the page via the
//! history API; anything touching settings crosses the invoke boundary.

pub const INIT_SCRIPT: &str = r#"(function () {
  if (window.__scShellInit) return;
  window.__scShellInit = true;

  var invoke = function (command, args) {
    if (window.__TAURI__ && window.__TAURI__.core) {
      window.__TAURI__.core.invoke(command, args || {});
    }
  };

  window.addEventListener('keydown', function (event) {
    var mod = event.ctrlKey || event.metaKey;
    switch (event.key) {
      case 'F1':
        event.preventDefault();
        invoke('toggle_dark_mode');
        break;
      case 'F2':
        event.preventDefault();
        invoke('toggle_ad_blocker');
        break;
      case 'F3':
        event.preventDefault();
        var uri = window.prompt('Enter proxy, type 0 to disable proxy', 'http://user:password@ip:port');
        if (uri !== null) invoke('set_proxy', { uri: uri });
        break;
      case 'F5':
        event.preventDefault();
        location.reload();
        break;
      case 'b':
      case 'p':
        if (mod) { event.preventDefault(); history.back(); }
        break;
      case 'n':
        if (mod) { event.preventDefault(); history.forward(); }
        break;
      case 'r':
        if (mod) { event.preventDefault(); location.reload(); }
        break;
    }
  });

  window.addEventListener('contextmenu', function (event) {
    event.preventDefault();
    invoke('show_context_menu');
  });
})();"#;
