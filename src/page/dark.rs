//! Bundled dark-mode stylesheet for soundcloud.com, injected after each page
//! load when the toggle is enabled.

pub const DARK_MODE_CSS: &str = r#"
:root {
  --sc-shell-bg: #121212;
  --sc-shell-surface: #1c1c1c;
  --sc-shell-border: #2c2c2c;
  --sc-shell-text: #e6e6e6;
  --sc-shell-text-dim: #a0a0a0;
}

body,
.l-container,
.l-fluid-fixed,
.sc-classic .body {
  background-color: var(--sc-shell-bg) !important;
  color: var(--sc-shell-text) !important;
}

.header,
.header__inner,
.playControls,
.playControls__inner,
.modal__modal,
.dropdownMenu,
.headerMenu__list {
  background-color: var(--sc-shell-surface) !important;
  border-color: var(--sc-shell-border) !important;
}

.soundList__item,
.sound__body,
.searchList__item,
.commentItem,
.sidebarModule,
.userBadgeList__item {
  background-color: transparent !important;
  border-color: var(--sc-shell-border) !important;
}

.soundTitle__title,
.soundTitle__username,
.sc-link-dark,
.sc-text,
.commentItem__body,
.sc-ministats {
  color: var(--sc-shell-text) !important;
}

.sc-link-light,
.sc-text-light,
.sc-text-secondary,
.playbackTimeline__timePassed,
.playbackTimeline__duration {
  color: var(--sc-shell-text-dim) !important;
}

input.headerSearch__input,
.textfield__input,
.sc-input {
  background-color: var(--sc-shell-surface) !important;
  border-color: var(--sc-shell-border) !important;
  color: var(--sc-shell-text) !important;
}
"#;
