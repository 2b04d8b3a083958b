use adblock::{
    lists::{FilterSet, ParseOptions},
    request::Request,
    Engine,
};
use anyhow::{Context, Result};
use log::{info, warn};
use std::path::Path;

/// Filter list sources, mirroring the full-list set the shell has always
/// shipped with.
const FILTER_LIST_SOURCES: &[&str] = &[
    "https://easylist.to/easylist/easylist.txt",
    "https://easylist.to/easylist/easyprivacy.txt",
    "https://secure.fanboy.co.nz/fanboy-annoyance.txt",
];

/// Content-filtering engine wrapper.
///
/// Attachment to the browsing session happens at two points: the navigation
/// filter consults [`AdBlocker::matches`] for document requests, and each
/// finished page load injects the per-URL cosmetic hiding stylesheet.
pub struct AdBlocker {
    engine: Engine,
}

impl AdBlocker {
    /// Deserialize the cached engine at `cache_path`, or fetch the filter
    /// lists and build (and cache) a fresh one.
    pub async fn load(cache_path: &Path) -> Result<Self> {
        if let Ok(bytes) = tokio::fs::read(cache_path).await {
            let mut engine = Engine::default();
            if engine.deserialize(&bytes).is_ok() {
                info!("Loaded filter engine from {}", cache_path.display());
                return Ok(Self { engine });
            }
            warn!("Cached filter engine is unreadable, refetching lists");
        }

        let mut lines: Vec<String> = Vec::new();
        for source in FILTER_LIST_SOURCES {
            let body = reqwest::get(*source)
                .await
                .with_context(|| format!("failed to fetch filter list {source}"))?
                .text()
                .await
                .with_context(|| format!("failed to read filter list {source}"))?;
            lines.extend(body.lines().map(str::to_string));
        }
        info!(
            "Fetched {} filter rules from {} lists",
            lines.len(),
            FILTER_LIST_SOURCES.len()
        );

        let blocker = Self::from_filter_lines(&lines);

        match blocker.engine.serialize_raw() {
            Ok(bytes) => {
                if let Err(err) = tokio::fs::write(cache_path, bytes).await {
                    warn!(
                        "Failed to cache filter engine at {}: {err}",
                        cache_path.display()
                    );
                }
            }
            Err(err) => warn!("Failed to serialize filter engine: {err:?}"),
        }

        Ok(blocker)
    }

    pub fn from_filter_lines(lines: &[String]) -> Self {
        let mut filter_set = FilterSet::new(false);
        filter_set.add_filters(lines, ParseOptions::default());
        Self {
            engine: Engine::from_filter_set(filter_set, true),
        }
    }

    /// Network-filter check for a single request. Unparseable requests are
    /// let through.
    pub fn matches(&self, url: &str, source_url: &str, request_type: &str) -> bool {
        Request::new(url, source_url, request_type)
            .map(|request| self.engine.check_network_request(&request).matched)
            .unwrap_or(false)
    }

    /// Whether a main-frame navigation target should be blocked.
    pub fn should_block_navigation(&self, url: &str) -> bool {
        self.matches(url, url, "document")
    }

    /// Cosmetic hiding stylesheet for the given page URL, or `None` when no
    /// selectors apply.
    pub fn hiding_stylesheet(&self, url: &str) -> Option<String> {
        let resources = self.engine.url_cosmetic_resources(url);
        if resources.hide_selectors.is_empty() {
            return None;
        }

        let selectors: Vec<&str> = resources
            .hide_selectors
            .iter()
            .map(String::as_str)
            .collect();
        Some(format!(
            "{}{{display:none !important;}}",
            selectors.join(",")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocker() -> AdBlocker {
        AdBlocker::from_filter_lines(&[
            "||ads.example.com^".to_string(),
            "example.com##.promoted".to_string(),
        ])
    }

    #[test]
    fn network_filter_matches_third_party_script() {
        let blocker = blocker();
        assert!(blocker.matches(
            "https://ads.example.com/banner.js",
            "https://soundcloud.com/discover",
            "script"
        ));
        assert!(!blocker.matches(
            "https://cdn.example.org/app.js",
            "https://soundcloud.com/discover",
            "script"
        ));
    }

    #[test]
    fn cosmetic_selectors_apply_to_their_host_only() {
        let blocker = blocker();
        let sheet = blocker
            .hiding_stylesheet("https://example.com/page")
            .expect("selectors for example.com");
        assert!(sheet.contains(".promoted"));
        assert!(sheet.contains("display:none"));

        assert!(blocker
            .hiding_stylesheet("https://soundcloud.com/discover")
            .is_none());
    }

    #[test]
    fn unparseable_request_is_let_through() {
        let blocker = blocker();
        assert!(!blocker.matches("not a url", "also not", "script"));
    }
}
