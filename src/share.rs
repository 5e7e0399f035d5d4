//! Shareable result links.

use crate::state::HistoryBuffer;

/// Web front-end that renders shared measurements
pub const DEFAULT_SHARE_BASE: &str = "https://globalping.io";

/// A composed share link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub url: String,
    /// The link covers fewer runs than the session performed
    pub truncated: bool,
    /// Single-probe form: one ID, no multi-location framing
    pub single_probe: bool,
}

/// Composes share links from a session's run history
#[derive(Debug, Clone)]
pub struct ShareLinkBuilder {
    base: String,
}

impl Default for ShareLinkBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SHARE_BASE)
    }
}

impl ShareLinkBuilder {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, ids: &str) -> String {
        format!("{}?measurement={}", self.base, ids)
    }

    /// Build the link for a session that performed `runs` runs over `probes` probes.
    ///
    /// Returns None when no run has been recorded.
    pub fn build(&self, history: &HistoryBuffer, runs: u32, probes: usize) -> Option<ShareLink> {
        if probes == 1 {
            let last = history.last()?;
            return Some(ShareLink {
                url: self.url_for(last),
                truncated: false,
                single_probe: true,
            });
        }

        if history.is_empty() {
            return None;
        }

        Some(ShareLink {
            url: self.url_for(&history.join(".")),
            truncated: runs as usize > history.capacity(),
            single_probe: false,
        })
    }
}
