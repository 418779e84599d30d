use std::fmt;

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    LinkedIn,
}

impl Platform {
    pub fn from_host(host: &str) -> Option<Self> {
        let host = host.to_ascii_lowercase();
        if on_domain(&host, "linkedin.com") {
            Some(Platform::LinkedIn)
        } else if on_domain(&host, "twitter.com") || on_domain(&host, "x.com") {
            Some(Platform::Twitter)
        } else {
            None
        }
    }

    pub fn from_page_url(raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        url.host_str().and_then(Self::from_host)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Platform::Twitter => "twitter",
            Platform::LinkedIn => "linkedin",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Platform::Twitter => "Twitter/X",
            Platform::LinkedIn => "LinkedIn",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn on_domain(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Fields pulled out of one rendered post. Rebuilt from the live tree on every
/// extraction and dropped once a verdict exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub actor_name: String,
    pub actor_description: String,
    pub actor_sub_description: String,
    pub post_content: String,
    pub platform: Platform,
}
