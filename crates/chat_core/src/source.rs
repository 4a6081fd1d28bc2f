use serde::{Deserialize, Serialize};
use url::Url;

/// Hosts that count as internal no matter which page is serving the client.
const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1"];

pub const UNKNOWN_SOURCE_NAME: &str = "未知来源";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Internal,
    External,
}

/// Resolved internal/external classification of a cited source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    Internal,
    External,
}

impl Provenance {
    pub fn is_external(self) -> bool {
        self == Provenance::External
    }
}

/// One citation target of a message, as delivered by the source channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRecord {
    pub key: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
}

impl SourceRecord {
    pub fn new(key: u32, title: impl Into<String>) -> Self {
        Self {
            key,
            title: title.into(),
            content: String::new(),
            url: None,
            favicon: None,
            source_type: None,
            domain: None,
            source_name: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Name shown next to the favicon: source name, then domain, then a
    /// placeholder.
    pub fn display_name(&self) -> &str {
        self.source_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| self.domain.as_deref().filter(|d| !d.is_empty()))
            .unwrap_or(UNKNOWN_SOURCE_NAME)
    }

    /// Url to open on click, if any. Empty strings count as absent.
    pub fn link(&self) -> Option<&str> {
        self.url.as_deref().filter(|url| !url.trim().is_empty())
    }
}

/// Classifies sources against the host the client is served from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvenanceResolver {
    page_host: Option<String>,
}

impl ProvenanceResolver {
    pub fn new(page_host: impl Into<String>) -> Self {
        let host = page_host.into().trim().to_ascii_lowercase();
        Self {
            page_host: (!host.is_empty()).then_some(host),
        }
    }

    pub fn page_host(&self) -> Option<&str> {
        self.page_host.as_deref()
    }

    /// Explicit tag first, then the url heuristic. Never fails: anything that
    /// cannot be classified is internal.
    pub fn resolve(&self, source: &SourceRecord) -> Provenance {
        if let Some(source_type) = source.source_type {
            return match source_type {
                SourceType::Internal => Provenance::Internal,
                SourceType::External => Provenance::External,
            };
        }
        let Some(raw) = source.link() else {
            return Provenance::Internal;
        };
        // Relative paths do not parse as absolute urls and stay internal.
        let Ok(url) = Url::parse(raw.trim()) else {
            return Provenance::Internal;
        };
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_ascii_lowercase(),
            _ => return Provenance::Internal,
        };
        if self.is_internal_host(&host) {
            Provenance::Internal
        } else {
            Provenance::External
        }
    }

    pub fn is_external(&self, source: &SourceRecord) -> bool {
        self.resolve(source).is_external()
    }

    fn is_internal_host(&self, host: &str) -> bool {
        if let Some(page) = self.page_host.as_deref() {
            if host == page || host.contains(page) {
                return true;
            }
        }
        LOOPBACK_HOSTS.iter().any(|internal| host.contains(internal))
    }
}
