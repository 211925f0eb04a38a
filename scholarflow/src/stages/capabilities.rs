//! Search capabilities a stage may ask the completion service to use.
//!
//! These are declarations only; the completion service performs the searches.

use serde::{Deserialize, Serialize};

/// How much retrieved content the web search feeds back to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchContextSize {
    /// Smallest context.
    Low,
    /// Balanced context.
    #[default]
    Medium,
    /// Largest context.
    High,
}

impl SearchContextSize {
    /// Wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Approximate user location hint for web search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLocation {
    /// Two-letter country code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    /// Region or state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// City.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// IANA timezone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

impl UserLocation {
    /// An approximate location with no details.
    #[must_use]
    pub fn approximate() -> Self {
        Self::default()
    }

    /// Sets the country.
    #[must_use]
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }

    /// Sets the timezone.
    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }
}

/// Web search parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSearchConfig {
    /// Domains the search is restricted to; empty means unrestricted.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
    /// Context size hint.
    #[serde(default)]
    pub search_context_size: SearchContextSize,
    /// Approximate location hint.
    #[serde(default)]
    pub user_location: UserLocation,
}

impl WebSearchConfig {
    /// Creates an unrestricted web search with medium context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the search to the given domains.
    #[must_use]
    pub fn with_allowed_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the context size hint.
    #[must_use]
    pub fn with_context_size(mut self, size: SearchContextSize) -> Self {
        self.search_context_size = size;
        self
    }

    /// Sets the location hint.
    #[must_use]
    pub fn with_user_location(mut self, location: UserLocation) -> Self {
        self.user_location = location;
        self
    }
}

/// Document search parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSearchConfig {
    /// Document collections to search.
    pub vector_store_ids: Vec<String>,
}

impl FileSearchConfig {
    /// Creates a file search over the given collections.
    #[must_use]
    pub fn new<I, S>(vector_store_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            vector_store_ids: vector_store_ids.into_iter().map(Into::into).collect(),
        }
    }
}

/// A capability enabled for a stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Capability {
    /// Web search.
    WebSearch(WebSearchConfig),
    /// Document search.
    FileSearch(FileSearchConfig),
}

impl Capability {
    /// Short identifier used in logs.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::WebSearch(_) => "web_search",
            Self::FileSearch(_) => "file_search",
        }
    }
}
