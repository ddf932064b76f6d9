use serde::Deserialize;

/// Default Graph API endpoint for the ad archive
pub const DEFAULT_API_ENDPOINT: &str = "https://graph.facebook.com/v18.0/ads_archive";

/// Fields requested from the API when the config does not list any
pub const DEFAULT_API_FIELDS: &[&str] = &[
    "id",
    "ad_creation_time",
    "ad_creative_bodies",
    "ad_creative_link_captions",
    "ad_creative_link_descriptions",
    "ad_creative_link_titles",
    "ad_delivery_start_time",
    "ad_delivery_stop_time",
    "ad_snapshot_url",
    "currency",
    "demographic_distribution",
    "funding_entity",
    "impressions",
    "page_id",
    "page_name",
    "publisher_platforms",
    "spend",
];

/// Main configuration structure for Adlib-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Fetch layer configuration shared by both modes
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Timeout applied to every request (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Structured API connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Ad archive endpoint
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Access token passed as the `access_token` query parameter
    #[serde(rename = "access-token", default)]
    pub access_token: Option<String>,

    /// Fields requested for every ad
    #[serde(default = "default_fields")]
    pub fields: Vec<String>,

    /// Cooldown after a rate-limit response (seconds)
    #[serde(rename = "rate-limit-cooldown-secs", default = "default_cooldown_secs")]
    pub rate_limit_cooldown_secs: u64,

    /// Courtesy pause between successful rounds (milliseconds)
    #[serde(rename = "polite-delay-ms", default = "default_polite_delay_ms")]
    pub polite_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            access_token: None,
            fields: default_fields(),
            rate_limit_cooldown_secs: default_cooldown_secs(),
            polite_delay_ms: default_polite_delay_ms(),
        }
    }
}

/// Delivery status filter for structured searches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActiveStatus {
    #[default]
    All,
    Active,
    Inactive,
}

impl ActiveStatus {
    /// Value sent as `ad_active_status`
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::Active => "ACTIVE",
            Self::Inactive => "INACTIVE",
        }
    }
}

/// Ad format filter for structured searches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdType {
    #[default]
    All,
    PoliticalAndIssueAds,
    HousingAds,
    EmploymentAds,
    CreditAds,
}

impl AdType {
    /// Value sent as `ad_type`
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::All => "ALL",
            Self::PoliticalAndIssueAds => "POLITICAL_AND_ISSUE_ADS",
            Self::HousingAds => "HOUSING_ADS",
            Self::EmploymentAds => "EMPLOYMENT_ADS",
            Self::CreditAds => "CREDIT_ADS",
        }
    }
}

/// Structured search parameters
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Free-text query; omitted from the request when absent
    #[serde(rename = "search-terms", default)]
    pub search_terms: Option<String>,

    /// Countries the ads reached (ISO 3166-1 alpha-2)
    #[serde(default = "default_countries")]
    pub countries: Vec<String>,

    #[serde(rename = "active-status", default)]
    pub active_status: ActiveStatus,

    #[serde(rename = "ad-type", default)]
    pub ad_type: AdType,

    /// Page size requested per round
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Maximum number of rounds
    #[serde(rename = "max-pages", default = "default_search_max_pages")]
    pub max_pages: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            search_terms: None,
            countries: default_countries(),
            active_status: ActiveStatus::default(),
            ad_type: AdType::default(),
            limit: default_limit(),
            max_pages: default_search_max_pages(),
        }
    }
}

/// Crawl mode parameters
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Seed URLs, fetched at depth 0
    #[serde(default)]
    pub seeds: Vec<String>,

    /// Result budget; the crawl stops once this many records were collected
    #[serde(rename = "max-pages", default = "default_crawl_max_pages")]
    pub max_pages: u32,

    /// Depth limit; 1 means single-page mode
    #[serde(rename = "max-depth", default = "default_max_depth")]
    pub max_depth: u32,

    /// Host substrings a discovered link must contain (empty = no restriction)
    #[serde(rename = "allowed-domains", default)]
    pub allowed_domains: Vec<String>,

    /// Maximum number of pages fetched at once
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            max_pages: default_crawl_max_pages(),
            max_depth: default_max_depth(),
            allowed_domains: Vec::new(),
            concurrency: default_concurrency(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    /// Path of a JSON Lines file receiving one record per line
    #[serde(rename = "jsonl-path", default)]
    pub jsonl_path: Option<String>,

    /// Path to the SQLite database file
    #[serde(rename = "database-path", default)]
    pub database_path: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("Adlib-Harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_endpoint() -> String {
    DEFAULT_API_ENDPOINT.to_string()
}

fn default_fields() -> Vec<String> {
    DEFAULT_API_FIELDS.iter().map(|f| f.to_string()).collect()
}

fn default_cooldown_secs() -> u64 {
    60
}

fn default_polite_delay_ms() -> u64 {
    1000
}

fn default_countries() -> Vec<String> {
    vec!["IT".to_string()]
}

fn default_limit() -> u32 {
    100
}

fn default_search_max_pages() -> u32 {
    10
}

fn default_crawl_max_pages() -> u32 {
    50
}

fn default_max_depth() -> u32 {
    2
}

fn default_concurrency() -> u32 {
    4
}

/// Which controller drives a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// Token-paginated API search
    Search,
    /// Breadth-first crawl of rendered listing pages
    Crawl,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Crawl => "crawl",
        }
    }
}
