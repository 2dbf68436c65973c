use serde::Deserialize;

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// API key for the web search provider
    pub search_api_key: String,

    /// Base URL of the web search provider
    #[serde(default = "default_search_api_url")]
    pub search_api_url: String,

    /// Email of the local dashboard user established on login
    #[serde(default = "default_session_email")]
    pub session_email: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_search_api_url() -> String {
    "https://serpapi.com".to_string()
}

fn default_session_email() -> String {
    "creator@viralscope.local".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
