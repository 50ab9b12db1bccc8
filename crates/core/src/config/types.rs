use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub tokens: TokenConfig,
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Required when `method = "api_key"`.
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

/// Where the JSON collections and the optional token database live.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default)]
    pub token_backend: TokenBackend,
    /// Defaults to `<data_dir>/tokens.db`.
    #[serde(default)]
    pub sqlite_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            token_backend: TokenBackend::default(),
            sqlite_path: None,
        }
    }
}

impl StorageConfig {
    pub fn movies_path(&self) -> PathBuf {
        self.data_dir.join("movies.json")
    }

    pub fn tokens_path(&self) -> PathBuf {
        self.data_dir.join("tokens.json")
    }

    pub fn requests_path(&self) -> PathBuf {
        self.data_dir.join("requests.json")
    }

    pub fn users_path(&self) -> PathBuf {
        self.data_dir.join("users.json")
    }

    pub fn admins_path(&self) -> PathBuf {
        self.data_dir.join("admins.json")
    }

    pub fn channels_path(&self) -> PathBuf {
        self.data_dir.join("channels.json")
    }

    pub fn token_db_path(&self) -> PathBuf {
        self.sqlite_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("tokens.db"))
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Token storage backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenBackend {
    #[default]
    Json,
    Sqlite,
}

/// Download token settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    /// Secret mixed into every token. A random one is generated at startup
    /// when unset, which invalidates outstanding tokens on restart.
    #[serde(default)]
    pub secret: Option<String>,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u32,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// Number of hex characters kept from the digest.
    #[serde(default = "default_token_length")]
    pub token_length: usize,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_hours: default_ttl_hours(),
            sweep_interval_secs: default_sweep_interval(),
            token_length: default_token_length(),
        }
    }
}

fn default_ttl_hours() -> u32 {
    24
}

fn default_sweep_interval() -> u64 {
    3600
}

fn default_token_length() -> usize {
    32
}

/// Bot identity and the ad page users pass through before a download.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BotConfig {
    /// Telegram id of the bot owner. 0 means nobody is owner.
    #[serde(default)]
    pub owner_id: i64,
    #[serde(default = "default_bot_username")]
    pub username: String,
    #[serde(default = "default_ad_page_url")]
    pub ad_page_url: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            owner_id: 0,
            username: default_bot_username(),
            ad_page_url: default_ad_page_url(),
        }
    }
}

fn default_bot_username() -> String {
    "MovieZoneBot".to_string()
}

fn default_ad_page_url() -> String {
    "https://moviezone.example/ad.html".to_string()
}

/// Reference lists shown to uploaders and browsers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_all_category_label")]
    pub all_category_label: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            languages: default_languages(),
            all_category_label: default_all_category_label(),
        }
    }
}

fn default_categories() -> Vec<String> {
    [
        "🎬 Bollywood",
        "🧑‍🎤 Hollywood",
        "🎪 South Indian",
        "📺 Web Series",
        "✨ Bengali",
        "🎨 Animation",
        "😂 Comedy",
        "💥 Action",
        "❤️ Romance",
        "😱 Horror",
        "🔎 Thriller",
        "🛸 Sci-Fi",
        "🏮 K-Drama",
        "🔞 18+",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_languages() -> Vec<String> {
    [
        "Bengali", "Hindi", "English", "Tamil", "Telugu", "Korean", "Gujarati",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_all_category_label() -> String {
    "All 🌐".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub tokens: SanitizedTokenConfig,
    pub bot: BotConfig,
    pub catalog: CatalogConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub api_key_configured: bool,
}

/// Token settings with the secret hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTokenConfig {
    pub secret_configured: bool,
    pub ttl_hours: u32,
    pub sweep_interval_secs: u64,
    pub token_length: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::None => "none".to_string(),
                    AuthMethod::ApiKey => "api_key".to_string(),
                },
                api_key_configured: config
                    .auth
                    .api_key
                    .as_ref()
                    .is_some_and(|k| !k.is_empty()),
            },
            server: config.server.clone(),
            storage: config.storage.clone(),
            tokens: SanitizedTokenConfig {
                secret_configured: config.tokens.secret.is_some(),
                ttl_hours: config.tokens.ttl_hours,
                sweep_interval_secs: config.tokens.sweep_interval_secs,
                token_length: config.tokens.token_length,
            },
            bot: config.bot.clone(),
            catalog: config.catalog.clone(),
        }
    }
}
