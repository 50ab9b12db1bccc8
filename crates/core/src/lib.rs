pub mod auth;
pub mod catalog;
pub mod config;
pub mod directory;
pub mod links;
pub mod metrics;
pub mod requests;
pub mod storage;
pub mod testing;
pub mod tokens;

pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use catalog::{
    CatalogError, CatalogStats, CategoryFilter, CategoryPage, FileVariant, JsonCatalog, NewTitle,
    TitleCatalog, TitleRecord, TitleStats,
};
pub use config::{
    config_path_from_env, load_config, load_config_from_str, validate_config, AuthConfig,
    AuthMethod, BotConfig, CatalogConfig, Config, ConfigError, SanitizedConfig, ServerConfig,
    StorageConfig, TokenBackend, TokenConfig,
};
pub use directory::{
    AdminRecord, ChannelRecord, Directory, DirectoryError, NewAdmin, NewChannel, Role, UserRecord,
};
pub use links::{Delivery, DownloadLink, DownloadService, LinkBuilder, StartPayload};
pub use requests::{JsonRequestStore, RequestError, RequestRecord, RequestStatus, RequestStore};
pub use storage::StorageError;
pub use tokens::{
    ConsumeOutcome, GatewayError, IssuedToken, JsonTokenStore, Redemption, SqliteTokenStore,
    TokenError, TokenGateway, TokenRecord, TokenSettings, TokenStore, TokenSweeper,
};
