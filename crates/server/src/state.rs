use std::sync::Arc;
use std::time::Duration;

use moviezone_core::{
    Authenticator, Config, Directory, DownloadService, LinkBuilder, RequestStore,
    SanitizedConfig, TitleCatalog, TokenGateway, TokenSettings, TokenStore, TokenSweeper,
};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    catalog: Arc<dyn TitleCatalog>,
    gateway: Arc<TokenGateway>,
    downloads: DownloadService,
    requests: Arc<dyn RequestStore>,
    directory: Arc<Directory>,
    sweeper: TokenSweeper,
}

impl AppState {
    /// Wire the gateway, download flow and sweeper on top of the stores.
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        catalog: Arc<dyn TitleCatalog>,
        token_store: Arc<dyn TokenStore>,
        requests: Arc<dyn RequestStore>,
        directory: Arc<Directory>,
    ) -> Self {
        let gateway = Arc::new(TokenGateway::new(
            Arc::clone(&catalog),
            token_store,
            TokenSettings::from_config(&config.tokens),
        ));
        let downloads = DownloadService::new(
            Arc::clone(&gateway),
            LinkBuilder::from_config(&config.bot),
        );
        let sweeper = TokenSweeper::new(
            Arc::clone(&gateway),
            Duration::from_secs(config.tokens.sweep_interval_secs),
        );

        Self {
            config,
            authenticator,
            catalog,
            gateway,
            downloads,
            requests,
            directory,
            sweeper,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn catalog(&self) -> &dyn TitleCatalog {
        self.catalog.as_ref()
    }

    pub fn gateway(&self) -> &TokenGateway {
        self.gateway.as_ref()
    }

    pub fn downloads(&self) -> &DownloadService {
        &self.downloads
    }

    pub fn requests(&self) -> &dyn RequestStore {
        self.requests.as_ref()
    }

    pub fn directory(&self) -> &Directory {
        self.directory.as_ref()
    }

    pub fn sweeper(&self) -> &TokenSweeper {
        &self.sweeper
    }
}
