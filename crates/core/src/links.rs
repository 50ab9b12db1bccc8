//! Delivery links: the ad page URL a user visits before downloading, the
//! bot deep links used in channel posts, and the download flow tying them
//! to the token gateway.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::catalog::TitleRecord;
use crate::config::BotConfig;
use crate::tokens::{log_issue_failure, GatewayError, TokenGateway};

/// Builds user-facing URLs from the bot configuration.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    bot_username: String,
    ad_page_url: String,
}

/// What a `/start <payload>` deep link asks for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StartPayload {
    /// A channel post link: begin the download flow for this file.
    File { title_id: u64, quality: String },
    /// The ad page sent the user back with their token.
    Token { token: String },
    /// Plain `/start` or garbage.
    Unknown,
}

impl LinkBuilder {
    pub fn new(bot_username: impl Into<String>, ad_page_url: impl Into<String>) -> Self {
        Self {
            bot_username: bot_username.into(),
            ad_page_url: ad_page_url.into(),
        }
    }

    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.username.clone(), config.ad_page_url.clone())
    }

    /// `<ad_page_url>?token=<token>&uid=<user_id>`.
    pub fn ad_link(&self, token: &str, user_id: i64) -> String {
        let separator = if self.ad_page_url.contains('?') {
            '&'
        } else {
            '?'
        };
        format!(
            "{}{}token={}&uid={}",
            self.ad_page_url,
            separator,
            urlencoding::encode(token),
            user_id
        )
    }

    /// Deep link that opens the bot on one file of a title.
    pub fn file_deep_link(&self, title_id: u64, quality: &str) -> String {
        format!(
            "https://t.me/{}?start=file_{}_{}",
            self.bot_username,
            title_id,
            urlencoding::encode(quality)
        )
    }

    /// Links for a channel post, as `(quality, url)` pairs.
    ///
    /// Movies get one link per quality in label order. Series get a single
    /// link to their first episode.
    pub fn post_links(&self, title: &TitleRecord) -> Vec<(String, String)> {
        if title.is_series {
            title
                .files
                .keys()
                .find(|q| q.starts_with('E'))
                .map(|q| vec![(q.clone(), self.file_deep_link(title.id, q))])
                .unwrap_or_default()
        } else {
            title
                .files
                .keys()
                .map(|q| (q.clone(), self.file_deep_link(title.id, q)))
                .collect()
        }
    }

    /// Decode the argument of a `/start` command.
    pub fn parse_start_payload(payload: &str) -> StartPayload {
        let payload = payload.trim();
        if payload.is_empty() {
            return StartPayload::Unknown;
        }

        if let Some(rest) = payload.strip_prefix("file_") {
            return match rest.split_once('_') {
                Some((id, quality)) if !quality.is_empty() => match id.parse() {
                    Ok(title_id) => StartPayload::File {
                        title_id,
                        quality: urlencoding::decode(quality)
                            .map(|q| q.into_owned())
                            .unwrap_or_else(|_| quality.to_string()),
                    },
                    Err(_) => StartPayload::Unknown,
                },
                _ => StartPayload::Unknown,
            };
        }

        StartPayload::Token {
            token: payload.to_string(),
        }
    }
}

/// A download in progress: the user must open `url` to get their file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadLink {
    pub token: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// A file ready to be sent to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    pub file_id: String,
    pub title_id: u64,
    pub quality: String,
}

/// Two-step download flow: hand out an ad link, later trade the token
/// coming back from it for a file.
pub struct DownloadService {
    gateway: Arc<TokenGateway>,
    links: LinkBuilder,
}

impl DownloadService {
    pub fn new(gateway: Arc<TokenGateway>, links: LinkBuilder) -> Self {
        Self { gateway, links }
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Issue a token and wrap it in an ad link. A
    /// [`GatewayError::NotFound`] means the title or quality does not exist;
    /// anything else left no token behind and may be retried.
    pub fn start(
        &self,
        user_id: i64,
        title_id: u64,
        quality: &str,
    ) -> Result<DownloadLink, GatewayError> {
        let issued = self
            .gateway
            .issue(user_id, title_id, quality)
            .inspect_err(|e| log_issue_failure(user_id, title_id, quality, e))?;

        let url = self.links.ad_link(&issued.token, user_id);
        debug!("Ad link ready for user {} (title {} {})", user_id, title_id, quality);

        Ok(DownloadLink {
            token: issued.token,
            url,
            expires_at: issued.expires_at,
        })
    }

    /// Redeem the token the user came back with. Every failure looks the same.
    pub fn finish(&self, token: &str, user_id: i64) -> Option<Delivery> {
        let redemption = self.gateway.redeem(token, user_id).ok()?;
        info!(
            "Delivering title {} ({}) to user {}",
            redemption.title_id, redemption.quality, user_id
        );
        Some(Delivery {
            file_id: redemption.file_id,
            title_id: redemption.title_id,
            quality: redemption.quality,
        })
    }
}
