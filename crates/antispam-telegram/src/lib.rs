// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram platform adapter for the antispam bot.
//!
//! Implements [`ChatPlatform`] and [`MediaResolver`] for the Telegram Bot API
//! via teloxide: long polling feeds a bounded queue of inbound updates, and
//! moderation actions map onto `deleteMessage` / `banChatMember`.

pub mod handler;
pub mod media;

use async_trait::async_trait;
use antispam_config::model::TelegramConfig;
use antispam_core::error::AntispamError;
use antispam_core::traits::{ChatPlatform, MediaResolver};
use antispam_core::types::InboundUpdate;
use teloxide::prelude::*;
use teloxide::types::{ChatId, MessageId, ParseMode, UserId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Capacity of the queue between the poller and the workers.
const INBOUND_QUEUE_SIZE: usize = 100;

/// Telegram adapter implementing [`ChatPlatform`] and [`MediaResolver`].
pub struct TelegramPlatform {
    bot: Bot,
    help_message: String,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundUpdate>>,
    inbound_tx: Option<mpsc::Sender<InboundUpdate>>,
}

impl TelegramPlatform {
    /// Creates a new Telegram adapter.
    ///
    /// Requires `config.bot_token` to be set.
    pub fn new(config: &TelegramConfig, help_message: String) -> Result<Self, AntispamError> {
        let token = config.bot_token.as_deref().ok_or_else(|| {
            AntispamError::Config("telegram.bot_token is required for Telegram adapter".into())
        })?;

        if token.is_empty() {
            return Err(AntispamError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }

        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE_SIZE);

        Ok(Self {
            bot: Bot::new(token),
            help_message,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            inbound_tx: Some(inbound_tx),
        })
    }

    /// Returns a reference to the underlying teloxide Bot.
    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    /// Starts long polling until `cancel` fires and returns the polling task.
    ///
    /// When polling stops the inbound queue closes, so [`ChatPlatform::next_update`]
    /// returns `None` once the buffered updates are drained.
    pub async fn connect(
        &mut self,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>, AntispamError> {
        let Some(tx) = self.inbound_tx.take() else {
            return Err(AntispamError::Internal(
                "Telegram adapter is already connected".into(),
            ));
        };

        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| AntispamError::Platform {
                message: format!("failed to reach Telegram Bot API: {e}"),
                source: Some(Box::new(e)),
            })?;
        info!(username = %me.username(), "starting Telegram long polling");

        let bot = self.bot.clone();
        let handle = tokio::spawn(async move {
            let handler = dptree::endpoint(move |update: Update| {
                let tx = tx.clone();
                async move {
                    if let Some(inbound) = handler::to_inbound_update(&update)
                        && tx.send(inbound).await.is_err()
                    {
                        warn!("inbound queue closed, dropping update");
                    }
                    respond(())
                }
            });

            let mut dispatcher = Dispatcher::builder(bot, handler).build();
            let shutdown = dispatcher.shutdown_token();
            tokio::spawn(async move {
                cancel.cancelled().await;
                match shutdown.shutdown() {
                    Ok(done) => done.await,
                    Err(e) => debug!(error = %e, "dispatcher was not running"),
                }
            });

            dispatcher.dispatch().await;
            info!("Telegram long polling stopped");
        });

        Ok(handle)
    }
}

/// Parses a chat id string into a teloxide [`ChatId`].
fn parse_chat_id(chat_id: &str) -> Result<ChatId, AntispamError> {
    chat_id
        .parse::<i64>()
        .map(ChatId)
        .map_err(|e| AntispamError::platform(format!("invalid chat_id `{chat_id}`: {e}")))
}

#[async_trait]
impl ChatPlatform for TelegramPlatform {
    async fn next_update(&self) -> Option<InboundUpdate> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await
    }

    async fn delete_message(&self, chat_id: &str, message_id: &str) -> Result<(), AntispamError> {
        let chat_id = parse_chat_id(chat_id)?;
        let msg_id = message_id
            .parse::<i32>()
            .map(MessageId)
            .map_err(|e| {
                AntispamError::platform(format!("invalid message_id `{message_id}`: {e}"))
            })?;

        self.bot
            .delete_message(chat_id, msg_id)
            .await
            .map_err(|e| AntispamError::Platform {
                message: format!("failed to delete message: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }

    async fn ban_member(&self, chat_id: &str, user_id: &str) -> Result<(), AntispamError> {
        let chat_id = parse_chat_id(chat_id)?;
        let user_id = user_id
            .parse::<u64>()
            .map(UserId)
            .map_err(|e| AntispamError::platform(format!("invalid user_id `{user_id}`: {e}")))?;

        self.bot
            .ban_chat_member(chat_id, user_id)
            .revoke_messages(false)
            .await
            .map_err(|e| AntispamError::Platform {
                message: format!("failed to ban chat member: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }

    async fn send_help(&self, chat_id: &str) -> Result<(), AntispamError> {
        let chat_id = parse_chat_id(chat_id)?;
        self.bot
            .send_message(chat_id, &self.help_message)
            .parse_mode(ParseMode::Html)
            .await
            .map_err(|e| AntispamError::Platform {
                message: format!("failed to send help message: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(())
    }
}

#[async_trait]
impl MediaResolver for TelegramPlatform {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>, AntispamError> {
        media::download_file(&self.bot, file_id).await
    }
}

/// Standalone media resolver for tools that only download files.
#[derive(Clone)]
pub struct TelegramMedia {
    bot: Bot,
}

impl TelegramMedia {
    /// Creates a resolver from a bot token.
    pub fn new(token: &str) -> Result<Self, AntispamError> {
        if token.is_empty() {
            return Err(AntispamError::Config(
                "telegram.bot_token cannot be empty".into(),
            ));
        }
        Ok(Self {
            bot: Bot::new(token),
        })
    }
}

#[async_trait]
impl MediaResolver for TelegramMedia {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>, AntispamError> {
        media::download_file(&self.bot, file_id).await
    }
}
