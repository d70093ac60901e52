// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `antispam serve` command implementation.
//!
//! Opens SQLite storage, connects the OpenAI classifier and the Telegram
//! adapter, and runs the moderation pipeline until a shutdown signal arrives
//! or the update stream ends.

use std::sync::Arc;
use std::time::Duration;

use antispam_config::model::AntispamConfig;
use antispam_core::error::AntispamError;
use antispam_core::traits::{MediaResolver, MessageStore, ScoreStore, SpamClassifier};
use antispam_moderator::shutdown;
use antispam_moderator::{Moderator, Pipeline, ScoreThresholds, SpamChecker, load_system_prompt};
use antispam_openai::OpenAiClassifier;
use antispam_storage::SqliteStorage;
use antispam_telegram::TelegramPlatform;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long in-flight updates may run after shutdown begins.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Runs the `antispam serve` command.
pub async fn run_serve(config: AntispamConfig) -> Result<(), AntispamError> {
    info!("starting antispam serve");

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = config.storage.database_path.as_str(), "storage ready");

    let classifier = Arc::new(OpenAiClassifier::new(&config.openai)?);
    let system_prompt = load_system_prompt(config.openai.system_prompt_file.as_deref()).await?;

    let cancel = shutdown::install_signal_handler();

    let mut platform = TelegramPlatform::new(&config.telegram, config.bot.help_message.clone())?;
    let polling = platform.connect(cancel.clone()).await?;
    let platform = Arc::new(platform);

    let moderator = Arc::new(build_moderator(
        &config,
        storage.clone(),
        classifier,
        Some(platform.clone() as Arc<dyn MediaResolver>),
        system_prompt,
    )?);

    let pipeline = Pipeline::new(
        platform,
        moderator,
        config.telegram.workers,
        config.bot.dev_mode,
    )?;

    run_until_shutdown(&pipeline, &cancel).await;

    if let Err(e) = polling.await {
        warn!(error = %e, "Telegram polling task failed");
    }
    storage.close().await?;

    info!("antispam serve shutdown complete");
    Ok(())
}

/// Wires the score engine to storage and the classifier.
fn build_moderator<S>(
    config: &AntispamConfig,
    storage: Arc<S>,
    classifier: Arc<dyn SpamClassifier>,
    media: Option<Arc<dyn MediaResolver>>,
    system_prompt: String,
) -> Result<Moderator, AntispamError>
where
    S: ScoreStore + MessageStore + 'static,
{
    let thresholds = ScoreThresholds::from_config(&config.scoring)?;
    info!(
        default = thresholds.default_score(),
        trusted = thresholds.trusted_score(),
        ban = thresholds.ban_score(),
        "score thresholds"
    );

    let checker = SpamChecker::new(classifier, media).with_system_prompt(system_prompt);
    Ok(Moderator::new(storage.clone(), storage, checker, thresholds))
}

/// Starts the workers and blocks until shutdown, then drains them.
async fn run_until_shutdown(pipeline: &Pipeline, cancel: &CancellationToken) {
    pipeline.start(cancel.clone());

    tokio::select! {
        _ = cancel.cancelled() => {
            info!("shutdown requested");
        }
        _ = pipeline.wait() => {
            warn!("update stream closed, shutting down");
        }
    }

    // Stops polling and interrupts in-flight classifier calls.
    cancel.cancel();
    if !shutdown::drain_workers(pipeline, DRAIN_TIMEOUT).await {
        warn!("some moderation workers did not stop in time");
    }
}
