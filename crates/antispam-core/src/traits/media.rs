// SPDX-FileCopyrightText: 2026 Antispam Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-demand attachment download.

use async_trait::async_trait;

use crate::error::AntispamError;

/// Fetches attachment bytes given the platform's opaque file handle.
#[async_trait]
pub trait MediaResolver: Send + Sync + 'static {
    async fn fetch(&self, file_id: &str) -> Result<Vec<u8>, AntispamError>;
}
