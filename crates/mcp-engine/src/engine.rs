// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! The engine capability seen by transports.

use async_trait::async_trait;
use thiserror::Error;

use crate::duplex::EngineStreams;

/// Errors that end an engine run loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EngineError {
    #[error("outbound stream closed")]
    OutboundClosed,

    #[error("engine failure: {0}")]
    Internal(String),
}

/// A protocol engine driven over a duplex stream pair.
///
/// `run` is expected to keep going until the inbound side closes. Returning
/// early, with or without an error, ends the engine task that hosts it.
#[async_trait]
pub trait ProtocolEngine: Send + Sync + 'static {
    /// Process inbound messages and write replies until the streams close.
    async fn run(&self, streams: EngineStreams) -> Result<(), EngineError>;
}
