// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! In-memory duplex stream pair.
//!
//! Two unbounded, ordered channels of [`SessionMessage`]:
//! - inbound: transport → engine
//! - outbound: engine → transport
//!
//! Writes never block. Messages written before the other side starts reading
//! stay buffered. Dropping either end of a channel closes it, which is the
//! only end-of-life signal.

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::message::SessionMessage;

/// The engine's end of the pair.
#[derive(Debug)]
pub struct EngineStreams {
    /// Messages from the transport.
    pub inbound: UnboundedReceiver<SessionMessage>,
    /// Replies and server-initiated messages to the transport.
    pub outbound: UnboundedSender<SessionMessage>,
}

/// The transport's end of the pair.
#[derive(Debug)]
pub struct TransportStreams {
    /// Messages to the engine.
    pub inbound: UnboundedSender<SessionMessage>,
    /// Messages from the engine.
    pub outbound: UnboundedReceiver<SessionMessage>,
}

/// Open a fresh duplex stream pair.
pub fn open() -> (EngineStreams, TransportStreams) {
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();

    (
        EngineStreams {
            inbound: inbound_rx,
            outbound: outbound_tx,
        },
        TransportStreams {
            inbound: inbound_tx,
            outbound: outbound_rx,
        },
    )
}
