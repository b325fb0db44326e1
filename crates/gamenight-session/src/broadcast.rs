//! Scoped fan-out of outgoing messages.
//!
//! Most updates come in pairs: a *primary* copy for one connection (the
//! requester, or the player whose turn it is and who may see the current
//! card) and a *secondary* copy for everybody else in the same room.
//!
//! ```text
//!   registry.broadcast()
//!       .to(Some(current_player), &msg_with_card)      // primary
//!       .to_scope(Scope::Room(room_id), &msg_without)  // everyone else
//!       .send();
//! ```
//!
//! Each message is encoded exactly once and the resulting [`Frame`] is
//! shared by every recipient. Delivery is a non-blocking `try_send` onto
//! each connection's bounded queue: a connection whose queue is full or
//! closed is evicted rather than allowed to stall the hub lock.

use std::sync::Arc;

use gamenight_protocol::{Codec, JsonCodec, RoomId};
use gamenight_transport::ConnectionId;
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;

use crate::PlayerRegistry;

/// An encoded message, shared between every connection it goes to.
pub type Frame = Arc<[u8]>;

/// Which connections receive the secondary message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Connections whose player is in this room.
    Room(RoomId),
    /// Every registered connection.
    Everyone,
}

impl Scope {
    fn includes(self, room: Option<RoomId>) -> bool {
        match self {
            Scope::Room(id) => room == Some(id),
            Scope::Everyone => true,
        }
    }
}

/// What happened to a broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Connections a frame was queued for, in id order.
    pub delivered: Vec<ConnectionId>,
    /// Connections dropped because their queue was full or closed.
    pub evicted: Vec<ConnectionId>,
}

/// A broadcast under construction. Built by
/// [`PlayerRegistry::broadcast`]; nothing is sent until [`send`](Self::send).
#[must_use = "a broadcast does nothing until `send` is called"]
pub struct Broadcast<'a> {
    registry: &'a mut PlayerRegistry,
    primary: Option<(ConnectionId, Frame)>,
    secondary: Option<(Scope, Frame)>,
}

impl<'a> Broadcast<'a> {
    pub(crate) fn new(registry: &'a mut PlayerRegistry) -> Self {
        Self {
            registry,
            primary: None,
            secondary: None,
        }
    }

    /// Sets the primary message.
    ///
    /// `None` (e.g. the recipient is disconnected) means there is no
    /// primary recipient; the message is then not sent to anyone.
    pub fn to<M: Serialize>(mut self, conn: Option<ConnectionId>, msg: &M) -> Self {
        if let Some(conn) = conn {
            self.primary = encode(msg).map(|frame| (conn, frame));
        }
        self
    }

    /// Sets the secondary message and who gets it.
    ///
    /// The primary connection never receives the secondary copy.
    pub fn to_scope<M: Serialize>(mut self, scope: Scope, msg: &M) -> Self {
        self.secondary = encode(msg).map(|frame| (scope, frame));
        self
    }

    /// Queues every frame and evicts connections that can't keep up.
    pub fn send(self) -> Delivery {
        let Broadcast {
            registry,
            primary,
            secondary,
        } = self;

        let mut delivery = Delivery::default();
        for (conn, room, outbound) in registry.targets() {
            let frame = match (&primary, &secondary) {
                (Some((target, frame)), _) if *target == conn => frame,
                (_, Some((scope, frame))) if scope.includes(room) => frame,
                _ => continue,
            };
            match outbound.try_send(Arc::clone(frame)) {
                Ok(()) => delivery.delivered.push(conn),
                Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                    delivery.evicted.push(conn);
                }
            }
        }

        for conn in &delivery.evicted {
            registry.evict(*conn);
        }
        delivery.delivered.sort();
        delivery.evicted.sort();

        tracing::trace!(
            delivered = delivery.delivered.len(),
            evicted = delivery.evicted.len(),
            "broadcast sent"
        );
        delivery
    }
}

fn encode<M: Serialize>(msg: &M) -> Option<Frame> {
    match JsonCodec.encode(msg) {
        Ok(bytes) => Some(Frame::from(bytes)),
        Err(e) => {
            tracing::error!(error = %e, "failed to encode outgoing message");
            None
        }
    }
}
