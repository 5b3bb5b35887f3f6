//! The inbound dispatch loop.

use std::sync::Arc;

use tokio::io::AsyncRead;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::framed::FramedStream;
use crate::Result;
use crate::control::ControlRegistry;
use crate::message::{LdapMessage, ReceivedMessage};
use crate::multiplexer::{Delivery, Multiplexer};

/// Reads frames from a stream and routes them through a [`Multiplexer`].
///
/// Frames are decoded, their controls upgraded through a
/// [`ControlRegistry`] (the process-wide one unless another is set), and
/// the result handed to [`Multiplexer::dispatch`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    multiplexer: Multiplexer,
    registry: Option<Arc<ControlRegistry>>,
    notifications: Option<mpsc::UnboundedSender<ReceivedMessage>>,
}

impl Dispatcher {
    /// Creates a dispatcher feeding `multiplexer`.
    #[must_use]
    pub const fn new(multiplexer: Multiplexer) -> Self {
        Self {
            multiplexer,
            registry: None,
            notifications: None,
        }
    }

    /// Uses `registry` instead of the process-wide registry.
    #[must_use]
    pub fn with_registry(mut self, registry: Arc<ControlRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Forwards unsolicited notifications (message id 0) to `sender`.
    ///
    /// Without a sender they are logged and dropped.
    #[must_use]
    pub fn with_notifications(mut self, sender: mpsc::UnboundedSender<ReceivedMessage>) -> Self {
        self.notifications = Some(sender);
        self
    }

    /// Returns the multiplexer messages are routed to.
    #[must_use]
    pub const fn multiplexer(&self) -> &Multiplexer {
        &self.multiplexer
    }

    /// Runs until the stream ends or a framing error occurs.
    ///
    /// The multiplexer is shut down on the way out either way, so waiting
    /// listeners are released. A frame that is well formed BER but not a
    /// valid LDAP message is logged and skipped.
    pub async fn run<S>(&self, mut framed: FramedStream<S>) -> Result<()>
    where
        S: AsyncRead + Unpin,
    {
        let result = loop {
            match framed.read_frame().await {
                Ok(Some(frame)) => {
                    match LdapMessage::decode_with(&frame, framed.decoder_config()) {
                        Ok(message) => self.deliver(message),
                        Err(error) => {
                            warn!(%error, len = frame.len(), "Skipping undecodable message");
                        }
                    }
                }
                Ok(None) => {
                    debug!("Inbound stream closed");
                    break Ok(());
                }
                Err(error) => {
                    warn!(%error, "Inbound framing error, closing");
                    break Err(error);
                }
            }
        };
        self.multiplexer.shutdown();
        result
    }

    /// Upgrades controls and routes one decoded message.
    pub fn deliver(&self, message: LdapMessage) {
        let registry = match self.registry.as_deref() {
            Some(registry) => registry,
            None => ControlRegistry::global(),
        };
        let received = ReceivedMessage::new(message, registry);
        if let Delivery::Unsolicited(notice) = self.multiplexer.dispatch(received) {
            let Some(sender) = &self.notifications else {
                warn!(op = notice.op().name(), "Dropping unsolicited notification");
                return;
            };
            if let Err(mpsc::error::SendError(notice)) = sender.send(notice) {
                warn!(
                    op = notice.op().name(),
                    "Notification receiver gone, dropping"
                );
            }
        }
    }
}
