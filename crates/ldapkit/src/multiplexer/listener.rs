//! Application side of the multiplexer.

use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::debug;

use super::{Entry, EntryState, ListenerId, Shared};
use crate::message::ReceivedMessage;
use crate::types::MessageId;
use crate::{Error, Result};

/// Receives the responses for a set of message identifiers.
///
/// Register an identifier before sending the request that uses it, so that
/// no response can arrive unclaimed. Dropping a listener forgets all of its
/// identifiers.
#[derive(Debug)]
pub struct Listener {
    id: ListenerId,
    shared: Arc<Shared>,
    notify: Arc<Notify>,
}

impl Listener {
    pub(super) fn new(id: ListenerId, shared: Arc<Shared>, notify: Arc<Notify>) -> Self {
        Self { id, shared, notify }
    }

    /// Claims `message_id` for this listener.
    ///
    /// An identifier that completed and was fully read may be registered
    /// again; its old entry is discarded.
    pub fn register(&self, message_id: MessageId) -> Result<()> {
        if message_id.is_unsolicited() {
            return Err(Error::invalid_parameter("message id 0 is reserved for notifications"));
        }
        let mut guard = self.shared.table.lock();
        let table = &mut *guard;
        if table.closed {
            return Err(Error::ConnectionClosed);
        }
        if let Some(existing) = table.entries.get(&message_id) {
            if existing.is_open() {
                return Err(Error::AlreadyRegistered(message_id));
            }
            let previous = existing.owner;
            if let Some(slot) = table.listeners.get_mut(&previous) {
                slot.ids.retain(|id| *id != message_id);
            }
        }
        table.entries.insert(message_id, Entry::new(self.id));
        if let Some(slot) = table.listeners.get_mut(&self.id) {
            slot.ids.push(message_id);
        }
        Ok(())
    }

    /// Waits for the oldest message queued for any of this listener's
    /// identifiers.
    ///
    /// Fails with [`Error::ListenerIdle`] right away when every identifier
    /// has completed and been read, and with [`Error::ConnectionClosed`]
    /// once the connection is gone and nothing is left to read.
    pub async fn get_response(&self) -> Result<ReceivedMessage> {
        loop {
            let mut notified = pin!(self.notify.notified());
            notified.as_mut().enable();
            {
                let mut guard = self.shared.table.lock();
                let table = &mut *guard;
                let Some(slot) = table.listeners.get(&self.id) else {
                    return Err(Error::ListenerIdle);
                };
                let oldest = slot
                    .ids
                    .iter()
                    .filter_map(|id| {
                        table
                            .entries
                            .get(id)
                            .and_then(|e| e.queue.front().map(|q| (q.seq, *id)))
                    })
                    .min();
                if let Some((_, id)) = oldest {
                    if let Some(message) = table.entries.get_mut(&id).and_then(Entry::take) {
                        return Ok(message);
                    }
                }
                let open = slot
                    .ids
                    .iter()
                    .any(|id| table.entries.get(id).is_some_and(Entry::is_open));
                if !open {
                    return Err(Error::ListenerIdle);
                }
                if table.closed {
                    return Err(Error::ConnectionClosed);
                }
            }
            notified.await;
        }
    }

    /// Waits for the next message for `message_id`, in arrival order.
    ///
    /// Fails with [`Error::NoMoreResults`] once the operation has completed
    /// and every message was read, and with [`Error::Abandoned`] if the
    /// identifier is abandoned while waiting.
    pub async fn get_response_for(&self, message_id: MessageId) -> Result<ReceivedMessage> {
        let notify = {
            let table = self.shared.table.lock();
            match table.entries.get(&message_id) {
                Some(entry) if entry.owner == self.id => Arc::clone(&entry.notify),
                _ => return Err(Error::NotOutstanding(message_id)),
            }
        };

        loop {
            let mut notified = pin!(notify.notified());
            notified.as_mut().enable();
            {
                let mut table = self.shared.table.lock();
                let closed = table.closed;
                let entry = match table.entries.get_mut(&message_id) {
                    Some(entry) if entry.owner == self.id => entry,
                    _ => return Err(Error::Abandoned(message_id)),
                };
                if let Some(message) = entry.take() {
                    return Ok(message);
                }
                if entry.state == EntryState::Done {
                    return Err(Error::NoMoreResults(message_id));
                }
                if closed {
                    return Err(Error::ConnectionClosed);
                }
            }
            notified.await;
        }
    }

    /// Like [`get_response`](Self::get_response) or
    /// [`get_response_for`](Self::get_response_for), giving up after `limit`.
    ///
    /// A timeout leaves the identifier outstanding.
    pub async fn get_response_timeout(
        &self,
        message_id: Option<MessageId>,
        limit: Duration,
    ) -> Result<ReceivedMessage> {
        let wait = async {
            match message_id {
                Some(id) => self.get_response_for(id).await,
                None => self.get_response().await,
            }
        };
        tokio::time::timeout(limit, wait)
            .await
            .map_err(|_| Error::Timeout(limit))?
    }

    /// Returns `true` if a message is queued for any identifier.
    #[must_use]
    pub fn is_response_received(&self) -> bool {
        let table = self.shared.table.lock();
        table.listeners.get(&self.id).is_some_and(|slot| {
            slot.ids
                .iter()
                .any(|id| table.entries.get(id).is_some_and(|e| !e.queue.is_empty()))
        })
    }

    /// Returns `true` if a message is queued for `message_id`.
    #[must_use]
    pub fn is_response_received_for(&self, message_id: MessageId) -> bool {
        self.shared
            .table
            .lock()
            .entries
            .get(&message_id)
            .is_some_and(|e| e.owner == self.id && !e.queue.is_empty())
    }

    /// Returns the identifiers held by this listener, in registration order.
    ///
    /// Completed identifiers are included until released.
    #[must_use]
    pub fn message_ids(&self) -> Vec<MessageId> {
        self.shared
            .table
            .lock()
            .listeners
            .get(&self.id)
            .map(|slot| slot.ids.clone())
            .unwrap_or_default()
    }

    /// Returns the state of `message_id`, or `None` if this listener does not
    /// hold it.
    #[must_use]
    pub fn state(&self, message_id: MessageId) -> Option<EntryState> {
        self.shared
            .table
            .lock()
            .entries
            .get(&message_id)
            .filter(|e| e.owner == self.id)
            .map(|e| e.state)
    }

    /// Stops tracking `message_id` and drops anything queued for it.
    ///
    /// Tasks waiting on the identifier fail with [`Error::Abandoned`]. This
    /// only affects local bookkeeping; sending an abandon request to the
    /// server is up to the caller.
    pub fn abandon(&self, message_id: MessageId) -> Result<()> {
        let dropped = self.remove(message_id)?;
        debug!(id = %message_id, dropped, "Abandoned message id");
        Ok(())
    }

    /// Forgets a completed identifier, dropping any unread messages.
    pub fn release(&self, message_id: MessageId) -> Result<()> {
        let state = self.state(message_id);
        if state.is_some_and(|s| s != EntryState::Done) {
            return Err(Error::invalid_parameter(format!(
                "message {message_id} is still open; abandon it instead"
            )));
        }
        self.remove(message_id).map(|_| ())
    }

    /// Moves every identifier and queued message of `other` to this listener.
    ///
    /// The move happens under the table lock, so a message dispatched
    /// concurrently is seen exactly once, here.
    pub fn merge(&self, other: Self) -> Result<()> {
        if !Arc::ptr_eq(&self.shared, &other.shared) {
            return Err(Error::invalid_parameter(
                "cannot merge listeners of different connections",
            ));
        }
        {
            let mut guard = self.shared.table.lock();
            let table = &mut *guard;
            let moved = table
                .listeners
                .get_mut(&other.id)
                .map(|slot| std::mem::take(&mut slot.ids))
                .unwrap_or_default();
            for id in &moved {
                if let Some(entry) = table.entries.get_mut(id) {
                    entry.owner = self.id;
                }
            }
            debug!(moved = moved.len(), "Merged listener");
            if let Some(slot) = table.listeners.get_mut(&self.id) {
                slot.ids.extend(moved);
            }
            table.wake(self.id);
        }
        drop(other);
        Ok(())
    }

    fn remove(&self, message_id: MessageId) -> Result<usize> {
        let mut guard = self.shared.table.lock();
        let table = &mut *guard;
        match table.entries.get(&message_id) {
            Some(entry) if entry.owner == self.id => {}
            _ => return Err(Error::NotOutstanding(message_id)),
        }
        let dropped = table.entries.remove(&message_id).map_or(0, |entry| {
            entry.notify.notify_waiters();
            entry.queue.len()
        });
        if let Some(slot) = table.listeners.get_mut(&self.id) {
            slot.ids.retain(|id| *id != message_id);
        }
        table.wake(self.id);
        Ok(dropped)
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        let mut guard = self.shared.table.lock();
        let table = &mut *guard;
        if let Some(slot) = table.listeners.remove(&self.id) {
            for id in slot.ids {
                if let Some(entry) = table.entries.remove(&id) {
                    entry.notify.notify_waiters();
                }
            }
        }
    }
}
