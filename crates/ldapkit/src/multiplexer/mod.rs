//! Response multiplexing by message identifier.
//!
//! A [`Multiplexer`] owns the table of outstanding message identifiers for
//! one connection. Each identifier belongs to exactly one [`Listener`] and has
//! its own queue of received messages. The inbound path calls
//! [`Multiplexer::dispatch`] for every decoded message; application tasks
//! wait on their listener.
//!
//! All table updates happen under one lock, so a dispatch, an abandon and a
//! merge touching the same identifier are totally ordered.

mod listener;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use crate::message::ReceivedMessage;
use crate::types::MessageId;

pub use listener::Listener;

/// Lifecycle of an outstanding identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Registered; nothing has been read yet.
    Pending,
    /// At least one message was read and the operation is still open.
    Delivered,
    /// The final response arrived. Queued messages can still be read.
    Done,
}

/// What [`Multiplexer::dispatch`] did with a message.
#[derive(Debug)]
pub enum Delivery {
    /// Queued for its listener; more responses are expected.
    Queued,
    /// Queued for its listener; this response ends the operation.
    Completed,
    /// Message id 0, such as a notice of disconnection. Handed back.
    Unsolicited(ReceivedMessage),
    /// No listener waits for this id, or the operation already ended.
    Unclaimed(ReceivedMessage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ListenerId(u64);

#[derive(Debug)]
struct Queued {
    seq: u64,
    message: ReceivedMessage,
}

#[derive(Debug)]
struct Entry {
    owner: ListenerId,
    queue: VecDeque<Queued>,
    state: EntryState,
    notify: Arc<Notify>,
}

impl Entry {
    fn new(owner: ListenerId) -> Self {
        Self {
            owner,
            queue: VecDeque::new(),
            state: EntryState::Pending,
            notify: Arc::new(Notify::new()),
        }
    }

    fn take(&mut self) -> Option<ReceivedMessage> {
        let queued = self.queue.pop_front()?;
        if self.state == EntryState::Pending {
            self.state = EntryState::Delivered;
        }
        Some(queued.message)
    }

    fn is_open(&self) -> bool {
        self.state != EntryState::Done || !self.queue.is_empty()
    }
}

#[derive(Debug)]
struct Slot {
    ids: Vec<MessageId>,
    notify: Arc<Notify>,
}

#[derive(Debug, Default)]
struct Table {
    entries: HashMap<MessageId, Entry>,
    listeners: HashMap<ListenerId, Slot>,
    next_listener: u64,
    next_seq: u64,
    closed: bool,
}

impl Table {
    fn wake(&self, listener: ListenerId) {
        if let Some(slot) = self.listeners.get(&listener) {
            slot.notify.notify_waiters();
        }
    }
}

#[derive(Debug, Default)]
struct Shared {
    table: Mutex<Table>,
}

/// Routes inbound messages to listeners by message identifier.
///
/// Cloning is cheap; clones share the same table.
#[derive(Debug, Clone, Default)]
pub struct Multiplexer {
    shared: Arc<Shared>,
}

impl Multiplexer {
    /// Creates an empty multiplexer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a listener with no outstanding identifiers.
    #[must_use]
    pub fn listener(&self) -> Listener {
        let mut table = self.shared.table.lock();
        let id = ListenerId(table.next_listener);
        table.next_listener += 1;
        let notify = Arc::new(Notify::new());
        table.listeners.insert(
            id,
            Slot {
                ids: Vec::new(),
                notify: Arc::clone(&notify),
            },
        );
        Listener::new(id, Arc::clone(&self.shared), notify)
    }

    /// Queues `message` for the listener owning its identifier and wakes the
    /// tasks waiting on it.
    pub fn dispatch(&self, message: ReceivedMessage) -> Delivery {
        let id = message.message_id();
        if id.is_unsolicited() {
            debug!(
                op = message.op().name(),
                "Unsolicited notification received"
            );
            return Delivery::Unsolicited(message);
        }

        let mut guard = self.shared.table.lock();
        let table = &mut *guard;
        let Some(entry) = table.entries.get_mut(&id) else {
            warn!(%id, op = message.op().name(), "No listener for message id, dropping");
            return Delivery::Unclaimed(message);
        };
        if entry.state == EntryState::Done {
            warn!(%id, op = message.op().name(), "Message arrived after operation completed");
            return Delivery::Unclaimed(message);
        }

        let terminal = message.is_terminal();
        trace!(%id, op = message.op().name(), terminal, "Dispatching message");
        entry.queue.push_back(Queued {
            seq: table.next_seq,
            message,
        });
        table.next_seq += 1;
        if terminal {
            entry.state = EntryState::Done;
        }
        entry.notify.notify_waiters();
        let owner = entry.owner;
        table.wake(owner);

        if terminal {
            Delivery::Completed
        } else {
            Delivery::Queued
        }
    }

    /// Closes the multiplexer.
    ///
    /// Queued messages stay readable. Waiters with nothing left to read fail
    /// with [`crate::Error::ConnectionClosed`], and no new identifiers can be
    /// registered.
    pub fn shutdown(&self) {
        let mut table = self.shared.table.lock();
        if table.closed {
            return;
        }
        table.closed = true;
        debug!(outstanding = table.entries.len(), "Multiplexer shut down");
        for entry in table.entries.values() {
            entry.notify.notify_waiters();
        }
        for slot in table.listeners.values() {
            slot.notify.notify_waiters();
        }
    }

    /// Returns `true` once [`shutdown`](Self::shutdown) was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.table.lock().closed
    }

    /// Number of identifiers whose operation has not completed.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.shared
            .table
            .lock()
            .entries
            .values()
            .filter(|e| e.state != EntryState::Done)
            .count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::Error;
    use crate::control::ControlRegistry;
    use crate::message::{LdapMessage, LdapResult, ProtocolOp, SearchResultEntry};
    use crate::types::ResultCode;

    fn id(n: i32) -> MessageId {
        MessageId::new(n).unwrap()
    }

    fn received(n: i32, op: ProtocolOp) -> ReceivedMessage {
        ReceivedMessage::new(LdapMessage::new(id(n), op), &ControlRegistry::new())
    }

    fn entry(n: i32, dn: &str) -> ReceivedMessage {
        received(
            n,
            ProtocolOp::SearchResultEntry(SearchResultEntry {
                object_name: dn.to_string(),
                attributes: Vec::new(),
            }),
        )
    }

    fn done(n: i32) -> ReceivedMessage {
        received(
            n,
            ProtocolOp::SearchResultDone(LdapResult::new(ResultCode::Success)),
        )
    }

    fn dn_of(message: &ReceivedMessage) -> &str {
        match message.op() {
            ProtocolOp::SearchResultEntry(e) => &e.object_name,
            other => panic!("unexpected {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_single_id_order() {
        let mux = Multiplexer::new();
        let listener = mux.listener();
        listener.register(id(1)).unwrap();

        assert!(matches!(mux.dispatch(entry(1, "cn=1")), Delivery::Queued));
        assert!(matches!(mux.dispatch(entry(1, "cn=2")), Delivery::Queued));
        assert!(matches!(mux.dispatch(entry(1, "cn=3")), Delivery::Queued));
        assert!(matches!(mux.dispatch(done(1)), Delivery::Completed));

        for expected in ["cn=1", "cn=2", "cn=3"] {
            let message = listener.get_response_for(id(1)).await.unwrap();
            assert_eq!(dn_of(&message), expected);
        }
        let last = listener.get_response_for(id(1)).await.unwrap();
        assert!(last.is_terminal());
        assert!(matches!(
            listener.get_response_for(id(1)).await,
            Err(Error::NoMoreResults(n)) if n == id(1)
        ));
    }

    #[tokio::test]
    async fn test_any_id_returns_oldest() {
        let mux = Multiplexer::new();
        let listener = mux.listener();
        listener.register(id(1)).unwrap();
        listener.register(id(2)).unwrap();

        mux.dispatch(entry(2, "cn=first"));
        mux.dispatch(entry(1, "cn=second"));
        mux.dispatch(entry(2, "cn=third"));

        let order: Vec<_> = [
            listener.get_response().await.unwrap(),
            listener.get_response().await.unwrap(),
            listener.get_response().await.unwrap(),
        ]
        .iter()
        .map(|m| (m.message_id().get(), dn_of(m).to_string()))
        .collect();
        assert_eq!(
            order,
            vec![
                (2, "cn=first".to_string()),
                (1, "cn=second".to_string()),
                (2, "cn=third".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_idle_listener_fails_immediately() {
        let mux = Multiplexer::new();
        let listener = mux.listener();
        assert!(matches!(listener.get_response().await, Err(Error::ListenerIdle)));

        listener.register(id(4)).unwrap();
        mux.dispatch(done(4));
        listener.get_response().await.unwrap();
        assert!(matches!(listener.get_response().await, Err(Error::ListenerIdle)));
    }

    #[tokio::test]
    async fn test_state_transitions_and_queries() {
        let mux = Multiplexer::new();
        let listener = mux.listener();
        listener.register(id(7)).unwrap();
        assert_eq!(listener.state(id(7)), Some(EntryState::Pending));
        assert!(!listener.is_response_received());

        mux.dispatch(entry(7, "cn=a"));
        assert!(listener.is_response_received_for(id(7)));
        listener.get_response_for(id(7)).await.unwrap();
        assert_eq!(listener.state(id(7)), Some(EntryState::Delivered));

        mux.dispatch(done(7));
        assert_eq!(listener.state(id(7)), Some(EntryState::Done));
        assert_eq!(mux.outstanding(), 0);
        listener.get_response_for(id(7)).await.unwrap();

        // still answerable after completion
        assert!(!listener.is_response_received_for(id(7)));
        assert_eq!(listener.message_ids(), vec![id(7)]);
        listener.release(id(7)).unwrap();
        assert!(listener.message_ids().is_empty());
        assert_eq!(listener.state(id(7)), None);
    }

    #[tokio::test]
    async fn test_registration_rules() {
        let mux = Multiplexer::new();
        let a = mux.listener();
        let b = mux.listener();
        a.register(id(1)).unwrap();
        assert!(matches!(b.register(id(1)), Err(Error::AlreadyRegistered(_))));
        assert!(matches!(
            a.register(MessageId::UNSOLICITED),
            Err(Error::InvalidParameter(_))
        ));
        assert!(matches!(a.release(id(1)), Err(Error::InvalidParameter(_))));
        assert!(matches!(b.release(id(1)), Err(Error::NotOutstanding(_))));

        mux.dispatch(done(1));
        a.get_response_for(id(1)).await.unwrap();
        // completed and drained ids may be reused
        b.register(id(1)).unwrap();
        assert!(a.message_ids().is_empty());
        assert_eq!(b.message_ids(), vec![id(1)]);
    }

    #[tokio::test]
    async fn test_unclaimed_and_late_messages() {
        let mux = Multiplexer::new();
        let listener = mux.listener();
        assert!(matches!(mux.dispatch(done(9)), Delivery::Unclaimed(_)));
        assert!(matches!(
            mux.dispatch(received(0, ProtocolOp::ExtendedResponse(crate::message::ExtendedResponse {
                result: LdapResult::new(ResultCode::Unavailable),
                name: Some("1.3.6.1.4.1.1466.20036".to_string()),
                value: None,
            }))),
            Delivery::Unsolicited(_)
        ));

        listener.register(id(3)).unwrap();
        mux.dispatch(done(3));
        assert!(matches!(mux.dispatch(entry(3, "cn=late")), Delivery::Unclaimed(_)));
    }

    #[tokio::test]
    async fn test_abandon_releases_waiter() {
        let mux = Multiplexer::new();
        let listener = Arc::new(mux.listener());
        listener.register(id(5)).unwrap();

        let waiter = {
            let listener = Arc::clone(&listener);
            tokio::spawn(async move { listener.get_response_for(id(5)).await })
        };
        tokio::task::yield_now().await;
        listener.abandon(id(5)).unwrap();

        let result = waiter.await.unwrap();
        assert!(matches!(result, Err(Error::Abandoned(n)) if n == id(5)));
        assert!(matches!(listener.abandon(id(5)), Err(Error::NotOutstanding(_))));
        assert!(matches!(mux.dispatch(entry(5, "cn=x")), Delivery::Unclaimed(_)));
    }

    #[tokio::test]
    async fn test_waiter_wakes_on_dispatch() {
        let mux = Multiplexer::new();
        let listener = Arc::new(mux.listener());
        listener.register(id(2)).unwrap();

        let waiter = {
            let listener = Arc::clone(&listener);
            tokio::spawn(async move { listener.get_response().await })
        };
        tokio::task::yield_now().await;
        mux.dispatch(entry(2, "cn=woken"));

        let message = waiter.await.unwrap().unwrap();
        assert_eq!(dn_of(&message), "cn=woken");
    }

    #[tokio::test]
    async fn test_shutdown_releases_waiters() {
        let mux = Multiplexer::new();
        let listener = Arc::new(mux.listener());
        listener.register(id(1)).unwrap();
        listener.register(id(2)).unwrap();
        mux.dispatch(entry(2, "cn=kept"));

        let waiter = {
            let listener = Arc::clone(&listener);
            tokio::spawn(async move { listener.get_response_for(id(1)).await })
        };
        tokio::task::yield_now().await;
        mux.shutdown();

        assert!(matches!(waiter.await.unwrap(), Err(Error::ConnectionClosed)));
        // queued messages survive the shutdown
        assert_eq!(dn_of(&listener.get_response().await.unwrap()), "cn=kept");
        assert!(matches!(listener.get_response().await, Err(Error::ConnectionClosed)));
        assert!(matches!(listener.register(id(3)), Err(Error::ConnectionClosed)));
        assert!(mux.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_wait() {
        let mux = Multiplexer::new();
        let listener = mux.listener();
        listener.register(id(1)).unwrap();
        let result = listener
            .get_response_timeout(Some(id(1)), Duration::from_secs(3))
            .await;
        assert!(matches!(
            result,
            Err(Error::Timeout(d)) if d == Duration::from_secs(3)
        ));
        // the identifier is still outstanding after a timeout
        assert_eq!(listener.state(id(1)), Some(EntryState::Pending));
    }

    #[tokio::test]
    async fn test_merge_moves_ids_and_queued_messages() {
        let mux = Multiplexer::new();
        let a = mux.listener();
        let b = mux.listener();
        a.register(id(1)).unwrap();
        b.register(id(2)).unwrap();
        mux.dispatch(entry(1, "cn=queued"));

        b.merge(a).unwrap();
        assert_eq!(b.message_ids(), vec![id(2), id(1)]);

        mux.dispatch(done(1));
        let message = b.get_response_for(id(1)).await.unwrap();
        assert_eq!(dn_of(&message), "cn=queued");
        assert!(b.get_response_for(id(1)).await.unwrap().is_terminal());
    }

    #[tokio::test]
    async fn test_merge_rejects_foreign_listener() {
        let b = Multiplexer::new().listener();
        let other = Multiplexer::new().listener();
        assert!(matches!(b.merge(other), Err(Error::InvalidParameter(_))));
    }

    #[tokio::test]
    async fn test_drop_forgets_ids() {
        let mux = Multiplexer::new();
        let listener = mux.listener();
        listener.register(id(1)).unwrap();
        drop(listener);
        assert_eq!(mux.outstanding(), 0);
        assert!(matches!(mux.dispatch(done(1)), Delivery::Unclaimed(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_merge_is_atomic_with_dispatch() {
        let mux = Multiplexer::new();
        for round in 1..=200 {
            let a = mux.listener();
            let b = mux.listener();
            let message_id = id(round);
            a.register(message_id).unwrap();

            let dispatcher = {
                let mux = mux.clone();
                tokio::spawn(async move { mux.dispatch(done(round)) })
            };
            let merger = tokio::spawn(async move {
                b.merge(a).unwrap();
                b
            });

            let delivery = dispatcher.await.unwrap();
            let b = merger.await.unwrap();
            assert!(matches!(delivery, Delivery::Completed), "round {round}");

            let message = b.get_response_for(message_id).await.unwrap();
            assert_eq!(message.message_id(), message_id);
            assert!(matches!(
                b.get_response_for(message_id).await,
                Err(Error::NoMoreResults(_))
            ));
        }
    }
}
