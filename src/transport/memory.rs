//! In-process queue manager implementing the transport traits.
//!
//! `MemoryBroker` keeps named queues in memory, assigns message identifiers,
//! honours correlation matching and wakes waiting gets when a message is put.
//! Faults can be injected one call at a time and every handle it hands out is
//! counted, so tests can assert that queues were closed and property sets
//! destroyed on every path.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::{
        Arc,
        Mutex,
        MutexGuard,
        PoisonError,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::{sync::Notify, time::Instant};

use super::{
    ConnectRequest,
    Connection,
    Credentials,
    GetOptions,
    MQRC_CONNECTION_BROKEN,
    MQRC_HMSG_ERROR,
    MQRC_NOT_AUTHORIZED,
    MQRC_NOT_OPEN_FOR_INPUT,
    MQRC_NOT_OPEN_FOR_OUTPUT,
    MQRC_Q_MGR_NAME_ERROR,
    MQRC_Q_MGR_QUIESCING,
    MQRC_UNKNOWN_OBJECT_NAME,
    MessageDescriptor,
    MessageHandle,
    OpenOptions,
    PropertySet,
    PutOptions,
    QueueObject,
    Transport,
    TransportError,
    TransportResult,
    Verb,
};
use crate::{
    ids::{ID_LEN, MessageId},
    message::PropertyValue,
};

/// A one-shot failure consumed by the first matching call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Fault {
    /// Fail the next connect with the given reason.
    Connect(i32),
    /// Fail the next open of the named queue with the given reason.
    Open {
        /// Queue whose open fails.
        queue: String,
        /// Reason code reported.
        reason: i32,
    },
    /// Fail the next put with the given reason.
    Put(i32),
    /// Fail the next get with the given reason.
    Get(i32),
    /// Fail the next property-set creation.
    CreatePropertySet,
    /// Fail setting the named property.
    SetProperty(String),
    /// Fail the next property-set destruction.
    DestroyPropertySet,
    /// Fail the next queue close.
    Close,
    /// Fail the next disconnect.
    Disconnect,
}

/// Call counters recorded by a [`MemoryBroker`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BrokerStats {
    /// Connect calls, successful or not.
    pub connects: usize,
    /// Disconnect calls.
    pub disconnects: usize,
    /// Successful opens.
    pub opens: usize,
    /// Close calls on opened queues.
    pub closes: usize,
    /// Successful puts.
    pub puts: usize,
    /// Get calls.
    pub gets: usize,
    /// Property sets created.
    pub property_sets_created: usize,
    /// Property sets destroyed.
    pub property_sets_destroyed: usize,
    /// Individual property set calls.
    pub properties_set: usize,
}

/// A message held on a memory queue.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredMessage {
    /// Descriptor as assigned at put time.
    pub descriptor: MessageDescriptor,
    /// Message body.
    pub payload: Bytes,
    /// Properties attached through a message handle.
    pub properties: BTreeMap<String, PropertyValue>,
}

#[derive(Default)]
struct BrokerState {
    queues: HashMap<String, VecDeque<StoredMessage>>,
    property_sets: HashMap<u64, BTreeMap<String, PropertyValue>>,
    faults: Vec<Fault>,
    stats: BrokerStats,
    credentials: Option<Credentials>,
    quiescing: bool,
    connect_delay: Duration,
    last_request: Option<ConnectRequest>,
    next_sequence: u64,
    next_handle: u64,
}

impl BrokerState {
    fn take_fault(&mut self, matches: impl Fn(&Fault) -> bool) -> Option<Fault> {
        let index = self.faults.iter().position(matches)?;
        Some(self.faults.remove(index))
    }
}

struct BrokerInner {
    name: String,
    state: Mutex<BrokerState>,
    arrivals: Notify,
}

impl std::fmt::Debug for BrokerInner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrokerInner")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl BrokerInner {
    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build a message id in the queue manager's style: `AMQ `, the padded
    /// manager name, then a sequence number.
    fn next_message_id(&self, state: &mut BrokerState) -> MessageId {
        state.next_sequence += 1;
        let mut bytes = [b' '; ID_LEN];
        bytes[..4].copy_from_slice(b"AMQ ");
        for (slot, byte) in bytes[4..16].iter_mut().zip(self.name.bytes()) {
            *slot = byte;
        }
        bytes[16..].copy_from_slice(&state.next_sequence.to_be_bytes());
        MessageId::from_bytes(bytes)
    }
}

/// An in-process queue manager.
///
/// Cloning yields another handle to the same queues.
#[derive(Clone)]
pub struct MemoryBroker {
    inner: Arc<BrokerInner>,
}

impl std::fmt::Debug for MemoryBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBroker")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

impl MemoryBroker {
    /// Create a queue manager called `name` with no queues.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(BrokerInner {
                name: name.into(),
                state: Mutex::new(BrokerState::default()),
                arrivals: Notify::new(),
            }),
        }
    }

    /// Define a local queue.
    #[must_use]
    pub fn with_queue(self, queue: impl Into<String>) -> Self {
        self.define_queue(queue);
        self
    }

    /// Require these credentials on connect.
    #[must_use]
    pub fn with_credentials(self, user_id: impl Into<String>, password: impl Into<String>) -> Self {
        self.inner.lock().credentials = Some(Credentials {
            user_id: user_id.into(),
            password: password.into(),
        });
        self
    }

    /// Delay every connect by `delay`.
    #[must_use]
    pub fn with_connect_delay(self, delay: Duration) -> Self {
        self.inner.lock().connect_delay = delay;
        self
    }

    /// Name of the queue manager.
    #[must_use]
    pub fn name(&self) -> &str { &self.inner.name }

    /// Define a local queue; defining an existing queue keeps its messages.
    pub fn define_queue(&self, queue: impl Into<String>) {
        self.inner.lock().queues.entry(queue.into()).or_default();
    }

    /// Queue a one-shot fault.
    pub fn inject(&self, fault: Fault) { self.inner.lock().faults.push(fault); }

    /// Mark the queue manager as quiescing or running.
    pub fn set_quiescing(&self, quiescing: bool) { self.inner.lock().quiescing = quiescing; }

    /// Snapshot of the call counters.
    #[must_use]
    pub fn stats(&self) -> BrokerStats { self.inner.lock().stats }

    /// The most recent connect request received.
    #[must_use]
    pub fn last_connect_request(&self) -> Option<ConnectRequest> {
        self.inner.lock().last_request.clone()
    }

    /// Copy the messages currently on `queue`, oldest first.
    #[must_use]
    pub fn browse(&self, queue: &str) -> Vec<StoredMessage> {
        self.inner
            .lock()
            .queues
            .get(queue)
            .map(|messages| messages.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of messages on `queue`.
    #[must_use]
    pub fn depth(&self, queue: &str) -> usize {
        self.inner.lock().queues.get(queue).map_or(0, VecDeque::len)
    }

    /// Put a message directly, bypassing any connection.
    ///
    /// Returns the assigned message id.
    pub fn enqueue(
        &self,
        queue: &str,
        mut descriptor: MessageDescriptor,
        payload: impl Into<Bytes>,
    ) -> Option<MessageId> {
        let mut state = self.inner.lock();
        if !state.queues.contains_key(queue) {
            return None;
        }
        let id = self.inner.next_message_id(&mut state);
        descriptor.message_id = id;
        state.queues.get_mut(queue)?.push_back(StoredMessage {
            descriptor,
            payload: payload.into(),
            properties: BTreeMap::new(),
        });
        drop(state);
        self.inner.arrivals.notify_waiters();
        Some(id)
    }
}

#[async_trait]
impl Transport for MemoryBroker {
    type Connection = MemoryConnection;

    async fn connect(
        &self,
        queue_manager: &str,
        request: &ConnectRequest,
    ) -> TransportResult<MemoryConnection> {
        let delay = {
            let mut state = self.inner.lock();
            state.stats.connects += 1;
            state.last_request = Some(request.clone());
            state.connect_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.inner.lock();
        if let Some(Fault::Connect(reason)) = state.take_fault(|f| matches!(f, Fault::Connect(_))) {
            return Err(TransportError::failed(Verb::Connect, reason));
        }
        if queue_manager != self.inner.name {
            return Err(TransportError::failed(Verb::Connect, MQRC_Q_MGR_NAME_ERROR));
        }
        if let Some(required) = &state.credentials
            && request.credentials.as_ref() != Some(required)
        {
            return Err(TransportError::failed(Verb::Connect, MQRC_NOT_AUTHORIZED));
        }
        state.next_handle += 1;
        Ok(MemoryConnection {
            broker: Arc::clone(&self.inner),
            connected: Arc::new(AtomicBool::new(true)),
            handle: state.next_handle,
        })
    }
}

/// Session handed out by [`MemoryBroker`].
pub struct MemoryConnection {
    broker: Arc<BrokerInner>,
    connected: Arc<AtomicBool>,
    handle: u64,
}

impl std::fmt::Debug for MemoryConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnection")
            .field("handle", &self.handle)
            .field("connected", &self.connected.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl MemoryConnection {
    /// Connection handle number, unique per broker.
    #[must_use]
    pub const fn handle(&self) -> u64 { self.handle }

    fn ensure_connected(&self, verb: Verb) -> TransportResult<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TransportError::failed(verb, MQRC_CONNECTION_BROKEN))
        }
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    type Queue = MemoryQueue;
    type Properties = MemoryPropertySet;

    async fn open(&self, queue: &str, options: OpenOptions) -> TransportResult<MemoryQueue> {
        self.ensure_connected(Verb::Open)?;
        let mut state = self.broker.lock();
        if let Some(Fault::Open { reason, .. }) =
            state.take_fault(|f| matches!(f, Fault::Open { queue: q, .. } if q == queue))
        {
            return Err(TransportError::failed(Verb::Open, reason));
        }
        if !state.queues.contains_key(queue) {
            return Err(TransportError::failed(Verb::Open, MQRC_UNKNOWN_OBJECT_NAME));
        }
        state.stats.opens += 1;
        Ok(MemoryQueue {
            broker: Arc::clone(&self.broker),
            connected: Arc::clone(&self.connected),
            name: queue.to_owned(),
            options,
        })
    }

    async fn create_property_set(&self) -> TransportResult<MemoryPropertySet> {
        self.ensure_connected(Verb::CreateMessageHandle)?;
        let mut state = self.broker.lock();
        if state
            .take_fault(|f| matches!(f, Fault::CreatePropertySet))
            .is_some()
        {
            return Err(TransportError::failed(
                Verb::CreateMessageHandle,
                MQRC_HMSG_ERROR,
            ));
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.property_sets.insert(handle, BTreeMap::new());
        state.stats.property_sets_created += 1;
        Ok(MemoryPropertySet {
            broker: Arc::clone(&self.broker),
            handle: MessageHandle(handle),
        })
    }

    async fn disconnect(&self) -> TransportResult<()> {
        let mut state = self.broker.lock();
        state.stats.disconnects += 1;
        self.connected.store(false, Ordering::Release);
        if state.take_fault(|f| matches!(f, Fault::Disconnect)).is_some() {
            return Err(TransportError::failed(
                Verb::Disconnect,
                MQRC_CONNECTION_BROKEN,
            ));
        }
        Ok(())
    }
}

/// Queue handle handed out by [`MemoryConnection`].
#[derive(Debug)]
pub struct MemoryQueue {
    broker: Arc<BrokerInner>,
    connected: Arc<AtomicBool>,
    name: String,
    options: OpenOptions,
}

impl MemoryQueue {
    fn ensure_connected(&self, verb: Verb) -> TransportResult<()> {
        if self.connected.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(TransportError::failed(verb, MQRC_CONNECTION_BROKEN))
        }
    }

    /// Remove the first message accepted by `descriptor` and `options`.
    fn take_matching(
        &self,
        state: &mut BrokerState,
        descriptor: &MessageDescriptor,
        options: &GetOptions,
    ) -> Option<StoredMessage> {
        let messages = state.queues.get_mut(&self.name)?;
        let index = if options.match_correlation_id {
            messages
                .iter()
                .position(|m| m.descriptor.correlation_id == descriptor.correlation_id)?
        } else if messages.is_empty() {
            return None;
        } else {
            0
        };
        messages.remove(index)
    }
}

#[async_trait]
impl QueueObject for MemoryQueue {
    fn name(&self) -> &str { &self.name }

    async fn put(
        &mut self,
        descriptor: &mut MessageDescriptor,
        options: &PutOptions,
        payload: &[u8],
    ) -> TransportResult<()> {
        self.ensure_connected(Verb::Put)?;
        if !self.options.output {
            return Err(TransportError::failed(Verb::Put, MQRC_NOT_OPEN_FOR_OUTPUT));
        }
        let mut state = self.broker.lock();
        if let Some(Fault::Put(reason)) = state.take_fault(|f| matches!(f, Fault::Put(_))) {
            return Err(TransportError::failed(Verb::Put, reason));
        }
        if options.fail_if_quiescing && state.quiescing {
            return Err(TransportError::failed(Verb::Put, MQRC_Q_MGR_QUIESCING));
        }
        let properties = match options.original_message_handle {
            Some(MessageHandle(handle)) => state
                .property_sets
                .get(&handle)
                .cloned()
                .ok_or(TransportError::failed(Verb::Put, MQRC_HMSG_ERROR))?,
            None => BTreeMap::new(),
        };
        if options.new_message_id {
            descriptor.message_id = self.broker.next_message_id(&mut state);
        }
        let message = StoredMessage {
            descriptor: descriptor.clone(),
            payload: Bytes::copy_from_slice(payload),
            properties,
        };
        let queue = state
            .queues
            .get_mut(&self.name)
            .ok_or(TransportError::failed(Verb::Put, MQRC_UNKNOWN_OBJECT_NAME))?;
        queue.push_back(message);
        state.stats.puts += 1;
        drop(state);
        self.broker.arrivals.notify_waiters();
        Ok(())
    }

    async fn get(
        &mut self,
        descriptor: &mut MessageDescriptor,
        options: &GetOptions,
    ) -> TransportResult<Option<Bytes>> {
        self.ensure_connected(Verb::Get)?;
        if !self.options.allows_input() {
            return Err(TransportError::failed(Verb::Get, MQRC_NOT_OPEN_FOR_INPUT));
        }
        {
            let mut state = self.broker.lock();
            state.stats.gets += 1;
            if let Some(Fault::Get(reason)) = state.take_fault(|f| matches!(f, Fault::Get(_))) {
                return Err(TransportError::failed(Verb::Get, reason));
            }
        }

        let deadline = options.wait.map(|wait| Instant::now() + wait);
        loop {
            // Register interest before inspecting the queue so a put that
            // lands between the check and the wait still wakes us.
            let notified = self.broker.arrivals.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.broker.lock();
                if state.quiescing {
                    return Err(TransportError::failed(Verb::Get, MQRC_Q_MGR_QUIESCING));
                }
                if let Some(message) = self.take_matching(&mut state, descriptor, options) {
                    *descriptor = message.descriptor;
                    return Ok(Some(message.payload));
                }
            }

            let Some(deadline) = deadline else {
                return Ok(None);
            };
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Ok(None);
            }
            self.ensure_connected(Verb::Get)?;
        }
    }

    async fn close(self) -> TransportResult<()> {
        let mut state = self.broker.lock();
        state.stats.closes += 1;
        if state.take_fault(|f| matches!(f, Fault::Close)).is_some() {
            return Err(TransportError::failed(Verb::Close, MQRC_CONNECTION_BROKEN));
        }
        Ok(())
    }
}

/// Message handle handed out by [`MemoryConnection`].
#[derive(Debug)]
pub struct MemoryPropertySet {
    broker: Arc<BrokerInner>,
    handle: MessageHandle,
}

#[async_trait]
impl PropertySet for MemoryPropertySet {
    fn handle(&self) -> MessageHandle { self.handle }

    async fn set(&mut self, name: &str, value: &PropertyValue) -> TransportResult<()> {
        let mut state = self.broker.lock();
        if state
            .take_fault(|f| matches!(f, Fault::SetProperty(key) if key == name))
            .is_some()
            || name.is_empty()
        {
            return Err(TransportError::failed(
                Verb::SetMessageProperty,
                super::MQRC_PROPERTY_NAME_ERROR,
            ));
        }
        state.stats.properties_set += 1;
        state
            .property_sets
            .get_mut(&self.handle.0)
            .ok_or(TransportError::failed(
                Verb::SetMessageProperty,
                MQRC_HMSG_ERROR,
            ))?
            .insert(name.to_owned(), value.clone());
        Ok(())
    }

    async fn destroy(self) -> TransportResult<()> {
        let mut state = self.broker.lock();
        state.property_sets.remove(&self.handle.0);
        state.stats.property_sets_destroyed += 1;
        if state
            .take_fault(|f| matches!(f, Fault::DestroyPropertySet))
            .is_some()
        {
            return Err(TransportError::failed(
                Verb::DeleteMessageHandle,
                MQRC_HMSG_ERROR,
            ));
        }
        Ok(())
    }
}
