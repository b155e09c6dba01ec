//! Kafka Client - an inspection client for a kafka cluster.
//!
//! The entry point into this module is `KafkaClient` obtained by a
//! call to `KafkaClient::connect()` or through
//! `KafkaClient::builder()`.

use std::io::Cursor;
use std::result;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::codecs::{FromByte, ToByte};
use crate::error::{
    ConnectionError, Error, FetchError, GroupError, KafkaCode, MetadataError, OffsetError, Result,
};
use crate::protocol::{self, ResponseParser};

pub use self::builder::Builder;
pub use self::metadata::{Broker, PartitionMetadata, TopicMetadata};
pub use crate::protocol::records::{Header, Message};

mod builder;
mod cursor;
pub mod metadata;
mod network;
mod state;

#[cfg(test)]
mod mock;

use self::cursor::PartitionCursor;
use self::network::BrokerHandle;
use self::state::Leader;

const DEFAULT_CONNECTION_RW_TIMEOUT_SECS: u64 = 120;

fn default_conn_rw_timeout() -> Option<Duration> {
    match DEFAULT_CONNECTION_RW_TIMEOUT_SECS {
        0 => None,
        n => Some(Duration::from_secs(n)),
    }
}

/// The default value for `Builder::with_client_id(..)`
pub const DEFAULT_CLIENT_ID: &str = "kafka-inspect";

/// The default value for `Builder::with_fetch_max_wait_time(..)`
pub const DEFAULT_FETCH_MAX_WAIT_TIME_MILLIS: u64 = 100;

/// The default value for `Builder::with_fetch_min_bytes(..)`
pub const DEFAULT_FETCH_MIN_BYTES: i32 = 1;

/// The default value for `Builder::with_fetch_max_bytes_per_partition(..)`
pub const DEFAULT_FETCH_MAX_BYTES_PER_PARTITION: i32 = 32 * 1024;

/// The default value for `Builder::with_retry_max_bytes_limit(..)`
pub const DEFAULT_RETRY_MAX_BYTES_LIMIT: i32 = 1024 * 1024;

/// The default value for `Builder::with_fetch_crc_validation(..)`
pub const DEFAULT_FETCH_CRC_VALIDATION: bool = true;

/// The default value for `Builder::with_connection_idle_timeout(..)`
pub const DEFAULT_CONNECTION_IDLE_TIMEOUT_MILLIS: u64 = 540_000;

// the upper bound of messages buffered between a fetch worker and
// the caller accumulating them
const MAX_CURSOR_BUFFER: usize = 1024;

/// Client struct keeping track of brokers and partition leaders.
///
/// All operations take `&self`; a client can be shared between
/// threads. Concurrent callers never share a connection.
#[derive(Debug)]
pub struct KafkaClient {
    // ~ this kafka client configuration
    config: ClientConfig,

    // ~ a pool of re-usable connections to kafka brokers
    conn_pool: network::Connections,

    // ~ the broker/leader cache of this client
    state: RwLock<state::ClientState>,

    // ~ the last correlation used when communicating with kafka
    correlation: AtomicI32,
}

#[derive(Debug)]
struct ClientConfig {
    client_id: String,
    hosts: Vec<String>,
    // ~ these are the defaults when fetching messages for details
    // refer to the kafka wire protocol
    fetch_max_wait_time: i32,
    fetch_min_bytes: i32,
    fetch_max_bytes_per_partition: i32,
    retry_max_bytes_limit: i32,
    fetch_crc_validation: bool,
}

// --------------------------------------------------------------------

/// Possible values when querying a partition's offset.
/// See `KafkaClient::fetch_offset`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FetchOffset {
    /// Receive the earliest available offset.
    Earliest,
    /// Receive the latest offset, i.e. the offset of the next message
    /// to be written.
    Latest,
    /// Used to ask for the earliest offset whose timestamp is greater
    /// than or equal to the given one (milliseconds since the epoch.)
    ByTime(i64),
}

impl FetchOffset {
    fn to_kafka_value(self) -> i64 {
        match self {
            FetchOffset::Earliest => -2,
            FetchOffset::Latest => -1,
            FetchOffset::ByTime(n) => n,
        }
    }
}

/// The range of offsets currently available in a partition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OffsetRange {
    /// The offset of the oldest retained message.
    pub low: i64,
    /// The offset of the next message to be written (the high
    /// watermark.)
    pub high: i64,
}

/// An active consumer group known to the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescription {
    pub group_id: String,
    /// The protocol type of the group, e.g. "consumer"; empty for
    /// groups only committing offsets.
    pub protocol_type: String,
}

// --------------------------------------------------------------------

impl KafkaClient {
    /// Connects to the cluster behind the given bootstrap hosts
    /// ("host:port") using the default configuration.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let client = kafka_inspect::KafkaClient::connect(&["localhost:9092"]).unwrap();
    /// for topic in client.topic_names().unwrap() {
    ///     println!("topic: {}", topic);
    /// }
    /// ```
    pub fn connect<H: AsRef<str>>(hosts: &[H]) -> result::Result<KafkaClient, ConnectionError> {
        KafkaClient::builder(hosts).connect()
    }

    /// Starts configuring a client for the given bootstrap hosts.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    ///
    /// let client = kafka_inspect::KafkaClient::builder(&["localhost:9092"])
    ///     .with_client_id("inspector".to_owned())
    ///     .with_fetch_max_wait_time(Duration::from_millis(250))
    ///     .connect()
    ///     .unwrap();
    /// ```
    pub fn builder<H: AsRef<str>>(hosts: &[H]) -> Builder {
        builder::new(hosts.iter().map(|h| h.as_ref().to_owned()).collect())
    }

    fn from_parts(config: ClientConfig, conn_pool: network::Connections) -> KafkaClient {
        KafkaClient {
            config,
            conn_pool,
            state: RwLock::new(state::ClientState::new()),
            correlation: AtomicI32::new(0),
        }
    }

    /// Discovers the brokers of the cluster through the first
    /// bootstrap host answering a metadata request.
    fn bootstrap(&self) -> result::Result<(), ConnectionError> {
        let mut last_err = Error::NoHostReachable;
        for host in &self.config.hosts {
            debug!("bootstrap: requesting brokers from {}", host);
            let req = protocol::MetadataRequest::<&str>::new(
                self.next_correlation_id(),
                &self.config.client_id,
                Some(&[][..]),
            );
            match self.send_receive_pooled::<_, protocol::MetadataResponse>(host, req) {
                Ok(md) => {
                    self.state_mut().update_metadata(&md, false);
                    return Ok(());
                }
                Err(e) => {
                    debug!("bootstrap: failed to request brokers from {}: {}", host, e);
                    last_err = e;
                }
            }
        }
        Err(ConnectionError::Unreachable {
            hosts: self.config.hosts.clone(),
            source: last_err,
        })
    }

    /// Retrieves the bootstrap hosts this client was created with.
    #[inline]
    pub fn hosts(&self) -> &[String] {
        &self.config.hosts
    }

    /// Retrieves the client id identifying this client to the cluster.
    #[inline]
    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    /// Shuts down all pooled connections. Subsequent operations fail
    /// with `Error::ClientClosed`. Closing an already closed client is
    /// a no-op.
    pub fn close(&self) {
        if !self.conn_pool.is_closed() {
            debug!("closing client for: {:?}", self.config.hosts);
        }
        self.conn_pool.close();
    }

    /// Determines whether `close` has been called on this client.
    pub fn is_closed(&self) -> bool {
        self.conn_pool.is_closed()
    }

    /// The brokers discovered so far.
    pub fn brokers(&self) -> Vec<Broker> {
        self.state().brokers().to_vec()
    }

    /// Loads the names of all topics of the cluster in ascending order.
    /// This refreshes the partition leaders known to this client.
    pub fn topic_names(&self) -> result::Result<Vec<String>, MetadataError> {
        self.check_open()?;
        let md = self.fetch_metadata::<&str>(None)?;
        let mut state = self.state_mut();
        state.update_metadata(&md, true);
        Ok(state.topic_names())
    }

    /// Resolves the metadata of the given topics or, if `topics` is
    /// empty, of all topics of the cluster.
    ///
    /// The request is sent through a dedicated connection to a single
    /// broker which is closed before returning. The partitions are
    /// reported in the order delivered by the cluster.
    ///
    /// Note: if any of the specified topics does not exist yet and the
    /// cluster has the "auto create topics" configuration enabled, the
    /// cluster will create the missing topics as a result of this
    /// request.
    pub fn topic_metadata<T: AsRef<str>>(
        &self,
        topics: &[T],
    ) -> result::Result<Vec<TopicMetadata>, MetadataError> {
        self.check_open()?;
        if let Some(t) = topics
            .iter()
            .map(AsRef::as_ref)
            .find(|t| !metadata::is_valid_topic_name(t))
        {
            return Err(MetadataError::InvalidTopicName(t.to_owned()));
        }
        let names: Vec<String> = if topics.is_empty() {
            self.topic_names()?
        } else {
            topics.iter().map(|t| t.as_ref().to_owned()).collect()
        };

        let broker = self
            .state()
            .brokers()
            .first()
            .cloned()
            .ok_or(MetadataError::NoBrokerAvailable)?;
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let mut handle = BrokerHandle::open(self.conn_pool.config(), broker)?;
        debug!("topic_metadata: requesting {:?} from {:?}", names, handle.broker());
        let req = protocol::MetadataRequest::new(
            self.next_correlation_id(),
            &self.config.client_id,
            Some(&names[..]),
        );
        let resp = handle.send_receive::<_, protocol::MetadataResponse>(req);
        if let Err(e) = handle.close() {
            warn!("topic_metadata: failed to close broker connection: {}", e);
        }
        let md = resp?;

        let topics = md.topics.iter().map(TopicMetadata::from).collect();
        self.state_mut().update_metadata(&md, false);
        Ok(topics)
    }

    /// Determines the range of offsets currently available in the
    /// given partition.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// let client = kafka_inspect::KafkaClient::connect(&["localhost:9092"]).unwrap();
    /// let range = client.offset_range("my-topic", 0).unwrap();
    /// println!("{} messages retained", range.high - range.low);
    /// ```
    pub fn offset_range(&self, topic: &str, partition: i32) -> result::Result<OffsetRange, OffsetError> {
        self.check_open()?;
        let host = self.leader_of(topic, partition)?;
        let mut conn = self.conn_pool.checkout(&host, Instant::now())?;
        let range = self.list_offset_range(&mut conn, topic, partition);
        if range.is_ok() {
            self.conn_pool.give_back(conn, Instant::now());
        }
        Ok(range?)
    }

    /// Looks up a single offset of the given partition.
    pub fn fetch_offset(
        &self,
        topic: &str,
        partition: i32,
        offset: FetchOffset,
    ) -> result::Result<i64, OffsetError> {
        self.check_open()?;
        let host = self.leader_of(topic, partition)?;
        let mut conn = self.conn_pool.checkout(&host, Instant::now())?;
        let r = self.list_offset(&mut conn, topic, partition, offset);
        if r.is_ok() {
            self.conn_pool.give_back(conn, Instant::now());
        }
        Ok(r?)
    }

    /// Reads up to `max_count` messages of the given partition
    /// starting at `start_offset`, waiting at most `timeout` in total.
    ///
    /// Running into the timeout is not an error: the messages
    /// accumulated so far are returned, possibly none. A failure of
    /// the underlying fetch requests after the read has started is
    /// logged and likewise ends the read early.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::time::Duration;
    ///
    /// let client = kafka_inspect::KafkaClient::connect(&["localhost:9092"]).unwrap();
    /// let range = client.offset_range("my-topic", 0).unwrap();
    /// for m in client.fetch("my-topic", 0, range.low, 10, Duration::from_secs(5)).unwrap() {
    ///     println!("{}: {:?}", m.offset, m.value);
    /// }
    /// ```
    pub fn fetch(
        &self,
        topic: &str,
        partition: i32,
        start_offset: i64,
        max_count: usize,
        timeout: Duration,
    ) -> result::Result<Vec<Message>, FetchError> {
        self.check_open()?;
        if max_count == 0 || timeout.is_zero() {
            return Ok(Vec::new());
        }
        let deadline = Instant::now().checked_add(timeout);

        let capacity = max_count.min(MAX_CURSOR_BUFFER);
        let cursor = PartitionCursor::open(self, topic, partition, start_offset, capacity)?;
        let mut msgs = Vec::with_capacity(capacity);
        while msgs.len() < max_count {
            match cursor.next_before(deadline) {
                Ok(Some(msg)) => msgs.push(msg),
                Ok(None) => {
                    debug!(
                        "fetch: deadline reached for {}:{} after {} messages",
                        topic,
                        partition,
                        msgs.len()
                    );
                    break;
                }
                Err(e) => {
                    warn!(
                        "fetch: reading {}:{} ended early after {} messages: {}",
                        topic,
                        partition,
                        msgs.len(),
                        e
                    );
                    break;
                }
            }
        }
        Ok(msgs)
    }

    /// Lists the consumer groups known to the cluster. Every known
    /// broker is asked for the groups it coordinates; the union is
    /// returned ordered by group id.
    pub fn list_groups(&self) -> result::Result<Vec<GroupDescription>, GroupError> {
        self.check_open()?;
        let brokers = self.brokers();
        if brokers.is_empty() {
            return Err(GroupError::BrokerUnavailable);
        }
        let mut groups = Vec::new();
        for broker in brokers {
            let mut handle = BrokerHandle::open(self.conn_pool.config(), broker)?;
            let req = protocol::ListGroupsRequest::new(self.next_correlation_id(), &self.config.client_id);
            let resp = handle.send_receive::<_, protocol::ListGroupsResponse>(req);
            if let Err(e) = handle.close() {
                warn!("list_groups: failed to close broker connection: {}", e);
            }
            let resp = resp?;
            if let Some(e) = Error::from_protocol(resp.error) {
                return Err(GroupError::Broker(e));
            }
            groups.extend(resp.groups.into_iter().map(|g| GroupDescription {
                group_id: g.group_id,
                protocol_type: g.protocol_type,
            }));
        }
        groups.sort_by(|a, b| a.group_id.cmp(&b.group_id));
        groups.dedup_by(|a, b| a.group_id == b.group_id);
        Ok(groups)
    }

    // ----------------------------------------------------------------

    fn check_open(&self) -> Result<()> {
        if self.conn_pool.is_closed() {
            Err(Error::ClientClosed)
        } else {
            Ok(())
        }
    }

    fn next_correlation_id(&self) -> i32 {
        // ~ stay within the positive range of i32
        self.correlation.fetch_add(1, Ordering::Relaxed).wrapping_add(1) & 0x3fff_ffff
    }

    fn state(&self) -> RwLockReadGuard<'_, state::ClientState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn state_mut(&self) -> RwLockWriteGuard<'_, state::ClientState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches metadata about the specified topics (`None` for all of
    /// them) through a pooled connection to a known broker or a
    /// bootstrap host.
    fn fetch_metadata<T: AsRef<str>>(&self, topics: Option<&[T]>) -> Result<protocol::MetadataResponse> {
        let mut hosts: Vec<String> = self.state().brokers().iter().map(|b| b.host().to_owned()).collect();
        hosts.extend(self.config.hosts.iter().cloned());

        for host in &hosts {
            debug!("fetch_metadata: requesting metadata from {}", host);
            let req = protocol::MetadataRequest::new(self.next_correlation_id(), &self.config.client_id, topics);
            match self.send_receive_pooled::<_, protocol::MetadataResponse>(host, req) {
                Ok(md) => return Ok(md),
                Err(Error::ClientClosed) => return Err(Error::ClientClosed),
                Err(e) => debug!("fetch_metadata: failed to request metadata from {}: {}", host, e),
            }
        }
        Err(Error::NoHostReachable)
    }

    /// Resolves the "host:port" of the given partition's leader;
    /// refreshes the metadata of the topic once if the partition is
    /// not known yet.
    fn leader_of(&self, topic: &str, partition: i32) -> result::Result<String, OffsetError> {
        if let Leader::Host(host) = self.state().find_leader(topic, partition) {
            return Ok(host.to_owned());
        }
        debug!("leader_of: refreshing metadata for {}:{}", topic, partition);
        let topics = [topic];
        let md = self.fetch_metadata(Some(&topics[..]))?;
        let mut state = self.state_mut();
        state.update_metadata(&md, false);
        match state.find_leader(topic, partition) {
            Leader::Host(host) => Ok(host.to_owned()),
            Leader::NotAvailable => Err(OffsetError::LeaderNotAvailable {
                topic: topic.to_owned(),
                partition,
            }),
            Leader::Unknown => Err(OffsetError::PartitionNotFound {
                topic: topic.to_owned(),
                partition,
            }),
        }
    }

    fn list_offset(
        &self,
        conn: &mut network::KafkaConnection,
        topic: &str,
        partition: i32,
        offset: FetchOffset,
    ) -> Result<i64> {
        let mut req = protocol::ListOffsetsRequest::new(
            self.next_correlation_id(),
            protocol::ListOffsetVersion::V1,
            &self.config.client_id,
        );
        req.add(topic, partition, offset.to_kafka_value());
        let resp = __send_receive_conn::<_, protocol::ListOffsetsResponse>(conn, req)?;
        match resp.find(topic, partition) {
            None => Err(Error::Kafka(KafkaCode::UnknownTopicOrPartition)),
            Some(p) => p.to_offset().map_err(|code| Error::TopicPartitionError {
                topic_name: topic.to_owned(),
                partition_id: partition,
                error_code: code,
            }),
        }
    }

    fn list_offset_range(
        &self,
        conn: &mut network::KafkaConnection,
        topic: &str,
        partition: i32,
    ) -> Result<OffsetRange> {
        let low = self.list_offset(conn, topic, partition, FetchOffset::Earliest)?;
        let high = self.list_offset(conn, topic, partition, FetchOffset::Latest)?;
        Ok(OffsetRange { low, high })
    }

    /// Sends a request through a pooled connection to `host`. The
    /// connection is given back only after a complete exchange.
    fn send_receive_pooled<T, V>(&self, host: &str, req: T) -> Result<V::R>
    where
        T: ToByte,
        V: FromByte,
    {
        let mut conn = self.conn_pool.checkout(host, Instant::now())?;
        let r = __send_receive_conn::<T, V>(&mut conn, req);
        if r.is_ok() {
            self.conn_pool.give_back(conn, Instant::now());
        }
        r
    }
}

impl Drop for KafkaClient {
    fn drop(&mut self) {
        self.close();
    }
}

// --------------------------------------------------------------------

fn __send_receive_conn<T, V>(conn: &mut network::KafkaConnection, req: T) -> Result<V::R>
where
    T: ToByte,
    V: FromByte,
{
    __send_request(conn, req)?;
    __get_response::<V>(conn)
}

fn __send_request<T: ToByte>(conn: &mut network::KafkaConnection, request: T) -> Result<usize> {
    // ~ buffer to receive data to be sent
    let mut buffer = Vec::with_capacity(4);
    // ~ reserve bytes for the actual request size (we'll fill in that later)
    buffer.extend_from_slice(&[0, 0, 0, 0]);
    // ~ encode the request data
    request.encode(&mut buffer)?;
    // ~ put the size of the request data into the reseved area
    let size = buffer.len() as i32 - 4;
    size.encode(&mut &mut buffer[..])?;

    trace!("__send_request: Sending bytes: {:?}", &buffer);

    // ~ send the prepared buffer
    conn.send(&buffer)
}

fn __get_response<T: FromByte>(conn: &mut network::KafkaConnection) -> Result<T::R> {
    let size = __get_response_size(conn)?;
    let resp = conn.read_exact_alloc(size as u64)?;

    trace!("__get_response: received bytes: {:?}", &resp);

    T::decode_new(&mut Cursor::new(resp))
}

fn __z_send_receive<R, P>(conn: &mut network::KafkaConnection, req: R, parser: &P) -> Result<P::T>
where
    R: ToByte,
    P: ResponseParser,
{
    __send_request(conn, req)?;
    let size = __get_response_size(conn)?;
    let resp = conn.read_exact_alloc(size as u64)?;
    parser.parse(resp)
}

fn __get_response_size(conn: &mut network::KafkaConnection) -> Result<i32> {
    let mut buf = [0u8; 4];
    conn.read_exact(&mut buf)?;
    let size = i32::decode_new(&mut Cursor::new(&buf))?;
    if size < 0 {
        return Err(Error::CodecError);
    }
    Ok(size)
}
