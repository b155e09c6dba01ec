use std::time::Duration;

use crate::error::ConnectionError;
use crate::protocol;

use super::{network, ClientConfig, KafkaClient};

/// A `KafkaClient` builder easing the process of setting up various
/// configuration settings.
#[derive(Debug)]
pub struct Builder {
    hosts: Vec<String>,
    client_id: String,
    conn_rw_timeout: Option<Duration>,
    conn_idle_timeout: Duration,
    fetch_max_wait_time: Duration,
    fetch_min_bytes: i32,
    fetch_max_bytes_per_partition: i32,
    retry_max_bytes_limit: i32,
    fetch_crc_validation: bool,
}

// ~ public only to be shared inside the crate; not supposed to
// be published outside the crate itself
pub fn new(hosts: Vec<String>) -> Builder {
    Builder {
        hosts,
        client_id: super::DEFAULT_CLIENT_ID.to_owned(),
        conn_rw_timeout: super::default_conn_rw_timeout(),
        conn_idle_timeout: Duration::from_millis(super::DEFAULT_CONNECTION_IDLE_TIMEOUT_MILLIS),
        fetch_max_wait_time: Duration::from_millis(super::DEFAULT_FETCH_MAX_WAIT_TIME_MILLIS),
        fetch_min_bytes: super::DEFAULT_FETCH_MIN_BYTES,
        fetch_max_bytes_per_partition: super::DEFAULT_FETCH_MAX_BYTES_PER_PARTITION,
        retry_max_bytes_limit: super::DEFAULT_RETRY_MAX_BYTES_LIMIT,
        fetch_crc_validation: super::DEFAULT_FETCH_CRC_VALIDATION,
    }
}

impl Builder {
    /// Specifies the client id to identify this client to the
    /// cluster, e.g. in the brokers' request logs.
    pub fn with_client_id(mut self, client_id: String) -> Self {
        self.client_id = client_id;
        self
    }

    /// Specifies the read/write timeout of the connections to the
    /// brokers. `None` blocks indefinitely.
    pub fn with_connection_rw_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.conn_rw_timeout = timeout;
        self
    }

    /// Specifies the timeout after which idle pooled connections will
    /// be re-established before being used again.
    pub fn with_connection_idle_timeout(mut self, timeout: Duration) -> Self {
        self.conn_idle_timeout = timeout;
        self
    }

    /// Specifies the maximum time a broker may block a single fetch
    /// request waiting for data. Values beyond `i32::MAX`
    /// milliseconds are capped.
    pub fn with_fetch_max_wait_time(mut self, max_wait_time: Duration) -> Self {
        self.fetch_max_wait_time = max_wait_time;
        self
    }

    /// Specifies the minimum amount of data a broker should gather
    /// before answering a fetch request (unless `fetch_max_wait_time`
    /// elapses.)
    pub fn with_fetch_min_bytes(mut self, min_bytes: i32) -> Self {
        self.fetch_min_bytes = min_bytes;
        self
    }

    /// Specifies the upper bound of data to fetch per partition and
    /// request.
    pub fn with_fetch_max_bytes_per_partition(mut self, max_bytes_per_partition: i32) -> Self {
        self.fetch_max_bytes_per_partition = max_bytes_per_partition;
        self
    }

    /// Specifies the upper bound up to which `fetch_max_bytes_per_partition`
    /// gets doubled when a single record batch does not fit into a
    /// fetch response.
    pub fn with_retry_max_bytes_limit(mut self, limit: i32) -> Self {
        self.retry_max_bytes_limit = limit;
        self
    }

    /// Specifies whether to validate the checksums of fetched
    /// messages.
    pub fn with_fetch_crc_validation(mut self, validate_crc: bool) -> Self {
        self.fetch_crc_validation = validate_crc;
        self
    }

    fn into_client(self) -> KafkaClient {
        let fetch_max_wait_time =
            protocol::to_millis_i32(self.fetch_max_wait_time).unwrap_or(i32::MAX);
        KafkaClient::from_parts(
            ClientConfig {
                client_id: self.client_id,
                hosts: self.hosts,
                fetch_max_wait_time,
                fetch_min_bytes: self.fetch_min_bytes,
                fetch_max_bytes_per_partition: self.fetch_max_bytes_per_partition,
                retry_max_bytes_limit: self.retry_max_bytes_limit,
                fetch_crc_validation: self.fetch_crc_validation,
            },
            network::Connections::new(self.conn_rw_timeout, self.conn_idle_timeout),
        )
    }

    /// Establishes the client; discovers the cluster's brokers through
    /// the first reachable bootstrap host.
    pub fn connect(self) -> Result<KafkaClient, ConnectionError> {
        if self.hosts.is_empty() {
            return Err(ConnectionError::NoBootstrapAddress);
        }
        let client = self.into_client();
        client.bootstrap()?;
        Ok(client)
    }
}
