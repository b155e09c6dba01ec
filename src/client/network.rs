//! Network related functionality for `KafkaClient`.
//!
//! This module is crate private and not exposed to the public except
//! through re-exports of individual items from within
//! `kafka_inspect::client`.

use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, trace, warn};

use crate::codecs::{FromByte, ToByte};
use crate::error::{Error, Result};

use super::state::Broker;

// --------------------------------------------------------------------

struct Pooled<T> {
    last_checkout: Instant,
    item: T,
}

impl<T> Pooled<T> {
    fn new(last_checkout: Instant, item: T) -> Self {
        Pooled {
            last_checkout,
            item,
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Pooled<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pooled {{ last_checkout: {:?}, item: {:?} }}",
            self.last_checkout, self.item
        )
    }
}

#[derive(Debug)]
pub struct Config {
    rw_timeout: Option<Duration>,
    idle_timeout: Duration,
    // a surrogate identifier source for new connections
    num_conns: AtomicU32,
}

impl Config {
    pub fn new(rw_timeout: Option<Duration>, idle_timeout: Duration) -> Config {
        Config {
            rw_timeout,
            idle_timeout,
            num_conns: AtomicU32::new(0),
        }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Establishes a new connection to the given "host:port".
    pub fn new_conn(&self, host: &str) -> Result<KafkaConnection> {
        let id = self.num_conns.fetch_add(1, Ordering::Relaxed);
        KafkaConnection::new(id, host, self.rw_timeout).map(|c| {
            debug!("Established: {:?}", c);
            c
        })
    }
}

#[derive(Debug, Default)]
struct Pool {
    conns: HashMap<String, Pooled<KafkaConnection>>,
    closed: bool,
}

/// A pool of re-usable connections, at most one idle connection per
/// host. A connection is checked out exclusively for one
/// request/response exchange and given back afterwards.
#[derive(Debug)]
pub struct Connections {
    pool: Mutex<Pool>,
    config: Config,
}

impl Connections {
    pub fn new(rw_timeout: Option<Duration>, idle_timeout: Duration) -> Connections {
        Connections {
            pool: Mutex::new(Pool::default()),
            config: Config::new(rw_timeout, idle_timeout),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Pool> {
        self.pool.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Takes the idle connection to `host` out of the pool or
    /// establishes a new one if there is none (or it has been idle
    /// for too long.)
    pub fn checkout(&self, host: &str, now: Instant) -> Result<KafkaConnection> {
        let pooled = {
            let mut pool = self.lock();
            if pool.closed {
                return Err(Error::ClientClosed);
            }
            pool.conns.remove(host)
        };
        match pooled {
            Some(conn) if now.duration_since(conn.last_checkout) < self.config.idle_timeout() => {
                Ok(conn.item)
            }
            Some(mut conn) => {
                debug!("Idle timeout reached: {:?}", conn.item);
                let _ = conn.item.shutdown();
                self.config.new_conn(host)
            }
            None => self.config.new_conn(host),
        }
    }

    /// Returns a previously checked out connection to the pool.
    pub fn give_back(&self, mut conn: KafkaConnection, now: Instant) {
        let mut pool = self.lock();
        if pool.closed {
            drop(pool);
            let _ = conn.shutdown();
            return;
        }
        let host = conn.host().to_owned();
        if let Some(mut replaced) = pool.conns.insert(host, Pooled::new(now, conn)) {
            // ~ another caller gave back a connection to the same host
            // in the meantime
            let _ = replaced.item.shutdown();
        }
    }

    /// Shuts down all pooled connections; connections checked out at
    /// this time will be shut down when given back.
    pub fn close(&self) {
        let conns = {
            let mut pool = self.lock();
            pool.closed = true;
            std::mem::take(&mut pool.conns)
        };
        for (_, mut conn) in conns {
            let _ = conn.item.shutdown();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }
}

// --------------------------------------------------------------------

/// A TCP stream to a remote Kafka broker.
pub struct KafkaConnection {
    // a surrogate identifier to distinguish between
    // connections to the same host in debug messages
    id: u32,
    // "host:port"
    host: String,
    stream: TcpStream,
}

impl fmt::Debug for KafkaConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "KafkaConnection {{ id: {}, host: \"{}\" }}",
            self.id, self.host
        )
    }
}

impl KafkaConnection {
    pub fn send(&mut self, msg: &[u8]) -> Result<usize> {
        let r = self.stream.write_all(msg).map(|_| msg.len()).map_err(From::from);
        trace!("Sent {} bytes to: {:?} => {:?}", msg.len(), self, r);
        r
    }

    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let r = self.stream.read_exact(buf).map_err(From::from);
        trace!("Read {} bytes from: {:?} => {:?}", buf.len(), self, r);
        r
    }

    pub fn read_exact_alloc(&mut self, size: u64) -> Result<Vec<u8>> {
        let mut buffer = vec![0; size as usize];
        self.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// A second handle onto the underlying socket allowing another
    /// thread to interrupt a blocking read.
    pub fn try_clone_stream(&self) -> Result<TcpStream> {
        self.stream.try_clone().map_err(From::from)
    }

    pub fn shutdown(&mut self) -> Result<()> {
        let r = self.stream.shutdown(Shutdown::Both);
        debug!("Shut down: {:?} => {:?}", self, r);
        r.map_err(From::from)
    }

    fn new(id: u32, host: &str, rw_timeout: Option<Duration>) -> Result<KafkaConnection> {
        let stream = TcpStream::connect(host)?;
        stream.set_read_timeout(rw_timeout)?;
        stream.set_write_timeout(rw_timeout)?;
        Ok(KafkaConnection {
            id,
            host: host.to_owned(),
            stream,
        })
    }
}

// --------------------------------------------------------------------

/// A dedicated connection to a single broker, opened for one RPC and
/// closed right after. `close` consumes the handle; a handle dropped
/// without being closed is closed on drop.
#[derive(Debug)]
pub struct BrokerHandle {
    broker: Broker,
    conn: Option<KafkaConnection>,
}

impl BrokerHandle {
    pub fn open(config: &Config, broker: Broker) -> Result<BrokerHandle> {
        let conn = config.new_conn(broker.host())?;
        Ok(BrokerHandle {
            broker,
            conn: Some(conn),
        })
    }

    pub fn broker(&self) -> &Broker {
        &self.broker
    }

    pub fn send_receive<T, V>(&mut self, req: T) -> Result<V::R>
    where
        T: ToByte,
        V: FromByte,
    {
        match self.conn {
            Some(ref mut conn) => super::__send_receive_conn::<T, V>(conn, req),
            None => Err(Error::ClientClosed),
        }
    }

    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        match self.conn.take() {
            Some(mut conn) => conn.shutdown(),
            None => Ok(()),
        }
    }
}

impl Drop for BrokerHandle {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("Failed to close connection to {:?}: {}", self.broker, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::time::{Duration, Instant};

    use super::*;

    fn listener() -> (TcpListener, String) {
        let l = TcpListener::bind("127.0.0.1:0").unwrap();
        let host = l.local_addr().unwrap().to_string();
        (l, host)
    }

    #[test]
    fn test_checkout_reuses_given_back_connection() {
        let (_l, host) = listener();
        let conns = Connections::new(None, Duration::from_secs(60));
        let now = Instant::now();
        let c = conns.checkout(&host, now).unwrap();
        let id = c.id;
        conns.give_back(c, now);
        let c = conns.checkout(&host, now).unwrap();
        assert_eq!(id, c.id);
        // the pool is empty while the connection is checked out
        let other = conns.checkout(&host, now).unwrap();
        assert_ne!(c.id, other.id);
    }

    #[test]
    fn test_checkout_replaces_idle_connection() {
        let (_l, host) = listener();
        let conns = Connections::new(None, Duration::from_millis(10));
        let now = Instant::now();
        let c = conns.checkout(&host, now).unwrap();
        let id = c.id;
        conns.give_back(c, now);
        let c = conns.checkout(&host, now + Duration::from_millis(20)).unwrap();
        assert_ne!(id, c.id);
    }

    #[test]
    fn test_closed_pool() {
        let (_l, host) = listener();
        let conns = Connections::new(None, Duration::from_secs(60));
        let c = conns.checkout(&host, Instant::now()).unwrap();
        conns.close();
        conns.close();
        assert!(conns.is_closed());
        conns.give_back(c, Instant::now());
        assert!(matches!(
            conns.checkout(&host, Instant::now()),
            Err(Error::ClientClosed)
        ));
    }

    #[test]
    fn test_broker_handle_close() {
        let (_l, host) = listener();
        let config = Config::new(None, Duration::from_secs(60));
        let (host_name, port) = host.rsplit_once(':').unwrap();
        let broker = Broker::new(1, host_name, port.parse().unwrap());
        let h = BrokerHandle::open(&config, broker).unwrap();
        assert_eq!(1, h.broker().id());
        h.close().unwrap();
    }

    #[test]
    fn test_broker_handle_unreachable() {
        // bind and drop to obtain an address nobody listens on
        let host = listener().1;
        let config = Config::new(Some(Duration::from_secs(1)), Duration::from_secs(60));
        let (host_name, port) = host.rsplit_once(':').unwrap();
        let broker = Broker::new(1, host_name, port.parse().unwrap());
        assert!(matches!(BrokerHandle::open(&config, broker), Err(Error::Io(_))));
    }
}
