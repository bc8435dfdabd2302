//! # Server Connection
//!
//! One TCP connection to a login, char or map server.
//!
//! # Architecture
//!
//! Each connection owns two Tokio tasks:
//! - a reader that frames inbound bytes with [`MessageFramer`] and queues
//!   [`ConnectionEvent`]s
//! - a writer that sends whole outbound messages in order
//!
//! Handlers never run on those tasks. The owner drains the inbound queue with
//! [`Connection::next_event`] on its own logic loop.
//!
//! # Lifecycle
//!
//! ```text
//! connect → Connected ─┬─ server closes ──→ Closed
//!                      ├─ I/O or framing ─→ Failed
//!                      └─ disconnect() ───→ torn down, queue discarded
//! ```
//!
//! Reconnecting is always the owner's decision.

use athena_core::{ClientError, Result, ServerInfo, ServerRole};
use athena_protocol::{MessageIn, MessageOut};
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{BytesCodec, FramedRead, FramedWrite};

use crate::framing::MessageFramer;

/// Something the reader or writer task has to report
#[derive(Debug)]
pub enum ConnectionEvent {
    /// A complete inbound message
    Message(MessageIn),
    /// The server closed the stream
    Closed,
    /// The connection died on an I/O or framing error
    Failed(ClientError),
}

/// Traffic counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub bytes_received: u64,
    pub bytes_sent: u64,
    pub messages_received: u64,
    pub messages_sent: u64,
    /// When the reader last framed a message, paused or not
    pub last_received: Option<Instant>,
}

/// Connection to one server
///
/// # Purpose
/// Moves whole messages between the caller and a server without blocking the
/// caller. Inbound messages wait in a queue until the caller pulls them.
///
/// # Dispatch Pausing
/// While paused, [`next_event`](Self::next_event) yields nothing and inbound
/// messages accumulate. Used while the client loads a map.
pub struct Connection {
    role: ServerRole,
    server: ServerInfo,
    outbound: mpsc::UnboundedSender<Bytes>,
    inbound: mpsc::UnboundedReceiver<ConnectionEvent>,
    paused: bool,
    connected: Arc<AtomicBool>,
    stats: Arc<Mutex<ConnectionStats>>,
    reader: JoinHandle<()>,
    writer: JoinHandle<()>,
    connected_at: Instant,
}

impl Connection {
    /// Open a TCP connection
    ///
    /// # Arguments
    /// * `role` - Which server this is, for logs and events
    /// * `server` - Host and port to connect to
    /// * `framer` - Framer for the server's dialect
    /// * `connect_timeout` - Give up after this long
    ///
    /// # Errors
    /// `Connection` if the address cannot be reached in time.
    pub async fn connect(
        role: ServerRole,
        server: ServerInfo,
        framer: MessageFramer,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let address = server.address();
        tracing::info!("Connecting to {} server at {}", role, address);

        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(&address)).await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                tracing::error!("Failed to connect to {} server {}: {}", role, address, e);
                return Err(ClientError::Connection(format!(
                    "{} server {}: {}",
                    role, address, e
                )));
            }
            Err(_) => {
                tracing::error!("Connecting to {} server {} timed out", role, address);
                return Err(ClientError::Connection(format!(
                    "{} server {}: timed out after {:?}",
                    role, address, connect_timeout
                )));
            }
        };

        stream.set_nodelay(true)?;
        socket2::SockRef::from(&stream).set_keepalive(true)?;

        Ok(Self::from_stream(role, server, stream, framer))
    }

    /// Run a connection over an already open stream
    ///
    /// Must be called from within a Tokio runtime.
    pub fn from_stream<S>(role: ServerRole, server: ServerInfo, stream: S, framer: MessageFramer) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let connected = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(Mutex::new(ConnectionStats::default()));

        let reader = tokio::spawn(read_loop(
            role,
            FramedRead::new(read_half, framer),
            event_tx.clone(),
            Arc::clone(&connected),
            Arc::clone(&stats),
        ));
        let writer = tokio::spawn(write_loop(
            role,
            FramedWrite::new(write_half, BytesCodec::new()),
            outbound_rx,
            event_tx,
            Arc::clone(&connected),
            Arc::clone(&stats),
        ));

        tracing::info!("Connected to {} server {}", role, server.address());

        Self {
            role,
            server,
            outbound: outbound_tx,
            inbound: event_rx,
            paused: false,
            connected,
            stats,
            reader,
            writer,
            connected_at: Instant::now(),
        }
    }

    #[inline]
    pub fn role(&self) -> ServerRole {
        self.role
    }

    #[inline]
    pub fn server(&self) -> &ServerInfo {
        &self.server
    }

    /// Whether the socket is still usable
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    /// Queue a message for sending
    ///
    /// # Errors
    /// `Connection` if the connection is already gone.
    pub fn send(&self, msg: MessageOut) -> Result<()> {
        if !self.is_connected() {
            return Err(ClientError::Connection(format!(
                "{} server connection is closed",
                self.role
            )));
        }

        tracing::debug!("-> {} 0x{:04x} ({} bytes)", self.role, msg.opcode(), msg.len());
        let frame = msg.finish()?;
        self.outbound
            .send(frame)
            .map_err(|_| ClientError::Connection(format!("{} writer stopped", self.role)))
    }

    /// Next queued event, or `None` if nothing is queued or dispatch is paused
    pub fn next_event(&mut self) -> Option<ConnectionEvent> {
        if self.paused {
            return None;
        }
        self.inbound.try_recv().ok()
    }

    pub fn pause_dispatch(&mut self) {
        tracing::debug!("Pausing {} dispatch", self.role);
        self.paused = true;
    }

    pub fn resume_dispatch(&mut self) {
        tracing::debug!("Resuming {} dispatch", self.role);
        self.paused = false;
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Snapshot of the traffic counters
    pub fn stats(&self) -> ConnectionStats {
        self.stats.lock().clone()
    }

    /// When the server last sent a whole message
    ///
    /// Advances even while dispatch is paused.
    pub fn last_received(&self) -> Option<Instant> {
        self.stats.lock().last_received
    }

    /// Tear the connection down
    ///
    /// Stops both tasks and discards everything still queued.
    ///
    /// # Returns
    /// Number of inbound messages that were discarded
    pub fn disconnect(&mut self) -> usize {
        self.reader.abort();
        self.writer.abort();
        self.connected.store(false, Ordering::Release);

        let mut discarded = 0;
        while let Ok(event) = self.inbound.try_recv() {
            if matches!(event, ConnectionEvent::Message(_)) {
                discarded += 1;
            }
        }
        self.inbound.close();

        let stats = self.stats();
        tracing::info!(
            "Disconnected from {} server {} after {:?} - RX: {} bytes / {} messages, TX: {} bytes / {} messages, discarded {}",
            self.role,
            self.server.address(),
            self.connected_at.elapsed(),
            stats.bytes_received,
            stats.messages_received,
            stats.bytes_sent,
            stats.messages_sent,
            discarded
        );

        discarded
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader.abort();
        self.writer.abort();
    }
}

async fn read_loop<R>(
    role: ServerRole,
    mut frames: FramedRead<R, MessageFramer>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    connected: Arc<AtomicBool>,
    stats: Arc<Mutex<ConnectionStats>>,
) where
    R: AsyncRead + Unpin,
{
    loop {
        match frames.next().await {
            Some(Ok(msg)) => {
                {
                    let mut stats = stats.lock();
                    stats.bytes_received += msg.len() as u64;
                    stats.messages_received += 1;
                    stats.last_received = Some(Instant::now());
                }
                tracing::trace!("<- {} 0x{:04x} ({} bytes)", role, msg.opcode(), msg.len());
                if events.send(ConnectionEvent::Message(msg)).is_err() {
                    break;
                }
            }
            Some(Err(e)) => {
                tracing::warn!("{} connection failed: {}", role, e);
                connected.store(false, Ordering::Release);
                let _ = events.send(ConnectionEvent::Failed(e));
                break;
            }
            None => {
                tracing::info!("{} server closed the connection", role);
                connected.store(false, Ordering::Release);
                let _ = events.send(ConnectionEvent::Closed);
                break;
            }
        }
    }
}

async fn write_loop<W>(
    role: ServerRole,
    mut sink: FramedWrite<W, BytesCodec>,
    mut outbound: mpsc::UnboundedReceiver<Bytes>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    connected: Arc<AtomicBool>,
    stats: Arc<Mutex<ConnectionStats>>,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = outbound.recv().await {
        let len = frame.len() as u64;
        if let Err(e) = sink.send(frame).await {
            tracing::warn!("{} write failed: {}", role, e);
            connected.store(false, Ordering::Release);
            let _ = events.send(ConnectionEvent::Failed(e.into()));
            return;
        }

        let mut stats = stats.lock();
        stats.bytes_sent += len;
        stats.messages_sent += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use athena_core::Dialect;
    use athena_protocol::packets;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn open(dialect: Dialect) -> (Connection, DuplexStream) {
        let (client, server) = tokio::io::duplex(4096);
        let conn = Connection::from_stream(
            ServerRole::Map,
            ServerInfo::new("127.0.0.1", 5122),
            client,
            MessageFramer::for_dialect(dialect),
        );
        (conn, server)
    }

    async fn wait_event(conn: &mut Connection) -> ConnectionEvent {
        for _ in 0..200 {
            if let Some(event) = conn.next_event() {
                return event;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no event from connection");
    }

    const SERVER_PING: [u8; 6] = [0x7f, 0x00, 0x01, 0x00, 0x00, 0x00];

    #[tokio::test]
    async fn test_receive_split_message() {
        let (mut conn, mut server) = open(Dialect::TmwAthena);

        server.write_all(&SERVER_PING[..4]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(conn.next_event().is_none());

        server.write_all(&SERVER_PING[4..]).await.unwrap();
        match wait_event(&mut conn).await {
            ConnectionEvent::Message(mut msg) => {
                assert_eq!(msg.opcode(), packets::SMSG_SERVER_PING);
                assert_eq!(msg.read_u32("tick").unwrap(), 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(conn.stats().messages_received, 1);
    }

    #[tokio::test]
    async fn test_send_writes_whole_message() {
        let (conn, mut server) = open(Dialect::TmwAthena);

        let mut msg = MessageOut::new(packets::CMSG_CHAR_SELECT);
        msg.write_u8(3, "slot");
        conn.send(msg).unwrap();

        let mut buf = [0u8; 3];
        server.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, [0x66, 0x00, 0x03]);
    }

    #[tokio::test]
    async fn test_pause_holds_messages() {
        let (mut conn, mut server) = open(Dialect::TmwAthena);
        conn.pause_dispatch();
        assert!(conn.is_paused());

        server.write_all(&SERVER_PING).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(conn.next_event().is_none());

        conn.resume_dispatch();
        assert!(matches!(wait_event(&mut conn).await, ConnectionEvent::Message(_)));
    }

    #[tokio::test]
    async fn test_receive_time_tracked_while_paused() {
        let (mut conn, mut server) = open(Dialect::TmwAthena);
        assert_eq!(conn.last_received(), None);
        conn.pause_dispatch();

        let before = Instant::now();
        server.write_all(&SERVER_PING).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(conn.next_event().is_none());
        let received = conn.last_received().expect("message was framed");
        assert!(received >= before);
    }

    #[tokio::test]
    async fn test_oversized_message_not_sent() {
        let (conn, _server) = open(Dialect::TmwAthena);
        let mut msg = MessageOut::variable(packets::CMSG_NPC_STR_RESPONSE);
        msg.write_raw(&vec![b'x'; 70_000], "text");

        assert!(matches!(conn.send(msg), Err(ClientError::InvalidData(_))));
        assert!(conn.is_connected());
        assert_eq!(conn.stats().messages_sent, 0);
    }

    #[tokio::test]
    async fn test_disconnect_discards_queue() {
        let (mut conn, mut server) = open(Dialect::TmwAthena);
        conn.pause_dispatch();

        server.write_all(&SERVER_PING).await.unwrap();
        server.write_all(&SERVER_PING).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(conn.disconnect(), 2);
        assert!(!conn.is_connected());
        conn.resume_dispatch();
        assert!(conn.next_event().is_none());
        assert!(conn.send(MessageOut::new(packets::CMSG_MAP_LOADED)).is_err());
    }

    #[tokio::test]
    async fn test_unknown_opcode_fails_connection() {
        let (mut conn, mut server) = open(Dialect::TmwAthena);

        server.write_all(&[0xfe, 0xca, 0x00, 0x00]).await.unwrap();
        match wait_event(&mut conn).await {
            ConnectionEvent::Failed(ClientError::ProtocolMismatch(_)) => {}
            other => panic!("unexpected event {:?}", other),
        }
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_server_close_reported() {
        let (mut conn, server) = open(Dialect::EAthena);
        drop(server);

        assert!(matches!(wait_event(&mut conn).await, ConnectionEvent::Closed));
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = Connection::connect(
            ServerRole::Login,
            ServerInfo::new("127.0.0.1", port),
            MessageFramer::for_dialect(Dialect::TmwAthena),
            Duration::from_secs(2),
        )
        .await;
        assert!(matches!(result, Err(ClientError::Connection(_))));
    }
}
