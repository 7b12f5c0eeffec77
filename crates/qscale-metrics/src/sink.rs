//! Gauge sinks.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("statsd socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Somewhere gauges can be sent.
#[async_trait]
pub trait GaugeSink: Send + Sync {
    async fn gauge(&self, name: &str, value: u64) -> Result<(), MetricsError>;
}

/// Statsd over UDP.
pub struct StatsdSink {
    socket: UdpSocket,
    prefix: String,
}

impl StatsdSink {
    /// Bind a local socket and point it at `host:port`.
    pub async fn connect(host: &str, port: u16, prefix: &str) -> Result<Self, MetricsError> {
        let socket = UdpSocket::bind(("0.0.0.0", 0)).await?;
        socket.connect((host, port)).await?;
        debug!(%host, port, %prefix, "statsd sink ready");
        Ok(Self {
            socket,
            prefix: prefix.to_string(),
        })
    }

    fn line(&self, name: &str, value: u64) -> String {
        if self.prefix.is_empty() {
            format!("{name}:{value}|g")
        } else {
            format!("{}.{name}:{value}|g", self.prefix)
        }
    }
}

#[async_trait]
impl GaugeSink for StatsdSink {
    async fn gauge(&self, name: &str, value: u64) -> Result<(), MetricsError> {
        self.socket.send(self.line(name, value).as_bytes()).await?;
        Ok(())
    }
}

/// Records every gauge in order. `Clone` shares the record.
#[derive(Clone, Default)]
pub struct MemorySink {
    gauges: Arc<Mutex<Vec<(String, u64)>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded(&self) -> Vec<(String, u64)> {
        self.gauges.lock().await.clone()
    }

    /// Most recent value of `name`, if any.
    pub async fn last(&self, name: &str) -> Option<u64> {
        self.gauges
            .lock()
            .await
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

#[async_trait]
impl GaugeSink for MemorySink {
    async fn gauge(&self, name: &str, value: u64) -> Result<(), MetricsError> {
        self.gauges.lock().await.push((name.to_string(), value));
        Ok(())
    }
}

/// Discards everything.
pub struct NullSink;

#[async_trait]
impl GaugeSink for NullSink {
    async fn gauge(&self, _name: &str, _value: u64) -> Result<(), MetricsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn statsd_sends_gauge_datagram() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();

        let sink = StatsdSink::connect("127.0.0.1", port, "redis-q").await.unwrap();
        sink.gauge("english.in", 15).await.unwrap();

        let mut buf = [0u8; 128];
        let n = server.recv(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"redis-q.english.in:15|g");
    }

    #[tokio::test]
    async fn empty_prefix_is_omitted() {
        let server = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = server.local_addr().unwrap().port();
        let sink = StatsdSink::connect("127.0.0.1", port, "").await.unwrap();
        assert_eq!(sink.line("workers", 3), "workers:3|g");
    }

    #[tokio::test]
    async fn memory_sink_tracks_last_value() {
        let sink = MemorySink::new();
        sink.gauge("a", 1).await.unwrap();
        sink.gauge("a", 2).await.unwrap();
        assert_eq!(sink.last("a").await, Some(2));
        assert_eq!(sink.last("b").await, None);
        assert_eq!(sink.recorded().await.len(), 2);
    }
}
