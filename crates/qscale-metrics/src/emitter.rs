//! Per-tick gauge emission.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::sink::{GaugeSink, NullSink};

/// The five values reported every tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickGauges {
    pub in_len: u64,
    /// Processing depth net of jobs attributed to lost workers.
    pub effective_proc_len: u64,
    pub err_hwm: u64,
    pub done_len: u64,
    pub worker_count: u64,
}

/// Reports `TickGauges` through a sink handle built once at startup.
#[derive(Clone)]
pub struct MetricsEmitter {
    sink: Arc<dyn GaugeSink>,
}

impl MetricsEmitter {
    pub fn new(sink: Arc<dyn GaugeSink>) -> Self {
        Self { sink }
    }

    /// An emitter that drops every gauge.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Send all five gauges as `{language}.{in,proc,err,done,workers}`.
    ///
    /// Never fails: a gauge that cannot be sent is logged and skipped.
    pub async fn emit(&self, namespace: &str, language: &str, gauges: &TickGauges) {
        let values = [
            ("in", gauges.in_len),
            ("proc", gauges.effective_proc_len),
            ("err", gauges.err_hwm),
            ("done", gauges.done_len),
            ("workers", gauges.worker_count),
        ];

        let mut failed = 0;
        for (suffix, value) in values {
            let name = format!("{language}.{suffix}");
            if let Err(e) = self.sink.gauge(&name, value).await {
                failed += 1;
                debug!(gauge = %name, error = %e, "gauge not sent");
            }
        }

        if failed > 0 {
            warn!(%namespace, %language, failed, "some gauges could not be emitted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{MemorySink, MetricsError};
    use async_trait::async_trait;

    struct BrokenSink;

    #[async_trait]
    impl GaugeSink for BrokenSink {
        async fn gauge(&self, _name: &str, _value: u64) -> Result<(), MetricsError> {
            Err(MetricsError::Io(std::io::Error::other("connection refused")))
        }
    }

    #[tokio::test]
    async fn emits_five_gauges_in_order() {
        let sink = MemorySink::new();
        let emitter = MetricsEmitter::new(Arc::new(sink.clone()));

        emitter
            .emit(
                "kluge",
                "english",
                &TickGauges {
                    in_len: 15,
                    effective_proc_len: 5,
                    err_hwm: 7,
                    done_len: 100,
                    worker_count: 5,
                },
            )
            .await;

        assert_eq!(
            sink.recorded().await,
            vec![
                ("english.in".to_string(), 15),
                ("english.proc".to_string(), 5),
                ("english.err".to_string(), 7),
                ("english.done".to_string(), 100),
                ("english.workers".to_string(), 5),
            ]
        );
    }

    #[tokio::test]
    async fn sink_failures_are_swallowed() {
        let emitter = MetricsEmitter::new(Arc::new(BrokenSink));
        emitter.emit("kluge", "english", &TickGauges::default()).await;
    }

    #[tokio::test]
    async fn disabled_emitter_is_silent() {
        MetricsEmitter::disabled()
            .emit("kluge", "english", &TickGauges::default())
            .await;
    }
}
