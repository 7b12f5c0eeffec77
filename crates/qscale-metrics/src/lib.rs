//! qscale-metrics — gauges reported once per tick.
//!
//! The emitter is a pure side effect: nothing it does feeds back into a
//! scaling decision, and its failures are logged and dropped.
//!
//! # Architecture
//!
//! ```text
//! MetricsEmitter
//!   └── GaugeSink (trait)
//!         ├── StatsdSink  ← UDP datagrams, `{prefix}.{name}:{value}|g`
//!         ├── MemorySink  ← records gauges for tests
//!         └── NullSink    ← used when statsd could not be set up
//! ```

pub mod emitter;
pub mod sink;

pub use emitter::{MetricsEmitter, TickGauges};
pub use sink::{GaugeSink, MemorySink, MetricsError, NullSink, StatsdSink};
