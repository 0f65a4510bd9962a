//! Downstream producer: construction with the required tuning properties,
//! the fire-and-forget `produce` used by the on-tick fast path, and the
//! bounded `flush` used during shutdown.

use crate::error::BridgeError;
use crate::tick::Tick;
use rdkafka::ClientConfig;
use rdkafka::producer::{BaseProducer, BaseRecord, Producer};
use std::time::Duration;
use tracing::{error, warn};

pub struct TickProducer {
    producer: BaseProducer,
    topic: String,
}

impl TickProducer {
    /// Builds the producer with the tuning properties §6 requires. Any
    /// failure here is a fatal `ProducerInitError`.
    pub fn new(broker: &str, topic: String) -> Result<Self, BridgeError> {
        let producer: BaseProducer = ClientConfig::new()
            .set("bootstrap.servers", broker)
            .set("linger.ms", "100")
            .set("batch.size", "262144")
            .set("queue.buffering.max.kbytes", "131072")
            .set("acks", "1")
            .set("compression.type", "zstd")
            .create()
            .map_err(|e| BridgeError::ProducerInitError(e.to_string()))?;

        Ok(Self { producer, topic })
    }

    /// Drives delivery callbacks and avoids internal buffer stalls. Called
    /// once at the top of every supervisor iteration.
    pub fn poll_once(&self) {
        self.producer.poll(Duration::from_secs(0));
    }

    /// Serializes and hands the tick to the producer. Any failure is logged
    /// and the tick is dropped — losing a tick beats blocking the SDK's
    /// callback thread.
    pub fn produce_tick(&self, tick: &Tick) {
        let payload = match tick.to_wire_bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "tick serialization failed, dropping");
                return;
            }
        };

        let record: BaseRecord<'_, (), [u8]> = BaseRecord::to(&self.topic).payload(&payload);
        if let Err((e, _)) = self.producer.send(record) {
            error!(error = %e, "tick publish failed, dropping");
        }
    }

    /// Blocks up to `timeout` draining in-flight deliveries. Failing to
    /// flush in time is logged but not fatal.
    pub fn flush(&self, timeout: Duration) {
        if let Err(e) = self.producer.flush(timeout) {
            warn!(error = %e, "producer flush did not complete within timeout");
        }
    }
}
