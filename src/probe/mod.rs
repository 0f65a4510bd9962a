//! Downstream Probe: a one-shot query asking whether the log already holds
//! any message timestamped at or after the current session's open.
//!
//! Used only as the holiday-vs-outage discriminator in Supervisor step 7a.
//! Keeps a deliberate fail-safe bias: any probe-path error returns `true`.

use crate::config::SessionConfig;
use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Asia::Taipei;
use rdkafka::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::topic_partition_list::TopicPartitionList;
use rdkafka::Offset;
use std::time::Duration as StdDuration;
use tracing::warn;

const METADATA_TIMEOUT: StdDuration = StdDuration::from_secs(10);
const OFFSETS_FOR_TIMES_TIMEOUT: StdDuration = StdDuration::from_secs(10);

pub struct DownstreamProbe {
    broker: String,
}

impl DownstreamProbe {
    pub fn new(broker: String) -> Self {
        Self { broker }
    }

    /// Public, fail-safe entry point: any error along the probe path is
    /// swallowed and reported as `true` (assume outage, not holiday).
    pub async fn has_opening_log_messages(&self, now: NaiveDateTime, topic: &str, cfg: &SessionConfig) -> bool {
        match self.try_probe(now, topic, cfg).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "probe failed; assuming outage, not holiday (fail-safe bias)");
                true
            }
        }
    }

    async fn try_probe(
        &self,
        now: NaiveDateTime,
        topic: &str,
        cfg: &SessionConfig,
    ) -> anyhow::Result<bool> {
        let session_open_millis = session_open_utc_millis(now, cfg)?;
        let broker = self.broker.clone();
        let topic = topic.to_string();

        tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
            let group_id = format!(
                "temp-tick-check-{}",
                std::time::SystemTime::now()
                    .duration_since(std::time::UNIX_EPOCH)
                    .unwrap_or_default()
                    .as_nanos()
            );

            let consumer: BaseConsumer = ClientConfig::new()
                .set("bootstrap.servers", &broker)
                .set("group.id", &group_id)
                .set("auto.offset.reset", "earliest")
                .set("enable.auto.commit", "false")
                .create()?;

            let metadata = consumer.fetch_metadata(Some(&topic), METADATA_TIMEOUT)?;
            let topic_meta = match metadata.topics().iter().find(|t| t.name() == topic) {
                Some(t) if t.error().is_none() && !t.partitions().is_empty() => t,
                _ => return Ok(false),
            };

            let mut query = TopicPartitionList::new();
            for partition in topic_meta.partitions() {
                query.add_partition_offset(&topic, partition.id(), Offset::Offset(session_open_millis))?;
            }

            let resolved = consumer.offsets_for_times(query, OFFSETS_FOR_TIMES_TIMEOUT)?;
            let found = resolved
                .elements()
                .iter()
                .any(|el| !matches!(el.offset(), Offset::Invalid));

            Ok(found)
        })
        .await?
    }
}

/// Computes the current session's open instant, in UTC milliseconds.
fn session_open_utc_millis(now: NaiveDateTime, cfg: &SessionConfig) -> anyhow::Result<i64> {
    let time_now = now.time();
    let today = now.date();

    let open_date = if time_now >= cfg.day_open && time_now < cfg.night_open {
        today
    } else if time_now >= cfg.night_open {
        today
    } else {
        today - chrono::Duration::days(1)
    };

    let open_time = if time_now >= cfg.day_open && time_now < cfg.night_open {
        cfg.day_open
    } else {
        cfg.night_open
    };

    let open_naive = open_date.and_time(open_time);
    let open_local = Taipei
        .from_local_datetime(&open_naive)
        .single()
        .ok_or_else(|| anyhow::anyhow!("ambiguous/non-existent local session-open instant"))?;

    Ok(open_local.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;
    use chrono::NaiveDate;

    #[test]
    fn session_open_during_day_session_is_todays_day_open() {
        let cfg = SessionConfig::default();
        let now = NaiveDate::from_ymd_opt(2026, 7, 29)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let millis = session_open_utc_millis(now, &cfg).unwrap();

        let expected = Taipei
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2026, 7, 29)
                    .unwrap()
                    .and_time(cfg.day_open),
            )
            .single()
            .unwrap()
            .timestamp_millis();
        assert_eq!(millis, expected);
    }

    #[test]
    fn session_open_after_midnight_uses_yesterdays_night_open() {
        let cfg = SessionConfig::default();
        let now = NaiveDate::from_ymd_opt(2026, 7, 30)
            .unwrap()
            .and_hms_opt(2, 0, 0)
            .unwrap();
        let millis = session_open_utc_millis(now, &cfg).unwrap();

        let expected = Taipei
            .from_local_datetime(
                &NaiveDate::from_ymd_opt(2026, 7, 29)
                    .unwrap()
                    .and_time(cfg.night_open),
            )
            .single()
            .unwrap()
            .timestamp_millis();
        assert_eq!(millis, expected);
    }
}
