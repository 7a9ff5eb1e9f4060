//! Turns one parsed EVE record into a model-ready feature row plus the
//! metadata echoed into the prediction log.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BatchItem, DerivedFeature, Metadata, SourceAggregates};
use crate::artifacts::LabelEncoder;
use crate::categories::{resolve_service, FlagToken};
use crate::config::FeatureConfig;
use crate::error::{Error, Result};
use crate::tailer::FlowEvent;

/// Which events enter derivation at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFilter {
    /// Only `event_type == "flow"` records.
    #[default]
    FlowOnly,
    /// Everything except `event_type == "stats"` records.
    SkipStats,
}

/// What fills the fourth feature column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FourthSlot {
    /// Bytes sent back toward the client on this flow.
    #[default]
    DestBytes,
    /// Distinct destination ports seen from this source so far.
    DistinctPorts,
}

/// Why an event produced no feature row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Event type rejected by the configured filter.
    FilteredEventType(String),
    /// No source address. Aggregates and metadata are keyed by it.
    MissingSrcIp,
    /// Service token outside the trained encoder's classes.
    UnknownService(String),
}

/// Stateful per-event deriver. Owns the source aggregates, so a single
/// instance must see the whole event stream.
pub struct FeatureDeriver {
    config: FeatureConfig,
    service_encoder: LabelEncoder,
    flag_encoder: LabelEncoder,
    oth_code: u32,
    aggregates: SourceAggregates,
    flag_fallbacks: u64,
}

impl FeatureDeriver {
    /// Build a deriver over trained encoders. The flag encoder must contain
    /// the `OTH` class, which backs the unknown-flag fallback.
    pub fn new(
        config: FeatureConfig,
        service_encoder: LabelEncoder,
        flag_encoder: LabelEncoder,
    ) -> Result<Self> {
        let oth_code = flag_encoder
            .code_of(FlagToken::OTH.as_str())
            .ok_or_else(|| Error::Config("flag encoder has no OTH class".into()))?;
        for token in config.flag_table.vocabulary() {
            if flag_encoder.code_of(token.as_str()).is_none() {
                warn!(
                    token = token.as_str(),
                    "flag table token missing from encoder, OTH code will be substituted"
                );
            }
        }
        Ok(Self {
            config,
            service_encoder,
            flag_encoder,
            oth_code,
            aggregates: SourceAggregates::new(),
            flag_fallbacks: 0,
        })
    }

    /// Derive one batch item, or report why the event contributes none.
    ///
    /// Aggregates are updated before the derived value is read, so the row
    /// reflects a stream including its own event. The update also runs for
    /// events later dropped for an unknown service.
    pub fn derive(&mut self, event: &FlowEvent) -> std::result::Result<BatchItem, DropReason> {
        let accepted = match self.config.event_filter {
            EventFilter::FlowOnly => event.event_type == "flow",
            EventFilter::SkipStats => event.event_type != "stats",
        };
        if !accepted {
            return Err(DropReason::FilteredEventType(event.event_type.clone()));
        }

        let src_ip = event.src_ip.as_deref().ok_or(DropReason::MissingSrcIp)?;

        let service = resolve_service(event.dest_port, event.proto.as_deref());
        let flag = self.config.flag_table.resolve(
            &event.tcp,
            event.flow.state.as_deref(),
            event.flow.reason.as_deref(),
        );

        let distinct_ports =
            self.aggregates
                .observe(src_ip, event.dest_port, event.flow.bytes_toserver);

        let encoded_service = self
            .service_encoder
            .code_of(service)
            .ok_or_else(|| DropReason::UnknownService(service.to_string()))?;

        let (encoded_flag, flag_label) = match self.flag_encoder.code_of(flag.as_str()) {
            Some(code) => (code, flag.as_str()),
            None => {
                self.flag_fallbacks += 1;
                debug!(token = flag.as_str(), "flag outside encoder classes, using OTH");
                (self.oth_code, FlagToken::OTH.as_str())
            }
        };

        let secondary = match self.config.fourth_slot {
            FourthSlot::DestBytes => event.flow.bytes_toclient,
            FourthSlot::DistinctPorts => distinct_ports,
        };

        let features = DerivedFeature {
            service: encoded_service,
            flag: encoded_flag,
            src_bytes: event.flow.bytes_toserver,
            secondary,
        };
        let metadata = Metadata {
            src_ip: src_ip.to_string(),
            dest_port: event.dest_port,
            proto: event.proto.clone(),
            service: service.to_string(),
            flag: flag_label.to_string(),
            timestamp: event.timestamp.clone(),
        };
        Ok(BatchItem { features, metadata })
    }

    /// Running per-source aggregates.
    pub fn aggregates(&self) -> &SourceAggregates {
        &self.aggregates
    }

    /// Times the unknown-flag fallback fired.
    pub fn flag_fallbacks(&self) -> u64 {
        self.flag_fallbacks
    }

    /// Clear per-source state. Intended for tests.
    pub fn reset_aggregates(&mut self) {
        self.aggregates.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categories::{FlagTable, TcpFlags};

    fn service_encoder() -> LabelEncoder {
        LabelEncoder {
            classes: vec![
                "domain".into(),
                "ecr_i".into(),
                "http".into(),
                "other".into(),
                "ssh".into(),
            ],
        }
    }

    fn flag_encoder() -> LabelEncoder {
        LabelEncoder {
            classes: vec![
                "OTH".into(),
                "REJ".into(),
                "S0".into(),
                "S1".into(),
                "SF".into(),
            ],
        }
    }

    fn deriver(config: FeatureConfig) -> FeatureDeriver {
        FeatureDeriver::new(config, service_encoder(), flag_encoder()).unwrap()
    }

    fn flow_event(src_ip: &str, dest_port: u16, bytes_toserver: u64) -> FlowEvent {
        let mut event = FlowEvent {
            event_type: "flow".into(),
            src_ip: Some(src_ip.into()),
            dest_port: Some(dest_port),
            proto: Some("TCP".into()),
            ..FlowEvent::default()
        };
        event.flow.bytes_toserver = bytes_toserver;
        event.tcp = TcpFlags {
            syn: true,
            ack: true,
            fin: false,
            rst: false,
        };
        event
    }

    #[test]
    fn derives_http_flow() {
        let mut deriver = deriver(FeatureConfig::default());
        let mut event = flow_event("10.0.0.1", 80, 1200);
        event.flow.bytes_toclient = 3400;
        event.timestamp = Some("2026-08-20T10:00:00.000000+0000".into());

        let item = deriver.derive(&event).unwrap();
        assert_eq!(item.metadata.service, "http");
        assert_eq!(item.metadata.flag, "SF");
        assert_eq!(item.features.service, 2);
        assert_eq!(item.features.flag, 4);
        assert_eq!(item.features.src_bytes, 1200);
        assert_eq!(item.features.secondary, 3400);
        assert_eq!(item.metadata.timestamp.as_deref(), Some("2026-08-20T10:00:00.000000+0000"));
    }

    #[test]
    fn filter_rejects_non_flow_by_default() {
        let mut deriver = deriver(FeatureConfig::default());
        let event = FlowEvent {
            event_type: "alert".into(),
            src_ip: Some("10.0.0.1".into()),
            ..FlowEvent::default()
        };
        assert_eq!(
            deriver.derive(&event),
            Err(DropReason::FilteredEventType("alert".into()))
        );
    }

    #[test]
    fn skip_stats_filter_admits_other_types() {
        let config = FeatureConfig {
            event_filter: EventFilter::SkipStats,
            ..FeatureConfig::default()
        };
        let mut deriver = deriver(config);

        let mut event = flow_event("10.0.0.1", 80, 10);
        event.event_type = "netflow".into();
        assert!(deriver.derive(&event).is_ok());

        event.event_type = "stats".into();
        assert_eq!(
            deriver.derive(&event),
            Err(DropReason::FilteredEventType("stats".into()))
        );
    }

    #[test]
    fn missing_src_ip_is_dropped() {
        let mut deriver = deriver(FeatureConfig::default());
        let event = FlowEvent {
            event_type: "flow".into(),
            dest_port: Some(80),
            ..FlowEvent::default()
        };
        assert_eq!(deriver.derive(&event), Err(DropReason::MissingSrcIp));
    }

    #[test]
    fn unknown_service_is_dropped_after_aggregate_update() {
        let mut deriver = deriver(FeatureConfig::default());
        // Port 21 maps to "ftp", which the test encoder does not know.
        let event = flow_event("10.0.0.9", 21, 64);
        assert_eq!(
            deriver.derive(&event),
            Err(DropReason::UnknownService("ftp".into()))
        );
        let aggregate = deriver.aggregates().get("10.0.0.9").unwrap();
        assert_eq!(aggregate.total_bytes_to_server, 64);
        assert_eq!(aggregate.distinct_dest_ports.len(), 1);
    }

    #[test]
    fn unknown_flag_falls_back_to_oth() {
        // The flags-only table can produce RSTO, which the trained encoder
        // here does not contain.
        let config = FeatureConfig {
            flag_table: FlagTable::FlagsOnly,
            ..FeatureConfig::default()
        };
        let mut deriver = deriver(config);
        let mut event = flow_event("10.0.0.1", 80, 10);
        event.tcp = TcpFlags {
            syn: true,
            ack: true,
            fin: false,
            rst: true,
        };

        let item = deriver.derive(&event).unwrap();
        assert_eq!(item.features.flag, 0);
        assert_eq!(item.metadata.flag, "OTH");
        assert_eq!(deriver.flag_fallbacks(), 1);
    }

    #[test]
    fn distinct_ports_fill_fourth_slot_when_configured() {
        let config = FeatureConfig {
            fourth_slot: FourthSlot::DistinctPorts,
            ..FeatureConfig::default()
        };
        let mut deriver = deriver(config);

        let first = deriver.derive(&flow_event("10.0.0.1", 80, 10)).unwrap();
        assert_eq!(first.features.secondary, 1);
        let repeat = deriver.derive(&flow_event("10.0.0.1", 80, 10)).unwrap();
        assert_eq!(repeat.features.secondary, 1);
        let second_port = deriver.derive(&flow_event("10.0.0.1", 443, 10)).unwrap();
        assert_eq!(second_port.features.secondary, 2);
        let other_source = deriver.derive(&flow_event("10.0.0.2", 22, 10)).unwrap();
        assert_eq!(other_source.features.secondary, 1);
    }

    #[test]
    fn icmp_flow_resolves_to_echo_service() {
        let mut deriver = deriver(FeatureConfig::default());
        let event = FlowEvent {
            event_type: "flow".into(),
            src_ip: Some("10.0.0.3".into()),
            proto: Some("ICMP".into()),
            ..FlowEvent::default()
        };
        let item = deriver.derive(&event).unwrap();
        assert_eq!(item.metadata.service, "ecr_i");
        assert_eq!(item.features.service, 1);
    }

    #[test]
    fn rejects_flag_encoder_without_oth() {
        let flag_encoder = LabelEncoder {
            classes: vec!["S0".into(), "SF".into()],
        };
        let result = FeatureDeriver::new(FeatureConfig::default(), service_encoder(), flag_encoder);
        assert!(result.is_err());
    }
}
