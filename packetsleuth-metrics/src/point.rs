//! Time-series points and InfluxDB line protocol encoding

use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use packetsleuth_core::{Packet, TransportType};

/// Measurement name for per-packet points
pub const MEASUREMENT: &str = "packetsleuth_metrics";

/// A field value in line protocol
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Integer(v) => write!(f, "{}i", v),
            FieldValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// One line-protocol point
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    measurement: String,
    tags: BTreeMap<String, String>,
    fields: Vec<(String, FieldValue)>,
    timestamp: SystemTime,
}

impl Point {
    pub fn new(measurement: impl Into<String>, timestamp: SystemTime) -> Self {
        Self {
            measurement: measurement.into(),
            tags: BTreeMap::new(),
            fields: Vec::new(),
            timestamp,
        }
    }

    /// Build the per-packet point
    ///
    /// `traffic_total` is the cumulative byte count after this packet. IP tags
    /// are left out when the packet carried no IP header.
    pub fn from_packet(packet: &Packet, traffic_total: u64) -> Self {
        let (src_port, dst_port) = packet.histogram_ports().unwrap_or((0, 0));
        let flag = |t: TransportType| i64::from(packet.transport_type == t);

        let mut point = Point::new(MEASUREMENT, packet.timestamp)
            .tag("src_port", src_port.to_string())
            .tag("dst_port", dst_port.to_string());

        if let Some(ip) = packet.src_ip {
            point = point.tag("src_ip", ip.to_string());
        }
        if let Some(ip) = packet.dst_ip {
            point = point.tag("dst_ip", ip.to_string());
        }

        point
            .field("packet_count", 1i64)
            .field("payload_size", packet.payload_size as f64)
            .field("tcp_count", flag(TransportType::TCP))
            .field("udp_count", flag(TransportType::UDP))
            .field("sctp_count", flag(TransportType::SCTP))
            .field("traffic_total", traffic_total as f64)
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn field_value(&self, key: &str) -> Option<FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| *v)
    }

    /// Nanoseconds since the Unix epoch, 0 for earlier timestamps
    pub fn timestamp_nanos(&self) -> u128 {
        self.timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0)
    }

    /// Encode as one line, without the trailing newline
    pub fn to_line(&self) -> String {
        let mut line = String::with_capacity(128);
        line.push_str(&escape(&self.measurement, &[',', ' ']));
        for (key, value) in &self.tags {
            line.push_str(&format!(",{}={}", escape_key(key), escape_key(value)));
        }
        for (i, (key, value)) in self.fields.iter().enumerate() {
            let sep = if i == 0 { ' ' } else { ',' };
            line.push_str(&format!("{}{}={}", sep, escape_key(key), value));
        }
        line.push_str(&format!(" {}", self.timestamp_nanos()));
        line
    }
}

/// Join points into a write request body
pub fn encode_batch(points: &[Point]) -> String {
    let mut body = String::with_capacity(points.len() * 128);
    for point in points {
        body.push_str(&point.to_line());
        body.push('\n');
    }
    body
}

fn escape_key(text: &str) -> String {
    escape(text, &[',', '=', ' '])
}

fn escape(text: &str, special: &[char]) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
