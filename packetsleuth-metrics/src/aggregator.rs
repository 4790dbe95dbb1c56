//! Cumulative traffic counters fed by the monitor

use std::sync::atomic::{AtomicU64, Ordering};

use packetsleuth_core::{Application, NetworkType, Packet, TransportType};

use crate::histogram::{Bucket, CappedHistogram, DEFAULT_MAX_KEYS};

/// Aggregator configuration
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Distinct keys per histogram before folding into `other`
    pub max_keys: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            max_keys: DEFAULT_MAX_KEYS,
        }
    }
}

/// Traffic counters and histograms
///
/// One instance is shared between the monitor (writer) and the exporters
/// (readers). Every update commutes, so the totals do not depend on the order
/// packets arrive in.
#[derive(Debug)]
pub struct Aggregator {
    packets: AtomicU64,
    tcp: AtomicU64,
    udp: AtomicU64,
    sctp: AtomicU64,
    arp: AtomicU64,
    malformed: AtomicU64,
    syn: AtomicU64,
    syn_ack: AtomicU64,
    bytes: AtomicU64,
    http: AtomicU64,
    dns: AtomicU64,
    export_dropped: AtomicU64,
    export_failed: AtomicU64,
    exported: AtomicU64,
    src_ports: CappedHistogram,
    dst_ports: CappedHistogram,
    src_ips: CappedHistogram,
    dst_ips: CappedHistogram,
}

impl Aggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self {
            packets: AtomicU64::new(0),
            tcp: AtomicU64::new(0),
            udp: AtomicU64::new(0),
            sctp: AtomicU64::new(0),
            arp: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            syn: AtomicU64::new(0),
            syn_ack: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            http: AtomicU64::new(0),
            dns: AtomicU64::new(0),
            export_dropped: AtomicU64::new(0),
            export_failed: AtomicU64::new(0),
            exported: AtomicU64::new(0),
            src_ports: CappedHistogram::new(config.max_keys),
            dst_ports: CappedHistogram::new(config.max_keys),
            src_ips: CappedHistogram::new(config.max_keys),
            dst_ips: CappedHistogram::new(config.max_keys),
        }
    }

    /// Fold one packet into the counters
    ///
    /// Returns the cumulative payload byte total including this packet.
    pub fn observe(&self, packet: &Packet) -> u64 {
        let size = packet.payload_size as u64;

        self.packets.fetch_add(1, Ordering::Relaxed);
        let total = self.bytes.fetch_add(size, Ordering::Relaxed) + size;

        match packet.transport_type {
            TransportType::TCP => {
                self.tcp.fetch_add(1, Ordering::Relaxed);
                if packet.is_syn && packet.is_syn_ack {
                    self.syn_ack.fetch_add(1, Ordering::Relaxed);
                } else if packet.is_syn {
                    self.syn.fetch_add(1, Ordering::Relaxed);
                }
            }
            TransportType::UDP => {
                self.udp.fetch_add(1, Ordering::Relaxed);
            }
            TransportType::SCTP => {
                self.sctp.fetch_add(1, Ordering::Relaxed);
            }
            TransportType::Unknown => {}
        }

        if packet.network_type == NetworkType::ARP {
            self.arp.fetch_add(1, Ordering::Relaxed);
        }
        if packet.is_malformed {
            self.malformed.fetch_add(1, Ordering::Relaxed);
        }

        match packet.application {
            Some(Application::HTTP) => {
                self.http.fetch_add(1, Ordering::Relaxed);
            }
            Some(Application::DNS) => {
                self.dns.fetch_add(1, Ordering::Relaxed);
            }
            None => {}
        }

        if let Some((src, dst)) = packet.histogram_ports() {
            self.src_ports.record(&src.to_string(), size);
            self.dst_ports.record(&dst.to_string(), size);
        }

        if let Some((src, dst)) = packet.ip_pair() {
            self.src_ips.record(&src.to_string(), size);
            self.dst_ips.record(&dst.to_string(), size);
        }

        total
    }

    /// Count points the push queue refused
    pub fn record_export_dropped(&self, points: u64) {
        self.export_dropped.fetch_add(points, Ordering::Relaxed);
    }

    /// Count points lost to a failed store write
    pub fn record_export_failed(&self, points: u64) {
        self.export_failed.fetch_add(points, Ordering::Relaxed);
    }

    pub fn record_exported(&self, points: u64) {
        self.exported.fetch_add(points, Ordering::Relaxed);
    }

    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter and histogram
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            packets: self.packets.load(Ordering::Relaxed),
            tcp: self.tcp.load(Ordering::Relaxed),
            udp: self.udp.load(Ordering::Relaxed),
            sctp: self.sctp.load(Ordering::Relaxed),
            arp: self.arp.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            syn: self.syn.load(Ordering::Relaxed),
            syn_ack: self.syn_ack.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            applications: vec![
                (Application::HTTP, self.http.load(Ordering::Relaxed)),
                (Application::DNS, self.dns.load(Ordering::Relaxed)),
            ],
            export_dropped: self.export_dropped.load(Ordering::Relaxed),
            export_failed: self.export_failed.load(Ordering::Relaxed),
            exported: self.exported.load(Ordering::Relaxed),
            src_ports: self.src_ports.snapshot(),
            dst_ports: self.dst_ports.snapshot(),
            src_ips: self.src_ips.snapshot(),
            dst_ips: self.dst_ips.snapshot(),
        }
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(AggregatorConfig::default())
    }
}

/// Read-side copy of the aggregator state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub packets: u64,
    pub tcp: u64,
    pub udp: u64,
    pub sctp: u64,
    pub arp: u64,
    pub malformed: u64,
    pub syn: u64,
    pub syn_ack: u64,
    /// Cumulative transport payload bytes
    pub bytes: u64,
    pub applications: Vec<(Application, u64)>,
    pub export_dropped: u64,
    pub export_failed: u64,
    pub exported: u64,
    pub src_ports: Vec<(String, Bucket)>,
    pub dst_ports: Vec<(String, Bucket)>,
    pub src_ips: Vec<(String, Bucket)>,
    pub dst_ips: Vec<(String, Bucket)>,
}

impl MetricsSnapshot {
    pub fn application(&self, app: Application) -> u64 {
        self.applications
            .iter()
            .find(|(a, _)| *a == app)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn src_port(&self, port: u16) -> Option<Bucket> {
        lookup(&self.src_ports, &port.to_string())
    }

    pub fn dst_port(&self, port: u16) -> Option<Bucket> {
        lookup(&self.dst_ports, &port.to_string())
    }

    pub fn src_ip(&self, ip: &str) -> Option<Bucket> {
        lookup(&self.src_ips, ip)
    }

    pub fn dst_ip(&self, ip: &str) -> Option<Bucket> {
        lookup(&self.dst_ips, ip)
    }
}

fn lookup(rows: &[(String, Bucket)], key: &str) -> Option<Bucket> {
    rows.iter().find(|(k, _)| k == key).map(|(_, b)| *b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use packetsleuth_core::{ArpInfo, MacAddr, SctpInfo};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::Arc;
    use std::time::SystemTime;

    fn tcp(src_port: u16, dst_port: u16, size: usize) -> Packet {
        let mut packet = Packet::unknown("eth0", SystemTime::UNIX_EPOCH);
        packet.network_type = NetworkType::IPv4;
        packet.src_ip = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        packet.dst_ip = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
        packet.transport_type = TransportType::TCP;
        packet.src_port = src_port;
        packet.dst_port = dst_port;
        packet.payload_size = size;
        packet
    }

    #[test]
    fn test_observe_tcp_counts() {
        let agg = Aggregator::default();
        let mut packet = tcp(40000, 80, 100);
        packet.application = Some(Application::HTTP);

        assert_eq!(agg.observe(&packet), 100);
        assert_eq!(agg.observe(&packet), 200);

        let snap = agg.snapshot();
        assert_eq!(snap.packets, 2);
        assert_eq!(snap.tcp, 2);
        assert_eq!(snap.udp, 0);
        assert_eq!(snap.bytes, 200);
        assert_eq!(snap.application(Application::HTTP), 2);
        assert_eq!(snap.application(Application::DNS), 0);
        assert_eq!(
            snap.dst_port(80),
            Some(Bucket {
                packets: 2,
                bytes: 200
            })
        );
        assert_eq!(snap.src_ip("10.0.0.1").map(|b| b.packets), Some(2));
        assert_eq!(snap.dst_ip("10.0.0.2").map(|b| b.bytes), Some(200));
    }

    #[test]
    fn test_syn_and_syn_ack_are_exclusive() {
        let agg = Aggregator::default();

        let mut syn = tcp(40000, 80, 0);
        syn.is_syn = true;
        let mut syn_ack = tcp(80, 40000, 0);
        syn_ack.is_syn = true;
        syn_ack.is_syn_ack = true;
        let plain = tcp(40000, 80, 0);

        agg.observe(&syn);
        agg.observe(&syn);
        agg.observe(&syn_ack);
        agg.observe(&plain);

        let snap = agg.snapshot();
        assert_eq!(snap.syn, 2);
        assert_eq!(snap.syn_ack, 1);
        assert_eq!(snap.tcp, 4);
    }

    #[test]
    fn test_sctp_ports_feed_port_histograms() {
        let agg = Aggregator::default();
        let mut packet = Packet::unknown("eth0", SystemTime::UNIX_EPOCH);
        packet.network_type = NetworkType::IPv4;
        packet.src_ip = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
        packet.dst_ip = Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 2)));
        packet.transport_type = TransportType::SCTP;
        packet.sctp_info = Some(SctpInfo {
            src_port: 2905,
            dst_port: 2906,
        });

        agg.observe(&packet);

        let snap = agg.snapshot();
        assert_eq!(snap.sctp, 1);
        assert_eq!(snap.src_port(2905).map(|b| b.packets), Some(1));
        assert_eq!(snap.dst_port(2906).map(|b| b.packets), Some(1));
        assert_eq!(snap.src_port(0), None);
    }

    #[test]
    fn test_arp_and_malformed_skip_histograms() {
        let agg = Aggregator::default();
        let mut packet = Packet::unknown("eth0", SystemTime::UNIX_EPOCH);
        packet.network_type = NetworkType::ARP;
        packet.is_malformed = true;
        packet.arp_info = Some(ArpInfo {
            sender_ip: Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1))),
            sender_mac: MacAddr::new([2, 0, 0, 0, 0, 1]).into(),
            target_ip: Some(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2))),
            target_mac: MacAddr::zero().into(),
        });

        agg.observe(&packet);

        let snap = agg.snapshot();
        assert_eq!(snap.packets, 1);
        assert_eq!(snap.arp, 1);
        assert_eq!(snap.malformed, 1);
        assert!(snap.src_ports.is_empty());
        assert!(snap.src_ips.is_empty());
    }

    #[test]
    fn test_byte_total_independent_of_order() {
        let sizes = [10usize, 0, 1500, 3, 64, 512, 7];
        let forward = Aggregator::default();
        let reverse = Aggregator::default();

        for size in sizes {
            forward.observe(&tcp(1, 2, size));
        }
        for size in sizes.iter().rev() {
            reverse.observe(&tcp(1, 2, *size));
        }

        assert_eq!(forward.snapshot(), reverse.snapshot());
        assert_eq!(forward.bytes(), sizes.iter().sum::<usize>() as u64);
    }

    #[test]
    fn test_concurrent_observers_sum_bytes() {
        let agg = Arc::new(Aggregator::default());
        let threads: Vec<_> = (0..4)
            .map(|i| {
                let agg = Arc::clone(&agg);
                std::thread::spawn(move || {
                    for n in 0..250 {
                        agg.observe(&tcp(1000 + i, 80, n % 10));
                    }
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let per_thread: u64 = (0..250u64).map(|n| n % 10).sum();
        let snap = agg.snapshot();
        assert_eq!(snap.packets, 1000);
        assert_eq!(snap.bytes, per_thread * 4);
        assert_eq!(snap.dst_port(80).map(|b| b.packets), Some(1000));
    }

    #[test]
    fn test_histogram_cap_applies_to_ports() {
        let agg = Aggregator::new(AggregatorConfig { max_keys: 2 });
        for port in [1, 2, 3, 4] {
            agg.observe(&tcp(port, 80, 1));
        }

        let snap = agg.snapshot();
        assert_eq!(snap.src_ports.len(), 3);
        assert_eq!(
            snap.src_ports.last().map(|(k, b)| (k.as_str(), b.packets)),
            Some(("other", 2))
        );
    }

    #[test]
    fn test_export_counters() {
        let agg = Aggregator::default();
        agg.record_export_dropped(3);
        agg.record_export_failed(5);
        agg.record_exported(7);

        let snap = agg.snapshot();
        assert_eq!(snap.export_dropped, 3);
        assert_eq!(snap.export_failed, 5);
        assert_eq!(snap.exported, 7);
    }
}
