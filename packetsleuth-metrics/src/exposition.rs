//! Prometheus text exposition (format 0.0.4)

use crate::aggregator::MetricsSnapshot;
use crate::histogram::Bucket;

/// Content type served with [`render`] output
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Render a snapshot in the text exposition format
pub fn render(snapshot: &MetricsSnapshot) -> String {
    let mut out = String::with_capacity(4096);
    write_snapshot(&mut out, snapshot);
    out
}

fn write_snapshot(out: &mut String, s: &MetricsSnapshot) {
    counter(out, "packetsleuth_packet_count", "Number of all packets", s.packets);
    counter(out, "packetsleuth_packet_tcp_count", "Number of TCP packets", s.tcp);
    counter(out, "packetsleuth_packet_udp_count", "Number of UDP packets", s.udp);
    counter(out, "packetsleuth_packet_sctp_count", "Number of SCTP packets", s.sctp);
    counter(out, "packetsleuth_packet_arp_count", "Number of ARP packets", s.arp);
    counter(
        out,
        "packetsleuth_packet_malformed_count",
        "Number of packets with a missing or undecodable layer",
        s.malformed,
    );

    header(
        out,
        "packetsleuth_tcp_syn_ack_packets",
        "Total number of TCP SYN and SYN-ACK packets",
    );
    sample(out, "packetsleuth_tcp_syn_ack_packets", "type", "syn", s.syn);
    sample(out, "packetsleuth_tcp_syn_ack_packets", "type", "syn_ack", s.syn_ack);

    header(
        out,
        "packetsleuth_application_packets",
        "Number of packets per inferred application protocol",
    );
    for (app, count) in &s.applications {
        let label = app.as_str().to_ascii_lowercase();
        sample(out, "packetsleuth_application_packets", "application", &label, *count);
    }

    family(
        out,
        "packetsleuth_port_src",
        "The number of packets from a specific port.",
        "source_ports",
        &s.src_ports,
        |b| b.packets,
    );
    family(
        out,
        "packetsleuth_port_dst",
        "The number of packets to a specific port.",
        "dest_port",
        &s.dst_ports,
        |b| b.packets,
    );
    family(
        out,
        "packetsleuth_ip_src",
        "The number of packets from a specific IP address.",
        "src_ip",
        &s.src_ips,
        |b| b.packets,
    );
    family(
        out,
        "packetsleuth_ip_dst",
        "The number of packets to a specific IP address.",
        "dest_ip",
        &s.dst_ips,
        |b| b.packets,
    );

    counter(
        out,
        "packetsleuth_traffic_total_bps",
        "Cumulative payload bytes across all packets. Apply rate() for bytes per second.",
        s.bytes,
    );
    family(
        out,
        "packetsleuth_traffic_port_src_bps",
        "Cumulative payload bytes from a specific source port. Apply rate() for bytes per second.",
        "source_port",
        &s.src_ports,
        |b| b.bytes,
    );
    family(
        out,
        "packetsleuth_traffic_port_dst_bps",
        "Cumulative payload bytes to a specific destination port. Apply rate() for bytes per second.",
        "dest_port",
        &s.dst_ports,
        |b| b.bytes,
    );
    family(
        out,
        "packetsleuth_traffic_ip_src_bytes",
        "Cumulative payload bytes from a specific IP address.",
        "src_ip",
        &s.src_ips,
        |b| b.bytes,
    );
    family(
        out,
        "packetsleuth_traffic_ip_dst_bytes",
        "Cumulative payload bytes to a specific IP address.",
        "dest_ip",
        &s.dst_ips,
        |b| b.bytes,
    );

    header(
        out,
        "packetsleuth_export_points",
        "Points handled by the push exporter by outcome",
    );
    sample(out, "packetsleuth_export_points", "result", "exported", s.exported);
    sample(out, "packetsleuth_export_points", "result", "dropped", s.export_dropped);
    sample(out, "packetsleuth_export_points", "result", "failed", s.export_failed);
}

fn header(out: &mut String, name: &str, help: &str) {
    out.push_str(&format!("# HELP {} {}\n", name, escape_help(help)));
    out.push_str(&format!("# TYPE {} counter\n", name));
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    header(out, name, help);
    out.push_str(&format!("{} {}\n", name, value));
}

fn sample(out: &mut String, name: &str, label: &str, value: &str, count: u64) {
    out.push_str(&format!(
        "{}{{{}=\"{}\"}} {}\n",
        name,
        label,
        escape_label(value),
        count
    ));
}

/// A labelled family; omitted entirely until it has a series
fn family(
    out: &mut String,
    name: &str,
    help: &str,
    label: &str,
    rows: &[(String, Bucket)],
    value: impl Fn(&Bucket) -> u64,
) {
    if rows.is_empty() {
        return;
    }
    header(out, name, help);
    for (key, bucket) in rows {
        sample(out, name, label, key, value(bucket));
    }
}

fn escape_help(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\n', "\\n")
}

fn escape_label(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            c => escaped.push(c),
        }
    }
    escaped
}
