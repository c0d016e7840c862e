// src/services/classifier.rs

//! Bridge line parser and classifier.
//!
//! Turns one advertised line into a typed [`BridgeRecord`] or rejects it.
//! Rejection is signalled by `None`; it is never an error.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::models::{BridgeRecord, Transport, TransportArgs};

// ASCII digits only: `\d` would also match other Unicode digits.
const ADDRESS: &str = r"(\[[a-fA-F0-9:]+\]|[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3})";
const ENDPOINT_AND_FINGERPRINT: &str = r":([0-9]+)\s+([0-9A-Fa-f]{40})";

static OBFS4_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^obfs4\s+{ADDRESS}{ENDPOINT_AND_FINGERPRINT}\s+cert=(\S+)\s+iat-mode=([0-9]+)$"
    ))
    .expect("obfs4 pattern is valid")
});

static WEBTUNNEL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"^webtunnel\s+{ADDRESS}{ENDPOINT_AND_FINGERPRINT}\s+url=(\S+)\s+ver=(\S+)$"
    ))
    .expect("webtunnel pattern is valid")
});

/// Parse and classify a bridge line, stamping it with the current time.
pub fn classify(line: &str) -> Option<BridgeRecord> {
    classify_at(line, Utc::now())
}

/// Parse and classify a bridge line with an explicit ingestion time.
pub fn classify_at(line: &str, added_at: DateTime<Utc>) -> Option<BridgeRecord> {
    let line = line.trim();
    let transport = Transport::from_tag(line.split_whitespace().next()?)?;

    let pattern = match transport {
        Transport::Obfs4 => &*OBFS4_LINE,
        Transport::Webtunnel => &*WEBTUNNEL_LINE,
    };
    let caps = pattern.captures(line)?;

    // Ports outside u16 fail to parse; zero is not a usable port.
    let port: u16 = caps[2].parse().ok().filter(|port| *port != 0)?;
    let address = caps[1].trim_start_matches('[').trim_end_matches(']');

    let (first, second) = (caps[4].to_string(), caps[5].to_string());
    let args = match transport {
        Transport::Obfs4 => TransportArgs::Obfs4 {
            cert: first,
            iat_mode: second,
        },
        Transport::Webtunnel => TransportArgs::Webtunnel {
            url: first,
            ver: second,
        },
    };

    Some(BridgeRecord {
        raw: line.to_string(),
        address: address.to_string(),
        port,
        fingerprint: caps[3].to_string(),
        args,
        added_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;

    const FP: &str = "0123456789ABCDEF0123456789ABCDEF01234567";

    fn obfs4(address: &str) -> String {
        format!("obfs4 {address}:443 {FP} cert=XYZ+abc/def iat-mode=0")
    }

    fn webtunnel(address: &str) -> String {
        format!("webtunnel {address}:443 {FP} url=https://example.org/path ver=0.0.1")
    }

    #[test]
    fn test_obfs4_ipv4() {
        let record = classify(&obfs4("1.2.3.4")).unwrap();
        assert_eq!(record.category(), Category::OBFS4_IPV4);
        assert_eq!(record.address, "1.2.3.4");
        assert_eq!(record.port, 443);
        assert_eq!(record.fingerprint, FP);
        assert_eq!(
            record.args,
            TransportArgs::Obfs4 {
                cert: "XYZ+abc/def".into(),
                iat_mode: "0".into()
            }
        );
    }

    #[test]
    fn test_obfs4_ipv6_strips_brackets() {
        let record = classify(&obfs4("[2001:db8::1]")).unwrap();
        assert_eq!(record.category(), Category::OBFS4_IPV6);
        assert_eq!(record.address, "2001:db8::1");
    }

    #[test]
    fn test_webtunnel_both_families() {
        let v4 = classify(&webtunnel("10.0.0.1")).unwrap();
        assert_eq!(v4.category(), Category::WEBTUNNEL_IPV4);
        assert_eq!(
            v4.args,
            TransportArgs::Webtunnel {
                url: "https://example.org/path".into(),
                ver: "0.0.1".into()
            }
        );

        let v6 = classify(&webtunnel("[::1]")).unwrap();
        assert_eq!(v6.category(), Category::WEBTUNNEL_IPV6);
        assert_eq!(v6.address, "::1");
    }

    #[test]
    fn test_raw_is_trimmed_line() {
        let line = format!("  {}\t\n", obfs4("1.2.3.4"));
        let record = classify(&line).unwrap();
        assert_eq!(record.raw, obfs4("1.2.3.4"));
    }

    #[test]
    fn test_stamps_given_time() {
        let at = DateTime::parse_from_rfc3339("2025-06-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let record = classify_at(&obfs4("1.2.3.4"), at).unwrap();
        assert_eq!(record.added_at, at);
    }

    #[test]
    fn test_lowercase_fingerprint_accepted() {
        let line = format!("obfs4 1.2.3.4:443 {} cert=X iat-mode=1", FP.to_lowercase());
        assert!(classify(&line).is_some());
    }

    #[test]
    fn test_rejects_unknown_transport() {
        assert!(classify(&format!("meek 1.2.3.4:443 {FP} url=x")).is_none());
        assert!(classify("garbage line").is_none());
        assert!(classify("").is_none());
        assert!(classify("   ").is_none());
    }

    #[test]
    fn test_rejects_grammar_violations() {
        let short_fp = &FP[..39];
        let cases = [
            // missing port
            format!("obfs4 1.2.3.4 {FP} cert=X iat-mode=0"),
            // short fingerprint
            format!("obfs4 1.2.3.4:443 {short_fp} cert=X iat-mode=0"),
            // non-hex fingerprint
            format!("obfs4 1.2.3.4:443 {}G cert=X iat-mode=0", short_fp),
            // missing iat-mode
            format!("obfs4 1.2.3.4:443 {FP} cert=X"),
            // wrong token order
            format!("obfs4 1.2.3.4:443 {FP} iat-mode=0 cert=X"),
            format!("webtunnel 1.2.3.4:443 {FP} ver=0.0.1 url=https://x"),
            // transport args swapped between transports
            format!("webtunnel 1.2.3.4:443 {FP} cert=X iat-mode=0"),
            // hostname instead of address literal
            format!("obfs4 example.org:443 {FP} cert=X iat-mode=0"),
            // trailing token
            format!("{} extra", obfs4("1.2.3.4")),
            // non-ASCII digits in address or port
            format!("obfs4 ١.٢.٣.٤:443 {FP} cert=X iat-mode=0"),
            format!("webtunnel 1.2.3.4:٤٤٣ {FP} url=https://x ver=0.0.1"),
        ];

        for line in &cases {
            assert!(classify(line).is_none(), "accepted: {line}");
        }
    }

    #[test]
    fn test_rejects_out_of_range_port() {
        assert!(classify(&format!("obfs4 1.2.3.4:0 {FP} cert=X iat-mode=0")).is_none());
        assert!(classify(&format!("obfs4 1.2.3.4:65536 {FP} cert=X iat-mode=0")).is_none());
        assert!(classify(&format!("obfs4 1.2.3.4:65535 {FP} cert=X iat-mode=0")).is_some());
    }

    #[test]
    fn test_colon_heuristic_classifies_odd_literal_as_ipv6() {
        let record = classify(&obfs4("[abc:]")).unwrap();
        assert_eq!(record.category(), Category::OBFS4_IPV6);
    }
}
