//! Decoded capture records
//!
//! These are produced by the decoding stage upstream of the sink. Every field
//! that a decoder may leave out defaults to its empty value so records can be
//! fed in as newline-delimited JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Protocol-type code carried by SIP records
pub const PROTO_SIP: u32 = 1;

/// Protocol-type code for RTCP side-channel reports
pub const PROTO_RTCP: u32 = 5;

/// Protocol-type code for QoS/media reports
pub const PROTO_REPORT: u32 = 38;

/// Protocol-type code for DNS events
pub const PROTO_DNS: u32 = 53;

/// Protocol-type code for log lines
pub const PROTO_LOG: u32 = 100;

/// One decoded capture event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureRecord {
    /// When the packet was captured
    pub timestamp: DateTime<Utc>,

    /// Protocol-type code (1 = SIP, 5 = RTCP, 38 = report, 53 = DNS, 100 = log)
    pub proto_type: u32,

    /// Opaque key linking non-SIP records to a call
    #[serde(default)]
    pub correlation_id: String,

    #[serde(default)]
    pub src_ip: String,
    #[serde(default)]
    pub src_port: u16,
    #[serde(default)]
    pub dst_ip: String,
    #[serde(default)]
    pub dst_port: u16,

    /// Transport protocol number (17 = UDP, 6 = TCP, ...)
    #[serde(default)]
    pub protocol: u32,

    /// IP family (2 = IPv4, 10 = IPv6)
    #[serde(default)]
    pub version: u32,

    /// Capture node identifier
    #[serde(default)]
    pub node_id: u32,

    /// Raw payload as captured
    #[serde(default)]
    pub payload: String,

    /// Parsed SIP message, present only for SIP records
    #[serde(default)]
    pub sip: Option<SipMessage>,
}

impl CaptureRecord {
    /// Microsecond-precision timestamp
    pub fn micros(&self) -> i64 {
        self.timestamp.timestamp_micros()
    }
}

/// Parsed SIP headers relevant for storage
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SipMessage {
    pub start_line: StartLine,
    pub from: NameAddr,
    pub to: NameAddr,
    pub contact: NameAddr,
    pub p_asserted_id: String,
    pub authorization: Authorization,
    pub call_id: String,
    /// Via headers in message order; the first one is the top Via
    pub via: Vec<Via>,
    pub cseq: CSeq,
    pub diversion: String,
    pub content_type: String,
    pub user_agent: String,
    /// Value of the RTP statistics header (X-RTP-Stat and friends)
    pub rtp_stat: String,
}

impl SipMessage {
    /// Top-most Via header, if any
    pub fn top_via(&self) -> Option<&Via> {
        self.via.first()
    }
}

/// Request or status line
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StartLine {
    /// Request method; empty for responses
    pub method: String,
    /// Response reason phrase; empty for requests
    pub resp_text: String,
    pub uri: SipUri,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SipUri {
    pub raw: String,
    pub user: String,
    pub host: String,
    pub port: u16,
}

/// From / To / Contact style header
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NameAddr {
    pub uri: SipUri,
    pub tag: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Authorization {
    pub username: String,
    /// Full header value
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Via {
    /// Full header value
    pub value: String,
    pub branch: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CSeq {
    pub method: String,
    /// Full header value, e.g. "1 REGISTER"
    pub value: String,
}
