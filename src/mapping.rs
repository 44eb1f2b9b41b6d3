//! Record classification and row mapping
//!
//! Routing, first match wins:
//!
//! 1. protocol-type 1 with a payload and a parsed SIP message: CSeq method
//!    `REGISTER` goes to [`Category::Registration`], everything else to
//!    [`Category::Call`].
//! 2. protocol-type 2..=200 with a correlation id: 5 → RTCP, 38 → report,
//!    53 → DNS, 100 → log. Other codes in the range are dropped.
//! 3. Everything else is dropped.

use chrono::{SubsecRound, Timelike};

use crate::record::{
    CaptureRecord, PROTO_DNS, PROTO_LOG, PROTO_REPORT, PROTO_RTCP, PROTO_SIP, SipMessage,
};
use crate::storage::schema::{Category, Value};
use crate::util::truncate;

/// Max characters stored for From/To tags
pub const TAG_LIMIT: usize = 64;

/// Max characters stored for the Authorization and RTP statistics headers
pub const HEADER_LIMIT: usize = 256;

/// Max characters stored for the raw SIP payload
pub const PAYLOAD_LIMIT: usize = 3000;

/// Decide where a record goes, `None` if it is not stored at all
pub fn classify(record: &CaptureRecord) -> Option<Category> {
    if record.proto_type == PROTO_SIP && !record.payload.is_empty() {
        if let Some(sip) = &record.sip {
            return Some(if sip.cseq.method == "REGISTER" {
                Category::Registration
            } else {
                Category::Call
            });
        }
    }

    if (2..=200).contains(&record.proto_type) && !record.correlation_id.is_empty() {
        return match record.proto_type {
            PROTO_RTCP => Some(Category::Rtcp),
            PROTO_REPORT => Some(Category::Report),
            PROTO_DNS => Some(Category::Dns),
            PROTO_LOG => Some(Category::Log),
            _ => None,
        };
    }

    None
}

/// Classify and flatten a record into one row of bind values
pub fn map_record(record: &CaptureRecord) -> Option<(Category, Vec<Value>)> {
    let category = classify(record)?;
    let row = match (category, &record.sip) {
        (Category::Registration | Category::Call, Some(sip)) => sip_row(record, sip),
        _ => rtc_row(record),
    };
    Some((category, row))
}

fn date_value(record: &CaptureRecord) -> Value {
    let date = record.timestamp.naive_utc().trunc_subsecs(0);
    debug_assert_eq!(date.nanosecond(), 0);
    Value::Timestamp(date)
}

/// 41 values in `SIP_COLUMNS` order
pub fn sip_row(record: &CaptureRecord, sip: &SipMessage) -> Vec<Value> {
    let (via, via_branch) = sip
        .top_via()
        .map(|via| (via.value.as_str(), via.branch.as_str()))
        .unwrap_or_default();

    vec![
        date_value(record),
        Value::Int(record.micros()),
        sip.start_line.method.as_str().into(),
        sip.start_line.resp_text.as_str().into(),
        sip.start_line.uri.raw.as_str().into(),
        sip.start_line.uri.user.as_str().into(),
        sip.start_line.uri.host.as_str().into(),
        sip.from.uri.user.as_str().into(),
        sip.from.uri.host.as_str().into(),
        truncate(&sip.from.tag, TAG_LIMIT).into(),
        sip.to.uri.user.as_str().into(),
        sip.to.uri.host.as_str().into(),
        truncate(&sip.to.tag, TAG_LIMIT).into(),
        sip.p_asserted_id.as_str().into(),
        sip.contact.uri.user.as_str().into(),
        sip.authorization.username.as_str().into(),
        sip.call_id.as_str().into(),
        // callid_aleg
        Value::Text(String::new()),
        via.into(),
        via_branch.into(),
        sip.cseq.value.as_str().into(),
        sip.diversion.as_str().into(),
        // reason
        Value::Text(String::new()),
        sip.content_type.as_str().into(),
        truncate(&sip.authorization.value, HEADER_LIMIT).into(),
        sip.user_agent.as_str().into(),
        record.src_ip.as_str().into(),
        record.src_port.into(),
        record.dst_ip.as_str().into(),
        record.dst_port.into(),
        sip.contact.uri.host.as_str().into(),
        sip.contact.uri.port.into(),
        // originator_ip, originator_port
        Value::Text(String::new()),
        Value::Int(0),
        record.protocol.into(),
        record.version.into(),
        truncate(&sip.rtp_stat, HEADER_LIMIT).into(),
        record.proto_type.into(),
        record.node_id.into(),
        sip.call_id.as_str().into(),
        truncate(&record.payload, PAYLOAD_LIMIT).into(),
    ]
}

/// 12 values in `RTC_COLUMNS` order
pub fn rtc_row(record: &CaptureRecord) -> Vec<Value> {
    vec![
        date_value(record),
        Value::Int(record.micros()),
        record.correlation_id.as_str().into(),
        record.src_ip.as_str().into(),
        record.src_port.into(),
        record.dst_ip.as_str().into(),
        record.dst_port.into(),
        record.protocol.into(),
        record.version.into(),
        record.proto_type.into(),
        record.node_id.into(),
        record.payload.as_str().into(),
    ]
}
