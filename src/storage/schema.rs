//! Destination tables, column lists and scalar row values
//!
//! ## Layout
//!
//! Records land in one of six day-partitioned tables. SIP traffic uses a
//! wide 41-column layout, RTC side-channel traffic (RTCP, reports, DNS, logs)
//! a narrow 12-column layout:
//!
//! | Category     | Table prefix                | Family |
//! |--------------|-----------------------------|--------|
//! | Registration | `sip_capture_registration`  | SIP    |
//! | Call         | `sip_capture_call`          | SIP    |
//! | RTCP         | `rtcp_capture_all`          | RTC    |
//! | Report       | `report_capture_all`        | RTC    |
//! | DNS          | `dns_capture_all`           | RTC    |
//! | Log          | `log_capture_all`           | RTC    |
//!
//! The date suffix is always the date at flush time (`<prefix>_YYYYMMDD`).

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// Columns of the SIP tables, in bind order
pub const SIP_COLUMNS: [&str; 41] = [
    "date",
    "micro_ts",
    "method",
    "reply_reason",
    "ruri",
    "ruri_user",
    "ruri_domain",
    "from_user",
    "from_domain",
    "from_tag",
    "to_user",
    "to_domain",
    "to_tag",
    "pid_user",
    "contact_user",
    "auth_user",
    "callid",
    "callid_aleg",
    "via_1",
    "via_1_branch",
    "cseq",
    "diversion",
    "reason",
    "content_type",
    "auth",
    "user_agent",
    "source_ip",
    "source_port",
    "destination_ip",
    "destination_port",
    "contact_ip",
    "contact_port",
    "originator_ip",
    "originator_port",
    "proto",
    "family",
    "rtp_stat",
    "type",
    "node",
    "correlation_id",
    "msg",
];

/// Columns of the RTC tables, in bind order
pub const RTC_COLUMNS: [&str; 12] = [
    "date",
    "micro_ts",
    "correlation_id",
    "source_ip",
    "source_port",
    "destination_ip",
    "destination_port",
    "proto",
    "family",
    "type",
    "node",
    "msg",
];

/// Table layout shared by a group of categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Sip,
    Rtc,
}

impl Family {
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Family::Sip => &SIP_COLUMNS,
            Family::Rtc => &RTC_COLUMNS,
        }
    }

    /// Number of values per row
    pub fn width(&self) -> usize {
        self.columns().len()
    }
}

/// Destination classification of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Registration,
    Call,
    Rtcp,
    Report,
    Dns,
    Log,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Registration,
        Category::Call,
        Category::Rtcp,
        Category::Report,
        Category::Dns,
        Category::Log,
    ];

    /// Stable position within [`Category::ALL`]
    pub fn index(&self) -> usize {
        match self {
            Category::Registration => 0,
            Category::Call => 1,
            Category::Rtcp => 2,
            Category::Report => 3,
            Category::Dns => 4,
            Category::Log => 5,
        }
    }

    pub fn family(&self) -> Family {
        match self {
            Category::Registration | Category::Call => Family::Sip,
            Category::Rtcp | Category::Report | Category::Dns | Category::Log => Family::Rtc,
        }
    }

    pub fn table_prefix(&self) -> &'static str {
        match self {
            Category::Registration => "sip_capture_registration",
            Category::Call => "sip_capture_call",
            Category::Rtcp => "rtcp_capture_all",
            Category::Report => "report_capture_all",
            Category::Dns => "dns_capture_all",
            Category::Log => "log_capture_all",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Registration => "registration",
            Category::Call => "call",
            Category::Rtcp => "rtcp",
            Category::Report => "report",
            Category::Dns => "dns",
            Category::Log => "log",
        };
        f.write_str(name)
    }
}

/// Day-partitioned table name for `category` on `date`
pub fn table_name(category: Category, date: NaiveDate) -> String {
    format!("{}_{}", category.table_prefix(), date.format("%Y%m%d"))
}

/// A single bind parameter
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    Timestamp(NaiveDateTime),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<u16> for Value {
    fn from(value: u16) -> Self {
        Value::Int(value as i64)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::Timestamp(value)
    }
}
