pub mod actors;
pub mod batch;
pub mod config;
pub mod mapping;
pub mod record;
pub mod storage;
pub mod util;

pub use record::{
    Authorization, CSeq, CaptureRecord, NameAddr, SipMessage, SipUri, StartLine, Via,
};
