//! The wire format of serialized assignments: one length-prefixed,
//! tag-numbered record per assignment, with repeated entries per variable
//! kind. Unknown tags are skipped by the decoder, so records written by newer
//! revisions stay readable.

use prost::Message;

#[derive(Clone, PartialEq, Message)]
pub(crate) struct IntVarRecord {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(int64, tag = "2")]
    pub min: i64,
    #[prost(int64, tag = "3")]
    pub max: i64,
    #[prost(bool, tag = "4")]
    pub active: bool,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct IntervalVarRecord {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(int64, tag = "2")]
    pub start_min: i64,
    #[prost(int64, tag = "3")]
    pub start_max: i64,
    #[prost(int64, tag = "4")]
    pub duration_min: i64,
    #[prost(int64, tag = "5")]
    pub duration_max: i64,
    #[prost(int64, tag = "6")]
    pub end_min: i64,
    #[prost(int64, tag = "7")]
    pub end_max: i64,
    #[prost(int64, tag = "8")]
    pub performed_min: i64,
    #[prost(int64, tag = "9")]
    pub performed_max: i64,
    #[prost(bool, tag = "10")]
    pub active: bool,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct SequenceVarRecord {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(bool, tag = "2")]
    pub active: bool,
    #[prost(int64, repeated, tag = "3")]
    pub sequence: Vec<i64>,
}

#[derive(Clone, PartialEq, Message)]
pub(crate) struct AssignmentRecord {
    #[prost(message, repeated, tag = "1")]
    pub integer_variables: Vec<IntVarRecord>,
    #[prost(message, repeated, tag = "2")]
    pub interval_variables: Vec<IntervalVarRecord>,
    #[prost(message, repeated, tag = "3")]
    pub sequence_variables: Vec<SequenceVarRecord>,
    #[prost(message, optional, tag = "4")]
    pub objective: Option<IntVarRecord>,
}
