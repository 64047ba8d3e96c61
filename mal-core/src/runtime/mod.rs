//! Runtime integration layer.
//!
//! Keeps thread and Tokio runtime ownership in one place so the broker's egress path does not
//! depend on whichever runtime delivered the PUBLISH.

pub(crate) mod worker_runtime;
