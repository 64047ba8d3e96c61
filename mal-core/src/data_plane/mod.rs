//! Data-plane layer.
//!
//! The inbound router receives every message the transport delivers to an endpoint and hands
//! it to the transaction table, the provider, the broker or the subscription listeners. The
//! egress worker moves broker NOTIFY traffic onto its own runtime thread.

pub(crate) mod egress_worker;
pub(crate) mod inbound_router;
