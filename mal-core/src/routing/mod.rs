//! Routing layer.
//!
//! Pure matching policy used by the broker: domain wildcards, the named key-value view of
//! a published update, and the subscription matcher itself.

pub(crate) mod domain_filter;
pub(crate) mod subscription_matcher;
pub(crate) mod update_key_values;
