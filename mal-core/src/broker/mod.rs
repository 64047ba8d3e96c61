//! Broker layer.
//!
//! Owns the publish/subscribe registry of one endpoint: per-consumer subscription sources,
//! per-publisher key-name allow-lists, and the fan-out that turns one PUBLISH into NOTIFY
//! messages. Matching policy itself lives in the routing layer.

pub(crate) mod broker_registry;
pub(crate) mod mal_broker;
pub(crate) mod notify;
pub(crate) mod publisher_source;
pub(crate) mod subscription_source;

pub use mal_broker::MalBroker;
pub use notify::{NotifyMessage, NotifyMessageSet};
pub use subscription_source::RequiredInterest;
