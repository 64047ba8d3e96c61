//! Consumer layer.
//!
//! Initiates interactions, owns one state machine per outstanding transaction, and routes
//! NOTIFY/PUBLISH-error traffic to the listeners bound at registration time.

pub(crate) mod handlers;
pub(crate) mod listener;
pub(crate) mod mal_consumer;
pub(crate) mod response_holder;
pub(crate) mod subscription_listeners;
pub(crate) mod transaction_table;

pub use listener::InteractionListener;
pub use mal_consumer::MalConsumer;
