//! Provider layer.
//!
//! Receives initiating messages, hands them to the application through
//! [`ProviderHandler`], and publishes updates through a broker with [`MalPublisher`].

pub(crate) mod interaction;
pub(crate) mod mal_provider;
pub(crate) mod publisher;
pub(crate) mod typed;

pub use interaction::Interaction;
pub use mal_provider::{MalProvider, ProviderHandler};
pub use publisher::MalPublisher;
pub use typed::{
    InvokeAcknowledged, InvokeInteraction, ProgressAcknowledged, ProgressInteraction,
    RequestInteraction, SubmitInteraction,
};
