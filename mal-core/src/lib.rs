/********************************************************************************
 * Copyright (c) 2026 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

//!
//! `mal-core` implements the interaction patterns of a MAL-style message middleware:
//! SEND, SUBMIT, REQUEST, INVOKE, PROGRESS and PUBLISH-SUBSCRIBE, seen from both the
//! consumer and the provider side, plus a broker that matches published updates against
//! registered subscriptions.
//!
//! Everything is hosted on a [`MalEndpoint`], which binds a URI to a [`MalTransport`].
//! Consumers, publishers, a provider and a broker can share one endpoint.
//!
//! ```
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use mal_core::{
//!     InteractionConfig, MalEndpoint, MalMessage, MalStatus, MalTransport, MessageReceiver, Uri,
//! };
//!
//! struct NoopTransport;
//!
//! #[async_trait]
//! impl MalTransport for NoopTransport {
//!     async fn send(&self, _message: MalMessage) -> Result<(), MalStatus> {
//!         Ok(())
//!     }
//!
//!     async fn register_receiver(
//!         &self,
//!         _uri: &Uri,
//!         _receiver: Arc<dyn MessageReceiver>,
//!     ) -> Result<(), MalStatus> {
//!         Ok(())
//!     }
//!
//!     async fn unregister_receiver(&self, _uri: &Uri) -> Result<(), MalStatus> {
//!         Ok(())
//!     }
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let transport: Arc<dyn MalTransport> = Arc::new(NoopTransport);
//! let endpoint = MalEndpoint::new("ground/broker", transport, InteractionConfig::default())
//!     .await
//!     .unwrap();
//! let broker = mal_core::MalBroker::start(&endpoint, mal_core::BrokerConfig::default()).unwrap();
//! assert!(mal_core::MalBroker::start(&endpoint, mal_core::BrokerConfig::default()).is_err());
//! broker.shutdown().await;
//! # });
//! ```
//!
//! - Message model: header identity, the stage table, bodies and status codes
//! - Consumer: per-transaction state machines, listeners and subscription bindings
//! - Provider: typed interactions and the application handler contract
//! - Routing: domain wildcards and the subscription matcher
//! - Broker: subscription and publisher registries and NOTIFY fan-out
//! - Data plane: inbound routing and the egress worker
//!
//! The workspace uses `tracing` for logs/events.
//! Library code emits events and does not initialize a global subscriber. Binaries and
//! tests are responsible for one-time `tracing_subscriber` initialization.

mod broker;
pub use broker::{MalBroker, NotifyMessage, NotifyMessageSet, RequiredInterest};

mod config;
pub use config::{BrokerConfig, ConfigError, InteractionConfig, MalConfig};

mod consumer;
pub use consumer::{InteractionListener, MalConsumer};

mod data_plane;

mod endpoint;
pub use endpoint::{EndpointSender, MalEndpoint, MessageSender};

mod message;
pub use message::{
    accepts_transition, expected_next_stage, first_reply_stage, AttributeValue,
    InteractionStage, InteractionType, MalErrorCode, MalMessage, MalStatus, MessageBody,
    MessageHeader, NamedValue, NotifiedUpdate, NotifiedUpdateHeader, NotifyBody, OperationId,
    OperationKey, PublishBody, QosProperties, Subscription, SubscriptionFilter, Update,
    UpdateHeader, Uri,
};

#[doc(hidden)]
pub mod observability;

mod provider;
pub use provider::{
    Interaction, InvokeAcknowledged, InvokeInteraction, MalProvider, MalPublisher,
    ProgressAcknowledged, ProgressInteraction, ProviderHandler, RequestInteraction,
    SubmitInteraction,
};

mod routing;
mod runtime;

mod transport;
pub use transport::{MalTransport, MessageReceiver};

#[doc(hidden)]
pub mod benchmark_support;
