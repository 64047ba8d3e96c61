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

//! Boundary contracts with the transport collaborator.
//!
//! The transport moves [`MalMessage`] values between named endpoints. Encoding them into
//! bytes, socket handling and retries are its own business.

use crate::message::{MalMessage, MalStatus, Uri};
use async_trait::async_trait;
use std::sync::Arc;

/// Transport consumed by endpoints.
#[async_trait]
pub trait MalTransport: Send + Sync {
    /// Delivers `message` to `message.header.to`.
    async fn send(&self, message: MalMessage) -> Result<(), MalStatus>;

    /// Routes every message addressed to `uri` into `receiver`.
    async fn register_receiver(
        &self,
        uri: &Uri,
        receiver: Arc<dyn MessageReceiver>,
    ) -> Result<(), MalStatus>;

    async fn unregister_receiver(&self, uri: &Uri) -> Result<(), MalStatus>;
}

/// Callback surface the transport calls when messages arrive or delivery breaks down.
///
/// Deliveries may run concurrently on different workers.
#[async_trait]
pub trait MessageReceiver: Send + Sync {
    async fn on_message(&self, message: MalMessage);

    async fn on_messages(&self, messages: Vec<MalMessage>) {
        for message in messages {
            self.on_message(message).await;
        }
    }

    /// Reports loss of `remote`, or of the whole connection when `remote` is `None`.
    async fn on_transport_error(&self, remote: Option<&Uri>, error: MalStatus);
}
