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

use crate::consumer::handlers::{AckHook, AckKind, PublisherRelease};
use crate::consumer::{InteractionListener, MalConsumer};
use crate::endpoint::EndpointShared;
use crate::message::{
    InteractionStage, MalErrorCode, MalMessage, MalStatus, MessageBody, OperationId,
    PublishBody, Update, Uri,
};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Publishes updates for one operation through a broker.
///
/// PUBLISH reuses the transaction id of the PUBLISH_REGISTER that opened the
/// registration, so broker rejections reach the listener given to `register`.
pub struct MalPublisher {
    channel: MalConsumer,
    operation: OperationId,
    registration: Arc<Mutex<Option<u64>>>,
}

impl MalPublisher {
    pub(crate) fn new(shared: Arc<EndpointShared>, broker_uri: Uri, operation: OperationId) -> Self {
        Self {
            channel: MalConsumer::new(shared, broker_uri),
            operation,
            registration: Arc::new(Mutex::new(None)),
        }
    }

    pub fn operation(&self) -> OperationId {
        self.operation
    }

    pub fn broker_uri(&self) -> &Uri {
        self.channel.provider_uri()
    }

    /// PUBLISH_REGISTER with the key names that name each update's positional key values.
    pub async fn register(
        &self,
        key_names: Vec<String>,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.bind(listener).await;
        let result = self
            .channel
            .sync_ack(
                AckKind::PublishRegister,
                transaction_id,
                self.operation,
                MessageBody::PublishRegister(key_names),
                AckHook::ReleasePublisherOnError(self.release_hook(transaction_id)),
            )
            .await;
        if result.is_err() {
            self.release_hook(transaction_id).release().await;
        }
        result
    }

    pub async fn async_register(
        &self,
        key_names: Vec<String>,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.bind(listener.clone()).await;
        let result = self
            .channel
            .async_ack(
                AckKind::PublishRegister,
                transaction_id,
                self.operation,
                MessageBody::PublishRegister(key_names),
                listener,
                AckHook::ReleasePublisherOnError(self.release_hook(transaction_id)),
            )
            .await;
        if result.is_err() {
            self.release_hook(transaction_id).release().await;
        }
        result
    }

    /// Sends one PUBLISH batch. Fails locally with INCORRECT_STATE when not registered.
    pub async fn publish(&self, updates: Vec<Update>) -> Result<MalMessage, MalStatus> {
        let Some(transaction_id) = *self.registration.lock().await else {
            return Err(MalStatus::fail_with_code(
                MalErrorCode::IncorrectState,
                format!("publisher for {} is not registered", self.operation),
            ));
        };

        self.channel
            .send_untracked(
                InteractionStage::Publish,
                transaction_id,
                self.operation,
                MessageBody::Publish(PublishBody { updates }),
            )
            .await
    }

    pub async fn deregister(&self) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.channel.shared().next_transaction_id();
        let ack = self
            .channel
            .sync_ack(
                AckKind::PublishDeregister,
                transaction_id,
                self.operation,
                MessageBody::PublishDeregister,
                AckHook::None,
            )
            .await?;
        self.clear().await;
        Ok(ack)
    }

    /// The registration is dropped locally once the PUBLISH_DEREGISTER is sent.
    pub async fn async_deregister(
        &self,
        listener: Arc<dyn InteractionListener>,
    ) -> Result<MalMessage, MalStatus> {
        let transaction_id = self.channel.shared().next_transaction_id();
        let sent = self
            .channel
            .async_ack(
                AckKind::PublishDeregister,
                transaction_id,
                self.operation,
                MessageBody::PublishDeregister,
                listener,
                AckHook::None,
            )
            .await?;
        self.clear().await;
        Ok(sent)
    }

    async fn bind(&self, listener: Arc<dyn InteractionListener>) -> u64 {
        let shared = self.channel.shared();
        let transaction_id = shared.next_transaction_id();
        let previous = self.registration.lock().await.replace(transaction_id);
        if let Some(previous) = previous {
            shared.subscription_listeners.unbind_publisher(previous).await;
        }
        shared
            .subscription_listeners
            .bind_publisher(
                transaction_id,
                self.broker_uri().clone(),
                shared.uri.clone(),
                self.operation,
                listener,
            )
            .await;
        transaction_id
    }

    fn release_hook(&self, transaction_id: u64) -> PublisherRelease {
        PublisherRelease::new(
            self.channel.shared().subscription_listeners.clone(),
            self.registration.clone(),
            transaction_id,
        )
    }

    async fn clear(&self) {
        let previous = self.registration.lock().await.take();
        if let Some(previous) = previous {
            self.channel
                .shared()
                .subscription_listeners
                .unbind_publisher(previous)
                .await;
        }
    }
}
