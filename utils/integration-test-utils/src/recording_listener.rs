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

use async_trait::async_trait;
use mal_core::{
    InteractionListener, MalStatus, MessageBody, MessageHeader, NotifyBody, QosProperties,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tracing::debug;

/// One listener callback as it was observed.
#[derive(Clone, Debug)]
pub struct ListenerCall {
    pub callback: &'static str,
    pub header: MessageHeader,
    pub body: Option<MessageBody>,
    pub notify: Option<NotifyBody>,
    pub error: Option<MalStatus>,
}

impl ListenerCall {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// [`InteractionListener`] that stores every callback in arrival order.
#[derive(Clone, Default)]
pub struct RecordingListener {
    calls: Arc<Mutex<Vec<ListenerCall>>>,
    changed: Arc<Notify>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn calls(&self) -> Vec<ListenerCall> {
        self.calls.lock().await.clone()
    }

    /// Calls whose callback name equals `callback`.
    pub async fn calls_named(&self, callback: &str) -> Vec<ListenerCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.callback == callback)
            .cloned()
            .collect()
    }

    /// Waits until at least `count` callbacks were recorded. Returns what was seen so far
    /// when `timeout` elapses first.
    pub async fn wait_for_calls(&self, count: usize, timeout: Duration) -> Vec<ListenerCall> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let changed = self.changed.notified();
            {
                let calls = self.calls.lock().await;
                if calls.len() >= count {
                    return calls.clone();
                }
            }
            if tokio::time::timeout_at(deadline, changed).await.is_err() {
                return self.calls().await;
            }
        }
    }

    async fn record(
        &self,
        callback: &'static str,
        header: &MessageHeader,
        body: Option<&MessageBody>,
        notify: Option<&NotifyBody>,
        error: Option<&MalStatus>,
    ) {
        debug!(
            callback,
            transaction_id = header.transaction_id,
            "recording listener callback"
        );
        self.calls.lock().await.push(ListenerCall {
            callback,
            header: header.clone(),
            body: body.cloned(),
            notify: notify.cloned(),
            error: error.cloned(),
        });
        self.changed.notify_waiters();
    }
}

#[async_trait]
impl InteractionListener for RecordingListener {
    async fn submit_ack_received(&self, header: &MessageHeader, _qos: &QosProperties) {
        self.record("submit_ack", header, None, None, None).await;
    }

    async fn submit_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("submit_error", header, None, None, Some(error))
            .await;
    }

    async fn request_response_received(
        &self,
        header: &MessageHeader,
        body: &MessageBody,
        _qos: &QosProperties,
    ) {
        self.record("request_response", header, Some(body), None, None)
            .await;
    }

    async fn request_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("request_error", header, None, None, Some(error))
            .await;
    }

    async fn invoke_ack_received(
        &self,
        header: &MessageHeader,
        body: &MessageBody,
        _qos: &QosProperties,
    ) {
        self.record("invoke_ack", header, Some(body), None, None)
            .await;
    }

    async fn invoke_ack_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("invoke_ack_error", header, None, None, Some(error))
            .await;
    }

    async fn invoke_response_received(
        &self,
        header: &MessageHeader,
        body: &MessageBody,
        _qos: &QosProperties,
    ) {
        self.record("invoke_response", header, Some(body), None, None)
            .await;
    }

    async fn invoke_response_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("invoke_response_error", header, None, None, Some(error))
            .await;
    }

    async fn progress_ack_received(
        &self,
        header: &MessageHeader,
        body: &MessageBody,
        _qos: &QosProperties,
    ) {
        self.record("progress_ack", header, Some(body), None, None)
            .await;
    }

    async fn progress_ack_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("progress_ack_error", header, None, None, Some(error))
            .await;
    }

    async fn progress_update_received(
        &self,
        header: &MessageHeader,
        body: &MessageBody,
        _qos: &QosProperties,
    ) {
        self.record("progress_update", header, Some(body), None, None)
            .await;
    }

    async fn progress_update_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("progress_update_error", header, None, None, Some(error))
            .await;
    }

    async fn progress_response_received(
        &self,
        header: &MessageHeader,
        body: &MessageBody,
        _qos: &QosProperties,
    ) {
        self.record("progress_response", header, Some(body), None, None)
            .await;
    }

    async fn progress_response_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("progress_response_error", header, None, None, Some(error))
            .await;
    }

    async fn register_ack_received(&self, header: &MessageHeader, _qos: &QosProperties) {
        self.record("register_ack", header, None, None, None).await;
    }

    async fn register_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("register_error", header, None, None, Some(error))
            .await;
    }

    async fn deregister_ack_received(&self, header: &MessageHeader, _qos: &QosProperties) {
        self.record("deregister_ack", header, None, None, None).await;
    }

    async fn deregister_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("deregister_error", header, None, None, Some(error))
            .await;
    }

    async fn publish_register_ack_received(&self, header: &MessageHeader, _qos: &QosProperties) {
        self.record("publish_register_ack", header, None, None, None)
            .await;
    }

    async fn publish_register_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("publish_register_error", header, None, None, Some(error))
            .await;
    }

    async fn publish_deregister_ack_received(
        &self,
        header: &MessageHeader,
        _qos: &QosProperties,
    ) {
        self.record("publish_deregister_ack", header, None, None, None)
            .await;
    }

    async fn publish_deregister_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("publish_deregister_error", header, None, None, Some(error))
            .await;
    }

    async fn publish_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("publish_error", header, None, None, Some(error))
            .await;
    }

    async fn notify_received(
        &self,
        header: &MessageHeader,
        body: &NotifyBody,
        _qos: &QosProperties,
    ) {
        self.record("notify", header, None, Some(body), None).await;
    }

    async fn notify_error_received(
        &self,
        header: &MessageHeader,
        error: &MalStatus,
        _qos: &QosProperties,
    ) {
        self.record("notify_error", header, None, None, Some(error))
            .await;
    }
}
