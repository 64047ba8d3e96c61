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

use crate::message::{MalStatus, MessageBody, MessageHeader, NotifyBody, QosProperties};
use async_trait::async_trait;

/// Application callbacks for asynchronous interactions, subscriptions and publishers.
///
/// One method exists per (pattern, stage, outcome). Every method defaults to a no-op, so an
/// implementation only overrides the stages it cares about. Error variants receive the
/// status sent by the peer, or a status synthesized locally when the transaction was
/// force-terminated (timeout, connection loss, close, protocol violation).
#[async_trait]
pub trait InteractionListener: Send + Sync {
    async fn submit_ack_received(&self, _header: &MessageHeader, _qos: &QosProperties) {}

    async fn submit_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    async fn request_response_received(
        &self,
        _header: &MessageHeader,
        _body: &MessageBody,
        _qos: &QosProperties,
    ) {
    }

    async fn request_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    async fn invoke_ack_received(
        &self,
        _header: &MessageHeader,
        _body: &MessageBody,
        _qos: &QosProperties,
    ) {
    }

    async fn invoke_ack_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    async fn invoke_response_received(
        &self,
        _header: &MessageHeader,
        _body: &MessageBody,
        _qos: &QosProperties,
    ) {
    }

    async fn invoke_response_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    async fn progress_ack_received(
        &self,
        _header: &MessageHeader,
        _body: &MessageBody,
        _qos: &QosProperties,
    ) {
    }

    async fn progress_ack_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    async fn progress_update_received(
        &self,
        _header: &MessageHeader,
        _body: &MessageBody,
        _qos: &QosProperties,
    ) {
    }

    async fn progress_update_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    async fn progress_response_received(
        &self,
        _header: &MessageHeader,
        _body: &MessageBody,
        _qos: &QosProperties,
    ) {
    }

    async fn progress_response_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    async fn register_ack_received(&self, _header: &MessageHeader, _qos: &QosProperties) {}

    async fn register_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    async fn deregister_ack_received(&self, _header: &MessageHeader, _qos: &QosProperties) {}

    async fn deregister_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    async fn publish_register_ack_received(&self, _header: &MessageHeader, _qos: &QosProperties) {
    }

    async fn publish_register_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    async fn publish_deregister_ack_received(
        &self,
        _header: &MessageHeader,
        _qos: &QosProperties,
    ) {
    }

    async fn publish_deregister_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    /// A PUBLISH was rejected by the broker.
    async fn publish_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }

    async fn notify_received(
        &self,
        _header: &MessageHeader,
        _body: &NotifyBody,
        _qos: &QosProperties,
    ) {
    }

    async fn notify_error_received(
        &self,
        _header: &MessageHeader,
        _error: &MalStatus,
        _qos: &QosProperties,
    ) {
    }
}
