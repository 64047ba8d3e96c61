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

use super::{incorrect_state, InteractionHandler, StageCheck, StageTracker};
use crate::consumer::response_holder::ResponseSignal;
use crate::consumer::InteractionListener;
use crate::message::{InteractionStage, MalMessage, MalStatus, MessageHeader, QosProperties};
use async_trait::async_trait;
use std::sync::Arc;

/// INVOKE: ACK then RESPONSE. An ACK error ends the transaction.
///
/// With an `ack_signal` the ACK outcome unblocks a synchronous caller and only the
/// RESPONSE reaches the listener.
pub(crate) struct InvokeHandler {
    tracker: StageTracker,
    ack_signal: Option<ResponseSignal>,
    listener: Arc<dyn InteractionListener>,
    acknowledged: bool,
}

impl InvokeHandler {
    pub(crate) fn new(
        ack_signal: Option<ResponseSignal>,
        listener: Arc<dyn InteractionListener>,
    ) -> Self {
        Self {
            tracker: StageTracker::new(InteractionStage::Invoke),
            ack_signal,
            listener,
            acknowledged: false,
        }
    }

    async fn ack_error(&mut self, header: &MessageHeader, error: MalStatus, qos: &QosProperties) {
        self.tracker.finish();
        match self.ack_signal.as_mut() {
            Some(signal) => signal.signal_error(error),
            None => {
                self.listener
                    .invoke_ack_error_received(header, &error, qos)
                    .await
            }
        }
    }

    async fn response_error(
        &mut self,
        header: &MessageHeader,
        error: MalStatus,
        qos: &QosProperties,
    ) {
        self.tracker.finish();
        self.listener
            .invoke_response_error_received(header, &error, qos)
            .await;
    }

    async fn fail(&mut self, header: &MessageHeader, error: MalStatus, qos: &QosProperties) {
        if self.acknowledged {
            self.response_error(header, error, qos).await;
        } else {
            self.ack_error(header, error, qos).await;
        }
    }
}

#[async_trait]
impl InteractionHandler for InvokeHandler {
    async fn handle_stage(&mut self, message: MalMessage) {
        let last_seen = self.tracker.last_seen();
        match self.tracker.check(&message.header) {
            StageCheck::AfterTerminal => return,
            StageCheck::Unexpected => {
                let error = incorrect_state(&message.header, last_seen);
                self.fail(&message.header, error, &message.qos).await;
                return;
            }
            StageCheck::Accepted => {}
        }

        let MalMessage { header, body, qos } = message;
        match (header.stage, header.is_error) {
            (InteractionStage::InvokeAck, true) => {
                self.ack_error(&header, body.error_status(), &qos).await;
            }
            (InteractionStage::InvokeAck, false) => {
                self.acknowledged = true;
                match self.ack_signal.as_mut() {
                    Some(signal) => signal.signal_response(MalMessage { header, body, qos }),
                    None => self.listener.invoke_ack_received(&header, &body, &qos).await,
                }
            }
            (_, true) => {
                self.response_error(&header, body.error_status(), &qos)
                    .await;
            }
            (_, false) => {
                self.tracker.finish();
                self.listener
                    .invoke_response_received(&header, &body, &qos)
                    .await;
            }
        }
    }

    async fn handle_error(&mut self, header: &MessageHeader, error: MalStatus, qos: &QosProperties) {
        if self.tracker.is_finished() {
            return;
        }
        self.fail(header, error, qos).await;
    }

    fn finished(&self) -> bool {
        self.tracker.is_finished()
    }
}
