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

use super::{incorrect_state, InteractionHandler, Reply, StageCheck, StageTracker};
use crate::message::{InteractionStage, MalMessage, MalStatus, MessageHeader, QosProperties};
use async_trait::async_trait;

/// REQUEST: a single RESPONSE stage carrying a body.
pub(crate) struct RequestHandler {
    tracker: StageTracker,
    reply: Reply,
}

impl RequestHandler {
    pub(crate) fn new(reply: Reply) -> Self {
        Self {
            tracker: StageTracker::new(InteractionStage::Request),
            reply,
        }
    }

    async fn deliver_error(&mut self, header: &MessageHeader, error: MalStatus, qos: &QosProperties) {
        self.tracker.finish();
        match &mut self.reply {
            Reply::Sync(signal) => signal.signal_error(error),
            Reply::Async(listener) => listener.request_error_received(header, &error, qos).await,
        }
    }
}

#[async_trait]
impl InteractionHandler for RequestHandler {
    async fn handle_stage(&mut self, message: MalMessage) {
        let last_seen = self.tracker.last_seen();
        match self.tracker.check(&message.header) {
            StageCheck::AfterTerminal => return,
            StageCheck::Unexpected => {
                let error = incorrect_state(&message.header, last_seen);
                self.deliver_error(&message.header, error, &message.qos)
                    .await;
                return;
            }
            StageCheck::Accepted => {}
        }

        if message.header.is_error {
            let error = message.body.error_status();
            self.deliver_error(&message.header, error, &message.qos)
                .await;
            return;
        }

        self.tracker.finish();
        match &mut self.reply {
            Reply::Sync(signal) => signal.signal_response(message),
            Reply::Async(listener) => {
                listener
                    .request_response_received(&message.header, &message.body, &message.qos)
                    .await
            }
        }
    }

    async fn handle_error(&mut self, header: &MessageHeader, error: MalStatus, qos: &QosProperties) {
        if self.tracker.is_finished() {
            return;
        }
        self.deliver_error(header, error, qos).await;
    }

    fn finished(&self) -> bool {
        self.tracker.is_finished()
    }
}
