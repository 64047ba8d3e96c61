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

//! Single-slot response holder used by synchronous consumer calls.

use crate::message::{MalErrorCode, MalMessage, MalStatus};
use crate::observability::events;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, warn};

const COMPONENT: &str = "response_holder";

type ResponseResult = Result<MalMessage, MalStatus>;

/// Creates a connected signal/waiter pair for one transaction.
pub(crate) fn response_channel(transaction_id: u64) -> (ResponseSignal, ResponseWaiter) {
    let (sender, receiver) = oneshot::channel();
    (
        ResponseSignal {
            transaction_id,
            sender: Some(sender),
        },
        ResponseWaiter {
            transaction_id,
            receiver,
        },
    )
}

/// Handler-owned half. Only the first signal reaches the waiter.
pub(crate) struct ResponseSignal {
    transaction_id: u64,
    sender: Option<oneshot::Sender<ResponseResult>>,
}

impl ResponseSignal {
    /// Signals a received stage; an error-flagged stage resolves the waiter with its status.
    pub(crate) fn signal_response(&mut self, message: MalMessage) {
        let result = if message.header.is_error {
            Err(message.body.error_status())
        } else {
            Ok(message)
        };
        self.signal(result);
    }

    pub(crate) fn signal_error(&mut self, error: MalStatus) {
        self.signal(Err(error));
    }

    pub(crate) fn is_signaled(&self) -> bool {
        self.sender.is_none()
    }

    fn signal(&mut self, result: ResponseResult) {
        let Some(sender) = self.sender.take() else {
            warn!(
                event = events::RESPONSE_ALREADY_SIGNALED,
                component = COMPONENT,
                transaction_id = self.transaction_id,
                "response already signaled; dropping later result"
            );
            return;
        };

        if sender.send(result).is_err() {
            debug!(
                event = events::RESPONSE_ALREADY_SIGNALED,
                component = COMPONENT,
                transaction_id = self.transaction_id,
                "waiter gone before response arrived"
            );
        }
    }
}

/// Caller-owned half.
pub(crate) struct ResponseWaiter {
    transaction_id: u64,
    receiver: oneshot::Receiver<ResponseResult>,
}

impl ResponseWaiter {
    /// Waits for the signal, at most `timeout` when one is given.
    pub(crate) async fn wait(self, timeout: Option<Duration>) -> ResponseResult {
        let outcome = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.receiver).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    return Err(MalStatus::fail_with_code(
                        MalErrorCode::DeliveryTimedout,
                        format!(
                            "no reply for transaction {} within {:?}",
                            self.transaction_id, limit
                        ),
                    ))
                }
            },
            None => self.receiver.await,
        };

        outcome.unwrap_or_else(|_| {
            Err(MalStatus::fail_with_code(
                MalErrorCode::Internal,
                format!(
                    "transaction {} dropped without a reply",
                    self.transaction_id
                ),
            ))
        })
    }
}
