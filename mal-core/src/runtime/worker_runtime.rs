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

//! Runtime helper for spawning egress dispatch loops on dedicated threads.

use crate::observability::events;
use std::future::Future;
use std::thread;
use tokio::runtime::Builder;
use tracing::debug;

pub(crate) const DEFAULT_EGRESS_RUNTIME_THREAD_NAME: &str = "mal-egress-rt";

const COMPONENT: &str = "worker_runtime";

/// Join handle plus the thread label of one dispatch loop.
pub(crate) struct DispatchLoopHandle {
    worker_thread: String,
    join_handle: Option<thread::JoinHandle<()>>,
}

impl DispatchLoopHandle {
    pub(crate) fn worker_thread(&self) -> &str {
        &self.worker_thread
    }

    /// Whether the loop thread has returned.
    pub(crate) fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Takes the join handle so a caller can wait for the loop to drain.
    pub(crate) fn take_join_handle(&mut self) -> Option<thread::JoinHandle<()>> {
        self.join_handle.take()
    }
}

/// Runs `run_loop(input)` on a current-thread Tokio runtime owned by a new named thread.
pub(crate) fn spawn_dispatch_loop<I, F, Fut>(
    thread_name: String,
    input: I,
    run_loop: F,
) -> DispatchLoopHandle
where
    I: Send + 'static,
    F: FnOnce(I) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    debug!(
        event = events::RUNTIME_SPAWN_START,
        component = COMPONENT,
        worker_thread = thread_name.as_str(),
        "spawning dispatch runtime thread"
    );

    let join_handle = thread::Builder::new()
        .name(thread_name.clone())
        .spawn(move || {
            let runtime = Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to create egress Tokio runtime");

            runtime.block_on(run_loop(input));
        })
        .expect("Failed to spawn egress runtime thread");

    debug!(
        event = events::RUNTIME_SPAWN_OK,
        component = COMPONENT,
        worker_thread = thread_name.as_str(),
        "dispatch runtime thread started"
    );

    DispatchLoopHandle {
        worker_thread: thread_name,
        join_handle: Some(join_handle),
    }
}
