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

//! Interaction patterns, their stages, and the stage transition table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};

/// Message-exchange shape between a consumer and a provider.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionType {
    Send,
    Submit,
    Request,
    Invoke,
    Progress,
    PubSub,
}

impl InteractionType {
    pub fn number(self) -> u8 {
        match self {
            InteractionType::Send => 1,
            InteractionType::Submit => 2,
            InteractionType::Request => 3,
            InteractionType::Invoke => 4,
            InteractionType::Progress => 5,
            InteractionType::PubSub => 6,
        }
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(InteractionType::Send),
            2 => Some(InteractionType::Submit),
            3 => Some(InteractionType::Request),
            4 => Some(InteractionType::Invoke),
            5 => Some(InteractionType::Progress),
            6 => Some(InteractionType::PubSub),
            _ => None,
        }
    }
}

impl Display for InteractionType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            InteractionType::Send => "SEND",
            InteractionType::Submit => "SUBMIT",
            InteractionType::Request => "REQUEST",
            InteractionType::Invoke => "INVOKE",
            InteractionType::Progress => "PROGRESS",
            InteractionType::PubSub => "PUBSUB",
        };
        f.write_str(name)
    }
}

/// Named point within an interaction pattern's message sequence.
///
/// Every variant belongs to exactly one [`InteractionType`]; [`InteractionStage::number`]
/// gives the pattern-relative wire value.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionStage {
    Send,
    Submit,
    SubmitAck,
    Request,
    RequestResponse,
    Invoke,
    InvokeAck,
    InvokeResponse,
    Progress,
    ProgressAck,
    ProgressUpdate,
    ProgressResponse,
    Register,
    RegisterAck,
    PublishRegister,
    PublishRegisterAck,
    Publish,
    Notify,
    Deregister,
    DeregisterAck,
    PublishDeregister,
    PublishDeregisterAck,
}

impl InteractionStage {
    pub fn interaction_type(self) -> InteractionType {
        use InteractionStage::*;
        match self {
            Send => InteractionType::Send,
            Submit | SubmitAck => InteractionType::Submit,
            Request | RequestResponse => InteractionType::Request,
            Invoke | InvokeAck | InvokeResponse => InteractionType::Invoke,
            Progress | ProgressAck | ProgressUpdate | ProgressResponse => {
                InteractionType::Progress
            }
            Register | RegisterAck | PublishRegister | PublishRegisterAck | Publish | Notify
            | Deregister | DeregisterAck | PublishDeregister | PublishDeregisterAck => {
                InteractionType::PubSub
            }
        }
    }

    /// Pattern-relative stage number. SEND carries no stage on the wire and maps to 0.
    pub fn number(self) -> u8 {
        use InteractionStage::*;
        match self {
            Send => 0,
            Submit | Request | Invoke | Progress | Register => 1,
            SubmitAck | RequestResponse | InvokeAck | ProgressAck | RegisterAck => 2,
            InvokeResponse | ProgressUpdate | PublishRegister => 3,
            ProgressResponse | PublishRegisterAck => 4,
            Publish => 5,
            Notify => 6,
            Deregister => 7,
            DeregisterAck => 8,
            PublishDeregister => 9,
            PublishDeregisterAck => 10,
        }
    }

    pub fn from_number(interaction_type: InteractionType, number: u8) -> Option<Self> {
        use InteractionStage::*;
        let stage = match (interaction_type, number) {
            (InteractionType::Send, 0) => Send,
            (InteractionType::Submit, 1) => Submit,
            (InteractionType::Submit, 2) => SubmitAck,
            (InteractionType::Request, 1) => Request,
            (InteractionType::Request, 2) => RequestResponse,
            (InteractionType::Invoke, 1) => Invoke,
            (InteractionType::Invoke, 2) => InvokeAck,
            (InteractionType::Invoke, 3) => InvokeResponse,
            (InteractionType::Progress, 1) => Progress,
            (InteractionType::Progress, 2) => ProgressAck,
            (InteractionType::Progress, 3) => ProgressUpdate,
            (InteractionType::Progress, 4) => ProgressResponse,
            (InteractionType::PubSub, 1) => Register,
            (InteractionType::PubSub, 2) => RegisterAck,
            (InteractionType::PubSub, 3) => PublishRegister,
            (InteractionType::PubSub, 4) => PublishRegisterAck,
            (InteractionType::PubSub, 5) => Publish,
            (InteractionType::PubSub, 6) => Notify,
            (InteractionType::PubSub, 7) => Deregister,
            (InteractionType::PubSub, 8) => DeregisterAck,
            (InteractionType::PubSub, 9) => PublishDeregister,
            (InteractionType::PubSub, 10) => PublishDeregisterAck,
            _ => return None,
        };
        Some(stage)
    }

    pub fn is_valid_for(self, interaction_type: InteractionType) -> bool {
        self.interaction_type() == interaction_type
    }

    /// Stages that open a transaction on the receiving side.
    pub fn is_initiating(self) -> bool {
        use InteractionStage::*;
        matches!(
            self,
            Send | Submit
                | Request
                | Invoke
                | Progress
                | Register
                | PublishRegister
                | Publish
                | Deregister
                | PublishDeregister
        )
    }
}

impl Display for InteractionStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Stage the peer is expected to answer with after `current`.
///
/// Returns `None` for terminal stages, for PUBLISH (no ack to the publisher) and for
/// stages that do not belong to `interaction_type`. For PROGRESS the repeating
/// `ProgressUpdate` is reported; a `ProgressResponse` may also close the sequence,
/// see [`accepts_transition`].
pub fn expected_next_stage(
    interaction_type: InteractionType,
    current: InteractionStage,
) -> Option<InteractionStage> {
    use InteractionStage::*;
    match (interaction_type, current) {
        (InteractionType::Send, Send) => None,
        (InteractionType::Submit, Submit) => Some(SubmitAck),
        (InteractionType::Submit, SubmitAck) => None,
        (InteractionType::Request, Request) => Some(RequestResponse),
        (InteractionType::Request, RequestResponse) => None,
        (InteractionType::Invoke, Invoke) => Some(InvokeAck),
        (InteractionType::Invoke, InvokeAck) => Some(InvokeResponse),
        (InteractionType::Invoke, InvokeResponse) => None,
        (InteractionType::Progress, Progress) => Some(ProgressAck),
        (InteractionType::Progress, ProgressAck) => Some(ProgressUpdate),
        (InteractionType::Progress, ProgressUpdate) => Some(ProgressUpdate),
        (InteractionType::Progress, ProgressResponse) => None,
        (InteractionType::PubSub, Register) => Some(RegisterAck),
        (InteractionType::PubSub, PublishRegister) => Some(PublishRegisterAck),
        (InteractionType::PubSub, Deregister) => Some(DeregisterAck),
        (InteractionType::PubSub, PublishDeregister) => Some(PublishDeregisterAck),
        (InteractionType::PubSub, Publish | Notify) => None,
        (InteractionType::PubSub, RegisterAck)
        | (InteractionType::PubSub, PublishRegisterAck)
        | (InteractionType::PubSub, DeregisterAck)
        | (InteractionType::PubSub, PublishDeregisterAck) => None,
        _ => None,
    }
}

/// Whether `incoming` is a legal successor of `last_seen` within `interaction_type`.
pub fn accepts_transition(
    interaction_type: InteractionType,
    last_seen: InteractionStage,
    incoming: InteractionStage,
) -> bool {
    if !incoming.is_valid_for(interaction_type) || !last_seen.is_valid_for(interaction_type) {
        return false;
    }

    if interaction_type == InteractionType::Progress
        && matches!(
            last_seen,
            InteractionStage::ProgressAck | InteractionStage::ProgressUpdate
        )
        && incoming == InteractionStage::ProgressResponse
    {
        return true;
    }

    expected_next_stage(interaction_type, last_seen) == Some(incoming)
}

/// Stage an error must be sent on when the provider fails before any reply.
pub fn first_reply_stage(initiating: InteractionStage) -> Option<InteractionStage> {
    expected_next_stage(initiating.interaction_type(), initiating)
}

#[cfg(test)]
mod tests {
    use super::{
        accepts_transition, expected_next_stage, first_reply_stage, InteractionStage,
        InteractionType,
    };
    use InteractionStage::*;

    #[test]
    fn ack_only_patterns_have_single_reply_stage() {
        assert_eq!(
            expected_next_stage(InteractionType::Submit, Submit),
            Some(SubmitAck)
        );
        assert_eq!(expected_next_stage(InteractionType::Submit, SubmitAck), None);
        assert_eq!(
            expected_next_stage(InteractionType::Request, Request),
            Some(RequestResponse)
        );
        assert_eq!(expected_next_stage(InteractionType::Send, Send), None);
    }

    #[test]
    fn invoke_and_progress_walk_their_stage_chains() {
        assert_eq!(
            expected_next_stage(InteractionType::Invoke, Invoke),
            Some(InvokeAck)
        );
        assert_eq!(
            expected_next_stage(InteractionType::Invoke, InvokeAck),
            Some(InvokeResponse)
        );
        assert_eq!(
            expected_next_stage(InteractionType::Invoke, InvokeResponse),
            None
        );
        assert_eq!(
            expected_next_stage(InteractionType::Progress, ProgressAck),
            Some(ProgressUpdate)
        );
        assert_eq!(
            expected_next_stage(InteractionType::Progress, ProgressUpdate),
            Some(ProgressUpdate)
        );
    }

    #[test]
    fn pubsub_publish_has_no_ack() {
        assert_eq!(
            expected_next_stage(InteractionType::PubSub, Register),
            Some(RegisterAck)
        );
        assert_eq!(
            expected_next_stage(InteractionType::PubSub, PublishRegister),
            Some(PublishRegisterAck)
        );
        assert_eq!(expected_next_stage(InteractionType::PubSub, Publish), None);
        assert_eq!(
            expected_next_stage(InteractionType::PubSub, Deregister),
            Some(DeregisterAck)
        );
    }

    #[test]
    fn stages_of_other_patterns_have_no_successor() {
        assert_eq!(expected_next_stage(InteractionType::Submit, Invoke), None);
        assert_eq!(expected_next_stage(InteractionType::PubSub, SubmitAck), None);
    }

    #[test]
    fn progress_accepts_response_after_ack_or_updates() {
        let ty = InteractionType::Progress;
        assert!(accepts_transition(ty, Progress, ProgressAck));
        assert!(accepts_transition(ty, ProgressAck, ProgressUpdate));
        assert!(accepts_transition(ty, ProgressUpdate, ProgressUpdate));
        assert!(accepts_transition(ty, ProgressAck, ProgressResponse));
        assert!(accepts_transition(ty, ProgressUpdate, ProgressResponse));
        assert!(!accepts_transition(ty, Progress, ProgressUpdate));
        assert!(!accepts_transition(ty, Progress, ProgressResponse));
        assert!(!accepts_transition(ty, ProgressResponse, ProgressUpdate));
    }

    #[test]
    fn cross_pattern_transitions_are_rejected() {
        assert!(!accepts_transition(InteractionType::Submit, Submit, InvokeAck));
        assert!(!accepts_transition(InteractionType::Invoke, Invoke, InvokeResponse));
    }

    #[test]
    fn stage_numbers_round_trip_per_pattern() {
        for stage in [
            Submit,
            SubmitAck,
            InvokeResponse,
            ProgressUpdate,
            PublishRegisterAck,
            Notify,
            PublishDeregisterAck,
        ] {
            assert_eq!(
                InteractionStage::from_number(stage.interaction_type(), stage.number()),
                Some(stage)
            );
        }
        assert_eq!(InteractionStage::from_number(InteractionType::Submit, 3), None);
    }

    #[test]
    fn first_reply_stage_is_ack_or_response() {
        assert_eq!(first_reply_stage(Invoke), Some(InvokeAck));
        assert_eq!(first_reply_stage(Request), Some(RequestResponse));
        assert_eq!(first_reply_stage(Send), None);
        assert_eq!(first_reply_stage(Publish), None);
    }
}
