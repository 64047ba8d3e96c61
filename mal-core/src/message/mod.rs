//! Message model shared by every layer: header identity, interaction stages, bodies,
//! and status codes.

pub(crate) mod body;
pub(crate) mod header;
pub(crate) mod interaction;
pub(crate) mod status;

pub use body::{
    AttributeValue, MessageBody, NamedValue, NotifiedUpdate, NotifiedUpdateHeader, NotifyBody,
    PublishBody, Subscription, SubscriptionFilter, Update, UpdateHeader,
};
pub use header::{MalMessage, MessageHeader, OperationId, OperationKey, QosProperties, Uri};
pub use interaction::{
    accepts_transition, expected_next_stage, first_reply_stage, InteractionStage,
    InteractionType,
};
pub use status::{MalErrorCode, MalStatus};
