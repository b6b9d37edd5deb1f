//! The Amana conversational pipeline: classify an inbound WhatsApp message,
//! route business tasks to the invoice engine or an external action handler,
//! generate a persona-consistent reply, and persist conversation memory.
//!
//! Model unavailability never fails a turn: classification falls back to a
//! deterministic keyword matcher and reply generation to a fixed pool.
mod assistant_classifier;
mod assistant_responder;
mod assistant_router;
mod assistant_runtime;

pub use assistant_classifier::{
    fallback_classify, Classification, Classifier, ConversationKind, CLASSIFIER_HISTORY_TURNS,
};
pub use assistant_responder::{
    CounterSelector, FallbackSelector, FixedSelector, Responder, FALLBACK_REPLIES,
    RESPONDER_HISTORY_TURNS,
};
pub use assistant_router::{parse_amount, route_task, TaskAction};
pub use assistant_runtime::{
    Assistant, AssistantReply, BusinessActionHandler, ExternalActionReply, InboundMessage,
};
