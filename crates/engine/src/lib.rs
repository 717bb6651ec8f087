//! Conversation state machine and alert evaluation.

pub mod conversation;
pub mod sink;
pub mod supervisor;

pub use conversation::{ConversationEngine, EngineError, EngineReply};
pub use sink::{NotificationSink, SinkError};
pub use supervisor::{format_usd, AlertSupervisor, SupervisorError};
