// Event types for async communication

use uuid::Uuid;

use crate::models::ReplyResult;

#[derive(Debug, Clone)]
pub enum AppEvent {
    /// One category's reply arrived for the given session
    ReplyReady { session: Uuid, result: ReplyResult },
    /// A call failed; the session stops here
    GenerationFailed { session: Uuid, error: String },
    /// The session's stream ended (after success or failure)
    GenerationFinished { session: Uuid },
    /// The "Copied!" window for a card elapsed
    CopiedExpired { index: usize, generation: u64 },
}
