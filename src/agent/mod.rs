pub mod conversation;
pub mod gateway;
pub mod logging;
pub mod orchestrator;
pub mod protocol;
pub mod repl;
pub mod system_prompt;

pub use conversation::{ConversationTurn, Role};
pub use gateway::{ModelGateway, OllamaGateway};
pub use orchestrator::{Orchestrator, ResolvedWrite, RoundOutcome, TurnState};
pub use protocol::{parse_response, FileWriteRequest, Intent};
