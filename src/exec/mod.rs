pub mod git;
pub mod script;
pub mod shell;
pub mod terminal;

pub use git::GitRunner;
pub use script::{is_executable, is_interactive, ScriptSandbox};
pub use shell::{run_captured, ExecutionResult};
