//! Command handlers for the civic CLI.

pub mod ask;
pub mod documents;
pub mod serve;

pub use ask::AskCommand;
pub use documents::DocumentsCommand;
pub use serve::ServeCommand;
