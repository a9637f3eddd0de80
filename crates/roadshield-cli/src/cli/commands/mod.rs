//! CLI command handlers. Each command is in its own file.

mod completions;
mod networks;
mod replay;
mod resolve;
mod url;

pub use completions::run_completions;
pub use networks::run_networks;
pub use replay::run_replay;
pub use resolve::run_resolve;
pub use url::run_url;
