//! Command handlers for the pillar CLI.
//!
//! Each function here implements one subcommand. The HTTP server calls the same functions, so a
//! command is the unit of behavior that both interfaces share.

mod create;
mod delete;
mod edit;
mod init;
mod query;
mod serve;
mod settle;
mod suggestions;

use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use create::create;
pub use delete::delete;
pub use edit::edit;
pub use init::init;
pub use query::{digest, list, report, summary};
pub use serve::serve;
pub use settle::{reverse, settle};
pub use suggestions::{suggestions, Suggestions};

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data to both the command line and HTTP interfaces.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Consumes the output, keeping only the structured data.
    pub fn into_structure(self) -> Option<T> {
        self.structure
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

fn plural(count: u64, one: &str, many: &str) -> String {
    format!("{count} {}", if count == 1 { one } else { many })
}
