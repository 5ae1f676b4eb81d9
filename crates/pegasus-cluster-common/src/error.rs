//! Error types for cluster lifecycle operations

use thiserror::Error;

/// Main error type for pegasus-cluster operations
///
/// A soft poll timeout is deliberately absent: the poller reports it as
/// `Ok(false)` and each caller decides whether it is fatal.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Request rejected before any cluster-mutating action was taken
    #[error("validation error: {0}")]
    Validation(String),

    /// A node name is absent from the run's registry
    #[error("{role} node '{name}' not found")]
    NodeNotFound {
        /// Role the lookup was restricted to
        role: String,
        /// Requested node name
        name: String,
    },

    /// The admin command executor could not run a command to completion
    #[error("command `{command}` failed: {message}")]
    CommandExecution {
        /// Request string that was issued
        command: String,
        /// Spawn, timeout, or exit-status detail
        message: String,
    },

    /// A configuration command ran but its acknowledgement was missing
    #[error("command `{command}` was not acknowledged with `{expected}`. Output:\n{output}")]
    CommandRejected {
        /// Request string that was issued
        command: String,
        /// Marker expected exactly once in the output
        expected: String,
        /// Raw response
        output: String,
    },

    /// An admin response lacked an expected field
    #[error("failed to parse {what}. Output:\n{output}")]
    Parse {
        /// What was being extracted
        what: String,
        /// Raw response, kept for operator diagnosis
        output: String,
    },

    /// A bounded wait that the caller treats as fatal ran out of attempts
    #[error("timed out waiting for {0}")]
    ConvergenceTimeout(String),

    /// Opaque failure reported by the deployment backend
    #[error("deployment error: {0}")]
    Backend(String),

    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a validation error with the given message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error for a node lookup
    pub fn node_not_found(role: impl Into<String>, name: impl Into<String>) -> Self {
        Self::NodeNotFound {
            role: role.into(),
            name: name.into(),
        }
    }

    /// Create a command execution error
    pub fn command_execution(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandExecution {
            command: command.into(),
            message: message.into(),
        }
    }

    /// Create a parse error carrying the raw output
    pub fn parse(what: impl Into<String>, output: impl Into<String>) -> Self {
        Self::Parse {
            what: what.into(),
            output: output.into(),
        }
    }

    /// Create a deployment backend error with the given message
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error was raised before touching the cluster
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::NodeNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_keeps_raw_output() {
        let err = Error::parse("cluster info", "primary_meta_server : 10.0.0.1:34601\n");
        let msg = err.to_string();
        assert!(msg.starts_with("failed to parse cluster info"));
        assert!(msg.contains("10.0.0.1:34601"));
    }

    #[test]
    fn node_not_found_names_role_and_node() {
        let err = Error::node_not_found("replica", "r9");
        assert_eq!(err.to_string(), "replica node 'r9' not found");
    }

    #[test]
    fn rejected_command_shows_expected_marker() {
        let err = Error::CommandRejected {
            command: "remote_command -l 10.0.0.1:34601 meta.live_percentage 0".to_string(),
            expected: "OK".to_string(),
            output: "unknown command".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("meta.live_percentage"));
        assert!(msg.contains("`OK`"));
        assert!(msg.contains("unknown command"));
    }

    #[test]
    fn precondition_errors_are_categorized() {
        assert!(Error::validation("duplicate node 'a'").is_precondition());
        assert!(Error::node_not_found("replica", "a").is_precondition());
        assert!(!Error::backend("ssh: connection refused").is_precondition());
        assert!(!Error::parse("nodes", "").is_precondition());
    }
}
