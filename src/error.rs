use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Hostnames with nothing in front of the domain, e.g. `example.com`.
    /// Holds the offending domains.
    #[error("the following hostnames contain no subdomain: {}", .0.join(", "))]
    InvalidHostnames(Vec<String>),

    /// Requested `subdomain.domain` names with no record at the provider.
    #[error("the following DNS records do not exist: {}", .0.join(", "))]
    MissingRecords(Vec<String>),

    /// Non-2xx answer from the DNS provider.
    #[error("GleSYS POST request to {path} failed with status code {status}")]
    Provider { path: String, status: u16 },

    /// The request never got an answer, or the answer could not be decoded.
    #[error("GleSYS request to {path} failed: {message}")]
    Transport { path: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn transport(path: impl Into<String>, message: impl ToString) -> Self {
        Self::Transport {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Errors caused by what the user asked for rather than by the environment.
    pub fn is_usage(&self) -> bool {
        match self {
            Self::InvalidHostnames(_)
            | Self::MissingRecords(_)
            | Self::Provider { .. }
            | Self::Config(_) => true,
            Self::Transport { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_list_every_item() {
        let err = Error::InvalidHostnames(vec!["example.org".into(), "example.net".into()]);
        assert_eq!(
            err.to_string(),
            "the following hostnames contain no subdomain: example.org, example.net"
        );

        let err = Error::Provider {
            path: "domain/updaterecord".into(),
            status: 401,
        };
        assert_eq!(
            err.to_string(),
            "GleSYS POST request to domain/updaterecord failed with status code 401"
        );
    }

    #[test]
    fn test_usage_classification() {
        assert!(Error::InvalidHostnames(vec![]).is_usage());
        assert!(Error::MissingRecords(vec![]).is_usage());
        assert!(Error::Provider {
            path: "domain/listrecords".into(),
            status: 500,
        }
        .is_usage());
        assert!(Error::config("missing key").is_usage());
        assert!(!Error::transport("domain/listrecords", "connection refused").is_usage());
    }
}
