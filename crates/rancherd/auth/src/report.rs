use std::fmt;

use tracing::info;

/// What the operator is told once the admin is in place.
#[derive(Clone, PartialEq, Eq)]
pub enum BootstrapReport {
    /// The password of the existing admin has been replaced.
    Reset { username: String, password: String },
    /// The admin has been created and wired up.
    Created {
        username: String,
        password: String,
        server_url: String,
    },
}

impl BootstrapReport {
    pub fn username(&self) -> &str {
        match self {
            Self::Reset { username, .. } | Self::Created { username, .. } => username,
        }
    }

    pub fn password(&self) -> &str {
        match self {
            Self::Reset { password, .. } | Self::Created { password, .. } => password,
        }
    }

    pub fn server_url(&self) -> Option<&str> {
        match self {
            Self::Reset { .. } => None,
            Self::Created { server_url, .. } => Some(server_url),
        }
    }

    pub fn emit(&self) {
        match self {
            Self::Reset { username, password } => {
                info!("Default admin reset. New username: {username}, new Password: {password}")
            }
            Self::Created {
                username,
                password,
                server_url,
            } => {
                info!("Server URL: {server_url}");
                info!("Default admin and password created. Username: {username}, Password: {password}");
            }
        }
    }
}

impl fmt::Debug for BootstrapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset { username, .. } => f
                .debug_struct("Reset")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Created {
                username,
                server_url,
                ..
            } => f
                .debug_struct("Created")
                .field("username", username)
                .field("server_url", server_url)
                .finish_non_exhaustive(),
        }
    }
}
