use std::{fmt, path::PathBuf};

use rand::{thread_rng, Rng};
use tracing::{debug, instrument, Level};

use crate::error::{Error, Result};

/// Credential options as given by the operator.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialArgs {
    pub password: Option<String>,
    pub password_file: Option<PathBuf>,
}

impl CredentialArgs {
    /// Fails if both the password and the password file are set.
    ///
    /// Empty values count as unset.
    pub fn validate(self) -> Result<CredentialSource> {
        let Self {
            password,
            password_file,
        } = self;

        let password = password.filter(|password| !password.is_empty());
        let password_file = password_file.filter(|path| !path.as_os_str().is_empty());

        match (password, password_file) {
            (Some(_), Some(_)) => Err(Error::Configuration),
            (Some(password), None) => Ok(CredentialSource::Explicit(password)),
            (None, Some(path)) => Ok(CredentialSource::File(path)),
            (None, None) => Ok(CredentialSource::Generated),
        }
    }
}

impl fmt::Debug for CredentialArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialArgs")
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("password_file", &self.password_file)
            .finish()
    }
}

/// Where the admin credential comes from.
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    Explicit(String),
    File(PathBuf),
    Generated,
}

impl CredentialSource {
    #[instrument(level = Level::INFO, skip_all, err(Display))]
    pub async fn resolve(self) -> Result<Credential> {
        match self {
            Self::Explicit(password) => Ok(Credential {
                password,
                must_change_password: false,
            }),
            Self::File(path) => {
                debug!("reading the password from {path:?}");
                let content = match ::tokio::fs::read(&path).await {
                    Ok(content) => content,
                    Err(source) => return Err(Error::PasswordFile { path, source }),
                };
                let content = match String::from_utf8(content) {
                    Ok(content) => content,
                    Err(source) => return Err(Error::PasswordEncoding { path, source }),
                };

                Ok(Credential {
                    password: content
                        .strip_suffix('\n')
                        .map(Into::into)
                        .unwrap_or(content),
                    must_change_password: false,
                })
            }
            Self::Generated => Ok(Credential {
                password: generate_token(),
                must_change_password: true,
            }),
        }
    }
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(_) => f.write_str("Explicit(<redacted>)"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Generated => f.write_str("Generated"),
        }
    }
}

/// A plain-text admin credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    password: String,
    must_change_password: bool,
}

impl Credential {
    pub fn password(&self) -> &str {
        &self.password
    }

    /// `true` only for a generated credential nobody has seen yet.
    pub fn must_change_password(&self) -> bool {
        self.must_change_password
    }

    pub fn hash(&self) -> Result<String> {
        hash_password(&self.password)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("password", &"<redacted>")
            .field("must_change_password", &self.must_change_password)
            .finish()
    }
}

const TOKEN_CHARACTERS: &[u8] = b"bcdfghjklmnpqrstvwxz2456789";
const TOKEN_LENGTH: usize = 54;

pub fn generate_token() -> String {
    let mut rng = thread_rng();
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_CHARACTERS[rng.gen_range(0..TOKEN_CHARACTERS.len())] as char)
        .collect()
}

/// Work factor of the account hashes, as expected by the platform.
pub const HASH_COST: u32 = 10;

/// Hashes a password into a bcrypt string (`$2b$`, random salt).
pub fn hash_password(password: &str) -> Result<String> {
    ::bcrypt::hash(password, HASH_COST).map_err(Into::into)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    ::bcrypt::verify(password, hash).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_sources() {
        let args = CredentialArgs {
            password: Some("hunter2".into()),
            password_file: Some("/run/secrets/admin".into()),
        };
        assert!(matches!(args.validate(), Err(Error::Configuration)));

        let args = CredentialArgs {
            password: Some("hunter2".into()),
            password_file: None,
        };
        assert_eq!(
            args.validate().unwrap(),
            CredentialSource::Explicit("hunter2".into()),
        );

        let args = CredentialArgs {
            password: Some(String::new()),
            password_file: Some("/run/secrets/admin".into()),
        };
        assert_eq!(
            args.validate().unwrap(),
            CredentialSource::File("/run/secrets/admin".into()),
        );

        assert_eq!(
            CredentialArgs::default().validate().unwrap(),
            CredentialSource::Generated,
        );
    }

    #[test]
    fn generated_token_alphabet() {
        let token = generate_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.bytes().all(|c| TOKEN_CHARACTERS.contains(&c)));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn hash_and_verify() {
        let hash = hash_password("hunter2").unwrap();
        assert!(hash.starts_with("$2b$10$"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not a hash"));

        // salted
        assert_ne!(hash, hash_password("hunter2").unwrap());
    }

    #[tokio::test]
    async fn resolve_password_file() {
        let path = ::std::env::temp_dir().join(format!(
            "rancherd-credential-{pid}-utf8",
            pid = ::std::process::id(),
        ));

        // only one trailing newline is stripped
        ::tokio::fs::write(&path, "s3cr3t\n\n").await.unwrap();
        let credential = CredentialSource::File(path.clone()).resolve().await;

        // a file that is not UTF-8
        ::tokio::fs::write(&path, b"s3cr3t\xff\n").await.unwrap();
        let error = CredentialSource::File(path.clone()).resolve().await;
        ::tokio::fs::remove_file(&path).await.unwrap();

        let credential = credential.unwrap();
        assert_eq!(credential.password(), "s3cr3t\n");
        assert!(!credential.must_change_password());

        match error {
            Err(Error::PasswordEncoding { path: found, .. }) => assert_eq!(found, path),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn redact_debug() {
        let credential = Credential {
            password: "hunter2".into(),
            must_change_password: false,
        };
        assert!(!format!("{credential:?}").contains("hunter2"));

        let source = CredentialSource::Explicit("hunter2".into());
        assert!(!format!("{source:?}").contains("hunter2"));
    }
}
