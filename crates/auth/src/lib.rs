use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;

/// Credential material attached to every request made through one client.
#[derive(Clone, PartialEq, Eq, Default)]
pub enum Credential {
    /// HTTP basic auth with a username (or email) and a password or API token.
    Basic { username: String, secret: String },
    /// `Authorization: Bearer <token>` (personal access tokens, OAuth, admin API keys).
    Bearer { token: String },
    /// A pre-authenticated session, sent verbatim as the `Cookie` header.
    Session { cookie: String },
    /// No authentication.
    #[default]
    Anonymous,
}

impl Credential {
    pub fn basic(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Credential::Basic {
            username: username.into(),
            secret: secret.into(),
        }
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Credential::Bearer {
            token: token.into(),
        }
    }

    pub fn session(cookie: impl Into<String>) -> Self {
        Credential::Session {
            cookie: cookie.into(),
        }
    }

    /// Header name and value to attach, or `None` for anonymous access.
    pub fn header(&self) -> Option<(&'static str, String)> {
        match self {
            Credential::Basic { username, secret } => {
                let encoded = BASE64.encode(format!("{username}:{secret}").as_bytes());
                Some(("Authorization", format!("Basic {encoded}")))
            }
            Credential::Bearer { token } => Some(("Authorization", format!("Bearer {token}"))),
            Credential::Session { cookie } => Some(("Cookie", cookie.clone())),
            Credential::Anonymous => None,
        }
    }

    /// Loggable form that never includes secret material.
    pub fn redacted(&self) -> String {
        match self {
            Credential::Basic { username, .. } => format!("basic {username}:****"),
            Credential::Bearer { .. } => "bearer ****".to_string(),
            Credential::Session { .. } => "session ****".to_string(),
            Credential::Anonymous => "anonymous".to_string(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Helper to construct a key for profile secrets.
pub fn token_key(profile: &str) -> String {
    profile.to_string()
}

/// Secrets kept in a JSON map file, written with 600 permissions on unix.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store under `~/.{app}/credentials`.
    pub fn new(app: &str) -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        Self {
            path: home.join(format!(".{app}")).join("credentials"),
        }
    }

    /// Store backed by an explicit file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn set(&self, account: &str, secret: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Unable to create credentials directory {}", parent.display())
            })?;
        }

        let mut creds = self.read_all().unwrap_or_default();
        creds.insert(account.to_string(), secret.to_string());
        self.write_all(&creds)?;

        debug!(account, "Stored secret");
        Ok(())
    }

    pub fn get(&self, account: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let creds = self.read_all()?;
        Ok(creds.get(account).cloned())
    }

    pub fn delete(&self, account: &str) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let mut creds = self.read_all().unwrap_or_default();
        if creds.remove(account).is_some() {
            debug!(account, "Removed secret");
        }
        self.write_all(&creds)
    }

    fn read_all(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Unable to read credentials file {}", self.path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Malformed credentials file {}", self.path.display()))
    }

    fn write_all(&self, creds: &HashMap<String, String>) -> Result<()> {
        #[cfg(unix)]
        {
            use std::io::Write;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)?;
            let json = serde_json::to_string_pretty(creds)?;
            file.write_all(json.as_bytes())?;
        }

        #[cfg(not(unix))]
        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&self.path)?;
            serde_json::to_writer_pretty(file, creds)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_basic_header_is_base64_pair() {
        let cred = Credential::basic("jdoe@example.com", "token");
        let (name, value) = cred.header().unwrap();
        assert_eq!(name, "Authorization");
        assert_eq!(value, "Basic amRvZUBleGFtcGxlLmNvbTp0b2tlbg==");
    }

    #[test]
    fn test_bearer_and_session_headers() {
        assert_eq!(
            Credential::bearer("abc").header(),
            Some(("Authorization", "Bearer abc".to_string()))
        );
        assert_eq!(
            Credential::session("JSESSIONID=42").header(),
            Some(("Cookie", "JSESSIONID=42".to_string()))
        );
        assert!(Credential::Anonymous.header().is_none());
    }

    #[test]
    fn test_redacted_hides_secrets() {
        let cred = Credential::basic("admin", "hunter2");
        assert_eq!(cred.redacted(), "basic admin:****");
        assert!(!format!("{cred:?}").contains("hunter2"));
        assert!(!Credential::bearer("s3cret").redacted().contains("s3cret"));
    }

    #[test]
    fn test_store_set_get_delete() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::at(dir.path().join("nested").join("credentials"));

        assert_eq!(store.get("work").unwrap(), None);

        store.set("work", "token-1").unwrap();
        store.set("home", "token-2").unwrap();
        assert_eq!(store.get("work").unwrap(), Some("token-1".to_string()));
        assert_eq!(store.get("home").unwrap(), Some("token-2".to_string()));

        store.delete("work").unwrap();
        assert_eq!(store.get("work").unwrap(), None);
        assert_eq!(store.get("home").unwrap(), Some("token-2".to_string()));
    }

    #[cfg(unix)]
    #[test]
    fn test_store_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = CredentialStore::at(dir.path().join("credentials"));
        store.set("work", "token").unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_delete_missing_file_is_noop() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::at(dir.path().join("credentials"));
        assert!(store.delete("nobody").is_ok());
    }
}
