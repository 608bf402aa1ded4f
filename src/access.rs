use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One row of the settings document's user roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessEntry {
    pub email: String,
    pub masked: bool,
}

/// The masked-view roster, read from the settings document and passed down
/// explicitly to whatever needs it. Emails are compared case-insensitively;
/// an email not on the roster resolves to full visibility.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessList {
    pub entries: Vec<AccessEntry>,
}

impl AccessList {
    /// Parses the settings document payload. Two shapes are accepted: the
    /// current `{"users": [{"email", "masked"}]}` and the legacy plain
    /// email list, where every listed email implies masked = true.
    pub fn from_settings(value: &Value) -> Self {
        let Some(users) = value.get("users").and_then(Value::as_array) else {
            return AccessList::default();
        };
        let entries = users
            .iter()
            .filter_map(|entry| match entry {
                Value::String(email) if !email.trim().is_empty() => Some(AccessEntry {
                    email: email.trim().to_lowercase(),
                    masked: true,
                }),
                Value::Object(_) => {
                    let email = entry.get("email")?.as_str()?.trim().to_lowercase();
                    if email.is_empty() {
                        return None;
                    }
                    let masked = entry.get("masked").and_then(Value::as_bool).unwrap_or(true);
                    Some(AccessEntry { email, masked })
                }
                _ => None,
            })
            .collect();
        AccessList { entries }
    }

    /// Always writes the current representation, migrating legacy lists on
    /// the first save.
    pub fn to_settings(&self) -> Value {
        serde_json::json!({ "users": &self.entries })
    }

    pub fn find(&self, email: &str) -> Option<&AccessEntry> {
        let needle = email.trim().to_lowercase();
        self.entries.iter().find(|e| e.email == needle)
    }

    /// Whether this user's view must mask phone/email values. Unlisted
    /// users see full data; the roster is admin-curated and this tool is
    /// not a security boundary.
    pub fn should_mask(&self, email: &str) -> bool {
        self.find(email).map(|e| e.masked).unwrap_or(false)
    }

    pub fn add(&mut self, email: &str, masked: bool) -> Result<()> {
        let email = email.trim().to_lowercase();
        if !email.contains('@') {
            bail!("'{email}' is not a valid email address");
        }
        if self.find(&email).is_some() {
            bail!("{email} is already in the access list");
        }
        self.entries.push(AccessEntry { email, masked });
        Ok(())
    }

    pub fn remove(&mut self, email: &str) -> Result<()> {
        let needle = email.trim().to_lowercase();
        let before = self.entries.len();
        self.entries.retain(|e| e.email != needle);
        if self.entries.len() == before {
            bail!("{needle} is not in the access list");
        }
        Ok(())
    }

    pub fn set_masked(&mut self, email: &str, masked: bool) -> Result<()> {
        let needle = email.trim().to_lowercase();
        match self.entries.iter_mut().find(|e| e.email == needle) {
            Some(entry) => {
                entry.masked = masked;
                Ok(())
            }
            None => bail!("{needle} is not in the access list"),
        }
    }
}
