// Value records shared across the archiver: client descriptors, archive
// results, and the per-run summary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Scopes as they appear on the wire: either a single string or a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scopes {
    One(String),
    Many(Vec<String>),
}

impl Default for Scopes {
    fn default() -> Self {
        Scopes::Many(Vec::new())
    }
}

impl Scopes {
    pub fn contains(&self, scope: &str) -> bool {
        match self {
            Scopes::One(s) => s == scope,
            Scopes::Many(list) => list.iter().any(|s| s == scope),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Scopes::One(s) => s.is_empty(),
            Scopes::Many(list) => list.is_empty(),
        }
    }
}

impl From<&str> for Scopes {
    fn from(s: &str) -> Self {
        Scopes::One(s.to_string())
    }
}

/// A client eligible for trigger archival, as produced by any client source.
///
/// Database rows populate only `client_id` and `name`; the remaining fields
/// come from the HTTP and static sources, which may carry per-client OAuth
/// credentials and a trigger endpoint override.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Defaults to empty when the descriptor omits it; id-less clients are
    /// skipped downstream rather than failing the whole list.
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "scope")]
    pub scopes: Scopes,
    #[serde(default)]
    pub oauth_client_id: Option<String>,
    #[serde(default)]
    pub oauth_client_secret: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
    #[serde(default)]
    pub trigger_url: Option<String>,
}

impl ClientRecord {
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.contains(scope)
    }

    /// Per-client OAuth credentials, when the descriptor carries a complete
    /// set (id, secret, token URL).
    pub fn own_credentials(&self) -> Option<(&str, &str, &str)> {
        match (
            self.oauth_client_id.as_deref(),
            self.oauth_client_secret.as_deref(),
            self.token_url.as_deref(),
        ) {
            (Some(id), Some(secret), Some(url)) => Some((id, secret, url)),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }
}

/// A successfully archived object: which client, and where it landed.
#[derive(Debug, Clone, Serialize)]
pub struct ArchivedObject {
    pub client_id: String,
    pub path: String,
}

/// A per-client failure recorded in the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct ArchiveFailure {
    pub client_id: String,
    pub client_name: Option<String>,
    pub error: String,
}

/// Outcome of one batch run.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub trigger_date: String,
    pub total_clients: usize,
    pub successful_archives: usize,
    pub failed_archives: usize,
    pub skipped_clients: usize,
    pub archived: Vec<ArchivedObject>,
    pub errors: Vec<ArchiveFailure>,
}

impl RunSummary {
    pub fn new(trigger_date: NaiveDate) -> Self {
        Self {
            trigger_date: trigger_date.format("%Y-%m-%d").to_string(),
            ..Default::default()
        }
    }

    pub fn record_success(&mut self, client_id: &str, path: String) {
        self.successful_archives += 1;
        self.archived.push(ArchivedObject {
            client_id: client_id.to_string(),
            path,
        });
    }

    pub fn record_failure(&mut self, client: &ClientRecord, error: String) {
        self.failed_archives += 1;
        self.errors.push(ArchiveFailure {
            client_id: client.client_id.clone(),
            client_name: client.name.clone(),
            error,
        });
    }

    /// Write the summary as `last_run_summary.json` under `dir`.
    pub fn write_to(&self, dir: &std::path::Path) -> crate::types::AppResult<std::path::PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join("last_run_summary.json");
        let data = serde_json::to_vec_pretty(self)?;
        std::fs::write(&path, data)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scopes_deserialize_from_string_or_list() {
        let one: Scopes = serde_json::from_str("\"dex/trigger:all\"").unwrap();
        assert!(one.contains("dex/trigger:all"));

        let many: Scopes = serde_json::from_str("[\"a\", \"dex/trigger:all\"]").unwrap();
        assert!(many.contains("dex/trigger:all"));
        assert!(!many.contains("b"));
    }

    #[test]
    fn client_record_accepts_scope_alias() {
        let client: ClientRecord = serde_json::from_str(
            r#"{"client_id": "42", "name": "Acme", "scope": "dex/trigger:all"}"#,
        )
        .unwrap();
        assert!(client.has_scope("dex/trigger:all"));
        assert_eq!(client.display_name(), "Acme");
    }

    #[test]
    fn own_credentials_requires_complete_set() {
        let mut client: ClientRecord =
            serde_json::from_str(r#"{"client_id": "42"}"#).unwrap();
        assert!(client.own_credentials().is_none());

        client.oauth_client_id = Some("abc".into());
        client.oauth_client_secret = Some("secret".into());
        assert!(client.own_credentials().is_none());

        client.token_url = Some("https://auth.example.com/token".into());
        let (id, secret, url) = client.own_credentials().unwrap();
        assert_eq!(id, "abc");
        assert_eq!(secret, "secret");
        assert_eq!(url, "https://auth.example.com/token");
    }

    #[test]
    fn summary_written_to_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut summary = RunSummary::new(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        summary.total_clients = 1;
        summary.record_success("42", "s3://bucket/trigger/42/42_trigger_20240309.json".into());

        let path = summary.write_to(dir.path()).unwrap();
        let raw = std::fs::read_to_string(path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed["trigger_date"], "2024-03-09");
        assert_eq!(parsed["successful_archives"], 1);
        assert_eq!(parsed["archived"][0]["client_id"], "42");
    }
}
