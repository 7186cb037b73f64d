//! Client discovery.
//!
//! Three backends yield the same `ClientRecord` shape: the relational store,
//! an HTTP list endpoint, and a static JSON file. Database rows are tagged
//! with the trigger scope directly since the SQL query is the eligibility
//! gate.

use crate::config::{ClientSourceConfig, Config};
use crate::db;
use crate::models::{ClientRecord, Scopes};
use crate::trigger::TRIGGER_SCOPE;
use crate::types::{AppError, AppResult};
use sqlx::PgPool;
use std::path::PathBuf;
use tracing::info;

pub enum ClientSource {
    Database(PgPool),
    Http { http: reqwest::Client, url: String },
    File(PathBuf),
}

impl ClientSource {
    pub async fn from_config(config: &Config, http: reqwest::Client) -> AppResult<Self> {
        match &config.clients {
            ClientSourceConfig::Database => {
                let pool = db::create_pool(&config.database).await?;
                Ok(ClientSource::Database(pool))
            }
            ClientSourceConfig::Http { url } => Ok(ClientSource::Http {
                http,
                url: url.clone(),
            }),
            ClientSourceConfig::File { path } => Ok(ClientSource::File(path.clone())),
        }
    }

    pub async fn get_clients(&self) -> AppResult<Vec<ClientRecord>> {
        match self {
            ClientSource::Database(pool) => {
                let mut clients = db::trigger_clients(pool).await?;
                // The query already filtered on credentials and service
                // enrollment, so these clients hold the trigger scope.
                for client in &mut clients {
                    client.scopes = Scopes::from(TRIGGER_SCOPE);
                }
                Ok(clients)
            }
            ClientSource::Http { http, url } => {
                info!(%url, "Fetching client list");
                let response = http.get(url).send().await?;
                let status = response.status();
                if !status.is_success() {
                    return Err(AppError::Config(format!(
                        "client list endpoint {url} returned {status}"
                    )));
                }
                let data = response.json::<serde_json::Value>().await?;
                parse_client_list(data)
            }
            ClientSource::File(path) => {
                info!(path = %path.display(), "Loading client list from file");
                let raw = std::fs::read_to_string(path)?;
                let data: serde_json::Value = serde_json::from_str(&raw)?;
                parse_client_list(data)
            }
        }
    }
}

/// A JSON array of descriptors, or a single descriptor treated as a
/// one-element list.
fn parse_client_list(data: serde_json::Value) -> AppResult<Vec<ClientRecord>> {
    let clients = if data.is_array() {
        serde_json::from_value(data)?
    } else {
        vec![serde_json::from_value(data)?]
    };
    Ok(clients)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn http_source_parses_client_array() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/clients")
            .with_status(200)
            .with_body(
                r#"[
                    {"client_id": "1", "name": "Acme", "scopes": ["dex/trigger:all"]},
                    {"client_id": "2", "name": "Globex", "scopes": []}
                ]"#,
            )
            .create_async()
            .await;

        let source = ClientSource::Http {
            http: reqwest::Client::new(),
            url: format!("{}/clients", server.url()),
        };
        let clients = source.get_clients().await.unwrap();

        assert_eq!(clients.len(), 2);
        assert!(clients[0].has_scope(TRIGGER_SCOPE));
        assert!(!clients[1].has_scope(TRIGGER_SCOPE));
    }

    #[tokio::test]
    async fn http_source_wraps_single_object() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/clients")
            .with_status(200)
            .with_body(r#"{"client_id": "1", "name": "Acme"}"#)
            .create_async()
            .await;

        let source = ClientSource::Http {
            http: reqwest::Client::new(),
            url: format!("{}/clients", server.url()),
        };
        let clients = source.get_clients().await.unwrap();

        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].client_id, "1");
    }

    #[tokio::test]
    async fn descriptor_without_id_does_not_poison_the_list() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"name": "NoId", "scopes": ["dex/trigger:all"]}},
                {{"client_id": "2", "name": "Globex", "scopes": ["dex/trigger:all"]}}
            ]"#
        )
        .unwrap();

        let source = ClientSource::File(file.path().to_path_buf());
        let clients = source.get_clients().await.unwrap();

        assert_eq!(clients.len(), 2);
        assert!(clients[0].client_id.is_empty());
        assert_eq!(clients[1].client_id, "2");
    }

    #[tokio::test]
    async fn file_source_reads_descriptors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"client_id": "9", "scope": "dex/trigger:all", "trigger_url": "https://dex.example.com/t"}}]"#
        )
        .unwrap();

        let source = ClientSource::File(file.path().to_path_buf());
        let clients = source.get_clients().await.unwrap();

        assert_eq!(clients.len(), 1);
        assert!(clients[0].has_scope(TRIGGER_SCOPE));
        assert_eq!(
            clients[0].trigger_url.as_deref(),
            Some("https://dex.example.com/t")
        );
    }
}
