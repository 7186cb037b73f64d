use crate::models::{ClientRecord, Scopes};
use crate::types::AppResult;
use sqlx::PgPool;
use tracing::info;

/// Service ids whose enrollment makes a client eligible for trigger archival.
const ELIGIBLE_SERVICE_IDS: &str = "2, 3, 4, 5, 8";

#[derive(sqlx::FromRow)]
struct ClientRow {
    client_id: String,
    name: Option<String>,
}

impl From<ClientRow> for ClientRecord {
    fn from(row: ClientRow) -> Self {
        ClientRecord {
            client_id: row.client_id,
            name: row.name,
            scopes: Scopes::default(),
            oauth_client_id: None,
            oauth_client_secret: None,
            token_url: None,
            trigger_url: None,
        }
    }
}

/// Distinct clients holding OAuth2 client credentials and enrolled in an
/// eligible service. The query is the eligibility gate for the database
/// source; scope tagging happens in the client source layer.
pub async fn trigger_clients(pool: &PgPool) -> AppResult<Vec<ClientRecord>> {
    let query = format!(
        r#"
        SELECT DISTINCT c.client_id::text AS client_id, c.name
        FROM clients c
        INNER JOIN client_services cs ON c.client_id = cs.client_id
        WHERE c.oauth_credentials_id IS NOT NULL
        AND cs.service_id IN ({ELIGIBLE_SERVICE_IDS})
        "#
    );

    let rows = sqlx::query_as::<_, ClientRow>(&query)
        .fetch_all(pool)
        .await?;

    info!(count = rows.len(), "Retrieved clients with trigger scope");
    Ok(rows.into_iter().map(ClientRecord::from).collect())
}
