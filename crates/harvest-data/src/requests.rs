//! Repository for fetch request records.

use async_trait::async_trait;
use harvest_fetch_core::{
    FetchRequest, MessageRefs, RequestId, RequestStore, Requester, SearchResult, TorrentRecord,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::debug;

use crate::error::{DataError, Result};

const INSERT_REQUEST: &str = r"
    INSERT INTO harvest.requests (
        id,
        author_id,
        channel_id,
        request_message_id,
        list_message_id,
        status_message_id,
        search_results,
        choice,
        torrent,
        created_at
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
";

const SELECT_BY_ID: &str = r"
    SELECT id, author_id, channel_id, request_message_id, list_message_id,
           status_message_id, search_results, choice, torrent, created_at
    FROM harvest.requests
    WHERE id = $1
";

const SELECT_BY_LIST_MESSAGE: &str = r"
    SELECT id, author_id, channel_id, request_message_id, list_message_id,
           status_message_id, search_results, choice, torrent, created_at
    FROM harvest.requests
    WHERE list_message_id = $1
";

const SELECT_IN_PROGRESS: &str = r"
    SELECT id, author_id, channel_id, request_message_id, list_message_id,
           status_message_id, search_results, choice, torrent, created_at
    FROM harvest.requests
    WHERE in_progress
    ORDER BY created_at
";

const RECORD_CHOICE: &str = r"
    UPDATE harvest.requests
    SET choice = $2,
        status_message_id = $3,
        updated_at = now()
    WHERE id = $1
      AND choice IS NULL
";

const UPDATE_TORRENT: &str = r"
    UPDATE harvest.requests
    SET torrent = $2,
        updated_at = now()
    WHERE id = $1
";

const DELETE_REQUEST: &str = r"DELETE FROM harvest.requests WHERE id = $1";

fn map_query_err(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DataError {
    move |source| DataError::Query { operation, source }
}

/// Postgres-backed [`RequestStore`].
#[derive(Clone)]
pub struct PgRequestStore {
    pool: PgPool,
}

impl PgRequestStore {
    /// Initialise the store, applying pending migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if migrations fail or the database is unreachable.
    pub async fn new(pool: PgPool) -> Result<Self> {
        let mut migrator = sqlx::migrate!("./migrations");
        migrator.set_ignore_missing(true);
        migrator
            .run(&pool)
            .await
            .map_err(|source| DataError::Migrate { source })?;
        debug!("request store migrations applied");
        Ok(Self { pool })
    }

    /// Access the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Persist a newly created request.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including on duplicate identifiers.
    pub async fn insert_request(&self, request: &FetchRequest) -> Result<()> {
        sqlx::query(INSERT_REQUEST)
            .bind(request.id)
            .bind(&request.requester.author_id)
            .bind(&request.requester.channel_id)
            .bind(&request.message_refs.request_message_id)
            .bind(&request.message_refs.list_message_id)
            .bind(request.message_refs.status_message_id.as_deref())
            .bind(Json(&request.search_results))
            .bind(request.choice.as_ref().map(Json))
            .bind(request.torrent.as_ref().map(Json))
            .bind(request.created_at)
            .execute(&self.pool)
            .await
            .map_err(map_query_err("requests.insert"))?;
        Ok(())
    }

    /// Load a request by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored record cannot be decoded.
    pub async fn load(&self, id: RequestId) -> Result<Option<FetchRequest>> {
        let row = sqlx::query(SELECT_BY_ID)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("requests.find_by_id"))?;
        row.as_ref().map(decode_request).transpose()
    }

    /// Load the request whose listing is the given chat message.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the stored record cannot be decoded.
    pub async fn load_by_list_message(&self, list_message_id: &str) -> Result<Option<FetchRequest>> {
        let row = sqlx::query(SELECT_BY_LIST_MESSAGE)
            .bind(list_message_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_query_err("requests.find_by_list_message"))?;
        row.as_ref().map(decode_request).transpose()
    }

    /// Load every request whose persisted torrent status is in progress, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored record cannot be decoded.
    pub async fn load_in_progress(&self) -> Result<Vec<FetchRequest>> {
        let rows = sqlx::query(SELECT_IN_PROGRESS)
            .fetch_all(&self.pool)
            .await
            .map_err(map_query_err("requests.find_all_in_progress"))?;
        rows.iter().map(decode_request).collect()
    }

    /// Record a choice unless one already exists; returns whether the row changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn set_choice(
        &self,
        id: RequestId,
        choice: &SearchResult,
        status_message_id: &str,
    ) -> Result<bool> {
        let result = sqlx::query(RECORD_CHOICE)
            .bind(id)
            .bind(Json(choice))
            .bind(status_message_id)
            .execute(&self.pool)
            .await
            .map_err(map_query_err("requests.record_choice"))?;
        Ok(result.rows_affected() == 1)
    }

    /// Overwrite the torrent sub-object.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn set_torrent(&self, id: RequestId, torrent: &TorrentRecord) -> Result<()> {
        sqlx::query(UPDATE_TORRENT)
            .bind(id)
            .bind(Json(torrent))
            .execute(&self.pool)
            .await
            .map_err(map_query_err("requests.update_torrent"))?;
        Ok(())
    }

    /// Remove a request.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    pub async fn remove(&self, id: RequestId) -> Result<()> {
        sqlx::query(DELETE_REQUEST)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_query_err("requests.delete"))?;
        Ok(())
    }
}

#[async_trait]
impl RequestStore for PgRequestStore {
    async fn insert(&self, request: &FetchRequest) -> anyhow::Result<()> {
        Ok(self.insert_request(request).await?)
    }

    async fn find_by_id(&self, id: RequestId) -> anyhow::Result<Option<FetchRequest>> {
        Ok(self.load(id).await?)
    }

    async fn find_by_list_message(
        &self,
        list_message_id: &str,
    ) -> anyhow::Result<Option<FetchRequest>> {
        Ok(self.load_by_list_message(list_message_id).await?)
    }

    async fn find_all_in_progress(&self) -> anyhow::Result<Vec<FetchRequest>> {
        Ok(self.load_in_progress().await?)
    }

    async fn record_choice(
        &self,
        id: RequestId,
        choice: &SearchResult,
        status_message_id: &str,
    ) -> anyhow::Result<bool> {
        Ok(self.set_choice(id, choice, status_message_id).await?)
    }

    async fn update_torrent(&self, id: RequestId, torrent: &TorrentRecord) -> anyhow::Result<()> {
        Ok(self.set_torrent(id, torrent).await?)
    }

    async fn delete(&self, id: RequestId) -> anyhow::Result<()> {
        Ok(self.remove(id).await?)
    }
}

fn decode_request(row: &PgRow) -> Result<FetchRequest> {
    let search_results: Json<Value> = get(row, "search_results")?;
    let choice: Option<Json<Value>> = get(row, "choice")?;
    let torrent: Option<Json<Value>> = get(row, "torrent")?;

    Ok(FetchRequest {
        id: get(row, "id")?,
        requester: Requester {
            author_id: get(row, "author_id")?,
            channel_id: get(row, "channel_id")?,
        },
        message_refs: MessageRefs {
            request_message_id: get(row, "request_message_id")?,
            list_message_id: get(row, "list_message_id")?,
            status_message_id: get(row, "status_message_id")?,
        },
        search_results: decode_json("search_results", search_results.0)?,
        choice: optional_json("choice", choice)?,
        torrent: optional_json("torrent", torrent)?,
        created_at: get(row, "created_at")?,
    })
}

fn get<'r, T>(row: &'r PgRow, column: &'static str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(column)
        .map_err(map_query_err("requests.decode_row"))
}

fn optional_json<T: DeserializeOwned>(
    field: &'static str,
    value: Option<Json<Value>>,
) -> Result<Option<T>> {
    match value {
        Some(Json(value)) if !value.is_null() => decode_json(field, value).map(Some),
        _ => Ok(None),
    }
}

fn decode_json<T: DeserializeOwned>(field: &'static str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|source| DataError::Decode {
        column: field,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn optional_json_treats_null_as_absent() -> Result<()> {
        let absent: Option<SearchResult> = optional_json("choice", Some(Json(Value::Null)))?;
        assert!(absent.is_none());
        let missing: Option<SearchResult> = optional_json("choice", None)?;
        assert!(missing.is_none());
        Ok(())
    }

    #[test]
    fn decode_json_reports_the_failing_field() {
        let err = decode_json::<TorrentRecord>("torrent", json!({ "daemon_id": "seven" }))
            .expect_err("malformed torrent should fail");
        assert!(matches!(
            err,
            DataError::Decode {
                column: "torrent",
                ..
            }
        ));
    }

    #[test]
    fn decode_json_accepts_persisted_choice_shape() -> Result<()> {
        let choice: SearchResult = decode_json(
            "choice",
            json!({
                "name": "alpha",
                "size": "1 GiB",
                "seeders": 3,
                "magnet_uri": "magnet:?xt=urn:btih:alpha"
            }),
        )?;
        assert_eq!(choice.seeders, 3);
        Ok(())
    }
}
