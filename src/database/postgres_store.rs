use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{error, info};

use crate::error::AppError;
use crate::models::{Alert, ProtocolScoreRecord, ScoreHistoryEntry};
use crate::database::connection::test_connection;
use crate::services::{AlertSink, DatabaseProbe, ProtocolReader, ScoreStore, SubscriberDirectory};

// Postgres caps a statement at 65535 bind parameters
const ALERT_ROWS_PER_STATEMENT: usize = 1000;

const PROTOCOL_COLUMNS: &str = "slug, name, logo_url, website, chain, category, tvl, age_days, \
     score_overall, score_security, score_tvl_stability, score_decentralization, score_financial, \
     score_community, volatility, grade, risk_level, last_updated";

/// Postgres-backed implementation of every persistence collaborator.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScoreStore for PostgresStore {
    async fn get_prior_score(&self, protocol_slug: &str) -> Result<Option<u32>, AppError> {
        let score: Option<i32> = sqlx::query_scalar("SELECT score_overall FROM protocols WHERE slug = $1")
            .bind(protocol_slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(score.map(|s| s.max(0) as u32))
    }

    async fn upsert_scores(&self, records: &[ProtocolScoreRecord]) -> Result<usize, AppError> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("INSERT INTO protocols ({}) ", PROTOCOL_COLUMNS));

        query_builder.push_values(records, |mut b, record| {
            b.push_bind(&record.slug)
                .push_bind(&record.name)
                .push_bind(&record.logo_url)
                .push_bind(&record.website)
                .push_bind(&record.chain)
                .push_bind(&record.category)
                .push_bind(record.tvl)
                .push_bind(record.age_days)
                .push_bind(record.score_overall)
                .push_bind(record.score_security)
                .push_bind(record.score_tvl_stability)
                .push_bind(record.score_decentralization)
                .push_bind(record.score_financial)
                .push_bind(record.score_community)
                .push_bind(record.volatility)
                .push_bind(&record.grade)
                .push_bind(&record.risk_level)
                .push_bind(record.last_updated);
        });

        query_builder.push(
            " ON CONFLICT (slug)
             DO UPDATE SET
                name = EXCLUDED.name,
                logo_url = EXCLUDED.logo_url,
                website = EXCLUDED.website,
                chain = EXCLUDED.chain,
                category = EXCLUDED.category,
                tvl = EXCLUDED.tvl,
                age_days = EXCLUDED.age_days,
                score_overall = EXCLUDED.score_overall,
                score_security = EXCLUDED.score_security,
                score_tvl_stability = EXCLUDED.score_tvl_stability,
                score_decentralization = EXCLUDED.score_decentralization,
                score_financial = EXCLUDED.score_financial,
                score_community = EXCLUDED.score_community,
                volatility = EXCLUDED.volatility,
                grade = EXCLUDED.grade,
                risk_level = EXCLUDED.risk_level,
                last_updated = EXCLUDED.last_updated",
        );

        let result = query_builder.build().execute(&self.pool).await.map_err(|e| {
            error!("Failed to upsert protocol scores: {}", e);
            AppError::DatabaseError(format!("Bulk upsert failed: {}", e))
        })?;

        info!(rows = result.rows_affected(), "Upserted protocol scores");
        Ok(result.rows_affected() as usize)
    }

    async fn append_score_history(&self, entries: &[ScoreHistoryEntry]) -> Result<usize, AppError> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO score_history (protocol_slug, score_overall, grade, recorded_at) ");
        query_builder.push_values(entries, |mut b, entry| {
            b.push_bind(&entry.protocol_slug)
                .push_bind(entry.score_overall as i32)
                .push_bind(entry.grade.as_str())
                .push_bind(entry.recorded_at);
        });

        let result = query_builder.build().execute(&self.pool).await.map_err(|e| {
            error!("Failed to append score history: {}", e);
            AppError::DatabaseError(format!("History insert failed: {}", e))
        })?;
        Ok(result.rows_affected() as usize)
    }
}

#[async_trait]
impl SubscriberDirectory for PostgresStore {
    async fn get_watchers(&self, protocol_slug: &str) -> Result<Vec<String>, AppError> {
        let watchers: Vec<String> =
            sqlx::query_scalar("SELECT user_id FROM watchlist WHERE protocol_slug = $1 ORDER BY user_id")
                .bind(protocol_slug)
                .fetch_all(&self.pool)
                .await?;
        Ok(watchers)
    }
}

#[async_trait]
impl AlertSink for PostgresStore {
    async fn insert_alerts(&self, alerts: &[Alert]) -> Result<usize, AppError> {
        if alerts.is_empty() {
            return Ok(0);
        }

        // all-or-nothing so the summary count matches what was stored
        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;

        for chunk in alerts.chunks(ALERT_ROWS_PER_STATEMENT) {
            let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO alerts (id, user_id, protocol_slug, type, title, message, severity, is_read, created_at) ",
            );
            query_builder.push_values(chunk, |mut b, alert| {
                b.push_bind(alert.id)
                    .push_bind(&alert.recipient)
                    .push_bind(&alert.protocol_slug)
                    .push_bind(alert.kind.as_str())
                    .push_bind(&alert.title)
                    .push_bind(&alert.message)
                    .push_bind(alert.severity.as_str())
                    .push_bind(alert.is_read)
                    .push_bind(alert.created_at);
            });

            let result = query_builder.build().execute(&mut *tx).await.map_err(|e| {
                error!("Failed to insert alerts: {}", e);
                AppError::DatabaseError(format!("Alert insert failed: {}", e))
            })?;
            inserted += result.rows_affected() as usize;
        }

        tx.commit().await?;
        info!(rows = inserted, "Inserted score change alerts");
        Ok(inserted)
    }
}

#[async_trait]
impl ProtocolReader for PostgresStore {
    async fn list_protocols(&self) -> Result<Vec<ProtocolScoreRecord>, AppError> {
        let records = sqlx::query_as::<_, ProtocolScoreRecord>(&format!(
            "SELECT {} FROM protocols ORDER BY score_overall DESC, slug",
            PROTOCOL_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn get_protocol(&self, slug: &str) -> Result<Option<ProtocolScoreRecord>, AppError> {
        let record = sqlx::query_as::<_, ProtocolScoreRecord>(&format!(
            "SELECT {} FROM protocols WHERE slug = $1",
            PROTOCOL_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }
}

#[async_trait]
impl DatabaseProbe for PostgresStore {
    async fn ping(&self) -> Result<(), AppError> {
        test_connection(&self.pool).await
    }
}
