// Postgres ContentStore. Raw SQL with manual row mapping; status columns are
// plain text parsed back into the common enums.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};

use content_factory_common::{
    Account, Carousel, CarouselPlan, CarouselSummary, ContentFactoryError, ContentFilter,
    ContentSource, ContentStatus, DashboardStats, NewAccount, NewCarousel, NewCarouselPlan,
    NewContentSource, PipelineRun, Platform, Result, RunKind, RunStatus,
};

use crate::{clamp_limit, ContentStore};

const ACCOUNT_COLUMNS: &str = "id, platform, username, followers, category, is_active, \
     last_parsed_at, created_at, updated_at";

const CONTENT_COLUMNS: &str =
    "id, url, platform, caption, metadata, status, score, created_at, updated_at";

const PLAN_COLUMNS: &str =
    "id, source_id, title, description, structure, status, theme, created_at";

const RUN_COLUMNS: &str =
    "id, kind, status, config, stats, error_log, created_at, started_at, finished_at";

const CAROUSEL_SUMMARY_SELECT: &str = r#"
    SELECT c.id, c.plan_id, c.bundle_id, c.zip_object_key, c.thumbnail_object_key,
           c.slide_count, c.status, c.published_at, c.created_at,
           p.title AS plan_title, p.source_id
    FROM carousels c
    JOIN carousel_plans p ON p.id = c.plan_id
"#;

fn db(e: sqlx::Error) -> ContentFactoryError {
    ContentFactoryError::Database(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(d) if d.code().as_deref() == Some("23505"))
}

fn parse_col<T>(row: &PgRow, col: &str) -> Result<T>
where
    T: std::str::FromStr<Err = ContentFactoryError>,
{
    let raw: String = row.try_get(col).map_err(db)?;
    raw.parse()
        .map_err(|e: ContentFactoryError| ContentFactoryError::Database(format!("column {col}: {e}")))
}

/// Escape LIKE metacharacters and wrap in wildcards.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn row_to_account(row: PgRow) -> Result<Account> {
    Ok(Account {
        id: row.try_get("id").map_err(db)?,
        platform: parse_col(&row, "platform")?,
        username: row.try_get("username").map_err(db)?,
        followers: row.try_get("followers").map_err(db)?,
        category: row.try_get("category").map_err(db)?,
        is_active: row.try_get("is_active").map_err(db)?,
        last_parsed_at: row.try_get("last_parsed_at").map_err(db)?,
        created_at: row.try_get("created_at").map_err(db)?,
        updated_at: row.try_get("updated_at").map_err(db)?,
    })
}

fn row_to_content(row: PgRow) -> Result<ContentSource> {
    Ok(ContentSource {
        id: row.try_get("id").map_err(db)?,
        url: row.try_get("url").map_err(db)?,
        platform: parse_col(&row, "platform")?,
        caption: row.try_get("caption").map_err(db)?,
        metadata: row.try_get("metadata").map_err(db)?,
        status: parse_col(&row, "status")?,
        score: row.try_get("score").map_err(db)?,
        created_at: row.try_get("created_at").map_err(db)?,
        updated_at: row.try_get("updated_at").map_err(db)?,
    })
}

fn row_to_plan(row: PgRow) -> Result<CarouselPlan> {
    Ok(CarouselPlan {
        id: row.try_get("id").map_err(db)?,
        source_id: row.try_get("source_id").map_err(db)?,
        title: row.try_get("title").map_err(db)?,
        description: row.try_get("description").map_err(db)?,
        structure: row.try_get("structure").map_err(db)?,
        status: parse_col(&row, "status")?,
        theme: parse_col(&row, "theme")?,
        created_at: row.try_get("created_at").map_err(db)?,
    })
}

fn row_to_carousel(row: &PgRow) -> Result<Carousel> {
    Ok(Carousel {
        id: row.try_get("id").map_err(db)?,
        plan_id: row.try_get("plan_id").map_err(db)?,
        bundle_id: row.try_get("bundle_id").map_err(db)?,
        zip_object_key: row.try_get("zip_object_key").map_err(db)?,
        thumbnail_object_key: row.try_get("thumbnail_object_key").map_err(db)?,
        slide_count: row.try_get("slide_count").map_err(db)?,
        status: parse_col(row, "status")?,
        published_at: row.try_get("published_at").map_err(db)?,
        created_at: row.try_get("created_at").map_err(db)?,
    })
}

fn row_to_carousel_summary(row: PgRow) -> Result<CarouselSummary> {
    Ok(CarouselSummary {
        carousel: row_to_carousel(&row)?,
        plan_title: row.try_get("plan_title").map_err(db)?,
        source_id: row.try_get("source_id").map_err(db)?,
    })
}

fn row_to_run(row: PgRow) -> Result<PipelineRun> {
    Ok(PipelineRun {
        id: row.try_get("id").map_err(db)?,
        kind: parse_col(&row, "kind")?,
        status: parse_col(&row, "status")?,
        config: row.try_get("config").map_err(db)?,
        stats: row.try_get("stats").map_err(db)?,
        error_log: row.try_get("error_log").map_err(db)?,
        created_at: row.try_get("created_at").map_err(db)?,
        started_at: row.try_get("started_at").map_err(db)?,
        finished_at: row.try_get("finished_at").map_err(db)?,
    })
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(db)?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run the embedded SQL migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ContentFactoryError::Database(e.to_string()))?;
        Ok(())
    }

    async fn lock_content_status(
        tx: &mut Transaction<'_, Postgres>,
        id: i64,
    ) -> Result<ContentStatus> {
        let row = sqlx::query("SELECT status FROM content_sources WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(db)?
            .ok_or_else(|| ContentFactoryError::not_found("content", id))?;
        parse_col(&row, "status")
    }

    /// Validate and apply a run status change inside one transaction.
    async fn transition_run(
        &self,
        id: i64,
        next: RunStatus,
        stats: Option<serde_json::Value>,
        error: Option<&str>,
    ) -> Result<PipelineRun> {
        let mut tx = self.pool.begin().await.map_err(db)?;

        let row = sqlx::query("SELECT status FROM pipeline_runs WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db)?
            .ok_or_else(|| ContentFactoryError::not_found("run", id))?;
        let current: RunStatus = parse_col(&row, "status")?;
        current.transition(next)?;

        let sql = format!(
            r#"
            UPDATE pipeline_runs SET
                status = $2,
                stats = COALESCE($3, stats),
                error_log = COALESCE($4, error_log),
                started_at = CASE WHEN $2 = 'running' THEN now() ELSE started_at END,
                finished_at = CASE WHEN $2 IN ('completed', 'failed') THEN now() ELSE finished_at END
            WHERE id = $1
            RETURNING {RUN_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(next.as_str())
            .bind(stats)
            .bind(error)
            .fetch_one(&mut *tx)
            .await
            .map_err(db)?;

        tx.commit().await.map_err(db)?;
        row_to_run(row)
    }
}

#[async_trait]
impl ContentStore for PgStore {
    async fn create_account(&self, account: NewAccount) -> Result<Account> {
        let username = account.username.trim().trim_start_matches('@').to_string();
        if username.is_empty() {
            return Err(ContentFactoryError::Validation("username is required".into()));
        }
        let sql = format!(
            r#"
            INSERT INTO accounts (platform, username, followers, category)
            VALUES ($1, $2, $3, $4)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(account.platform.as_str())
            .bind(&username)
            .bind(account.followers)
            .bind(&account.category)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    ContentFactoryError::Conflict(format!(
                        "{} account '{}' already exists",
                        account.platform, username
                    ))
                } else {
                    db(e)
                }
            })?;
        row_to_account(row)
    }

    async fn insert_candidate_account(
        &self,
        platform: Platform,
        username: &str,
        followers: Option<i64>,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO accounts (platform, username, followers, category, is_active)
            VALUES ($1, $2, $3, 'candidate', TRUE)
            ON CONFLICT (platform, username) DO NOTHING
            "#,
        )
        .bind(platform.as_str())
        .bind(username.trim().trim_start_matches('@'))
        .bind(followers)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY created_at DESC, id DESC");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await.map_err(db)?;
        rows.into_iter().map(row_to_account).collect()
    }

    async fn active_accounts(&self, limit: i64) -> Result<Vec<Account>> {
        let sql = format!(
            r#"
            SELECT {ACCOUNT_COLUMNS} FROM accounts
            WHERE is_active
            ORDER BY last_parsed_at ASC NULLS FIRST, id ASC
            LIMIT $1
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.into_iter().map(row_to_account).collect()
    }

    async fn set_account_active(&self, id: i64, active: bool) -> Result<Account> {
        let sql = format!(
            r#"
            UPDATE accounts SET is_active = $2, updated_at = now()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(active)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?
            .ok_or_else(|| ContentFactoryError::not_found("account", id))?;
        row_to_account(row)
    }

    async fn mark_accounts_parsed(&self, ids: &[i64], at: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            "UPDATE accounts SET last_parsed_at = $2, updated_at = $2 WHERE id = ANY($1)",
        )
        .bind(ids)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(())
    }

    async fn insert_content_if_new(&self, content: NewContentSource) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO content_sources (url, platform, caption, metadata, status)
            VALUES ($1, $2, $3, $4, 'pending')
            ON CONFLICT (url) DO NOTHING
            "#,
        )
        .bind(&content.url)
        .bind(content.platform.as_str())
        .bind(&content.caption)
        .bind(&content.metadata)
        .execute(&self.pool)
        .await
        .map_err(db)?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_content(&self, id: i64) -> Result<Option<ContentSource>> {
        let sql = format!("SELECT {CONTENT_COLUMNS} FROM content_sources WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        row.map(row_to_content).transpose()
    }

    async fn list_content(&self, filter: &ContentFilter) -> Result<Vec<ContentSource>> {
        let statuses: Option<Vec<String>> = {
            let set = filter.status_set();
            (!set.is_empty()).then(|| set.iter().map(|s| s.to_string()).collect())
        };
        let sql = format!(
            r#"
            SELECT {CONTENT_COLUMNS} FROM content_sources
            WHERE ($1::text[] IS NULL OR status = ANY($1))
              AND ($2::text IS NULL OR platform = $2)
              AND ($3::text IS NULL OR caption ILIKE $3 OR url ILIKE $3)
              AND ($4::float8 IS NULL OR score >= $4)
            ORDER BY score DESC NULLS LAST, created_at DESC, id DESC
            LIMIT $5 OFFSET $6
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(statuses)
            .bind(filter.platform.map(|p| p.as_str()))
            .bind(filter.search_term().map(|t| like_pattern(&t)))
            .bind(filter.min_score)
            .bind(filter.effective_limit())
            .bind(filter.effective_offset())
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.into_iter().map(row_to_content).collect()
    }

    async fn pending_content(&self, limit: i64) -> Result<Vec<ContentSource>> {
        let sql = format!(
            r#"
            SELECT {CONTENT_COLUMNS} FROM content_sources
            WHERE status = 'pending'
            ORDER BY created_at ASC, id ASC
            LIMIT $1
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.into_iter().map(row_to_content).collect()
    }

    async fn record_score(&self, id: i64, score: f64) -> Result<ContentSource> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let current = Self::lock_content_status(&mut tx, id).await?;
        if current != ContentStatus::Pending {
            return Err(ContentFactoryError::InvalidTransition {
                entity: "content",
                from: current.to_string(),
                to: ContentStatus::Scored.to_string(),
            });
        }

        let sql = format!(
            r#"
            UPDATE content_sources SET score = $2, status = 'scored', updated_at = now()
            WHERE id = $1
            RETURNING {CONTENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(score)
            .fetch_one(&mut *tx)
            .await
            .map_err(db)?;
        tx.commit().await.map_err(db)?;
        row_to_content(row)
    }

    async fn set_content_status(&self, id: i64, status: ContentStatus) -> Result<ContentSource> {
        let mut tx = self.pool.begin().await.map_err(db)?;
        let current = Self::lock_content_status(&mut tx, id).await?;
        current.transition(status)?;

        let sql = format!(
            r#"
            UPDATE content_sources SET status = $2, updated_at = now()
            WHERE id = $1
            RETURNING {CONTENT_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_one(&mut *tx)
            .await
            .map_err(db)?;
        tx.commit().await.map_err(db)?;
        row_to_content(row)
    }

    async fn create_plan(&self, plan: NewCarouselPlan) -> Result<CarouselPlan> {
        let sql = format!(
            r#"
            INSERT INTO carousel_plans (source_id, title, description, structure, status, theme)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {PLAN_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(plan.source_id)
            .bind(&plan.title)
            .bind(&plan.description)
            .bind(&plan.structure)
            .bind(plan.status.as_str())
            .bind(plan.theme.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match (&e, plan.source_id) {
                (sqlx::Error::Database(d), Some(source_id)) if d.is_foreign_key_violation() => {
                    ContentFactoryError::not_found("content", source_id)
                }
                _ => db(e),
            })?;
        row_to_plan(row)
    }

    async fn get_plan(&self, id: i64) -> Result<Option<CarouselPlan>> {
        let sql = format!("SELECT {PLAN_COLUMNS} FROM carousel_plans WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        row.map(row_to_plan).transpose()
    }

    async fn create_carousel(&self, carousel: NewCarousel) -> Result<Carousel> {
        let row = sqlx::query(
            r#"
            INSERT INTO carousels
                (plan_id, bundle_id, zip_object_key, thumbnail_object_key, slide_count, status)
            VALUES ($1, $2, $3, $4, $5, 'ready')
            RETURNING id, plan_id, bundle_id, zip_object_key, thumbnail_object_key,
                      slide_count, status, published_at, created_at
            "#,
        )
        .bind(carousel.plan_id)
        .bind(carousel.bundle_id)
        .bind(&carousel.zip_object_key)
        .bind(&carousel.thumbnail_object_key)
        .bind(carousel.slide_count)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(d) if d.is_foreign_key_violation() => {
                ContentFactoryError::not_found("plan", carousel.plan_id)
            }
            _ => db(e),
        })?;
        row_to_carousel(&row)
    }

    async fn get_carousel(&self, id: i64) -> Result<Option<CarouselSummary>> {
        let sql = format!("{CAROUSEL_SUMMARY_SELECT} WHERE c.id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        row.map(row_to_carousel_summary).transpose()
    }

    async fn list_carousels(&self, limit: i64) -> Result<Vec<CarouselSummary>> {
        let sql = format!("{CAROUSEL_SUMMARY_SELECT} ORDER BY c.created_at DESC, c.id DESC LIMIT $1");
        let rows = sqlx::query(&sql)
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.into_iter().map(row_to_carousel_summary).collect()
    }

    async fn create_run(&self, kind: RunKind, config: serde_json::Value) -> Result<PipelineRun> {
        let sql = format!(
            r#"
            INSERT INTO pipeline_runs (kind, status, config)
            VALUES ($1, 'queued', $2)
            RETURNING {RUN_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(kind.as_str())
            .bind(&config)
            .fetch_one(&self.pool)
            .await
            .map_err(db)?;
        row_to_run(row)
    }

    async fn get_run(&self, id: i64) -> Result<Option<PipelineRun>> {
        let sql = format!("SELECT {RUN_COLUMNS} FROM pipeline_runs WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db)?;
        row.map(row_to_run).transpose()
    }

    async fn list_runs(&self, kind: Option<RunKind>, limit: i64) -> Result<Vec<PipelineRun>> {
        let sql = format!(
            r#"
            SELECT {RUN_COLUMNS} FROM pipeline_runs
            WHERE ($1::text IS NULL OR kind = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#
        );
        let rows = sqlx::query(&sql)
            .bind(kind.map(|k| k.as_str()))
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.into_iter().map(row_to_run).collect()
    }

    async fn start_run(&self, id: i64) -> Result<PipelineRun> {
        self.transition_run(id, RunStatus::Running, None, None).await
    }

    async fn complete_run(&self, id: i64, stats: serde_json::Value) -> Result<PipelineRun> {
        self.transition_run(id, RunStatus::Completed, Some(stats), None)
            .await
    }

    async fn fail_run(&self, id: i64, error: &str) -> Result<PipelineRun> {
        self.transition_run(id, RunStatus::Failed, None, Some(error))
            .await
    }

    async fn runs_with_status(&self, status: RunStatus) -> Result<Vec<PipelineRun>> {
        let sql = format!(
            "SELECT {RUN_COLUMNS} FROM pipeline_runs WHERE status = $1 ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(db)?;
        rows.into_iter().map(row_to_run).collect()
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats> {
        let by_status = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM content_sources GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db)?;

        let (carousels_total, accounts_active, average_score) =
            sqlx::query_as::<_, (i64, i64, Option<f64>)>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM carousels),
                    (SELECT COUNT(*) FROM accounts WHERE is_active),
                    (SELECT AVG(score) FROM content_sources WHERE score IS NOT NULL)
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(db)?;

        Ok(DashboardStats {
            content_total: by_status.iter().map(|(_, n)| n).sum(),
            content_by_status: by_status.into_iter().collect(),
            carousels_total,
            accounts_active,
            average_score,
        })
    }
}
