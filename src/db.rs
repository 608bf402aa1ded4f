use anyhow::Context;
use serde_json::{json, Value};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::access::AccessList;
use crate::models::{Document, CALLS_COLLECTION, LEADS_COLLECTION};
use crate::provision::AccessStore;

const SETTINGS_COLLECTION: &str = "settings";
const SETTINGS_DOC_ID: &str = "access_control";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::query("CREATE SCHEMA IF NOT EXISTS call_analytics")
        .execute(pool)
        .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS call_analytics.documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            data JSONB NOT NULL,
            PRIMARY KEY (collection, id)
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS call_analytics.accounts (
            email TEXT PRIMARY KEY,
            password_hash TEXT NOT NULL,
            salt TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Whole-collection read, the store's primary access pattern.
pub async fn fetch_collection(pool: &PgPool, collection: &str) -> anyhow::Result<Vec<Document>> {
    let rows = sqlx::query(
        "SELECT id, data FROM call_analytics.documents WHERE collection = $1 ORDER BY id",
    )
    .bind(collection)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to fetch collection '{collection}'"))?;

    Ok(rows
        .into_iter()
        .map(|row| Document {
            id: row.get("id"),
            fields: row.get("data"),
        })
        .collect())
}

/// Simple equality read, the only server-side filtering the store offers.
pub async fn fetch_collection_where_eq(
    pool: &PgPool,
    collection: &str,
    field: &str,
    value: &str,
) -> anyhow::Result<Vec<Document>> {
    let rows = sqlx::query(
        "SELECT id, data FROM call_analytics.documents \
         WHERE collection = $1 AND data->>$2 = $3 ORDER BY id",
    )
    .bind(collection)
    .bind(field)
    .bind(value)
    .fetch_all(pool)
    .await
    .with_context(|| format!("failed to fetch '{collection}' where {field} = {value}"))?;

    Ok(rows
        .into_iter()
        .map(|row| Document {
            id: row.get("id"),
            fields: row.get("data"),
        })
        .collect())
}

/// The lead collection is queried once per tag and concatenated, so the
/// result only ever holds "Hot" and "Warm" leads.
pub async fn fetch_hot_warm_leads(pool: &PgPool) -> anyhow::Result<Vec<Document>> {
    let mut docs = fetch_collection_where_eq(pool, LEADS_COLLECTION, "tag", "Hot").await?;
    let warm = fetch_collection_where_eq(pool, LEADS_COLLECTION, "tag", "Warm").await?;
    docs.extend(warm);
    Ok(docs)
}

pub async fn read_document(
    pool: &PgPool,
    collection: &str,
    id: &str,
) -> anyhow::Result<Option<Value>> {
    let row = sqlx::query(
        "SELECT data FROM call_analytics.documents WHERE collection = $1 AND id = $2",
    )
    .bind(collection)
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.get("data")))
}

pub async fn upsert_document(
    pool: &PgPool,
    collection: &str,
    id: &str,
    data: &Value,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO call_analytics.documents (collection, id, data)
        VALUES ($1, $2, $3)
        ON CONFLICT (collection, id) DO UPDATE SET data = EXCLUDED.data
        "#,
    )
    .bind(collection)
    .bind(id)
    .bind(data)
    .execute(pool)
    .await
    .with_context(|| format!("failed to write {collection}/{id}"))?;
    Ok(())
}

/// Access list persistence against the settings document.
pub struct PgSettingsStore {
    pool: PgPool,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        PgSettingsStore { pool }
    }
}

impl AccessStore for PgSettingsStore {
    async fn load(&self) -> anyhow::Result<AccessList> {
        let doc = read_document(&self.pool, SETTINGS_COLLECTION, SETTINGS_DOC_ID)
            .await
            .context("failed to read the access list")?;
        Ok(doc
            .map(|v| AccessList::from_settings(&v))
            .unwrap_or_default())
    }

    async fn save(&self, list: &AccessList) -> anyhow::Result<()> {
        upsert_document(
            &self.pool,
            SETTINGS_COLLECTION,
            SETTINGS_DOC_ID,
            &list.to_settings(),
        )
        .await
        .context("failed to save the access list")
    }
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let calls = vec![
        (
            "seed-call-001",
            json!({
                "Name": "Asha Nair",
                "Lead_id": "LD-1041",
                "Lead_owner": "priya_sharma",
                "City": "Mumbai",
                "State": "Maharashtra",
                "course": "MBA",
                "Call_type": "outbound",
                "lead_stage": "Interested",
                "Disposition": { "counselor": "interested" },
                "scores": { "overall": 82, "confidence": "high" },
                "Duration": { "seconds": 412 },
                "Date": "2026-02-02T10:15:00Z",
                "summary": { "one_line": "Asked about MBA fees and placements." },
            }),
        ),
        (
            "seed-call-002",
            json!({
                "Name": "Ravi Kumar",
                "Lead_id": "LD-1042",
                "Lead_owner": "priya_sharma",
                "City": "Pune",
                "State": "Maharashtra",
                "course": "BTech",
                "Call_type": "inbound",
                "lead_stage": "Not Interested",
                "Disposition": { "counselor": "not_interested" },
                "scores": { "overall": 44, "confidence": "medium" },
                "Duration": { "seconds": 95 },
                "call_timestamp": { "seconds": 1_769_940_000 },
                "summary": { "one_line": "Already enrolled elsewhere." },
            }),
        ),
        (
            "seed-call-003",
            json!({
                "Name": "Meera Joshi",
                "Lead_id": "LD-1043",
                "Lead_owner": "arjun_mehta",
                "City": "Nagpur",
                "State": "Maharashtra",
                "course": "MBA",
                "Call_type": "outbound",
                "lead_stage": "Follow Up",
                "Disposition": { "counselor": "callback" },
                "scores": { "overall": 67, "confidence": "medium" },
                "Duration": { "seconds": 233 },
                "created_at": "2026-01-28",
                "summary": { "one_line": "Wants a callback after results." },
            }),
        ),
    ];
    for (id, data) in calls {
        upsert_document(pool, CALLS_COLLECTION, id, &data).await?;
    }

    let leads = vec![
        (
            "seed-lead-001",
            json!({
                "lead_id": "LD-1041",
                "name": "Asha Nair",
                "email": "asha.nair@example.com",
                "mobile": "917535834008",
                "city": "Mumbai",
                "state": "Maharashtra",
                "tag": "Hot",
                "lead_stage": "Interested",
                "publishername": "CollegeDekho",
                "created_at": "2026-01-20T08:00:00Z",
                "updated_at": "2026-02-02T10:40:00Z",
                "activity_performed": ["Call connected", "Brochure sent on WhatsApp"],
            }),
        ),
        (
            "seed-lead-002",
            json!({
                "lead_id": "LD-1055",
                "name": "Dev Patel",
                "email": "dev.patel@example.com",
                "mobile": "+91-73766 77667",
                "city": "Surat",
                "state": "Gujarat",
                "tag": "Warm",
                "lead_stage": "Follow Up",
                "publishername": "Shiksha",
                "created_at": "2026-01-25T12:30:00Z",
                "activity_performed": ["Missed call", "SMS reminder sent"],
            }),
        ),
    ];
    for (id, data) in leads {
        upsert_document(pool, LEADS_COLLECTION, id, &data).await?;
    }

    upsert_document(
        pool,
        SETTINGS_COLLECTION,
        SETTINGS_DOC_ID,
        &json!({ "users": [{ "email": "viewer@example.com", "masked": true }] }),
    )
    .await?;

    Ok(())
}

/// Which collection a CSV import feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ImportTarget {
    Calls,
    Leads,
}

pub async fn import_csv(
    pool: &PgPool,
    target: ImportTarget,
    csv_path: &std::path::Path,
) -> anyhow::Result<usize> {
    match target {
        ImportTarget::Calls => import_calls_csv(pool, csv_path).await,
        ImportTarget::Leads => import_leads_csv(pool, csv_path).await,
    }
}

async fn import_calls_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        name: String,
        #[serde(default)]
        lead_id: Option<String>,
        lead_owner: String,
        city: String,
        state: String,
        course: String,
        call_type: String,
        lead_stage: String,
        disposition: String,
        overall_score: i64,
        #[serde(default)]
        confidence: Option<String>,
        duration_seconds: i64,
        call_date: String,
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        doc_id: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let id = row
            .doc_id
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let data = json!({
            "Name": row.name,
            "Lead_id": row.lead_id.unwrap_or_default(),
            "Lead_owner": row.lead_owner,
            "City": row.city,
            "State": row.state,
            "course": row.course,
            "Call_type": row.call_type,
            "lead_stage": row.lead_stage,
            "Disposition": { "counselor": row.disposition },
            "scores": {
                "overall": row.overall_score.clamp(0, 100),
                "confidence": row.confidence.unwrap_or_default(),
            },
            "Duration": { "seconds": row.duration_seconds },
            "Date": row.call_date,
            "summary": { "one_line": row.summary.unwrap_or_default() },
        });
        upsert_document(pool, CALLS_COLLECTION, &id, &data).await?;
        inserted += 1;
    }

    Ok(inserted)
}

async fn import_leads_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        #[serde(default)]
        lead_id: Option<String>,
        name: String,
        email: String,
        mobile: String,
        city: String,
        state: String,
        tag: String,
        lead_stage: String,
        publishername: String,
        created_at: String,
        #[serde(default)]
        updated_at: Option<String>,
        #[serde(default)]
        doc_id: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        if row.tag != "Hot" && row.tag != "Warm" {
            anyhow::bail!("lead '{}' has tag '{}', expected Hot or Warm", row.name, row.tag);
        }
        let id = row
            .doc_id
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));
        let data = json!({
            "lead_id": row.lead_id.unwrap_or_default(),
            "name": row.name,
            "email": row.email,
            "mobile": row.mobile,
            "city": row.city,
            "state": row.state,
            "tag": row.tag,
            "lead_stage": row.lead_stage,
            "publishername": row.publishername,
            "created_at": row.created_at,
            "updated_at": row.updated_at,
            "activity_performed": [],
        });
        upsert_document(pool, LEADS_COLLECTION, &id, &data).await?;
        inserted += 1;
    }

    Ok(inserted)
}
