// 购买记录 Repository
//
// 只追加写入；运营端按时间倒序列出，并在对账后把 is_received 置为 true。

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::PurchaseRecord;

// ============ Repository Trait ============

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    /// 写入一条新记录
    async fn insert(&self, record: &PurchaseRecord) -> Result<()>;

    /// 最近的记录（created_at 倒序）
    async fn list_recent(&self, limit: i64) -> Result<Vec<PurchaseRecord>>;

    /// 标记为已收到；返回是否命中记录（重复调用结果不变）
    async fn mark_received(&self, id: Uuid) -> Result<bool>;
}

// ============ PostgreSQL 实现 ============

#[derive(sqlx::FromRow)]
struct PurchaseRow {
    id: Uuid,
    wallet_address: String,
    email: Option<String>,
    phone_number: String,
    transaction_hash: String,
    token_amount: Decimal,
    fiat_amount: Decimal,
    is_received: bool,
    created_at: DateTime<Utc>,
}

impl From<PurchaseRow> for PurchaseRecord {
    fn from(r: PurchaseRow) -> Self {
        Self {
            id: r.id,
            wallet_address: r.wallet_address,
            email: r.email,
            phone_number: r.phone_number,
            transaction_hash: r.transaction_hash,
            token_amount: r.token_amount,
            fiat_amount: r.fiat_amount,
            is_received: r.is_received,
            created_at: r.created_at,
        }
    }
}

pub struct PgPurchaseRepository {
    pool: PgPool,
}

impl PgPurchaseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PurchaseRepository for PgPurchaseRepository {
    async fn insert(&self, record: &PurchaseRecord) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO transactions
                (id, wallet_address, email, phone_number, transaction_hash,
                 token_amount, fiat_amount, is_received, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(record.id)
        .bind(&record.wallet_address)
        .bind(&record.email)
        .bind(&record.phone_number)
        .bind(&record.transaction_hash)
        .bind(record.token_amount)
        .bind(record.fiat_amount)
        .bind(record.is_received)
        .bind(record.created_at)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to insert purchase {}", record.transaction_hash))?;

        tracing::info!(
            id = %record.id,
            tx_hash = %record.transaction_hash,
            "Purchase recorded"
        );
        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<PurchaseRecord>> {
        let rows = sqlx::query_as::<_, PurchaseRow>(
            r#"SELECT id, wallet_address, email, phone_number, transaction_hash,
                    token_amount, fiat_amount, is_received, created_at
             FROM transactions
             ORDER BY created_at DESC
             LIMIT $1"#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list purchases")?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn mark_received(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE transactions SET is_received = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to update purchase {}", id))?;

        Ok(result.rows_affected() > 0)
    }
}

// ============ 内存实现（测试 / 无数据库时） ============

#[derive(Default)]
pub struct InMemoryPurchaseRepository {
    records: Mutex<Vec<PurchaseRecord>>,
}

impl InMemoryPurchaseRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PurchaseRepository for InMemoryPurchaseRepository {
    async fn insert(&self, record: &PurchaseRecord) -> Result<()> {
        let mut records = self.records.lock().await;
        if records
            .iter()
            .any(|r| r.transaction_hash == record.transaction_hash)
        {
            anyhow::bail!("Duplicate transaction hash {}", record.transaction_hash);
        }
        records.push(record.clone());
        Ok(())
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<PurchaseRecord>> {
        let mut records = self.records.lock().await.clone();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        records.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        Ok(records)
    }

    async fn mark_received(&self, id: Uuid) -> Result<bool> {
        let mut records = self.records.lock().await;
        match records.iter_mut().find(|r| r.id == id) {
            Some(record) => {
                record.is_received = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
