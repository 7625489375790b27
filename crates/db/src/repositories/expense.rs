use std::str::FromStr;

use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::Row;

use serqet_core::domain::records::{ExpenseId, ExpenseRecord, NewExpense};

use super::{
    checked_total, decode_err, decode_timestamp, encode_timestamp, new_record_id,
    ExpenseRepository, RepositoryError,
};
use crate::DbPool;

pub struct SqlExpenseRepository {
    pool: DbPool,
}

impl SqlExpenseRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_amount(raw: &str) -> Result<Decimal, RepositoryError> {
    Decimal::from_str(raw)
        .map_err(|e| RepositoryError::Decode(format!("invalid expense amount `{raw}`: {e}")))
}

fn row_to_expense(row: &sqlx::sqlite::SqliteRow) -> Result<ExpenseRecord, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let amount: String = row.try_get("amount").map_err(decode_err)?;
    let category: String = row.try_get("category").map_err(decode_err)?;
    let description: String = row.try_get("description").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(ExpenseRecord {
        id: ExpenseId(id),
        amount: parse_amount(&amount)?,
        category,
        description,
        created_at: decode_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl ExpenseRepository for SqlExpenseRepository {
    async fn create(&self, expense: NewExpense) -> Result<ExpenseRecord, RepositoryError> {
        let record = ExpenseRecord {
            id: ExpenseId(new_record_id()),
            amount: expense.amount,
            category: expense.category,
            description: expense.description,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO expense_record (id, amount, category, description, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(record.amount.to_string())
        .bind(&record.category)
        .bind(&record.description)
        .bind(encode_timestamp(&record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list(&self) -> Result<Vec<ExpenseRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, amount, category, description, created_at
             FROM expense_record
             ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_expense).collect()
    }

    async fn total(&self) -> Result<Decimal, RepositoryError> {
        // Amounts are decimal text, so sum in Rust rather than with SQLite's float SUM.
        let amounts: Vec<String> = sqlx::query_scalar("SELECT amount FROM expense_record")
            .fetch_all(&self.pool)
            .await?;

        let parsed =
            amounts.iter().map(|raw| parse_amount(raw)).collect::<Result<Vec<_>, _>>()?;
        checked_total(parsed)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use serqet_core::domain::records::NewExpense;

    use crate::repositories::{ExpenseRepository, RepositoryError, SqlExpenseRepository};
    use crate::{connect_with_settings, migrations};

    async fn repo() -> SqlExpenseRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        SqlExpenseRepository::new(pool)
    }

    fn expense(amount: Decimal, category: &str) -> NewExpense {
        NewExpense {
            amount,
            category: category.to_string(),
            description: format!("{category} purchase"),
        }
    }

    #[tokio::test]
    async fn create_persists_exact_decimal_amount() {
        let repo = repo().await;

        let created = repo.create(expense(Decimal::new(425, 1), "food")).await.expect("create");
        let listed = repo.list().await.expect("list");

        assert_eq!(listed, vec![created]);
        assert_eq!(listed[0].amount, Decimal::new(425, 1));
        assert_eq!(listed[0].category, "food");
    }

    #[tokio::test]
    async fn total_sums_without_float_drift() {
        let repo = repo().await;
        repo.create(expense(Decimal::new(1, 1), "coffee")).await.expect("create");
        repo.create(expense(Decimal::new(2, 1), "coffee")).await.expect("create");

        assert_eq!(repo.total().await.expect("total"), Decimal::new(3, 1));
    }

    #[tokio::test]
    async fn total_is_zero_without_records() {
        assert_eq!(repo().await.total().await.expect("total"), Decimal::ZERO);
    }

    #[tokio::test]
    async fn total_overflow_is_an_error_and_listing_still_works() {
        let repo = repo().await;
        let huge = Decimal::from_scientific("5e28").expect("decimal");
        repo.create(expense(huge, "yacht")).await.expect("create");
        repo.create(expense(huge, "yacht")).await.expect("create");

        assert!(matches!(repo.total().await, Err(RepositoryError::Overflow(_))));
        assert_eq!(repo.list().await.expect("list").len(), 2);
    }
}
