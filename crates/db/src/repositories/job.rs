use chrono::Utc;
use sqlx::Row;

use serqet_core::domain::records::{JobApplication, JobApplicationId, NewJobApplication};

use super::{
    decode_err, decode_timestamp, encode_timestamp, new_record_id, JobApplicationRepository,
    RepositoryError,
};
use crate::DbPool;

pub struct SqlJobApplicationRepository {
    pool: DbPool,
}

impl SqlJobApplicationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_application(row: &sqlx::sqlite::SqliteRow) -> Result<JobApplication, RepositoryError> {
    let id: String = row.try_get("id").map_err(decode_err)?;
    let company: String = row.try_get("company").map_err(decode_err)?;
    let role: String = row.try_get("role").map_err(decode_err)?;
    let status: String = row.try_get("status").map_err(decode_err)?;
    let link: String = row.try_get("link").map_err(decode_err)?;
    let salary_range: String = row.try_get("salary_range").map_err(decode_err)?;
    let created_at: String = row.try_get("created_at").map_err(decode_err)?;

    Ok(JobApplication {
        id: JobApplicationId(id),
        company,
        role,
        status,
        link,
        salary_range,
        created_at: decode_timestamp(&created_at)?,
    })
}

#[async_trait::async_trait]
impl JobApplicationRepository for SqlJobApplicationRepository {
    async fn create(
        &self,
        application: NewJobApplication,
    ) -> Result<JobApplication, RepositoryError> {
        let record = JobApplication {
            id: JobApplicationId(new_record_id()),
            company: application.company,
            role: application.role,
            status: application.status,
            link: application.link,
            salary_range: application.salary_range,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO job_application (id, company, role, status, link, salary_range, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id.0)
        .bind(&record.company)
        .bind(&record.role)
        .bind(&record.status)
        .bind(&record.link)
        .bind(&record.salary_range)
        .bind(encode_timestamp(&record.created_at))
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn list(&self) -> Result<Vec<JobApplication>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, company, role, status, link, salary_range, created_at
             FROM job_application
             ORDER BY created_at DESC, rowid DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_application).collect()
    }
}

#[cfg(test)]
mod tests {
    use serqet_core::domain::records::NewJobApplication;

    use crate::repositories::{JobApplicationRepository, SqlJobApplicationRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn application_round_trips_all_fields() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlJobApplicationRepository::new(pool);

        let created = repo
            .create(NewJobApplication {
                company: "Acme".to_string(),
                role: "Backend Engineer".to_string(),
                status: "Applied".to_string(),
                link: "https://acme.example/jobs/42".to_string(),
                salary_range: "Not specified".to_string(),
            })
            .await
            .expect("create");

        assert_eq!(repo.list().await.expect("list"), vec![created]);
    }
}
