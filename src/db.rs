use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::info;

use crate::filter::CaseFilter;
use crate::snapshot::RawSnapshot;

const UNDEFINED_TABLE: &str = "42P01";

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let cases = vec![
        (1001, "Backend Engineer", "Engineering", "Completed", Some(42)),
        (1002, "Data Analyst", "Engineering", "Completed", Some(31)),
        (1003, "HR Generalist", "Human Resources", "In Progress", Some(18)),
        (1004, "Account Executive", "Sales", "Completed", Some(27)),
        (1005, "Site Reliability Engineer", "Engineering", "In Progress", None),
    ];

    for (case_id, job_position, department, hiring_status, time_to_hire) in cases {
        sqlx::query(
            r#"
            INSERT INTO hr_efficiency_cases
            (case_id, job_position, department, hiring_status, time_to_hire)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (case_id) DO NOTHING
            "#,
        )
        .bind(case_id)
        .bind(job_position)
        .bind(department)
        .bind(hiring_status)
        .bind(time_to_hire)
        .execute(pool)
        .await?;
    }

    let events = vec![
        (1, 1001, "Application received", "Applied", "Engineering", "2026-01-05T09:00:00Z"),
        (2, 1001, "Phone screen", "Screening", "Engineering", "2026-01-09T14:00:00Z"),
        (3, 1001, "Onsite loop", "Interview", "Engineering", "2026-01-21T10:00:00Z"),
        (4, 1001, "Offer sent", "Offer", "Engineering", "2026-02-12T16:00:00Z"),
        (5, 1003, "Application received", "Applied", "Human Resources", "2026-02-02T08:30:00Z"),
        (6, 1003, "Phone screen", "Screening", "Human Resources", "2026-02-10T11:00:00Z"),
        (7, 1004, "Application received", "Applied", "Sales", "2026-01-12T09:00:00Z"),
        (8, 1004, "Panel interview", "Interview", "Sales", "2026-01-26T15:00:00Z"),
    ];

    for (event_id, case_id, activity, status, department, timestamp) in events {
        sqlx::query(
            r#"
            INSERT INTO hr_efficiency_events
            (event_id, case_id, activity, status, department, timestamp)
            VALUES ($1, $2, $3, $4, $5, $6::timestamptz)
            ON CONFLICT (event_id) DO NOTHING
            "#,
        )
        .bind(event_id)
        .bind(case_id)
        .bind(activity)
        .bind(status)
        .bind(department)
        .bind(timestamp)
        .execute(pool)
        .await?;
    }

    let surveys = vec![
        (1, 1001, 9, "positive", "Clear communication throughout"),
        (2, 1002, 7, "neutral", "Long wait before the final round"),
        (3, 1004, 4, "negative", "Scheduling was chaotic"),
    ];

    for (response_id, case_id, feedback_score, sentiment, comment) in surveys {
        sqlx::query(
            r#"
            INSERT INTO hr_efficiency_survey_responses
            (response_id, case_id, feedback_score, sentiment, comment)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (response_id) DO NOTHING
            "#,
        )
        .bind(response_id)
        .bind(case_id)
        .bind(feedback_score)
        .bind(sentiment)
        .bind(comment)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Fetches all four collections concurrently, pushing the case filter down.
pub async fn fetch_snapshot(pool: &PgPool, filter: &CaseFilter) -> anyhow::Result<RawSnapshot> {
    let (cases, events, survey_responses, stage_delays) = tokio::try_join!(
        fetch_cases(pool, filter),
        fetch_rows(pool, "hr_efficiency_events"),
        fetch_rows(pool, "hr_efficiency_survey_responses"),
        fetch_stage_delays(pool),
    )?;

    info!(
        cases = cases.len(),
        events = events.len(),
        survey_responses = survey_responses.len(),
        stage_delays = stage_delays.as_ref().map(Vec::len),
        "fetched dashboard rows"
    );

    Ok(RawSnapshot {
        cases,
        events,
        survey_responses,
        stage_delays,
    })
}

pub async fn fetch_cases(
    pool: &PgPool,
    filter: &CaseFilter,
) -> anyhow::Result<Vec<serde_json::Value>> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT row_to_json(c) AS row FROM hr_efficiency_cases c WHERE TRUE");

    if let Some(department) = &filter.department {
        query.push(" AND c.department = ").push_bind(department.clone());
    }
    if let Some(job_position) = &filter.job_position {
        query.push(" AND c.job_position = ").push_bind(job_position.clone());
    }
    if let Some(status) = &filter.status {
        query.push(" AND c.hiring_status = ").push_bind(status.clone());
    }
    if let Some(min) = filter.time_to_hire_min {
        query.push(" AND c.time_to_hire >= ").push_bind(i64::from(min));
    }
    if let Some(max) = filter.time_to_hire_max {
        query.push(" AND c.time_to_hire <= ").push_bind(i64::from(max));
    }

    let records = query.build().fetch_all(pool).await?;
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        rows.push(record.try_get("row")?);
    }
    Ok(rows)
}

async fn fetch_rows(pool: &PgPool, table: &str) -> anyhow::Result<Vec<serde_json::Value>> {
    let query = format!("SELECT row_to_json(t) AS row FROM {table} t");
    let records = sqlx::query(&query).fetch_all(pool).await?;
    let mut rows = Vec::with_capacity(records.len());
    for record in records {
        rows.push(record.try_get("row")?);
    }
    Ok(rows)
}

/// `None` when the `recruitment_stage_delays` view has not been created.
async fn fetch_stage_delays(pool: &PgPool) -> anyhow::Result<Option<Vec<serde_json::Value>>> {
    match fetch_rows(pool, "recruitment_stage_delays").await {
        Ok(rows) => Ok(Some(rows)),
        Err(err) => match err.downcast_ref::<sqlx::Error>() {
            Some(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(UNDEFINED_TABLE) =>
            {
                Ok(None)
            }
            _ => Err(err),
        },
    }
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        case_id: i64,
        job_position: Option<String>,
        department: Option<String>,
        hiring_status: Option<String>,
        time_to_hire: Option<i32>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut upserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let result = sqlx::query(
            r#"
            INSERT INTO hr_efficiency_cases
            (case_id, job_position, department, hiring_status, time_to_hire)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (case_id) DO UPDATE
            SET job_position = EXCLUDED.job_position,
                department = EXCLUDED.department,
                hiring_status = EXCLUDED.hiring_status,
                time_to_hire = EXCLUDED.time_to_hire
            "#,
        )
        .bind(row.case_id)
        .bind(&row.job_position)
        .bind(&row.department)
        .bind(&row.hiring_status)
        .bind(row.time_to_hire)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            upserted += 1;
        }
    }

    Ok(upserted)
}
