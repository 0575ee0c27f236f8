//! Call cost repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::domain::metrics::CallCosts;
use crate::domain::pricing::MatchType;

/// Insert or replace the cost triple of a call
pub async fn upsert_call_costs(
    pool: &SqlitePool,
    call_id: &str,
    costs: &CallCosts,
) -> Result<(), SqliteError> {
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO call_costs (
            call_id, total_llm_cost, total_tts_cost, total_stt_cost, currency,
            llm_match, tts_match, stt_match, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(call_id)
    .bind(costs.total_llm_cost)
    .bind(costs.total_tts_cost)
    .bind(costs.total_stt_cost)
    .bind(&costs.currency)
    .bind(costs.llm_match.as_str())
    .bind(costs.tts_match.as_str())
    .bind(costs.stt_match.as_str())
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_call_costs(
    pool: &SqlitePool,
    call_id: &str,
) -> Result<Option<CallCosts>, SqliteError> {
    let row = sqlx::query_as::<_, (f64, f64, f64, String, String, String, String)>(
        r#"
        SELECT total_llm_cost, total_tts_cost, total_stt_cost, currency,
               llm_match, tts_match, stt_match
        FROM call_costs WHERE call_id = ?
        "#,
    )
    .bind(call_id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(total_llm_cost, total_tts_cost, total_stt_cost, currency, llm, tts, stt)| CallCosts {
            total_llm_cost,
            total_tts_cost,
            total_stt_cost,
            currency,
            llm_match: MatchType::parse(&llm),
            tts_match: MatchType::parse(&tts),
            stt_match: MatchType::parse(&stt),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::repositories::tests::setup_test_pool;

    fn costs(llm: f64) -> CallCosts {
        CallCosts {
            total_llm_cost: llm,
            total_tts_cost: 0.02,
            total_stt_cost: 0.0077,
            currency: "USD".to_string(),
            llm_match: MatchType::Family,
            tts_match: MatchType::Exact,
            stt_match: MatchType::NotFound,
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let pool = setup_test_pool().await;
        upsert_call_costs(&pool, "call-1", &costs(0.5)).await.unwrap();
        let stored = get_call_costs(&pool, "call-1").await.unwrap().unwrap();
        assert_eq!(stored, costs(0.5));
    }

    #[tokio::test]
    async fn test_upsert_replaces() {
        let pool = setup_test_pool().await;
        upsert_call_costs(&pool, "call-1", &costs(0.5)).await.unwrap();
        upsert_call_costs(&pool, "call-1", &costs(0.75)).await.unwrap();
        let stored = get_call_costs(&pool, "call-1").await.unwrap().unwrap();
        assert_eq!(stored.total_llm_cost, 0.75);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let pool = setup_test_pool().await;
        assert!(get_call_costs(&pool, "nope").await.unwrap().is_none());
    }
}
