use async_trait::async_trait;

use super::types::Solution;
use crate::db::repos::solutions as solution_repo;
use crate::db::DbPool;
use crate::error::AppError;

/// Durable ticket id -> latest solution mapping. Last write wins.
#[async_trait]
pub trait SolutionStore: Send + Sync {
    /// `Ok(None)` when nothing was ever saved for the ticket.
    async fn get(&self, ticket_id: i64) -> Result<Option<Solution>, AppError>;

    /// Insert or overwrite the whole solution.
    async fn save(&self, ticket_id: i64, solution: &Solution) -> Result<(), AppError>;
}

/// SQLite-backed store. Queries run on the blocking pool so webhook tasks
/// never stall the runtime on disk I/O.
#[derive(Clone)]
pub struct SqliteSolutionStore {
    pool: DbPool,
}

impl SqliteSolutionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn join_err(e: tokio::task::JoinError) -> AppError {
    AppError::Internal(format!("Store task failed: {e}"))
}

#[async_trait]
impl SolutionStore for SqliteSolutionStore {
    async fn get(&self, ticket_id: i64) -> Result<Option<Solution>, AppError> {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || solution_repo::get(&pool, ticket_id))
            .await
            .map_err(join_err)?
    }

    async fn save(&self, ticket_id: i64, solution: &Solution) -> Result<(), AppError> {
        let pool = self.pool.clone();
        let solution = solution.clone();
        tokio::task::spawn_blocking(move || solution_repo::upsert(&pool, ticket_id, &solution))
            .await
            .map_err(join_err)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::engine::triage::fallback_solution;

    #[tokio::test]
    async fn test_sqlite_store_round_trip() {
        let store = SqliteSolutionStore::new(init_test_db().unwrap());
        assert_eq!(store.get(1).await.unwrap(), None);

        let mut solution = fallback_solution("Printer offline");
        solution.solution_steps = vec!["Restart spooler service".into()];
        store.save(1, &solution).await.unwrap();

        assert_eq!(store.get(1).await.unwrap(), Some(solution));
        assert_eq!(store.get(2).await.unwrap(), None);
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(64))]

        #[test]
        fn confidence_survives_store_round_trip(
            confidences in proptest::collection::vec(0.0f64..=1.0, 1..32)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let store = SqliteSolutionStore::new(init_test_db().unwrap());

            rt.block_on(async {
                for (ticket_id, confidence) in confidences.iter().enumerate() {
                    let mut solution = fallback_solution("Disk at 100%");
                    solution.confidence = *confidence;
                    store.save(ticket_id as i64, &solution).await.unwrap();

                    let loaded = store.get(ticket_id as i64).await.unwrap().unwrap();
                    proptest::prop_assert_eq!(loaded.confidence.to_bits(), confidence.to_bits());
                    proptest::prop_assert_eq!(loaded, solution);
                }
                Ok(())
            })?;
        }
    }
}
