use rusqlite::{params, Row};

use crate::db::models::SolutionRecord;
use crate::db::DbPool;
use crate::engine::types::Solution;
use crate::error::AppError;

fn row_to_record(row: &Row) -> rusqlite::Result<SolutionRecord> {
    Ok(SolutionRecord {
        ticket_id: row.get("ticket_id")?,
        solution_json: row.get("solution_json")?,
        created_at: row.get("created_at")?,
    })
}

/// Get the raw stored row for a ticket. Returns None if never saved.
pub fn get_record(pool: &DbPool, ticket_id: i64) -> Result<Option<SolutionRecord>, AppError> {
    let conn = pool.get()?;
    let result = conn.query_row(
        "SELECT ticket_id, solution_json, created_at FROM ticket_solution WHERE ticket_id = ?1",
        params![ticket_id],
        row_to_record,
    );

    match result {
        Ok(record) => Ok(Some(record)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(AppError::Database(e)),
    }
}

/// Get the latest solution for a ticket.
///
/// A row whose JSON no longer decodes is reported as absent, so the ticket is
/// treated as having no plan on record.
pub fn get(pool: &DbPool, ticket_id: i64) -> Result<Option<Solution>, AppError> {
    let Some(record) = get_record(pool, ticket_id)? else {
        return Ok(None);
    };

    match serde_json::from_str::<Solution>(&record.solution_json) {
        Ok(solution) => Ok(Some(solution)),
        Err(e) => {
            tracing::warn!(ticket_id, error = %e, "Stored solution is unreadable, ignoring");
            Ok(None)
        }
    }
}

/// Insert or overwrite the solution for a ticket.
pub fn upsert(pool: &DbPool, ticket_id: i64, solution: &Solution) -> Result<(), AppError> {
    let conn = pool.get()?;
    let json = serde_json::to_string(solution)?;
    let now = chrono::Utc::now().to_rfc3339();
    conn.execute(
        "INSERT INTO ticket_solution (ticket_id, solution_json, created_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(ticket_id) DO UPDATE SET solution_json = ?2, created_at = ?3",
        params![ticket_id, json, now],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;
    use crate::engine::types::RiskLevel;

    fn sample(summary: &str) -> Solution {
        Solution {
            summary: summary.into(),
            probable_cause: "Spooler hung".into(),
            solution_steps: vec!["Restart spooler service".into(), "Clear print queue".into()],
            roll_back_plan: String::new(),
            risk_level: RiskLevel::Low,
            confidence: 0.85,
            labels: vec!["PRINT_SPOOLER_STALLED".into()],
            notes_for_ticket: "Restarted spooler.".into(),
        }
    }

    #[test]
    fn test_get_missing_is_none() {
        let pool = init_test_db().unwrap();
        assert_eq!(get(&pool, 404).unwrap(), None);
        assert!(get_record(&pool, 404).unwrap().is_none());
    }

    #[test]
    fn test_round_trip_and_overwrite() {
        let pool = init_test_db().unwrap();

        let first = sample("Printer offline");
        upsert(&pool, 7, &first).unwrap();
        assert_eq!(get(&pool, 7).unwrap(), Some(first));

        let second = sample("Printer still offline");
        upsert(&pool, 7, &second).unwrap();
        assert_eq!(get(&pool, 7).unwrap(), Some(second));

        let conn = pool.get().unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM ticket_solution", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_corrupt_row_reads_as_absent() {
        let pool = init_test_db().unwrap();
        {
            let conn = pool.get().unwrap();
            conn.execute(
                "INSERT INTO ticket_solution (ticket_id, solution_json) VALUES (9, 'not json')",
                [],
            )
            .unwrap();
        }
        assert!(get_record(&pool, 9).unwrap().is_some());
        assert_eq!(get(&pool, 9).unwrap(), None);
    }
}
