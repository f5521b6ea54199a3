use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, Row};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;

pub mod models;

use models::{Donor, DonorStatus, Event, HistoryEntry, NewDonor, Ngo};

pub type DbPool = Pool<SqliteConnectionManager>;

const SCHEMA: &str = include_str!("../../migrations/init.sql");

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, DbError>;

pub async fn init_pool(config: &crate::config::Config) -> anyhow::Result<DbPool> {
    init_pool_at(&config.database_url, config.db_pool_size).await
}

/// Open (creating if needed) the SQLite file at `path` and apply the schema.
pub async fn init_pool_at(path: impl AsRef<Path>, max_size: u32) -> anyhow::Result<DbPool> {
    let manager = SqliteConnectionManager::file(path.as_ref()).with_init(|conn| {
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    });
    let pool = Pool::builder()
        .max_size(max_size)
        .connection_timeout(Duration::from_secs(60))
        .build(manager)
        .map_err(|e| anyhow::anyhow!("Failed to create DB pool: {}", e))?;

    with_conn(&pool, |conn| migrate(conn)).await?;
    Ok(pool)
}

/// Apply the schema; every statement is `IF NOT EXISTS` so this is safe to repeat.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

pub async fn list_tables(pool: &DbPool) -> Result<Vec<String>> {
    with_conn(pool, |conn| {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    })
    .await
}

/// Check out one connection for the duration of `f` on the blocking pool.
async fn with_conn<T, F>(pool: &DbPool, f: F) -> Result<T>
where
    F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || {
        let mut conn = pool.get()?;
        f(&mut conn)
    })
    .await?
}

const DONOR_COLUMNS: &str = "id, name, contact, address, email, food_type, servings, prepared_time, latitude, longitude, status, notified, created_at";

fn donor_from_row(row: &Row<'_>) -> rusqlite::Result<Donor> {
    let status: String = row.get(10)?;
    Ok(Donor {
        id: row.get(0)?,
        name: row.get(1)?,
        contact: row.get(2)?,
        address: row.get(3)?,
        email: row.get(4)?,
        food_type: row.get(5)?,
        servings: row.get(6)?,
        prepared_time: row.get(7)?,
        latitude: row.get(8)?,
        longitude: row.get(9)?,
        status: DonorStatus::parse(&status),
        notified: row.get(11)?,
        created_at: row.get(12)?,
    })
}

pub async fn add_donor(pool: &DbPool, donor: NewDonor, now: DateTime<Utc>) -> Result<i64> {
    with_conn(pool, move |conn| {
        conn.execute(
            "INSERT INTO donors (name, contact, address, email, food_type, servings, prepared_time, latitude, longitude, status, notified, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 0, ?11)",
            params![
                donor.name,
                donor.contact,
                donor.address,
                donor.email,
                donor.food_type,
                donor.servings,
                donor.prepared_time,
                donor.latitude,
                donor.longitude,
                DonorStatus::Active.as_str(),
                now,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
    .await
}

/// Active donors, newest first.
pub async fn list_donors(pool: &DbPool) -> Result<Vec<Donor>> {
    with_conn(pool, |conn| {
        let sql = format!("SELECT {DONOR_COLUMNS} FROM donors ORDER BY created_at DESC, id DESC");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], donor_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })
    .await
}

pub async fn get_donor(pool: &DbPool, id: i64) -> Result<Option<Donor>> {
    with_conn(pool, move |conn| {
        let sql = format!("SELECT {DONOR_COLUMNS} FROM donors WHERE id = ?1");
        let donor = conn.query_row(&sql, [id], donor_from_row).optional()?;
        Ok(donor)
    })
    .await
}

pub async fn delete_donor(pool: &DbPool, id: i64) -> Result<bool> {
    with_conn(pool, move |conn| {
        let affected = conn.execute("DELETE FROM donors WHERE id = ?1", [id])?;
        Ok(affected > 0)
    })
    .await
}

pub async fn set_donor_status(pool: &DbPool, id: i64, status: DonorStatus) -> Result<bool> {
    with_conn(pool, move |conn| {
        let affected = conn.execute(
            "UPDATE donors SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        Ok(affected > 0)
    })
    .await
}

pub async fn mark_notified(pool: &DbPool, ids: Vec<i64>) -> Result<usize> {
    if ids.is_empty() {
        return Ok(0);
    }
    with_conn(pool, move |conn| {
        let placeholders = vec!["?"; ids.len()].join(",");
        let sql = format!("UPDATE donors SET notified = 1 WHERE id IN ({placeholders})");
        let affected = conn.execute(&sql, rusqlite::params_from_iter(ids.iter()))?;
        Ok(affected)
    })
    .await
}

/// Move a donor from the active table into the history ledger.
///
/// Both writes share one transaction so a donor is never in both tables.
/// Returns `false` (and writes nothing) when the donor is no longer active.
pub async fn settle_donor(pool: &DbPool, donor: Donor, points: i64, now: DateTime<Utc>) -> Result<bool> {
    with_conn(pool, move |conn| {
        let tx = conn.transaction()?;
        let removed = tx.execute("DELETE FROM donors WHERE id = ?1", [donor.id])?;
        if removed == 0 {
            return Ok(false);
        }
        tx.execute(
            "INSERT INTO donation_history (donor_name, email, food_type, servings, address, points, donation_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                donor.name,
                donor.email,
                donor.food_type,
                donor.servings,
                donor.address,
                points,
                now,
            ],
        )?;
        tx.commit()?;
        Ok(true)
    })
    .await
}

/// History entries, newest first.
pub async fn list_history(pool: &DbPool) -> Result<Vec<HistoryEntry>> {
    with_conn(pool, |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, donor_name, email, food_type, servings, address, points, donation_date
             FROM donation_history ORDER BY donation_date DESC, id DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(HistoryEntry {
                    id: row.get(0)?,
                    donor_name: row.get(1)?,
                    email: row.get(2)?,
                    food_type: row.get(3)?,
                    servings: row.get(4)?,
                    address: row.get(5)?,
                    points: row.get(6)?,
                    donation_date: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })
    .await
}

const NGO_COLUMNS: &str = "id, ngo_name, contact, address, secret_key, current_latitude, current_longitude, current_address, created_at";

fn ngo_from_row(row: &Row<'_>) -> rusqlite::Result<Ngo> {
    Ok(Ngo {
        id: row.get(0)?,
        ngo_name: row.get(1)?,
        contact: row.get(2)?,
        address: row.get(3)?,
        secret_key: row.get(4)?,
        current_latitude: row.get(5)?,
        current_longitude: row.get(6)?,
        current_address: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// `secret_key` must already be normalized (see `auth::normalize_secret_key`).
pub async fn create_ngo(
    pool: &DbPool,
    ngo_name: &str,
    contact: &str,
    address: &str,
    secret_key: &str,
    now: DateTime<Utc>,
) -> Result<i64> {
    let (ngo_name, contact, address, secret_key) = (
        ngo_name.to_string(),
        contact.to_string(),
        address.to_string(),
        secret_key.to_string(),
    );
    with_conn(pool, move |conn| {
        conn.execute(
            "INSERT INTO ngos (ngo_name, contact, address, secret_key, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![ngo_name, contact, address, secret_key, now],
        )?;
        Ok(conn.last_insert_rowid())
    })
    .await
}

pub async fn ngo_exists(pool: &DbPool, ngo_name: &str, secret_key: &str) -> Result<bool> {
    let (ngo_name, secret_key) = (ngo_name.to_string(), secret_key.to_string());
    with_conn(pool, move |conn| {
        let found = conn
            .query_row(
                "SELECT id FROM ngos WHERE ngo_name = ?1 OR secret_key = ?2 LIMIT 1",
                params![ngo_name, secret_key],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    })
    .await
}

pub async fn list_ngos(pool: &DbPool) -> Result<Vec<Ngo>> {
    with_conn(pool, |conn| {
        let sql = format!("SELECT {NGO_COLUMNS} FROM ngos ORDER BY id");
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([], ngo_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })
    .await
}

pub async fn find_ngo_by_secret_key(pool: &DbPool, secret_key: &str) -> Result<Option<Ngo>> {
    let secret_key = secret_key.to_string();
    with_conn(pool, move |conn| {
        let sql = format!("SELECT {NGO_COLUMNS} FROM ngos WHERE secret_key = ?1");
        let ngo = conn.query_row(&sql, [secret_key], ngo_from_row).optional()?;
        Ok(ngo)
    })
    .await
}

pub async fn update_ngo_location(
    pool: &DbPool,
    id: i64,
    latitude: f64,
    longitude: f64,
    address: &str,
) -> Result<bool> {
    let address = address.to_string();
    with_conn(pool, move |conn| {
        let affected = conn.execute(
            "UPDATE ngos SET current_latitude = ?1, current_longitude = ?2, current_address = ?3 WHERE id = ?4",
            params![latitude, longitude, address, id],
        )?;
        Ok(affected > 0)
    })
    .await
}

#[allow(clippy::too_many_arguments)]
pub async fn add_event(
    pool: &DbPool,
    event_name: &str,
    event_info: &str,
    donor_name: &str,
    contact: &str,
    address: &str,
    end_time: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<i64> {
    let fields = [event_name, event_info, donor_name, contact, address].map(str::to_string);
    with_conn(pool, move |conn| {
        let [event_name, event_info, donor_name, contact, address] = fields;
        conn.execute(
            "INSERT INTO events (event_name, event_info, donor_name, contact, address, end_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![event_name, event_info, donor_name, contact, address, end_time, now],
        )?;
        Ok(conn.last_insert_rowid())
    })
    .await
}

/// Events ordered by the soonest end time.
pub async fn list_events(pool: &DbPool) -> Result<Vec<Event>> {
    with_conn(pool, |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, event_name, event_info, donor_name, contact, address, end_time, created_at
             FROM events ORDER BY end_time ASC, id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Event {
                    id: row.get(0)?,
                    event_name: row.get(1)?,
                    event_info: row.get(2)?,
                    donor_name: row.get(3)?,
                    contact: row.get(4)?,
                    address: row.get(5)?,
                    end_time: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn temp_pool() -> (tempfile::TempDir, DbPool) {
        let dir = tempfile::tempdir().expect("tempdir");
        let pool = init_pool_at(dir.path().join("test.db"), 2).await.expect("init pool");
        (dir, pool)
    }

    fn sample_donor(name: &str) -> NewDonor {
        NewDonor {
            name: name.to_string(),
            contact: "9876543210".to_string(),
            address: "MG Road, Bengaluru".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            food_type: "Rice".to_string(),
            servings: 5,
            prepared_time: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            latitude: 12.97,
            longitude: 77.59,
        }
    }

    #[tokio::test]
    async fn schema_is_idempotent() {
        let (_dir, pool) = temp_pool().await;
        with_conn(&pool, |conn| migrate(conn)).await.expect("second migrate");
        let tables = list_tables(&pool).await.expect("tables");
        assert_eq!(tables, vec!["donation_history", "donors", "events", "ngos"]);
    }

    #[tokio::test]
    async fn donors_list_newest_first() {
        let (_dir, pool) = temp_pool().await;
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let first = add_donor(&pool, sample_donor("Asha"), t0).await.unwrap();
        let second = add_donor(&pool, sample_donor("Ravi"), t0 + chrono::Duration::minutes(5)).await.unwrap();

        let donors = list_donors(&pool).await.unwrap();
        assert_eq!(donors.iter().map(|d| d.id).collect::<Vec<_>>(), vec![second, first]);
        assert_eq!(donors[0].status, DonorStatus::Active);
        assert!(!donors[0].notified);
    }

    #[tokio::test]
    async fn settle_moves_donor_exactly_once() {
        let (_dir, pool) = temp_pool().await;
        let id = add_donor(&pool, sample_donor("Asha"), Utc::now()).await.unwrap();
        let donor = get_donor(&pool, id).await.unwrap().expect("donor");

        assert!(settle_donor(&pool, donor.clone(), 10, Utc::now()).await.unwrap());
        assert!(!settle_donor(&pool, donor, 10, Utc::now()).await.unwrap());

        assert!(get_donor(&pool, id).await.unwrap().is_none());
        let history = list_history(&pool).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].donor_name, "Asha");
        assert_eq!(history[0].points, 10);
    }

    #[tokio::test]
    async fn status_and_notified_updates() {
        let (_dir, pool) = temp_pool().await;
        let a = add_donor(&pool, sample_donor("Asha"), Utc::now()).await.unwrap();
        let b = add_donor(&pool, sample_donor("Ravi"), Utc::now()).await.unwrap();

        assert!(set_donor_status(&pool, a, DonorStatus::Selected).await.unwrap());
        assert!(!set_donor_status(&pool, 999, DonorStatus::Selected).await.unwrap());
        assert_eq!(mark_notified(&pool, vec![a, b, 999]).await.unwrap(), 2);
        assert_eq!(mark_notified(&pool, vec![]).await.unwrap(), 0);

        let donor = get_donor(&pool, a).await.unwrap().unwrap();
        assert_eq!(donor.status, DonorStatus::Selected);
        assert!(donor.notified);
    }

    #[tokio::test]
    async fn ngo_location_update_and_lookup() {
        let (_dir, pool) = temp_pool().await;
        let id = create_ngo(&pool, "Annadaan", "080-1234", "Jayanagar", "mysecret", Utc::now()).await.unwrap();

        assert!(ngo_exists(&pool, "Annadaan", "other").await.unwrap());
        assert!(ngo_exists(&pool, "Other", "mysecret").await.unwrap());
        assert!(!ngo_exists(&pool, "Other", "other").await.unwrap());

        assert!(update_ngo_location(&pool, id, 12.9, 77.6, "Koramangala").await.unwrap());
        let ngo = find_ngo_by_secret_key(&pool, "mysecret").await.unwrap().expect("ngo");
        assert_eq!(ngo.effective_address(), "Koramangala");
        assert_eq!(ngo.current_latitude, Some(12.9));
    }

    #[tokio::test]
    async fn events_ordered_by_end_time() {
        let (_dir, pool) = temp_pool().await;
        let late = Utc.with_ymd_and_hms(2026, 5, 2, 18, 0, 0).unwrap();
        let early = Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap();
        add_event(&pool, "Wedding", "Leftover buffet", "Meera", "999", "Hall A", late, Utc::now()).await.unwrap();
        add_event(&pool, "Fest", "Canteen surplus", "Arun", "888", "Campus", early, Utc::now()).await.unwrap();

        let events = list_events(&pool).await.unwrap();
        assert_eq!(events[0].event_name, "Fest");
        assert_eq!(events[1].end_time, late);
    }
}
