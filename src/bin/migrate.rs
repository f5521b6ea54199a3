use foodlink::config::Config;
use foodlink::db;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if it exists
    dotenvy::dotenv().ok();

    println!("Starting database migration...");
    let config = Config::from_env()?;
    println!("Opening database at {}", config.database_url);

    // init_pool applies migrations/init.sql; every statement is IF NOT EXISTS.
    let pool = db::init_pool(&config).await?;

    let tables = db::list_tables(&pool).await?;
    for table in &tables {
        println!("  - {}", table);
    }
    println!("Migration complete ({} tables).", tables.len());
    Ok(())
}
