// Database connection and pool management.
// This module handles SQLite database connections using sqlx.

use anyhow::Result;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::path::Path;

pub struct DatabaseConnection {
    pool: SqlitePool,
}

impl DatabaseConnection {
    /// Open (creating the file if needed) and pool a SQLite database.
    pub async fn new(database_url: &str) -> Result<Self> {
        let db_path = if database_url.starts_with("sqlite://") {
            database_url.trim_start_matches("sqlite://")
        } else if database_url.starts_with("sqlite:") {
            database_url.trim_start_matches("sqlite:")
        } else {
            database_url
        };

        if db_path != ":memory:" {
            if let Some(parent) = Path::new(db_path).parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
            if !Path::new(db_path).exists() {
                std::fs::File::create(db_path)?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool, flushing outstanding writes.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create tables and indexes if they do not exist yet.
    pub async fn migrate(&self) -> Result<()> {
        let create_listings_sql = r#"
            CREATE TABLE IF NOT EXISTS job_listings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                company TEXT,
                url TEXT NOT NULL UNIQUE,
                location TEXT,
                salary TEXT,
                page INTEGER,
                scraped_at TEXT,
                crawl_status TEXT NOT NULL DEFAULT 'NEW'
            )
        "#;

        let create_descriptions_sql = r#"
            CREATE TABLE IF NOT EXISTS job_descriptions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                body TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'NEW'
            )
        "#;

        let create_fields_sql = r#"
            CREATE TABLE IF NOT EXISTS job_fields (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL UNIQUE,
                responsibilities TEXT,
                requirements TEXT,
                company_name TEXT,
                company_address TEXT,
                application_email TEXT,
                benefits TEXT,
                compensation TEXT,
                extracted_at TEXT
            )
        "#;

        let create_indexes_sql = r#"
            CREATE INDEX IF NOT EXISTS idx_listings_crawl_status ON job_listings (crawl_status);
            CREATE INDEX IF NOT EXISTS idx_descriptions_status ON job_descriptions (status);
        "#;

        sqlx::query(create_listings_sql).execute(&self.pool).await?;
        sqlx::query(create_descriptions_sql).execute(&self.pool).await?;
        sqlx::query(create_fields_sql).execute(&self.pool).await?;
        sqlx::query(create_indexes_sql).execute(&self.pool).await?;

        Ok(())
    }
}
