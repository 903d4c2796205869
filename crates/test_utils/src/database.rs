//! Database Test Utilities
//!
//! Starts a throwaway PostgreSQL container, applies the embedded migrations
//! and seeds the rows the repositories read: branches, the standard chart,
//! account mappings, cashier limits and the standard catalog.
//!
//! Tests that use it need Docker and are `#[ignore]`d by default; run them
//! with `cargo test -- --ignored`.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use core_kernel::{BranchId, Currency};
use domain_ledger::{AccountMappings, RetailChartOfAccounts};

use crate::fixtures::IdFixtures;

const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "retail_core_test";

type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Connection settings of a test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A migrated PostgreSQL container; dropped with the value
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a container and applies the schema migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or the migrations fail
    pub async fn new() -> TestResult<Self> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr(
                "database system is ready to accept connections",
            ))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let config = TestDatabaseConfig {
            host: container.get_host().await?.to_string(),
            port: container.get_host_port_ipv4(5432).await?,
            ..TestDatabaseConfig::default()
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.connection_url())
            .await?;

        infra_db::run_migrations(&pool).await?;

        Ok(Self {
            _container: container,
            config,
            pool,
        })
    }

    /// Starts a container seeded with [`IdFixtures::BRANCH`] (UTC) and
    /// [`IdFixtures::OTHER_BRANCH`] (Asia/Riyadh), both fully mapped
    pub async fn seeded() -> TestResult<Self> {
        let db = Self::new().await?;
        db.seed_branch(IdFixtures::BRANCH, "MAIN", "UTC").await?;
        db.seed_branch(IdFixtures::OTHER_BRANCH, "NORTH", "Asia/Riyadh").await?;
        db.seed_chart(Currency::USD).await?;
        db.seed_mappings(IdFixtures::BRANCH).await?;
        db.seed_mappings(IdFixtures::OTHER_BRANCH).await?;
        db.seed_catalog().await?;
        db.seed_cashier_limits().await?;
        Ok(db)
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn seed_branch(&self, id: BranchId, code: &str, timezone: &str) -> TestResult<()> {
        sqlx::query("INSERT INTO branches (id, code, name, timezone) VALUES ($1, $2, $2, $3)")
            .bind(id.value())
            .bind(code)
            .bind(timezone)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Inserts the standard chart of accounts with its fixed ids
    pub async fn seed_chart(&self, currency: Currency) -> TestResult<()> {
        for account in RetailChartOfAccounts::create_standard_accounts() {
            sqlx::query(
                r#"
                INSERT INTO accounts (id, code, name, account_type, parent_id, currency)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(account.id.value())
            .bind(&account.code)
            .bind(&account.name)
            .bind(account.account_type.as_str())
            .bind(account.parent_id.map(|p| p.value()))
            .bind(currency.code())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    pub async fn seed_mappings(&self, branch_id: BranchId) -> TestResult<()> {
        for (branch_id, module, key, account_id) in AccountMappings::standard(branch_id).iter() {
            sqlx::query(
                "INSERT INTO account_mappings (branch_id, module, key, account_id) VALUES ($1, $2, $3, $4)",
            )
            .bind(branch_id.value())
            .bind(module.as_str())
            .bind(key.as_str())
            .bind(account_id.value())
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// The products and taxes of [`CatalogFixtures::standard`](crate::CatalogFixtures::standard)
    pub async fn seed_catalog(&self) -> TestResult<()> {
        sqlx::raw_sql(
            r#"
            INSERT INTO taxes (id, name, rate, mode) VALUES
                (1, 'VAT 15%', 15, 'exclusive'),
                (2, 'VAT 15% incl.', 15, 'inclusive');
            INSERT INTO products (id, sku, name, price, cost, tax_id) VALUES
                (1, 'WIDGET', 'Widget', 10.00, 6.00, 1),
                (2, 'GADGET', 'Gadget', 115.00, 80.00, 2),
                (3, 'GIFT', 'Gift card', 25.00, NULL, NULL);
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The limits of [`CatalogFixtures::cashier_policy`](crate::CatalogFixtures::cashier_policy)
    pub async fn seed_cashier_limits(&self) -> TestResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cashier_limits (branch_id, user_id, max_discount_percent, daily_discount_limit)
            VALUES ($1, $2, 20, 50)
            "#,
        )
        .bind(IdFixtures::BRANCH.value())
        .bind(IdFixtures::CASHIER.value())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Inserts a purchase of the standard branch; returns its id
    pub async fn seed_purchase(&self, grand_total: rust_decimal::Decimal) -> TestResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO purchases (branch_id, purchase_date, currency, sub_total, grand_total, is_paid)
            VALUES ($1, DATE '2025-03-05', 'USD', $2, $2, TRUE)
            RETURNING id
            "#,
        )
        .bind(IdFixtures::BRANCH.value())
        .bind(grand_total)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    /// Number of rows in `table`
    pub async fn count(&self, table: &str) -> TestResult<i64> {
        let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_connection_url() {
        let url = TestDatabaseConfig::default().connection_url();

        assert!(url.starts_with("postgres://"));
        assert!(url.contains(POSTGRES_USER));
        assert!(url.ends_with(POSTGRES_DB));
    }
}
