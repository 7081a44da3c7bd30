//! Test fixture: schema, system accounts, and a per-test asset + user
//!
//! Each fixture creates its own asset code and user, so tests stay isolated
//! from each other even though they share the system accounts and run in
//! parallel against the same database.

use rust_decimal::Decimal;
use shared::models::AccountKind;
use sqlx::PgPool;
use uuid::Uuid;
use wallet_engine::{Config, LedgerEngine, RetryPolicy};

pub struct TestWallet {
    pub engine: LedgerEngine,
    pub pool: PgPool,
    pub asset_code: String,
    pub asset_id: Uuid,
    pub user_id: String,
    pub user_account: Uuid,
    pub treasury_account: Uuid,
    pub revenue_account: Uuid,
    pub bonus_account: Uuid,
    pub treasury_seed: Decimal,
    pub user_seed: Decimal,
    pub bonus_seed: Decimal,
}

/// Contention-tolerant config for test runs: same semantics, tighter
/// backoff, more headroom on attempts
pub fn test_config() -> Config {
    Config {
        min_connections: 2,
        max_connections: 20,
        retry: RetryPolicy {
            max_attempts: 10,
            base_backoff_ms: 20,
            jitter_ms: 20,
        },
        ..Config::default()
    }
}

impl TestWallet {
    pub async fn new(treasury_seed: Decimal, user_seed: Decimal) -> Self {
        Self::with_decimals(treasury_seed, user_seed, 8).await
    }

    pub async fn with_decimals(
        treasury_seed: Decimal,
        user_seed: Decimal,
        decimals: i32,
    ) -> Self {
        let _ = dotenvy::dotenv();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "wallet_engine=debug".into()),
            )
            .try_init();

        let database_url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
        let config = test_config();
        let pool = wallet_engine::store::connect(&database_url, &config)
            .await
            .expect("failed to connect to test database");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("failed to run migrations");

        let treasury_account = ensure_system_account(&pool, AccountKind::SystemTreasury).await;
        let revenue_account = ensure_system_account(&pool, AccountKind::SystemRevenue).await;
        let bonus_account = ensure_system_account(&pool, AccountKind::SystemBonus).await;

        // Unique asset and user per fixture
        let suffix = Uuid::new_v4().simple().to_string();
        let asset_code = format!("GOLD_{suffix}");
        let user_id = format!("user_{suffix}");

        let asset_id: Uuid = sqlx::query_scalar(
            "INSERT INTO asset_types (code, name, decimals) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&asset_code)
        .bind("Gold Coin")
        .bind(decimals)
        .fetch_one(&pool)
        .await
        .expect("failed to create test asset");

        let user_account: Uuid = sqlx::query_scalar(
            "INSERT INTO accounts (account_type_id, user_id, name)
             VALUES ((SELECT id FROM account_types WHERE code = 'USER'), $1, $2)
             RETURNING id",
        )
        .bind(&user_id)
        .bind(format!("Wallet of {user_id}"))
        .fetch_one(&pool)
        .await
        .expect("failed to create test user account");

        let bonus_seed = Decimal::from(1_000_000);
        seed_balance(&pool, treasury_account, asset_id, treasury_seed).await;
        seed_balance(&pool, bonus_account, asset_id, bonus_seed).await;
        seed_balance(&pool, user_account, asset_id, user_seed).await;

        let engine = LedgerEngine::new(pool.clone(), config);
        Self {
            engine,
            pool,
            asset_code,
            asset_id,
            user_id,
            user_account,
            treasury_account,
            revenue_account,
            bonus_account,
            treasury_seed,
            user_seed,
            bonus_seed,
        }
    }

    /// Unique idempotency key scoped to this fixture
    pub fn key(&self, tag: &str) -> String {
        format!("{tag}-{}", self.asset_code)
    }

    /// Cached balance of `(account, asset)`, zero when the row is missing
    pub async fn cached_balance(&self, account_id: Uuid) -> Decimal {
        sqlx::query_scalar(
            "SELECT balance FROM balance_cache WHERE account_id = $1 AND asset_type_id = $2",
        )
        .bind(account_id)
        .bind(self.asset_id)
        .fetch_optional(&self.pool)
        .await
        .expect("balance query failed")
        .unwrap_or(Decimal::ZERO)
    }

    pub async fn header_count(&self, idempotency_key: &str) -> i64 {
        sqlx::query_scalar("SELECT count(*) FROM transactions WHERE idempotency_key = $1")
            .bind(idempotency_key)
            .fetch_one(&self.pool)
            .await
            .expect("header count query failed")
    }

    pub async fn entry_count_for_asset(&self) -> i64 {
        sqlx::query_scalar("SELECT count(*) FROM ledger_entries WHERE asset_type_id = $1")
            .bind(self.asset_id)
            .fetch_one(&self.pool)
            .await
            .expect("entry count query failed")
    }

    /// Seed value this fixture wrote for the account, for invariant checks
    pub fn seed_of(&self, account_id: Uuid) -> Decimal {
        if account_id == self.treasury_account {
            self.treasury_seed
        } else if account_id == self.bonus_account {
            self.bonus_seed
        } else if account_id == self.user_account {
            self.user_seed
        } else {
            Decimal::ZERO
        }
    }
}

/// Find or create the single system account of the given kind
///
/// Guarded by an advisory lock so parallel fixtures agree on one account.
async fn ensure_system_account(pool: &PgPool, kind: AccountKind) -> Uuid {
    let mut tx = pool.begin().await.expect("begin failed");
    sqlx::query("SELECT pg_advisory_xact_lock(874501)")
        .execute(&mut *tx)
        .await
        .expect("advisory lock failed");

    let existing: Option<Uuid> = sqlx::query_scalar(
        "SELECT a.id FROM accounts a
         JOIN account_types at ON at.id = a.account_type_id
         WHERE at.code = $1
         ORDER BY a.created_at
         LIMIT 1",
    )
    .bind(kind.code())
    .fetch_optional(&mut *tx)
    .await
    .expect("system account lookup failed");

    let id = match existing {
        Some(id) => id,
        None => sqlx::query_scalar(
            "INSERT INTO accounts (account_type_id, name)
             VALUES ((SELECT id FROM account_types WHERE code = $1), $2)
             RETURNING id",
        )
        .bind(kind.code())
        .bind(kind.code())
        .fetch_one(&mut *tx)
        .await
        .expect("system account insert failed"),
    };
    tx.commit().await.expect("commit failed");
    id
}

async fn seed_balance(pool: &PgPool, account_id: Uuid, asset_id: Uuid, balance: Decimal) {
    sqlx::query(
        "INSERT INTO balance_cache (account_id, asset_type_id, balance)
         VALUES ($1, $2, $3)
         ON CONFLICT (account_id, asset_type_id) DO UPDATE SET balance = EXCLUDED.balance",
    )
    .bind(account_id)
    .bind(asset_id)
    .bind(balance)
    .execute(pool)
    .await
    .expect("failed to seed balance");
}
