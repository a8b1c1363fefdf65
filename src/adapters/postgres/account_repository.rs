//! PostgreSQL implementation of AccountRepository.
//!
//! Accounts are one flat row each; the billing sub-record and the cached
//! payment method are stored as nullable columns.

use crate::domain::billing::{
    Account, BillingDetails, PaymentMethodSummary, SubscriptionChange, SubscriptionPlan,
};
use crate::domain::foundation::{AccountId, DomainError, ErrorCode, Timestamp};
use crate::ports::AccountRepository;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgQueryResult;
use sqlx::PgPool;

/// PostgreSQL implementation of the AccountRepository port.
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    /// Creates a new PostgresAccountRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const SELECT_ACCOUNT: &str = r#"
    SELECT id, email, stripe_customer_id, subscription, max_leads,
           billing_status, stripe_price_id, stripe_subscription_id, next_billing_date, amount,
           pm_type, pm_last4, pm_brand, pm_exp_month, pm_exp_year,
           created_at, updated_at
    FROM accounts
"#;

/// Database row representation of an account.
#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: String,
    email: Option<String>,
    stripe_customer_id: Option<String>,
    subscription: String,
    max_leads: i32,
    billing_status: Option<String>,
    stripe_price_id: Option<String>,
    stripe_subscription_id: Option<String>,
    next_billing_date: Option<DateTime<Utc>>,
    amount: Option<i64>,
    pm_type: Option<String>,
    pm_last4: Option<String>,
    pm_brand: Option<String>,
    pm_exp_month: Option<i32>,
    pm_exp_year: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = DomainError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let id = AccountId::new(row.id)
            .map_err(|e| DomainError::database(format!("Invalid account id: {}", e)))?;
        let subscription = parse_plan(&row.subscription)?;
        let max_leads = u32::try_from(row.max_leads).map_err(|_| {
            DomainError::database(format!("Invalid lead quota: {}", row.max_leads))
        })?;

        let payment_method = row.pm_type.map(|method_type| PaymentMethodSummary {
            method_type,
            last4: row.pm_last4,
            brand: row.pm_brand,
            exp_month: row.pm_exp_month.and_then(|m| u32::try_from(m).ok()),
            exp_year: row.pm_exp_year.and_then(|y| u32::try_from(y).ok()),
        });

        Ok(Account {
            id,
            email: row.email,
            stripe_customer_id: row.stripe_customer_id,
            subscription,
            max_leads,
            billing: BillingDetails {
                status: row.billing_status,
                stripe_price_id: row.stripe_price_id,
                stripe_subscription_id: row.stripe_subscription_id,
                next_billing_date: row.next_billing_date.map(Timestamp::from_datetime),
                amount: row.amount,
                payment_method,
            },
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn parse_plan(s: &str) -> Result<SubscriptionPlan, DomainError> {
    SubscriptionPlan::from_name(s).ok_or_else(|| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid subscription value: {}", s),
        )
    })
}

fn leads_column(max_leads: u32) -> i32 {
    i32::try_from(max_leads).unwrap_or(i32::MAX)
}

fn ensure_found(result: PgQueryResult, id: &AccountId) -> Result<(), DomainError> {
    if result.rows_affected() == 0 {
        return Err(
            DomainError::new(ErrorCode::AccountNotFound, format!("Account not found: {}", id))
                .with_detail("account_id", id.as_str()),
        );
    }
    Ok(())
}

fn db_error(action: &str, e: sqlx::Error) -> DomainError {
    DomainError::database(format!("Failed to {}: {}", action, e))
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn find_by_id(&self, id: &AccountId) -> Result<Option<Account>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_ACCOUNT))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("find account", e))?;

        row.map(Account::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, DomainError> {
        let row: Option<AccountRow> = sqlx::query_as(&format!(
            "{} WHERE lower(email) = lower($1) ORDER BY created_at ASC LIMIT 1",
            SELECT_ACCOUNT
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("find account by email", e))?;

        row.map(Account::try_from).transpose()
    }

    async fn save(&self, account: &Account) -> Result<(), DomainError> {
        let pm = account.billing.payment_method.as_ref();

        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, email, stripe_customer_id, subscription, max_leads,
                billing_status, stripe_price_id, stripe_subscription_id, next_billing_date, amount,
                pm_type, pm_last4, pm_brand, pm_exp_month, pm_exp_year,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            ON CONFLICT (id) DO UPDATE SET
                email = EXCLUDED.email,
                stripe_customer_id = EXCLUDED.stripe_customer_id,
                subscription = EXCLUDED.subscription,
                max_leads = EXCLUDED.max_leads,
                billing_status = EXCLUDED.billing_status,
                stripe_price_id = EXCLUDED.stripe_price_id,
                stripe_subscription_id = EXCLUDED.stripe_subscription_id,
                next_billing_date = EXCLUDED.next_billing_date,
                amount = EXCLUDED.amount,
                pm_type = EXCLUDED.pm_type,
                pm_last4 = EXCLUDED.pm_last4,
                pm_brand = EXCLUDED.pm_brand,
                pm_exp_month = EXCLUDED.pm_exp_month,
                pm_exp_year = EXCLUDED.pm_exp_year,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(account.id.as_str())
        .bind(&account.email)
        .bind(&account.stripe_customer_id)
        .bind(account.subscription.display_name())
        .bind(leads_column(account.max_leads))
        .bind(&account.billing.status)
        .bind(&account.billing.stripe_price_id)
        .bind(&account.billing.stripe_subscription_id)
        .bind(account.billing.next_billing_date.map(|t| *t.as_datetime()))
        .bind(account.billing.amount)
        .bind(pm.map(|p| p.method_type.clone()))
        .bind(pm.and_then(|p| p.last4.clone()))
        .bind(pm.and_then(|p| p.brand.clone()))
        .bind(pm.and_then(|p| p.exp_month).map(|m| m as i32))
        .bind(pm.and_then(|p| p.exp_year).map(|y| y as i32))
        .bind(account.created_at.as_datetime())
        .bind(account.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("save account", e))?;

        Ok(())
    }

    async fn set_stripe_customer_id(
        &self,
        id: &AccountId,
        customer_id: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            "UPDATE accounts SET stripe_customer_id = $2, updated_at = now() WHERE id = $1",
        )
        .bind(id.as_str())
        .bind(customer_id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("record customer reference", e))?;

        ensure_found(result, id)
    }

    async fn apply_subscription_change(
        &self,
        id: &AccountId,
        change: &SubscriptionChange,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                subscription = $2,
                max_leads = $3,
                billing_status = $4,
                stripe_price_id = $5,
                stripe_subscription_id = $6,
                next_billing_date = $7,
                amount = $8,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(change.plan.display_name())
        .bind(leads_column(change.max_leads))
        .bind(&change.status)
        .bind(&change.stripe_price_id)
        .bind(&change.stripe_subscription_id)
        .bind(change.next_billing_date.map(|t| *t.as_datetime()))
        .bind(change.amount)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("apply subscription change", e))?;

        ensure_found(result, id)
    }

    async fn set_payment_method(
        &self,
        id: &AccountId,
        summary: &PaymentMethodSummary,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE accounts SET
                pm_type = $2,
                pm_last4 = $3,
                pm_brand = $4,
                pm_exp_month = $5,
                pm_exp_year = $6,
                updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id.as_str())
        .bind(&summary.method_type)
        .bind(&summary.last4)
        .bind(&summary.brand)
        .bind(summary.exp_month.map(|m| m as i32))
        .bind(summary.exp_year.map(|y| y as i32))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("update payment method", e))?;

        ensure_found(result, id)
    }
}
