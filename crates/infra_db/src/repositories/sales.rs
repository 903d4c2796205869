//! Sales repository: the checkout transaction
//!
//! Checkout reads the cashier's limits, session and discount usage, locks
//! the products in the cart, prices the cart with `domain_pos::price_cart`
//! and writes the sale, its items and its payments in one transaction. The
//! `SaleCompleted` event is published only after commit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    ActorContext, BranchId, CustomerId, Money, PosSessionId, ProductId, SaleId, TaxId, Timezone,
    UserId, WarehouseId,
};
use domain_pos::{
    price_cart, CashierPolicy, CatalogSnapshot, CheckoutContext, CheckoutRequest,
    CheckoutSettings, LogSaleEventPublisher, NewSale, Product, Sale, SaleEvent,
    SaleEventPublisher, SaleItem, SalePayment, Tax,
};

use super::{branch_timezone, parse_column, parse_currency};
use crate::error::{DatabaseError, RepositoryError};

/// Repository for sales and the checkout transaction
#[derive(Clone)]
pub struct SalesRepository {
    pool: PgPool,
    publisher: Arc<dyn SaleEventPublisher>,
}

impl std::fmt::Debug for SalesRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesRepository").finish_non_exhaustive()
    }
}

impl SalesRepository {
    /// Creates a repository that publishes sale events to the log
    pub fn new(pool: PgPool) -> Self {
        Self::with_publisher(pool, Arc::new(LogSaleEventPublisher))
    }

    pub fn with_publisher(pool: PgPool, publisher: Arc<dyn SaleEventPublisher>) -> Self {
        Self { pool, publisher }
    }

    /// Runs a checkout for the acting cashier
    ///
    /// Locks taken, in order: the cashier's limits row (serializes one
    /// cashier's concurrent checkouts against the daily limit), the open
    /// session (shared, so it cannot close mid-checkout), then the products
    /// in ascending id order.
    ///
    /// # Errors
    ///
    /// Any [`domain_pos::CheckoutError`]; nothing is written for any of them.
    #[instrument(
        skip(self, request, ctx, settings),
        fields(branch_id = %ctx.branch_id, user_id = %ctx.user_id, items = request.items.len())
    )]
    pub async fn checkout(
        &self,
        request: &CheckoutRequest,
        ctx: &ActorContext,
        can_override_price: bool,
        settings: &CheckoutSettings,
    ) -> Result<Sale, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let timezone = branch_timezone(&mut tx, ctx.branch_id).await?;
        let policy = load_policy(&mut tx, ctx, can_override_price).await?;
        let active_session = active_session(&mut tx, ctx.branch_id, ctx.user_id).await?;
        let discount_used_today = discount_used_today(&mut tx, ctx, &timezone).await?;
        let catalog = load_catalog(&mut tx, request).await?;

        let checkout_ctx = CheckoutContext {
            actor: ctx,
            policy: &policy,
            settings,
            discount_used_today,
            active_session,
        };
        let new_sale = price_cart(request, &checkout_ctx, &catalog)
            .inspect_err(|e| warn!(error = %e, "checkout rejected"))?;

        let sale = insert_sale(&mut tx, new_sale).await?;
        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            grand_total = %sale.grand_total,
            status = %sale.status,
            "checkout completed"
        );

        if let Err(e) = self.publisher.publish(SaleEvent::sale_completed(&sale)).await {
            warn!(sale_id = %sale.id, error = %e, "failed to publish sale event");
        }
        Ok(sale)
    }

    /// Reads a sale with its items and payments
    pub async fn get_sale(&self, id: SaleId) -> Result<Sale, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id, false).await
    }
}

/// Loads a sale with its items and payments, optionally locking the header row
pub(crate) async fn fetch_sale(
    conn: &mut PgConnection,
    id: SaleId,
    for_update: bool,
) -> Result<Sale, RepositoryError> {
    let sql = format!(
        r#"
        SELECT id, branch_id, created_by, customer_id, warehouse_id, pos_session_id, channel,
               currency, sub_total, discount_total, tax_total, grand_total, paid_total,
               due_total, status, journal_entry_id, created_at
        FROM sales
        WHERE id = $1{}
        "#,
        if for_update { " FOR UPDATE" } else { "" }
    );
    let header = sqlx::query_as::<_, SaleRow>(&sql)
        .bind(id.value())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| RepositoryError::not_found("Sale", id))?;

    let items = sqlx::query_as::<_, SaleItemRow>(
        r#"
        SELECT product_id, qty, unit_price, discount, discount_is_percent, discount_amount,
               tax_id, tax_amount, tax_inclusive, sub_total, line_total
        FROM sale_items
        WHERE sale_id = $1
        ORDER BY line_no
        "#,
    )
    .bind(id.value())
    .fetch_all(&mut *conn)
    .await?;

    let payments = sqlx::query_as::<_, SalePaymentRow>(
        "SELECT method, amount, currency, reference FROM sale_payments WHERE sale_id = $1 ORDER BY id",
    )
    .bind(id.value())
    .fetch_all(&mut *conn)
    .await?;

    Ok(header.into_sale(
        items.into_iter().map(SaleItem::from).collect(),
        payments
            .into_iter()
            .map(SalePaymentRow::into_payment)
            .collect::<Result<Vec<_>, _>>()?,
    )?)
}

async fn load_policy(
    conn: &mut PgConnection,
    ctx: &ActorContext,
    can_override_price: bool,
) -> Result<CashierPolicy, RepositoryError> {
    let limits: Option<(Option<Decimal>, Option<Decimal>)> = sqlx::query_as(
        r#"
        SELECT max_discount_percent, daily_discount_limit
        FROM cashier_limits
        WHERE branch_id = $1 AND user_id = $2
        FOR UPDATE
        "#,
    )
    .bind(ctx.branch_id.value())
    .bind(ctx.user_id.value())
    .fetch_optional(&mut *conn)
    .await?;

    let (max_discount_percent, daily_discount_limit) = limits.unwrap_or((None, None));
    Ok(CashierPolicy {
        can_override_price,
        max_discount_percent,
        daily_discount_limit,
    })
}

async fn active_session(
    conn: &mut PgConnection,
    branch_id: BranchId,
    user_id: UserId,
) -> Result<Option<PosSessionId>, RepositoryError> {
    let id: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM pos_sessions
        WHERE branch_id = $1 AND user_id = $2 AND status = 'open'
        FOR SHARE
        "#,
    )
    .bind(branch_id.value())
    .bind(user_id.value())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id.map(PosSessionId::new))
}

/// Discount the cashier granted on the branch-local calendar day of the request
async fn discount_used_today(
    conn: &mut PgConnection,
    ctx: &ActorContext,
    timezone: &Timezone,
) -> Result<Decimal, RepositoryError> {
    let (start, end) = timezone.day_bounds(timezone.local_date(ctx.requested_at))?;
    let used: Decimal = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(discount_total), 0)
        FROM sales
        WHERE branch_id = $1 AND created_by = $2 AND created_at >= $3 AND created_at < $4
        "#,
    )
    .bind(ctx.branch_id.value())
    .bind(ctx.user_id.value())
    .bind(start)
    .bind(end)
    .fetch_one(&mut *conn)
    .await?;
    Ok(used)
}

/// Locks the cart's products in id order and loads the taxes they can use
async fn load_catalog(
    conn: &mut PgConnection,
    request: &CheckoutRequest,
) -> Result<CatalogSnapshot, RepositoryError> {
    let mut product_ids: Vec<i64> = request.items.iter().map(|i| i.product_id.value()).collect();
    product_ids.sort_unstable();
    product_ids.dedup();

    let products = sqlx::query_as::<_, ProductRow>(
        r#"
        SELECT id, name, price, cost, tax_id
        FROM products
        WHERE id = ANY($1) AND is_active
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(&product_ids[..])
    .fetch_all(&mut *conn)
    .await?;

    let mut tax_ids: Vec<i64> = products
        .iter()
        .filter_map(|p| p.tax_id)
        .chain(request.items.iter().filter_map(|i| i.tax_id.map(|t| t.value())))
        .collect();
    tax_ids.sort_unstable();
    tax_ids.dedup();

    let taxes = sqlx::query_as::<_, TaxRow>("SELECT id, name, rate, mode FROM taxes WHERE id = ANY($1)")
        .bind(&tax_ids[..])
        .fetch_all(&mut *conn)
        .await?;

    debug!(products = products.len(), taxes = taxes.len(), "catalog locked");

    let mut catalog = CatalogSnapshot::new();
    for product in products {
        catalog.add_product(product.into());
    }
    for tax in taxes {
        catalog.add_tax(tax.into_tax()?);
    }
    Ok(catalog)
}

async fn insert_sale(conn: &mut PgConnection, new_sale: NewSale) -> Result<Sale, RepositoryError> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO sales (
            branch_id, created_by, customer_id, warehouse_id, pos_session_id, channel, currency,
            sub_total, discount_total, tax_total, grand_total, paid_total, due_total, status,
            created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING id
        "#,
    )
    .bind(new_sale.branch_id.value())
    .bind(new_sale.created_by.value())
    .bind(new_sale.customer_id.map(|c| c.value()))
    .bind(new_sale.warehouse_id.map(|w| w.value()))
    .bind(new_sale.pos_session_id.map(|s| s.value()))
    .bind(new_sale.channel.as_str())
    .bind(new_sale.currency.code())
    .bind(new_sale.sub_total)
    .bind(new_sale.discount_total)
    .bind(new_sale.tax_total)
    .bind(new_sale.grand_total)
    .bind(new_sale.paid_total)
    .bind(new_sale.due_total)
    .bind(new_sale.status.as_str())
    .bind(new_sale.created_at)
    .fetch_one(&mut *conn)
    .await?;

    for (line_no, item) in new_sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                sale_id, line_no, product_id, qty, unit_price, discount, discount_is_percent,
                discount_amount, tax_id, tax_amount, tax_inclusive, sub_total, line_total
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(id)
        .bind(line_no as i32 + 1)
        .bind(item.product_id.value())
        .bind(item.qty)
        .bind(item.unit_price)
        .bind(item.discount)
        .bind(item.discount_is_percent)
        .bind(item.discount_amount)
        .bind(item.tax_id.map(|t| t.value()))
        .bind(item.tax_amount)
        .bind(item.tax_inclusive)
        .bind(item.sub_total)
        .bind(item.line_total)
        .execute(&mut *conn)
        .await?;
    }

    for payment in &new_sale.payments {
        sqlx::query(
            r#"
            INSERT INTO sale_payments (sale_id, method, amount, currency, reference)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(id)
        .bind(payment.method.as_str())
        .bind(payment.amount.amount())
        .bind(payment.amount.currency().code())
        .bind(payment.reference.as_deref())
        .execute(&mut *conn)
        .await?;
    }

    Ok(new_sale.into_sale(SaleId::new(id)))
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    name: String,
    price: Decimal,
    cost: Option<Decimal>,
    tax_id: Option<i64>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::new(row.id),
            name: row.name,
            price: row.price,
            cost: row.cost,
            tax_id: row.tax_id.map(TaxId::new),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaxRow {
    id: i64,
    name: String,
    rate: Decimal,
    mode: String,
}

impl TaxRow {
    fn into_tax(self) -> Result<Tax, DatabaseError> {
        Ok(Tax {
            id: TaxId::new(self.id),
            name: self.name,
            rate: self.rate,
            mode: parse_column("mode", &self.mode)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleRow {
    id: i64,
    branch_id: i64,
    created_by: i64,
    customer_id: Option<i64>,
    warehouse_id: Option<i64>,
    pos_session_id: Option<i64>,
    channel: String,
    currency: String,
    sub_total: Decimal,
    discount_total: Decimal,
    tax_total: Decimal,
    grand_total: Decimal,
    paid_total: Decimal,
    due_total: Decimal,
    status: String,
    journal_entry_id: Option<i64>,
    created_at: DateTime<Utc>,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleItem>, payments: Vec<SalePayment>) -> Result<Sale, DatabaseError> {
        Ok(Sale {
            id: SaleId::new(self.id),
            branch_id: BranchId::new(self.branch_id),
            created_by: UserId::new(self.created_by),
            customer_id: self.customer_id.map(CustomerId::new),
            warehouse_id: self.warehouse_id.map(WarehouseId::new),
            pos_session_id: self.pos_session_id.map(PosSessionId::new),
            channel: parse_column("channel", &self.channel)?,
            currency: parse_currency(&self.currency)?,
            sub_total: self.sub_total,
            discount_total: self.discount_total,
            tax_total: self.tax_total,
            grand_total: self.grand_total,
            paid_total: self.paid_total,
            due_total: self.due_total,
            status: parse_column("status", &self.status)?,
            journal_entry_id: self.journal_entry_id.map(core_kernel::JournalEntryId::new),
            items,
            payments,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleItemRow {
    product_id: i64,
    qty: Decimal,
    unit_price: Decimal,
    discount: Decimal,
    discount_is_percent: bool,
    discount_amount: Decimal,
    tax_id: Option<i64>,
    tax_amount: Decimal,
    tax_inclusive: bool,
    sub_total: Decimal,
    line_total: Decimal,
}

impl From<SaleItemRow> for SaleItem {
    fn from(row: SaleItemRow) -> Self {
        SaleItem {
            product_id: ProductId::new(row.product_id),
            qty: row.qty,
            unit_price: row.unit_price,
            discount: row.discount,
            discount_is_percent: row.discount_is_percent,
            discount_amount: row.discount_amount,
            tax_id: row.tax_id.map(TaxId::new),
            tax_amount: row.tax_amount,
            tax_inclusive: row.tax_inclusive,
            sub_total: row.sub_total,
            line_total: row.line_total,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SalePaymentRow {
    method: String,
    amount: Decimal,
    currency: String,
    reference: Option<String>,
}

impl SalePaymentRow {
    fn into_payment(self) -> Result<SalePayment, DatabaseError> {
        Ok(SalePayment {
            method: parse_column("method", &self.method)?,
            amount: Money::new(self.amount, parse_currency(&self.currency)?),
            reference: self.reference,
        })
    }
}
