//! Ledger repository implementation
//!
//! Persists journal entries and account balances. The posting rules, the
//! balance check and the reversal logic all come from `domain_ledger`; this
//! module only loads their inputs under row locks and writes their outputs.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    AccountId, ActorContext, BranchId, Currency, FiscalPeriod, FiscalPeriodId, JournalEntryId,
    Money, MoneyError, PayrollRunId, PurchaseId, RentalInvoiceId, UserId,
};
use domain_ledger::{
    account_deltas, build_generated_entry, build_manual_entry, build_reversal, check_cancellable,
    check_postable, Account, AccountMappings, AccountType, EntryStatus, FiscalCalendarTable,
    JournalEntry, JournalLine, JournalSource, LedgerError, ManualEntryDraft, MappingKey,
    NewJournalEntry, PayrollDocument, PurchaseDocument, RentalInvoiceDocument,
    SourceDocument, SourceModule, TrialBalance,
};

use super::sales::fetch_sale;
use super::{branch_timezone, parse_column, parse_currency};
use crate::documents::sale_document;
use crate::error::{DatabaseError, RepositoryError};

const ENTRY_COLUMNS: &str = r#"
    id, reference_number, branch_id, currency, entry_date, fiscal_year, fiscal_period,
    status, source_type, source_id, description, is_auto_generated, is_reversible,
    reversed_by, reverses, created_by, approved_by, approved_at, created_at
"#;

/// Repository for the double-entry ledger
///
/// Each operation runs in one transaction: the entry, its lines, the
/// balance updates and the source link commit together or not at all.
///
/// # Example
///
/// ```rust,ignore
/// use infra_db::repositories::LedgerRepository;
///
/// let repo = LedgerRepository::new(pool);
/// let entry = repo.generate_for_source(SourceDocument::Sale(sale_id), &ctx).await?;
/// ```
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    pool: PgPool,
}

impl LedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Generates, posts and links the journal entry for a source document
    ///
    /// The source row is locked first, so two concurrent generations for the
    /// same document serialize and the second sees `AlreadyGenerated`.
    ///
    /// # Errors
    ///
    /// - `AlreadyGenerated` if the document is linked or an entry already
    ///   references it
    /// - `MissingMapping` if the branch lacks any mapping the rules need
    /// - `Unbalanced` if the document's figures do not balance
    /// - `NotFound` if the document does not exist or belongs to another
    ///   branch than the actor's
    #[instrument(skip(self, ctx), fields(branch_id = %ctx.branch_id, user_id = %ctx.user_id))]
    pub async fn generate_for_source(
        &self,
        document: SourceDocument,
        ctx: &ActorContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let source = load_source(&mut tx, document).await?;
        if source.branch_id() != ctx.branch_id {
            warn!(source_branch = %source.branch_id(), "source belongs to another branch");
            return Err(RepositoryError::not_found(source_table(document), document));
        }
        if let Some(entry_id) = existing_entry_for(&mut tx, document).await? {
            warn!(%entry_id, "source already has a journal entry");
            return Err(LedgerError::AlreadyGenerated {
                document,
                entry_id: Some(entry_id),
            }
            .into());
        }

        let branch_id = source.branch_id();
        let mappings = load_mappings(&mut tx, branch_id).await?;
        let calendar = load_calendar(&mut tx, branch_id).await?;

        let new_entry = build_generated_entry(source.as_ref(), &mappings, &calendar, ctx)
            .inspect_err(|e| warn!(error = %e, "journal generation rejected"))?;
        let entry = insert_entry(&mut tx, new_entry).await?;
        apply_balances(&mut tx, entry.currency, &entry.lines).await?;
        link_source(&mut tx, document, entry.id).await?;

        tx.commit().await?;

        info!(
            entry_id = %entry.id,
            reference = %entry.reference_number,
            "journal entry generated"
        );
        Ok(entry)
    }

    /// Records a draft manual entry; balance is checked when it is posted
    ///
    /// Without an explicit date the entry falls on the branch's local
    /// business day.
    #[instrument(skip(self, draft, ctx), fields(branch_id = %ctx.branch_id, lines = draft.lines.len()))]
    pub async fn create_manual_entry(
        &self,
        mut draft: ManualEntryDraft,
        ctx: &ActorContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if draft.entry_date.is_none() {
            let timezone = branch_timezone(&mut tx, ctx.branch_id).await?;
            draft.entry_date = Some(timezone.local_date(ctx.requested_at));
        }

        let mut account_ids: Vec<i64> = draft.lines.iter().map(|l| l.account_id.value()).collect();
        account_ids.sort_unstable();
        account_ids.dedup();
        let known: Vec<i64> = sqlx::query_scalar("SELECT id FROM accounts WHERE id = ANY($1)")
            .bind(&account_ids[..])
            .fetch_all(&mut *tx)
            .await?;
        if let Some(&missing) = account_ids.iter().find(|&&id| !known.contains(&id)) {
            return Err(LedgerError::AccountNotFound(AccountId::new(missing)).into());
        }

        let calendar = load_calendar(&mut tx, ctx.branch_id).await?;
        let new_entry = build_manual_entry(draft, &calendar, ctx)?;
        let entry = insert_entry(&mut tx, new_entry).await?;

        tx.commit().await?;

        info!(entry_id = %entry.id, reference = %entry.reference_number, "manual journal entry created");
        Ok(entry)
    }

    /// Posts a draft entry and applies its balance changes
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` for an unknown id or an entry of another branch
    /// - `AlreadyPosted` / `NotDraft` per the entry's status
    /// - `Unbalanced` if debits and credits differ by 0.01 or more
    #[instrument(skip(self, id, ctx), fields(entry_id = %id, user_id = %ctx.user_id))]
    pub async fn post_entry(
        &self,
        id: JournalEntryId,
        ctx: &ActorContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut entry = fetch_entry(&mut tx, id, ctx.branch_id, true).await?;
        check_postable(&entry)?;
        apply_balances(&mut tx, entry.currency, &entry.lines).await?;
        entry.mark_posted(ctx);

        sqlx::query(
            "UPDATE journal_entries SET status = $2, approved_by = $3, approved_at = $4 WHERE id = $1",
        )
        .bind(id.value())
        .bind(entry.status.as_str())
        .bind(entry.approved_by.map(|u| u.value()))
        .bind(entry.approved_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(reference = %entry.reference_number, "journal entry posted");
        Ok(entry)
    }

    /// Creates and posts the reversal of a posted entry
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` for an unknown id or an entry of another branch
    /// - `NotPosted`, `NotReversible`, `AlreadyReversed` per the entry's state
    #[instrument(skip(self, id, ctx), fields(entry_id = %id, user_id = %ctx.user_id))]
    pub async fn reverse_entry(
        &self,
        id: JournalEntryId,
        reason: &str,
        ctx: &ActorContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let original = fetch_entry(&mut tx, id, ctx.branch_id, true).await?;
        let calendar = load_calendar(&mut tx, original.branch_id).await?;
        let new_entry = build_reversal(&original, reason, &calendar, ctx)
            .inspect_err(|e| warn!(error = %e, "reversal rejected"))?;

        let reversal = insert_entry(&mut tx, new_entry).await?;
        apply_balances(&mut tx, reversal.currency, &reversal.lines).await?;
        sqlx::query("UPDATE journal_entries SET reversed_by = $2 WHERE id = $1")
            .bind(id.value())
            .bind(reversal.id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(reversal_id = %reversal.id, reason, "journal entry reversed");
        Ok(reversal)
    }

    /// Cancels a draft entry; no balance effect
    #[instrument(skip(self, id, ctx), fields(entry_id = %id, user_id = %ctx.user_id))]
    pub async fn cancel_entry(
        &self,
        id: JournalEntryId,
        ctx: &ActorContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let mut entry = fetch_entry(&mut tx, id, ctx.branch_id, true).await?;
        check_cancellable(&entry)?;
        entry.mark_cancelled();

        sqlx::query("UPDATE journal_entries SET status = $2 WHERE id = $1")
            .bind(id.value())
            .bind(entry.status.as_str())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(reference = %entry.reference_number, "journal entry cancelled");
        Ok(entry)
    }

    /// Reads an entry of the actor's branch with its lines
    pub async fn get_entry(
        &self,
        id: JournalEntryId,
        ctx: &ActorContext,
    ) -> Result<JournalEntry, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        fetch_entry(&mut conn, id, ctx.branch_id, false).await
    }

    /// Trial balance over the accounts kept in `currency`
    pub async fn trial_balance(&self, currency: Currency) -> Result<TrialBalance, RepositoryError> {
        let rows = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT id, code, name, account_type, parent_id, is_active, balance
            FROM accounts
            WHERE currency = $1
            ORDER BY code
            "#,
        )
        .bind(currency.code())
        .fetch_all(&self.pool)
        .await?;

        let accounts = rows
            .into_iter()
            .map(|row| row.into_account().map(|(account, balance)| (account, Money::new(balance, currency))))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(TrialBalance::from_balances(
            currency,
            accounts.iter().map(|(account, balance)| (account, *balance)),
        ))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JournalEntryRow {
    id: i64,
    reference_number: String,
    branch_id: i64,
    currency: String,
    entry_date: NaiveDate,
    fiscal_year: Option<i32>,
    fiscal_period: Option<i32>,
    status: String,
    source_type: Option<String>,
    source_id: Option<i64>,
    description: String,
    is_auto_generated: bool,
    is_reversible: bool,
    reversed_by: Option<i64>,
    reverses: Option<i64>,
    created_by: i64,
    approved_by: Option<i64>,
    approved_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl JournalEntryRow {
    fn into_entry(self, lines: Vec<JournalLine>) -> Result<JournalEntry, DatabaseError> {
        let source = match (self.source_type.as_deref(), self.source_id) {
            (Some(kind), Some(id)) => Some(
                SourceDocument::from_parts(kind, id)
                    .ok_or_else(|| DatabaseError::corrupt("source_type", kind))?,
            ),
            _ => None,
        };
        let fiscal_period = self
            .fiscal_period
            .map(|p| u32::try_from(p).map_err(|_| DatabaseError::corrupt("fiscal_period", p)))
            .transpose()?;

        Ok(JournalEntry {
            id: JournalEntryId::new(self.id),
            reference_number: self.reference_number,
            branch_id: BranchId::new(self.branch_id),
            currency: parse_currency(&self.currency)?,
            entry_date: self.entry_date,
            fiscal_year: self.fiscal_year,
            fiscal_period,
            status: parse_column::<EntryStatus>("status", &self.status)?,
            source,
            description: self.description,
            is_auto_generated: self.is_auto_generated,
            is_reversible: self.is_reversible,
            reversed_by: self.reversed_by.map(JournalEntryId::new),
            reverses: self.reverses.map(JournalEntryId::new),
            created_by: UserId::new(self.created_by),
            approved_by: self.approved_by.map(UserId::new),
            approved_at: self.approved_at,
            created_at: self.created_at,
            lines,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JournalLineRow {
    account_id: i64,
    debit: Decimal,
    credit: Decimal,
    description: Option<String>,
}

impl From<JournalLineRow> for JournalLine {
    fn from(row: JournalLineRow) -> Self {
        JournalLine {
            account_id: AccountId::new(row.account_id),
            debit: row.debit,
            credit: row.credit,
            description: row.description,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    id: i64,
    code: String,
    name: String,
    account_type: String,
    parent_id: Option<i64>,
    is_active: bool,
    balance: Decimal,
}

impl AccountRow {
    fn into_account(self) -> Result<(Account, Decimal), DatabaseError> {
        let account_type = parse_column::<AccountType>("account_type", &self.account_type)?;
        let mut account = Account::new(AccountId::new(self.id), self.code, self.name, account_type);
        account.parent_id = self.parent_id.map(AccountId::new);
        account.is_active = self.is_active;
        Ok((account, self.balance))
    }
}

/// Figures shared by purchases and rental invoices
#[derive(Debug, sqlx::FromRow)]
struct DocumentFiguresRow {
    branch_id: i64,
    document_date: NaiveDate,
    currency: String,
    sub_total: Decimal,
    discount_total: Decimal,
    tax_total: Decimal,
    grand_total: Decimal,
    is_paid: bool,
    journal_entry_id: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct PayrollFiguresRow {
    branch_id: i64,
    run_date: NaiveDate,
    currency: String,
    gross: Decimal,
    deductions: Decimal,
    net: Decimal,
    is_paid: bool,
    journal_entry_id: Option<i64>,
}

#[derive(Debug, sqlx::FromRow)]
struct FiscalPeriodRow {
    id: i64,
    branch_id: i64,
    fiscal_year: i32,
    period: i32,
    starts_on: NaiveDate,
    ends_on: NaiveDate,
    is_closed: bool,
}

fn source_table(document: SourceDocument) -> &'static str {
    match document {
        SourceDocument::Sale(_) => "sales",
        SourceDocument::Purchase(_) => "purchases",
        SourceDocument::Payroll(_) => "payroll_runs",
        SourceDocument::RentalInvoice(_) => "rental_invoices",
    }
}

/// Loads and locks the source document row
async fn load_source(
    conn: &mut PgConnection,
    document: SourceDocument,
) -> Result<Box<dyn JournalSource + Send>, RepositoryError> {
    let not_found = || RepositoryError::not_found(source_table(document), document);

    let source: Box<dyn JournalSource + Send> = match document {
        SourceDocument::Sale(id) => {
            let sale = fetch_sale(&mut *conn, id, true).await?;
            let timezone = branch_timezone(&mut *conn, sale.branch_id).await?;
            Box::new(sale_document(&sale, &timezone))
        }
        SourceDocument::Purchase(id) => {
            let row = sqlx::query_as::<_, DocumentFiguresRow>(
                r#"
                SELECT branch_id, purchase_date AS document_date, currency, sub_total,
                       discount_total, tax_total, grand_total, is_paid, journal_entry_id
                FROM purchases
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(id.value())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(not_found)?;
            Box::new(purchase_figures(id, row)?)
        }
        SourceDocument::Payroll(id) => {
            let row = sqlx::query_as::<_, PayrollFiguresRow>(
                r#"
                SELECT branch_id, run_date, currency, gross, deductions, net, is_paid, journal_entry_id
                FROM payroll_runs
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(id.value())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(not_found)?;
            Box::new(payroll_figures(id, row)?)
        }
        SourceDocument::RentalInvoice(id) => {
            let row = sqlx::query_as::<_, DocumentFiguresRow>(
                r#"
                SELECT branch_id, invoice_date AS document_date, currency, sub_total,
                       discount_total, tax_total, total AS grand_total, is_paid, journal_entry_id
                FROM rental_invoices
                WHERE id = $1
                FOR UPDATE
                "#,
            )
            .bind(id.value())
            .fetch_optional(&mut *conn)
            .await?
            .ok_or_else(not_found)?;
            Box::new(rental_figures(id, row)?)
        }
    };

    debug!(%document, "source document locked");
    Ok(source)
}

fn purchase_figures(id: PurchaseId, row: DocumentFiguresRow) -> Result<PurchaseDocument, DatabaseError> {
    Ok(PurchaseDocument {
        id,
        branch_id: BranchId::new(row.branch_id),
        date: row.document_date,
        currency: parse_currency(&row.currency)?,
        sub_total: row.sub_total,
        discount_total: row.discount_total,
        tax_total: row.tax_total,
        grand_total: row.grand_total,
        is_paid: row.is_paid,
        journal_entry_id: row.journal_entry_id.map(JournalEntryId::new),
    })
}

fn payroll_figures(id: PayrollRunId, row: PayrollFiguresRow) -> Result<PayrollDocument, DatabaseError> {
    Ok(PayrollDocument {
        id,
        branch_id: BranchId::new(row.branch_id),
        date: row.run_date,
        currency: parse_currency(&row.currency)?,
        gross: row.gross,
        deductions: row.deductions,
        net: row.net,
        is_paid: row.is_paid,
        journal_entry_id: row.journal_entry_id.map(JournalEntryId::new),
    })
}

fn rental_figures(id: RentalInvoiceId, row: DocumentFiguresRow) -> Result<RentalInvoiceDocument, DatabaseError> {
    Ok(RentalInvoiceDocument {
        id,
        branch_id: BranchId::new(row.branch_id),
        date: row.document_date,
        currency: parse_currency(&row.currency)?,
        sub_total: row.sub_total,
        discount_total: row.discount_total,
        tax_total: row.tax_total,
        total: row.grand_total,
        is_paid: row.is_paid,
        journal_entry_id: row.journal_entry_id.map(JournalEntryId::new),
    })
}

/// The generated (non-reversal) entry already referencing a document, if any
async fn existing_entry_for(
    conn: &mut PgConnection,
    document: SourceDocument,
) -> Result<Option<JournalEntryId>, RepositoryError> {
    let id: Option<i64> = sqlx::query_scalar(
        r#"
        SELECT id FROM journal_entries
        WHERE source_type = $1 AND source_id = $2 AND reverses IS NULL
        "#,
    )
    .bind(document.source_type())
    .bind(document.id_value())
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id.map(JournalEntryId::new))
}

async fn link_source(
    conn: &mut PgConnection,
    document: SourceDocument,
    entry_id: JournalEntryId,
) -> Result<(), RepositoryError> {
    let sql = format!(
        "UPDATE {} SET journal_entry_id = $2 WHERE id = $1",
        source_table(document)
    );
    sqlx::query(&sql)
        .bind(document.id_value())
        .bind(entry_id.value())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn load_mappings(
    conn: &mut PgConnection,
    branch_id: BranchId,
) -> Result<AccountMappings, RepositoryError> {
    let rows: Vec<(String, String, i64)> = sqlx::query_as(
        "SELECT module, key, account_id FROM account_mappings WHERE branch_id = $1",
    )
    .bind(branch_id.value())
    .fetch_all(&mut *conn)
    .await?;

    let mut mappings = AccountMappings::new();
    for (module, key, account_id) in rows {
        mappings.insert(
            branch_id,
            parse_column::<SourceModule>("module", &module)?,
            parse_column::<MappingKey>("key", &key)?,
            AccountId::new(account_id),
        );
    }
    Ok(mappings)
}

async fn load_calendar(
    conn: &mut PgConnection,
    branch_id: BranchId,
) -> Result<FiscalCalendarTable, RepositoryError> {
    let rows = sqlx::query_as::<_, FiscalPeriodRow>(
        r#"
        SELECT id, branch_id, fiscal_year, period, starts_on, ends_on, is_closed
        FROM fiscal_periods
        WHERE branch_id = $1
        ORDER BY starts_on
        "#,
    )
    .bind(branch_id.value())
    .fetch_all(&mut *conn)
    .await?;

    rows.into_iter()
        .map(|row| -> Result<FiscalPeriod, RepositoryError> {
            let period = u32::try_from(row.period)
                .map_err(|_| DatabaseError::corrupt("period", row.period))?;
            let mut fiscal = FiscalPeriod::new(
                FiscalPeriodId::new(row.id),
                BranchId::new(row.branch_id),
                row.fiscal_year,
                period,
                row.starts_on,
                row.ends_on,
            )
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
            fiscal.is_closed = row.is_closed;
            Ok(fiscal)
        })
        .collect::<Result<FiscalCalendarTable, RepositoryError>>()
}

/// Loads an entry of `branch_id`; entries of other branches read as missing
async fn fetch_entry(
    conn: &mut PgConnection,
    id: JournalEntryId,
    branch_id: BranchId,
    for_update: bool,
) -> Result<JournalEntry, RepositoryError> {
    let sql = format!(
        "SELECT {ENTRY_COLUMNS} FROM journal_entries WHERE id = $1 AND branch_id = $2{}",
        if for_update { " FOR UPDATE" } else { "" }
    );
    let row = sqlx::query_as::<_, JournalEntryRow>(&sql)
        .bind(id.value())
        .bind(branch_id.value())
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(LedgerError::EntryNotFound(id))?;

    let lines = sqlx::query_as::<_, JournalLineRow>(
        r#"
        SELECT account_id, debit, credit, description
        FROM journal_entry_lines
        WHERE journal_entry_id = $1
        ORDER BY id
        "#,
    )
    .bind(id.value())
    .fetch_all(&mut *conn)
    .await?;

    Ok(row.into_entry(lines.into_iter().map(JournalLine::from).collect())?)
}

/// Allocates the entry id, then writes the header and its lines
async fn insert_entry(
    conn: &mut PgConnection,
    new_entry: NewJournalEntry,
) -> Result<JournalEntry, RepositoryError> {
    let id: i64 = sqlx::query_scalar("SELECT nextval(pg_get_serial_sequence('journal_entries', 'id'))")
        .fetch_one(&mut *conn)
        .await?;
    let entry = new_entry.into_entry(JournalEntryId::new(id));

    sqlx::query(
        r#"
        INSERT INTO journal_entries (
            id, reference_number, branch_id, currency, entry_date, fiscal_year, fiscal_period,
            status, source_type, source_id, description, is_auto_generated, is_reversible,
            reverses, created_by, approved_by, approved_at, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
        "#,
    )
    .bind(entry.id.value())
    .bind(&entry.reference_number)
    .bind(entry.branch_id.value())
    .bind(entry.currency.code())
    .bind(entry.entry_date)
    .bind(entry.fiscal_year)
    .bind(entry.fiscal_period.map(|p| p as i32))
    .bind(entry.status.as_str())
    .bind(entry.source.map(|s| s.source_type()))
    .bind(entry.source.map(|s| s.id_value()))
    .bind(&entry.description)
    .bind(entry.is_auto_generated)
    .bind(entry.is_reversible)
    .bind(entry.reverses.map(|r| r.value()))
    .bind(entry.created_by.value())
    .bind(entry.approved_by.map(|u| u.value()))
    .bind(entry.approved_at)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;

    for line in &entry.lines {
        sqlx::query(
            r#"
            INSERT INTO journal_entry_lines (journal_entry_id, account_id, debit, credit, description)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(entry.id.value())
        .bind(line.account_id.value())
        .bind(line.debit)
        .bind(line.credit)
        .bind(line.description.as_deref())
        .execute(&mut *conn)
        .await?;
    }

    debug!(entry_id = %entry.id, lines = entry.lines.len(), "journal entry inserted");
    Ok(entry)
}

/// Applies the balance changes of `lines`, locking the accounts in id order
async fn apply_balances(
    conn: &mut PgConnection,
    currency: Currency,
    lines: &[JournalLine],
) -> Result<(), RepositoryError> {
    let mut ids: Vec<i64> = lines.iter().map(|l| l.account_id.value()).collect();
    ids.sort_unstable();
    ids.dedup();

    let rows: Vec<(i64, String, String)> = sqlx::query_as(
        "SELECT id, account_type, currency FROM accounts WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(&ids[..])
    .fetch_all(&mut *conn)
    .await?;

    let mut types = HashMap::with_capacity(rows.len());
    for (id, account_type, account_currency) in rows {
        let account_currency = parse_currency(&account_currency)?;
        if account_currency != currency {
            return Err(LedgerError::from(MoneyError::CurrencyMismatch(
                currency.to_string(),
                account_currency.to_string(),
            ))
            .into());
        }
        types.insert(AccountId::new(id), parse_column::<AccountType>("account_type", &account_type)?);
    }

    let deltas = account_deltas(lines, |id| types.get(&id).copied())?;
    for (account_id, delta) in deltas {
        sqlx::query("UPDATE accounts SET balance = balance + $2 WHERE id = $1")
            .bind(account_id.value())
            .bind(delta)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use core_kernel::SaleId;
    use rust_decimal_macros::dec;

    fn entry_row() -> JournalEntryRow {
        JournalEntryRow {
            id: 7,
            reference_number: "SALE-20250305-000042".into(),
            branch_id: 1,
            currency: "USD".into(),
            entry_date: NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
            fiscal_year: Some(2025),
            fiscal_period: Some(3),
            status: "posted".into(),
            source_type: Some("sale".into()),
            source_id: Some(42),
            description: "Sale SALE-42".into(),
            is_auto_generated: true,
            is_reversible: true,
            reversed_by: None,
            reverses: None,
            created_by: 3,
            approved_by: Some(3),
            approved_at: Some(Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap()),
            created_at: Utc.with_ymd_and_hms(2025, 3, 5, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_entry_row_maps_source_and_period() {
        let entry = entry_row().into_entry(vec![]).unwrap();
        assert_eq!(entry.source, Some(SourceDocument::Sale(SaleId::new(42))));
        assert_eq!(entry.fiscal_period, Some(3));
        assert_eq!(entry.status, EntryStatus::Posted);
    }

    #[test]
    fn test_entry_row_rejects_unknown_source_type() {
        let mut row = entry_row();
        row.source_type = Some("invoice".into());
        assert!(matches!(row.into_entry(vec![]), Err(DatabaseError::SerializationError(_))));
    }

    #[test]
    fn test_rental_total_maps_from_grand_total_column() {
        let row = DocumentFiguresRow {
            branch_id: 2,
            document_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            currency: "USD".into(),
            sub_total: dec!(500),
            discount_total: dec!(0),
            tax_total: dec!(75),
            grand_total: dec!(575),
            is_paid: false,
            journal_entry_id: Some(4),
        };
        let doc = rental_figures(RentalInvoiceId::new(3), row).unwrap();
        assert_eq!(doc.total, dec!(575));
        assert_eq!(doc.journal_entry_id(), Some(JournalEntryId::new(4)));
    }

    #[test]
    fn test_source_tables() {
        assert_eq!(source_table(SourceDocument::Payroll(PayrollRunId::new(1))), "payroll_runs");
        assert_eq!(source_table(SourceDocument::RentalInvoice(RentalInvoiceId::new(1))), "rental_invoices");
    }
}
