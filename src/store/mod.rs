//! The record store: list, create, update and delete for the collections kept in the spreadsheet.
//!
//! Each operation is a short, ordered sequence of round-trips through the `Sheet` seam: locate the
//! tab, read, then write. Nothing is cached between operations and nothing is retried; a backend
//! failure ends the operation with an `ErrorType::Store` error.
//!
//! Known race: the spreadsheet can be edited by a person or another process between the read that
//! resolves a row number and the write that uses it. A row inserted or removed above the target in
//! that window makes `update` overwrite, or `delete` remove, a different record. There is no
//! version check to detect this.

mod backfill;
mod row_index;

use crate::api::{ensure_exists, locate, Sheet, SheetRange, SheetRef, TabBinding, A1};
use crate::error::{Error, ErrorType, IntoResult};
use crate::model::{
    NewSavingsGoal, NewTransaction, RecordId, RowCodec, SavingsGoal, SavingsPatch, Transaction,
};
use crate::Result;
use anyhow::Context;
use backfill::{backfill, Backfill};
use row_index::RowIndex;
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, info};

/// The format of `createdAt` and `lastUpdated` timestamps.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// The title of the tab holding savings goals.
pub const SAVINGS_TAB: &str = "Sheet2";

/// A logical record set bound to one tab of the spreadsheet.
pub trait Collection: Send + Sync + 'static {
    type Record: RowCodec + Serialize + Debug + Clone + Send + Sync;

    /// What a caller submits to create a record.
    type Draft: Send;

    /// A short name used in logs and on the command line, e.g. `expenses`.
    const NAME: &'static str;

    /// The name of one record in user-facing messages, e.g. `Expense`.
    const LABEL: &'static str;

    const TAB: TabBinding;

    /// Whether callers choose record ids. Such ids are checked for uniqueness on create.
    const CALLER_ASSIGNED_IDS: bool;

    /// Validates a draft and stamps it with its creation time `now`.
    fn prepare(draft: Self::Draft, now: String) -> Result<Self::Record>;
}

/// A collection whose records may be changed in place.
pub trait MutableCollection: Collection {
    type Patch: Send;

    /// Produces the full record to write back: `existing` with `patch` applied, stamped at `now`.
    fn apply(existing: &Self::Record, patch: Self::Patch, now: String) -> Result<Self::Record>;
}

/// The transaction ledger. It lives on the first tab, whatever that tab is called. Transactions are
/// never changed after they are written.
#[derive(Debug, Clone, Copy)]
pub struct Expenses;

impl Collection for Expenses {
    type Record = Transaction;
    type Draft = NewTransaction;
    const NAME: &'static str = "expenses";
    const LABEL: &'static str = "Expense";
    const TAB: TabBinding = TabBinding::First;
    const CALLER_ASSIGNED_IDS: bool = false;

    fn prepare(draft: NewTransaction, now: String) -> Result<Transaction> {
        draft.into_transaction(RecordId::generate(), now)
    }
}

/// Savings goals, kept on their own tab which is created on first use.
#[derive(Debug, Clone, Copy)]
pub struct Savings;

impl Collection for Savings {
    type Record = SavingsGoal;
    type Draft = NewSavingsGoal;
    const NAME: &'static str = "savings";
    const LABEL: &'static str = "Saving goal";
    const TAB: TabBinding = TabBinding::Named(SAVINGS_TAB);
    const CALLER_ASSIGNED_IDS: bool = true;

    fn prepare(draft: NewSavingsGoal, now: String) -> Result<SavingsGoal> {
        draft.into_goal(now)
    }
}

impl MutableCollection for Savings {
    type Patch = SavingsPatch;

    fn apply(existing: &SavingsGoal, patch: SavingsPatch, now: String) -> Result<SavingsGoal> {
        existing.merge(patch, now)
    }
}

/// Supplies timestamps for new and updated records.
pub trait Clock: Send + Sync {
    fn now(&self) -> String;
}

/// The local wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> String {
        chrono::Local::now().format(TIMESTAMP_FORMAT).to_string()
    }
}

/// Maps record operations onto a spreadsheet.
pub struct Store {
    sheet: Box<dyn Sheet + Send>,
    clock: Arc<dyn Clock>,
}

impl Store {
    pub fn new(sheet: Box<dyn Sheet + Send>) -> Self {
        Self::with_clock(sheet, Arc::new(SystemClock))
    }

    pub fn with_clock(sheet: Box<dyn Sheet + Send>, clock: Arc<dyn Clock>) -> Self {
        Self { sheet, clock }
    }

    /// Returns every record of the collection in storage order, oldest first. Rows without an id
    /// are given one, and the new ids are written back before returning. A named tab that does not
    /// exist yet is an empty collection.
    pub async fn list<C: Collection>(&mut self) -> Result<Vec<C::Record>> {
        let tab = match self.locate::<C>().await? {
            Some(tab) => tab,
            None => {
                debug!("No tab for {}, returning an empty list", C::NAME);
                return Ok(Vec::new());
            }
        };
        let rows = self.read_rows::<C>(&tab).await?;
        let Backfill { rows, pending } =
            backfill::<C::Record>(&tab.title, rows, RecordId::generate);
        if !pending.is_empty() {
            debug!(
                "Backfilling {} id cells in '{}' for {}",
                pending.len(),
                tab.title,
                C::NAME
            );
            self.sheet
                .write_ranges(&pending)
                .await
                .with_context(|| format!("Failed to write missing ids for {}", C::NAME))
                .pub_result(ErrorType::Store)?;
        }
        Ok(rows.iter().skip(1).map(|row| C::Record::decode(row)).collect())
    }

    /// Validates `draft`, stamps it and appends it as the last row. The tab is created if needed,
    /// and the header row is written if the tab has none.
    ///
    /// For collections with caller-assigned ids, an id that is already in use is an
    /// `ErrorType::Conflict` error and nothing is written.
    pub async fn create<C: Collection>(&mut self, draft: C::Draft) -> Result<C::Record> {
        let record = C::prepare(draft, self.clock.now())?;
        let tab = ensure_exists(self.sheet.as_mut(), C::TAB)
            .await
            .with_context(|| format!("Failed to find the tab for {}", C::NAME))
            .pub_result(ErrorType::Store)?;
        let header = A1::row(&tab.title, 1, 0, C::Record::width() - 1);
        // Only a caller-assigned id can collide, so only then is the whole tab read.
        let first_rows = if C::CALLER_ASSIGNED_IDS {
            let rows = self.read_rows::<C>(&tab).await?;
            if RowIndex::build(&rows, C::Record::ID_COLUMN).contains(record.id()) {
                return Err(Error::msg(
                    ErrorType::Conflict,
                    format!("{} with id '{}' already exists", C::LABEL, record.id()),
                ));
            }
            rows
        } else {
            self.sheet
                .get(&header)
                .await
                .with_context(|| format!("Failed to read {header}"))
                .pub_result(ErrorType::Store)?
        };

        let header_missing = first_rows
            .first()
            .map(|cells| cells.iter().all(|c| c.trim().is_empty()))
            .unwrap_or(true);
        if header_missing {
            debug!("Writing the header row of '{}'", tab.title);
            self.sheet
                .write_ranges(&[SheetRange::new(header, vec![C::Record::header_row()])])
                .await
                .with_context(|| format!("Failed to write the header of '{}'", tab.title))
                .pub_result(ErrorType::Store)?;
        }

        self.sheet
            .append(&full_range::<C>(&tab), &[record.encode()])
            .await
            .with_context(|| format!("Failed to append to '{}'", tab.title))
            .pub_result(ErrorType::Store)?;
        info!("Created {} {}", C::LABEL, record.id());
        Ok(record)
    }

    /// Applies `patch` to the record `id` and overwrites its whole row with the result.
    pub async fn update<C: MutableCollection>(
        &mut self,
        id: &RecordId,
        patch: C::Patch,
    ) -> Result<C::Record> {
        let tab = self.locate::<C>().await?.ok_or_else(|| not_found::<C>(id))?;
        let rows = self.read_rows::<C>(&tab).await?;
        let row = RowIndex::build(&rows, C::Record::ID_COLUMN)
            .find(id)
            .ok_or_else(|| not_found::<C>(id))?;
        let existing = C::Record::decode(&rows[row - 1]);
        let merged = C::apply(&existing, patch, self.clock.now())?;

        let range = A1::row(&tab.title, row, 0, C::Record::width() - 1);
        self.sheet
            .write_ranges(&[SheetRange::new(range, vec![merged.encode()])])
            .await
            .with_context(|| format!("Failed to overwrite row {row} of '{}'", tab.title))
            .pub_result(ErrorType::Store)?;
        info!("Updated {} {id}", C::LABEL);
        Ok(merged)
    }

    /// Removes the row holding `id`, shifting the rows below it up.
    pub async fn delete<C: Collection>(&mut self, id: &RecordId) -> Result<()> {
        let tab = self.locate::<C>().await?.ok_or_else(|| not_found::<C>(id))?;
        let col = C::Record::ID_COLUMN;
        let ids = A1::columns(&tab.title, col, col);
        let rows = self
            .sheet
            .get(&ids)
            .await
            .with_context(|| format!("Failed to read {ids}"))
            .pub_result(ErrorType::Store)?;
        let row = RowIndex::build(&rows, 0)
            .find(id)
            .ok_or_else(|| not_found::<C>(id))?;

        self.sheet
            .delete_rows(tab.sheet_id, row - 1, row)
            .await
            .with_context(|| format!("Failed to delete row {row} of '{}'", tab.title))
            .pub_result(ErrorType::Store)?;
        info!("Deleted {} {id}", C::LABEL);
        Ok(())
    }

    async fn locate<C: Collection>(&mut self) -> Result<Option<SheetRef>> {
        locate(self.sheet.as_mut(), C::TAB)
            .await
            .with_context(|| format!("Failed to find the tab for {}", C::NAME))
            .pub_result(ErrorType::Store)
    }

    async fn read_rows<C: Collection>(&mut self, tab: &SheetRef) -> Result<Vec<Vec<String>>> {
        let range = full_range::<C>(tab);
        self.sheet
            .get(&range)
            .await
            .with_context(|| format!("Failed to read {range}"))
            .pub_result(ErrorType::Store)
    }
}

/// Every column of the collection, all rows.
fn full_range<C: Collection>(tab: &SheetRef) -> A1 {
    A1::columns(&tab.title, 0, C::Record::width() - 1)
}

fn not_found<C: Collection>(id: &RecordId) -> Error {
    Error::msg(
        ErrorType::NotFound,
        format!("{} with id '{id}' not found", C::LABEL),
    )
}
