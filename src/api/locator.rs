//! Finds the tab that backs a record collection.

use crate::api::{Sheet, TabProperties};
use crate::error::Res;
use anyhow::bail;
use tracing::{debug, info};

/// How a collection names its tab.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum TabBinding {
    /// Whatever tab is first in the spreadsheet, regardless of its title.
    First,
    /// A tab with exactly this title.
    Named(&'static str),
}

/// A resolved tab: the numeric id used for structural edits and the title used in A1 ranges.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SheetRef {
    pub sheet_id: i64,
    pub title: String,
}

impl From<TabProperties> for SheetRef {
    fn from(p: TabProperties) -> Self {
        Self {
            sheet_id: p.sheet_id,
            title: p.title,
        }
    }
}

/// Looks up the tab for `binding`. Returns `None` when a named tab does not exist. A spreadsheet
/// with no tabs at all is an error when the binding is `First`.
pub(crate) async fn locate(
    sheet: &mut (dyn Sheet + Send),
    binding: TabBinding,
) -> Res<Option<SheetRef>> {
    let tabs = sheet.tabs().await?;
    match binding {
        TabBinding::First => match tabs.into_iter().min_by_key(|t| t.index) {
            Some(tab) => Ok(Some(tab.into())),
            None => bail!("The spreadsheet has no tabs"),
        },
        TabBinding::Named(title) => Ok(tabs
            .into_iter()
            .find(|t| t.title == title)
            .map(SheetRef::from)),
    }
}

/// Like `locate`, but creates a missing named tab.
pub(crate) async fn ensure_exists(
    sheet: &mut (dyn Sheet + Send),
    binding: TabBinding,
) -> Res<SheetRef> {
    if let Some(found) = locate(sheet, binding).await? {
        debug!("Found tab '{}' ({})", found.title, found.sheet_id);
        return Ok(found);
    }
    match binding {
        // locate never returns None for First
        TabBinding::First => bail!("The spreadsheet has no tabs"),
        TabBinding::Named(title) => {
            info!("Creating tab '{title}'");
            let created = sheet.add_tab(title).await?;
            Ok(created.into())
        }
    }
}
