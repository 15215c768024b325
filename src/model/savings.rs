use crate::error::{Error, ErrorType, Result};
use crate::model::codec::{cell, optional_cell, optional_text};
use crate::model::{parse_iso_date, Amount, RecordId, RowCodec};
use serde::{Deserialize, Serialize};

/// A single row of the savings goals tab.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsGoal {
    pub(crate) id: RecordId,
    pub(crate) name: String,
    pub(crate) target: Amount,
    pub(crate) current: Amount,
    #[serde(rename = "updatedAt", alias = "lastUpdated")]
    pub(crate) last_updated: String,
    pub(crate) target_date: Option<String>,
}

impl SavingsGoal {
    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn target(&self) -> Amount {
        self.target
    }

    pub fn current(&self) -> Amount {
        self.current
    }

    pub fn last_updated(&self) -> &str {
        &self.last_updated
    }

    pub fn target_date(&self) -> Option<&str> {
        self.target_date.as_deref()
    }

    /// Produces the merged goal that an update writes back: every field of `patch` that is present
    /// replaces the existing value, and `last_updated` is restamped.
    ///
    /// Only values that the patch changes are validated. A hand-edited row may hold a blank
    /// target, which reads as zero, and it must still accept a patch that leaves the target alone,
    /// including one that sends the stored zero back.
    pub(crate) fn merge(&self, patch: SavingsPatch, now: String) -> Result<SavingsGoal> {
        let target_date = match patch.target_date {
            None => self.target_date.clone(),
            Some(s) if s.trim().is_empty() => None,
            Some(s) => Some(parse_iso_date(&s)?),
        };
        let name = match patch.name.map(|s| s.trim().to_string()) {
            Some(name) if name != self.name => {
                validate_name(&name)?;
                name
            }
            _ => self.name.clone(),
        };
        let target = match patch.target {
            Some(target) if target != self.target => {
                validate_target(target)?;
                target
            }
            _ => self.target,
        };
        let current = match patch.current {
            Some(current) if current != self.current => {
                validate_current(current)?;
                current
            }
            _ => self.current,
        };
        Ok(SavingsGoal {
            id: self.id.clone(),
            name,
            target,
            current,
            last_updated: now,
            target_date,
        })
    }

    fn validate(&self) -> Result<()> {
        if self.id.is_empty() {
            return Err(Error::msg(ErrorType::Request, "A goal id is required"));
        }
        validate_name(&self.name)?;
        validate_target(self.target)?;
        validate_current(self.current)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::msg(ErrorType::Request, "A goal name is required"));
    }
    Ok(())
}

fn validate_target(target: Amount) -> Result<()> {
    if !target.is_positive() {
        return Err(Error::msg(
            ErrorType::Request,
            format!("The target must be greater than zero, got {target}"),
        ));
    }
    Ok(())
}

fn validate_current(current: Amount) -> Result<()> {
    if current.is_negative() {
        return Err(Error::msg(
            ErrorType::Request,
            format!("The current amount cannot be negative, got {current}"),
        ));
    }
    Ok(())
}

pub(super) const ID_IDX: usize = 0;
pub(super) const NAME_IDX: usize = 1;
pub(super) const TARGET_IDX: usize = 2;
pub(super) const CURRENT_IDX: usize = 3;
pub(super) const LAST_UPDATED_IDX: usize = 4;
pub(super) const TARGET_DATE_IDX: usize = 5;

impl RowCodec for SavingsGoal {
    const HEADERS: &'static [&'static str] = &[
        "ID",
        "Name",
        "Target",
        "Current",
        "Last Updated",
        "Target Date",
    ];

    const ID_COLUMN: usize = ID_IDX;

    fn id(&self) -> &RecordId {
        &self.id
    }

    fn encode(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.clone(),
            self.target.to_string(),
            self.current.to_string(),
            self.last_updated.clone(),
            optional_text(&self.target_date),
        ]
    }

    fn decode(cells: &[String]) -> Self {
        Self {
            id: RecordId::new(cell(cells, ID_IDX)),
            name: cell(cells, NAME_IDX).to_string(),
            target: Amount::from_cell(cell(cells, TARGET_IDX)),
            current: Amount::from_cell(cell(cells, CURRENT_IDX)),
            last_updated: cell(cells, LAST_UPDATED_IDX).to_string(),
            target_date: optional_cell(cells, TARGET_DATE_IDX),
        }
    }
}

/// A savings goal as submitted by a caller. The caller picks the id.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSavingsGoal {
    pub id: RecordId,
    pub name: String,
    pub target: Amount,
    #[serde(default)]
    pub current: Amount,
    #[serde(default)]
    pub target_date: Option<String>,
}

impl NewSavingsGoal {
    pub(crate) fn into_goal(self, last_updated: String) -> Result<SavingsGoal> {
        let target_date = match self.target_date {
            Some(s) if !s.trim().is_empty() => Some(parse_iso_date(&s)?),
            _ => None,
        };
        let goal = SavingsGoal {
            id: self.id,
            name: self.name.trim().to_string(),
            target: self.target,
            current: self.current,
            last_updated,
            target_date,
        };
        goal.validate()?;
        Ok(goal)
    }
}

/// The fields of a savings goal that an update may change. Absent fields keep their stored value.
/// A blank `target_date` clears it.
///
/// Unknown fields such as `id` and `updatedAt` are ignored so that a client can send back a whole
/// goal object.
#[derive(Debug, Default, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavingsPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target: Option<Amount>,
    #[serde(default)]
    pub current: Option<Amount>,
    #[serde(default)]
    pub target_date: Option<String>,
}
