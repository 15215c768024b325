//! Delete command handler.

use crate::api::Mode;
use crate::args::CollectionName;
use crate::commands::Out;
use crate::model::RecordId;
use crate::store::{Expenses, Savings, Store};
use crate::{Config, Result};

/// Deletes the record with `id` from `collection`. Returns the canonical id that was deleted.
///
/// # Errors
/// - `ErrorType::NotFound` if no row has this id.
pub async fn delete(
    config: Config,
    mode: Mode,
    collection: CollectionName,
    id: &str,
) -> Result<Out<String>> {
    let id = RecordId::new(id);
    let backend = config.backend(mode).await?;
    let mut store = Store::new(backend.sheet());
    match collection {
        CollectionName::Expenses => store.delete::<Expenses>(&id).await?,
        CollectionName::Savings => store.delete::<Savings>(&id).await?,
    }
    Ok(Out::new(
        format!("Deleted {id} from {collection}"),
        id.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorType;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_delete_expense() {
        let env = TestEnv::new().await;
        let before = env.get_state().rows("Sheet1").unwrap().len();

        let out = delete(env.config(), Mode::Test, CollectionName::Expenses, " tx-0001 ")
            .await
            .unwrap();
        assert_eq!(out.structure().unwrap(), "tx-0001");

        let state = env.get_state();
        let rows = state.rows("Sheet1").unwrap();
        assert_eq!(rows.len(), before - 1);
        assert!(rows.iter().all(|row| row.get(8).map(String::as_str) != Some("tx-0001")));
    }

    #[tokio::test]
    async fn test_delete_savings_numeric_id() {
        let env = TestEnv::new().await;
        delete(env.config(), Mode::Test, CollectionName::Savings, "1704067200000.0")
            .await
            .unwrap();
        assert_eq!(env.get_state().rows("Sheet2").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing() {
        let env = TestEnv::new().await;
        let state = env.get_state();
        let err = delete(env.config(), Mode::Test, CollectionName::Expenses, "nope")
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
        assert_eq!(env.get_state(), state);
    }
}
