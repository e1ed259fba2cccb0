//! The commands that change transactions on the server.
//!
//! Each one loads the month first, runs the mutation, and lets the controller read the month back
//! so that the printed status reflects what the server now holds.

use crate::api::Remote;
use crate::args::{CreateArgs, DeleteArgs, UpdateArgs};
use crate::commands::{describe, mutation_out, open, Out};
use crate::model::Period;
use crate::queue::Intent;
use crate::status::CollectionStatus;
use crate::{Config, Result};
use anyhow::bail;
use tracing::debug;

/// Creates a transaction. The month that holds its date is loaded before and after.
pub async fn create(
    config: Config,
    remote: Box<dyn Remote>,
    args: CreateArgs,
) -> Result<Out<CollectionStatus>> {
    let transaction = args.transaction()?;
    let period = Period::of(transaction.date());
    let mut controller = open(&config, remote, Some(period)).await?;

    let description = transaction.description().to_string();
    controller.enqueue(Intent::Create(transaction));
    let completions = controller.run_until_idle().await?;

    Ok(mutation_out(
        &format!("create transaction '{description}'"),
        &format!("Created transaction '{description}'"),
        &completions,
        controller.status(),
    ))
}

/// Changes the given fields of a transaction. The transaction must be in the loaded month.
pub async fn update(
    config: Config,
    remote: Box<dyn Remote>,
    args: UpdateArgs,
) -> Result<Out<CollectionStatus>> {
    let edit = args.edit()?;
    let period = args.period().period()?;
    let id = args.id();
    let mut controller = open(&config, remote, period).await?;

    if controller.status().is_error() {
        return Ok(Out::failure(
            format!(
                "Unable to update transaction {id}, {} could not be loaded",
                describe(period)
            ),
            controller.status().clone(),
        ));
    }
    let Some(existing) = controller.status().data().find(&id) else {
        bail!("Transaction {id} was not found in {}", describe(period));
    };
    let edited = existing.edited(edit)?;
    debug!("Updating {existing:?} to {edited:?}");

    controller.enqueue(Intent::Update(edited));
    let completions = controller.run_until_idle().await?;

    Ok(mutation_out(
        &format!("update transaction {id}"),
        &format!("Updated transaction {id}"),
        &completions,
        controller.status(),
    ))
}

/// Deletes a transaction, then shows the chosen month.
pub async fn delete(
    config: Config,
    remote: Box<dyn Remote>,
    args: DeleteArgs,
) -> Result<Out<CollectionStatus>> {
    let period = args.period().period()?;
    let id = args.id();
    let mut controller = open(&config, remote, period).await?;

    controller.enqueue(Intent::Delete(id.clone()));
    let completions = controller.run_until_idle().await?;

    Ok(mutation_out(
        &format!("delete transaction {id}"),
        &format!("Deleted transaction {id}"),
        &completions,
        controller.status(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RemoteCall;
    use crate::args::PeriodArgs;
    use crate::model::{TransactionEdit, TransactionType};
    use crate::queue::IntentKind;
    use crate::test::TestEnv;
    use chrono::NaiveDate;

    fn create_args(description: &str, date: NaiveDate) -> CreateArgs {
        CreateArgs::new(
            TransactionType::Debit,
            description,
            25,
            date,
            "Credit Card",
            "Groceries",
        )
    }

    fn feb() -> PeriodArgs {
        PeriodArgs::new(Some(2), Some(2024))
    }

    #[tokio::test]
    async fn test_create_reads_back_the_month() {
        let env = TestEnv::new().await;
        let args = create_args("Farmers Market", TestEnv::today());
        let out = create(env.config(), env.remote(), args).await.unwrap();

        assert!(!out.is_failure());
        assert_eq!(
            out.message(),
            "Created transaction 'Farmers Market', the month now has 13 transactions"
        );
        let status = out.structure().unwrap();
        assert!(!status.is_loading());
        assert!(status
            .data()
            .transactions()
            .iter()
            .any(|t| t.details().description() == "Farmers Market"));
        assert_eq!(status.data().metadata()["expense"], 2124);

        let feb = Some(Period::new(2, 2024).unwrap());
        assert_eq!(
            env.memory().calls(),
            vec![
                RemoteCall::GetMonthData(feb),
                RemoteCall::PostTransaction("Farmers Market".to_string()),
                RemoteCall::GetMonthData(feb),
            ]
        );
    }

    #[tokio::test]
    async fn test_create_failure_keeps_the_loaded_month() {
        let env = TestEnv::new().await;
        env.memory().fail_next(IntentKind::Create);
        let args = create_args("Farmers Market", TestEnv::today());
        let out = create(env.config(), env.remote(), args).await.unwrap();

        assert!(out.is_failure());
        assert!(out
            .message()
            .starts_with("Unable to create transaction 'Farmers Market'"));
        let status = out.structure().unwrap();
        assert!(status.is_error());
        assert_eq!(status.data().transactions().len(), 12);
        assert_eq!(env.memory().calls().len(), 2);
    }

    #[tokio::test]
    async fn test_create_then_refresh_failure() {
        let env = TestEnv::new().await;
        env.memory().fail_next(IntentKind::Fetch);
        env.memory().fail_next(IntentKind::Fetch);
        let args = create_args("Farmers Market", TestEnv::today());
        let out = create(env.config(), env.remote(), args).await.unwrap();

        // The initial load failed too, but the create itself went through.
        assert!(out.is_failure());
        assert_eq!(
            out.message(),
            "Created transaction 'Farmers Market', but the refreshed data could not be loaded"
        );
        assert_eq!(env.memory().transactions().len(), 13);
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_input() {
        let env = TestEnv::new().await;
        let args = CreateArgs::new(
            TransactionType::Credit,
            "",
            10,
            TestEnv::today(),
            "Cash",
            "Income",
        );
        assert!(create(env.config(), env.remote(), args).await.is_err());
        assert!(env.memory().calls().is_empty());
    }

    #[tokio::test]
    async fn test_update_changes_one_field() {
        let env = TestEnv::new().await;
        let target = env.memory().transactions()[2].clone();
        let edit = TransactionEdit {
            total_payment: Some(90),
            ..Default::default()
        };
        let args = UpdateArgs::new(target.id().as_str(), feb(), edit);
        let out = update(env.config(), env.remote(), args).await.unwrap();

        assert!(!out.is_failure());
        let updated = out.structure().unwrap().data().find(target.id()).unwrap();
        assert_eq!(updated.details().total_payment(), 90);
        assert_eq!(updated.details().description(), target.details().description());
        assert_eq!(
            env.memory().calls()[1],
            RemoteCall::UpdateTransaction(target.id().clone())
        );
    }

    #[tokio::test]
    async fn test_update_unknown_id() {
        let env = TestEnv::new().await;
        let edit = TransactionEdit {
            category: Some("Dining".to_string()),
            ..Default::default()
        };
        let args = UpdateArgs::new("missing", feb(), edit);
        let e = update(env.config(), env.remote(), args).await.unwrap_err();
        assert_eq!(
            e.to_string(),
            "Transaction missing was not found in 2024-02"
        );
        assert_eq!(env.memory().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_update_when_month_cannot_be_loaded() {
        let env = TestEnv::new().await;
        env.memory().fail_next(IntentKind::Fetch);
        let target = env.memory().transactions()[0].clone();
        let edit = TransactionEdit {
            description: Some("Paycheck".to_string()),
            ..Default::default()
        };
        let args = UpdateArgs::new(target.id().as_str(), feb(), edit);
        let out = update(env.config(), env.remote(), args).await.unwrap();

        assert!(out.is_failure());
        assert_eq!(env.memory().calls().len(), 1);
    }

    #[tokio::test]
    async fn test_delete() {
        let env = TestEnv::new().await;
        let target = env.memory().transactions()[1].clone();
        let args = DeleteArgs::new(target.id().as_str(), PeriodArgs::default());
        let out = delete(env.config(), env.remote(), args).await.unwrap();

        assert!(!out.is_failure());
        let status = out.structure().unwrap();
        assert_eq!(status.data().transactions().len(), 11);
        assert!(status.data().find(target.id()).is_none());
        assert_eq!(
            env.memory().calls(),
            vec![
                RemoteCall::GetMonthData(None),
                RemoteCall::DeleteTransaction(target.id().clone()),
                RemoteCall::GetMonthData(None),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_unknown_id_is_a_transport_failure() {
        let env = TestEnv::new().await;
        let args = DeleteArgs::new("missing", PeriodArgs::default());
        let out = delete(env.config(), env.remote(), args).await.unwrap();

        assert!(out.is_failure());
        assert!(out.message().contains("404"));
        assert_eq!(out.structure().unwrap().data().transactions().len(), 12);
    }
}
