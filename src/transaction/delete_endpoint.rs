use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::html;

use crate::{
    Error, UserID,
    alert::Alert,
    app_state::DbState,
    balance::sync_cached_balance,
    transaction::{TransactionId, core::delete_transaction},
};

/// A route handler for deleting one of the current user's transactions.
///
/// Responds with 200 OK and an out-of-band success alert so that HTMX removes
/// the table row, or an alert describing why the transaction was kept.
pub async fn delete_transaction_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    // The deletion and the cached balance are committed together or not at all.
    let result = connection
        .unchecked_transaction()
        .map_err(Error::from)
        .and_then(|db_transaction| {
            delete_transaction(transaction_id, user_id, &db_transaction)?;
            sync_cached_balance(user_id, &db_transaction)?;
            db_transaction.commit()?;

            Ok(())
        });

    match result {
        // The status code has to be 200 OK or HTMX will not delete the table row.
        Ok(()) => {
            let alert = Alert::SuccessSimple {
                message: "Transaction deleted".to_owned(),
            };

            html! {
                div id="alert-container" hx-swap-oob="innerHTML" { (alert.into_html()) }
            }
            .into_response()
        }
        // Already logged by the ownership check.
        Err(
            error @ (Error::PermissionDenied | Error::NotFound | Error::DeleteMissingTransaction),
        ) => error.into_alert_response(),
        Err(error) => {
            tracing::error!("could not delete transaction {transaction_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension,
        extract::{Path, State},
        http::StatusCode,
    };
    use rusqlite::Connection;
    use scraper::Selector;

    use crate::{
        Error,
        app_state::DbState,
        db::initialize,
        test_utils::parse_html_fragment,
        transaction::{
            Category, NewTransaction, Transaction,
            core::{create_transaction, get_transaction},
        },
        user::{User, test_utils::create_test_user},
    };

    use super::delete_transaction_endpoint;

    fn get_test_state() -> (DbState, User, User, Transaction) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        let transaction = create_transaction(
            NewTransaction {
                user_id: alice.id,
                date: "2025-10-26".to_owned(),
                name: "Test".to_owned(),
                amount: -1.23,
                category: Category::Expense,
                counterparty: None,
            },
            &conn,
        )
        .unwrap();

        (DbState::new(conn), alice, bob, transaction)
    }

    #[tokio::test]
    async fn deletes_transaction() {
        let (state, alice, _, transaction) = get_test_state();

        let response = delete_transaction_endpoint(
            State(state.clone()),
            Extension(alice.id),
            Path(transaction.id),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(
            get_transaction(transaction.id, &connection),
            Err(Error::NotFound)
        );
    }

    #[tokio::test]
    async fn delete_shows_success_alert() {
        let (state, alice, _, transaction) = get_test_state();

        let response =
            delete_transaction_endpoint(State(state), Extension(alice.id), Path(transaction.id))
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;
        let alert = html
            .select(&Selector::parse("#alert-container[hx-swap-oob] div[role=alert]").unwrap())
            .next()
            .expect("expected out-of-band success alert");
        assert!(alert.text().collect::<String>().contains("Transaction deleted"));
    }

    #[tokio::test]
    async fn failed_balance_sync_keeps_transaction() {
        let (state, alice, _, transaction) = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            connection
                .execute_batch(
                    "CREATE TRIGGER freeze_balance BEFORE UPDATE OF balance ON user
                    BEGIN SELECT RAISE(ABORT, 'balance is frozen'); END;",
                )
                .unwrap();
        }

        let response = delete_transaction_endpoint(
            State(state.clone()),
            Extension(alice.id),
            Path(transaction.id),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_transaction(transaction.id, &connection), Ok(transaction));
    }

    #[tokio::test]
    async fn cannot_delete_other_users_transaction() {
        let (state, _, bob, transaction) = get_test_state();

        let response = delete_transaction_endpoint(
            State(state.clone()),
            Extension(bob.id),
            Path(transaction.id),
        )
        .await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_transaction(transaction.id, &connection), Ok(transaction));
    }

    #[tokio::test]
    async fn deleting_twice_is_not_found() {
        let (state, alice, _, transaction) = get_test_state();

        delete_transaction_endpoint(
            State(state.clone()),
            Extension(alice.id),
            Path(transaction.id),
        )
        .await;
        let response =
            delete_transaction_endpoint(State(state), Extension(alice.id), Path(transaction.id))
                .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
