//! Defines the endpoint for creating a new transaction.

use axum::{
    Extension, Form,
    extract::State,
    response::{IntoResponse, Response},
};
use maud::html;

use crate::{
    Error, UserID,
    alert::Alert,
    app_state::DbState,
    balance::sync_cached_balance,
    dashboard::{balance_totals, new_transaction_form, today},
    html::format_currency,
    transaction::{
        core::create_transaction,
        validation::{TransactionForm, validate_transaction},
    },
};

/// A route handler for creating a new transaction.
///
/// On success, responds with a fresh form, the updated dashboard totals and a
/// success alert. Invalid forms are answered with an alert and nothing is stored.
pub async fn create_transaction_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let new_transaction = match validate_transaction(&form, user_id) {
        Ok(new_transaction) => new_transaction,
        Err(error) => {
            tracing::debug!("rejected transaction from user {user_id}: {error}");
            return Error::from(error).into_alert_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    // The new row and the cached balance are committed together or not at all.
    let result = connection
        .unchecked_transaction()
        .map_err(Error::from)
        .and_then(|db_transaction| {
            let transaction = create_transaction(new_transaction, &db_transaction)?;
            let summary = sync_cached_balance(user_id, &db_transaction)?;
            db_transaction.commit()?;

            Ok((transaction, summary))
        });

    let (transaction, summary) = match result {
        Ok(created) => created,
        Err(error) => {
            tracing::error!("could not create transaction: {error}");
            return error.into_alert_response();
        }
    };

    let alert = Alert::Success {
        message: "Transaction created".to_owned(),
        details: format!(
            "Added {} for {}.",
            transaction.name,
            format_currency(transaction.amount)
        ),
    };

    html! {
        (new_transaction_form(today()))
        (balance_totals(&summary, true))
        div id="alert-container" hx-swap-oob="innerHTML" { (alert.into_html()) }
    }
    .into_response()
}

#[cfg(test)]
mod tests {
    use axum::{Extension, Form, extract::State, http::StatusCode};
    use rusqlite::Connection;
    use scraper::Selector;

    use crate::{
        app_state::DbState,
        db::initialize,
        endpoints,
        test_utils::{assert_hx_endpoint, must_get_form, parse_html_fragment},
        transaction::{
            core::{count_transactions, get_transactions_for_user},
            validation::TransactionForm,
        },
        user::{User, get_user_by_id, test_utils::create_test_user},
    };

    use super::create_transaction_endpoint;

    fn get_test_state() -> (DbState, User) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_test_user("alice", &conn);

        (DbState::new(conn), user)
    }

    fn salary_form() -> TransactionForm {
        TransactionForm {
            date: "2024-01-01".to_owned(),
            name: "Salary".to_owned(),
            amount: "1000".to_owned(),
            category: "income".to_owned(),
            receive_from: "Employer".to_owned(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn can_create_transaction() {
        let (state, user) = get_test_state();

        let response =
            create_transaction_endpoint(State(state.clone()), Extension(user.id), Form(salary_form()))
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        let connection = state.db_connection.lock().unwrap();
        let transactions = get_transactions_for_user(user.id, &connection).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].name, "Salary");
        assert_eq!(transactions[0].amount, 1000.0);
    }

    #[tokio::test]
    async fn create_updates_cached_balance() {
        let (state, user) = get_test_state();

        create_transaction_endpoint(State(state.clone()), Extension(user.id), Form(salary_form()))
            .await;

        let connection = state.db_connection.lock().unwrap();
        assert_eq!(get_user_by_id(user.id, &connection).unwrap().balance, 1000.0);
    }

    #[tokio::test]
    async fn invalid_transaction_is_not_stored() {
        let (state, user) = get_test_state();
        let form = TransactionForm {
            amount: "50".to_owned(),
            category: "expense".to_owned(),
            ..salary_form()
        };

        let response =
            create_transaction_endpoint(State(state.clone()), Extension(user.id), Form(form)).await;

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let html = parse_html_fragment(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(
            text.contains("Amount must be negative for expense"),
            "want validation message in alert, got {text:?}"
        );
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection), Ok(0));
    }

    #[tokio::test]
    async fn responds_with_fresh_form_totals_and_success_alert() {
        let (state, user) = get_test_state();

        let response =
            create_transaction_endpoint(State(state), Extension(user.id), Form(salary_form()))
                .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_fragment(response).await;

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::TRANSACTIONS_API, "hx-post");

        let balance = html
            .select(&Selector::parse("#balance-totals[hx-swap-oob] #balance").unwrap())
            .next()
            .expect("expected out-of-band balance totals");
        assert_eq!(balance.text().collect::<String>().trim(), "$1,000.00");

        let alert = html
            .select(&Selector::parse("#alert-container[hx-swap-oob] div[role=alert]").unwrap())
            .next()
            .expect("expected out-of-band success alert");
        let text = alert.text().collect::<String>();
        assert!(
            text.contains("Transaction created") && text.contains("Salary"),
            "got alert text {text:?}"
        );
    }

    #[tokio::test]
    async fn failed_balance_sync_stores_nothing() {
        let (state, user) = get_test_state();
        {
            let connection = state.db_connection.lock().unwrap();
            connection
                .execute_batch(
                    "CREATE TRIGGER freeze_balance BEFORE UPDATE OF balance ON user
                    BEGIN SELECT RAISE(ABORT, 'balance is frozen'); END;",
                )
                .unwrap();
        }

        let response =
            create_transaction_endpoint(State(state.clone()), Extension(user.id), Form(salary_form()))
                .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let connection = state.db_connection.lock().unwrap();
        assert_eq!(count_transactions(&connection), Ok(0));
    }
}
