use axum::{
    Extension,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    Error, UserID,
    app_state::DbState,
    endpoints::{self, format_endpoint},
    html::{FORM_CONTAINER_STYLE, base, dollar_input_styles, link, submit_button},
    navigation::NavBar,
    transaction::{
        Transaction, TransactionId,
        core::get_owned_transaction,
        form::{TransactionFormDefaults, transaction_form_fields},
    },
};

fn edit_transaction_view(transaction: &Transaction) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();
    let update_endpoint = format_endpoint(endpoints::TRANSACTION, transaction.id);
    let defaults = TransactionFormDefaults::from(transaction);

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full space-y-4 md:space-y-6"
            {
                h1 class="text-xl font-bold" { "Edit Transaction" }

                form
                    hx-put=(update_endpoint)
                    hx-target-error="#alert-container"
                    class="w-full space-y-4 md:space-y-6"
                {
                    (transaction_form_fields(&defaults))
                    (submit_button("Save changes"))
                }

                p class="text-sm" { (link(endpoints::TRANSACTIONS_VIEW, "Back to transactions")) }
            }
        }
    };

    base("Edit Transaction", &[dollar_input_styles()], &content)
}

/// Renders the page for editing one of the current user's transactions.
///
/// Responds with a 404 page if the transaction does not exist and a 403 page
/// if it belongs to someone else.
pub async fn get_edit_transaction_page(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_response();
        }
    };

    match get_owned_transaction(transaction_id, user_id, &connection) {
        Ok(transaction) => edit_transaction_view(&transaction).into_response(),
        Err(error) => error.into_response(),
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

    use crate::{
        app_state::DbState,
        db::initialize,
        test_utils::{
            assert_form_input_with_value, assert_form_submit_button_with_text, assert_hx_endpoint,
            assert_valid_html, must_get_form, parse_html_document,
        },
        transaction::{Category, NewTransaction, Transaction, core::create_transaction},
        user::{User, test_utils::create_test_user},
    };

    use super::get_edit_transaction_page;

    fn get_test_state() -> (DbState, User, User, Transaction) {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let alice = create_test_user("alice", &conn);
        let bob = create_test_user("bob", &conn);
        let transaction = create_transaction(
            NewTransaction {
                user_id: alice.id,
                date: "2024-01-01".to_owned(),
                name: "Salary".to_owned(),
                amount: 1000.0,
                category: Category::Income,
                counterparty: None,
            },
            &conn,
        )
        .unwrap();

        (DbState::new(conn), alice, bob, transaction)
    }

    #[tokio::test]
    async fn renders_prefilled_form() {
        let (state, alice, _, transaction) = get_test_state();

        let response = get_edit_transaction_page(
            State(state),
            Extension(alice.id),
            Path(transaction.id),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let form = must_get_form(&html);
        assert_hx_endpoint(
            &form,
            &format!("/api/transactions/{}", transaction.id),
            "hx-put",
        );
        assert_form_input_with_value(&form, "date", "date", "2024-01-01");
        assert_form_input_with_value(&form, "name", "text", "Salary");
        assert_form_input_with_value(&form, "amount", "number", "1000.00");
        assert_form_submit_button_with_text(&form, "Save changes");
    }

    #[tokio::test]
    async fn other_users_transaction_is_forbidden() {
        let (state, _, bob, transaction) = get_test_state();

        let response =
            get_edit_transaction_page(State(state), Extension(bob.id), Path(transaction.id)).await;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let (state, alice, _, transaction) = get_test_state();

        let response = get_edit_transaction_page(
            State(state),
            Extension(alice.id),
            Path(transaction.id + 100),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
