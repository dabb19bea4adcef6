//! Defines the route handler for the page that lists a user's transactions.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    Error, UserID,
    app_state::DbState,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_DELETE_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, format_currency,
    },
    navigation::NavBar,
    transaction::{Category, Counterparty, Transaction, core::get_transactions_for_user},
};

fn counterparty_text(counterparty: Option<&Counterparty>) -> String {
    match counterparty {
        Some(Counterparty::SendTo(name)) => format!("To {name}"),
        Some(Counterparty::ReceiveFrom(name)) => format!("From {name}"),
        None => String::new(),
    }
}

fn transactions_view(transactions: &[Transaction]) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();

    let table_row = |transaction: &Transaction| {
        let amount_style = match transaction.category {
            Category::Income => "text-green-600 dark:text-green-400",
            Category::Expense => "text-red-600 dark:text-red-400",
        };

        html!(
            tr class=(TABLE_ROW_STYLE)
            {
                td class=(TABLE_CELL_STYLE) { (transaction.date) }

                th scope="row" class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
                {
                    (transaction.name)
                }

                td class={(TABLE_CELL_STYLE) " " (amount_style)}
                {
                    (format_currency(transaction.amount))
                }

                td class=(TABLE_CELL_STYLE)
                {
                    (counterparty_text(transaction.counterparty.as_ref()))
                }

                td class=(TABLE_CELL_STYLE)
                {
                    div class="flex gap-4"
                    {
                        a
                            href=(format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id))
                            class=(LINK_STYLE)
                        {
                            "Edit"
                        }

                        button
                            hx-delete=(format_endpoint(endpoints::TRANSACTION, transaction.id))
                            hx-confirm={
                                "Are you sure you want to delete '" (transaction.name) "'?"
                            }
                            hx-target="closest tr"
                            hx-target-error="#alert-container"
                            hx-swap="delete"
                            class=(BUTTON_DELETE_STYLE)
                        {
                           "Delete"
                        }
                    }
                }
            }
        )
    };

    let content = html!(
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="relative w-full max-w-screen-lg"
            {
                div class="flex justify-between flex-wrap items-end mb-4"
                {
                    h1 class="text-xl font-bold" { "Transactions" }

                    a href=(endpoints::DASHBOARD_VIEW) class=(LINK_STYLE)
                    {
                        "Add Transaction"
                    }
                }

                div class="overflow-x-auto dark:bg-gray-800"
                {
                    table class="w-full text-sm text-left rtl:text-right
                        text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Counterparty" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Actions" }
                            }
                        }

                        tbody
                        {
                            @for transaction in transactions {
                                (table_row(transaction))
                            }

                            @if transactions.is_empty() {
                                tr
                                {
                                    td
                                        colspan="5"
                                        data-empty-state="true"
                                        class="px-6 py-4 text-center
                                            text-gray-500 dark:text-gray-400"
                                    {
                                        "No transactions yet. "
                                        a href=(endpoints::DASHBOARD_VIEW) class=(LINK_STYLE)
                                        {
                                            "Record your first transaction"
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Transactions", &[], &content)
}

/// Renders the table of the current user's transactions, most recent first.
pub async fn get_transactions_page(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let transactions = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return Error::DatabaseLockError.into_response();
            }
        };

        match get_transactions_for_user(user_id, &connection) {
            Ok(transactions) => transactions,
            Err(error) => {
                tracing::error!("could not get transactions for user {user_id}: {error}");
                return error.into_response();
            }
        }
    };

    transactions_view(&transactions).into_response()
}
