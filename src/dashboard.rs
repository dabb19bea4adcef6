//! The dashboard: the user's totals and the form for recording a new transaction.

use axum::{
    Extension,
    extract::State,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    app_state::DbState,
    balance::{BalanceSummary, get_balance_summary},
    endpoints,
    html::{PAGE_CONTAINER_STYLE, base, dollar_input_styles, format_currency, link, submit_button},
    navigation::NavBar,
    transaction::{TransactionFormDefaults, transaction_form_fields},
    user::get_user_by_id,
};

fn total_card(title: &str, amount: f64, id: &str) -> Markup {
    html! {
        div
            class="bg-white dark:bg-gray-800 border border-gray-200
                dark:border-gray-700 rounded-lg p-4 shadow-md"
        {
            h3 class="text-sm font-medium text-gray-600 dark:text-gray-400" { (title) }

            p id=(id) class="mt-2 text-2xl font-semibold" { (format_currency(amount)) }
        }
    }
}

/// The balance, income and expense cards.
///
/// With `swap_oob` set, HTMX swaps the cards into the page from the response
/// to another request.
pub(crate) fn balance_totals(summary: &BalanceSummary, swap_oob: bool) -> Markup {
    html! {
        section
            id="balance-totals"
            hx-swap-oob=[swap_oob.then_some("true")]
            class="grid grid-cols-1 sm:grid-cols-3 gap-4"
        {
            (total_card("Balance", summary.balance, "balance"))
            (total_card("Income", summary.income, "income"))
            (total_card("Expenses", summary.expense, "expense"))
        }
    }
}

/// The form for recording a new transaction, dated `today` by default.
///
/// A successful submission replaces the whole section, which clears the form.
pub(crate) fn new_transaction_form(today: String) -> Markup {
    let defaults = TransactionFormDefaults::new(today);

    html! {
        section id="new-transaction" class="max-w-md space-y-4"
        {
            h2 class="text-lg font-semibold" { "New Transaction" }

            form
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-target="#new-transaction"
                hx-swap="outerHTML"
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                (transaction_form_fields(&defaults))
                (submit_button("Add transaction"))
            }

            p class="text-sm" { (link(endpoints::TRANSACTIONS_VIEW, "View all transactions")) }
        }
    }
}

/// Today's date in UTC, the default date for new transactions.
pub(crate) fn today() -> String {
    OffsetDateTime::now_utc().date().to_string()
}

fn dashboard_view(username: &str, summary: &BalanceSummary, today: String) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-screen-lg space-y-8"
            {
                h1 class="text-xl font-bold" { "Welcome back, " (username) }

                (balance_totals(summary, false))

                (new_transaction_form(today))
            }
        }
    };

    base("Dashboard", &[dollar_input_styles()], &content)
}

/// Display the current user's balance, income and expense totals.
pub async fn get_dashboard_page(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let user = get_user_by_id(user_id, &connection)
        .inspect_err(|error| tracing::error!("could not get user {user_id}: {error}"))?;
    let summary = get_balance_summary(user_id, &connection)
        .inspect_err(|error| tracing::error!("could not get balance summary: {error}"))?;

    Ok(dashboard_view(user.username.as_ref(), &summary, today()).into_response())
}
