use axum::{
    Extension, Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;

use crate::{
    Error, UserID,
    app_state::DbState,
    balance::sync_cached_balance,
    endpoints,
    transaction::{
        TransactionId,
        core::update_transaction,
        validation::{TransactionForm, validate_transaction},
    },
};

/// A route handler for replacing one of the current user's transactions.
///
/// Redirects to the transactions page on success. The transaction is left
/// untouched if the form is invalid or the transaction belongs to another user.
pub async fn edit_transaction_endpoint(
    State(state): State<DbState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<TransactionId>,
    Form(form): Form<TransactionForm>,
) -> Response {
    let replacement = match validate_transaction(&form, user_id) {
        Ok(replacement) => replacement,
        Err(error) => return Error::from(error).into_alert_response(),
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    // The update and the cached balance are committed together or not at all.
    let result = connection
        .unchecked_transaction()
        .map_err(Error::from)
        .and_then(|db_transaction| {
            update_transaction(transaction_id, replacement, &db_transaction)?;
            sync_cached_balance(user_id, &db_transaction)?;
            db_transaction.commit()?;

            Ok(())
        });

    match result {
        Ok(()) => {}
        // Already logged by the ownership check.
        Err(
            error @ (Error::PermissionDenied | Error::NotFound | Error::UpdateMissingTransaction),
        ) => return error.into_alert_response(),
        Err(error) => {
            tracing::error!("could not update transaction {transaction_id}: {error}");
            return error.into_alert_response();
        }
    }

    (
        HxRedirect(endpoints::TRANSACTIONS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}
