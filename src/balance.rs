//! Totals of a user's transactions.

use rusqlite::Connection;

use crate::{Error, UserID, user::set_cached_balance};

/// The money a user has earned and spent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BalanceSummary {
    /// The sum of every transaction amount.
    pub balance: f64,
    /// The sum of income amounts, zero or positive.
    pub income: f64,
    /// The sum of expense amounts, zero or negative.
    pub expense: f64,
}

/// Add up the transactions of `user_id`.
///
/// All totals are zero for a user without transactions.
///
/// # Errors
/// Returns an [Error::SqlError] if the query fails.
pub fn get_balance_summary(
    user_id: UserID,
    connection: &Connection,
) -> Result<BalanceSummary, Error> {
    // TOTAL returns 0.0 for an empty set where SUM would return NULL.
    let summary = connection
        .prepare(
            "SELECT \
                TOTAL(amount), \
                TOTAL(CASE WHEN category = 'income' THEN amount END), \
                TOTAL(CASE WHEN category = 'expense' THEN amount END) \
            FROM \"transaction\" WHERE user_id = :user_id",
        )?
        .query_row(&[(":user_id", &user_id.as_i64())], |row| {
            Ok(BalanceSummary {
                balance: row.get(0)?,
                income: row.get(1)?,
                expense: row.get(2)?,
            })
        })?;

    Ok(summary)
}

/// Recompute the balance of `user_id` and store it on the user record.
///
/// Returns the recomputed summary.
///
/// # Errors
/// Returns an [Error::SqlError] if either query fails.
pub fn sync_cached_balance(
    user_id: UserID,
    connection: &Connection,
) -> Result<BalanceSummary, Error> {
    let summary = get_balance_summary(user_id, connection)?;
    set_cached_balance(user_id, summary.balance, connection)?;

    Ok(summary)
}
