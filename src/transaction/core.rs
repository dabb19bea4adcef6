//! Defines the core data models and database queries for transactions.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::{Error, UserID};

/// The database ID of a transaction.
pub type TransactionId = i64;

// ============================================================================
// MODELS
// ============================================================================

/// Whether a transaction earned or spent money.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Money earned. Income amounts are positive.
    Income,
    /// Money spent. Expense amounts are negative.
    Expense,
}

impl Category {
    /// The string stored in the database and used in forms.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Income => "income",
            Category::Expense => "expense",
        }
    }
}

impl FromStr for Category {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(Category::Income),
            "expense" => Ok(Category::Expense),
            _ => Err(()),
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The other party of a transaction.
///
/// A transaction either sends money to someone or receives money from
/// someone, never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Counterparty {
    /// Who the money was sent to.
    SendTo(String),
    /// Who the money was received from.
    ReceiveFrom(String),
}

impl Counterparty {
    /// Split into the `send_to` and `receive_from` columns.
    fn as_columns(counterparty: Option<&Counterparty>) -> (Option<&str>, Option<&str>) {
        match counterparty {
            Some(Counterparty::SendTo(name)) => (Some(name), None),
            Some(Counterparty::ReceiveFrom(name)) => (None, Some(name)),
            None => (None, None),
        }
    }

    /// The counterparty's name.
    pub fn name(&self) -> &str {
        match self {
            Counterparty::SendTo(name) | Counterparty::ReceiveFrom(name) => name,
        }
    }
}

/// An expense or income recorded by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// When the transaction happened, as entered by the user.
    pub date: String,
    /// A short description of the transaction.
    pub name: String,
    /// The amount of money earned (positive) or spent (negative).
    pub amount: f64,
    /// Whether the transaction is income or an expense.
    pub category: Category,
    /// Who the money was sent to or received from.
    pub counterparty: Option<Counterparty>,
    /// The user that owns the transaction.
    pub user_id: UserID,
}

/// A validated transaction that is ready to be stored.
///
/// Use [crate::transaction::validate_transaction] to create one from form data.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: UserID,
    pub date: String,
    pub name: String,
    pub amount: f64,
    pub category: Category,
    pub counterparty: Option<Counterparty>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                name TEXT NOT NULL,
                amount REAL NOT NULL,
                category TEXT NOT NULL,
                send_to TEXT,
                receive_from TEXT,
                user_id INTEGER NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON DELETE CASCADE
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_user_id ON \"transaction\"(user_id);",
        (),
    )?;

    Ok(())
}

/// Store a new transaction.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error,
/// for example when `user_id` does not refer to an existing user.
pub fn create_transaction(
    new_transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let (send_to, receive_from) = Counterparty::as_columns(new_transaction.counterparty.as_ref());

    let transaction = connection
        .prepare(
            "INSERT INTO \"transaction\" (date, name, amount, category, send_to, receive_from, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, date, name, amount, category, send_to, receive_from, user_id",
        )?
        .query_row(
            params![
                new_transaction.date,
                new_transaction.name,
                new_transaction.amount,
                new_transaction.category.as_str(),
                send_to,
                receive_from,
                new_transaction.user_id.as_i64(),
            ],
            map_transaction_row,
        )?;

    Ok(transaction)
}

/// Retrieve a transaction from the database by its `id`.
///
/// This does not check who owns the transaction, use [get_owned_transaction]
/// when acting on behalf of a user.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(
            "SELECT id, date, name, amount, category, send_to, receive_from, user_id
             FROM \"transaction\" WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Retrieve the transaction `id` if it belongs to `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::PermissionDenied] if the transaction belongs to another user,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_owned_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = get_transaction(id, connection)?;

    if transaction.user_id != user_id {
        tracing::warn!(
            "user {user_id} tried to access transaction {id} which belongs to user {}",
            transaction.user_id
        );
        return Err(Error::PermissionDenied);
    }

    Ok(transaction)
}

/// Get all of the transactions belonging to `user_id`, most recent first.
///
/// # Errors
/// This function will return a [Error::SqlError] there is some SQL error.
pub fn get_transactions_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(
            "SELECT id, date, name, amount, category, send_to, receive_from, user_id
             FROM \"transaction\" WHERE user_id = :user_id
             ORDER BY date DESC, id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_transaction_row)?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Overwrite the transaction `id` with `transaction`.
///
/// The ownership of the transaction is checked before it is changed.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::PermissionDenied] if the transaction belongs to another user,
/// - [Error::UpdateMissingTransaction] if the transaction disappeared before it could be updated,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    get_owned_transaction(id, transaction.user_id, connection)?;

    let (send_to, receive_from) = Counterparty::as_columns(transaction.counterparty.as_ref());

    let rows_affected = connection.execute(
        "UPDATE \"transaction\"
        SET \
            date = ?1, \
            name = ?2, \
            amount = ?3, \
            category = ?4, \
            send_to = ?5, \
            receive_from = ?6 \
        WHERE id = ?7 AND user_id = ?8;",
        params![
            transaction.date,
            transaction.name,
            transaction.amount,
            transaction.category.as_str(),
            send_to,
            receive_from,
            id,
            transaction.user_id.as_i64(),
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::UpdateMissingTransaction);
    }

    Ok(Transaction {
        id,
        date: transaction.date,
        name: transaction.name,
        amount: transaction.amount,
        category: transaction.category,
        counterparty: transaction.counterparty,
        user_id: transaction.user_id,
    })
}

/// Delete the transaction `id` on behalf of `user_id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - [Error::PermissionDenied] if the transaction belongs to another user,
/// - [Error::DeleteMissingTransaction] if the transaction disappeared before it could be deleted,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_transaction(
    id: TransactionId,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    get_owned_transaction(id, user_id, connection)?;

    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

/// Get the total number of transactions in the database.
#[cfg(test)]
pub fn count_transactions(connection: &Connection) -> Result<u32, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM \"transaction\";", [], |row| {
            row.get(0)
        })
        .map_err(|error| error.into())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let id = row.get(0)?;
    let date = row.get(1)?;
    let name = row.get(2)?;
    let amount = row.get(3)?;
    let raw_category: String = row.get(4)?;
    let category = raw_category.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("invalid category {raw_category:?}").into(),
        )
    })?;
    let send_to: Option<String> = row.get(5)?;
    let receive_from: Option<String> = row.get(6)?;
    let user_id = UserID::new(row.get(7)?);

    let counterparty = match (send_to, receive_from) {
        (Some(name), _) => Some(Counterparty::SendTo(name)),
        (None, Some(name)) => Some(Counterparty::ReceiveFrom(name)),
        (None, None) => None,
    };

    Ok(Transaction {
        id,
        date,
        name,
        amount,
        category,
        counterparty,
        user_id,
    })
}

// ============================================================================
// TESTS
// ============================================================================
