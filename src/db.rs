//! Creates the application's database schema.

use rusqlite::Connection;

use crate::{Error, transaction::create_transaction_table, user::create_user_table};

/// Create the tables for the domain models if they do not exist yet.
///
/// Foreign keys are switched on for `connection` so that deleting a user also
/// deletes their transactions.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;

    let transaction = connection.unchecked_transaction()?;
    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;
    transaction.commit()?;

    Ok(())
}
