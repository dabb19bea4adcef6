//! Transactions: the income and expenses recorded by each user.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the database functions for storing, querying and managing them
//! - The validation rules that turn form data into a `NewTransaction`
//! - The pages and endpoints for listing, creating, editing and deleting transactions
//!
//! Every function that reads or changes a single transaction on behalf of a
//! user checks that the user owns it first.

mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod edit_page;
mod form;
mod transactions_page;
mod validation;

pub use core::{
    Category, Counterparty, NewTransaction, Transaction, TransactionId, create_transaction,
    create_transaction_table, delete_transaction, get_transactions_for_user,
};
pub use create_endpoint::create_transaction_endpoint;
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use edit_page::get_edit_transaction_page;
pub(crate) use form::{TransactionFormDefaults, transaction_form_fields};
pub use transactions_page::get_transactions_page;
pub use validation::TransactionError;
