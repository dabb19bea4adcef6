//! Turns submitted transaction forms into transactions that are safe to store.

use serde::Deserialize;

use crate::{
    UserID,
    transaction::{Category, Counterparty, NewTransaction},
};

/// The raw form data for creating or editing a transaction.
///
/// Every field is kept as text so that the validation rules decide what a
/// missing or malformed field means instead of the form extractor.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct TransactionForm {
    pub date: String,
    pub name: String,
    pub amount: String,
    pub category: String,
    pub send_to: String,
    pub receive_from: String,
}

/// The reasons a transaction form can be rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransactionError {
    /// The date, name or amount is missing, or the amount is zero.
    #[error("fields required")]
    FieldsRequired,

    /// The amount is not a number.
    #[error("amount must be a number")]
    InvalidAmount,

    /// A negative amount was not recorded as an expense.
    #[error("amount must be positive for income")]
    AmountMustBePositive,

    /// A positive amount was not recorded as income.
    #[error("amount must be negative for expense")]
    AmountMustBeNegative,

    /// Both a recipient and a sender were given.
    #[error("a transaction cannot both send to and receive from someone")]
    BothCounterparties,

    /// The counterparty contradicts the category.
    #[error("inconsistent")]
    Inconsistent,
}

/// Check `form` and build a transaction owned by `user_id`.
///
/// The rules are applied in order and the first failure is returned:
/// 1. date, name and amount must be present and the amount must not be zero,
/// 2. a negative amount must be an expense,
/// 3. a positive amount must be income,
/// 4. at most one of send to and receive from may be set,
/// 5. the counterparty must agree with the category.
///
/// Blank counterparties are treated as absent.
pub fn validate_transaction(
    form: &TransactionForm,
    user_id: UserID,
) -> Result<NewTransaction, TransactionError> {
    let date = form.date.trim();
    let name = form.name.trim();
    let raw_amount = form.amount.trim();

    if date.is_empty() || name.is_empty() || raw_amount.is_empty() {
        return Err(TransactionError::FieldsRequired);
    }

    let amount: f64 = raw_amount
        .parse()
        .map_err(|_| TransactionError::InvalidAmount)?;

    if !amount.is_finite() {
        return Err(TransactionError::InvalidAmount);
    }

    if amount == 0.0 {
        return Err(TransactionError::FieldsRequired);
    }

    let category = form.category.trim().parse::<Category>().ok();

    if amount < 0.0 && category != Some(Category::Expense) {
        return Err(TransactionError::AmountMustBePositive);
    }

    if amount > 0.0 && category != Some(Category::Income) {
        return Err(TransactionError::AmountMustBeNegative);
    }

    // The sign checks above only pass for a known category.
    let category = category.ok_or(TransactionError::FieldsRequired)?;

    let send_to = non_blank(&form.send_to);
    let receive_from = non_blank(&form.receive_from);

    let counterparty = match (send_to, receive_from) {
        (Some(_), Some(_)) => return Err(TransactionError::BothCounterparties),
        (Some(name), None) => Some(Counterparty::SendTo(name.to_owned())),
        (None, Some(name)) => Some(Counterparty::ReceiveFrom(name.to_owned())),
        (None, None) => None,
    };

    let inconsistent = match &counterparty {
        Some(Counterparty::ReceiveFrom(_)) => amount <= 0.0 && category != Category::Income,
        Some(Counterparty::SendTo(_)) => amount <= 0.0 && category != Category::Expense,
        None => false,
    };

    if inconsistent {
        return Err(TransactionError::Inconsistent);
    }

    Ok(NewTransaction {
        user_id,
        date: date.to_owned(),
        name: name.to_owned(),
        amount,
        category,
        counterparty,
    })
}

fn non_blank(text: &str) -> Option<&str> {
    let text = text.trim();
    (!text.is_empty()).then_some(text)
}
