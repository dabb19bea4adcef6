use maud::{Markup, html};

use crate::{
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
    transaction::{Category, Counterparty, Transaction},
};

const FORM_RADIO_INPUT_STYLE: &str = "w-4 h-4 text-blue-600 bg-gray-100 border-gray-300 \
    focus:ring-blue-500 dark:focus:ring-blue-600 dark:bg-gray-700 dark:border-gray-600";

/// The values the transaction form starts with.
pub struct TransactionFormDefaults<'a> {
    pub date: String,
    pub name: &'a str,
    pub amount: Option<f64>,
    pub category: Category,
    pub send_to: &'a str,
    pub receive_from: &'a str,
}

impl TransactionFormDefaults<'_> {
    /// An empty expense dated `date`.
    pub fn new(date: String) -> Self {
        Self {
            date,
            name: "",
            amount: None,
            category: Category::Expense,
            send_to: "",
            receive_from: "",
        }
    }
}

impl<'a> From<&'a Transaction> for TransactionFormDefaults<'a> {
    fn from(transaction: &'a Transaction) -> Self {
        let (send_to, receive_from) = match &transaction.counterparty {
            Some(Counterparty::SendTo(name)) => (name.as_str(), ""),
            Some(Counterparty::ReceiveFrom(name)) => ("", name.as_str()),
            None => ("", ""),
        };

        Self {
            date: transaction.date.clone(),
            name: &transaction.name,
            amount: Some(transaction.amount),
            category: transaction.category,
            send_to,
            receive_from,
        }
    }
}

pub fn transaction_form_fields(defaults: &TransactionFormDefaults<'_>) -> Markup {
    let amount_str = defaults.amount.map(|amount| format!("{amount:.2}"));

    html! {
        div
        {
            label for="date" class=(FORM_LABEL_STYLE) { "Date" }

            input
                name="date"
                id="date"
                type="date"
                value=(defaults.date)
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="name" class=(FORM_LABEL_STYLE) { "Name" }

            input
                name="name"
                id="name"
                type="text"
                placeholder="Groceries"
                value=(defaults.name)
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

            div class="input-wrapper w-full"
            {
                input
                    name="amount"
                    id="amount"
                    type="number"
                    step="0.01"
                    placeholder="-12.50"
                    value=[amount_str.as_deref()]
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            p class="mt-1 text-xs text-gray-500 dark:text-gray-400"
            {
                "Use a negative amount for expenses."
            }
        }

        fieldset class="space-y-2"
        {
            legend class=(FORM_LABEL_STYLE) { "Category" }

            div class="flex gap-6"
            {
                @for category in [Category::Expense, Category::Income] {
                    @let id = format!("category-{}", category.as_str());

                    div class="flex items-center gap-2"
                    {
                        input
                            name="category"
                            id=(id)
                            type="radio"
                            value=(category.as_str())
                            checked[category == defaults.category]
                            required
                            class=(FORM_RADIO_INPUT_STYLE);

                        label for=(id) class="text-sm font-medium text-gray-900 dark:text-white"
                        {
                            @match category {
                                Category::Expense => "Expense",
                                Category::Income => "Income",
                            }
                        }
                    }
                }
            }
        }

        div
        {
            label for="send_to" class=(FORM_LABEL_STYLE) { "Send to (optional)" }

            input
                name="send_to"
                id="send_to"
                type="text"
                value=(defaults.send_to)
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label for="receive_from" class=(FORM_LABEL_STYLE) { "Receive from (optional)" }

            input
                name="receive_from"
                id="receive_from"
                type="text"
                value=(defaults.receive_from)
                class=(FORM_TEXT_INPUT_STYLE);
        }
    }
}
