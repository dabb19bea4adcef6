//! Success and error messages that HTMX swaps into the page's alert container.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

/// A message for the user about the outcome of a form submission.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// The request succeeded, with extra detail below the headline.
    Success { message: String, details: String },
    /// The request succeeded.
    SuccessSimple { message: String },
    /// The request failed, with an explanation below the headline.
    Error { message: String, details: String },
    /// The request failed.
    ErrorSimple { message: String },
}

impl Alert {
    pub fn into_html(self) -> Markup {
        let (is_error, message, details) = match self {
            Alert::Success { message, details } => (false, message, Some(details)),
            Alert::SuccessSimple { message } => (false, message, None),
            Alert::Error { message, details } => (true, message, Some(details)),
            Alert::ErrorSimple { message } => (true, message, None),
        };

        let style = if is_error {
            "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 dark:bg-gray-800 dark:text-red-400"
        } else {
            "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 dark:bg-gray-800 dark:text-green-400"
        };

        html! {
            div
                class=(style)
                role="alert"
                onclick="this.remove()"
            {
                span class="font-medium" { (message) }

                @if let Some(details) = details.filter(|details| !details.is_empty()) {
                    p { (details) }
                }
            }
        }
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        self.into_html().into_response()
    }
}
