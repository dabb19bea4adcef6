//! The profile page where users see their details and change their username or password.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, PasswordHash, UserID,
    alert::Alert,
    app_state::DbState,
    balance::get_balance_summary,
    endpoints,
    html::{FORM_CONTAINER_STYLE, base, format_currency, password_input, submit_button, text_input},
    navigation::NavBar,
    user::{User, Username, get_user_by_id, update_profile, username_taken},
};

const CURRENT_PASSWORD_REQUIRED_MSG: &str = "Please enter your current password";
const USERNAME_REQUIRED_MSG: &str = "Username is required";
const INCORRECT_PASSWORD_MSG: &str = "Current password is incorrect";
const USERNAME_TAKEN_MSG: &str = "Username is already taken";

fn profile_view(user: &User, balance: f64) -> Markup {
    let nav_bar = NavBar::new(endpoints::PROFILE_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            div class="w-full space-y-4 md:space-y-6"
            {
                div class="flex items-center gap-4"
                {
                    img
                        src=(user.avatar)
                        alt="Avatar"
                        class="w-16 h-16 rounded-full bg-gray-200 dark:bg-gray-700";

                    div
                    {
                        h1 class="text-xl font-bold" { (user.username) }
                        p class="text-sm text-gray-600 dark:text-gray-400" { (user.email) }
                        p class="text-sm text-gray-600 dark:text-gray-400"
                        {
                            "Balance: " (format_currency(balance))
                        }
                    }
                }

                form
                    hx-put=(endpoints::PROFILE_API)
                    hx-target="#alert-container"
                    hx-target-error="#alert-container"
                    hx-indicator="#indicator"
                    hx-disabled-elt="#submit-button"
                    class="w-full space-y-4 md:space-y-6"
                {
                    (text_input("username", "Username", "text", user.username.as_ref(), true))
                    (password_input("password", "New password (leave blank to keep)", false, None))
                    (password_input("current_password", "Current password", true, None))

                    (submit_button("Update profile"))
                }
            }
        }
    };

    base("Profile", &[], &content)
}

/// Display the current user's profile and the form for updating it.
pub async fn get_profile_page(
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

    Ok(profile_view(&user, summary.balance).into_response())
}

/// The state needed for updating a user's profile.
#[derive(Debug, Clone)]
pub struct ProfileState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost used to hash new passwords.
    pub password_cost: u32,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_cost: PasswordHash::DEFAULT_COST,
        }
    }
}

/// The profile form. An empty `password` keeps the current password.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ProfileForm {
    pub username: String,
    pub password: String,
    pub current_password: String,
}

fn reject(message: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Alert::ErrorSimple {
            message: message.to_owned(),
        },
    )
        .into_response()
}

/// Change the current user's username and, optionally, their password.
///
/// Nothing is changed unless the current password is correct.
pub async fn update_profile_endpoint(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ProfileForm>,
) -> Response {
    if form.current_password.is_empty() {
        return reject(CURRENT_PASSWORD_REQUIRED_MSG);
    }

    let Ok(username) = Username::new(&form.username) else {
        return reject(USERNAME_REQUIRED_MSG);
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let user = match get_user_by_id(user_id, &connection) {
        Ok(user) => user,
        Err(error) => {
            tracing::error!("could not get user {user_id}: {error}");
            return error.into_alert_response();
        }
    };

    match user.password_hash.verify(&form.current_password) {
        Ok(true) => {}
        Ok(false) => return reject(INCORRECT_PASSWORD_MSG),
        Err(error) => {
            tracing::error!("could not verify the password of user {user_id}: {error}");
            return Error::HashingError(error.to_string()).into_alert_response();
        }
    }

    match username_taken(&username, Some(user_id), &connection) {
        Ok(false) => {}
        Ok(true) => return reject(USERNAME_TAKEN_MSG),
        Err(error) => {
            tracing::error!("could not check whether the username is taken: {error}");
            return error.into_alert_response();
        }
    }

    let password_hash = if form.password.is_empty() {
        user.password_hash
    } else {
        match PasswordHash::from_raw_password(&form.password, state.password_cost) {
            Ok(hash) => hash,
            Err(error) => {
                tracing::error!("an error occurred while hashing a password: {error}");
                return error.into_alert_response();
            }
        }
    };

    match update_profile(user_id, &username, &password_hash, &connection) {
        Ok(()) => {
            tracing::info!("user {user_id} updated their profile");
            Alert::Success {
                message: "Profile updated".to_owned(),
                details: "Your changes have been saved.".to_owned(),
            }
            .into_response()
        }
        Err(Error::DuplicateUsername) => reject(USERNAME_TAKEN_MSG),
        Err(error) => {
            tracing::error!("could not update the profile of user {user_id}: {error}");
            error.into_alert_response()
        }
    }
}

#[cfg(test)]
mod get_profile_page_tests {
    use axum::{Extension, extract::State, http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;

    use crate::{
        app_state::DbState,
        db::initialize,
        endpoints,
        test_utils::{
            assert_form_input, assert_form_submit_button_with_text, assert_hx_endpoint,
            assert_valid_html, must_get_form, parse_html_document,
        },
        transaction::{Category, NewTransaction, create_transaction},
        user::test_utils::create_test_user,
    };

    use super::get_profile_page;

    #[tokio::test]
    async fn shows_recomputed_balance() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_test_user("alice", &conn);
        // Stored without syncing the cached balance on the user record.
        create_transaction(
            NewTransaction {
                user_id: user.id,
                date: "2024-01-01".to_owned(),
                name: "Salary".to_owned(),
                amount: 1000.0,
                category: Category::Income,
                counterparty: None,
            },
            &conn,
        )
        .unwrap();

        let response = get_profile_page(State(DbState::new(conn)), Extension(user.id))
            .await
            .into_response();

        let html = parse_html_document(response).await;
        let text = html.root_element().text().collect::<String>();
        assert!(
            text.contains("Balance: $1,000.00"),
            "want recomputed balance in {text:?}"
        );
    }

    #[tokio::test]
    async fn shows_user_details_and_form() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let user = create_test_user("alice", &conn);

        let response = get_profile_page(State(DbState::new(conn)), Extension(user.id))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        let html = parse_html_document(response).await;
        assert_valid_html(&html);
        let text = html.root_element().text().collect::<String>();
        assert!(text.contains("alice@example.com"));

        let form = must_get_form(&html);
        assert_hx_endpoint(&form, endpoints::PROFILE_API, "hx-put");
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "current_password", "password");
        assert_form_submit_button_with_text(&form, "Update profile");
    }
}
