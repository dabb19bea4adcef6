//! The registration page and the handler that creates new user accounts.
use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error, PasswordHash,
    auth::get_token_from_cookies,
    endpoints,
    html::{
        FORM_LABEL_STYLE, base, form_error, link, log_in_register, password_input, submit_button,
        text_input,
    },
    internal_server_error::get_internal_server_error_redirect,
    user::{Email, Gender, NewUser, Username, create_user, email_taken, username_taken},
};

const FIELDS_REQUIRED_MSG: &str = "Fields are required";
const PASSWORDS_DO_NOT_MATCH_MSG: &str = "Passwords do not match";
const USERNAME_TAKEN_MSG: &str = "Username is already taken";
const EMAIL_TAKEN_MSG: &str = "Email is already taken";
const INVALID_EMAIL_MSG: &str = "Please enter a valid email address";
const INVALID_GENDER_MSG: &str = "Please choose a gender";

fn gender_input(selected: &str) -> Markup {
    let options = [
        (Gender::Male, "Male"),
        (Gender::Female, "Female"),
        (Gender::Other, "Other"),
    ];

    html! {
        fieldset
        {
            legend class=(FORM_LABEL_STYLE) { "Gender" }

            div class="flex gap-4"
            {
                @for (gender, label) in options {
                    label class="flex items-center gap-2 text-sm text-gray-900 dark:text-white"
                    {
                        input
                            type="radio"
                            name="gender"
                            value=(gender.as_str())
                            required
                            checked[selected == gender.as_str()];

                        (label)
                    }
                }
            }
        }
    }
}

fn registration_form(form: &RegisterForm, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::USERS)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("email", "Email", "email", &form.email, true))
            (text_input("username", "Username", "text", &form.username, true))
            (password_input("password", "Password", true, None))
            (password_input("confirm_password", "Confirm Password", true, None))
            (gender_input(&form.gender))

            (form_error(error_message))

            (submit_button("Create Account"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "
                (link(endpoints::LOG_IN_VIEW, "Log in here"))
            }
        }
    }
}

/// Display the registration page, or send users who are already logged in to the dashboard.
pub async fn get_register_page(jar: PrivateCookieJar) -> Response {
    if get_token_from_cookies(&jar).is_ok() {
        return Redirect::to(endpoints::DASHBOARD_VIEW).into_response();
    }

    let registration_form = registration_form(&RegisterForm::default(), None);
    let content = log_in_register("Create an account", &registration_form);
    base("Register", &[], &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost used to hash new passwords.
    pub password_cost: u32,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_cost: PasswordHash::DEFAULT_COST,
        }
    }
}

/// The raw data entered by the user in the registration form.
///
/// Missing fields deserialize as empty strings so that they are reported
/// on the form instead of rejected by the extractor.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub gender: String,
}

impl RegisterForm {
    fn has_empty_field(&self) -> bool {
        [
            self.email.trim(),
            self.username.trim(),
            self.password.as_str(),
            self.confirm_password.as_str(),
            self.gender.trim(),
        ]
        .iter()
        .any(|field| field.is_empty())
    }
}

/// Create a new user and redirect the client to the log-in page.
///
/// The form is returned with an error message if any field is missing, the
/// passwords differ, the username or email is taken, or the email is invalid.
pub async fn register_user(
    State(state): State<RegistrationState>,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let rerender = |message: &str| registration_form(&user_data, Some(message)).into_response();

    if user_data.has_empty_field() {
        return rerender(FIELDS_REQUIRED_MSG);
    }

    if user_data.password != user_data.confirm_password {
        return rerender(PASSWORDS_DO_NOT_MATCH_MSG);
    }

    let Ok(username) = Username::new(&user_data.username) else {
        return rerender(FIELDS_REQUIRED_MSG);
    };

    let Ok(gender) = user_data.gender.parse::<Gender>() else {
        return rerender(INVALID_GENDER_MSG);
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return get_internal_server_error_redirect();
        }
    };

    match username_taken(&username, None, &connection) {
        Ok(false) => {}
        Ok(true) => return rerender(USERNAME_TAKEN_MSG),
        Err(error) => {
            tracing::error!("could not check whether the username is taken: {error}");
            return get_internal_server_error_redirect();
        }
    }

    let Ok(email) = Email::new(&user_data.email) else {
        return rerender(INVALID_EMAIL_MSG);
    };

    match email_taken(&email, &connection) {
        Ok(false) => {}
        Ok(true) => return rerender(EMAIL_TAKEN_MSG),
        Err(error) => {
            tracing::error!("could not check whether the email is taken: {error}");
            return get_internal_server_error_redirect();
        }
    }

    let password_hash = match PasswordHash::from_raw_password(&user_data.password, state.password_cost)
    {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return get_internal_server_error_redirect();
        }
    };

    let new_user = NewUser {
        username,
        email,
        password_hash,
        gender,
    };

    match create_user(new_user, &connection) {
        Ok(user) => {
            tracing::info!("registered user {} with ID {}", user.username, user.id);
            (
                HxRedirect(endpoints::LOG_IN_VIEW.to_owned()),
                StatusCode::SEE_OTHER,
            )
                .into_response()
        }
        Err(Error::DuplicateUsername) => rerender(USERNAME_TAKEN_MSG),
        Err(Error::DuplicateEmail) => rerender(EMAIL_TAKEN_MSG),
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            get_internal_server_error_redirect()
        }
    }
}

#[cfg(test)]
mod get_register_page_tests {
    use axum::http::StatusCode;
    use axum_extra::extract::PrivateCookieJar;

    use crate::{
        UserID,
        app_state::create_cookie_key,
        auth::{DEFAULT_COOKIE_DURATION, set_auth_cookie},
        endpoints,
        test_utils::{
            assert_content_type, assert_form_input, assert_form_submit_button_with_text,
            assert_hx_endpoint, assert_valid_html, must_get_form, parse_html_document,
        },
    };

    use super::get_register_page;

    fn get_jar() -> PrivateCookieJar {
        PrivateCookieJar::new(create_cookie_key("foobar"))
    }

    #[tokio::test]
    async fn render_register_page() {
        let response = get_register_page(get_jar()).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");

        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let form = must_get_form(&document);
        assert_hx_endpoint(&form, endpoints::USERS, "hx-post");
        assert_form_input(&form, "email", "email");
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "password", "password");
        assert_form_input(&form, "confirm_password", "password");
        assert_form_input(&form, "gender", "radio");
        assert_form_submit_button_with_text(&form, "Create Account");
    }

    #[tokio::test]
    async fn register_page_redirects_authenticated_user() {
        let jar = set_auth_cookie(get_jar(), UserID::new(1), DEFAULT_COOKIE_DURATION).unwrap();

        let response = get_register_page(jar).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            endpoints::DASHBOARD_VIEW
        );
    }
}

#[cfg(test)]
mod register_user_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, http::StatusCode, routing::post};
    use axum_test::{TestResponse, TestServer};
    use rusqlite::Connection;

    use crate::{
        db::initialize,
        endpoints,
        user::{Gender, get_user_by_username, test_utils::create_test_user},
    };

    use super::{
        EMAIL_TAKEN_MSG, FIELDS_REQUIRED_MSG, INVALID_EMAIL_MSG, PASSWORDS_DO_NOT_MATCH_MSG,
        RegistrationState, USERNAME_TAKEN_MSG, register_user,
    };

    fn get_test_server() -> (TestServer, Arc<Mutex<Connection>>) {
        let connection =
            Connection::open_in_memory().expect("Could not open in-memory SQLite database");
        initialize(&connection).expect("Could not initialize database");
        let db_connection = Arc::new(Mutex::new(connection));

        let state = RegistrationState {
            db_connection: db_connection.clone(),
            password_cost: 4,
        };
        let app = Router::new()
            .route(endpoints::USERS, post(register_user))
            .with_state(state);

        (
            TestServer::new(app),
            db_connection,
        )
    }

    async fn register(server: &TestServer, fields: &[(&str, &str)]) -> TestResponse {
        server.post(endpoints::USERS).form(fields).await
    }

    fn valid_form<'a>() -> Vec<(&'a str, &'a str)> {
        vec![
            ("email", "alice@example.com"),
            ("username", "alice"),
            ("password", "hunter2"),
            ("confirm_password", "hunter2"),
            ("gender", "female"),
        ]
    }

    fn with_field<'a>(name: &'a str, value: &'a str) -> Vec<(&'a str, &'a str)> {
        valid_form()
            .into_iter()
            .map(|(key, old)| if key == name { (key, value) } else { (key, old) })
            .collect()
    }

    #[tokio::test]
    async fn register_creates_user_and_redirects_to_log_in() {
        let (server, db_connection) = get_test_server();

        let response = register(&server, &valid_form()).await;

        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("hx-redirect"), endpoints::LOG_IN_VIEW);

        let user = get_user_by_username("alice", &db_connection.lock().unwrap()).unwrap();
        assert_eq!(user.email.as_ref(), "alice@example.com");
        assert_eq!(user.gender, Gender::Female);
        assert_eq!(user.avatar, Gender::Female.default_avatar());
        assert!(user.password_hash.verify("hunter2").unwrap());
    }

    #[tokio::test]
    async fn register_fails_with_empty_field() {
        let (server, _) = get_test_server();

        for field in ["email", "username", "password", "confirm_password", "gender"] {
            let response = register(&server, &with_field(field, "")).await;

            response.assert_status_ok();
            response.assert_text_contains(FIELDS_REQUIRED_MSG);
        }
    }

    #[tokio::test]
    async fn register_fails_with_missing_field() {
        let (server, _) = get_test_server();

        let response = register(&server, &[("username", "alice")]).await;

        response.assert_status_ok();
        response.assert_text_contains(FIELDS_REQUIRED_MSG);
    }

    #[tokio::test]
    async fn register_fails_when_passwords_differ() {
        let (server, _) = get_test_server();

        let response = register(&server, &with_field("confirm_password", "hunter3")).await;

        response.assert_status_ok();
        response.assert_text_contains(PASSWORDS_DO_NOT_MATCH_MSG);
    }

    #[tokio::test]
    async fn register_fails_with_duplicate_username() {
        let (server, db_connection) = get_test_server();
        create_test_user("alice", &db_connection.lock().unwrap());

        let response = register(&server, &with_field("email", "someone@example.com")).await;

        response.assert_status_ok();
        response.assert_text_contains(USERNAME_TAKEN_MSG);
    }

    #[tokio::test]
    async fn second_signup_with_same_username_is_rejected() {
        let (server, db_connection) = get_test_server();

        register(&server, &valid_form())
            .await
            .assert_status(StatusCode::SEE_OTHER);
        let response = register(&server, &with_field("email", "alice2@example.com")).await;

        response.assert_status_ok();
        response.assert_text_contains(USERNAME_TAKEN_MSG);
        let user_count: i64 = db_connection
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM user", [], |row| row.get(0))
            .unwrap();
        assert_eq!(user_count, 1);
    }

    #[tokio::test]
    async fn register_fails_with_duplicate_email() {
        let (server, db_connection) = get_test_server();
        create_test_user("bob", &db_connection.lock().unwrap());

        let response = register(&server, &with_field("email", "bob@example.com")).await;

        response.assert_status_ok();
        response.assert_text_contains(EMAIL_TAKEN_MSG);
    }

    #[tokio::test]
    async fn register_fails_with_invalid_email() {
        let (server, _) = get_test_server();

        let response = register(&server, &with_field("email", "not-an-email")).await;

        response.assert_status_ok();
        response.assert_text_contains(INVALID_EMAIL_MSG);
    }

    #[tokio::test]
    async fn invalid_email_is_reported_before_uniqueness() {
        let (server, db_connection) = get_test_server();
        {
            let connection = db_connection.lock().unwrap();
            create_test_user("bob", &connection);
            connection
                .execute("UPDATE user SET email = 'not-an-email' WHERE username = 'bob'", ())
                .unwrap();
        }

        let response = register(&server, &with_field("email", "not-an-email")).await;

        response.assert_status_ok();
        response.assert_text_contains(INVALID_EMAIL_MSG);
        assert!(!response.text().contains(EMAIL_TAKEN_MSG));
    }
}
