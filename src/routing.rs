//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post, put},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page, post_log_in,
        register_user,
    },
    dashboard::get_dashboard_page,
    endpoints,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    profile::{get_profile_page, update_profile_endpoint},
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, edit_transaction_endpoint,
        get_edit_transaction_page, get_transactions_page,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(
            endpoints::EDIT_TRANSACTION_VIEW,
            get(get_edit_transaction_page),
        )
        .route(endpoints::PROFILE_VIEW, get(get_profile_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST/PUT/DELETE routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(
                endpoints::TRANSACTIONS_API,
                post(create_transaction_endpoint),
            )
            .route(
                endpoints::TRANSACTION,
                put(edit_transaction_endpoint).delete(delete_transaction_endpoint),
            )
            .route(endpoints::PROFILE_API, put(update_profile_endpoint))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}


#[cfg(test)]
mod router_tests {
    use std::sync::{Arc, Mutex};

    use axum::http::StatusCode;
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        AppState, BalanceSummary,
        auth::COOKIE_TOKEN,
        build_router, endpoints,
        endpoints::format_endpoint,
        get_balance_summary,
        transaction::get_transactions_for_user,
        user::{
            User,
            test_utils::{TEST_PASSWORD, create_test_user},
        },
    };

    struct TestApp {
        server: TestServer,
        db_connection: Arc<Mutex<Connection>>,
        alice: User,
        bob: User,
    }

    fn get_test_app() -> TestApp {
        let connection = Connection::open_in_memory().unwrap();
        crate::initialize_db(&connection).unwrap();
        let alice = create_test_user("alice", &connection);
        let bob = create_test_user("bob", &connection);

        let state = AppState::new(connection, "42").unwrap();
        let db_connection = state.db_connection.clone();
        let server = TestServer::new(build_router(state));

        TestApp {
            server,
            db_connection,
            alice,
            bob,
        }
    }

    async fn log_in(server: &TestServer, username: &str) -> Cookie<'static> {
        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("username", username), ("password", TEST_PASSWORD)])
            .await;

        response.assert_status(StatusCode::SEE_OTHER);
        response.cookie(COOKIE_TOKEN)
    }

    fn balance(app: &TestApp, user: &User) -> BalanceSummary {
        get_balance_summary(user.id, &app.db_connection.lock().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn protected_pages_redirect_to_log_in() {
        let app = get_test_app();

        for path in [
            endpoints::DASHBOARD_VIEW,
            endpoints::TRANSACTIONS_VIEW,
            endpoints::PROFILE_VIEW,
        ] {
            let response = app.server.get(path).await;

            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(response.header("location"), endpoints::LOG_IN_VIEW);
        }
    }

    #[tokio::test]
    async fn unknown_path_is_not_found() {
        let app = get_test_app();

        let response = app.server.get("/does/not/exist").await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn balance_follows_created_transactions() {
        let app = get_test_app();
        let cookie = log_in(&app.server, "alice").await;

        let response = app
            .server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookie(cookie.clone())
            .form(&[
                ("date", "2024-01-01"),
                ("name", "Salary"),
                ("amount", "1000"),
                ("category", "income"),
                ("send_to", ""),
                ("receive_from", ""),
            ])
            .await;
        response.assert_status_ok();
        assert_eq!(
            balance(&app, &app.alice),
            BalanceSummary {
                balance: 1000.0,
                income: 1000.0,
                expense: 0.0,
            }
        );

        app.server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookie(cookie.clone())
            .form(&[
                ("date", "2024-01-02"),
                ("name", "Lunch"),
                ("amount", "-50"),
                ("category", "expense"),
            ])
            .await
            .assert_status_ok();
        assert_eq!(
            balance(&app, &app.alice),
            BalanceSummary {
                balance: 950.0,
                income: 1000.0,
                expense: -50.0,
            }
        );

        let response = app
            .server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookie(cookie.clone())
            .form(&[
                ("date", "2024-01-03"),
                ("name", "Coffee"),
                ("amount", "50"),
                ("category", "expense"),
            ])
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        response.assert_text_contains("Amount must be negative for expense");
        assert_eq!(balance(&app, &app.alice).balance, 950.0);

        let dashboard = app
            .server
            .get(endpoints::DASHBOARD_VIEW)
            .add_cookie(cookie)
            .await;
        dashboard.assert_status_ok();
        dashboard.assert_text_contains("$950.00");
    }

    #[tokio::test]
    async fn cannot_change_another_users_transaction() {
        let app = get_test_app();
        let bob_cookie = log_in(&app.server, "bob").await;
        app.server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookie(bob_cookie)
            .form(&[
                ("date", "2024-01-01"),
                ("name", "Rent"),
                ("amount", "-400"),
                ("category", "expense"),
                ("send_to", "Landlord"),
            ])
            .await
            .assert_status_ok();
        let bobs_transaction = get_transactions_for_user(app.bob.id, &app.db_connection.lock().unwrap())
            .unwrap()
            .remove(0);
        let transaction_url = format_endpoint(endpoints::TRANSACTION, bobs_transaction.id);

        let alice_cookie = log_in(&app.server, "alice").await;
        app.server
            .put(&transaction_url)
            .add_cookie(alice_cookie.clone())
            .form(&[
                ("date", "2024-01-01"),
                ("name", "Stolen"),
                ("amount", "400"),
                ("category", "income"),
            ])
            .await
            .assert_status(StatusCode::FORBIDDEN);
        app.server
            .delete(&transaction_url)
            .add_cookie(alice_cookie.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);
        app.server
            .get(&format_endpoint(
                endpoints::EDIT_TRANSACTION_VIEW,
                bobs_transaction.id,
            ))
            .add_cookie(alice_cookie)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let unchanged = get_transactions_for_user(app.bob.id, &app.db_connection.lock().unwrap())
            .unwrap();
        assert_eq!(unchanged, vec![bobs_transaction]);
    }

    #[tokio::test]
    async fn owner_can_update_and_delete_transaction() {
        let app = get_test_app();
        let cookie = log_in(&app.server, "alice").await;
        app.server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookie(cookie.clone())
            .form(&[
                ("date", "2024-01-01"),
                ("name", "Salary"),
                ("amount", "1000"),
                ("category", "income"),
            ])
            .await
            .assert_status_ok();
        let transaction = get_transactions_for_user(app.alice.id, &app.db_connection.lock().unwrap())
            .unwrap()
            .remove(0);
        let transaction_url = format_endpoint(endpoints::TRANSACTION, transaction.id);

        let response = app
            .server
            .put(&transaction_url)
            .add_cookie(cookie.clone())
            .form(&[
                ("date", "2024-01-01"),
                ("name", "Salary"),
                ("amount", "1200"),
                ("category", "income"),
                ("receive_from", "Employer"),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
        assert_eq!(response.header("hx-redirect"), endpoints::TRANSACTIONS_VIEW);
        assert_eq!(balance(&app, &app.alice).balance, 1200.0);

        app.server
            .delete(&transaction_url)
            .add_cookie(cookie)
            .await
            .assert_status_ok();
        assert_eq!(balance(&app, &app.alice), BalanceSummary::default());
    }

    #[tokio::test]
    async fn hx_routes_redirect_with_header_when_logged_out() {
        let app = get_test_app();

        let response = app
            .server
            .post(endpoints::TRANSACTIONS_API)
            .form(&[("name", "Salary")])
            .await;

        response.assert_status_ok();
        assert_eq!(response.header("hx-redirect"), endpoints::LOG_IN_VIEW);
    }
}
