//! Route table and global middleware

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post, put, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::handlers::{self, protected, public};
use crate::middleware::jwt_auth_middleware;
use crate::state::AppState;

/// Build the full application router
pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/auth/login", post(public::auth::login))
        .merge(change_routes())
        .merge(content_routes(&state));

    if let Some(dir) = &state.options.media_dir {
        router = router.nest_service("/media", ServeDir::new(dir));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.options.cors_origins))
                .layer(DefaultBodyLimit::max(state.options.max_request_size_bytes)),
        )
        .with_state(state)
}

fn change_routes() -> Router<AppState> {
    use public::changes;

    Router::new()
        .route("/requestEmailChange", post(changes::request_email_change))
        .route("/requestPasswordChange", post(changes::request_password_change))
        .route("/verify-change", get(changes::verify_change))
}

fn content_routes(state: &AppState) -> Router<AppState> {
    use protected::{advertisements, clients, contacts, internships, team};

    // Wrap one method so public and admin handlers can share a path
    let admin = |method: MethodRouter<AppState>| method.route_layer(from_fn_with_state(state.clone(), jwt_auth_middleware));

    Router::new()
        // Team
        .route("/team", get(public::content::team_list).merge(admin(post(team::post))))
        .route("/team/public/:id", get(public::content::team_public_get))
        .route(
            "/team/:id",
            admin(get(team::get).put(team::put).delete(team::delete)),
        )
        // Clients
        .route("/clients", get(public::content::clients_list).merge(admin(post(clients::post))))
        .route("/clients/:id", admin(put(clients::put).delete(clients::delete)))
        // Advertisements
        .route(
            "/advertisements",
            get(public::content::advertisements_list).merge(admin(post(advertisements::post))),
        )
        .route(
            "/advertisements/:id",
            admin(put(advertisements::put).delete(advertisements::delete)),
        )
        // Contacts
        .route("/contacts", post(public::content::contact_submit).merge(admin(get(contacts::list))))
        .route("/contacts/:id", admin(put(contacts::put).delete(contacts::delete)))
        // Internship inquiries
        .route(
            "/internship-inquiries",
            post(public::content::internship_submit).merge(admin(get(internships::list))),
        )
        .route(
            "/internship-inquiries/:id",
            admin(put(internships::put).delete(internships::delete)),
        )
}

/// Browser origins allowed to call the API with credentials
fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        // Credentialed CORS cannot use a wildcard origin
        .filter(|o| o.as_str() != "*")
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
        .allow_credentials(true)
}
