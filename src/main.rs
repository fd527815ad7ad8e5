use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
    Router,
};
use talent_backend::{
    config::{get_config, init_config},
    database::pool::{create_pool, run_migrations},
    middleware::{
        auth::{require_admin, require_hr_or_admin, require_staff},
        cors::api_cors,
        rate_limit::{rps_middleware, RateLimiter},
    },
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info,sqlx=warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_config()?;
    let config = get_config();
    init_tracing(config.log_json);

    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;

    let app_state = AppState::new(pool, config)?;

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        app_state.auth_service.ensure_admin(email, password).await?;
    }

    let base_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/api/openapi.json", get(routes::openapi::openapi_json));

    let public_api = Router::new()
        .merge(routes::training::router())
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/public/jobs", get(routes::jobs::job_board))
        .route("/api/public/jobs/:id", get(routes::jobs::public_job))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new("public", config.public_rps),
            rps_middleware,
        ));

    let staff_api = Router::new()
        .route("/api/admin/dashboard/stats", get(routes::dashboard::get_dashboard_stats))
        .route("/api/admin/jobs", get(routes::jobs::list_jobs))
        .route("/api/admin/jobs/:id", get(routes::jobs::get_job))
        .route(
            "/api/admin/jobs/:id/applications",
            get(routes::applications::list_for_job),
        )
        .route("/api/admin/candidates", get(routes::candidates::list_candidates))
        .route("/api/admin/candidates/:id", get(routes::candidates::get_candidate))
        .route(
            "/api/admin/applications/:id",
            get(routes::applications::get_application),
        )
        .route(
            "/api/admin/applications/:id/recruiter",
            post(routes::applications::assign_recruiter),
        )
        .route("/api/admin/campaigns", get(routes::campaigns::list_campaigns))
        .route("/api/admin/campaigns/:id", get(routes::campaigns::get_campaign))
        .route("/api/admin/departments", get(routes::rrhh::list_departments))
        .route("/api/admin/employees", get(routes::rrhh::list_employees))
        .route("/api/admin/employees/:id", get(routes::rrhh::get_employee))
        .route(
            "/api/admin/training/codes",
            get(routes::training_admin::list_codes),
        )
        .route(
            "/api/admin/training/sessions",
            get(routes::training_admin::list_sessions),
        )
        .route(
            "/api/admin/training/sessions/:id",
            get(routes::training_admin::session_detail),
        )
        .layer(axum::middleware::from_fn_with_state(
            app_state.jwt_keys.clone(),
            require_staff,
        ));

    let manager_api = Router::new()
        .route("/api/admin/jobs", post(routes::jobs::create_job))
        .route(
            "/api/admin/jobs/:id",
            patch(routes::jobs::update_job).delete(routes::jobs::delete_job),
        )
        .route("/api/admin/candidates", post(routes::candidates::create_candidate))
        .route(
            "/api/admin/candidates/:id",
            delete(routes::candidates::delete_candidate),
        )
        .route(
            "/api/admin/candidates/:id/analysis",
            patch(routes::candidates::update_analysis),
        )
        .route("/api/admin/applications", post(routes::applications::apply))
        .route(
            "/api/admin/applications/:id/status",
            post(routes::applications::change_status),
        )
        .route("/api/admin/campaigns", post(routes::campaigns::create_campaign))
        .route("/api/admin/departments", post(routes::rrhh::create_department))
        .route("/api/admin/employees", post(routes::rrhh::create_employee))
        .route(
            "/api/admin/employees/:id/manager",
            patch(routes::rrhh::update_manager),
        )
        .route(
            "/api/admin/training/codes",
            post(routes::training_admin::create_code),
        )
        .layer(axum::middleware::from_fn_with_state(
            app_state.jwt_keys.clone(),
            require_hr_or_admin,
        ));

    let admin_only_api = Router::new()
        .route("/api/admin/users", post(routes::auth::create_user))
        .layer(axum::middleware::from_fn_with_state(
            app_state.jwt_keys.clone(),
            require_admin,
        ));

    let admin_api = staff_api
        .merge(manager_api)
        .merge(admin_only_api)
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new("admin", config.admin_rps),
            rps_middleware,
        ));

    let app = base_routes
        .merge(public_api)
        .merge(admin_api)
        .with_state(app_state)
        .layer(api_cors())
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(1024 * 1024));

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
