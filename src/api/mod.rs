use crate::{
    api::handlers::{health, root},
    auth::{
        sso::{GithubConfig, GithubProvider},
        AuthConfig, AuthService, JwtConfig, JwtIssuer, SsoProvider, SsoRegistry,
    },
    email::{LogEmailSender, NotificationSender, SmtpConfig, SmtpEmailSender},
    tokens::{PgTokenRepository, VerificationTokens},
    users::PgUserDirectory,
};
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method, Request,
    },
    routing::{get, options},
    Extension, Router,
};
use sqlx::postgres::PgPoolOptions;
use std::{sync::Arc, time::Duration};
use tokio::{net::TcpListener, signal};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::PropagateRequestIdLayer,
    set_header::SetRequestHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn, Span};
use ulid::Ulid;
use url::Url;
use utoipa_axum::router::OpenApiRouter;
use utoipa_swagger_ui::SwaggerUi;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// Everything the server needs besides the listening port.
#[derive(Debug)]
pub struct ServerConfig {
    pub dsn: String,
    pub jwt: JwtConfig,
    pub auth: AuthConfig,
    pub verification_token_ttl_minutes: u32,
    pub cors_origin: Option<String>,
    pub github: Option<GithubConfig>,
    pub smtp: Option<SmtpConfig>,
}

/// Full application without database-bound layers: routes, Swagger UI,
/// request ids, tracing and the injected [`AuthService`].
pub fn app(service: Arc<AuthService>) -> Router {
    let (router, openapi) = router().split_for_parts();
    router
        .route("/", get(root::root))
        .route("/health", options(health::health))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(service)),
        )
}

/// Start the server
/// # Errors
/// Return error if the database is unreachable, migrations fail, a provider
/// or SMTP relay is misconfigured, or the listener cannot bind.
pub async fn new(port: u16, config: ServerConfig) -> Result<()> {
    let pool = PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(&config.dsn)
        .await
        .context("Failed to connect to database")?;

    sqlx::migrate!()
        .run(&pool)
        .await
        .context("Failed to apply database migrations")?;

    let mut providers = SsoRegistry::new();
    if let Some(github) = config.github {
        let provider: Arc<dyn SsoProvider> =
            Arc::new(GithubProvider::new(github).context("Failed to build GitHub provider")?);
        providers = providers.with_provider("github", provider);
    }
    info!(providers = ?providers.names(), "SSO providers registered");

    let notifier: Arc<dyn NotificationSender> = match &config.smtp {
        Some(smtp) => {
            info!(host = smtp.host(), port = smtp.port(), "Sending email through SMTP");
            Arc::new(SmtpEmailSender::new(smtp)?)
        }
        None => {
            warn!("No SMTP host configured, emails are only logged");
            Arc::new(LogEmailSender)
        }
    };

    let service = Arc::new(AuthService::new(
        Arc::new(PgUserDirectory::new(pool.clone())),
        VerificationTokens::new(
            Arc::new(PgTokenRepository::new(pool.clone())),
            config.verification_token_ttl_minutes,
        ),
        JwtIssuer::new(&config.jwt),
        providers,
        notifier,
        config.auth,
    ));

    let cors = cors_layer(config.cors_origin.as_deref())?;

    let app = app(service).layer(cors).layer(Extension(pool));

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST]);

    Ok(match origin {
        Some(origin) => cors.allow_origin(AllowOrigin::exact(origin_header(origin)?)),
        None => cors.allow_origin(Any),
    })
}

fn origin_header(frontend_url: &str) -> Result<HeaderValue> {
    let parsed =
        Url::parse(frontend_url).with_context(|| format!("Invalid CORS origin: {frontend_url}"))?;
    let host = parsed
        .host_str()
        .with_context(|| format!("CORS origin must include a host: {frontend_url}"))?;
    let port = parsed
        .port()
        .map_or_else(String::new, |port| format!(":{port}"));
    HeaderValue::from_str(&format!("{}://{}{}", parsed.scheme(), host, port))
        .context("Failed to build CORS origin header")
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!("Failed to listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!("Failed to listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Gracefully shutdown");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_header_strips_path() -> Result<()> {
        assert_eq!(
            origin_header("https://app.synthesizer.dev:8443/login?x=1")?,
            HeaderValue::from_static("https://app.synthesizer.dev:8443")
        );
        assert_eq!(
            origin_header("http://localhost/")?,
            HeaderValue::from_static("http://localhost")
        );
        Ok(())
    }

    #[test]
    fn origin_header_rejects_garbage() {
        assert!(origin_header("not a url").is_err());
        assert!(cors_layer(Some("mailto:a@x.com")).is_err());
        assert!(cors_layer(None).is_ok());
    }
}
