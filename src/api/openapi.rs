use super::handlers::{
    admin,
    auth::{
        self,
        gate::{self, Gate},
    },
    health,
};
use crate::users::Role;
use axum::middleware;
use utoipa::openapi::{
    security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Components, Contact, InfoBuilder, License, OpenApiBuilder, Tag,
};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Routes are grouped by gate: each group gets its own `route_layer`, so the
/// gate only runs for paths that matched inside that group. Tags and the
/// bearer scheme live on the base document from [`cargo_openapi`].
pub(crate) fn api_router() -> OpenApiRouter {
    let public = OpenApiRouter::new()
        .routes(routes!(health::health))
        .routes(routes!(auth::credentials::sign_up))
        .routes(routes!(auth::credentials::sign_in))
        .routes(routes!(auth::sso::sso_sign_in))
        .routes(routes!(auth::sso::sso_callback))
        .routes(routes!(auth::verification::verify_email))
        .routes(routes!(auth::password::send_password_reset_email))
        .routes(routes!(auth::password::reset_password));

    let optional = OpenApiRouter::new()
        .routes(routes!(auth::session::session))
        .route_layer(middleware::from_fn_with_state(
            Gate::optional(),
            gate::enforce,
        ));

    let signed_in = OpenApiRouter::new()
        .routes(routes!(auth::session::me))
        .route_layer(middleware::from_fn_with_state(
            Gate::mandatory(),
            gate::enforce,
        ));

    let admins = OpenApiRouter::new()
        .routes(routes!(admin::get_user))
        .routes(routes!(admin::block_user))
        .route_layer(middleware::from_fn_with_state(
            Gate::mandatory().with_roles([Role::Admin]),
            gate::enforce,
        ));

    OpenApiRouter::with_openapi(cargo_openapi())
        .merge(public)
        .merge(optional)
        .merge(signed_in)
        .merge(admins)
}

fn tag(name: &str, description: &str) -> Tag {
    let mut tag = Tag::new(name);
    tag.description = Some(description.to_string());
    tag
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    let mut components = Components::new();
    components.add_security_scheme(
        "bearer",
        SecurityScheme::Http(
            HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("JWT")
                .build(),
        ),
    );

    OpenApiBuilder::new()
        .info(info)
        .tags(Some([
            tag("synthesizer", "Speech synthesis platform API"),
            tag("auth", "Sign-up, sign-in, SSO, email verification and password reset"),
            tag("admin", "Account administration"),
            tag("health", "Liveness and database status"),
        ]))
        .components(Some(components))
        .build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let primary = env!("CARGO_PKG_AUTHORS").split(';').next().map(str::trim)?;
    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &str) -> Option<&str> {
    Some(value.trim()).filter(|trimmed| !trimmed.is_empty())
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    match author.split_once('<') {
        Some((name, email)) => (
            optional_str(name),
            optional_str(email.trim_end_matches('>')),
        ),
        None => (optional_str(author), None),
    }
}
