use super::handlers::{auth, feedbacks, health, messages};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Router whose routes also make up the `OpenAPI` document.
///
/// Register documented endpoints here with `.routes(routes!(...))`; `/` and
/// `OPTIONS /health` are added by the server and stay out of the document.
pub(crate) fn api_router() -> OpenApiRouter {
    let mut router = OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(feedbacks::get_feedbacks))
        .routes(routes!(messages::send_message))
        .routes(routes!(
            messages::get_accept_messages,
            messages::set_accept_messages
        ))
        .routes(routes!(auth::username::check_username_uniqueness))
        .routes(routes!(auth::sign_up::sign_up))
        .routes(routes!(auth::sign_in::sign_in))
        .routes(routes!(auth::session::sign_out))
        .routes(routes!(auth::verification::verify_code));

    let mut truefeedback_tag = Tag::new("truefeedback");
    truefeedback_tag.description = Some("Anonymous messages and their owners".to_string());

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Sign-up, verification and sessions".to_string());

    router.get_openapi_mut().tags = Some(vec![truefeedback_tag, auth_tag]);

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(non_empty(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact(env!("CARGO_PKG_AUTHORS"));
    info.license = non_empty(env!("CARGO_PKG_LICENSE")).map(|identifier| {
        let mut license = License::new(identifier);
        license.identifier = Some(identifier.to_string());
        license
    });

    OpenApiBuilder::new().info(info).build()
}

/// First Cargo author, written as `Name <email>`, `Name` or `<email>`.
fn cargo_contact(authors: &str) -> Option<Contact> {
    let primary = non_empty(authors.split(';').next()?)?;
    let (name, email) = match primary.split_once('<') {
        Some((name, rest)) => (non_empty(name), non_empty(rest.trim_end_matches('>'))),
        None => (Some(primary), None),
    };
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_info_from_cargo() {
        let doc = openapi();
        assert_eq!(doc.info.title, env!("CARGO_PKG_NAME"));
        assert_eq!(doc.info.version, env!("CARGO_PKG_VERSION"));

        let contact = doc.info.contact;
        assert!(contact.is_some());
        if let Some(contact) = contact {
            assert_eq!(contact.name.as_deref(), Some("Team TrueFeedback"));
            assert_eq!(contact.email.as_deref(), Some("team@truefeedback.dev"));
        }

        let license = doc.info.license;
        assert!(license.is_some());
        if let Some(license) = license {
            assert_eq!(license.name, "BSD-3-Clause");
        }
    }

    #[test]
    fn cargo_contact_variants() {
        let only_email = cargo_contact("<ops@example.com>");
        assert_eq!(
            only_email.and_then(|contact| contact.email),
            Some("ops@example.com".to_string())
        );
        let only_name = cargo_contact("Ops Team; Someone Else");
        assert_eq!(
            only_name.and_then(|contact| contact.name),
            Some("Ops Team".to_string())
        );
        assert!(cargo_contact("  ").is_none());
    }

    #[test]
    fn openapi_documents_every_endpoint() {
        let doc = openapi();
        let tags = doc.tags.clone().unwrap_or_default();
        assert!(tags.iter().any(|tag| tag.name == "truefeedback"));
        assert!(tags.iter().any(|tag| tag.name == "auth"));
        for path in [
            "/health",
            "/api/get-feedbacks",
            "/api/send-message",
            "/api/accept-messages",
            "/api/check-username-uniqueness",
            "/api/sign-up",
            "/api/sign-in",
            "/api/sign-out",
            "/api/verify-code",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
