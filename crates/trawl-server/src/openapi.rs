use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Trawl API",
        version = "0.1.0",
        description = "Control plane for the Trawl periodic article harvester."
    ),
    paths(
        crate::routes::list_sources,
        crate::routes::get_source,
        crate::routes::stop_source,
        crate::routes::start_source,
        crate::routes::change_interval,
        crate::routes::delete_source,
        crate::routes::list_articles,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::SourceResponse,
        crate::dto::SourceListResponse,
        crate::dto::IntervalRequest,
        crate::dto::DeleteSourceResponse,
        crate::dto::ArticleResponse,
        crate::dto::ArticleListResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "sources", description = "Source lifecycle: pause, resume, retune, delete"),
        (name = "articles", description = "Harvested articles"),
        (name = "system", description = "Health and system status"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Adds Bearer token security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::HttpBuilder::new()
                        .scheme(utoipa::openapi::security::HttpAuthScheme::Bearer)
                        .bearer_format("token")
                        .description(Some("API key. Set via TRAWL_API_KEY environment variable."))
                        .build(),
                ),
            );
        }
    }
}
