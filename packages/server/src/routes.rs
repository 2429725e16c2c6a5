use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn api_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    let upload = OpenApiRouter::new()
        .routes(routes!(handlers::upload::upload_image))
        .layer(handlers::upload::upload_body_limit(
            config.upload.max_request_size,
        ));

    OpenApiRouter::new()
        .routes(routes!(handlers::upload::list_uploads))
        .routes(routes!(handlers::health::health))
        .merge(upload)
}
