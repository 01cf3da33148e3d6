use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(upload_routes())
        .merge(location_routes())
        .merge(callback_routes())
}

fn upload_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::upload::upload_images))
        .routes(routes!(handlers::archive::upload_archive))
        .layer(handlers::upload::upload_body_limit())
}

fn location_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::location::list_image_locations))
        .routes(routes!(handlers::location::delete_image_location))
        .routes(routes!(handlers::location::retry_image_location))
        .routes(routes!(handlers::map::detections_by_coordinates))
}

fn callback_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::callback::update_image_result))
        .routes(routes!(handlers::callback::update_image_trash_result))
}
