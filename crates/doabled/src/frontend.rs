//! Web frontend pages

use axum::response::Html;
use tracing::info;

const INDEX_TEMPLATE: &str = include_str!("../templates/index.html");

/// Title shown on the index page
pub const PAGE_TITLE: &str = "Doable web frontend";

pub async fn index() -> Html<String> {
    info!("index page requested");
    Html(INDEX_TEMPLATE.replace("{{title}}", PAGE_TITLE))
}
