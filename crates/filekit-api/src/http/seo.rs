//! `robots.txt` and `sitemap.xml`.

use std::sync::Arc;

use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use chrono::{NaiveDate, Utc};

use crate::state::ApiState;

const ROBOTS_TXT: &str = "User-agent: *\nDisallow:\nAllow: /";

pub(crate) async fn robots_txt() -> impl IntoResponse {
    ([(CONTENT_TYPE, "text/plain")], ROBOTS_TXT)
}

pub(crate) async fn sitemap_xml(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let body = render_sitemap(&state.site_url, Utc::now().date_naive());
    ([(CONTENT_TYPE, "application/xml")], body)
}

/// Single-entry sitemap for the site root.
pub(crate) fn render_sitemap(site_url: &str, last_modified: NaiveDate) -> String {
    let loc = escape_xml(site_url);
    let lastmod = last_modified.format("%Y-%m-%d");
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n\
         \x20 <url>\n\
         \x20   <loc>{loc}</loc>\n\
         \x20   <lastmod>{lastmod}</lastmod>\n\
         \x20   <changefreq>daily</changefreq>\n\
         \x20   <priority>1.0</priority>\n\
         \x20 </url>\n\
         </urlset>\n"
    )
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
