//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI document for the REST routes. The output path is the
//! first argument, `openapi.json` when none is given.

use api_lib::web::rest::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());

    let mut doc = ApiDoc::openapi();
    doc.info.title = "Life Engine API".to_string();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();

    std::fs::write(&path, doc.to_pretty_json()?)?;
    println!(
        "OpenAPI document with {} paths written to {}",
        doc.paths.paths.len(),
        path
    );
    Ok(())
}
