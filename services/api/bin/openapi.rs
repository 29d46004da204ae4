//! OpenAPI Document Generator
//!
//! Writes the receptionist API's OpenAPI document to `openapi.json` in the
//! working directory, so the routes can be published without starting the
//! server.

use receptionist_api::router::ApiDoc;
use utoipa::OpenApi;

/// Serializes `api_doc` as pretty JSON and writes it to `path`.
fn generate_spec(
    api_doc: utoipa::openapi::OpenApi,
    path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec_json = api_doc.to_pretty_json()?;
    std::fs::write(path, spec_json)?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    generate_spec(ApiDoc::openapi(), "openapi.json")?;
    Ok(())
}
