use interview_api::router::ApiDoc;
use utoipa::OpenApi;

/// Writes the interview API's OpenAPI document, by default to `openapi.json`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "openapi.json".to_string());
    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, spec_json)?;
    println!("Wrote OpenAPI document to {}", path);
    Ok(())
}
