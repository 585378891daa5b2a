use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;
use utoipa::OpenApi;

use crate::cli::OpenApiFormat;
use crate::schemas::ApiDoc;

/// Renders the OpenAPI document in the requested format.
pub fn render_openapi(format: OpenApiFormat) -> Result<String> {
    let doc = ApiDoc::openapi();
    let rendered = match format {
        OpenApiFormat::Json => {
            serde_json::to_string_pretty(&doc).context("Failed to serialize OpenAPI as JSON")?
        }
        OpenApiFormat::Yaml => {
            serde_yaml::to_string(&doc).context("Failed to serialize OpenAPI as YAML")?
        }
    };
    Ok(rendered)
}

pub fn export_openapi(format: OpenApiFormat, output: Option<&Path>) -> Result<()> {
    let rendered = render_openapi(format)?;
    match output {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("OpenAPI document written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_yaml_and_json() {
        let yaml = render_openapi(OpenApiFormat::Yaml).unwrap();
        assert!(yaml.contains("/api/transactions"));

        let json = render_openapi(OpenApiFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["info"]["title"], "FinSavvy API");
    }
}
