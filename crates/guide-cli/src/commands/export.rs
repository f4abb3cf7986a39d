//! Export and import command handlers

use std::path::PathBuf;

use anyhow::{Context, Result};

use guide_core::{Catalog, ExportDocument};

use crate::output::Output;

/// Export the catalog as JSON, to a file or stdout
pub async fn export(catalog: &Catalog, path: Option<PathBuf>, output: &Output) -> Result<()> {
    match path {
        Some(path) => {
            let doc = catalog
                .export_to(path.clone())
                .await
                .context("Failed to export catalog")?;
            output.success(&format!(
                "Exported {} link(s) to {}",
                doc.links.len(),
                path.display()
            ));
        }
        None => {
            let doc = catalog.export().await.context("Failed to export catalog")?;
            println!("{}", doc.to_json()?);
        }
    }
    Ok(())
}

/// Import an export document into an empty catalog
pub async fn import(catalog: &Catalog, path: PathBuf, output: &Output) -> Result<()> {
    let doc = ExportDocument::read_from(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let links = doc.links.len();

    catalog.import(doc).await.context("Failed to import catalog")?;

    output.success(&format!("Imported {} link(s) from {}", links, path.display()));
    Ok(())
}
