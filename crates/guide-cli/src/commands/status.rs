//! Status command handler

use anyhow::Result;

use guide_core::Catalog;

use crate::output::{Output, OutputFormat};

/// Show status information
pub async fn show(catalog: &Catalog, output: &Output) -> Result<()> {
    let stats = catalog.stats().await?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "database": catalog.database_path(),
                    "version_copy": catalog.version_copy().to_string(),
                    "counts": stats
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", catalog.database_path().display());
        }
        OutputFormat::Human => {
            println!("Guide Status");
            println!("============");
            println!();
            println!("Storage:");
            println!("  Database:     {}", catalog.database_path().display());
            println!("  Version copy: {}", catalog.version_copy());
            println!();
            output.print_stats(&stats);
        }
    }

    Ok(())
}
