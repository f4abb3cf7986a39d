//! Reference data and lineage listings

use anyhow::Result;

use guide_core::Catalog;

use crate::output::Output;

/// List all topics
pub async fn topics(catalog: &Catalog, output: &Output) -> Result<()> {
    let topics = catalog.fetch_all_topics().await?;
    output.print_topics(&topics);
    Ok(())
}

/// List all personas
pub async fn personas(catalog: &Catalog, output: &Output) -> Result<()> {
    let personas = catalog.fetch_all_personas().await?;
    output.print_personas(&personas);
    Ok(())
}

/// Show the terminal link of every superseded link
pub async fn successors(catalog: &Catalog, output: &Output) -> Result<()> {
    let map = catalog.fetch_successor_map().await?;
    output.print_successors(&map);
    Ok(())
}
