//! Link command handlers

use anyhow::{bail, Context, Result};

use guide_core::{Catalog, LinkId, LinkUpdate, NewLink, PersonaId};

use crate::output::Output;

/// Fields for a new link, as given on the command line
pub struct CreateArgs {
    pub url: String,
    pub name: String,
    pub certified: bool,
    pub valid: bool,
    pub successor: Option<LinkId>,
    pub predecessor: Option<LinkId>,
    pub topics: Vec<String>,
    pub personas: Vec<PersonaId>,
}

/// Changes to an existing link, as given on the command line
#[derive(Default)]
pub struct UpdateArgs {
    pub url: Option<String>,
    pub name: Option<String>,
    pub certified: Option<bool>,
    pub valid: Option<bool>,
    pub successor: Option<String>,
    pub topics: Option<Vec<String>>,
    pub personas: Option<Vec<PersonaId>>,
    pub clear_topics: bool,
    pub clear_personas: bool,
}

impl UpdateArgs {
    fn touches_fields(&self) -> bool {
        self.url.is_some()
            || self.name.is_some()
            || self.certified.is_some()
            || self.valid.is_some()
            || self.successor.is_some()
    }
}

/// Create a new link (or a new version of an existing one)
pub async fn create(catalog: &Catalog, args: CreateArgs, output: &Output) -> Result<()> {
    let link = NewLink {
        url: args.url.trim().to_string(),
        name: args.name.trim().to_string(),
        certification: args.certified,
        valid: args.valid,
        successor: args.successor,
        predecessor: args.predecessor,
        topics: args.topics,
        personas: args.personas,
    };

    let id = catalog
        .create_link(link)
        .await
        .context("Failed to create link")?;
    let created = catalog.find_link_by_id(id, true).await?;

    match args.predecessor {
        Some(p) => output.success(&format!("Created link {} superseding {}", id, p)),
        None => output.success(&format!("Created link {}", id)),
    }
    output.print_link(&created);

    Ok(())
}

/// List links
pub async fn list(catalog: &Catalog, include_invalid: bool, output: &Output) -> Result<()> {
    let links = catalog.fetch_links(include_invalid).await?;
    output.print_links(&links);
    Ok(())
}

/// Show a single link, optionally redirected to its live version
pub async fn show(
    catalog: &Catalog,
    id: LinkId,
    include_invalid: bool,
    live: bool,
    output: &Output,
) -> Result<()> {
    let link = if live {
        let link = catalog.resolve_live(id).await?;
        if link.id != id {
            output.message(&format!("Link {} has been superseded by {}", id, link.id));
        }
        link
    } else {
        catalog.find_link_by_id(id, include_invalid).await?
    };

    output.print_link(&link);
    Ok(())
}

/// Update a link's fields and associations in one transaction
pub async fn update(catalog: &Catalog, id: LinkId, args: UpdateArgs, output: &Output) -> Result<()> {
    let mut update = LinkUpdate::new(id);

    if args.touches_fields() {
        let mut fields = catalog.find_link_by_id(id, true).await?.fields();
        if let Some(url) = args.url {
            fields.url = url.trim().to_string();
        }
        if let Some(name) = args.name {
            fields.name = name.trim().to_string();
        }
        if let Some(certified) = args.certified {
            fields.certification = certified;
        }
        if let Some(valid) = args.valid {
            fields.valid = valid;
        }
        if let Some(ref successor) = args.successor {
            fields.successor = parse_successor(successor)?;
        }
        update = update.with_fields(fields);
    }

    if args.clear_topics {
        update = update.with_topics(Vec::new());
    } else if let Some(topics) = args.topics {
        update = update.with_topics(topics);
    }

    if args.clear_personas {
        update = update.with_personas(Vec::new());
    } else if let Some(personas) = args.personas {
        update = update.with_personas(personas);
    }

    if update.is_empty() {
        bail!("Nothing to update. Pass at least one field, --topics or --personas.");
    }

    catalog
        .update_link(update)
        .await
        .context("Failed to update link")?;

    output.success("Link updated");
    output.print_link(&catalog.find_link_by_id(id, true).await?);

    Ok(())
}

/// Parse a successor argument: an id, or `none` to clear it
fn parse_successor(value: &str) -> Result<Option<LinkId>> {
    let value = value.trim();
    if value.is_empty() || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }

    let id: LinkId = value
        .parse()
        .with_context(|| format!("Invalid successor id: '{}'", value))?;
    if id <= 0 {
        bail!("Successor id must be a positive integer, got {}", id);
    }
    Ok(Some(id))
}
