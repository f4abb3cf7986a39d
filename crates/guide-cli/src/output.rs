//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;

use guide_core::{CatalogStats, Link, Persona, SuccessorMap, Topic};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print a single link
    pub fn print_link(&self, link: &Link) {
        match self.format {
            OutputFormat::Human => {
                println!("ID:            {}", link.id);
                println!("Name:          {}", link.name);
                println!("URL:           {}", link.url);
                println!("Certification: {}", yes_no(link.certification));
                println!("Valid:         {}", yes_no(link.valid));
                if let Some(successor) = link.successor {
                    println!("Successor:     {}", successor);
                }
                if !link.topics.is_empty() {
                    println!("Topics:        {}", link.topics.join(", "));
                }
                if !link.personas.is_empty() {
                    println!("Personas:      {}", join_ids(&link.personas));
                }
            }
            OutputFormat::Json => print_json(link),
            OutputFormat::Quiet => {
                println!("{}", link.id);
            }
        }
    }

    /// Print a list of links
    pub fn print_links(&self, links: &[Link]) {
        match self.format {
            OutputFormat::Human => {
                if links.is_empty() {
                    println!("No links found.");
                    return;
                }
                for link in links {
                    let marker = match (link.valid, link.certification) {
                        (false, _) => "x",
                        (true, true) => "*",
                        (true, false) => " ",
                    };
                    let successor = link
                        .successor
                        .map(|s| format!(" -> {}", s))
                        .unwrap_or_default();
                    println!(
                        "{:>5} {} {} | {}{}",
                        link.id,
                        marker,
                        truncate(&link.name, 35),
                        truncate(&link.url, 45),
                        successor
                    );
                }
                println!("\n{} link(s)", links.len());
            }
            OutputFormat::Json => print_json(&links),
            OutputFormat::Quiet => {
                for link in links {
                    println!("{}", link.id);
                }
            }
        }
    }

    /// Print the topic reference table
    pub fn print_topics(&self, topics: &[Topic]) {
        match self.format {
            OutputFormat::Human => {
                if topics.is_empty() {
                    println!("No topics found.");
                    return;
                }
                for topic in topics {
                    match topic.label {
                        Some(ref label) => println!("{:<12} {} ({})", topic.category, topic.key, label),
                        None => println!("{:<12} {}", topic.category, topic.key),
                    }
                }
                println!("\n{} topic(s)", topics.len());
            }
            OutputFormat::Json => print_json(&topics),
            OutputFormat::Quiet => {
                for topic in topics {
                    println!("{}", topic.key);
                }
            }
        }
    }

    /// Print the persona reference table
    pub fn print_personas(&self, personas: &[Persona]) {
        match self.format {
            OutputFormat::Human => {
                if personas.is_empty() {
                    println!("No personas found.");
                    return;
                }
                for persona in personas {
                    println!("{:>5} {}", persona.id, persona.label);
                }
                println!("\n{} persona(s)", personas.len());
            }
            OutputFormat::Json => print_json(&personas),
            OutputFormat::Quiet => {
                for persona in personas {
                    println!("{}", persona.id);
                }
            }
        }
    }

    /// Print resolved chains and any cycles
    pub fn print_successors(&self, map: &SuccessorMap) {
        match self.format {
            OutputFormat::Human => {
                if map.is_empty() && map.cycles.is_empty() {
                    println!("No superseded links.");
                    return;
                }
                for (id, terminal) in &map.terminals {
                    println!("{:>5} -> {}", id, terminal);
                }
                for cycle in &map.cycles {
                    println!(
                        "{:>5} !! cycle {}",
                        cycle.origin,
                        join_ids(&cycle.chain).replace(", ", " -> ")
                    );
                }
                println!(
                    "\n{} chain(s) resolved, {} cyclic",
                    map.len(),
                    map.cycles.len()
                );
            }
            OutputFormat::Json => print_json(map),
            OutputFormat::Quiet => {
                for (id, terminal) in &map.terminals {
                    println!("{} {}", id, terminal);
                }
            }
        }
    }

    /// Print catalog counts
    pub fn print_stats(&self, stats: &CatalogStats) {
        match self.format {
            OutputFormat::Human => {
                println!("Contents:");
                println!("  Links:      {}", stats.links);
                println!("  Valid:      {}", stats.valid_links);
                println!("  Superseded: {}", stats.superseded);
                println!("  Topics:     {}", stats.topics);
                println!("  Personas:   {}", stats.personas);
            }
            OutputFormat::Json => print_json(stats),
            OutputFormat::Quiet => {
                println!("{}", stats.links);
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode JSON output: {}", e),
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

fn join_ids(ids: &[i64]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
