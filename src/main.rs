//! conref CLI: concept referring expressions over Horn-ALC ontologies.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::Result;

use conref::concept::Concept;
use conref::error::OntologyError;
use conref::ontology::Ontology;
use conref::oracle::ToldReasoner;
use conref::retrieval::{RetrievalConfig, Retriever};

#[derive(Parser)]
#[command(name = "conref", version, about = "Concept referring expressions for instance retrieval")]
struct Cli {
    /// Ontology file (JSON, or TOML with a .toml extension).
    #[arg(long, global = true)]
    ontology: Option<PathBuf>,

    /// Retrieval configuration (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Skip sorting the restriction pool.
    #[arg(long, global = true)]
    no_sorting: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Retrieve referring expressions for every answer of a query.
    Retrieve {
        /// Query concept, e.g. "A ⊓ ∃R.B" or "A and some R.B".
        #[arg(long)]
        query: String,

        /// Print retrieval statistics.
        #[arg(long)]
        stats: bool,
    },

    /// Show the collected restriction pool.
    Restrictions,

    /// Show the most specific concepts of individuals.
    Profile {
        /// Only this individual.
        #[arg(long)]
        individual: Option<String>,
    },
}

fn load_ontology(path: Option<&Path>) -> Result<Ontology> {
    let Some(path) = path else {
        miette::bail!("no ontology given; pass --ontology <file>");
    };
    Ok(Ontology::load(path)?)
}

fn load_config(cli: &Cli) -> Result<RetrievalConfig> {
    let mut config = match &cli.config {
        Some(path) => RetrievalConfig::load(path)?,
        None => RetrievalConfig::default(),
    };
    if cli.no_sorting {
        config.apply_sorting = false;
    }
    Ok(config)
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let ontology = load_ontology(cli.ontology.as_deref())?;
    let config = load_config(&cli)?;
    let reasoner = ToldReasoner::new(&ontology);

    match &cli.command {
        Commands::Retrieve { query, stats } => {
            let query: Concept = query.parse()?;
            let retriever = Retriever::new(RetrievalConfig {
                collect_stats: config.collect_stats || *stats,
                ..config
            });
            let (found, figures) = retriever.retrieve_with_stats(&ontology, &reasoner, &query)?;

            if found.is_empty() {
                println!("No referring expressions for {query}.");
            } else {
                println!("Referring expressions for {query} ({}):", found.len());
                for cre in &found {
                    println!("  {cre}  [cycles: {}]", cre.cycles());
                }
            }
            if *stats {
                println!("\nIndividuals:        {}", figures.individuals);
                println!("Groups:             {}", figures.groups);
                println!("Largest group:      {}", figures.largest_group);
                println!("Average group size: {:.2}", figures.average_group_size);
                println!("Oracle calls:       {}", figures.oracle_calls);
            }
        }

        Commands::Restrictions => {
            let retriever = Retriever::new(config);
            let pool = retriever.restrictions(&ontology, &reasoner)?;

            let exist = pool.exist();
            println!("Existential restrictions ({}):", pool.exist_count());
            for id in exist.node_ids() {
                let concepts: Vec<String> = exist.concepts(id).iter().map(ToString::to_string).collect();
                let subs: Vec<String> = exist
                    .subs(id)
                    .into_iter()
                    .filter_map(|sub| exist.concepts(sub).first().map(ToString::to_string))
                    .collect();
                if subs.is_empty() {
                    println!("  {}", concepts.join(" ≡ "));
                } else {
                    println!("  {}  ⊒ {}", concepts.join(" ≡ "), subs.join(", "));
                }
            }

            println!("\nUniversal restrictions ({}):", pool.univ_count());
            for (role, fillers) in pool.univ_pools() {
                for id in fillers.node_ids() {
                    let concepts: Vec<String> = fillers
                        .concepts(id)
                        .iter()
                        .map(|filler| Concept::for_all(role.clone(), filler.clone()).to_string())
                        .collect();
                    println!("  {}", concepts.join(" ≡ "));
                }
            }
        }

        Commands::Profile { individual } => {
            let retriever = Retriever::new(config);
            let profiles = retriever.profiles(&ontology, &reasoner)?;

            if let Some(name) = individual {
                let Some(concepts) = profiles.get(name) else {
                    return Err(OntologyError::UnknownIndividual { name: name.clone() }.into());
                };
                let concepts: Vec<String> = concepts.iter().map(ToString::to_string).collect();
                println!("{name}: {}", concepts.join(", "));
                return Ok(());
            }

            if profiles.is_empty() {
                println!("No individuals.");
            }
            for (name, concepts) in &profiles {
                let concepts: Vec<String> = concepts.iter().map(ToString::to_string).collect();
                println!("{name}: {}", concepts.join(", "));
            }
        }
    }

    Ok(())
}
