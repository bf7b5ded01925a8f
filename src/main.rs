use clap::{Parser, Subcommand};
use pagefig::idf::ContentTree;
use pagefig::layout::{ConstellationTable, EngineConfig, ModelSpec};
use pagefig::traits::{InMemoryStateStore, StateStore};
use pagefig::{FileStateStore, PageGeometry, PagefigError, RenderSettings, render_article};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "pagefig", version, about = "Lay out figures alongside paginated text")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an article and print the placement report as JSON
    Render {
        /// Path to the article's content tree (JSON)
        article: PathBuf,

        /// Engine configuration (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Typesetting class catalogue (JSON)
        #[arg(long)]
        model_spec: Option<PathBuf>,

        /// Constellation table (JSON); generated from the model spec if omitted
        #[arg(long)]
        table: Option<PathBuf>,

        /// Directory to persist layout state in; kept in memory if omitted
        #[arg(long)]
        state_dir: Option<PathBuf>,

        #[arg(long, default_value_t = 1123.0)]
        page_height: f32,

        #[arg(long, default_value_t = 794.0)]
        page_width: f32,
    },
    /// Print the constellation table generated from a model spec
    GenerateTable {
        #[arg(long)]
        model_spec: Option<PathBuf>,
    },
}

fn load_model(path: Option<&Path>) -> Result<ModelSpec, PagefigError> {
    match path {
        Some(p) => Ok(ModelSpec::from_json(&fs::read_to_string(p)?)?),
        None => Ok(ModelSpec::default_catalogue()),
    }
}

fn run(cli: Cli) -> Result<(), PagefigError> {
    match cli.command {
        Command::Render {
            article,
            config,
            model_spec,
            table,
            state_dir,
            page_height,
            page_width,
        } => {
            let tree: ContentTree = serde_json::from_str(&fs::read_to_string(&article)?)?;
            let config = match config {
                Some(p) => EngineConfig::from_json(&fs::read_to_string(p)?)?,
                None => EngineConfig::viewer(),
            };
            let table = match table {
                Some(p) => Some(ConstellationTable::from_json(&fs::read_to_string(p)?)?),
                None => None,
            };
            if page_height <= 0.0 || page_width <= 0.0 {
                return Err(PagefigError::Input("page size must be positive".into()));
            }
            let settings = RenderSettings {
                config,
                model: load_model(model_spec.as_deref())?,
                table,
                geometry: PageGeometry::new(page_width, page_height),
            };
            let store: Arc<dyn StateStore> = match state_dir {
                Some(dir) => Arc::new(FileStateStore::open(dir)?),
                None => Arc::new(InMemoryStateStore::new()),
            };

            log::info!("Rendering {} using {} state", article.display(), store.name());
            let rendered = render_article(tree, &settings, store)?;
            println!("{}", serde_json::to_string_pretty(&rendered.report)?);
        }
        Command::GenerateTable { model_spec } => {
            let model = load_model(model_spec.as_deref())?;
            let table = ConstellationTable::generate(&model);
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
    }
    Ok(())
}

fn main() {
    env_logger::init();
    if let Err(e) = run(Cli::parse()) {
        eprintln!("pagefig: {e}");
        std::process::exit(1);
    }
}
