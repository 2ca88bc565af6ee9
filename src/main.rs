use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use mindcanvas::camera::Point;
use mindcanvas::config::{ConfigError, EngineConfig};
use mindcanvas::editor::{Editor, EditorError};
use mindcanvas::measure::MonospaceMeasurer;
use mindcanvas::persist::{FsPersistence, PersistError, PersistenceProvider};
use mindcanvas::store::{NodeId, Store};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error(transparent)]
    Editor(#[from] EditorError),
    #[error("no document in {0}; run `mindcanvas new` first")]
    NoDocument(PathBuf),
    #[error("a document already exists in {0}")]
    AlreadyExists(PathBuf),
}

impl CliError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Persist(e) => e.error_code(),
            Self::Editor(e) => e.error_code(),
            Self::NoDocument(_) => "E_NO_DOCUMENT",
            Self::AlreadyExists(_) => "E_ALREADY_EXISTS",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "mindcanvas", about = "Inspect and edit mind-map document folders")]
struct Cli {
    /// Document folder holding `document.json` and `assets/`.
    #[arg(long, env = "MINDCANVAS_DIR", default_value = ".")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a document with a single root node.
    New {
        #[arg(long, default_value = "Central topic")]
        title: String,
    },
    /// Print the forest as an indented outline.
    Outline {
        #[arg(long, default_value_t = false)]
        ids: bool,
    },
    /// Add a node under `--parent`, or a new root when no parent is given.
    Add {
        text: String,
        #[arg(long)]
        parent: Option<NodeId>,
    },
    /// Re-measure every node and lay the whole document out again.
    Relayout,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.error_code(), "{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = EngineConfig::from_env()?;
    let mut provider = FsPersistence::new(cli.dir);

    match cli.command {
        Command::New { title } => run_new(&mut provider, config, &title),
        Command::Outline { ids } => {
            let editor = open(&mut provider, config)?;
            print!("{}", outline(editor.store(), ids));
            Ok(())
        }
        Command::Add { text, parent } => {
            let mut editor = open(&mut provider, config)?;
            let id = match parent {
                Some(parent) => editor.add_child(parent, &text)?,
                None => editor.add_root(&text, Point::new(0.0, 0.0))?,
            };
            provider.save(&editor.to_document())?;
            println!("{id}");
            Ok(())
        }
        Command::Relayout => {
            let mut editor = open(&mut provider, config)?;
            editor.relayout_all()?;
            provider.save(&editor.to_document())?;
            tracing::info!(nodes = editor.store().len(), "relayout saved");
            Ok(())
        }
    }
}

fn run_new(provider: &mut FsPersistence, config: EngineConfig, title: &str) -> Result<(), CliError> {
    if provider.load()?.is_some() {
        return Err(CliError::AlreadyExists(provider.dir().to_path_buf()));
    }
    let mut editor = Editor::new(config, Box::new(MonospaceMeasurer::default()));
    let root = editor.add_root(title, Point::new(0.0, 0.0))?;
    provider.save(&editor.to_document())?;
    println!("{root}");
    Ok(())
}

fn open(provider: &mut FsPersistence, config: EngineConfig) -> Result<Editor, CliError> {
    let Some(doc) = provider.load()? else {
        return Err(CliError::NoDocument(provider.dir().to_path_buf()));
    };
    let mut editor = Editor::new(config, Box::new(MonospaceMeasurer::default()));
    editor.load_document(doc)?;
    Ok(editor)
}

/// Two spaces per level; collapsed nodes are marked with `+`.
fn outline(store: &Store, with_ids: bool) -> String {
    let mut out = String::new();
    let mut stack: Vec<(NodeId, usize)> = store.root_ids().iter().rev().map(|r| (*r, 0)).collect();
    while let Some((id, depth)) = stack.pop() {
        let Ok(node) = store.node(id) else {
            continue;
        };
        let marker = if node.collapsed { '+' } else { '-' };
        out.push_str(&"  ".repeat(depth));
        out.push(marker);
        out.push(' ');
        out.push_str(&node.text.replace('\n', " "));
        if with_ids {
            out.push_str(&format!("  [{id}]"));
        }
        out.push('\n');
        stack.extend(node.children.iter().rev().map(|c| (*c, depth + 1)));
    }
    out
}
