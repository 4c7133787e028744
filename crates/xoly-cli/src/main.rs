use clap::{Args, Parser, Subcommand};
use indexmap::IndexMap;
use std::path::{Component, Path, PathBuf};
use tracing_subscriber::EnvFilter;
use xoly_lexer::Scanner;
use xoly_render::{Engine, LoadError, RenderOptions, Scope, TemplateLoader, Value};

#[derive(Parser)]
#[command(name = "xoly")]
#[command(about = "xoly: tag-based template interpreter")]
#[command(version)]
struct Cli {
    /// Log render decisions (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template to stdout
    Render {
        /// Input template file
        path: PathBuf,

        #[command(flatten)]
        options: RenderArgs,
    },

    /// Check a template for parse errors without rendering it
    Check {
        /// Input template file
        path: PathBuf,
    },

    /// Print the token stream of a template
    Tokens {
        /// Input template file
        path: PathBuf,
    },
}

#[derive(Args)]
struct RenderArgs {
    /// Directory includes are resolved against (defaults to the template's directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Bind a variable before rendering (repeatable)
    #[arg(long = "var", value_name = "NAME=VALUE")]
    vars: Vec<String>,

    /// Initial scope as a JSON object
    #[arg(long = "vars", value_name = "FILE")]
    vars_file: Option<PathBuf>,

    /// Maximum iterations of a single loop
    #[arg(long)]
    loop_limit: Option<usize>,

    /// Maximum include nesting
    #[arg(long)]
    include_depth: Option<usize>,

    /// Maximum tag nesting
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print the final scope as JSON on stderr
    #[arg(long)]
    print_scope: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Render { path, options } => cmd_render(&path, options),
        Command::Check { path } => cmd_check(&path),
        Command::Tokens { path } => cmd_tokens(&path),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}

fn read_source(path: &Path) -> String {
    if !path.exists() {
        fail(format_args!("file not found: {}", path.display()));
    }
    match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => fail(format_args!("reading {}: {e}", path.display())),
    }
}

/// Resolves includes relative to a root directory. Absolute paths and
/// `..` components are refused.
struct FsLoader {
    root: PathBuf,
}

impl TemplateLoader for FsLoader {
    fn load(&self, path: &str) -> Result<String, LoadError> {
        let relative = Path::new(path);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(LoadError::new(format!("path escapes the include root: {path}")));
        }

        let full = self.root.join(relative);
        tracing::debug!(path = %full.display(), "loading include");
        std::fs::read_to_string(&full)
            .map_err(|e| LoadError::new(format!("{}: {e}", full.display())))
    }
}

fn initial_scope(options: &RenderArgs) -> Scope {
    let mut scope = match &options.vars_file {
        Some(file) => {
            let json = read_source(file);
            match serde_json::from_str::<IndexMap<String, Value>>(&json) {
                Ok(vars) => Scope::from(vars),
                Err(e) => fail(format_args!("{}: {e}", file.display())),
            }
        }
        None => Scope::new(),
    };

    for binding in &options.vars {
        let Some((name, value)) = binding.split_once('=') else {
            fail(format_args!("--var expects NAME=VALUE, got '{binding}'"));
        };
        scope.set(name.trim(), value);
    }

    scope
}

fn cmd_render(path: &Path, options: RenderArgs) {
    let source = read_source(path);
    let mut scope = initial_scope(&options);

    let defaults = RenderOptions::default();
    let render_options = RenderOptions {
        loop_limit: options.loop_limit.unwrap_or(defaults.loop_limit),
        max_include_depth: options.include_depth.unwrap_or(defaults.max_include_depth),
        max_depth: options.max_depth.unwrap_or(defaults.max_depth),
    };
    let root = match &options.root {
        Some(root) => root.clone(),
        None => path.parent().unwrap_or(Path::new(".")).to_path_buf(),
    };
    let engine = Engine::with_options(render_options).with_loader(FsLoader { root });

    let template = match engine.parse(&source) {
        Ok(template) => template,
        Err(e) => {
            eprintln!("Parse error: {e}");
            std::process::exit(1);
        }
    };

    tracing::debug!(path = %path.display(), vars = scope.len(), "rendering");
    match engine.render(&template, &mut scope) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Render error: {e}");
            std::process::exit(1);
        }
    }

    if options.print_scope {
        match serde_json::to_string_pretty(&scope) {
            Ok(json) => eprintln!("{json}"),
            Err(e) => fail(e),
        }
    }
}

fn cmd_check(path: &Path) {
    let source = read_source(path);

    if let Err(e) = xoly_render::parse(&source) {
        eprintln!("Parse error: {e}");
        std::process::exit(1);
    }

    eprintln!("OK: {}", path.display());
}

fn cmd_tokens(path: &Path) {
    let source = read_source(path);

    for token in Scanner::new(&source) {
        match token {
            Ok(token) => println!("{}:{} {:?}", token.span.line, token.span.column, token.kind),
            Err(e) => fail(e),
        }
    }
}
