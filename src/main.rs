use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};

use visual_memory::card::{CardFonts, CardRenderer};
use visual_memory::settings;

#[derive(Parser, Debug)]
#[command(
    name = "visual-memory",
    version,
    about = "Render heading and body text into visual memory card images"
)]
struct Cli {
    /// Read extra settings from a local TOML file
    #[arg(short = 'r', long = "read-settings", global = true)]
    read_settings: Option<String>,

    /// Enable verbose logging
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve POST /memory over HTTP
    Serve(ServeArgs),
    /// Render a single card to a PNG file
    Render(RenderArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Address to bind (default: [server] addr from settings)
    #[arg(long = "addr")]
    addr: Option<String>,
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Heading text
    #[arg(long = "heading", default_value = "")]
    heading: String,

    /// Body text (reads stdin when neither --body nor --body-file is given)
    #[arg(long = "body", conflicts_with = "body_file")]
    body: Option<String>,

    /// File containing the body text
    #[arg(long = "body-file")]
    body_file: Option<PathBuf>,

    /// Output PNG path
    #[arg(short = 'o', long = "output")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    visual_memory::logging::init(cli.verbose)?;

    let settings_path = cli.read_settings.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    match cli.command {
        Commands::Serve(args) => {
            let addr = args.addr.unwrap_or_else(|| settings.server_addr.clone());
            visual_memory::run_server(settings, addr).await
        }
        Commands::Render(args) => render_to_file(&settings, args),
    }
}

fn render_to_file(settings: &settings::Settings, args: RenderArgs) -> Result<()> {
    let body = match (args.body, args.body_file) {
        (Some(body), _) => body,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read body file: {}", path.display()))?,
        (None, None) => read_stdin_body()?,
    };

    let fonts = CardFonts::resolve(&settings.font);
    tracing::info!("card fonts: {}", fonts.source());
    let renderer = CardRenderer::new(Arc::new(fonts));
    let png = renderer.render(&args.heading, &body)?;
    std::fs::write(&args.output, &png)
        .with_context(|| format!("failed to write image: {}", args.output.display()))?;
    tracing::info!("wrote {} bytes to {}", png.len(), args.output.display());
    Ok(())
}

fn read_stdin_body() -> Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut buffer = Vec::new();
    stdin.lock().read_to_end(&mut buffer)?;
    String::from_utf8(buffer).map_err(|_| anyhow!("stdin must be UTF-8 text"))
}
