//! CLI binary for edgequake-pdfbot.
//!
//! `pdfbot serve` runs the Telegram webhook bot; `pdfbot convert` runs the
//! same PDF → Word conversion offline. Both are thin shims that map flags
//! onto the library's config builders.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_pdfbot::pipeline::text::bind_pdfium;
use edgequake_pdfbot::{
    convert_to_file, run_webhook, BotConfig, PipelineConfig, TextEngine, OUTPUT_FILE_NAME,
};
use std::io;
use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the bot behind Render (or any HTTPS reverse proxy)
  TELEGRAM_BOT_TOKEN=123:abc RENDER_EXTERNAL_URL=https://my-bot.onrender.com pdfbot serve

  # Convert a PDF locally, exactly as the bot would
  pdfbot convert report.pdf -o report.docx

  # Same, pure-Rust text reader, JSON report on stdout
  pdfbot convert --text-engine lopdf --json report.pdf

ENVIRONMENT VARIABLES:
  TELEGRAM_BOT_TOKEN      Bot token from @BotFather (serve, required)
  RENDER_EXTERNAL_URL     Public base URL of the webhook (serve, required)
  PORT                    Webhook listen port (default 5000)
  PDFBOT_LISTEN_ADDR      Webhook listen address (default 0.0.0.0)
  PDFBOT_TEXT_ENGINE      pdfium | lopdf (default pdfium)
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  PDFBOT_CHUNK_SIZE       Max characters per chat message (1-4096)
  PDFBOT_IMAGE_WIDTH      Picture width in the Word document, inches
  RUST_LOG                Log filter, overrides --verbose / --quiet
"#;

/// Telegram bot that turns PDFs into chat messages and Word documents.
#[derive(Parser, Debug)]
#[command(
    name = "pdfbot",
    version,
    about = "Telegram bot that turns PDFs into chat messages and Word documents",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDFBOT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDFBOT_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register the webhook and serve Telegram updates.
    Serve(ServeArgs),
    /// Convert a local PDF to a Word document.
    Convert(ConvertArgs),
}

#[derive(Args, Debug)]
struct PipelineArgs {
    /// Text reader: pdfium (native, default) or lopdf (pure Rust).
    #[arg(long, env = "PDFBOT_TEXT_ENGINE", value_enum, default_value = "pdfium")]
    text_engine: EngineArg,

    /// Path to libpdfium. Default: the system library.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Max characters per chat message (1–4096).
    #[arg(long, env = "PDFBOT_CHUNK_SIZE", default_value_t = 4096)]
    chunk_size: usize,

    /// Width of embedded pictures in the Word document, in inches.
    #[arg(long, env = "PDFBOT_IMAGE_WIDTH", default_value_t = 5.0)]
    image_width: f32,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Telegram bot token.
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Public base URL; the webhook is registered at <URL>/<token>.
    #[arg(long, env = "RENDER_EXTERNAL_URL")]
    public_url: Option<String>,

    /// Address the webhook server binds to.
    #[arg(long, env = "PDFBOT_LISTEN_ADDR", default_value = "0.0.0.0")]
    listen_addr: IpAddr,

    /// Port the webhook server binds to.
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Local PDF file.
    input: PathBuf,

    /// Output path. Default: converted.docx next to the input.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the conversion report as JSON on stdout.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    pipeline: PipelineArgs,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EngineArg {
    Pdfium,
    Lopdf,
}

impl From<EngineArg> for TextEngine {
    fn from(v: EngineArg) -> Self {
        match v {
            EngineArg::Pdfium => TextEngine::Pdfium,
            EngineArg::Lopdf => TextEngine::Lopdf,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let outcome = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Convert(args) => convert(args, cli.quiet).await,
    };

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Map the shared flags onto a validated `PipelineConfig`, falling back to
/// the lopdf text reader when pdfium cannot be bound.
fn build_pipeline(args: &PipelineArgs) -> Result<PipelineConfig> {
    let mut engine: TextEngine = args.text_engine.into();
    if engine == TextEngine::Pdfium {
        if let Err(e) = bind_pdfium(args.pdfium_lib.as_deref()) {
            warn!("{e}");
            warn!("Falling back to the lopdf text reader");
            engine = TextEngine::Lopdf;
        }
    }

    let mut builder = PipelineConfig::builder()
        .text_engine(engine)
        .chunk_size(args.chunk_size)
        .image_width_inches(args.image_width);
    if let Some(ref path) = args.pdfium_lib {
        builder = builder.pdfium_lib_path(path);
    }
    builder.build().context("Invalid pipeline options")
}

async fn serve(args: ServeArgs) -> Result<()> {
    let pipeline = build_pipeline(&args.pipeline)?;

    let mut builder = BotConfig::builder()
        .listen_ip(args.listen_addr)
        .port(args.port)
        .pipeline(pipeline);
    if let Some(token) = args.token {
        builder = builder.bot_token(token);
    }
    if let Some(url) = args.public_url {
        builder = builder.public_url(url);
    }
    let config = builder.build().context("Cannot start the bot")?;
    info!("Starting with {:?}", config);

    run_webhook(config).await.context("Bot stopped with an error")
}

async fn convert(args: ConvertArgs, quiet: bool) -> Result<()> {
    let config = build_pipeline(&args.pipeline)?;
    let output = args.output.unwrap_or_else(|| {
        args.input
            .parent()
            .map(|dir| dir.join(OUTPUT_FILE_NAME))
            .unwrap_or_else(|| PathBuf::from(OUTPUT_FILE_NAME))
    });

    let summary = convert_to_file(&args.input, &output, &config)
        .await
        .with_context(|| format!("Conversion of {} failed", args.input.display()))?;

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise report")?
        );
    } else if !quiet {
        let skipped = summary.extraction.issues.len() + summary.assembly.issues.len();
        eprintln!(
            "{}  {} pages  {} text blocks  {} images  {}ms  →  {}",
            if skipped == 0 { green("✔") } else { cyan("⚠") },
            summary.extraction.page_count,
            summary.extraction.text_blocks,
            summary.assembly.images_embedded,
            summary.extraction.duration_ms,
            bold(&summary.output.display().to_string()),
        );
        for issue in summary
            .extraction
            .issues
            .iter()
            .chain(summary.assembly.issues.iter())
        {
            eprintln!("   {} {}", cyan("⚠"), issue);
        }
    }
    Ok(())
}
