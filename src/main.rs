use aidant::commands::Workspace;
use aidant::commands::generate::GenArgs;
use aidant::commands::review::ReviewOptions;
use aidant::utils::setup_crypto_provider;
use clap::CommandFactory;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Use jemalloc on musl x86_64 for better performance
#[cfg(all(target_env = "musl", target_arch = "x86_64"))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(
    name = "aidant",
    about = "Extract, review and apply SEARCH/REPLACE edits from LLM responses",
    long_about = None,
    version = env!("CARGO_PKG_VERSION"),
    long_version = concat!(
        env!("CARGO_PKG_VERSION"),
        "\n\n",
        "Build Information:\n",
        "  Timestamp:         ", env!("VERGEN_BUILD_TIMESTAMP"), "\n",
        "  Target Triple:     ", env!("VERGEN_CARGO_TARGET_TRIPLE"), "\n",
        "\n",
        "Source Control:\n",
        "  Commit SHA:        ", env!("VERGEN_GIT_SHA"), "\n",
        "  Commit Timestamp:  ", env!("VERGEN_GIT_COMMIT_TIMESTAMP"), "\n",
        "  Branch:            ", env!("VERGEN_GIT_BRANCH"), "\n",
        "\n",
        "Compiler:\n",
        "  Rustc Version:     ", env!("VERGEN_RUSTC_SEMVER"), "\n",
        "  Rustc Channel:     ", env!("VERGEN_RUSTC_CHANNEL"), "\n",
        "  Host Triple:       ", env!("VERGEN_RUSTC_HOST_TRIPLE"), "\n"
    ),
    disable_help_subcommand = true
)]
struct Cli {
    /// Workspace root [default: current directory]
    #[arg(short = 'C', long, global = true, value_hint = clap::ValueHint::DirPath)]
    workspace: Option<PathBuf>,

    /// Log engine activity to stderr (AIDANT_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct ReviewArgs {
    /// Apply without asking for confirmation
    #[arg(short, long)]
    yes: bool,
    /// Do not commit applied changes
    #[arg(long)]
    no_commit: bool,
    /// Parse, validate and preview only
    #[arg(long)]
    dry_run: bool,
}

impl From<ReviewArgs> for ReviewOptions {
    fn from(a: ReviewArgs) -> Self {
        ReviewOptions {
            assume_yes: a.yes,
            no_commit: a.no_commit,
            dry_run: a.dry_run,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the system prompt for the given files.
    Prompt {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        files: Vec<PathBuf>,
    },
    /// Extract edits from a response (file or stdin) and list them.
    Parse {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Parse and validate a response against the workspace without applying it.
    Check {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Review and apply the edits in a response.
    Apply {
        #[arg(value_hint = clap::ValueHint::FilePath)]
        input: Option<PathBuf>,
        #[command(flatten)]
        review: ReviewArgs,
    },
    /// Ask the model for changes and review them.
    Gen {
        request: Option<String>,
        /// Files whose content is sent as context
        #[arg(short, long = "file", value_hint = clap::ValueHint::FilePath)]
        files: Vec<PathBuf>,
        #[arg(short, long)]
        model: Option<String>,
        #[command(flatten)]
        review: ReviewArgs,
    },
    /// Report whether files can be edited as text.
    CanHandle {
        #[arg(required = true, value_hint = clap::ValueHint::FilePath)]
        paths: Vec<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Show instructions for enabling shell completions.
    Completions,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    setup_crypto_provider();

    clap_complete::CompleteEnv::with_factory(Cli::command).complete();

    let cli = Cli::parse();

    if let Commands::Completions = cli.command {
        println!(
            "Bash:\n\
            echo \"source <(COMPLETE=bash aidant)\" >> ~/.bashrc\n\
            \n\
            Elvish:\n\
            echo \"eval (E:COMPLETE=elvish aidant | slurp)\" >> ~/.elvish/rc.elv\n\
            \n\
            Fish:\n\
            echo \"COMPLETE=fish aidant | source\" >> ~/.config/fish/config.fish\n\
            \n\
            Zsh:\n\
            echo \"source <(COMPLETE=zsh aidant)\" >> ~/.zshrc\n"
        );
        return;
    }

    let result = match Workspace::open(cli.workspace, cli.verbose) {
        Ok(ws) => run(&ws, cli.command).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(ws: &Workspace, command: Commands) -> Result<(), aidant::exceptions::AidantError> {
    use aidant::commands;

    match command {
        Commands::Prompt { files } => commands::prompt::run(ws, files),
        Commands::Parse { input, json } => commands::parse::run(ws, input, json),
        Commands::Check { input, json } => commands::check::run(ws, input, json),
        Commands::Apply { input, review } => commands::apply::run(ws, input, review.into()),
        Commands::Gen {
            request,
            files,
            model,
            review,
        } => {
            commands::generate::run(
                ws,
                GenArgs {
                    request,
                    files,
                    model,
                    review: review.into(),
                },
            )
            .await
        }
        Commands::CanHandle { paths, json } => commands::can_handle::run(ws, paths, json),
        Commands::Completions => Ok(()),
    }
}
