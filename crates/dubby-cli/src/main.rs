use clap::{Parser, Subcommand};
use dubby::commands::{
    config::{self, ConfigAction},
    convert::{self, ConvertCommand},
    pack::{self, PackCommand},
    unpack::{self, UnpackCommand},
};
use dubby::GlobalOpts;
use dubby_config::Config;
use dubby_logger as logger;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "dubby")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Dual Universe script export toolkit",
    long_about = "dubby unpacks Dual Universe script exports into editable Lua source directories and packs them back."
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Unpack a JSON or autoconf export into a source directory
    Unpack(UnpackCommand),
    /// Pack a source directory into a JSON or autoconf export
    Pack(PackCommand),
    /// Convert an export between JSON and autoconf
    Convert(ConvertCommand),
    /// Configure dubby
    #[command(subcommand_required = false, arg_required_else_help = false)]
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

fn main() {
    let cli = Cli::parse();
    let verbosity = cli.global.verbosity_level();

    if let Err(e) = logger::init_with_verbosity(verbosity, cli.global.no_stdout) {
        eprintln!("Warning: Failed to initialize logger: {}", e);
    }
    init_tracing(verbosity);

    let load_config = || {
        Config::load().unwrap_or_else(|e| {
            logger::warn(&format!("Ignoring config: {}", e));
            Config::default()
        })
    };

    let result = match cli.command {
        Commands::Unpack(cmd) => unpack::handle_unpack(cmd, &load_config()),
        Commands::Pack(cmd) => pack::handle_pack(cmd, &load_config()),
        Commands::Convert(cmd) => convert::handle_convert(cmd),
        Commands::Config { action } => config::handle_config(action, &cli.global),
    };

    if let Err(e) = result {
        logger::error(&e.to_string());
        logger::show_log_path();
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logger::verbosity_to_filter_directive(verbosity)));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .compact()
                .with_writer(std::io::stderr),
        )
        .try_init();
}
