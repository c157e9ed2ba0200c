use anyhow::Result;
use bytefield_cli::{commands, ExtentArg};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "bytefield")]
#[command(about = "Bytefield - Inspect and edit binary files through declarative layouts", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode every field of a binary file as JSON
    Inspect {
        /// Schema declaration (JSON)
        #[arg(short, long)]
        schema: String,

        /// Binary input file, "-" for stdin
        #[arg(short, long)]
        input: String,

        /// Extent of a dynamic field present in the input (NAME=LEN or NAME=AxB)
        #[arg(short, long = "extent")]
        extents: Vec<ExtentArg>,
    },

    /// Assign one field and write the file back
    Set {
        /// Schema declaration (JSON)
        #[arg(short, long)]
        schema: String,

        /// Binary input file
        #[arg(short, long)]
        input: String,

        /// Field to assign, dotted path into embedded records
        #[arg(short, long)]
        field: String,

        /// New value as JSON
        #[arg(long)]
        value: String,

        /// Extent of a dynamic field present in the input (NAME=LEN or NAME=AxB)
        #[arg(short, long = "extent")]
        extents: Vec<ExtentArg>,

        /// Output file, defaults to rewriting the input
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Print the offset, size and bytes of every field
    Layout {
        /// Schema declaration (JSON)
        #[arg(short, long)]
        schema: String,

        /// Binary input file; a fresh record is laid out when omitted
        #[arg(short, long)]
        input: Option<String>,

        /// Extent of a dynamic field (NAME=LEN or NAME=AxB)
        #[arg(short, long = "extent")]
        extents: Vec<ExtentArg>,

        /// Print the rows as JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Inspect {
            schema,
            input,
            extents,
        } => commands::inspect::execute(&schema, &input, &extents),

        Commands::Set {
            schema,
            input,
            field,
            value,
            extents,
            output,
        } => commands::set::execute(&schema, &input, &field, &value, &extents, output.as_deref()),

        Commands::Layout {
            schema,
            input,
            extents,
            json,
        } => commands::layout::execute(&schema, input.as_deref(), &extents, json),
    }
}
