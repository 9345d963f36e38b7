use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "octofhir-permission")]
#[command(about = "Compile FHIR Permissions, authorize requests and redact responses")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Engine configuration file (TOML)
    #[arg(short, long, global = true, env = "OCTOFHIR_PERMISSION_CONFIG")]
    pub config: Option<String>,

    /// Log level, used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    /// Output format
    #[arg(short, long, global = true)]
    pub format: Option<OutputFormat>,

    /// User the permissions are evaluated for
    #[arg(long, global = true, default_value = "cli")]
    pub user_id: String,

    /// Opaque token handed to the permission service
    #[arg(long, global = true, env = "OCTOFHIR_PERMISSION_TOKEN", default_value = "")]
    pub token: String,
}

#[derive(Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile Permission resources and print the resulting rules
    Compile(CompileArgs),
    /// Decide a request and print the scoped search parameters
    Evaluate(EvaluateArgs),
    /// Redact a resource or Bundle
    Filter(FilterArgs),
    /// Check a resource against the search criteria of its rules
    Match(MatchArgs),
}

#[derive(clap::Args)]
pub struct CompileArgs {
    /// Permission, array of Permissions, or Bundle (JSON)
    #[arg(short, long)]
    pub permissions: String,
}

#[derive(clap::Args)]
pub struct EvaluateArgs {
    /// Permission, array of Permissions, or Bundle (JSON)
    #[arg(short, long)]
    pub permissions: String,
    /// HTTP verb (GET, POST, PUT, PATCH, DELETE)
    #[arg(short, long, default_value = "GET")]
    pub method: String,
    /// Resource type (e.g. Patient)
    #[arg(short, long)]
    pub resource_type: String,
    /// Resource id, for instance-level requests
    #[arg(long)]
    pub id: Option<String>,
    /// Operation name (e.g. $everything)
    #[arg(long)]
    pub operation: Option<String>,
    /// Raw query string (e.g. "name=Doe&_count=10")
    #[arg(short, long)]
    pub query: Option<String>,
}

#[derive(clap::Args)]
pub struct FilterArgs {
    /// Permission, array of Permissions, or Bundle (JSON)
    #[arg(short, long)]
    pub permissions: String,
    /// Resource or Bundle to redact (reads from stdin if omitted)
    #[arg(short, long)]
    pub input: Option<String>,
    /// Response status code
    #[arg(short, long, default_value_t = 200)]
    pub status: u16,
}

#[derive(clap::Args)]
pub struct MatchArgs {
    /// Permission, array of Permissions, or Bundle (JSON)
    #[arg(short, long)]
    pub permissions: String,
    /// Resource to check (reads from stdin if omitted)
    #[arg(short, long)]
    pub input: Option<String>,
}
