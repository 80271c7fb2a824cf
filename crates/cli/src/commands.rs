use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Show the progress of a single load job
    Progress {
        #[arg(long, help = "Load job ID to inspect")]
        job: String,

        #[arg(
            long,
            help = "If set, prints the progress information as JSON instead of a table"
        )]
        json: bool,

        #[arg(
            long,
            help = "Job store directory (defaults to ~/.vloader/state)"
        )]
        state_dir: Option<String>,
    },
    /// List every load job recorded in the job store
    Jobs {
        #[arg(long, help = "If set, prints the job list as JSON instead of a table")]
        json: bool,

        #[arg(
            long,
            help = "Job store directory (defaults to ~/.vloader/state)"
        )]
        state_dir: Option<String>,
    },
    /// Print the effective load settings
    Settings {
        #[arg(
            long,
            help = "Settings file path; built-in defaults are used when omitted"
        )]
        config: Option<String>,
    },
}
