use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use cellflow_core::workflow_spec::{EmbeddingMode, ModelId};

#[derive(Parser, Debug)]
#[command(version, about = "Submit and follow single-cell embedding workflows", long_about = None)]
pub struct Cli {
    /// Service base URL including the API prefix [env: CELLFLOW_API_URL].
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Per-request timeout [env: CELLFLOW_REQUEST_TIMEOUT_SECS].
    #[arg(long, global = true, value_name = "SECS")]
    pub request_timeout_secs: Option<u64>,

    /// Delay between status polls [env: CELLFLOW_POLL_INTERVAL_SECS].
    #[arg(long, global = true, value_name = "SECS")]
    pub poll_interval_secs: Option<u64>,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// Upload an input file, submit a workflow and follow it.
    Run(RunArgs),
    /// Follow an existing workflow until it finishes.
    Watch(JobArgs),
    /// Show a workflow's current status once.
    Status(JobArgs),
    /// List workflows, newest first.
    List,
    /// List models compatible with single-cell workflows.
    Models(ModelsArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Local `.h5ad` file to upload.
    pub file: PathBuf,
    /// Compute target: scgpt or geneformer.
    #[arg(long)]
    pub model: ModelId,
    /// cls, cell or gene.
    #[arg(long, default_value = "cls")]
    pub embedding_mode: EmbeddingMode,
    /// Exit once the workflow is created.
    #[arg(long)]
    pub no_watch: bool,
}

#[derive(Args, Debug)]
pub struct JobArgs {
    /// Workflow id returned by `run`.
    pub job_id: String,
}

#[derive(Args, Debug)]
pub struct ModelsArgs {
    /// Only ask the service for models of this type.
    #[arg(long)]
    pub model_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_parses_model_and_defaults_mode() {
        let cli = Cli::parse_from(["cellflow", "run", "pbmc.h5ad", "--model", "scGPT"]);
        match cli.cmd {
            Cmd::Run(args) => {
                assert_eq!(args.model, ModelId::Scgpt);
                assert_eq!(args.embedding_mode, EmbeddingMode::Cls);
                assert!(!args.no_watch);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from([
            "cellflow",
            "watch",
            "wf-1",
            "--api-url",
            "http://example.test/api/v1",
            "--poll-interval-secs",
            "5",
        ]);
        assert_eq!(cli.api_url.as_deref(), Some("http://example.test/api/v1"));
        assert_eq!(cli.poll_interval_secs, Some(5));
    }

    #[test]
    fn unknown_model_is_rejected() {
        assert!(Cli::try_parse_from(["cellflow", "run", "x.h5ad", "--model", "esm2"]).is_err());
    }
}
