//! Command dispatch for plugin-e2e

pub mod check;
pub mod list;
pub mod run;
pub mod show;

use std::env;
use std::path::{Path, PathBuf};

use plugin_e2e_core::case::{self, TestCase};
use plugin_e2e_core::config::HarnessConfig;
use plugin_e2e_core::error::Result;

use crate::cli::{Cli, Commands};

/// Project root plus its resolved configuration.
pub struct Context {
    pub root: PathBuf,
    pub config: HarnessConfig,
}

impl Context {
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = cli
            .root
            .clone()
            .unwrap_or_else(|| env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let config = HarnessConfig::load_or_default(&root, cli.config.as_deref())?;
        Ok(Self { root, config })
    }

    /// Resolve a path against the project root.
    pub fn path(&self, path: &Path) -> PathBuf {
        self.config.resolve(&self.root, path)
    }

    pub fn cases_path(&self) -> PathBuf {
        self.path(&self.config.cases)
    }

    pub fn load_cases(&self) -> Result<Vec<TestCase>> {
        case::load(self.cases_path(), &self.config.defaults)
    }
}

pub fn run(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    tracing::debug!(root = %ctx.root.display(), "resolved project root");

    match &cli.command {
        Commands::Run(args) => run::execute(cli, &ctx, args),
        Commands::List { case_type } => list::execute(&ctx, case_type.as_deref()),
        Commands::Show { name } => show::execute(&ctx, name),
        Commands::Check => check::execute(cli, &ctx),
    }
}
