//! Reconcile command.
//!
//! Converges the role of every configured username in every top-level
//! GitLab group, printing one line per group and per change.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use rolesync_core::{
    ConnectionSource, DesiredMembership, GitLabClient, GitLabSection, MembershipService,
    ReconcileReport, Reconciler,
};
use tracing::{info, warn};

use crate::config::ConfigLoader;

/// Reconcile arguments
#[derive(Args, Debug)]
pub struct ReconcileArgs {
    /// Print the changes without applying them
    #[arg(long)]
    pub dry_run: bool,

    /// GitLab base URL, overriding the config file
    #[arg(long, requires = "token_file")]
    pub url: Option<String>,

    /// File holding a personal access token
    #[arg(long, requires = "url", value_name = "PATH")]
    pub token_file: Option<PathBuf>,

    /// PEM bundle of extra trusted root certificates
    #[arg(long, requires = "url", value_name = "PATH")]
    pub ca_bundle: Option<PathBuf>,
}

impl ReconcileArgs {
    /// Pick where the connection settings come from.
    ///
    /// Explicit flags win, then an explicit config file, then the merged
    /// user and project configs.
    fn connection_source(
        &self,
        config_path: Option<&Path>,
        section: &GitLabSection,
    ) -> ConnectionSource {
        match (&self.url, &self.token_file, config_path) {
            (Some(url), Some(token_file), _) => ConnectionSource::Explicit {
                url: url.clone(),
                token_file: token_file.clone(),
                ca_bundle: self.ca_bundle.clone(),
            },
            (_, _, Some(path)) => ConnectionSource::ConfigFile {
                path: path.to_path_buf(),
            },
            _ => ConnectionSource::Section(section.clone()),
        }
    }
}

/// Run reconcile command
pub async fn run(args: ReconcileArgs, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => ConfigLoader::load_from_path(path)?,
        None => ConfigLoader::load()?,
    };

    if config.members.is_empty() {
        warn!("no members configured in [members]; nothing to reconcile");
        return Ok(());
    }

    let settings = args
        .connection_source(config_path, &config.gitlab)
        .resolve()
        .context("failed to resolve GitLab connection settings")?;
    info!(url = settings.url(), members = config.members.len(), "connecting to GitLab");

    let client = GitLabClient::new(&settings).context("failed to build GitLab client")?;

    let mut stdout = std::io::stdout().lock();
    let report = execute(&client, &config.members, args.dry_run, &mut stdout).await?;
    writeln!(stdout, "{report}")?;

    Ok(())
}

/// Reconcile against `service`, writing progress lines to `out`.
pub async fn execute<S, W>(
    service: &S,
    desired: &DesiredMembership,
    dry_run: bool,
    out: &mut W,
) -> Result<ReconcileReport>
where
    S: MembershipService + ?Sized,
    W: Write,
{
    let mut write_error = None;
    let report = Reconciler::new(service, desired)
        .dry_run(dry_run)
        .run(|event| {
            if write_error.is_none()
                && let Err(e) = writeln!(out, "{event}")
            {
                write_error = Some(e);
            }
        })
        .await
        .context("reconciliation aborted")?;

    if let Some(e) = write_error {
        return Err(e).context("failed to write progress");
    }

    Ok(report)
}
