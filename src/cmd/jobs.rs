/*!
`jobs.rs`

Replication job commands:

  harbor job-list <policy_id> [--repository <repository>] [--status <status>]
                  [--page <page>] [--page-size <page_size>]
  harbor job-log <job_id>

`job-list` prints a table of `id, repository, operation, status, update_time`
sorted by id. A job that carries a tag shows its repository as `repo:tag`.
*/

use anyhow::{Context, Result};

use crate::api::HarborClient;
use crate::api::jobs::{JOB_STATUSES, JobFilter};
use crate::cmd::args::{ArgDecl, ArgSpec, ValueKind};
use crate::cmd::parser::ParsedArgs;
use crate::cmd::registry::{CommandEntry, command};
use crate::utils;

const JOB_LIST_FIELDS: &[&str] = &["id", "repository", "operation", "status", "update_time"];

fn job_list_args() -> ArgSpec {
    ArgSpec::from_decls([
        ArgDecl::new(["policy_id"])
            .metavar("<policy_id>")
            .kind(ValueKind::Int)
            .help("The ID of the policy that triggered this job."),
        ArgDecl::new(["--repository"])
            .metavar("<repository>")
            .help("The returned jobs list filtered by repository name."),
        ArgDecl::new(["--status"])
            .metavar("<status>")
            .choices(JOB_STATUSES.iter().copied())
            .help("The returned jobs list filtered by status."),
        ArgDecl::new(["--page"])
            .metavar("<page>")
            .kind(ValueKind::Int)
            .help("The page number, default is 1."),
        ArgDecl::new(["--page-size", "--page_size"])
            .metavar("<page_size>")
            .kind(ValueKind::Int)
            .help("The size of per page, default is 10, maximum is 100."),
    ])
}

fn job_log_args() -> ArgSpec {
    ArgSpec::from_decls([ArgDecl::new(["job_id"])
        .metavar("<job_id>")
        .kind(ValueKind::Int)
        .help("The ID of the job.")])
}

/// Filter for `job-list` from its parsed arguments.
fn job_filter(args: &ParsedArgs) -> Result<JobFilter> {
    let policy_id = args
        .int("policy_id")
        .context("policy_id is required")?;
    Ok(JobFilter {
        policy_id,
        repository: args.value("repository").map(str::to_string),
        status: args.value("status").map(str::to_string),
        page: args.int("page"),
        page_size: args.int("page_size"),
    })
}

fn do_job_list(cs: &HarborClient, args: &ParsedArgs) -> Result<()> {
    let filter = job_filter(args)?;
    let mut jobs = cs.jobs().list(&filter)?;
    tracing::debug!(
        url = %cs.config().base_url,
        count = jobs.len(),
        policy_id = filter.policy_id,
        "fetched jobs"
    );
    for job in &mut jobs {
        job.repository = job.display_repository();
    }
    utils::print_list(&jobs, JOB_LIST_FIELDS, Some("id"))
}

fn do_job_log(cs: &HarborClient, args: &ParsedArgs) -> Result<()> {
    let job_id = args.int("job_id").context("job_id is required")?;
    let log = cs.jobs().get_log(job_id)?;
    println!("{log}");
    Ok(())
}

pub const COMMANDS: &[CommandEntry] = &[
    command!(
        do_job_list,
        job_list_args,
        "List filters jobs according to the policy and repository."
    ),
    command!(do_job_log, job_log_args, "Get job logs."),
];
