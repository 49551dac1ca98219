use structopt::StructOpt;

/// Check whether a Digital Ocean droplet boots the newest kernel offered
/// for it.
#[derive(StructOpt, Debug)]
#[structopt(
    name = "check-do-kernel (part of docean-plugins)",
    after_help = "Statuses:

    OK        the configured kernel is the newest comparable one
    WARNING   a newer comparable kernel is offered (CRITICAL with -c)
    UNKNOWN   the droplet, its kernel list, or the API could not be read

Examples:

    Alert when web-1 falls behind on kernel updates:

        check-do-kernel -k $DO_KEY -H web-1

    Page instead of warn:

        check-do-kernel -k $DO_KEY -H web-1 --critical

    See every kernel web-1 could boot, the configured one flagged:

        check-do-kernel -k $DO_KEY -H web-1 --all"
)]
pub(crate) struct Args {
    /// Digital Ocean API token
    #[structopt(short = "k", long = "key", value_name = "TOKEN")]
    pub key: String,

    /// Hostname of the droplet to check
    #[structopt(short = "H", long = "hostname", value_name = "HOST")]
    pub hostname: Option<String>,

    /// List every droplet and its configured kernel instead of checking
    #[structopt(short = "l", long = "list")]
    pub list: bool,

    /// List every kernel offered for the droplet instead of checking
    #[structopt(short = "a", long = "all", conflicts_with = "list")]
    pub all: bool,

    /// List only the kernels comparable to the configured one
    #[structopt(
        short = "m",
        long = "matching",
        conflicts_with = "list",
        conflicts_with = "all"
    )]
    pub matching: bool,

    /// Report CRITICAL instead of WARNING when a newer kernel is offered
    #[structopt(short = "c", long = "critical")]
    pub critical: bool,

    /// Seconds to wait for each API call
    #[structopt(
        short = "t",
        long = "timeout",
        value_name = "SECONDS",
        default_value = "15"
    )]
    pub timeout: u64,

    /// Print diagnostics; repeat up to -vvv to include response bodies
    #[structopt(short = "v", long = "verbose", parse(from_occurrences))]
    pub verbose: u8,
}
