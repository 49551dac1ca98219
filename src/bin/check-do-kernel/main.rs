//! Check that a Digital Ocean droplet boots the newest kernel offered
//! for it
//!
//! Droplets pick their boot kernel from a provider-managed list. The
//! check looks a droplet up by hostname, works out which offered kernels
//! belong to the same OS/release/architecture line as the configured
//! one, and alerts when a newer kernel in that line exists.

extern crate docean_plugins;
#[macro_use]
extern crate derive_more;
extern crate reqwest;
extern crate serde;
#[macro_use]
extern crate serde_derive;
extern crate serde_json;
extern crate structopt;

mod api;
mod args;
mod kernels;

use structopt::StructOpt;

use docean_plugins::Status;

use api::{DoClient, Droplet};
use args::Args;
use kernels::{CheckResult, Kernel, KernelFilter};

#[cfg_attr(test, allow(dead_code))]
fn main() {
    let args = Args::from_args();
    if args.hostname.is_none() && !args.list {
        println!("--hostname is required unless --list is given");
        Status::Unknown.exit();
    }

    let client = DoClient::new(&args.key, args.timeout, args.verbose)
        .unwrap_or_else(|e| unknown_exit(&format!("could not build the http client: {}", e)));
    let droplets = client
        .droplets()
        .unwrap_or_else(|e| unknown_exit(&format!("could not fetch droplets: {}", e)));
    if args.verbose > 1 {
        println!("INFO: the account has {} droplets", droplets.len());
    }

    if args.list {
        list_droplets(&droplets);
        Status::Ok.exit();
    }

    // guarded at the top of main
    let hostname = args.hostname.unwrap();
    let droplet = match droplets.iter().find(|d| d.name == hostname) {
        Some(droplet) => droplet,
        None => unknown_exit(&format!("no droplet named {} on this account", hostname)),
    };
    let current = match droplet.kernel {
        Some(ref kernel) => kernel,
        None => unknown_exit(&format!("droplet {} has no configured kernel", hostname)),
    };
    let offered = client
        .kernels(droplet.id)
        .unwrap_or_else(|e| unknown_exit(&format!("could not fetch kernels for {}: {}", hostname, e)));
    if args.verbose > 1 {
        println!("INFO: {} kernels are offered for {}", offered.len(), hostname);
    }

    if args.all {
        print_kernels(&offered, current);
        Status::Ok.exit();
    }

    let filter = KernelFilter::from_current(&current.name);
    if args.verbose > 1 {
        println!("INFO: comparable kernels must look like {}", filter);
    }

    if args.matching {
        print_kernels(kernels::comparable(&filter, &offered), current);
        Status::Ok.exit();
    }

    let result = kernels::compare(current, &filter, &offered);
    let (status, message) = report(current, &result, args.critical);
    println!("DO KERNEL {}: {}", status, message);
    status.exit();
}

/// Print the UNKNOWN line the monitoring system expects and give up.
fn unknown_exit(msg: &str) -> ! {
    println!("DO KERNEL UNKNOWN: {}", msg);
    Status::Unknown.exit()
}

fn list_droplets(droplets: &[Droplet]) {
    for droplet in droplets {
        match droplet.kernel {
            Some(ref kernel) => println!("{}\t{}", droplet.name, kernel.name),
            None => println!("{}\t-", droplet.name),
        }
    }
}

/// One kernel per line, the configured one flagged.
fn print_kernels<'a, I>(offered: I, current: &Kernel)
where
    I: IntoIterator<Item = &'a Kernel>,
{
    for kernel in offered {
        let flag = if kernel.id == current.id { "*" } else { "" };
        println!("{}\t{}\t{}", flag, kernel.id, kernel.name);
    }
}

/// Turn the comparison into the status line the monitoring system sees.
fn report(current: &Kernel, result: &CheckResult, critical: bool) -> (Status, String) {
    match *result {
        CheckResult::UpToDate => (
            Status::Ok,
            format!("kernel {} is the newest available", current.name),
        ),
        CheckResult::Behind(ref newest) => {
            let status = if critical {
                Status::Critical
            } else {
                Status::Warning
            };
            (
                status,
                format!(
                    "kernel {} can be upgraded to {}",
                    current.name, newest.name
                ),
            )
        }
        CheckResult::NoMatch => (
            Status::Unknown,
            format!("no kernels offered are comparable to {}", current.name),
        ),
    }
}
