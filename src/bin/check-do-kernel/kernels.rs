//! Decide whether a droplet's configured kernel is the newest one offered
//!
//! Kernel names follow a loose convention: `Ubuntu 16.04 x64
//! vmlinuz-4.4.0-31-generic` is the OS family, release, and architecture,
//! then the exact build. Two kernels are comparable when those identifying
//! fields line up, and a comparison only makes sense inside a comparable
//! set: an Ubuntu 16.04 droplet being offered a CentOS kernel is not
//! "out of date".

use std::fmt;

/// A boot kernel as the provider offers it.
///
/// Ids are handed out in the order kernels are introduced, so a bigger id
/// is a newer kernel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Kernel {
    pub id: u64,
    pub name: String,
}

/// Decides which offered kernels count as upgrade candidates for the
/// kernel it was built from.
#[derive(Debug, PartialEq)]
pub enum KernelFilter {
    /// Candidates must share the `{family} {release} {arch}` prefix.
    Prefix(String),
    /// Ubuntu offers several build lines per release (generic, hardened,
    /// container variants), so candidates must also be the same build with
    /// only the patch segment free to vary.
    BuildLine {
        base: String,
        segments: Vec<String>,
        patch: Option<usize>,
    },
}

/// Segment of the build string that carries the patch number:
/// `vmlinuz-4.4.0-31-generic` -> `31`.
const PATCH_SEGMENT: usize = 2;

impl KernelFilter {
    /// Build the filter for everything comparable to `name`.
    ///
    /// Names with fewer than three fields are a malformed provider
    /// response; whatever fields exist become the prefix rather than
    /// failing the whole check.
    pub fn from_current(name: &str) -> KernelFilter {
        let fields: Vec<&str> = name.split_whitespace().collect();
        if fields.len() < 3 {
            return KernelFilter::Prefix(fields.join(" "));
        }
        let base = fields[..3].join(" ");
        if fields[0].starts_with("Ubuntu") {
            if let Some(build) = fields.get(3) {
                let segments: Vec<String> =
                    build.split('-').map(|segment| segment.to_owned()).collect();
                let patch = if segments.len() > PATCH_SEGMENT {
                    Some(PATCH_SEGMENT)
                } else {
                    None
                };
                return KernelFilter::BuildLine {
                    base: base,
                    segments: segments,
                    patch: patch,
                };
            }
        }
        KernelFilter::Prefix(base)
    }

    /// Is `candidate` an upgrade/downgrade candidate for the kernel this
    /// filter was built from?
    pub fn matches(&self, candidate: &str) -> bool {
        match *self {
            KernelFilter::Prefix(ref base) => candidate.starts_with(base.as_str()),
            KernelFilter::BuildLine {
                ref base,
                ref segments,
                patch,
            } => {
                let fields: Vec<&str> = candidate.split_whitespace().collect();
                // exactly base + build: trailing fields would be a
                // different variant
                if fields.len() != 4 || fields[..3].join(" ") != *base {
                    return false;
                }
                let candidate_segments: Vec<&str> = fields[3].split('-').collect();
                if candidate_segments.len() != segments.len() {
                    return false;
                }
                candidate_segments
                    .iter()
                    .zip(segments.iter())
                    .enumerate()
                    .all(|(i, (found, wanted))| {
                        if Some(i) == patch {
                            !found.is_empty() && found.bytes().all(|b| b.is_ascii_digit())
                        } else {
                            *found == wanted.as_str()
                        }
                    })
            }
        }
    }
}

impl fmt::Display for KernelFilter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            KernelFilter::Prefix(ref base) => write!(f, "{}*", base),
            KernelFilter::BuildLine {
                ref base,
                ref segments,
                patch,
            } => {
                write!(f, "{} ", base)?;
                for (i, segment) in segments.iter().enumerate() {
                    if i > 0 {
                        f.write_str("-")?;
                    }
                    if Some(i) == patch {
                        f.write_str("<n>")?;
                    } else {
                        f.write_str(segment)?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// The kernels comparable to the one the filter was built from, newest
/// first.
pub fn comparable<'a>(filter: &KernelFilter, offered: &'a [Kernel]) -> Vec<&'a Kernel> {
    let mut matched: Vec<&Kernel> = offered
        .iter()
        .filter(|kernel| filter.matches(&kernel.name))
        .collect();
    matched.sort_by(|a, b| b.id.cmp(&a.id));
    matched
}

/// What the comparison of the configured kernel against everything
/// offered came out to.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    /// The configured kernel is the newest comparable one.
    UpToDate,
    /// A newer comparable kernel is offered.
    Behind(Kernel),
    /// Nothing offered is comparable to the configured kernel.
    NoMatch,
}

/// Rank the comparable kernels and see where the configured one falls.
pub fn compare(current: &Kernel, filter: &KernelFilter, offered: &[Kernel]) -> CheckResult {
    match comparable(filter, offered).first() {
        Some(newest) if newest.id == current.id => CheckResult::UpToDate,
        Some(newest) => CheckResult::Behind(Kernel {
            id: newest.id,
            name: newest.name.clone(),
        }),
        None => CheckResult::NoMatch,
    }
}
