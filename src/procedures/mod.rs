//! The provisioning procedures.
//!
//! Each procedure validates its positional arguments, plans a `Pipeline`
//! from the configuration and runs it fail-fast.

pub mod bootstrap;
pub mod deploy;
pub mod tune;

use thiserror::Error;

use crate::external::Invocation;

/// Wrong number of positional arguments.
///
/// Displays as the one-line usage string the CLI prints before exiting 1.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("usage: {usage}")]
pub struct UsageError {
    pub usage: &'static str,
}

pub(crate) fn expect_args<'a, const N: usize>(
    args: &'a [String],
    usage: &'static str,
) -> Result<[&'a str; N], UsageError> {
    if args.len() != N {
        return Err(UsageError { usage });
    }
    let mut out = [""; N];
    for (slot, arg) in out.iter_mut().zip(args) {
        *slot = arg.as_str();
    }
    Ok(out)
}

pub(crate) fn apt_update(use_sudo: bool) -> Invocation {
    Invocation::new("apt-get", ["update"]).privileged(use_sudo)
}

pub(crate) fn apt_install(packages: &[String], use_sudo: bool) -> Invocation {
    let args = ["install", "-y"]
        .into_iter()
        .map(str::to_string)
        .chain(packages.iter().cloned());
    Invocation::new("apt-get", args).privileged(use_sudo)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_expect_args_exact_count() {
        let args = owned(&["a", "b", "c"]);
        let [x, y, z] = expect_args::<3>(&args, "x y z").unwrap();
        assert_eq!((x, y, z), ("a", "b", "c"));
    }

    #[test]
    fn test_expect_args_rejects_too_few_and_too_many() {
        assert!(expect_args::<3>(&owned(&["a", "b"]), "x y z").is_err());
        assert!(expect_args::<3>(&owned(&["a", "b", "c", "d"]), "x y z").is_err());
        assert_eq!(
            expect_args::<1>(&[], "srs-provision deploy <commit-hash>")
                .unwrap_err()
                .to_string(),
            "usage: srs-provision deploy <commit-hash>"
        );
    }

    #[test]
    fn test_apt_install_arguments() {
        let invocation = apt_install(&owned(&["cmake", "make"]), true);
        assert_eq!(invocation.program, "sudo");
        assert_eq!(invocation.args, owned(&["apt-get", "install", "-y", "cmake", "make"]));
    }
}
