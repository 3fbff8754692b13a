//! Nuclei command line assembly.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use scanpost_core::types::Severity;

use crate::config::NucleiConfig;
use crate::job::NucleiArguments;

/// A fully resolved scanner invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NucleiCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl NucleiCommand {
    /// Builds the argument vector:
    ///
    /// ```text
    /// -list <targets> -json-export <response> -timeout <secs> -mhe <n>
    /// -severity <csv> [-templates <dir>] [-tags <csv>] [-w <workflow>]
    /// [extra flags...] -vv
    /// ```
    pub fn build(
        config: &NucleiConfig,
        list_path: &Path,
        response_path: &Path,
        include_severities: &[Severity],
        arguments: &NucleiArguments,
    ) -> Self {
        let severities = include_severities
            .iter()
            .map(Severity::as_str)
            .collect::<Vec<_>>()
            .join(",");

        let mut args: Vec<OsString> = vec![
            "-list".into(),
            list_path.into(),
            "-json-export".into(),
            response_path.into(),
            "-timeout".into(),
            config.timeout_secs.to_string().into(),
            "-mhe".into(),
            config.max_host_errors.to_string().into(),
            "-severity".into(),
            severities.into(),
        ];

        if let Some(dir) = &config.templates_dir {
            args.push("-templates".into());
            args.push(dir.into());
        }

        if !arguments.nuclei_tags.is_empty() {
            args.push("-tags".into());
            args.push(arguments.nuclei_tags.join(",").into());
        }

        if let Some(workflow) = &arguments.nuclei_workflow {
            args.push("-w".into());
            args.push(workflow.into());
        }

        args.extend(arguments.nuclei_argument_flags.iter().map(OsString::from));
        args.push("-vv".into());

        Self {
            program: config.binary_path.clone(),
            args,
        }
    }

    /// Scanner binary.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments, without the program.
    pub fn args(&self) -> &[OsString] {
        &self.args
    }
}

impl fmt::Display for NucleiCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}
