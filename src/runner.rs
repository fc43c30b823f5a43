//! Run orchestration
//!
//! For every profile that has changed files and a process for the current
//! hook, the runner executes the process's checks in order, passes entries
//! with a message to the per-entry handlers, stops early on an
//! `abortonerror` failure and finally hands the profile's protocol to the
//! summary handlers. The changeset is cleaned up once when the run ends,
//! whichever way it ends.

use crate::config::{Hook, Interpretation, Process, ProjectConfig};
use crate::matcher::ProfileMatcher;
use crate::module::{ModuleManager, Registry};
use crate::protocol::Protocol;
use crate::transaction::Changeset;
use anyhow::Result;
use indexmap::IndexMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// The externally observable outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunResult {
    Success,
    Error,
}

impl RunResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunResult::Success => "success",
            RunResult::Error => "error",
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            RunResult::Success => 0,
            RunResult::Error => 1,
        }
    }
}

impl fmt::Display for RunResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileState {
    Pending,
    Running,
    Completed,
    Aborted,
    Skipped,
}

pub struct ProcessRunner<'a> {
    hook: Hook,
    config: &'a ProjectConfig,
    changeset: Changeset,
    modules: ModuleManager,
    result: RunResult,
    states: IndexMap<String, ProfileState>,
    protocols: Vec<Protocol>,
}

impl<'a> ProcessRunner<'a> {
    pub fn new(hook: Hook, config: &'a ProjectConfig, changeset: Changeset, registry: Registry) -> Self {
        Self {
            hook,
            config,
            changeset,
            modules: ModuleManager::new(registry),
            result: RunResult::Success,
            states: IndexMap::new(),
            protocols: Vec::new(),
        }
    }

    /// Return check and handler failures as errors instead of recording them.
    pub fn debug(mut self, debug: bool) -> Self {
        self.modules.set_debug(debug);
        self
    }

    pub fn hook(&self) -> Hook {
        self.hook
    }

    pub fn result(&self) -> RunResult {
        self.result
    }

    /// Final state of every profile considered by the last run.
    pub fn profile_states(&self) -> &IndexMap<String, ProfileState> {
        &self.states
    }

    /// Protocols of the profiles that ran, in run order.
    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    pub fn changeset(&self) -> &Changeset {
        &self.changeset
    }

    /// Run every profile.
    pub fn run(&mut self) -> Result<RunResult> {
        self.execute(None)
    }

    /// Run only the profile called `name`. An unknown name yields an error
    /// result, not a failure.
    pub fn run_profile(&mut self, name: &str) -> Result<RunResult> {
        self.execute(Some(name))
    }

    fn execute(&mut self, only: Option<&str>) -> Result<RunResult> {
        debug!(hook = %self.hook, "Running hook");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.run_profiles(only)));

        debug!("Cleaning up transaction");
        if let Err(err) = self.changeset.cleanup() {
            warn!(error = ?err, "Failed to clean up transaction: {:#}", err);
        }

        match outcome {
            Ok(Ok(())) => {
                info!(hook = %self.hook, result = %self.result, "Run finished");
                Ok(self.result)
            }
            Ok(Err(err)) => Err(err),
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    fn run_profiles(&mut self, only: Option<&str>) -> Result<()> {
        let config = self.config;
        let profiles = config.profiles();
        let matcher = ProfileMatcher::new(&profiles)?;

        if let Some(name) = only {
            if !profiles.iter().any(|profile| profile.name() == name) {
                error!(profile = %name, "Unable to find profile '{}'", name);
                self.result = RunResult::Error;
                return Ok(());
            }
        }

        for profile in profiles
            .iter()
            .filter(|profile| only.is_none_or(|name| profile.name() == name))
        {
            let name = profile.name();
            self.states.insert(name.to_string(), ProfileState::Pending);
            debug!(profile = %name, "Running profile");

            if let Some(scope) = matcher.scope(name) {
                self.changeset.set_scope(scope.clone());
            }
            if !self.changeset.has_files()? {
                debug!(profile = %name, "Profile skipped, no matching files");
                self.states.insert(name.to_string(), ProfileState::Skipped);
                continue;
            }
            let Some(process) = profile.process(self.hook) else {
                debug!(profile = %name, hook = %self.hook, "Profile skipped, no process");
                self.states.insert(name.to_string(), ProfileState::Skipped);
                continue;
            };

            self.states.insert(name.to_string(), ProfileState::Running);
            let (protocol, state) = self.run_process(&process)?;
            if !protocol.success() {
                self.result = RunResult::Error;
            }
            info!(
                profile = %name,
                checks = protocol.len(),
                errors = protocol.errors(),
                exceptions = protocol.exceptions(),
                ?state,
                "Profile finished"
            );
            self.states.insert(name.to_string(), state);
            self.protocols.push(protocol);
        }
        Ok(())
    }

    fn run_process(&mut self, process: &Process<'_>) -> Result<(Protocol, ProfileState)> {
        let mut protocol = Protocol::new(process.profile());
        let mut state = ProfileState::Completed;

        for check in process.checks()? {
            debug!(check = %check.name, interp = %check.interp, "Starting check");
            let entry = self.modules.run_check(&check, &self.changeset)?;
            debug!(check = %check.name, result = %entry.result, "Check finished");
            protocol.push(entry);

            if let Some(entry) = protocol.last().filter(|entry| entry.has_message()) {
                self.modules.singularize(process, entry, &self.changeset)?;
            }

            if check.interp == Interpretation::AbortOnError && !protocol.success() {
                debug!(
                    profile = %process.profile(),
                    check = %check.name,
                    "Profile aborted after check"
                );
                state = ProfileState::Aborted;
                break;
            }
        }

        self.modules.summarize(process, &protocol, &self.changeset)?;
        Ok((protocol, state))
    }
}
