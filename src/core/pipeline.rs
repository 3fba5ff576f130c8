//! Deploy pipeline orchestration.
//!
//! One run walks a fixed sequence of stages:
//!
//! ```text
//! ResolvingCredentials -> CheckingCache -> (Fetching | skip) -> WritingConfig
//!     -> Invoking -> ListingWorkdir -> Done
//! ```
//!
//! Any stage error moves straight to `Failed`; later stages never run. Both
//! terminal states produce an [`Envelope`], so callers always get a result.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache;
use crate::credentials::{self, EnvLookup, InvocationParams, RemoteReference};
use crate::defaults::Defaults;
use crate::envelope::Envelope;
use crate::error::Error;
use crate::git::ArtifactFetcher;
use crate::invoker::{self, DeployInvocation, ToolOutput, ToolRun};
use crate::lock::FetchLock;
use crate::runner::CommandRunner;
use crate::utils::io;
use crate::wskprops;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ResolvingCredentials,
    CheckingCache,
    Fetching,
    WritingConfig,
    Invoking,
    ListingWorkdir,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ResolvingCredentials => "resolving_credentials",
            Stage::CheckingCache => "checking_cache",
            Stage::Fetching => "fetching",
            Stage::WritingConfig => "writing_config",
            Stage::Invoking => "invoking",
            Stage::ListingWorkdir => "listing_workdir",
        }
    }
}

/// State threaded from stage to stage.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineContext {
    pub repo_dir: PathBuf,
    pub wsk_api_host: Option<String>,
    #[serde(skip_serializing)]
    pub wsk_auth: Option<String>,
    pub env_data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploySuccess {
    #[serde(flatten)]
    pub context: PipelineContext,
    /// False when an existing working copy was reused.
    pub fetched: bool,
    pub output: ToolOutput,
    /// Deploy tool stderr from a successful run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: Error,
}

/// Trace and terminal outcome of one run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Stages entered, in order. A skipped fetch does not appear.
    pub stages: Vec<Stage>,
    pub outcome: Result<DeploySuccess, StageFailure>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn into_envelope(self) -> Envelope {
        match &self.outcome {
            Ok(success) => Envelope::success(success),
            Err(failure) => Envelope::failure(&failure.error, Some(failure.stage.as_str())),
        }
    }
}

enum State {
    ResolvingCredentials,
    CheckingCache {
        remote: RemoteReference,
        context: PipelineContext,
    },
    Fetching {
        remote: RemoteReference,
        context: PipelineContext,
        lock: FetchLock,
    },
    WritingConfig {
        context: PipelineContext,
        fetched: bool,
    },
    Invoking {
        context: PipelineContext,
        fetched: bool,
    },
    ListingWorkdir {
        context: PipelineContext,
        fetched: bool,
        run: ToolRun,
    },
    Done(DeploySuccess),
    Failed(StageFailure),
}

impl State {
    fn stage(&self) -> Option<Stage> {
        match self {
            State::ResolvingCredentials => Some(Stage::ResolvingCredentials),
            State::CheckingCache { .. } => Some(Stage::CheckingCache),
            State::Fetching { .. } => Some(Stage::Fetching),
            State::WritingConfig { .. } => Some(Stage::WritingConfig),
            State::Invoking { .. } => Some(Stage::Invoking),
            State::ListingWorkdir { .. } => Some(Stage::ListingWorkdir),
            State::Done(_) | State::Failed(_) => None,
        }
    }
}

fn fail(stage: Stage, error: Error) -> State {
    State::Failed(StageFailure { stage, error })
}

/// Runs the deploy pipeline against injected collaborators.
pub struct Pipeline<'a> {
    defaults: &'a Defaults,
    fetcher: &'a dyn ArtifactFetcher,
    runner: &'a dyn CommandRunner,
    env: &'a dyn EnvLookup,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        defaults: &'a Defaults,
        fetcher: &'a dyn ArtifactFetcher,
        runner: &'a dyn CommandRunner,
        env: &'a dyn EnvLookup,
    ) -> Self {
        Self {
            defaults,
            fetcher,
            runner,
            env,
        }
    }

    /// Run every stage and return the trace plus terminal outcome.
    pub fn run(&self, params: &InvocationParams) -> PipelineReport {
        let mut stages = Vec::new();
        let mut state = State::ResolvingCredentials;

        let outcome = loop {
            if let Some(stage) = state.stage() {
                stages.push(stage);
            }
            state = match state {
                State::Done(success) => break Ok(success),
                State::Failed(failure) => break Err(failure),
                other => self.step(other, params),
            };
        };

        if let Err(failure) = &outcome {
            eprintln!(
                "[pipeline] ERROR during {}: {}",
                failure.stage.as_str(),
                failure.error
            );
        }

        PipelineReport { stages, outcome }
    }

    /// Run the pipeline and wrap the outcome in an [`Envelope`].
    pub fn invoke(&self, params: &InvocationParams) -> Envelope {
        self.run(params).into_envelope()
    }

    /// Like [`Pipeline::invoke`], decoding the params from raw JSON first.
    pub fn invoke_json(&self, params: Value) -> Envelope {
        match serde_json::from_value::<InvocationParams>(params) {
            Ok(params) => self.invoke(&params),
            Err(e) => Envelope::failure(
                &Error::validation_invalid_json(e, Some("parse params".to_string())),
                Some(Stage::ResolvingCredentials.as_str()),
            ),
        }
    }

    fn step(&self, state: State, params: &InvocationParams) -> State {
        match state {
            State::ResolvingCredentials => self.resolve_credentials(params),
            State::CheckingCache { remote, context } => self.check_cache(remote, context),
            State::Fetching {
                remote,
                context,
                lock,
            } => {
                let result = self.fetcher.fetch(&remote, &context.repo_dir);
                drop(lock);
                match result {
                    Ok(()) => State::WritingConfig {
                        context,
                        fetched: true,
                    },
                    Err(e) => fail(Stage::Fetching, e),
                }
            }
            State::WritingConfig { context, fetched } => {
                let platform = credentials::PlatformCredentials {
                    wsk_api_host: context.wsk_api_host.clone(),
                    wsk_auth: context.wsk_auth.clone(),
                };
                match wskprops::write(
                    self.runner,
                    &self.defaults.wskprops_path(),
                    &platform,
                    &self.defaults.namespace,
                ) {
                    Ok(()) => State::Invoking { context, fetched },
                    Err(e) => fail(Stage::WritingConfig, e),
                }
            }
            State::Invoking { context, fetched } => {
                let tool = self.defaults.deploy_tool();
                let work_dir = self.defaults.work_dir();
                let invocation = DeployInvocation {
                    tool: &tool,
                    work_dir: &work_dir,
                    manifest: context.repo_dir.join(&self.defaults.manifest_path),
                    env: &context.env_data,
                    confirm_input: &self.defaults.confirm_input,
                };
                match invoker::deploy(self.runner, &invocation) {
                    Ok(run) => State::ListingWorkdir {
                        context,
                        fetched,
                        run,
                    },
                    Err(e) => fail(Stage::Invoking, e),
                }
            }
            State::ListingWorkdir {
                context,
                fetched,
                run,
            } => {
                let workdir = self.list_workdir();
                State::Done(DeploySuccess {
                    context,
                    fetched,
                    output: run.output,
                    stderr: run.stderr,
                    workdir,
                })
            }
            terminal @ (State::Done(_) | State::Failed(_)) => terminal,
        }
    }

    fn resolve_credentials(&self, params: &InvocationParams) -> State {
        let remote = match credentials::remote_reference(params) {
            Ok(remote) => remote,
            Err(e) => return fail(Stage::ResolvingCredentials, e),
        };

        let platform = credentials::resolve_platform(
            params,
            self.env,
            &self.defaults.api_host_env,
            &self.defaults.api_key_env,
        );

        let repo_dir = match cache::artifact_dir(&self.defaults.artifacts_root(), remote.repo()) {
            Ok(dir) => dir,
            Err(e) => return fail(Stage::ResolvingCredentials, e),
        };

        State::CheckingCache {
            remote,
            context: PipelineContext {
                repo_dir,
                wsk_api_host: platform.wsk_api_host,
                wsk_auth: platform.wsk_auth,
                env_data: params.env_data.clone().unwrap_or_default(),
            },
        }
    }

    fn check_cache(&self, remote: RemoteReference, context: PipelineContext) -> State {
        let timeout = Duration::from_secs(self.defaults.lock_timeout_secs);
        let lock = match FetchLock::acquire(&context.repo_dir, timeout) {
            Ok(lock) => lock,
            Err(e) => return fail(Stage::CheckingCache, e),
        };

        match cache::check(&context.repo_dir) {
            Ok(status) if status.needs_fetch() => State::Fetching {
                remote,
                context,
                lock,
            },
            Ok(_) => State::WritingConfig {
                context,
                fetched: false,
            },
            Err(e) => fail(Stage::CheckingCache, e),
        }
    }

    /// Informational only; a listing failure never fails the run.
    fn list_workdir(&self) -> Option<Vec<String>> {
        let work_dir = self.defaults.work_dir();
        match io::list_dir(&work_dir, "list work dir") {
            Ok(entries) => {
                eprintln!("[pipeline] ls {}: {}", work_dir.display(), entries.join(" "));
                Some(entries)
            }
            Err(e) => {
                eprintln!("[pipeline] Error listing {}: {}", work_dir.display(), e);
                None
            }
        }
    }
}
