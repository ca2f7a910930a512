// crates/version-matrix-cli/src/main.rs
// ============================================================================
// Module: Version Matrix CLI Entry Point
// Description: Command dispatcher for configuration authoring and debugging.
// Purpose: Inspect what the engine resolves for each configured API version.
// Dependencies: clap, serde_json, tracing-subscriber, version-matrix crates
// ============================================================================

//! ## Overview
//! The `version-matrix` binary loads a version configuration and answers the
//! questions a test author asks while editing it: is the document valid, which
//! versions and features exist, what schema and payload does a version
//! resolve, which URL does an endpoint render to, does a captured response
//! validate, and which versions would a test declaration run against.
//!
//! Results are written to stdout as pretty JSON. Errors go to stderr and the
//! process exits non-zero. Logs are written to stderr and filtered with the
//! `VERSION_MATRIX_LOG` environment variable.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use serde::Serialize;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use version_matrix_config::ConfigWarning;
use version_matrix_config::ConfigurationStore;
use version_matrix_config::Payload;
use version_matrix_config::UrlParams;
use version_matrix_config::ValidationMode;
use version_matrix_config::lint;
use version_matrix_core::BuildMode;
use version_matrix_core::FeaturePolicy;
use version_matrix_core::FeatureResolver;
use version_matrix_core::SchemaResolver;
use version_matrix_core::TestDataFactory;
use version_matrix_runner::CaseDecision;
use version_matrix_runner::Session;
use version_matrix_runner::VersionedTest;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "VERSION_MATRIX_LOG";
/// Log filter used when `VERSION_MATRIX_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "warn";
/// Maximum size of a response payload file.
const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: CLI Arguments
// ============================================================================

/// Version matrix command line.
#[derive(Parser, Debug)]
#[command(name = "version-matrix", version, about = "Inspect per-version API test configuration")]
struct Cli {
    /// Configuration file; defaults to `VERSION_MATRIX_CONFIG` or
    /// `tests/config/api_versions.yaml`.
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Command to run.
    #[command(subcommand)]
    command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration checks.
    Config {
        /// Selected configuration subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// List configured versions in order.
    Versions,
    /// Show feature availability.
    Features(FeaturesCommand),
    /// Schema resolution.
    Schema {
        /// Selected schema subcommand.
        #[command(subcommand)]
        command: SchemaCommand,
    },
    /// Test data construction.
    Data {
        /// Selected data subcommand.
        #[command(subcommand)]
        command: DataCommand,
    },
    /// Render an endpoint URL.
    Endpoint(EndpointCommand),
    /// Response checks.
    Response {
        /// Selected response subcommand.
        #[command(subcommand)]
        command: ResponseCommand,
    },
    /// Show which versions a test declaration would run against.
    Plan(PlanCommand),
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate the configuration.
    Validate,
    /// Report advisory findings.
    Lint(LintCommand),
}

/// Arguments for `config lint`.
#[derive(Args, Debug)]
struct LintCommand {
    /// Exit non-zero when any finding is reported.
    #[arg(long, action = ArgAction::SetTrue)]
    deny: bool,
}

/// Arguments for `features`.
#[derive(Args, Debug)]
struct FeaturesCommand {
    /// Only list versions supporting this feature.
    #[arg(long, value_name = "FEATURE")]
    feature: Option<String>,
    /// Inherit undeclared features from earlier versions.
    #[arg(long, action = ArgAction::SetTrue)]
    additive: bool,
}

/// Schema subcommands.
#[derive(Subcommand, Debug)]
enum SchemaCommand {
    /// Resolve a schema for a version.
    Resolve(SchemaResolveCommand),
}

/// Arguments for `schema resolve`.
#[derive(Args, Debug)]
struct SchemaResolveCommand {
    /// Version name.
    #[arg(long, value_name = "VERSION")]
    version: String,
    /// Schema key, e.g. `pet_create`.
    #[arg(long, value_name = "SCHEMA")]
    schema: String,
}

/// Data subcommands.
#[derive(Subcommand, Debug)]
enum DataCommand {
    /// Build a request payload.
    Build(DataBuildCommand),
}

/// Arguments for `data build`.
#[derive(Args, Debug)]
struct DataBuildCommand {
    /// Version name.
    #[arg(long, value_name = "VERSION")]
    version: String,
    /// Resource name, e.g. `pet`.
    #[arg(long, value_name = "RESOURCE")]
    resource: String,
    /// Operation name.
    #[arg(long, value_name = "OPERATION", default_value = "create")]
    operation: String,
    /// Field override as `field=json`; non-JSON values are taken as strings.
    #[arg(long = "set", value_name = "FIELD=JSON")]
    set: Vec<String>,
    /// Keep fields outside the schema.
    #[arg(long, action = ArgAction::SetTrue)]
    passthrough: bool,
}

/// Arguments for `endpoint`.
#[derive(Args, Debug)]
struct EndpointCommand {
    /// Version name.
    #[arg(long, value_name = "VERSION")]
    version: String,
    /// Endpoint resource key.
    #[arg(long, value_name = "RESOURCE")]
    resource: String,
    /// Template parameter as `name=value`.
    #[arg(long = "param", value_name = "NAME=VALUE")]
    params: Vec<String>,
    /// Join the path onto the version base URL.
    #[arg(long, action = ArgAction::SetTrue)]
    absolute: bool,
}

/// Response subcommands.
#[derive(Subcommand, Debug)]
enum ResponseCommand {
    /// Validate a captured response body.
    Validate(ResponseValidateCommand),
}

/// Validation mode argument.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    /// Unknown and missing fields both fail.
    Strict,
    /// Only missing required fields fail.
    Lenient,
}

impl From<ModeArg> for ValidationMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::Strict => Self::Strict,
            ModeArg::Lenient => Self::Lenient,
        }
    }
}

/// Arguments for `response validate`.
#[derive(Args, Debug)]
struct ResponseValidateCommand {
    /// Version name.
    #[arg(long, value_name = "VERSION")]
    version: String,
    /// Schema key, e.g. `pet_response`.
    #[arg(long, value_name = "SCHEMA")]
    schema: String,
    /// JSON file holding the response body.
    #[arg(long, value_name = "FILE")]
    payload: PathBuf,
    /// Validation mode; defaults to the configured runner mode.
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,
}

/// Arguments for `plan`.
#[derive(Args, Debug)]
struct PlanCommand {
    /// Test name used in case identifiers.
    #[arg(long, value_name = "NAME", default_value = "plan")]
    name: String,
    /// Required feature; repeatable.
    #[arg(long = "requires", value_name = "FEATURE")]
    requires: Vec<String>,
    /// Earliest applicable version.
    #[arg(long = "min-version", value_name = "VERSION")]
    min_version: Option<String>,
    /// Latest applicable version.
    #[arg(long = "max-version", value_name = "VERSION")]
    max_version: Option<String>,
    /// Restrict to these versions; repeatable.
    #[arg(long = "only", value_name = "VERSION")]
    only: Vec<String>,
    /// Skip deprecated versions.
    #[arg(long = "exclude-deprecated", action = ArgAction::SetTrue)]
    exclude_deprecated: bool,
    /// Inherit undeclared features from earlier versions.
    #[arg(long, action = ArgAction::SetTrue)]
    additive: bool,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Installs the stderr log subscriber.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Executes the command dispatcher.
fn run(cli: Cli) -> CliResult<ExitCode> {
    let session = Session::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load configuration: {err}")))?;
    let store = session.store();
    debug!(versions = store.get_supported_versions().len(), "configuration loaded");
    match cli.command {
        Commands::Config {
            command,
        } => match command {
            ConfigCommand::Validate => command_config_validate(store),
            ConfigCommand::Lint(command) => command_config_lint(store, &command),
        },
        Commands::Versions => command_versions(store),
        Commands::Features(command) => command_features(store, &command),
        Commands::Schema {
            command,
        } => match command {
            SchemaCommand::Resolve(command) => command_schema_resolve(store, &command),
        },
        Commands::Data {
            command,
        } => match command {
            DataCommand::Build(command) => command_data_build(store, &command),
        },
        Commands::Endpoint(command) => command_endpoint(store, &command),
        Commands::Response {
            command,
        } => match command {
            ResponseCommand::Validate(command) => command_response_validate(store, &command),
        },
        Commands::Plan(command) => command_plan(&session, command),
    }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Executes `config validate`.
fn command_config_validate(store: &ConfigurationStore) -> CliResult<ExitCode> {
    let warnings: Vec<String> = store.warnings().iter().map(ConfigWarning::message).collect();
    write_json(&json!({
        "status": "ok",
        "versions": store.get_supported_versions(),
        "warnings": warnings,
    }))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `config lint`.
fn command_config_lint(store: &ConfigurationStore, command: &LintCommand) -> CliResult<ExitCode> {
    let findings = lint(store);
    write_json(&findings)?;
    if command.deny && !findings.is_empty() { Ok(ExitCode::FAILURE) } else { Ok(ExitCode::SUCCESS) }
}

// ============================================================================
// SECTION: Inspection Commands
// ============================================================================

/// Executes `versions`.
fn command_versions(store: &ConfigurationStore) -> CliResult<ExitCode> {
    let versions: Vec<Value> = store
        .descriptors()
        .map(|descriptor| {
            json!({
                "name": descriptor.name,
                "base_url": descriptor.base_url,
                "deprecated": descriptor.deprecated,
                "sunset_date": descriptor.sunset_date.as_ref().map(ToString::to_string),
                "features": descriptor.features,
                "endpoints": descriptor.endpoints,
            })
        })
        .collect();
    write_json(&versions)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `features`.
fn command_features(store: &ConfigurationStore, command: &FeaturesCommand) -> CliResult<ExitCode> {
    let resolver = FeatureResolver::with_policy(store, policy(command.additive));
    match &command.feature {
        Some(feature) => write_json(&json!({
            "feature": feature,
            "versions": resolver.versions_supporting(feature),
        }))?,
        None => write_json(&resolver.feature_matrix())?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Executes `schema resolve`.
fn command_schema_resolve(
    store: &ConfigurationStore,
    command: &SchemaResolveCommand,
) -> CliResult<ExitCode> {
    let schema = SchemaResolver::new(store)
        .resolve(&command.version, &command.schema)
        .map_err(|err| CliError::new(err.to_string()))?;
    write_json(&schema)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `data build`.
fn command_data_build(store: &ConfigurationStore, command: &DataBuildCommand) -> CliResult<ExitCode> {
    let mut overrides = Payload::new();
    for assignment in &command.set {
        let (field, raw) = parse_assignment(assignment)?;
        overrides.insert(field, parse_json_or_string(&raw));
    }
    let mode = if command.passthrough { BuildMode::Passthrough } else { BuildMode::Schema };
    let factory = TestDataFactory::new(store).map_err(|err| CliError::new(err.to_string()))?;
    let payload = factory
        .build_with_mode(&command.version, &command.resource, &command.operation, &overrides, mode)
        .map_err(|err| CliError::new(err.to_string()))?;
    write_json(&payload)?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `endpoint`.
fn command_endpoint(store: &ConfigurationStore, command: &EndpointCommand) -> CliResult<ExitCode> {
    let mut params = UrlParams::new();
    for assignment in &command.params {
        let (name, value) = parse_assignment(assignment)?;
        params.insert(name, value);
    }
    let rendered = if command.absolute {
        store
            .endpoint_absolute_url(&command.version, &command.resource, &params)
            .map(String::from)
    } else {
        store.get_endpoint_url(&command.version, &command.resource, &params)
    };
    let url = rendered.map_err(|err| CliError::new(err.to_string()))?;
    write_json(&json!({
        "version": command.version,
        "resource": command.resource,
        "url": url,
    }))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `response validate`.
fn command_response_validate(
    store: &ConfigurationStore,
    command: &ResponseValidateCommand,
) -> CliResult<ExitCode> {
    let bytes = read_bytes_with_limit(&command.payload, MAX_PAYLOAD_BYTES)?;
    let body: Value = serde_json::from_slice(&bytes).map_err(|err| {
        CliError::new(format!("{} is not valid JSON: {err}", command.payload.display()))
    })?;
    let Some(payload) = body.as_object() else {
        return Err(CliError::new(format!(
            "{} must contain a JSON object",
            command.payload.display()
        )));
    };
    let mode = command.mode.map_or(store.settings().validation_mode, ValidationMode::from);
    let result = SchemaResolver::new(store)
        .validate_response(payload, &command.version, &command.schema, mode)
        .map_err(|err| CliError::new(err.to_string()))?;
    write_json(&result)?;
    if result.is_ok() { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::FAILURE) }
}

/// Executes `plan`.
fn command_plan(session: &Session, command: PlanCommand) -> CliResult<ExitCode> {
    let client = session.http_client().map_err(|err| CliError::new(err.to_string()))?;
    let orchestrator = session
        .orchestrator(&client)
        .map_err(|err| CliError::new(err.to_string()))?
        .with_policy(policy(command.additive));
    let mut test = VersionedTest::new(command.name, |_ctx| Ok(()));
    for feature in command.requires {
        test = test.requires(feature);
    }
    if let Some(min) = command.min_version {
        test = test.min_version(min);
    }
    if let Some(max) = command.max_version {
        test = test.max_version(max);
    }
    if !command.only.is_empty() {
        test = test.only_versions(command.only);
    }
    if command.exclude_deprecated {
        test = test.include_deprecated(false);
    }
    let cases = orchestrator.expand(&test).map_err(|err| CliError::new(err.to_string()))?;
    let rows: Vec<Value> = cases
        .iter()
        .map(|case| match &case.decision {
            CaseDecision::Execute => json!({
                "case": case.id(),
                "version": case.version,
                "decision": "execute",
            }),
            CaseDecision::Skip {
                reason,
                features,
            } => json!({
                "case": case.id(),
                "version": case.version,
                "decision": "skip",
                "reason": reason,
                "features": features,
            }),
        })
        .collect();
    write_json(&rows)?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Maps the `--additive` flag onto a feature policy.
const fn policy(additive: bool) -> FeaturePolicy {
    if additive { FeaturePolicy::Additive } else { FeaturePolicy::Explicit }
}

/// Splits a `name=value` argument.
fn parse_assignment(raw: &str) -> CliResult<(String, String)> {
    let Some((name, value)) = raw.split_once('=') else {
        return Err(CliError::new(format!("expected NAME=VALUE, got {raw}")));
    };
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::new(format!("missing name in {raw}")));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Parses a value as JSON, keeping it as a string when it is not JSON.
fn parse_json_or_string(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

/// Reads a file while enforcing a byte limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> CliResult<Vec<u8>> {
    let io_error =
        |err: std::io::Error| CliError::new(format!("failed to read {}: {err}", path.display()));
    let too_large = || {
        CliError::new(format!("{} exceeds the {max_bytes} byte limit", path.display()))
    };
    let file = File::open(path).map_err(io_error)?;
    let limit = u64::try_from(max_bytes).map_err(|_| too_large())?;
    if file.metadata().map_err(io_error)?.len() > limit {
        return Err(too_large());
    }
    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(io_error)?;
    if bytes.len() > max_bytes {
        return Err(too_large());
    }
    Ok(bytes)
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a value to stdout as pretty JSON.
fn write_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render output: {err}")))?;
    write_stdout_line(&text).map_err(|err| CliError::new(format!("failed to write stdout: {err}")))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(&format!("error: {message}"));
    ExitCode::FAILURE
}
