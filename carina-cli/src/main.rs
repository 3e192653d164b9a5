use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use carina_core::config::{self, ParsedFile};
use carina_core::dependency::{Bindings, resolve_resource, sort_resources};
use carina_core::differ::{create_plan, destroy_plan};
use carina_core::effect::Effect;
use carina_core::interpreter::{ApplyResult, EffectOutcome, Interpreter};
use carina_core::plan::Plan;
use carina_core::provider::{Provider, ProviderError};
use carina_core::resource::{Resource, ResourceId, State, Value};
use carina_core::schema::{AttributeSchema, ResourceSchema, SchemaSet};
use carina_provider_azurerm::services;
use carina_provider_azurerm::{
    AzureRmProvider, Clients, InMemoryManagementClient, PROVIDER_NAME, ProviderConfig,
};
use carina_state::{
    BackendConfig, LockInfo, ResourceState, StateBackend, StateFile, create_backend,
};

/// Where `--offline` keeps the objects of its in-memory Azure
const OFFLINE_STORE: &str = "carina.offline.json";
const OFFLINE_SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

#[derive(Parser)]
#[command(name = "carina")]
#[command(about = "Manage Azure infrastructure declared as JSON", long_about = None)]
struct Cli {
    /// Work against an in-memory Azure persisted in carina.offline.json
    #[arg(long, global = true)]
    offline: bool,

    #[command(flatten)]
    azure: AzureArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Provider settings that override the `provider.azurerm` block
#[derive(Args, Debug, Default)]
struct AzureArgs {
    #[arg(long, global = true, env = "ARM_SUBSCRIPTION_ID")]
    subscription_id: Option<String>,

    #[arg(long, global = true, env = "ARM_TENANT_ID")]
    tenant_id: Option<String>,

    #[arg(long, global = true, env = "ARM_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(long, global = true, env = "ARM_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    #[arg(long, global = true, env = "ARM_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,

    /// Resource Manager endpoint
    #[arg(long, global = true, env = "ARM_ENDPOINT")]
    endpoint: Option<String>,
}

impl AzureArgs {
    fn to_config(&self) -> ProviderConfig {
        ProviderConfig {
            subscription_id: self.subscription_id.clone(),
            tenant_id: self.tenant_id.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            access_token: self.access_token.clone(),
            endpoint: self.endpoint.clone(),
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the configuration file
    Validate {
        /// Path to the configuration file
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Show execution plan without applying changes
    Plan {
        /// Path to the configuration file
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Apply changes to reach the desired state
    Apply {
        /// Path to the configuration file
        #[arg(default_value = "main.json")]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Destroy all resources recorded in the state
    Destroy {
        /// Path to the configuration file
        #[arg(default_value = "main.json")]
        file: PathBuf,

        /// Skip confirmation prompt (auto-approve)
        #[arg(long)]
        auto_approve: bool,
    },
    /// Bring an existing Azure object under management
    Import {
        /// Resource address, e.g. azurerm_dns_zone.main
        address: String,

        /// Azure Resource Manager ID of the object
        id: String,

        /// Path to the configuration file
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// Read the data sources of the configuration and print them
    Read {
        /// Path to the configuration file
        #[arg(default_value = "main.json")]
        file: PathBuf,
    },
    /// List resource types, or show the schema of one
    Schema {
        /// Resource or data source type
        resource_type: Option<String>,
    },
    /// State management commands
    State {
        /// Configuration file naming the state backend
        #[arg(long, default_value = "main.json")]
        file: PathBuf,

        #[command(subcommand)]
        command: StateCommands,
    },
}

#[derive(Subcommand)]
enum StateCommands {
    /// List resources recorded in the state
    List,
    /// Remove a stale state lock
    ForceUnlock {
        /// ID of the lock to remove
        lock_id: String,
    },
}

/// Settings shared by every command that talks to Azure
struct Context {
    offline: bool,
    overrides: ProviderConfig,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let ctx = Context {
        offline: cli.offline,
        overrides: cli.azure.to_config(),
    };

    let result = match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Plan { file } => run_plan(&ctx, &file).await,
        Commands::Apply { file, auto_approve } => run_apply(&ctx, &file, auto_approve).await,
        Commands::Destroy { file, auto_approve } => run_destroy(&ctx, &file, auto_approve).await,
        Commands::Import { address, id, file } => run_import(&ctx, &file, &address, &id).await,
        Commands::Read { file } => run_read(&ctx, &file).await,
        Commands::Schema { resource_type } => run_schema(resource_type.as_deref()),
        Commands::State { file, command } => run_state_command(&file, command).await,
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Provider and, in offline mode, the store standing in for Azure
struct Session {
    interpreter: Interpreter<AzureRmProvider>,
    offline: Option<Arc<InMemoryManagementClient>>,
}

impl Session {
    fn connect(parsed: &ParsedFile, ctx: &Context) -> Result<Self, String> {
        let block = match parsed.provider(PROVIDER_NAME) {
            Some(block) => ProviderConfig::from_block(block)
                .map_err(|e| format!("provider.{}: {}", PROVIDER_NAME, e))?,
            None => ProviderConfig::default(),
        };
        let config = block.merge(ctx.overrides.clone());
        log::debug!("provider settings: {:?}", config);

        if ctx.offline {
            let store = Arc::new(load_offline_store(Path::new(OFFLINE_STORE))?);
            let subscription = config
                .subscription_id
                .clone()
                .unwrap_or_else(|| OFFLINE_SUBSCRIPTION.to_string());
            let clients = Clients::new(store.clone(), subscription)
                .with_tenant_id(config.tenant_id.clone());
            return Ok(Self {
                interpreter: Interpreter::new(AzureRmProvider::new(clients)),
                offline: Some(store),
            });
        }

        let provider = AzureRmProvider::from_config(&config).map_err(|e| e.to_string())?;
        Ok(Self {
            interpreter: Interpreter::new(provider),
            offline: None,
        })
    }

    fn provider(&self) -> &AzureRmProvider {
        self.interpreter.provider()
    }

    /// Persist the offline store; a no-op against Azure
    fn save(&self) -> Result<(), String> {
        match &self.offline {
            Some(store) => save_offline_store(Path::new(OFFLINE_STORE), store),
            None => Ok(()),
        }
    }
}

fn load_offline_store(path: &Path) -> Result<InMemoryManagementClient, String> {
    if !path.exists() {
        return Ok(InMemoryManagementClient::new());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    let objects: Vec<serde_json::Value> = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid offline store {}: {}", path.display(), e))?;
    Ok(InMemoryManagementClient::from_objects(objects))
}

fn save_offline_store(path: &Path, store: &InMemoryManagementClient) -> Result<(), String> {
    let content = serde_json::to_string_pretty(&store.objects()).map_err(|e| e.to_string())?;
    fs::write(path, content).map_err(|e| format!("Failed to write {}: {}", path.display(), e))
}

fn load_config(file: &Path) -> Result<ParsedFile, String> {
    config::load(file).map_err(|e| e.to_string())
}

fn schema_set() -> SchemaSet {
    SchemaSet::new(services::registry().schemas())
}

fn validate_resources(schemas: &SchemaSet, resources: &[Resource]) -> Result<(), String> {
    schemas.validate_resources(resources).map_err(|errors| {
        let mut message = format!("{} validation error(s):", errors.len());
        for error in errors {
            message.push_str(&format!("\n  {} {}", "✗".red(), error));
        }
        message
    })
}

async fn open_backend(parsed: &ParsedFile) -> Result<Box<dyn StateBackend>, String> {
    let config = parsed
        .backend
        .as_ref()
        .map(BackendConfig::from)
        .unwrap_or_else(BackendConfig::local);
    create_backend(&config).await.map_err(|e| e.to_string())
}

async fn release_lock<T>(
    backend: &dyn StateBackend,
    lock: &LockInfo,
    result: Result<T, String>,
) -> Result<T, String> {
    if let Err(e) = backend.release_lock(lock).await {
        log::warn!("failed to release state lock {}: {}", lock.id, e);
        if result.is_ok() {
            return Err(format!("Failed to release state lock: {}", e));
        }
    }
    result
}

/// Attributes of a state as references see them, including `id`
fn binding_attributes(state: &State) -> HashMap<String, Value> {
    let mut attributes = state.attributes.clone();
    if let Some(identifier) = &state.identifier {
        attributes
            .entry("id".to_string())
            .or_insert_with(|| Value::String(identifier.clone()));
    }
    attributes
}

/// Sensitive values are never returned by Azure, keep the recorded ones
fn keep_sensitive(schema: Option<&ResourceSchema>, recorded: &State, mut refreshed: State) -> State {
    let Some(schema) = schema else {
        return refreshed;
    };
    if !refreshed.exists {
        return refreshed;
    }
    for (name, value) in &recorded.attributes {
        if schema.is_sensitive(name) && !refreshed.attributes.contains_key(name) {
            refreshed.attributes.insert(name.clone(), value.clone());
        }
    }
    refreshed
}

/// Read the remote state of every declared resource the state knows about
async fn refresh(
    provider: &AzureRmProvider,
    schemas: &SchemaSet,
    resources: &[Resource],
    state: &StateFile,
) -> Result<HashMap<ResourceId, State>, String> {
    let mut current = HashMap::new();
    for resource in resources.iter().filter(|r| !r.read_only) {
        let Some(recorded) = state.find_resource(&resource.id) else {
            continue;
        };
        let refreshed = provider
            .read(&resource.id, recorded.identifier.as_deref())
            .await
            .map_err(|e| format!("Failed to read state: {}", e))?;
        let refreshed = keep_sensitive(
            schemas.resource(&resource.id.resource_type),
            &recorded.to_state(),
            refreshed,
        );
        current.insert(resource.id.clone(), refreshed);
    }
    Ok(current)
}

struct Planned {
    plan: Plan,
    bindings: Bindings,
    current: HashMap<ResourceId, State>,
}

async fn build_plan(
    provider: &AzureRmProvider,
    schemas: &SchemaSet,
    parsed: &ParsedFile,
    state: &StateFile,
) -> Result<Planned, String> {
    let sorted = sort_resources(&parsed.resources).map_err(|e| e.to_string())?;
    let current = refresh(provider, schemas, &sorted, state).await?;

    let mut bindings = state.bindings();
    for (id, refreshed) in &current {
        if refreshed.exists {
            bindings.insert(id.address(), binding_attributes(refreshed));
        }
    }

    // Data sources are side-effect free, read them now so plans show real values
    for resource in sorted.iter().filter(|r| r.read_only) {
        let resolved = resolve_resource(resource, &bindings);
        if resolved.attributes.values().any(Value::contains_ref) {
            log::debug!("{} depends on values known after apply", resource.binding());
            continue;
        }
        let read = provider
            .read_data_source(&resolved)
            .await
            .map_err(|e| format!("Failed to read {}: {}", resource.binding(), e))?;
        bindings.insert(resource.binding(), binding_attributes(&read));
    }

    let desired: Vec<Resource> = sorted
        .iter()
        .map(|r| {
            if r.read_only {
                r.clone()
            } else {
                resolve_resource(r, &bindings)
            }
        })
        .collect();
    let plan = create_plan(&desired, &current, schemas, &state.managed());

    Ok(Planned {
        plan,
        bindings,
        current,
    })
}

/// Record a provider state, keeping the resource's protection flag
fn record_state(state: &mut StateFile, resource: &State) {
    let protected = state
        .find_resource(&resource.id)
        .is_some_and(|r| r.protected);
    state.upsert_resource(ResourceState::from_state(resource, PROVIDER_NAME).with_protected(protected));
}

/// Bring the state in line with what a refresh found
fn record_refresh(state: &mut StateFile, current: &HashMap<ResourceId, State>) {
    for refreshed in current.values() {
        if refreshed.exists {
            record_state(state, refreshed);
        } else {
            log::info!("{} no longer exists", refreshed.id);
            state.remove_resource(&refreshed.id);
        }
    }
}

fn record_outcomes(
    state: &mut StateFile,
    outcomes: &[Result<EffectOutcome, ProviderError>],
) {
    for outcome in outcomes.iter().flatten() {
        match outcome {
            EffectOutcome::Created { state: resource }
            | EffectOutcome::Updated { state: resource }
            | EffectOutcome::Replaced { state: resource } => record_state(state, resource),
            EffectOutcome::Deleted { id } => {
                state.remove_resource(id);
            }
            EffectOutcome::Read { .. } | EffectOutcome::Skipped { .. } => {}
        }
    }
}

fn confirm(question: &str) -> Result<bool, String> {
    println!("{}", question.yellow().bold());
    println!("  {}", "Only 'yes' will be accepted to approve.".yellow());
    print!("\n  Enter a value: ");
    std::io::stdout().flush().map_err(|e| e.to_string())?;

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .map_err(|e| e.to_string())?;
    println!();
    Ok(input.trim() == "yes")
}

/// Print per-effect results, returning the number of successful changes
fn print_outcomes(plan: &Plan, result: &ApplyResult) -> usize {
    let mut applied = 0;
    for (effect, outcome) in plan.effects().iter().zip(&result.outcomes) {
        match outcome {
            Ok(_) => {
                println!("  {} {}", "✓".green(), effect);
                if effect.is_mutating() {
                    applied += 1;
                }
            }
            Err(e) => println!("  {} {} - {}", "✗".red(), effect, e),
        }
    }
    println!();
    applied
}

fn run_validate(file: &Path) -> Result<(), String> {
    let parsed = load_config(file)?;

    println!("{}", "Validating...".cyan());

    let schemas = schema_set();
    validate_resources(&schemas, &parsed.resources)?;
    let sorted = sort_resources(&parsed.resources).map_err(|e| e.to_string())?;
    if let Some(block) = parsed.provider(PROVIDER_NAME) {
        ProviderConfig::from_block(block)
            .map_err(|e| format!("provider.{}: {}", PROVIDER_NAME, e))?;
    }

    println!(
        "{}",
        format!("✓ {} resources validated successfully.", sorted.len())
            .green()
            .bold()
    );
    for resource in &sorted {
        println!("  • {}", resource.binding());
    }

    Ok(())
}

async fn run_plan(ctx: &Context, file: &Path) -> Result<(), String> {
    let parsed = load_config(file)?;
    let schemas = schema_set();
    validate_resources(&schemas, &parsed.resources)?;

    let backend = open_backend(&parsed).await?;
    let state = backend.read_or_new().await.map_err(|e| e.to_string())?;
    let session = Session::connect(&parsed, ctx)?;

    let planned = build_plan(session.provider(), &schemas, &parsed, &state).await?;
    print_plan(&planned.plan, &schemas);
    Ok(())
}

async fn run_apply(ctx: &Context, file: &Path, auto_approve: bool) -> Result<(), String> {
    let parsed = load_config(file)?;
    let schemas = schema_set();
    validate_resources(&schemas, &parsed.resources)?;

    let backend = open_backend(&parsed).await?;
    let session = Session::connect(&parsed, ctx)?;

    let lock = backend
        .acquire_lock("apply")
        .await
        .map_err(|e| e.to_string())?;
    let result = apply_locked(&session, backend.as_ref(), &schemas, &parsed, auto_approve).await;
    release_lock(backend.as_ref(), &lock, result).await
}

async fn apply_locked(
    session: &Session,
    backend: &dyn StateBackend,
    schemas: &SchemaSet,
    parsed: &ParsedFile,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state = backend.read_or_new().await.map_err(|e| e.to_string())?;
    let mut planned = build_plan(session.provider(), schemas, parsed, &state).await?;

    if planned.plan.has_no_changes() {
        println!("{}", "No changes needed.".green());
        return Ok(());
    }

    print_plan(&planned.plan, schemas);
    println!();

    if !auto_approve && !confirm("Do you want to perform these actions?")? {
        println!("{}", "Apply cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Applying changes...".cyan().bold());
    println!();

    record_refresh(&mut state, &planned.current);
    let result = session
        .interpreter
        .apply(&planned.plan, &mut planned.bindings)
        .await;
    let applied = print_outcomes(&planned.plan, &result);

    record_outcomes(&mut state, &result.outcomes);
    state.increment_serial();
    backend
        .write_state(&state)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))?;
    session.save()?;

    if !result.is_success() {
        return Err(format!(
            "Apply failed. {} succeeded, {} failed.",
            applied, result.failure_count
        ));
    }
    println!(
        "{}",
        format!("Apply complete! {} changes applied.", applied)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_destroy(ctx: &Context, file: &Path, auto_approve: bool) -> Result<(), String> {
    let parsed = load_config(file)?;
    let backend = open_backend(&parsed).await?;
    let session = Session::connect(&parsed, ctx)?;

    let lock = backend
        .acquire_lock("destroy")
        .await
        .map_err(|e| e.to_string())?;
    let result = destroy_locked(&session, backend.as_ref(), auto_approve).await;
    release_lock(backend.as_ref(), &lock, result).await
}

async fn destroy_locked(
    session: &Session,
    backend: &dyn StateBackend,
    auto_approve: bool,
) -> Result<(), String> {
    let mut state = backend.read_or_new().await.map_err(|e| e.to_string())?;

    let mut targets = Vec::new();
    for resource in &state.resources {
        if resource.protected {
            println!(
                "  {} {} is protected, skipping",
                "!".yellow().bold(),
                resource.resource_id()
            );
        } else if let Some(identifier) = &resource.identifier {
            targets.push((resource.resource_id(), identifier.clone()));
        }
    }

    if targets.is_empty() {
        println!("{}", "No resources to destroy.".green());
        return Ok(());
    }

    let plan = destroy_plan(&targets);
    println!("{}", "Destroy Plan:".red().bold());
    println!();
    for effect in plan.effects() {
        println!("  {} {}", "-".red().bold(), effect.resource_id());
    }
    println!();
    println!("Plan: {} to destroy.", plan.effects().len().to_string().red());
    println!();

    if !auto_approve && !confirm("Do you really want to destroy all resources?")? {
        println!("{}", "Destroy cancelled.".yellow());
        return Ok(());
    }

    println!("{}", "Destroying resources...".red().bold());
    println!();

    let mut bindings = Bindings::new();
    let result = session.interpreter.apply(&plan, &mut bindings).await;
    let destroyed = print_outcomes(&plan, &result);

    record_outcomes(&mut state, &result.outcomes);
    state.increment_serial();
    backend
        .write_state(&state)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))?;
    session.save()?;

    if !result.is_success() {
        return Err(format!(
            "Destroy failed. {} succeeded, {} failed.",
            destroyed, result.failure_count
        ));
    }
    println!(
        "{}",
        format!("Destroy complete! {} resources destroyed.", destroyed)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_import(ctx: &Context, file: &Path, address: &str, identifier: &str) -> Result<(), String> {
    let id = ResourceId::from_address(address)
        .ok_or_else(|| format!("Invalid address '{}': expected type.name", address))?;
    let parsed = load_config(file)?;
    if schema_set().resource(&id.resource_type).is_none() {
        return Err(format!("Unknown resource type: {}", id.resource_type));
    }
    if !parsed.managed_resources().any(|r| r.id == id) {
        println!(
            "{} {} is not declared in {}; the next plan will delete it",
            "Warning:".yellow().bold(),
            id,
            file.display()
        );
    }

    let backend = open_backend(&parsed).await?;
    let session = Session::connect(&parsed, ctx)?;

    let lock = backend
        .acquire_lock("import")
        .await
        .map_err(|e| e.to_string())?;
    let result = import_locked(&session, backend.as_ref(), &id, identifier).await;
    release_lock(backend.as_ref(), &lock, result).await
}

async fn import_locked(
    session: &Session,
    backend: &dyn StateBackend,
    id: &ResourceId,
    identifier: &str,
) -> Result<(), String> {
    let mut state = backend.read_or_new().await.map_err(|e| e.to_string())?;
    if state.find_resource(id).is_some() {
        return Err(format!("{} is already managed", id));
    }

    println!("{} {}", "Importing".cyan(), id);
    let imported = session
        .provider()
        .import(id, identifier)
        .await
        .map_err(|e| e.to_string())?;

    record_state(&mut state, &imported);
    state.increment_serial();
    backend
        .write_state(&state)
        .await
        .map_err(|e| format!("Failed to write state: {}", e))?;

    println!(
        "{}",
        format!("Import successful! {} is now managed.", id)
            .green()
            .bold()
    );
    Ok(())
}

async fn run_read(ctx: &Context, file: &Path) -> Result<(), String> {
    let parsed = load_config(file)?;
    let data_sources: Vec<Resource> = parsed.data_sources().cloned().collect();
    if data_sources.is_empty() {
        println!("{}", "No data sources defined in configuration.".yellow());
        return Ok(());
    }

    let schemas = schema_set();
    validate_resources(&schemas, &data_sources)?;

    let backend = open_backend(&parsed).await?;
    let state = backend.read_or_new().await.map_err(|e| e.to_string())?;
    let session = Session::connect(&parsed, ctx)?;

    let mut bindings = state.bindings();
    for resource in sort_resources(&parsed.resources)
        .map_err(|e| e.to_string())?
        .iter()
        .filter(|r| r.read_only)
    {
        let resolved = resolve_resource(resource, &bindings);
        if resolved.attributes.values().any(Value::contains_ref) {
            println!(
                "{} {} depends on resources that are not applied yet",
                "!".yellow().bold(),
                resource.binding()
            );
            continue;
        }

        let read = session
            .provider()
            .read_data_source(&resolved)
            .await
            .map_err(|e| e.to_string())?;

        println!("{}", resource.binding().cyan().bold());
        if let Some(identifier) = &read.identifier {
            println!("    id: {}", identifier);
        }
        let schema = schemas.data_source(&resource.id.resource_type);
        for (key, value) in sorted_attributes(&read.attributes) {
            println!("    {}: {}", key, display_attribute(schema, key, Some(value)));
        }
        println!();

        bindings.insert(resource.binding(), binding_attributes(&read));
    }

    Ok(())
}

fn run_schema(resource_type: Option<&str>) -> Result<(), String> {
    let schemas = schema_set();
    let all = schemas.all();

    let Some(resource_type) = resource_type else {
        println!("{}", "Resources:".cyan().bold());
        for schema in all.iter().filter(|s| !s.data_source) {
            println!("  {}", schema.resource_type);
        }
        println!();
        println!("{}", "Data sources:".cyan().bold());
        for schema in all.iter().filter(|s| s.data_source) {
            println!("  {}", schema.resource_type);
        }
        return Ok(());
    };

    let matching: Vec<&ResourceSchema> = all
        .into_iter()
        .filter(|s| s.resource_type == resource_type)
        .collect();
    if matching.is_empty() {
        return Err(format!("Unknown resource type: {}", resource_type));
    }
    for schema in matching {
        print_schema(schema);
    }
    Ok(())
}

fn print_schema(schema: &ResourceSchema) {
    let kind = if schema.data_source {
        "data source"
    } else {
        "resource"
    };
    println!("{} ({})", schema.resource_type.bold(), kind);
    if let Some(description) = &schema.description {
        println!("  {}", description);
    }

    println!("  {}", "Arguments:".cyan());
    for attribute in schema.arguments() {
        println!("    {}", describe_attribute(attribute));
    }

    let outputs = schema.outputs();
    if !outputs.is_empty() {
        println!("  {}", "Attributes:".cyan());
        for attribute in outputs {
            println!("    {}", describe_attribute(attribute));
        }
    }
    println!();
}

fn describe_attribute(attribute: &AttributeSchema) -> String {
    let mut flags = Vec::new();
    if attribute.required {
        flags.push("required".to_string());
    } else if !attribute.is_output() {
        flags.push("optional".to_string());
    }
    if attribute.computed && !attribute.is_output() {
        flags.push("computed".to_string());
    }
    if attribute.force_new {
        flags.push("forces replacement".to_string());
    }
    if attribute.sensitive {
        flags.push("sensitive".to_string());
    }
    if let Some(default) = &attribute.default {
        flags.push(format!("default {}", format_value(default)));
    }

    let mut line = format!("{}: {}", attribute.name, attribute.attr_type);
    if !flags.is_empty() {
        line.push_str(&format!(" ({})", flags.join(", ")));
    }
    if let Some(description) = &attribute.description {
        line.push_str(&format!(" - {}", description));
    }
    line
}

async fn run_state_command(file: &Path, command: StateCommands) -> Result<(), String> {
    // Without a configuration file the default local backend applies
    let parsed = if file.exists() {
        load_config(file)?
    } else {
        ParsedFile::default()
    };
    let backend = open_backend(&parsed).await?;

    match command {
        StateCommands::List => {
            let Some(state) = backend.read_state().await.map_err(|e| e.to_string())? else {
                println!("{}", "No state found.".yellow());
                return Ok(());
            };
            if state.resources.is_empty() {
                println!("{}", "No resources in state.".yellow());
            }
            for resource in &state.resources {
                let marker = if resource.protected { " (protected)" } else { "" };
                println!(
                    "{}{}  {}",
                    resource.resource_id(),
                    marker.yellow(),
                    resource.identifier.as_deref().unwrap_or("-").dimmed()
                );
            }
            Ok(())
        }
        StateCommands::ForceUnlock { lock_id } => {
            backend
                .force_unlock(&lock_id)
                .await
                .map_err(|e| e.to_string())?;
            println!("{}", format!("Lock {} released.", lock_id).green());
            Ok(())
        }
    }
}

fn print_plan(plan: &Plan, schemas: &SchemaSet) {
    if plan.has_no_changes() {
        println!("{}", "No changes. Infrastructure is up-to-date.".green());
        return;
    }

    println!("{}", "Execution Plan:".cyan().bold());
    println!();

    for effect in plan.effects() {
        print_effect(effect, schemas);
    }

    let summary = plan.summary();
    println!();
    println!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete.",
        summary.create.to_string().green(),
        summary.update.to_string().yellow(),
        summary.replace.to_string().magenta(),
        summary.delete.to_string().red()
    );
}

fn print_effect(effect: &Effect, schemas: &SchemaSet) {
    match effect {
        Effect::Read(resource) => {
            println!("  {} {}", "<=".cyan().bold(), resource.binding());
        }
        Effect::Create(resource) => {
            println!("  {} {}", "+".green().bold(), resource.id);
            let schema = schemas.resource(&resource.id.resource_type);
            for (key, value) in sorted_attributes(&resource.attributes) {
                println!("      {}: {}", key, display_attribute(schema, key, Some(value)));
            }
        }
        Effect::Update {
            id,
            from,
            to,
            changed,
        } => {
            println!("  {} {}", "~".yellow().bold(), id);
            let schema = schemas.resource(&id.resource_type);
            for key in changed {
                println!(
                    "      {}: {} → {}",
                    key,
                    display_attribute(schema, key, from.attributes.get(key)),
                    display_attribute(schema, key, to.attributes.get(key))
                );
            }
        }
        Effect::Replace {
            id,
            from,
            to,
            forced,
        } => {
            println!("  {} {}", "-/+".magenta().bold(), id);
            let schema = schemas.resource(&id.resource_type);
            for key in forced {
                println!(
                    "      {}: {} → {} {}",
                    key,
                    display_attribute(schema, key, from.attributes.get(key)),
                    display_attribute(schema, key, to.attributes.get(key)),
                    "(forces replacement)".magenta()
                );
            }
        }
        Effect::Delete { id, .. } => {
            println!("  {} {}", "-".red().bold(), id);
        }
    }
}

fn sorted_attributes(attributes: &HashMap<String, Value>) -> Vec<(&String, &Value)> {
    let mut sorted: Vec<(&String, &Value)> = attributes.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    sorted
}

fn display_attribute(schema: Option<&ResourceSchema>, key: &str, value: Option<&Value>) -> String {
    match value {
        None => "(none)".dimmed().to_string(),
        Some(_) if schema.is_some_and(|s| s.is_sensitive(key)) => {
            "(sensitive)".dimmed().to_string()
        }
        Some(Value::ResourceRef(..)) => "(known after apply)".dimmed().to_string(),
        Some(value) => format_value(value),
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Int(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(items) => {
            let strs: Vec<_> = items.iter().map(format_value).collect();
            format!("[{}]", strs.join(", "))
        }
        Value::Map(map) => {
            let strs: Vec<_> = sorted_attributes(map)
                .into_iter()
                .map(|(k, v)| format!("{}: {}", k, format_value(v)))
                .collect();
            format!("{{{}}}", strs.join(", "))
        }
        Value::ResourceRef(binding, attr) => format!("{}.{}", binding, attr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TAXII: &str = "azurerm_sentinel_data_connector_threat_intelligence_taxii";

    fn string(s: &str) -> Value {
        Value::String(s.to_string())
    }

    #[test]
    fn format_value_sorts_map_keys() {
        let value = Value::Map(HashMap::from([
            ("b".to_string(), Value::Int(2)),
            ("a".to_string(), Value::List(vec![string("x"), Value::Bool(true)])),
        ]));
        assert_eq!(format_value(&value), r#"{a: ["x", true], b: 2}"#);
    }

    #[test]
    fn sensitive_values_are_masked() {
        let schemas = schema_set();
        let schema = schemas.resource(TAXII);
        let shown = display_attribute(schema, "password", Some(&string("hunter2")));
        assert!(shown.contains("(sensitive)"));
        assert!(!shown.contains("hunter2"));

        let shown = display_attribute(schema, "user_name", Some(&string("guest")));
        assert_eq!(shown, "\"guest\"");
    }

    #[test]
    fn references_show_as_unknown() {
        let reference = Value::ResourceRef("azurerm_dns_zone.main".to_string(), "id".to_string());
        let shown = display_attribute(None, "dns_zone_id", Some(&reference));
        assert!(shown.contains("(known after apply)"));
    }

    #[test]
    fn refresh_keeps_recorded_sensitive_values() {
        let schemas = schema_set();
        let id = ResourceId::new(TAXII, "feed");
        let recorded = State::existing(
            id.clone(),
            HashMap::from([
                ("password".to_string(), string("secret")),
                ("user_name".to_string(), string("old")),
            ]),
        );
        let refreshed = State::existing(
            id.clone(),
            HashMap::from([("user_name".to_string(), string("new"))]),
        );

        let merged = keep_sensitive(schemas.resource(TAXII), &recorded, refreshed);
        assert_eq!(merged.attributes.get("password"), Some(&string("secret")));
        assert_eq!(merged.attributes.get("user_name"), Some(&string("new")));

        let gone = keep_sensitive(schemas.resource(TAXII), &recorded, State::not_found(id));
        assert!(gone.attributes.is_empty());
    }

    #[test]
    fn outcomes_update_the_state() {
        let mut state = StateFile::new();
        state.upsert_resource(
            ResourceState::new("azurerm_dns_zone", "old", PROVIDER_NAME).with_identifier("/zones/old"),
        );
        state.upsert_resource(
            ResourceState::new("azurerm_dns_zone", "main", PROVIDER_NAME)
                .with_identifier("/zones/main")
                .with_protected(true),
        );

        let updated = State::existing(
            ResourceId::new("azurerm_dns_zone", "main"),
            HashMap::from([("name".to_string(), string("example.com"))]),
        )
        .with_identifier("/zones/main");
        let outcomes = vec![
            Ok(EffectOutcome::Updated { state: updated }),
            Ok(EffectOutcome::Deleted {
                id: ResourceId::new("azurerm_dns_zone", "old"),
            }),
            Err(ProviderError::new("boom")),
        ];

        record_outcomes(&mut state, &outcomes);

        assert_eq!(state.resources.len(), 1);
        let main = &state.resources[0];
        assert_eq!(main.name, "main");
        assert!(main.protected);
        assert_eq!(main.attributes.get("name"), Some(&json!("example.com")));
    }

    #[test]
    fn refresh_drops_vanished_resources() {
        let mut state = StateFile::new();
        state.upsert_resource(
            ResourceState::new("azurerm_dns_zone", "main", PROVIDER_NAME).with_identifier("/zones/main"),
        );
        let id = ResourceId::new("azurerm_dns_zone", "main");
        let current = HashMap::from([(id.clone(), State::not_found(id.clone()))]);

        record_refresh(&mut state, &current);
        assert!(state.find_resource(&id).is_none());
    }

    #[test]
    fn binding_attributes_include_the_identifier() {
        let state = State::existing(ResourceId::new("azurerm_dns_zone", "main"), HashMap::new())
            .with_identifier("/zones/main");
        assert_eq!(
            binding_attributes(&state).get("id"),
            Some(&string("/zones/main"))
        );
    }

    #[test]
    fn offline_store_round_trips_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(OFFLINE_STORE);

        assert!(load_offline_store(&path).unwrap().is_empty());

        let store = InMemoryManagementClient::new();
        store.insert(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com",
            json!({ "location": "global" }),
        );
        save_offline_store(&path, &store).unwrap();

        let loaded = load_offline_store(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.contains(
            "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com"
        ));
    }

    #[test]
    fn command_line_overrides_provider_block() {
        let parsed = config::parse(
            r#"{ "provider": { "azurerm": { "subscription_id": "11111111-1111-1111-1111-111111111111", "tenant_id": "t" } } }"#,
        )
        .unwrap();
        let block = ProviderConfig::from_block(parsed.provider(PROVIDER_NAME).unwrap()).unwrap();
        let args = AzureArgs {
            subscription_id: Some("22222222-2222-2222-2222-222222222222".to_string()),
            ..Default::default()
        };

        let merged = block.merge(args.to_config());
        assert_eq!(
            merged.subscription_id.as_deref(),
            Some("22222222-2222-2222-2222-222222222222")
        );
        assert_eq!(merged.tenant_id.as_deref(), Some("t"));
    }

    #[test]
    fn cli_parses_commands() {
        let cli = Cli::try_parse_from(["carina", "--offline", "import", "azurerm_dns_zone.main", "/id"])
            .unwrap();
        assert!(cli.offline);
        match cli.command {
            Commands::Import { address, id, file } => {
                assert_eq!(address, "azurerm_dns_zone.main");
                assert_eq!(id, "/id");
                assert_eq!(file, PathBuf::from("main.json"));
            }
            _ => panic!("expected import"),
        }

        let cli = Cli::try_parse_from(["carina", "state", "force-unlock", "abc"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::State {
                command: StateCommands::ForceUnlock { .. },
                ..
            }
        ));
    }
}
