//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, subcommands, and their execution.

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use futures::future::try_join_all;
use serde::Serialize;
use tabled::{Table, Tabled};
use tracing::debug;
use zeroize::Zeroizing;

use crate::auth::create_auth_provider;
use crate::built_info;
use crate::clipboard::{clear_after, CopyOptions, DetachedProcessScheduler, SystemClipboard};
use crate::config::init::ConfigInitializer;
use crate::config::{load_from_file, Config};
use crate::error::{Result, VaultEditError};
use crate::item::{
    load_from_file as load_item_from_file, write_internet_shortcut, ChecksumStatus, ContentType,
    ItemIdentifier, ItemKind, PropertyChange, SecretKindRegistry, VaultItem,
};
use crate::utils::datetime::{
    format_datetime, is_expired, is_not_yet_active, parse_optional_datetime,
};
use crate::utils::format::{format_table, DisplayUtils, OutputFormat, TableFormatter};
use crate::utils::interactive::InteractivePrompt;
use crate::vault::{AzureKeyVaultClient, ItemService};

#[derive(Parser)]
#[command(name = "kve")]
#[command(about = "Browse and edit Azure Key Vault secrets, certificates and keys")]
#[command(version, author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Output format (defaults to json when output_json is configured)
    #[arg(long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Vault to operate on (defaults to the configured default_vault)
    #[arg(long, global = true)]
    pub vault: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Addresses one item in a vault
#[derive(Args, Debug, Clone)]
pub struct ItemArgs {
    /// Item name, or a full https://{vault}.vault.azure.net/... item URI
    pub name: String,

    /// Item kind
    #[arg(long, short = 'k', value_enum, default_value_t = ItemKind::Secret)]
    pub kind: ItemKind,

    /// Specific version (latest when omitted)
    #[arg(long)]
    pub version: Option<String>,
}

/// Where a new value comes from
#[derive(Args, Debug, Clone, Default)]
pub struct ValueArgs {
    /// Value on the command line (ends up in shell history)
    #[arg(long, conflicts_with_all = ["stdin", "prompt"])]
    pub value: Option<String>,

    /// Read the value from stdin
    #[arg(long, conflicts_with = "prompt")]
    pub stdin: bool,

    /// Prompt for the value without echoing it
    #[arg(long)]
    pub prompt: bool,
}

impl ValueArgs {
    fn is_set(&self) -> bool {
        self.value.is_some() || self.stdin || self.prompt
    }

    fn read(&self, label: &str) -> Result<Option<Zeroizing<String>>> {
        if let Some(value) = &self.value {
            return Ok(Some(Zeroizing::new(value.clone())));
        }
        if self.stdin {
            let mut buffer = Zeroizing::new(String::new());
            io::stdin().read_to_string(&mut buffer)?;
            let trimmed = buffer.trim_end_matches(['\r', '\n']).len();
            buffer.truncate(trimmed);
            return Ok(Some(buffer));
        }
        if self.prompt {
            return InteractivePrompt::new().secret_value(label).map(Some);
        }
        Ok(None)
    }
}

/// Attribute edits shared by `new` and `edit`
#[derive(Args, Debug, Clone, Default)]
pub struct AttributeArgs {
    /// Set a tag (repeatable)
    #[arg(long = "tag", value_name = "KEY=VALUE", value_parser = parse_key_val::<String, String>)]
    pub tags: Vec<(String, String)>,

    /// Expiration as a date (2025-12-31) or duration from now (90d); "none" clears it
    #[arg(long)]
    pub expires: Option<String>,

    /// Start of validity as a date or duration from now; "none" clears it
    #[arg(long)]
    pub not_before: Option<String>,

    /// Content type of the value
    #[arg(long, value_enum)]
    pub content_type: Option<ContentType>,

    /// Secret kind alias (see `kve kinds`)
    #[arg(long, short = 's')]
    pub secret_kind: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List items in a vault
    List {
        /// Item kind to list
        #[arg(long, short = 'k', value_enum, default_value_t = ItemKind::Secret)]
        kind: ItemKind,

        /// List secrets, certificates and keys
        #[arg(long, conflicts_with = "kind")]
        all: bool,
    },
    /// Show an item's properties
    Show {
        #[command(flatten)]
        item: ItemArgs,

        /// Include the value in the output
        #[arg(long)]
        reveal: bool,
    },
    /// Create a new secret
    New {
        /// Secret name
        name: String,

        #[command(flatten)]
        value: ValueArgs,

        #[command(flatten)]
        attributes: AttributeArgs,

        /// Create the secret disabled
        #[arg(long)]
        disabled: bool,
    },
    /// Edit an item's value, tags or attributes
    Edit {
        #[command(flatten)]
        item: ItemArgs,

        #[command(flatten)]
        value: ValueArgs,

        #[command(flatten)]
        attributes: AttributeArgs,

        /// Remove a tag (repeatable)
        #[arg(long = "remove-tag", value_name = "KEY")]
        remove_tags: Vec<String>,

        /// Remove all user tags before applying --tag
        #[arg(long)]
        clear_tags: bool,

        /// Enable the item
        #[arg(long, conflicts_with = "disable")]
        enable: bool,

        /// Disable the item
        #[arg(long)]
        disable: bool,

        /// Save the secret under a new name
        #[arg(long)]
        rename: Option<String>,
    },
    /// Copy an item's value to the clipboard
    Copy {
        #[command(flatten)]
        item: ItemArgs,

        /// Seconds before the clipboard is cleared (0 keeps it)
        #[arg(long)]
        ttl: Option<u64>,

        /// Do not print a notification
        #[arg(long, short = 'q')]
        quiet: bool,
    },
    /// Save an item to a file
    Export {
        #[command(flatten)]
        item: ItemArgs,

        /// Output file or directory (defaults to export_dir or the current directory)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Write the full item with tags and attributes as a .kv-* file
        #[arg(long)]
        full: bool,
    },
    /// Create or update a secret from a file
    Import {
        /// File to import; .kv-secret, .kv-certificate and .kv-key files restore the full item
        path: PathBuf,

        /// Name to save under (defaults to the file name)
        #[arg(long)]
        name: Option<String>,
    },
    /// Print the Azure portal link for an item
    Link {
        #[command(flatten)]
        item: ItemArgs,

        /// Open the link in the browser
        #[arg(long)]
        open: bool,

        /// Write a .url internet shortcut into this directory
        #[arg(long, value_name = "DIR")]
        shortcut: Option<PathBuf>,
    },
    /// Check an item's checksum tag against its value
    Verify {
        #[command(flatten)]
        item: ItemArgs,
    },
    /// Delete an item
    Delete {
        #[command(flatten)]
        item: ItemArgs,

        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// List known secret kinds
    Kinds,
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
    /// Show version and build information
    Version,
    /// Clear the clipboard later if it still holds the copied value
    #[command(hide = true)]
    ClipboardClear {
        /// Seconds to wait
        #[arg(long)]
        after: u64,

        /// Checksum of the copied text
        #[arg(long)]
        checksum: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value (empty clears optional keys)
        value: String,
    },
    /// Show configuration file path
    Path,
    /// Interactive setup
    Init,
}

impl Cli {
    pub async fn execute(self, mut config: Config) -> Result<()> {
        if self.debug {
            config.debug = true;
        }
        if self.no_color {
            config.no_color = true;
        }
        let format = self.format.unwrap_or(if config.output_json {
            OutputFormat::Json
        } else {
            OutputFormat::Table
        });

        // Commands that never touch a vault
        match self.command {
            Commands::Completions { shell } => return execute_completions(shell),
            Commands::Version => return execute_version_command(),
            Commands::ClipboardClear { after, checksum } => {
                return execute_clipboard_clear(after, &checksum).await
            }
            Commands::Config { command } => {
                return execute_config_command(command, config, format).await
            }
            _ => {}
        }

        let ctx = CommandContext::new(config, format, self.vault)?;
        match self.command {
            Commands::List { kind, all } => execute_list(&ctx, kind, all).await,
            Commands::Show { item, reveal } => execute_show(&ctx, &item, reveal).await,
            Commands::New {
                name,
                value,
                attributes,
                disabled,
            } => execute_new(&ctx, &name, &value, &attributes, disabled).await,
            Commands::Edit {
                item,
                value,
                attributes,
                remove_tags,
                clear_tags,
                enable,
                disable,
                rename,
            } => {
                let enabled = match (enable, disable) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                };
                let edits = ItemEdits {
                    value,
                    attributes,
                    remove_tags,
                    clear_tags,
                    enabled,
                    rename,
                };
                execute_edit(&ctx, &item, edits).await
            }
            Commands::Copy { item, ttl, quiet } => execute_copy(&ctx, &item, ttl, quiet).await,
            Commands::Export { item, output, full } => {
                execute_export(&ctx, &item, output, full).await
            }
            Commands::Import { path, name } => execute_import(&ctx, &path, name).await,
            Commands::Link {
                item,
                open,
                shortcut,
            } => execute_link(&ctx, &item, open, shortcut),
            Commands::Verify { item } => execute_verify(&ctx, &item).await,
            Commands::Delete { item, force } => execute_delete(&ctx, &item, force).await,
            Commands::Kinds => execute_kinds(&ctx),
            Commands::Completions { .. }
            | Commands::Version
            | Commands::ClipboardClear { .. }
            | Commands::Config { .. } => Ok(()),
        }
    }
}

/// Resolved settings shared by vault commands
struct CommandContext {
    config: Config,
    format: OutputFormat,
    vault: Option<String>,
    display: DisplayUtils,
    registry: Arc<SecretKindRegistry>,
}

impl CommandContext {
    fn new(config: Config, format: OutputFormat, vault: Option<String>) -> Result<Self> {
        let registry = Arc::new(SecretKindRegistry::load(
            config.secret_kinds_path.as_deref(),
        )?);
        Ok(Self {
            display: DisplayUtils::new(config.no_color),
            config,
            format,
            vault,
            registry,
        })
    }

    fn vault_name(&self) -> Result<String> {
        self.config.resolve_vault_name(self.vault.clone())
    }

    fn identifier(&self, item: &ItemArgs) -> Result<ItemIdentifier> {
        if item.name.starts_with("https://") {
            let mut identifier = ItemIdentifier::parse(&item.name)?;
            if let Some(version) = &item.version {
                identifier = identifier.with_version(version.clone());
            }
            return Ok(identifier);
        }

        let mut identifier = ItemIdentifier::new(self.vault_name()?, item.kind, &item.name);
        if let Some(version) = &item.version {
            identifier = identifier.with_version(version.clone());
        }
        Ok(identifier)
    }

    fn service(&self) -> Result<ItemService<AzureKeyVaultClient>> {
        let provider = create_auth_provider(&self.config)?;
        let client = AzureKeyVaultClient::new(provider)?;
        Ok(ItemService::new(client, Arc::clone(&self.registry)))
    }

    fn secret_kind(&self, alias: &str) -> Result<crate::item::SecretKind> {
        self.registry.get(alias).cloned().ok_or_else(|| {
            VaultEditError::invalid_argument(format!(
                "Unknown secret kind '{}'. Run 'kve kinds' to see the available kinds",
                alias
            ))
        })
    }
}

/// Whether the vault would hand out the item right now
fn validity_status(
    enabled: Option<bool>,
    not_before: Option<chrono::DateTime<chrono::Utc>>,
    expires: Option<chrono::DateTime<chrono::Utc>>,
) -> &'static str {
    if enabled == Some(false) {
        "disabled"
    } else if is_expired(expires) {
        "expired"
    } else if is_not_yet_active(not_before) {
        "not yet active"
    } else {
        "active"
    }
}

/// Structured form of `show` output
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemDetails {
    id: String,
    kind: ItemKind,
    name: String,
    content_type: Option<String>,
    secret_kind: String,
    enabled: Option<bool>,
    status: &'static str,
    expires: Option<String>,
    not_before: Option<String>,
    created: Option<String>,
    updated: Option<String>,
    checksum: String,
    tags: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

impl ItemDetails {
    fn from_item(item: &VaultItem, reveal: bool) -> Self {
        let rfc3339 = |date: Option<chrono::DateTime<chrono::Utc>>| date.map(|d| d.to_rfc3339());
        Self {
            id: item.identifier().identifier(),
            kind: item.kind(),
            name: item.name().unwrap_or_default().to_string(),
            content_type: item.content_type().mime().map(str::to_string),
            secret_kind: item.secret_kind().alias().to_string(),
            enabled: item.enabled(),
            status: validity_status(item.enabled(), item.not_before(), item.expires()),
            expires: rfc3339(item.expires()),
            not_before: rfc3339(item.not_before()),
            created: rfc3339(item.created()),
            updated: rfc3339(item.updated()),
            checksum: item.checksum_status().to_string(),
            tags: item.tags().to_map(),
            value: if reveal {
                item.value().map(str::to_string)
            } else {
                None
            },
        }
    }
}

#[derive(Tabled)]
struct KeyValueRow {
    #[tabled(rename = "Setting")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn print_structured<T: Serialize>(format: OutputFormat, data: &T) -> Result<bool> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
            Ok(true)
        }
        OutputFormat::Yaml => {
            let yaml = serde_yaml::to_string(data)
                .map_err(|e| VaultEditError::serialization(e.to_string()))?;
            print!("{}", yaml);
            Ok(true)
        }
        OutputFormat::Table | OutputFormat::Raw => Ok(false),
    }
}

async fn execute_list(ctx: &CommandContext, kind: ItemKind, all: bool) -> Result<()> {
    let vault_name = ctx.vault_name()?;
    let service = ctx.service()?;
    let kinds: Vec<ItemKind> = if all { ItemKind::ALL.to_vec() } else { vec![kind] };

    let listings =
        try_join_all(kinds.into_iter().map(|kind| service.list(&vault_name, kind))).await?;
    let items: Vec<_> = listings.into_iter().flatten().collect();
    debug!("{} item(s) in {}", items.len(), vault_name);

    let formatter = TableFormatter::new(ctx.format, ctx.config.no_color);
    if ctx.format == OutputFormat::Table {
        ctx.display.print_header(&format!("Vault: {}", vault_name));
    }
    println!("{}", formatter.format_table(&items)?);
    Ok(())
}

async fn execute_show(ctx: &CommandContext, args: &ItemArgs, reveal: bool) -> Result<()> {
    let service = ctx.service()?;
    let item = service.load(&ctx.identifier(args)?).await?;
    let details = ItemDetails::from_item(&item, reveal);

    if print_structured(ctx.format, &details)? {
        return Ok(());
    }

    let mut tags: Vec<String> = item
        .tags()
        .iter()
        .map(|tag| format!("{}={}", tag.name, tag.value))
        .collect();
    tags.extend(
        item.custom_tags()
            .into_iter()
            .map(|tag| format!("{}={} (computed)", tag.name, tag.value)),
    );

    let mut pairs = vec![
        ("Name", details.name.clone()),
        ("Kind", item.kind().display_name().to_string()),
        ("Id", details.id.clone()),
        ("Content Type", item.content_type().to_string()),
        ("Secret Kind", details.secret_kind.clone()),
        (
            "Enabled",
            item.enabled()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Status", details.status.to_string()),
        ("Expires", format_datetime(item.expires())),
        ("Not Before", format_datetime(item.not_before())),
        ("Created", format_datetime(item.created())),
        ("Updated", format_datetime(item.updated())),
        ("Checksum", details.checksum.clone()),
        ("Tags", tags.join(", ")),
    ];
    if reveal {
        pairs.push(("Value", item.value().unwrap_or_default().to_string()));
    }

    println!("{}", ctx.display.format_key_value_pairs(&pairs));
    match details.status {
        "expired" => ctx.display.print_warning("The item has expired"),
        "not yet active" => ctx.display.print_warning("The item is not valid yet"),
        _ => {}
    }
    if let ChecksumStatus::Mismatch { .. } = item.checksum_status() {
        ctx.display
            .print_warning("The value was changed outside of kve since it was last saved");
    }
    Ok(())
}

fn apply_attributes(
    ctx: &CommandContext,
    item: &mut VaultItem,
    attributes: &AttributeArgs,
) -> Result<bool> {
    let mut unobserved_change = false;

    if let Some(alias) = &attributes.secret_kind {
        if item.kind() != ItemKind::Secret {
            return Err(VaultEditError::invalid_argument(
                "secret kinds only apply to secrets",
            ));
        }
        let kind = ctx.secret_kind(alias)?;
        if &kind != item.secret_kind() {
            item.set_secret_kind(kind);
            unobserved_change = true;
        }
    }

    if let Some(content_type) = attributes.content_type {
        if item.kind() != ItemKind::Secret {
            return Err(VaultEditError::invalid_argument(
                "the content type of certificates and keys is fixed",
            ));
        }
        if content_type != item.content_type() {
            item.set_content_type(content_type);
            unobserved_change = true;
        }
    }

    for (key, value) in &attributes.tags {
        item.tags_mut().set(key.clone(), value.clone())?;
    }

    if let Some(expires) = &attributes.expires {
        item.set_expires(parse_optional_datetime(expires)?);
    }
    if let Some(not_before) = &attributes.not_before {
        item.set_not_before(parse_optional_datetime(not_before)?);
    }

    Ok(unobserved_change)
}

async fn execute_new(
    ctx: &CommandContext,
    name: &str,
    value: &ValueArgs,
    attributes: &AttributeArgs,
    disabled: bool,
) -> Result<()> {
    let vault_name = ctx.vault_name()?;
    let secret_kind = match &attributes.secret_kind {
        Some(alias) => ctx.secret_kind(alias)?,
        None => ctx.registry.default_kind(),
    };
    let content_type = attributes.content_type.unwrap_or_default();

    let mut item = VaultItem::new_secret(&vault_name, name, secret_kind, content_type);
    apply_attributes(ctx, &mut item, attributes)?;
    if disabled {
        item.set_enabled(Some(false));
    }

    let input = if value.is_set() {
        value.read(&format!("Value for '{}'", name))?
    } else {
        let prompt = if item.secret_kind().value_template().is_empty() {
            format!("Value for '{}'", name)
        } else {
            format!(
                "Value for '{}' (empty keeps template '{}')",
                name,
                item.secret_kind().value_template()
            )
        };
        InteractivePrompt::new().secret_value(&prompt).map(Some)?
    };
    if let Some(input) = input.filter(|v| !v.is_empty()) {
        item.set_value(input.as_str());
    }

    if item.value().map_or(true, str::is_empty) {
        return Err(VaultEditError::invalid_item_value("Secret value cannot be empty"));
    }

    let service = ctx.service()?;
    service.save(&mut item).await?;

    ctx.display.print_success(&format!(
        "Created {} '{}' in vault '{}'",
        item.kind().display_name().to_lowercase(),
        name,
        vault_name
    ));
    if let Some(version) = &item.identifier().version {
        println!("   Version: {}", version);
    }
    Ok(())
}

/// Edits requested by `kve edit`
struct ItemEdits {
    value: ValueArgs,
    attributes: AttributeArgs,
    remove_tags: Vec<String>,
    clear_tags: bool,
    enabled: Option<bool>,
    rename: Option<String>,
}

async fn execute_edit(ctx: &CommandContext, args: &ItemArgs, edits: ItemEdits) -> Result<()> {
    let service = ctx.service()?;
    let mut item = service.load(&ctx.identifier(args)?).await?;

    let changed: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&changed);
    let subscription = item.subscribe(Arc::new(move |change: &PropertyChange| {
        debug!("{}", change);
        if let Ok(mut names) = sink.lock() {
            if !names.contains(&change.property_name()) {
                names.push(change.property_name());
            }
        }
    }));

    if let Some(new_name) = &edits.rename {
        if item.kind() != ItemKind::Secret {
            return Err(VaultEditError::invalid_argument(
                "only secrets can be saved under a new name",
            ));
        }
        item.set_name(new_name.clone());
    }

    if edits.clear_tags {
        item.tags_mut().clear();
    }
    for key in &edits.remove_tags {
        if !item.tags_mut().remove(key) {
            ctx.display
                .print_warning(&format!("Tag '{}' is not set", key));
        }
    }

    let unobserved_change = apply_attributes(ctx, &mut item, &edits.attributes)?;

    if let Some(enabled) = edits.enabled {
        item.set_enabled(Some(enabled));
    }

    if let Some(value) = edits.value.read(&format!("New value for '{}'", args.name))? {
        if item.kind() != ItemKind::Secret {
            return Err(VaultEditError::invalid_argument(
                "only secret values can be edited; certificates and keys accept attributes and tags",
            ));
        }
        item.set_value(value.as_str());
    }

    item.unsubscribe(subscription);
    if !item.is_dirty() && !unobserved_change {
        ctx.display.print_info("No changes to save");
        return Ok(());
    }

    service.save(&mut item).await?;

    let changed = changed
        .lock()
        .map(|names| names.join(", "))
        .unwrap_or_default();
    ctx.display.print_success(&format!(
        "Saved {} '{}'",
        item.kind().display_name().to_lowercase(),
        item.name().unwrap_or_default()
    ));
    if !changed.is_empty() {
        println!("   Changed: {}", changed);
    }
    Ok(())
}

async fn execute_copy(
    ctx: &CommandContext,
    args: &ItemArgs,
    ttl: Option<u64>,
    quiet: bool,
) -> Result<()> {
    let service = ctx.service()?;
    let item = service.load(&ctx.identifier(args)?).await?;

    let options = CopyOptions {
        ttl: Duration::from_secs(ttl.unwrap_or(ctx.config.clipboard_timeout)),
        ..CopyOptions::default()
    };
    let mut clipboard = SystemClipboard::new()?;
    let scheduler = DetachedProcessScheduler::current()?;

    match item.copy_to_clipboard(&mut clipboard, &scheduler, &options, !quiet)? {
        Some(message) => {
            ctx.display.print_success(&message);
            if !options.ttl.is_zero() {
                println!("   Clipboard clears in {} seconds", options.ttl.as_secs());
            }
        }
        None if !quiet => ctx.display.print_warning(&format!(
            "'{}' has no value to copy",
            item.name().unwrap_or_default()
        )),
        None => {}
    }
    Ok(())
}

/// Destination for an export; directories get the item's own file name
fn export_path(output: Option<PathBuf>, export_dir: Option<&Path>, file_name: &str) -> PathBuf {
    match output {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path,
        None => export_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(file_name),
    }
}

async fn execute_export(
    ctx: &CommandContext,
    args: &ItemArgs,
    output: Option<PathBuf>,
    full: bool,
) -> Result<()> {
    let service = ctx.service()?;
    let item = service.load(&ctx.identifier(args)?).await?;

    let file_name = if full {
        format!(
            "{}{}",
            item.name().unwrap_or_default(),
            item.key_vault_file_extension()
        )
    } else {
        item.file_name()
    };
    let mut path = export_path(output, ctx.config.export_dir.as_deref(), &file_name);
    if full && ItemKind::from_key_vault_file_extension(&path.to_string_lossy()).is_none() {
        let mut with_extension = path.into_os_string();
        with_extension.push(item.key_vault_file_extension());
        path = PathBuf::from(with_extension);
    }

    item.save_to_file(&path)?;
    ctx.display
        .print_success(&format!("Exported to {}", path.display()));
    Ok(())
}

async fn execute_import(ctx: &CommandContext, path: &Path, name: Option<String>) -> Result<()> {
    let vault_name = ctx.vault_name()?;
    let mut item = load_item_from_file(path, &vault_name, &ctx.registry)?;
    if let Some(name) = name {
        item.set_name(name);
    }

    let service = ctx.service()?;
    service.save(&mut item).await?;
    ctx.display.print_success(&format!(
        "Imported {} as {} '{}'",
        path.display(),
        item.kind().display_name().to_lowercase(),
        item.name().unwrap_or_default()
    ));
    Ok(())
}

fn execute_link(
    ctx: &CommandContext,
    args: &ItemArgs,
    open: bool,
    shortcut: Option<PathBuf>,
) -> Result<()> {
    let identifier = ctx.identifier(args)?;
    let item = VaultItem::new(identifier, &HashMap::new(), None, None, None, None);
    let link = item.identifier().vault_link();
    println!("{}", link);

    if let Some(dir) = shortcut {
        let path = write_internet_shortcut(&item, &dir)?;
        ctx.display
            .print_success(&format!("Shortcut written to {}", path.display()));
    }
    if open {
        opener::open(&link)
            .map_err(|e| VaultEditError::unknown(format!("Failed to open browser: {}", e)))?;
    }
    Ok(())
}

async fn execute_verify(ctx: &CommandContext, args: &ItemArgs) -> Result<()> {
    let service = ctx.service()?;
    match service.verify(&ctx.identifier(args)?).await? {
        ChecksumStatus::Match => {
            ctx.display.print_success("Checksum matches the stored value");
            Ok(())
        }
        ChecksumStatus::Missing => {
            ctx.display
                .print_warning("No checksum tag; the item was not saved by kve");
            Ok(())
        }
        ChecksumStatus::Mismatch { stored, computed } => {
            ctx.display.print_error(&format!(
                "Checksum mismatch: stored {} but value hashes to {}",
                stored, computed
            ));
            Err(VaultEditError::invalid_item_value(format!(
                "'{}' was modified outside of kve",
                args.name
            )))
        }
    }
}

async fn execute_delete(ctx: &CommandContext, args: &ItemArgs, force: bool) -> Result<()> {
    let identifier = ctx.identifier(args)?;

    if !force {
        let confirmed = InteractivePrompt::new().confirm(
            &format!(
                "Delete {} '{}' from vault '{}'?",
                identifier.kind, identifier.name, identifier.vault_name
            ),
            false,
        )?;
        if !confirmed {
            println!("Delete operation cancelled.");
            return Ok(());
        }
    }

    ctx.service()?.delete(&identifier).await?;
    ctx.display.print_success(&format!(
        "Deleted {} '{}'",
        identifier.kind, identifier.name
    ));
    Ok(())
}

fn execute_kinds(ctx: &CommandContext) -> Result<()> {
    let definitions: Vec<_> = ctx.registry.iter().map(|kind| kind.definition()).collect();
    if print_structured(ctx.format, &definitions)? {
        return Ok(());
    }
    println!(
        "{}",
        format_table(ctx.registry.to_table(), ctx.config.no_color)
    );
    Ok(())
}

async fn execute_config_command(
    command: ConfigCommands,
    config: Config,
    format: OutputFormat,
) -> Result<()> {
    match command {
        ConfigCommands::Show => execute_config_show(&config, format),
        ConfigCommands::Set { key, value } => execute_config_set(&key, &value, &config).await,
        ConfigCommands::Path => {
            println!("{}", Config::get_config_path()?.display());
            Ok(())
        }
        ConfigCommands::Init => {
            ConfigInitializer::new()
                .run_interactive_setup(&config)
                .await?;
            Ok(())
        }
    }
}

fn execute_config_show(config: &Config, format: OutputFormat) -> Result<()> {
    if print_structured(format, config)? {
        return Ok(());
    }

    let rows: Vec<KeyValueRow> = config
        .entries()
        .into_iter()
        .map(|(key, value)| KeyValueRow {
            key: key.to_string(),
            value: if value.is_empty() {
                "<not set>".to_string()
            } else {
                value
            },
        })
        .collect();
    println!("{}", format_table(Table::new(rows), config.no_color));
    Ok(())
}

/// Edits the file's settings, not the environment-merged ones
async fn execute_config_set(key: &str, value: &str, current: &Config) -> Result<()> {
    let path = Config::get_config_path()?;
    let mut file_config = if path.exists() {
        load_from_file(&path).await?
    } else {
        Config::default()
    };

    file_config.set_value(key, value)?;
    file_config.save().await?;

    DisplayUtils::new(current.no_color)
        .print_success(&format!("Set {} in {}", key, path.display()));
    Ok(())
}

fn execute_completions(shell: Shell) -> Result<()> {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "kve", &mut io::stdout());
    Ok(())
}

fn execute_version_command() -> Result<()> {
    println!("kve {}", built_info::PKG_VERSION);
    println!("Target:     {}", built_info::TARGET);
    println!("Profile:    {}", built_info::PROFILE);
    println!("Built:      {}", built_info::BUILT_TIME_UTC);
    println!("Rustc:      {}", built_info::RUSTC_VERSION);
    if let Some(hash) = built_info::GIT_COMMIT_HASH_SHORT {
        let dirty = if built_info::GIT_DIRTY == Some(true) {
            " (dirty)"
        } else {
            ""
        };
        println!("Git:        {}{}", hash, dirty);
    }
    Ok(())
}

async fn execute_clipboard_clear(after: u64, checksum: &str) -> Result<()> {
    let mut clipboard = SystemClipboard::new()?;
    let outcome = clear_after(&mut clipboard, Duration::from_secs(after), checksum).await?;
    debug!("scheduled clipboard clear finished: {:?}", outcome);
    Ok(())
}

/// Parse a single key-value pair
fn parse_key_val<T, U>(
    s: &str,
) -> std::result::Result<(T, U), Box<dyn std::error::Error + Send + Sync + 'static>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    U: std::str::FromStr,
    U::Err: std::error::Error + Send + Sync + 'static,
{
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    Ok((s[..pos].parse()?, s[pos + 1..].parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_key_val() {
        let (key, value): (String, String) = parse_key_val("owner=ops=team").unwrap();
        assert_eq!(key, "owner");
        assert_eq!(value, "ops=team");
        assert!(parse_key_val::<String, String>("owner").is_err());
    }

    #[test]
    fn test_edit_arguments() {
        let cli = Cli::try_parse_from([
            "kve", "edit", "db", "--tag", "owner=ops", "--remove-tag", "team", "--disable",
            "--expires", "90d", "--vault", "contoso",
        ])
        .unwrap();

        assert_eq!(cli.vault.as_deref(), Some("contoso"));
        match cli.command {
            Commands::Edit {
                item,
                attributes,
                remove_tags,
                enable,
                disable,
                ..
            } => {
                assert_eq!(item.name, "db");
                assert_eq!(item.kind, ItemKind::Secret);
                assert_eq!(attributes.tags, vec![("owner".to_string(), "ops".to_string())]);
                assert_eq!(attributes.expires.as_deref(), Some("90d"));
                assert_eq!(remove_tags, vec!["team".to_string()]);
                assert!(!enable);
                assert!(disable);
            }
            _ => panic!("expected edit command"),
        }
    }

    #[test]
    fn test_value_sources_conflict() {
        assert!(Cli::try_parse_from(["kve", "new", "db", "--value", "x", "--stdin"]).is_err());
        assert!(Cli::try_parse_from(["kve", "edit", "db", "--enable", "--disable"]).is_err());
    }

    #[test]
    fn test_clipboard_clear_is_hidden_but_parses() {
        let cli = Cli::try_parse_from([
            "kve",
            "clipboard-clear",
            "--after",
            "30",
            "--checksum",
            "abc",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::ClipboardClear { after: 30, .. }
        ));

        let help = Cli::command().render_help().to_string();
        assert!(!help.contains("clipboard-clear"));
    }

    #[test]
    fn test_identifier_accepts_full_uri() {
        let ctx = CommandContext::new(Config::default(), OutputFormat::Table, None).unwrap();
        let args = ItemArgs {
            name: "https://contoso.vault.azure.net/certificates/web/v3".to_string(),
            kind: ItemKind::Secret,
            version: None,
        };
        let identifier = ctx.identifier(&args).unwrap();
        assert_eq!(identifier.kind, ItemKind::Certificate);
        assert_eq!(identifier.version.as_deref(), Some("v3"));

        let args = ItemArgs {
            name: "db".to_string(),
            kind: ItemKind::Secret,
            version: None,
        };
        assert!(matches!(
            ctx.identifier(&args),
            Err(VaultEditError::ConfigError(_))
        ));
    }

    #[test]
    fn test_validity_status() {
        let past = chrono::Utc::now() - chrono::Duration::days(1);
        let future = chrono::Utc::now() + chrono::Duration::days(1);

        assert_eq!(validity_status(None, None, None), "active");
        assert_eq!(validity_status(Some(true), Some(past), Some(future)), "active");
        assert_eq!(validity_status(Some(true), None, Some(past)), "expired");
        assert_eq!(validity_status(Some(true), Some(future), None), "not yet active");
        assert_eq!(validity_status(Some(false), None, Some(past)), "disabled");
    }

    #[test]
    fn test_export_path_resolution() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            export_path(Some(dir.path().to_path_buf()), None, "db.txt"),
            dir.path().join("db.txt")
        );
        assert_eq!(
            export_path(None, Some(Path::new("/exports")), "db.txt"),
            PathBuf::from("/exports/db.txt")
        );
        assert_eq!(
            export_path(Some(PathBuf::from("out.bin")), None, "db.txt"),
            PathBuf::from("out.bin")
        );
    }
}
