//! Subcommand implementations
//!
//! Each command writes its result to the supplied writer so the binary
//! prints to stdout and tests capture a buffer.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::ArgMatches;
use epm_config::Config;
use epm_params::{AlwaysYes, Confirm, ParameterRecord, SchemaCatalog, SchemaDef};
use epm_store::{DocumentStore, Fields, RecordId};
use serde_json::Value;
use tracing::debug;

/// Read `path` and pick `class` out of its schema catalog
///
/// # Errors
/// Unreadable file, malformed catalog or unknown class.
pub fn load_schema(path: &Path, class: &str) -> Result<SchemaDef> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading schema file {}", path.display()))?;
    let catalog = SchemaCatalog::from_yaml(&text)
        .with_context(|| format!("parsing schema file {}", path.display()))?;
    catalog.get(class).cloned().ok_or_else(|| {
        anyhow!(
            "class '{class}' not declared in {} (declared: {})",
            path.display(),
            catalog.class_names().join(", ")
        )
    })
}

/// One class of one store, with the confirmation source for this run
///
/// Reconciliation and deletion share the same confirmer, so answers piped
/// in for several prompts are consumed in order.
pub struct Session {
    store: Arc<dyn DocumentStore>,
    confirm: Arc<dyn Confirm>,
    schema: SchemaDef,
}

impl Session {
    /// Bind a store, confirmer and schema
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, confirm: Arc<dyn Confirm>, schema: SchemaDef) -> Self {
        Self {
            store,
            confirm,
            schema,
        }
    }

    fn open(&self, usertag: Option<&str>, overrides: Fields) -> Result<ParameterRecord<SchemaDef>> {
        let mut builder = ParameterRecord::builder(self.schema.clone())
            .overrides(overrides)
            .confirm(Arc::clone(&self.confirm));
        if let Some(tag) = usertag {
            builder = builder.usertag(tag);
        }
        builder
            .open(Arc::clone(&self.store))
            .with_context(|| format!("opening {}", self.schema.class_name))
    }

    /// Print the record id for the given overrides
    ///
    /// # Errors
    /// Record construction and lookup failures.
    pub fn hash(&self, overrides: Fields, usertag: Option<&str>, out: &mut dyn Write) -> Result<RecordId> {
        let record = self.open(usertag, overrides)?;
        let id = record.hash_name()?;
        writeln!(out, "{id}")?;
        Ok(id)
    }

    /// Print every id in the collection
    ///
    /// # Errors
    /// Store failures.
    pub fn ids(&self, out: &mut dyn Write) -> Result<Vec<RecordId>> {
        let ids = self.open(None, Fields::new())?.get_all_ids()?;
        for id in &ids {
            writeln!(out, "{id}")?;
        }
        Ok(ids)
    }

    /// Print one stored document as JSON
    ///
    /// # Errors
    /// [`epm_params::ParamsError::NotFound`] unless exactly one document
    /// matches.
    pub fn show(&self, target: &Target, out: &mut dyn Write) -> Result<Value> {
        let record = self.open(None, Fields::new())?;
        let doc = match target {
            Target::Id(id) => record.from_id(*id)?,
            Target::Usertag(tag) => record.find_by_usertag(tag)?,
        };
        let json = doc.to_json();
        writeln!(out, "{}", serde_json::to_string_pretty(&json)?)?;
        Ok(json)
    }

    /// Delete one document after confirmation
    ///
    /// # Errors
    /// Lookup, confirmation and store failures.
    pub fn delete(&self, target: &Target, out: &mut dyn Write) -> Result<usize> {
        let record = self.open(None, Fields::new())?;
        let deleted = match target {
            Target::Id(id) => record.delete_by_id(*id, self.confirm.as_ref())?,
            Target::Usertag(tag) => record.delete_by_usertag(tag, self.confirm.as_ref())?,
        };
        writeln!(out, "deleted {deleted}")?;
        Ok(deleted)
    }

    /// List duplicate pairs, or delete duplicates when `remove` is set
    ///
    /// Returns the number of pairs found or documents removed.
    ///
    /// # Errors
    /// Store failures.
    pub fn dedup(&self, remove: bool, out: &mut dyn Write) -> Result<usize> {
        let record = self.open(None, Fields::new())?;
        if remove {
            let removed = record.remove_duplicates()?;
            for id in &removed {
                writeln!(out, "removed {id}")?;
            }
            return Ok(removed.len());
        }
        let pairs = record.find_duplicates()?;
        for pair in &pairs {
            writeln!(out, "{} duplicates {}", pair.duplicate, pair.original)?;
        }
        Ok(pairs.len())
    }
}

/// Which record `show` and `delete` act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// By store id
    Id(RecordId),
    /// By usertag
    Usertag(String),
}

impl Target {
    fn from_matches(args: &ArgMatches) -> Result<Self> {
        if let Some(id) = args.get_one::<RecordId>("id") {
            return Ok(Self::Id(*id));
        }
        args.get_one::<String>("usertag")
            .map(|tag| Self::Usertag(tag.clone()))
            .ok_or_else(|| anyhow!("one of --id or --usertag is required"))
    }
}

/// Write the default config file
///
/// # Errors
/// Path resolution and IO failures.
pub fn init_config(path: Option<PathBuf>, out: &mut dyn Write) -> Result<PathBuf> {
    let path = match path {
        Some(path) => path,
        None => Config::default_path()?,
    };
    if Config::write_default(&path)? {
        writeln!(out, "wrote {}", path.display())?;
    } else {
        writeln!(out, "{} already exists, left unchanged", path.display())?;
    }
    Ok(path)
}

/// Execute parsed command-line arguments against `config`
///
/// # Errors
/// Any command failure, with context.
pub fn run(matches: &ArgMatches, config: &Config, out: &mut dyn Write) -> Result<()> {
    let Some((name, args)) = matches.subcommand() else {
        bail!("no command given, see --help");
    };
    if name == "init-config" {
        init_config(matches.get_one::<PathBuf>("config").cloned(), out)?;
        return Ok(());
    }

    let confirm: Arc<dyn Confirm> = if matches.get_flag("yes") {
        Arc::new(AlwaysYes)
    } else {
        Arc::from(config.confirmer())
    };
    let schemas = args
        .get_one::<PathBuf>("schemas")
        .ok_or_else(|| anyhow!("--schemas is required"))?;
    let class = args
        .get_one::<String>("class")
        .ok_or_else(|| anyhow!("--class is required"))?;
    let schema = load_schema(schemas, class)?;
    debug!(command = name, class = %class, "running command");

    let store = config.open_store().context("opening document store")?;
    let session = Session::new(store, confirm, schema);

    match name {
        "hash" => {
            let overrides: Fields = args
                .get_many::<(String, Value)>("set")
                .into_iter()
                .flatten()
                .cloned()
                .collect();
            let usertag = args.get_one::<String>("usertag").map(String::as_str);
            session.hash(overrides, usertag, out)?;
        }
        "ids" => {
            session.ids(out)?;
        }
        "show" => {
            session.show(&Target::from_matches(args)?, out)?;
        }
        "delete" => {
            session.delete(&Target::from_matches(args)?, out)?;
        }
        "dedup" => {
            session.dedup(args.get_flag("remove"), out)?;
        }
        other => bail!("unknown command '{other}'"),
    }
    Ok(())
}
