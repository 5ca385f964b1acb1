//! vaultget - Look up values in Ansible Vault files
//!
//! Commands:
//! - get <FILE> <KEY>: Print the value at KEY in the vault FILE
//! - render <TEMPLATE>: Render a template with AnsibleVault available
//! - keyring:set <KEY> [VALUE]: Store a vault passphrase
//! - keyring:unset <KEY>: Remove a stored passphrase
//! - keyring:list: List keyring keys
//! - encrypt <FILE>: Write a vault file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use vaultget_keyring::{FileStore, KeyringError, LazyStore};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vaultget::{register_ansible_vault, AnsibleVault, Template, TemplateFuncs, Variables};
use vaultget_core::{Config, Paths};

/// Unlocks the keyring without a prompt when set
const KEYRING_PASSPHRASE_ENV: &str = "VAULTGET_KEYRING_PASSPHRASE";

#[derive(Parser)]
#[command(name = "vaultget")]
#[command(about = "Look up values in Ansible Vault files with passphrases from a keyring")]
#[command(version)]
#[command(after_help = r#"PASSPHRASES:
    Each vault's passphrase is stored in the keyring under
    ansible-vault:<path>, where <path> is the vault path relative to the
    working directory:
    - vaultget keyring:set ansible-vault:secrets/prod.yaml

TEMPLATES:
    {{ AnsibleVault "secrets/prod.yaml" "db.password" }}
    {{ AnsibleVault .vault_path "db.password" }}   (with --var vault_path=...)

ENVIRONMENT:
    VAULTGET_KEYRING_PASSPHRASE   unlock the keyring without prompting
    RUST_LOG                      log filter, e.g. RUST_LOG=vaultget=debug"#)]
struct Cli {
    /// Directory relative vault paths are resolved against
    #[arg(short = 'C', long = "work-dir", global = true)]
    work_dir: Option<PathBuf>,

    /// Keyring file (defaults to the data directory)
    #[arg(long, global = true)]
    keyring: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the decrypted value at KEY in the vault FILE
    Get {
        /// Vault file path
        file: String,
        /// Dotted key path (e.g., foo.bar)
        key: String,
        /// Don't print trailing newline (useful for piping)
        #[arg(short = 'n')]
        no_newline: bool,
    },

    /// Render a template string with the AnsibleVault function
    Render {
        /// Template text (reads stdin when omitted)
        template: Option<String>,
        /// Template variable as NAME=VALUE, available as .NAME
        #[arg(long = "var", value_name = "NAME=VALUE")]
        vars: Vec<String>,
    },

    /// Store a vault passphrase in the keyring (prompts if value not provided)
    #[command(name = "keyring:set")]
    KeyringSet {
        /// Keyring key (e.g., ansible-vault:secrets/prod.yaml)
        key: String,
        /// Secret value (omit for secure hidden prompt)
        value: Option<String>,
    },

    /// Remove a key from the keyring
    #[command(name = "keyring:unset")]
    KeyringUnset {
        /// Keyring key to remove
        key: String,
    },

    /// List keyring keys (values hidden)
    #[command(name = "keyring:list")]
    KeyringList {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Encrypt plaintext into an Ansible Vault file
    Encrypt {
        /// Vault file to write
        file: PathBuf,
        /// Plaintext input (reads stdin when omitted)
        #[arg(long = "in")]
        input: Option<PathBuf>,
    },
}

/// Resolved settings shared by the commands
struct Settings {
    work_dir: PathBuf,
    keyring_path: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let paths = Paths::new();
    let config = Config::load(&paths.config_file())?;
    let settings = Settings {
        work_dir: match cli.work_dir {
            Some(dir) => dir,
            None => config.work_dir()?,
        },
        keyring_path: cli
            .keyring
            .unwrap_or_else(|| config.keyring_path(&paths)),
    };
    debug!(
        work_dir = %settings.work_dir.display(),
        keyring = %settings.keyring_path.display(),
        "settings resolved"
    );

    match cli.command {
        Commands::Get {
            file,
            key,
            no_newline,
        } => cmd_get(&settings, &file, &key, no_newline),
        Commands::Render { template, vars } => cmd_render(&settings, template, &vars),
        Commands::KeyringSet { key, value } => cmd_keyring_set(&settings, &key, value),
        Commands::KeyringUnset { key } => cmd_keyring_unset(&settings, &key),
        Commands::KeyringList { json } => cmd_keyring_list(&settings, json),
        Commands::Encrypt { file, input } => cmd_encrypt(&file, input.as_deref()),
    }
}

/// Keyring passphrase from the environment, or a prompt
fn keyring_passphrase() -> std::io::Result<String> {
    match std::env::var(KEYRING_PASSPHRASE_ENV) {
        Ok(p) => Ok(p),
        Err(_) => rpassword::prompt_password("Keyring passphrase: "),
    }
}

/// Open the keyring now, for commands that edit or list it
fn open_keyring(settings: &Settings) -> Result<FileStore> {
    let passphrase = keyring_passphrase().context("Failed to read keyring passphrase")?;

    FileStore::open(&settings.keyring_path, &passphrase).with_context(|| {
        format!(
            "Failed to open keyring {}",
            settings.keyring_path.display()
        )
    })
}

/// The keyring for lookups: unlocked only once a vault passphrase is needed,
/// so argument and missing-file errors never prompt
fn lookup_keyring(
    settings: &Settings,
) -> LazyStore<FileStore, impl Fn() -> Result<FileStore, KeyringError> + Send + Sync + '_> {
    LazyStore::new(move || {
        let passphrase = keyring_passphrase()?;
        FileStore::open(&settings.keyring_path, &passphrase)
    })
}

/// Print a single vault value
fn cmd_get(settings: &Settings, file: &str, key: &str, no_newline: bool) -> Result<()> {
    let store = lookup_keyring(settings);
    let vault = AnsibleVault::new(&store, &settings.work_dir);

    let value = vault.get(file, key)?;

    if no_newline {
        print!("{}", value);
    } else {
        println!("{}", value);
    }

    Ok(())
}

/// Render a template
fn cmd_render(settings: &Settings, template: Option<String>, pairs: &[String]) -> Result<()> {
    for pair in pairs {
        if !pair.contains('=') {
            bail!("Invalid --var {:?}, expected NAME=VALUE", pair);
        }
    }

    let source = match template {
        Some(t) => t,
        None => read_stdin()?,
    };

    let mut vars = Variables::new();
    vars.add_from_pairs(pairs);

    let store = lookup_keyring(settings);
    let vault = AnsibleVault::new(&store, &settings.work_dir);
    let mut funcs = TemplateFuncs::new();
    register_ansible_vault(&mut funcs, &vault);

    let rendered = Template::new(source).render(&vars, &funcs)?;
    print!("{}", rendered);

    Ok(())
}

/// Store a passphrase
fn cmd_keyring_set(settings: &Settings, key: &str, value: Option<String>) -> Result<()> {
    let mut store = open_keyring(settings)?;

    let secret_value = match value {
        Some(v) => v,
        None => {
            let value = rpassword::prompt_password(format!("Value for {}: ", key))
                .context("Failed to read secret value")?;

            if value.is_empty() {
                bail!("Empty value not allowed");
            }

            value
        }
    };

    store.set(key, &secret_value)?;
    store.save()?;

    println!("success: Stored {}", key);

    Ok(())
}

/// Remove a passphrase
fn cmd_keyring_unset(settings: &Settings, key: &str) -> Result<()> {
    let mut store = open_keyring(settings)?;
    store.remove(key)?;
    store.save()?;
    println!("success: Removed {}", key);
    Ok(())
}

/// List keyring keys
fn cmd_keyring_list(settings: &Settings, json: bool) -> Result<()> {
    let store = open_keyring(settings)?;
    let keys = store.keys();

    if json {
        println!("{}", serde_json::to_string_pretty(&keys)?);
        return Ok(());
    }

    if keys.is_empty() {
        println!("Keyring is empty. Add a passphrase with: vaultget keyring:set <key>");
        return Ok(());
    }

    for key in keys {
        println!("  {}", key);
    }

    Ok(())
}

/// Write a new vault file
fn cmd_encrypt(file: &Path, input: Option<&Path>) -> Result<()> {
    if file.exists() {
        bail!("Refusing to overwrite {}", file.display());
    }

    let plaintext = match input {
        Some(path) => std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => read_stdin()?.into_bytes(),
    };

    let passphrase = rpassword::prompt_password("Vault passphrase: ")
        .context("Failed to read vault passphrase")?;
    let confirm = rpassword::prompt_password("Confirm vault passphrase: ")
        .context("Failed to read vault passphrase")?;
    if passphrase != confirm {
        bail!("Passphrases do not match");
    }

    let vault_text = ansible_vault::encrypt(&plaintext, &passphrase)?;
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(file, vault_text)?;

    println!("success: Wrote {}", file.display());

    Ok(())
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    std::io::stdin()
        .read_to_string(&mut buf)
        .context("Failed to read stdin")?;
    Ok(buf)
}
