//! End-to-end lookups through `AnsibleVault` and template rendering

use vaultget_keyring::{CredentialStore, KeyringError, LazyStore, MemoryStore};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use vaultget::{
    register_ansible_vault, store_key, AnsibleVault, ErrorKind, Template, TemplateFuncs,
    Variables,
};

const VAULT_PASS: &str = "MyVaultPass123!";
const VAULT_CONTENT: &str = "
foo:
  bar: my_secret
  blank: \"\"
ports:
  8080: web
";

struct Fixture {
    dir: tempfile::TempDir,
    store: MemoryStore,
}

/// `foo/vault.yaml` has its passphrase provisioned, `foo/vault2.yaml` does not
fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("foo")).unwrap();

    for name in ["foo/vault.yaml", "foo/vault2.yaml"] {
        let text = ansible_vault::encrypt(VAULT_CONTENT.as_bytes(), VAULT_PASS).unwrap();
        fs::write(dir.path().join(name), text).unwrap();
    }

    let store = MemoryStore::new().with(store_key("foo/vault.yaml", dir.path()), VAULT_PASS);
    Fixture { dir, store }
}

fn render(work_dir: &Path, store: &dyn CredentialStore, template: &str) -> Result<String, String> {
    let vault = AnsibleVault::new(store, work_dir);
    let mut funcs = TemplateFuncs::new();
    register_ansible_vault(&mut funcs, &vault);

    let mut vars = Variables::new();
    vars.set("vault-path", "foo/vault.yaml");
    vars.set("missing-vault-path", "foo/no-vault.yaml");
    vars.set("unprovisioned-vault-path", "foo/vault2.yaml");

    Template::new(template)
        .render(&vars, &funcs)
        .map_err(|e| e.to_string())
}

#[test]
fn valid_lookup() {
    let f = fixture();
    let vault = AnsibleVault::new(&f.store, f.dir.path());
    assert_eq!(vault.get("foo/vault.yaml", "foo.bar").unwrap(), "my_secret");
}

#[test]
fn numeric_mapping_key() {
    let f = fixture();
    let vault = AnsibleVault::new(&f.store, f.dir.path());
    assert_eq!(vault.get("foo/vault.yaml", "ports.8080").unwrap(), "web");
}

#[test]
fn template_cases() {
    let f = fixture();

    struct Case {
        name: &'static str,
        template: &'static str,
        expected: Result<&'static str, &'static str>,
    }

    let cases = [
        Case {
            name: "valid",
            template: r#"{{ AnsibleVault .vault_path "foo.bar" }}"#,
            expected: Ok("my_secret"),
        },
        Case {
            name: "key miss in vault",
            template: r#"{{ AnsibleVault .vault_path "foo.buz" }}"#,
            expected: Err("error on reading ansible vault file \"foo/vault.yaml\": can't find key \"foo.buz\" in the given ansible vault"),
        },
        Case {
            name: "file not found",
            template: r#"{{ AnsibleVault .missing_vault_path "foo.bar" }}"#,
            expected: Err("can't find ansible vault file \"foo/no-vault.yaml\""),
        },
        Case {
            name: "keyring no vault passphrase",
            template: r#"{{ AnsibleVault .unprovisioned_vault_path "foo.bar" }}"#,
            expected: Err("AnsibleVault: can't decrypt ansible vault file \"foo/vault2.yaml\". Add an Ansible Vault file passphrase with"),
        },
        Case {
            name: "wrong call",
            template: r#"{{ AnsibleVault "1" "2" "3" }}"#,
            expected: Err("wrong number of args for AnsibleVault: want 2 got 3"),
        },
    ];

    for case in cases {
        let result = render(f.dir.path(), &f.store, case.template);
        match case.expected {
            Ok(value) => assert_eq!(result.as_deref(), Ok(value), "case {}", case.name),
            Err(fragment) => {
                let message = result.expect_err(case.name);
                assert!(
                    message.contains(fragment),
                    "case {}: {:?} does not contain {:?}",
                    case.name,
                    message,
                    fragment
                );
            }
        }
    }
}

#[test]
fn command_line_rendering() {
    let f = fixture();
    let out = render(
        f.dir.path(),
        &f.store,
        r#"psql --password={{ AnsibleVault "./foo/vault.yaml" "foo.bar" }} -h db"#,
    )
    .unwrap();
    assert_eq!(out, "psql --password=my_secret -h db");
}

#[test]
fn credential_hint_names_exact_key() {
    let f = fixture();
    let vault = AnsibleVault::new(&f.store, f.dir.path());

    let err = vault.get("foo/vault2.yaml", "foo.bar").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialNotFound);
    assert!(err
        .to_string()
        .contains("`vaultget keyring:set ansible-vault:foo/vault2.yaml`"));
}

#[test]
fn absolute_path_uses_same_key() {
    let f = fixture();
    let vault = AnsibleVault::new(&f.store, f.dir.path());

    let absolute = f.dir.path().join("foo/vault.yaml");
    let absolute = absolute.to_str().unwrap();
    assert_eq!(vault.get(absolute, "foo.bar").unwrap(), "my_secret");
}

#[test]
fn wrong_passphrase_differs_from_missing_key() {
    let f = fixture();
    let store = MemoryStore::new().with("ansible-vault:foo/vault.yaml", "not the passphrase");
    let vault = AnsibleVault::new(&store, f.dir.path());

    let decrypt_err = vault.get("foo/vault.yaml", "foo.bar").unwrap_err();
    assert_eq!(decrypt_err.kind(), ErrorKind::DecryptionFailed);

    let good = AnsibleVault::new(&f.store, f.dir.path());
    let missing_err = good.get("foo/vault.yaml", "foo.buz").unwrap_err();
    assert_eq!(missing_err.kind(), ErrorKind::KeyNotFound);
}

#[test]
fn empty_value_is_reported_as_missing() {
    let f = fixture();
    let vault = AnsibleVault::new(&f.store, f.dir.path());

    let blank = vault.get("foo/vault.yaml", "foo.blank").unwrap_err();
    let absent = vault.get("foo/vault.yaml", "foo.absent").unwrap_err();
    assert_eq!(blank.kind(), ErrorKind::KeyNotFound);
    assert_eq!(absent.kind(), ErrorKind::KeyNotFound);
    assert!(blank.to_string().contains("\"foo.blank\""));
}

#[derive(Default)]
struct CountingStore {
    reads: AtomicUsize,
}

impl CredentialStore for CountingStore {
    fn get(&self, key: &str) -> Result<String, KeyringError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Err(KeyringError::NotFound(key.to_string()))
    }
}

#[test]
fn arity_checked_before_any_io() {
    let store = CountingStore::default();
    // the working directory doesn't exist, so any file access would fail differently
    let result = render(
        Path::new("/nonexistent/work/dir"),
        &store,
        r#"{{ AnsibleVault "only-one" }}"#,
    );

    assert_eq!(
        result.unwrap_err(),
        "error calling AnsibleVault: wrong number of args for AnsibleVault: want 2 got 1"
    );
    assert_eq!(store.reads.load(Ordering::SeqCst), 0);
}

#[test]
fn missing_file_never_reads_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = CountingStore::default();
    let vault = AnsibleVault::new(&store, dir.path());

    let err = vault.get("foo/no-vault.yaml", "foo.bar").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
    assert_eq!(store.reads.load(Ordering::SeqCst), 0);
}

#[test]
fn lookup_error_survives_template_wrapping() {
    let f = fixture();
    let vault = AnsibleVault::new(&f.store, f.dir.path());
    let mut funcs = TemplateFuncs::new();
    register_ansible_vault(&mut funcs, &vault);

    let err = Template::new(r#"{{ AnsibleVault "foo/vault.yaml" "nope" }}"#)
        .render(&Variables::new(), &funcs)
        .unwrap_err();
    assert_eq!(err.lookup_error().map(|e| e.kind()), Some(ErrorKind::KeyNotFound));
}

#[test]
fn lazy_keyring_opens_only_when_a_passphrase_is_needed() {
    let f = fixture();
    let opens = AtomicUsize::new(0);
    let store = LazyStore::new(|| {
        opens.fetch_add(1, Ordering::SeqCst);
        Ok(f.store.clone())
    });

    let err = render(f.dir.path(), &store, r#"{{ AnsibleVault "1" "2" "3" }}"#).unwrap_err();
    assert!(err.ends_with("want 2 got 3"));
    let vault = AnsibleVault::new(&store, f.dir.path());
    let err = vault.get("nope.yaml", "a.b").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FileNotFound);
    assert_eq!(opens.load(Ordering::SeqCst), 0);

    assert_eq!(vault.get("foo/vault.yaml", "foo.bar").unwrap(), "my_secret");
    assert_eq!(vault.get("foo/vault.yaml", "ports.8080").unwrap(), "web");
    assert_eq!(opens.load(Ordering::SeqCst), 1);
}

#[test]
fn locked_keyring_does_not_mask_missing_file() {
    let f = fixture();
    let store = LazyStore::new(|| -> Result<MemoryStore, KeyringError> {
        Err(KeyringError::Decryption("no such identity".into()))
    });
    let vault = AnsibleVault::new(&store, f.dir.path());

    let missing = vault.get("nope.yaml", "a.b").unwrap_err();
    assert_eq!(missing.to_string(), "can't find ansible vault file \"nope.yaml\"");

    let locked = vault.get("foo/vault.yaml", "foo.bar").unwrap_err();
    assert_eq!(locked.kind(), ErrorKind::StoreError);
}
