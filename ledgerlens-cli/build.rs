use std::env;
use std::path::Path;
use std::process::Command;

const VAR: &str = "LEDGERLENS_BUILD_SHA";

/// `git describe` for the workspace, when it is a checkout.
fn from_git(root: &Path) -> Option<String> {
    let out = Command::new("git")
        .arg("-C")
        .arg(root)
        .args(["describe", "--always", "--dirty", "--abbrev=10"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let id = String::from_utf8(out.stdout).ok()?.trim().to_owned();
    (!id.is_empty()).then_some(id)
}

fn main() {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("..");
    // Packaged source trees have no `.git`; the id may be passed in.
    let id = env::var(VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| from_git(&root))
        .unwrap_or_else(|| "unknown".into());

    println!("cargo:rustc-env={VAR}={id}");
    println!("cargo:rerun-if-env-changed={VAR}");
    println!("cargo:rerun-if-changed=../.git/HEAD");
}
