use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    if std::path::Path::new(".git/HEAD").exists() {
        println!("cargo:rerun-if-changed=.git/HEAD");
    }

    let built = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    println!("cargo:rustc-env=POCVERIFY_BUILD_TIMESTAMP={built}");

    if let Some(hash) = git_short_hash() {
        println!("cargo:rustc-env=POCVERIFY_GIT_HASH={hash}");
    }
}

/// Short commit hash, or `None` outside a git checkout.
fn git_short_hash() -> Option<String> {
    let output = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let hash = String::from_utf8(output.stdout).ok()?;
    Some(hash.trim().to_string()).filter(|h| !h.is_empty())
}
