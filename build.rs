use std::process::Command;

/// `AVATAR_VERSION` = "<crate version>+<git revision>" (git無しなら crate version のみ)
fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");

    let pkg_version = std::env::var("CARGO_PKG_VERSION").unwrap_or_default();
    let revision = Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).trim().to_string())
        .filter(|s| !s.is_empty());

    let version = match revision {
        Some(rev) => format!("{}+{}", pkg_version, rev),
        None => pkg_version,
    };
    println!("cargo:rustc-env=AVATAR_VERSION={}", version);
}
