use std::process::Command;

fn git_describe() -> Option<String> {
    let out = Command::new("git")
        .args(["describe", "--always", "--dirty"])
        .output()
        .ok()?;
    if !out.status.success() {
        return None;
    }
    let desc = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (!desc.is_empty()).then_some(desc)
}

fn main() {
    let build_rev = git_describe().unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=BUILD_REV={}", build_rev);

    // sqlx::migrate! embeds the SQL files at compile time
    println!("cargo:rerun-if-changed=migrations");
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs/heads");
}
