use regex::Regex;
use std::process::Command;

fn main() {
    let mut build = get_version().unwrap_or(format!("{} (Cargo)", env!("CARGO_PKG_VERSION")));

    if std::env::var("GITHUB_ACTIONS").is_ok() {
        build = format!("{} (CI)", &build)
    }

    println!("cargo:rustc-env=WSUI_BUILD={}", &build);
}

fn get_version() -> Result<String, Box<dyn std::error::Error>> {
    let re = Regex::new(r"v([0-9.]+)-([0-9]+)-g([a-f0-9]+)").unwrap(); // safe
    let output = Command::new("git")
        .args(["describe", "--tags", "--abbrev=7"])
        .output()?;

    if !output.status.success() {
        return Err("not a git checkout".into());
    }

    let output_str = String::from_utf8(output.stdout)?;
    let version = re.replace_all(output_str.trim(), "${1}.r${2}.${3}").into_owned();
    if version.is_empty() {
        return Err("no tags".into());
    }

    Ok(version)
}
