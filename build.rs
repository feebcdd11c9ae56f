use rustc_version::{Channel, version_meta};

fn has_cfg(name: &str) -> bool {
    std::env::var_os(format!("CARGO_CFG_{}", name.to_uppercase())).is_some()
}

fn make_overridable_cfg(name: &str, logic: impl FnOnce() -> &'static str) -> String {
    let env_name = format!("HELIUM_{}", name.to_uppercase());
    println!("cargo::rerun-if-env-changed={env_name}");
    let value = std::env::var(env_name).unwrap_or_else(|_| logic().to_string());
    println!("cargo::rustc-cfg={name}=\"{value}\"");
    value
}

fn main() {
    let is_nightly = version_meta().unwrap().channel == Channel::Nightly;

    make_overridable_cfg("thread_local", || {
        if is_nightly && has_cfg("target_thread_local") {
            "attribute"
        } else {
            "std"
        }
    });

    // Controls how much of the raise site is recorded in each exception. "file" drops line
    // numbers, "none" drops the location entirely, which keeps source paths out of the binary.
    let source_info = make_overridable_cfg("source_info", || "full");
    assert!(
        matches!(source_info.as_str(), "full" | "file" | "none"),
        "HELIUM_SOURCE_INFO must be one of \"full\", \"file\" or \"none\", got {source_info:?}",
    );
}
