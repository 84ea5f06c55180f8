//! Locates the `mapnik_c_api` shim library and bakes in the engine's default
//! plugin and font directories.
//!
//! Resolution order for linking: `pkg-config` (`mapnik-c-api.pc`), then an
//! explicit `MAPNIK_C_API_LIB_DIR` override, then the linker's default search
//! path. Default directories come from `MAPNIK_PLUGIN_DIR`/`MAPNIK_FONT_DIR`
//! or, failing that, from interrogating `mapnik-config`.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-env-changed=MAPNIK_C_API_LIB_DIR");
    println!("cargo:rerun-if-env-changed=MAPNIK_PLUGIN_DIR");
    println!("cargo:rerun-if-env-changed=MAPNIK_FONT_DIR");

    let probed = pkg_config::Config::new()
        .atleast_version("0.1")
        .probe("mapnik-c-api")
        .is_ok();
    if !probed {
        if let Ok(dir) = env::var("MAPNIK_C_API_LIB_DIR") {
            println!("cargo:rustc-link-search=native={dir}");
        }
        println!("cargo:rustc-link-lib=dylib=mapnik_c_api");
    }

    let plugin_dir = env::var("MAPNIK_PLUGIN_DIR")
        .ok()
        .or_else(|| mapnik_config("--input-plugins"))
        .unwrap_or_default();
    let font_dir = env::var("MAPNIK_FONT_DIR")
        .ok()
        .or_else(|| mapnik_config("--fonts"))
        .unwrap_or_default();
    println!("cargo:rustc-env=MAPNIK_DEFAULT_PLUGIN_DIR={plugin_dir}");
    println!("cargo:rustc-env=MAPNIK_DEFAULT_FONT_DIR={font_dir}");
}

/// Runs `mapnik-config` with a single flag, returning trimmed stdout.
fn mapnik_config(flag: &str) -> Option<String> {
    let out = Command::new("mapnik-config").arg(flag).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let value = String::from_utf8(out.stdout).ok()?.trim().to_owned();
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}
