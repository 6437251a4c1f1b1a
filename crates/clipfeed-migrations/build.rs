use std::fmt::Write as _;
use std::path::Path;

/// Embeds every `migrations/<dialect>/*.sql` file into the binary at
/// compile time, generating a `static` array per dialect so the runtime
/// has zero filesystem dependency (§4.13: "embedded SQL files").
fn main() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let dest = Path::new(&out_dir).join("migrations_generated.rs");

    let mut code = String::new();
    emit_dialect(&mut code, "sqlite", "MIGRATIONS_SQLITE");
    emit_dialect(&mut code, "postgres", "MIGRATIONS_POSTGRES");

    std::fs::write(dest, code).expect("failed to write generated migrations module");
    println!("cargo:rerun-if-changed=migrations");
}

fn emit_dialect(code: &mut String, dir_name: &str, const_name: &str) {
    let dir = Path::new("migrations").join(dir_name);
    let mut entries: Vec<_> = std::fs::read_dir(&dir)
        .unwrap_or_else(|err| panic!("failed to read {}: {err}", dir.display()))
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map(|ext| ext == "sql").unwrap_or(false))
        .collect();
    entries.sort_by_key(|e| e.file_name());

    writeln!(
        code,
        "pub static {const_name}: &[(&str, &str)] = &["
    )
    .unwrap();

    for entry in entries {
        let path = entry.path();
        let version = path
            .file_stem()
            .and_then(|s| s.to_str())
            .expect("migration filename must be valid UTF-8")
            .to_string();
        let path_str = path.to_str().unwrap().replace('\\', "/");
        writeln!(
            code,
            "    (\"{version}\", include_str!(concat!(env!(\"CARGO_MANIFEST_DIR\"), \"/{path_str}\"))),"
        )
        .unwrap();
    }

    writeln!(code, "];").unwrap();
}
