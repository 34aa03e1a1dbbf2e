fn main() {
    // Queries are checked at runtime; no database is needed at build time
    println!("cargo:rustc-env=SQLX_OFFLINE=true");
    println!("cargo:rerun-if-changed=migrations");
}
