use std::env;

fn main() {
    let version = env::var("LESION_UPLOAD_VERSION")
        .unwrap_or_else(|_| env::var("CARGO_PKG_VERSION").unwrap());
    println!("cargo:rerun-if-env-changed=LESION_UPLOAD_VERSION");
    println!("cargo:rustc-env=LESION_UPLOAD_VERSION={version}");
}
