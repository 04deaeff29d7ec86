use std::env;
use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-env-changed=CHARLIE_EMBED_ANIMATIONS_PATH");

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR not set");
    let out_path = Path::new(&out_dir).join("charlie_embedded_animations.json");

    let content = match env::var("CHARLIE_EMBED_ANIMATIONS_PATH") {
        Ok(path) => {
            println!("cargo:rerun-if-changed={path}");
            fs::read_to_string(&path).unwrap_or_default()
        }
        Err(_) => String::new(),
    };

    fs::write(out_path, content).expect("failed to write embedded animation metadata");
}
