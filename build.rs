use std::env;
use std::fs;
use std::path::Path;

// Variables que la app lee con option_env! (ver src/config.rs)
const KNOWN_KEYS: &[&str] = &[
    "API_BASE_URL",
    "WECHAT_CORP_ID",
    "WECHAT_AGENT_ID",
    "ENABLE_LOGGING",
    "IDENTITY_MAX_RETRIES",
    "LOCATION_MAX_RETRIES",
    "RETRY_DELAY_STEP_MS",
    "SCAN_INTERVAL_MS",
];

fn main() {
    let env_file = Path::new(".env");

    if let Ok(contents) = fs::read_to_string(env_file) {
        println!("cargo:rerun-if-changed=.env");

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                println!("cargo:warning=Línea ignorada en .env: {}", line);
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('"');

            if !KNOWN_KEYS.contains(&key) {
                println!("cargo:warning=Variable desconocida en .env: {}", key);
            }

            // El entorno del proceso tiene prioridad sobre .env
            if env::var(key).is_err() {
                println!("cargo:rustc-env={}={}", key, value);
            }
        }
    } else {
        println!("cargo:warning=Sin archivo .env, se usan los valores por defecto de AppConfig");
    }

    for key in KNOWN_KEYS {
        println!("cargo:rerun-if-env-changed={}", key);
    }
    println!("cargo:rerun-if-changed=build.rs");
}
