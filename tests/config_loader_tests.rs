use console_gateway::config::{ConfigError, ConfigLoader};
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
    time::Duration,
};
use tempfile::TempDir;

const KEYS: &[&str] = &[
    "CONSOLE_GATEWAY_PROFILE",
    "CONSOLE_GATEWAY_API_BIND_ADDR",
    "CONSOLE_GATEWAY_LOG_LEVEL",
    "CONSOLE_GATEWAY_BACKEND_URL",
    "CONSOLE_GATEWAY_BACKEND_TIMEOUT_MS",
    "CONSOLE_GATEWAY_SESSION_SECRET",
    "CONSOLE_GATEWAY_SESSION_COOKIE_NAME",
    "CONSOLE_GATEWAY_MAX_UPLOAD_BYTES",
    "CONSOLE_GATEWAY_CORS_ALLOWED_ORIGINS",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for key in KEYS {
        unsafe {
            env::remove_var(key);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

fn loader_for(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_no_env_present() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    let cfg = loader_for(&temp_dir).load().expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.backend_url, "http://localhost:3000");
    assert_eq!(cfg.backend_timeout(), Duration::from_millis(30_000));
    assert_eq!(cfg.session_cookie_name, "console_session");
    assert_eq!(cfg.max_upload_bytes, 10 * 1024 * 1024);
    assert!(cfg.cors_allowed_origins.is_empty());
    cfg.bind_addr().expect("default bind addr parses");
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "CONSOLE_GATEWAY_BACKEND_URL=http://backend:3000\nCONSOLE_GATEWAY_API_BIND_ADDR=127.0.0.1:3000\n",
    );
    write_env_file(
        &temp_dir,
        ".env.local",
        "CONSOLE_GATEWAY_PROFILE=test\nCONSOLE_GATEWAY_API_BIND_ADDR=127.0.0.1:4000\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test",
        "CONSOLE_GATEWAY_API_BIND_ADDR=192.168.0.10:5000\nCONSOLE_GATEWAY_BACKEND_TIMEOUT_MS=1500\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "CONSOLE_GATEWAY_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    assert_eq!(cfg.backend_url, "http://backend:3000");
    assert_eq!(cfg.backend_timeout_ms, 1500);
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "CONSOLE_GATEWAY_BACKEND_URL=http://from-file:3000\n",
    );

    unsafe {
        env::set_var("CONSOLE_GATEWAY_BACKEND_URL", "https://api.sekolah.test");
        env::set_var(
            "CONSOLE_GATEWAY_CORS_ALLOWED_ORIGINS",
            "https://admin.sekolah.test, http://localhost:5173 ,",
        );
    }

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with env override");
    assert_eq!(cfg.backend_url, "https://api.sekolah.test");
    assert_eq!(
        cfg.cors_allowed_origins,
        vec![
            "https://admin.sekolah.test".to_string(),
            "http://localhost:5173".to_string()
        ]
    );

    clear_env();
}

#[test]
fn production_profile_without_secret_fails() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "CONSOLE_GATEWAY_PROFILE=production\n");

    let err = loader_for(&temp_dir)
        .load()
        .expect_err("production requires a session secret");
    assert!(matches!(err, ConfigError::MissingSessionSecret));

    unsafe {
        env::set_var(
            "CONSOLE_GATEWAY_SESSION_SECRET",
            "a-long-enough-production-secret",
        );
    }
    let cfg = loader_for(&temp_dir)
        .load()
        .expect("production loads with secret");
    assert_eq!(cfg.profile, "production");

    clear_env();
}

#[test]
fn invalid_numbers_and_addresses_are_reported() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("CONSOLE_GATEWAY_BACKEND_TIMEOUT_MS", "thirty");
    }
    let err = loader_for(&temp_dir)
        .load()
        .expect_err("non-numeric timeout should fail");
    assert!(matches!(err, ConfigError::InvalidNumber { .. }));
    clear_env();

    unsafe {
        env::set_var("CONSOLE_GATEWAY_API_BIND_ADDR", "not-an-addr");
    }
    let err = loader_for(&temp_dir)
        .load()
        .expect_err("invalid bind addr should fail");
    assert!(format!("{}", err).contains("invalid api bind address"));

    clear_env();
}
