use std::{env, env::VarError};

/// There's no real CLI for the server, so just do quick 'n dirty. Returns true if the server should exit.
pub fn handle_command_line_args() -> bool {
    let args = env::args().skip(1).collect::<Vec<String>>();
    if args.is_empty() {
        return false;
    }
    if args.iter().any(|a| a == "--env") {
        display_envs();
    } else {
        display_readme();
        display_envs();
    }
    true
}

fn display_readme() {
    const README: &str = include_str!("./cli-help.txt");
    println!("\n{README}\n");
}

// Be explicit about which envars to print, so as to avoid accidentally exposing secrets
const DISPLAY_ENVS: [&str; 19] = [
    "RUST_LOG",
    "SFS_HOST",
    "SFS_PORT",
    "SFS_DATABASE_URL",
    "SFS_ORDER_ID_PREFIX",
    "SFS_CURRENCY",
    "SFS_RAZORPAY_KEY_ID",
    "SFS_RAZORPAY_API_URL",
    "SFS_EXPIRY_INTERVAL_MINS",
    "SFS_UNPAID_ORDER_TIMEOUT_MINS",
    "SFS_TRACK_RATE_LIMIT",
    "SFS_PAYMENT_RATE_LIMIT",
    "SFS_DISABLE_WEBHOOK_HMAC",
    "SFS_USE_X_FORWARDED_FOR",
    "SFS_USE_FORWARDED",
    "SFS_ENABLE_EMAIL",
    "SFS_EMAIL_API_URL",
    "SFS_EMAIL_FROM",
    "SFS_WHATSAPP_API_URL",
];

const SECRET_ENVS: [&str; 5] = [
    "SFS_RAZORPAY_KEY_SECRET",
    "SFS_RAZORPAY_WEBHOOK_SECRET",
    "SFS_ADMIN_TOKEN",
    "SFS_EMAIL_API_KEY",
    "SFS_WHATSAPP_TOKEN",
];

fn display_envs() {
    println!("Current environment values (EXCLUDING variables that contain secrets):");
    DISPLAY_ENVS.iter().for_each(|&name| {
        let val = match env::var(name) {
            Ok(s) => s,
            Err(VarError::NotPresent) => "Not set".into(),
            Err(VarError::NotUnicode(s)) => format!("Invalid value: {}", s.to_string_lossy()),
        };
        println!("  {name:<35} {val:<15}");
    });
    println!("Secrets (values are never shown):");
    SECRET_ENVS.iter().for_each(|&name| {
        let val = if env::var_os(name).is_some() { "Set" } else { "Not set" };
        println!("  {name:<35} {val:<15}");
    });
}
