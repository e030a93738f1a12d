//! CLI tool to inspect profiles and assign roles.
//!
//! Usage:
//!   cargo run --bin manage-profiles -- list [--limit <n>]
//!   cargo run --bin manage-profiles -- show --uid <uid>
//!   cargo run --bin manage-profiles -- set-role --uid <uid> --role <user|admin|moderator>

use std::env;
use std::sync::Arc;

use rolegate_lib::config::{Config, ProfileStoreKind};
use rolegate_lib::db::{DbPool, PgProfileStore};
use rolegate_lib::models::UserProfile;
use rolegate_lib::services::{AuthEventBroadcaster, ProfileService};

const DEFAULT_LIMIT: u64 = 100;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let command = &args[1];
    if matches!(command.as_str(), "help" | "--help" | "-h") {
        print_usage();
        return;
    }

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    if config.profile_store == ProfileStoreKind::Memory {
        eprintln!("ROLEGATE_PROFILE_STORE=memory has no persistent profiles to manage.");
        std::process::exit(1);
    }

    let pool = match DbPool::new(&config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error connecting to database: {}", e);
            std::process::exit(1);
        }
    };
    let profiles = ProfileService::new(
        Arc::new(PgProfileStore::new(pool)),
        AuthEventBroadcaster::new(),
    );

    match command.as_str() {
        "list" | "ls" => {
            let limit = match flag_value(&args, "--limit", "-l") {
                Some(raw) => raw.parse().unwrap_or_else(|_| {
                    eprintln!("Error: --limit must be a number");
                    std::process::exit(1);
                }),
                None => DEFAULT_LIMIT,
            };
            list_profiles(&profiles, limit).await;
        }
        "show" => {
            let uid = required_flag(&args, "--uid", "-u");
            show_profile(&profiles, &uid).await;
        }
        "set-role" => {
            let uid = required_flag(&args, "--uid", "-u");
            let role = required_flag(&args, "--role", "-r");
            set_role(&profiles, &uid, &role).await;
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn flag_value(args: &[String], long: &str, short: &str) -> Option<String> {
    let mut i = 2;
    while i < args.len() {
        if (args[i] == long || args[i] == short) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

fn required_flag(args: &[String], long: &str, short: &str) -> String {
    flag_value(args, long, short).unwrap_or_else(|| {
        eprintln!("Error: {} is required", long);
        std::process::exit(1);
    })
}

fn truncate(value: Option<&str>, width: usize) -> String {
    match value {
        Some(v) if v.chars().count() > width => {
            format!("{}...", v.chars().take(width - 3).collect::<String>())
        }
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

async fn list_profiles(profiles: &ProfileService, limit: u64) {
    let list = match profiles.list_profiles(limit).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error listing profiles: {}", e);
            std::process::exit(1);
        }
    };

    if list.is_empty() {
        println!("No profiles found.");
        return;
    }

    println!();
    println!(
        "{:<40} {:<24} {:<11} {:<20}",
        "UID", "NAME", "ROLE", "CREATED"
    );
    println!("{}", "-".repeat(97));

    for profile in list {
        println!(
            "{:<40} {:<24} {:<11} {:<20}",
            truncate(Some(profile.uid.as_str()), 40),
            truncate(Some(profile.display_label()), 24),
            profile.role.as_str(),
            profile.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        );
    }
    println!();
}

fn print_profile(profile: &UserProfile) {
    println!();
    println!("  uid:          {}", profile.uid);
    println!("  role:         {}", profile.role);
    println!("  display name: {}", truncate(profile.display_name.as_deref(), 60));
    println!("  email:        {}", truncate(profile.email.as_deref(), 60));
    println!("  phone:        {}", truncate(profile.phone_number.as_deref(), 60));
    println!("  created:      {}", profile.created_at.to_rfc3339());
    println!("  updated:      {}", profile.updated_at.to_rfc3339());
    println!();
}

async fn show_profile(profiles: &ProfileService, uid: &str) {
    match profiles.get_profile(uid).await {
        Ok(Some(profile)) => print_profile(&profile),
        Ok(None) => {
            eprintln!("Profile {} not found.", uid);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error reading profile: {}", e);
            std::process::exit(1);
        }
    }
}

async fn set_role(profiles: &ProfileService, uid: &str, role: &str) {
    match profiles.update_role(uid, role).await {
        Ok(profile) => {
            println!("Role of {} set to {}.", profile.uid, profile.role);
        }
        Err(e) => {
            eprintln!("Error updating role: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!();
    eprintln!("Usage: manage-profiles <command> [options]");
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  list, ls [--limit <n>]              List profiles, newest first");
    eprintln!("  show --uid <uid>                    Show one profile");
    eprintln!("  set-role --uid <uid> --role <role>  Set role (user, admin, moderator)");
    eprintln!("  help                                Show this help");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  manage-profiles list --limit 20");
    eprintln!("  manage-profiles set-role --uid google:108234 --role admin");
    eprintln!();
}
