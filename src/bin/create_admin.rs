//! Bootstrap the first administrator account.
//!
//! ```text
//! create-admin --email admin@genbi.com --full-name "Main Administrator"
//! create-admin --with-test-users
//! ```
//!
//! Safe to run repeatedly: existing accounts are left untouched.

use clap::Parser;
use rand::{Rng, distr::Alphanumeric};

use genbi_backend::{
    config::Config,
    db::{self, DbPool},
    logging,
    models::user::Role,
    security::password,
    services::user_service::{self, NewUser},
};

#[derive(Debug, Parser)]
#[command(name = "create-admin", about = "Create the initial admin user")]
struct Args {
    /// Admin e-mail address
    #[arg(long, default_value = "admin@genbi.com")]
    email: String,

    /// Admin password; a random one is generated and printed when omitted
    #[arg(long)]
    password: Option<String>,

    #[arg(long, default_value = "Main Administrator")]
    full_name: String,

    /// Also create company@test.com and client@test.com
    #[arg(long)]
    with_test_users: bool,
}

const GENERATED_PASSWORD_LENGTH: usize = 20;

/// Random alphanumeric password that satisfies the password policy.
fn generate_password(min_length: usize) -> String {
    let length = GENERATED_PASSWORD_LENGTH.max(min_length);
    loop {
        let candidate: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(length)
            .map(char::from)
            .collect();

        if password::check_policy(&candidate, min_length).is_ok() {
            return candidate;
        }
    }
}

/// Insert the user unless the e-mail is already registered. Returns whether a row was created.
async fn ensure_user(
    pool: &DbPool,
    email: &str,
    full_name: &str,
    plain_password: &str,
    role: Role,
) -> anyhow::Result<bool> {
    if user_service::find_by_email(pool, email).await?.is_some() {
        return Ok(false);
    }

    let password_hash = password::hash_password_blocking(plain_password.to_string()).await?;
    user_service::create_user(
        pool,
        NewUser {
            email,
            full_name: Some(full_name),
            phone: None,
            password_hash: &password_hash,
            role,
            is_active: true,
        },
    )
    .await?;

    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_env()?;
    logging::init(&config);

    let pool = db::create_pool(&config.database_url()?, 2).await?;
    db::run_migrations(&pool).await?;

    let (admin_password, generated) = match args.password {
        Some(password) => (password, false),
        None => (generate_password(config.min_password_length), true),
    };
    password::check_policy(&admin_password, config.min_password_length)?;

    if ensure_user(&pool, &args.email, &args.full_name, &admin_password, Role::Admin).await? {
        println!("Admin created: {}", args.email);
        if generated {
            println!("Password: {admin_password}");
            println!("This password is shown once. Change it after the first login.");
        }
    } else {
        println!("A user with e-mail {} already exists, nothing to do", args.email);
    }

    if args.with_test_users {
        let test_users = [
            ("company@test.com", "Test Company", Role::Company),
            ("client@test.com", "Test Client", Role::Client),
        ];

        for (email, full_name, role) in test_users {
            let password = generate_password(config.min_password_length);
            if ensure_user(&pool, email, full_name, &password, role).await? {
                println!("Created {role} user: {email} / {password}");
            } else {
                println!("User {email} already exists");
            }
        }
    }

    Ok(())
}
