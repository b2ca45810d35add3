use std::env;

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use ubs_docs::{
    auth::jwt::JwtService,
    config::AppConfig,
    credentials::{CredentialStore, NewAccount, PgCredentialStore},
    db,
    models::Role,
    s3,
    storage::ObjectStorage,
};

const USAGE: &str = "Usage:\n  maintenance create-admin <email> <password> <full name>\n  \
                     maintenance delete-objects <key>...";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        Some("create-admin") => {
            let rest: Vec<String> = args.collect();
            let [email, password, name @ ..] = rest.as_slice() else {
                eprintln!("{USAGE}");
                std::process::exit(1);
            };
            if name.is_empty() {
                eprintln!("{USAGE}");
                std::process::exit(1);
            }
            create_admin(email, password, &name.join(" ")).await?;
        }
        Some("delete-objects") => {
            let keys: Vec<String> = args.collect();
            if keys.is_empty() {
                eprintln!("{USAGE}");
                std::process::exit(1);
            }
            delete_objects(&keys).await?;
        }
        Some(cmd) => {
            eprintln!("Unknown command: {cmd}\n{USAGE}");
            std::process::exit(1);
        }
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    }

    Ok(())
}

async fn create_admin(email: &str, password: &str, full_name: &str) -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        "loaded configuration"
    );
    let pool = db::init_pool_with_size(&config.database_url, 1)?;
    db::run_migrations(&pool)?;

    let credentials = PgCredentialStore::new(pool, JwtService::from_config(&config)?);
    let id = credentials
        .create_account(NewAccount {
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Admin,
            full_name: Some(full_name.to_string()),
            pre_verified: true,
        })
        .await
        .map_err(|err| anyhow!("failed to create administrator: {err}"))?;

    println!("Created administrator {email} ({id}).");
    Ok(())
}

async fn delete_objects(keys: &[String]) -> Result<()> {
    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        s3_bucket = %config.s3_bucket,
        count = keys.len(),
        "deleting orphaned objects"
    );
    let storage = s3::build_storage(&config).await?;

    let mut failed = 0usize;
    for key in keys {
        match storage.delete_object(key).await {
            Ok(()) => println!("Deleted {key}"),
            Err(err) => {
                failed += 1;
                eprintln!("Failed to delete object {key} from storage: {err}");
            }
        }
    }

    if failed > 0 {
        return Err(anyhow!("{failed} of {} objects could not be deleted", keys.len()));
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
