use anyhow::{Context, anyhow};

use lex_auth::password::{check_password_strength, hash_password};
use lex_config::LexConfig;
use lex_core::enums::Role;
use lex_db::LexDb;
use lex_db::service::LexService;

use crate::cli::CreateAdminArgs;

/// Handle `lexora create-admin`.
pub async fn handle(args: &CreateAdminArgs, config: &LexConfig) -> anyhow::Result<()> {
    check_password_strength(&args.password).map_err(|reason| anyhow!(reason))?;
    let hash = hash_password(&args.password).context("create-admin: failed to hash password")?;

    let db = LexDb::open(&config.database)
        .await
        .context("create-admin: failed to open database")?;
    let svc = LexService::from_db(db);
    let account = svc
        .create_account(&args.email, &hash, &args.name, Role::Admin)
        .await
        .context("create-admin: failed to create account")?;

    tracing::info!(account_id = %account.id, email = %account.email, "admin account created");
    println!("{}", account.id);
    Ok(())
}
