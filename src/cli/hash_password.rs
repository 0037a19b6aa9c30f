use crate::services::auth;
use anyhow::Result;

/// Ask twice for a password that meets the minimum length.
pub fn prompt_new_password() -> Result<String> {
    let password = rpassword::prompt_password("Admin password: ")?;
    let confirm = rpassword::prompt_password("Confirm password: ")?;
    if password != confirm {
        anyhow::bail!("Passwords do not match");
    }
    auth::validate_password(&password)?;
    Ok(password)
}

pub async fn run() -> Result<()> {
    let password = prompt_new_password()?;
    let hash = auth::hash_password(&password)?;

    println!("{}", hash);
    eprintln!("Put this in [admin] password_hash or the ADMIN_PASSWORD_HASH variable.");

    Ok(())
}
