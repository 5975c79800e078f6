//! One-shot seeding: permission catalog, default roles, super admin.
//!
//! Every step is idempotent, so `--seed` can be re-run safely.

use anyhow::{Context, Result, bail};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::config::BootstrapConfig;
use crate::password;
use crate::rbac::permission::{ADMIN_ROLE, DEFAULT_ROLE, DEFAULT_ROLE_PERMISSIONS, Permission};

/// Counts reported after a seed run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub permissions_inserted: u64,
    pub roles_inserted: u64,
    pub super_admin_created: bool,
}

pub async fn run(pool: &PgPool, bootstrap: &BootstrapConfig) -> Result<SeedReport> {
    let (email, pass) = match (
        bootstrap.super_admin_email.as_deref().map(str::trim),
        bootstrap.super_admin_password.as_deref(),
    ) {
        (Some(e), Some(p)) if !e.is_empty() && !p.is_empty() => (e.to_lowercase(), p),
        _ => bail!("SUPER_ADMIN_EMAIL and SUPER_ADMIN_PASS must be set to seed"),
    };
    password::validate(pass).context("super admin password does not meet the password policy")?;

    let mut report = SeedReport::default();
    let mut tx = pool.begin().await.context("begin seed transaction")?;

    for p in Permission::ALL {
        let res = sqlx::query(
            "INSERT INTO permissions (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(p.as_str())
        .execute(&mut *tx)
        .await
        .with_context(|| format!("insert permission {}", p))?;
        report.permissions_inserted += res.rows_affected();
    }

    let (admin_id, created) = ensure_role(&mut tx, ADMIN_ROLE).await?;
    report.roles_inserted += created as u64;
    grant(&mut tx, admin_id, &[Permission::FullAccess]).await?;

    let (user_id, created) = ensure_role(&mut tx, DEFAULT_ROLE).await?;
    report.roles_inserted += created as u64;
    grant(&mut tx, user_id, &DEFAULT_ROLE_PERMISSIONS).await?;

    let existing = sqlx::query("SELECT id FROM accounts WHERE email = $1")
        .bind(&email)
        .fetch_optional(&mut *tx)
        .await
        .context("look up super admin")?;
    let account_id: Uuid = match existing {
        Some(row) => row.try_get("id")?,
        None => {
            let id = Uuid::new_v4();
            let hash = password::hash(pass).context("hash super admin password")?;
            sqlx::query(
                r#"INSERT INTO accounts (id, first_name, last_name, email, password_hash)
                   VALUES ($1, 'Super', 'Admin', $2, $3)"#,
            )
            .bind(id)
            .bind(&email)
            .bind(&hash)
            .execute(&mut *tx)
            .await
            .context("insert super admin")?;
            report.super_admin_created = true;
            id
        }
    };

    sqlx::query(
        "INSERT INTO account_roles (account_id, role_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(account_id)
    .bind(admin_id)
    .execute(&mut *tx)
    .await
    .context("attach admin role to super admin")?;

    tx.commit().await.context("commit seed transaction")?;

    tracing::info!(
        permissions_inserted = report.permissions_inserted,
        roles_inserted = report.roles_inserted,
        super_admin_created = report.super_admin_created,
        "seed complete"
    );
    Ok(report)
}

/// Returns the role id and whether it was inserted.
async fn ensure_role(tx: &mut Transaction<'_, Postgres>, name: &str) -> Result<(Uuid, bool)> {
    let inserted = sqlx::query(
        "INSERT INTO roles (id, name) VALUES ($1, $2) ON CONFLICT (name) DO NOTHING RETURNING id",
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .fetch_optional(&mut **tx)
    .await
    .with_context(|| format!("insert role {}", name))?;

    if let Some(row) = inserted {
        return Ok((row.try_get("id")?, true));
    }

    let row = sqlx::query("SELECT id FROM roles WHERE name = $1")
        .bind(name)
        .fetch_one(&mut **tx)
        .await
        .with_context(|| format!("load role {}", name))?;
    Ok((row.try_get("id")?, false))
}

async fn grant(
    tx: &mut Transaction<'_, Postgres>,
    role_id: Uuid,
    permissions: &[Permission],
) -> Result<()> {
    let names: Vec<String> = permissions.iter().map(|p| p.to_string()).collect();
    sqlx::query(
        r#"INSERT INTO role_permissions (role_id, permission_id)
           SELECT $1, id FROM permissions WHERE name = ANY($2)
           ON CONFLICT DO NOTHING"#,
    )
    .bind(role_id)
    .bind(&names)
    .execute(&mut **tx)
    .await
    .context("grant role permissions")?;
    Ok(())
}
