use uuid::Uuid;

/// Mirror a gateway-authenticated user into `users`.
///
/// Posts and follow rows reference `users(id)`, so every write path records
/// its caller first. The username is refreshed on each call and may be
/// shared with a stale row of a user who has since renamed.
pub(crate) async fn record_user<'e, E>(
    executor: E,
    user_id: Uuid,
    username: &str,
) -> Result<(), sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO users (id, username)
        VALUES ($1, $2)
        ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username
        "#,
    )
    .bind(user_id)
    .bind(username)
    .execute(executor)
    .await?;

    Ok(())
}
