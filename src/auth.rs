use super::{
    db_ops,
    errors::{AppError, AppResult},
    models::User,
    pw,
    records::check_length,
    session,
};
use sqlx::postgres::PgPool;

/// Same floor the hosted auth providers use.
const MIN_PASSWORD_LEN: usize = 6;

fn new_session(user: User) -> session::Session {
    session::Session {
        user,
        created_at: chrono::Utc::now().timestamp(),
    }
}

pub async fn authenticate(
    db: &PgPool,
    username_or_email: &str,
    password: &str,
) -> AppResult<session::Session> {
    let bad_login = || AppError::validation("Invalid username or password");
    let user = match db_ops::get_user(
        db,
        &db_ops::GetUserQuery {
            identifier: username_or_email.trim(),
        },
    )
    .await
    {
        Ok(user) => user,
        Err(err) => {
            return match AppError::from(err) {
                AppError::NotFound => Err(bad_login()),
                other => Err(other),
            }
        }
    };
    let truth = db_ops::get_credentials(db, user.id).await?;
    let password = password.to_owned();
    let checked = tokio::task::spawn_blocking(move || {
        pw::check(&password, &truth.password_hash)
    })
    .await
    .map_err(anyhow::Error::from)?;

    match checked {
        Ok(()) => {
            tracing::info!(user_id = user.id, "user signed in");
            Ok(new_session(user))
        }
        Err(err) => {
            tracing::info!(user_id = user.id, reason = %err, "login rejected");
            Err(bad_login())
        }
    }
}

pub struct Registration<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub display_name: &'a str,
    pub password: &'a str,
}

impl Registration<'_> {
    pub fn validate(&self) -> AppResult<()> {
        if self.username.trim().is_empty() {
            return Err(AppError::validation("Username is required"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::validation("A valid email is required"));
        }
        check_length(self.username.trim(), "Username")?;
        check_length(email, "Email")?;
        check_length(self.display_name.trim(), "Display name")?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

pub async fn register(
    db: &PgPool,
    registration: &Registration<'_>,
) -> AppResult<session::Session> {
    registration.validate()?;
    let username = registration.username.trim();
    let email = registration.email.trim();
    if db_ops::user_exists(db, username, email).await? {
        return Err(AppError::validation(
            "That username or email is already taken",
        ));
    }
    let password = registration.password.to_owned();
    let password_hash =
        tokio::task::spawn_blocking(move || pw::hash_new(&password))
            .await
            .map_err(anyhow::Error::from)??;
    let user = db_ops::create_user(
        db,
        &db_ops::NewUser {
            username,
            email,
            display_name: registration.display_name.trim(),
            password_hash: &password_hash,
        },
    )
    .await?;
    tracing::info!(user_id = user.id, "user registered");

    Ok(new_session(user))
}

/// Change the display name; the caller must re-issue the session cookie
/// with the returned user.
pub async fn update_profile(
    db: &PgPool,
    caller: Option<&User>,
    display_name: &str,
) -> AppResult<session::Session> {
    let caller = caller.ok_or(AppError::NotAuthenticated)?;
    let display_name = display_name.trim();
    check_length(display_name, "Display name")?;
    let user = db_ops::update_display_name(db, caller.id, display_name).await?;
    tracing::info!(user_id = user.id, "profile updated");

    Ok(new_session(user))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration<'a>(password: &'a str, email: &'a str) -> Registration<'a> {
        Registration {
            username: "jack",
            email,
            display_name: "Jack",
            password,
        }
    }

    #[test]
    fn test_registration_validation() {
        assert!(registration("hunter22", "jack@jack.com").validate().is_ok());
        assert!(matches!(
            registration("short", "jack@jack.com").validate(),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            registration("hunter22", "jack").validate(),
            Err(AppError::Validation(_))
        ));
        let mut nameless = registration("hunter22", "jack@jack.com");
        nameless.username = "  ";
        assert!(nameless.validate().is_err());
    }

    #[test]
    fn test_overlong_fields_are_rejected() {
        let long = "j".repeat(256);
        let mut reg = registration("hunter22", "jack@jack.com");
        reg.display_name = &long;
        match reg.validate() {
            Err(AppError::Validation(msg)) => {
                assert_eq!(msg, "Display name must be at most 255 characters")
            }
            other => panic!("unexpected {other:?}"),
        }
        let email = format!("{long}@jack.com");
        assert!(matches!(
            registration("hunter22", &email).validate(),
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_requires_a_caller() {
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@localhost/nothing")
            .unwrap();
        assert!(matches!(
            update_profile(&db, None, "Jack").await,
            Err(AppError::NotAuthenticated)
        ));
        let caller = User {
            id: 1,
            username: "jack".into(),
            email: "jack@jack.com".into(),
            display_name: String::new(),
        };
        assert!(matches!(
            update_profile(&db, Some(&caller), &"J".repeat(256)).await,
            Err(AppError::Validation(_))
        ));
    }
}
