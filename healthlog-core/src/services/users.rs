//! User service - signup, authentication and account management

use std::sync::Arc;

use crate::domain::result::{Error, Result};
use crate::domain::{AuthOutcome, PostRetention, ProfileUpdate, SignupRequest, User};
use crate::ports::{CredentialHasher, StagedWrite, UserDeletion, UserFilter};

use super::Session;

/// Account operations over an explicit session
pub struct UserService {
    hasher: Arc<dyn CredentialHasher>,
    default_image_url: String,
    post_retention: PostRetention,
}

impl UserService {
    pub fn new(
        hasher: Arc<dyn CredentialHasher>,
        default_image_url: impl Into<String>,
        post_retention: PostRetention,
    ) -> Self {
        Self {
            hasher,
            default_image_url: default_image_url.into(),
            post_retention,
        }
    }

    /// Hash the password and stage a new user
    ///
    /// Does not commit and does not check uniqueness: a taken username or
    /// email fails at `Session::commit` with `Error::UniqueViolation`.
    /// The returned user has no id until then.
    pub fn signup(&self, session: &mut Session, request: SignupRequest) -> Result<User> {
        let digest = self.hasher.hash(&request.password)?;

        let image_url = request
            .image_url
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| self.default_image_url.clone());

        let user = User::new(
            request.username,
            digest,
            request.email,
            request.first_name,
            request.last_name,
        )
        .with_image_url(image_url);

        session.add(user.clone());
        Ok(user)
    }

    /// Look up the first user with exactly this username and check the password
    pub fn authenticate(&self, session: &Session, username: &str, password: &str) -> Result<AuthOutcome> {
        let user = session
            .repository()
            .first_user(&UserFilter::Username(username.to_string()))?;

        Ok(match user {
            Some(user) if self.hasher.verify(&user.password, password) => {
                AuthOutcome::Authenticated(user)
            }
            _ => AuthOutcome::NoMatch,
        })
    }

    pub fn find(&self, session: &Session, filter: &UserFilter) -> Result<Option<User>> {
        session.repository().first_user(filter)
    }

    pub fn get(&self, session: &Session, user_id: i64) -> Result<User> {
        self.find(session, &UserFilter::Id(user_id))?
            .ok_or_else(|| Error::not_found(format!("user {}", user_id)))
    }

    pub fn list(&self, session: &Session) -> Result<Vec<User>> {
        session.repository().list_users()
    }

    /// Stage a profile change for an existing user
    pub fn update_profile(
        &self,
        session: &mut Session,
        user_id: i64,
        update: ProfileUpdate,
    ) -> Result<()> {
        if update.is_empty() {
            return Err(Error::validation("Nothing to update"));
        }
        self.get(session, user_id)?;
        session.add(StagedWrite::UpdateProfile { user_id, update });
        Ok(())
    }

    /// Stage a new password digest after checking the current password
    ///
    /// Returns `NoMatch` without staging anything if `current` is wrong.
    pub fn change_password(
        &self,
        session: &mut Session,
        user_id: i64,
        current: &str,
        new_password: &str,
    ) -> Result<AuthOutcome> {
        let user = self.get(session, user_id)?;
        if !self.hasher.verify(&user.password, current) {
            return Ok(AuthOutcome::NoMatch);
        }

        let digest = self.hasher.hash(new_password)?;
        session.add(StagedWrite::UpdatePassword { user_id, digest: digest.clone() });

        Ok(AuthOutcome::Authenticated(User { password: digest, ..user }))
    }

    /// Delete a user now (not staged)
    ///
    /// BMI results always go with the user; posts follow the configured
    /// retention policy.
    pub fn delete(&self, session: &Session, user_id: i64) -> Result<UserDeletion> {
        session.repository().delete_user(user_id, self.post_retention)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::argon2_hasher::Argon2Hasher;
    use crate::adapters::duckdb::DuckDbRepository;
    use crate::domain::{Argon2Params, DEFAULT_IMAGE_URL};
    use crate::ports::Repository;

    fn service() -> UserService {
        let hasher = Argon2Hasher::new(Argon2Params {
            time_cost: 1,
            memory_cost: 1024,
            parallelism: 1,
        });
        UserService::new(Arc::new(hasher), DEFAULT_IMAGE_URL, PostRetention::Orphan)
    }

    fn session() -> Session {
        let repo = DuckDbRepository::open_in_memory().unwrap();
        repo.ensure_schema().unwrap();
        Session::new(Arc::new(repo))
    }

    fn request(username: &str, password: &str) -> SignupRequest {
        SignupRequest {
            username: username.to_string(),
            password: password.to_string(),
            email: format!("{}@x.com", username),
            first_name: "First".to_string(),
            last_name: "Last".to_string(),
            image_url: None,
        }
    }

    #[test]
    fn test_signup_stages_hashed_user() {
        let service = service();
        let mut session = session();

        let user = service.signup(&mut session, request("alice", "pw123")).unwrap();

        assert!(user.id.is_none());
        assert_ne!(user.password, "pw123");
        assert_eq!(session.pending().len(), 1);
        assert_eq!(session.repository().counts().unwrap().users, 0);
    }

    #[test]
    fn test_signup_image_fallback() {
        let service = service();
        let mut session = session();

        let no_image = service.signup(&mut session, request("a", "pw")).unwrap();
        assert_eq!(no_image.image_url.as_deref(), Some(DEFAULT_IMAGE_URL));

        let mut blank = request("b", "pw");
        blank.image_url = Some("  ".to_string());
        let blank = service.signup(&mut session, blank).unwrap();
        assert_eq!(blank.image_url.as_deref(), Some(DEFAULT_IMAGE_URL));

        let mut custom = request("c", "pw");
        custom.image_url = Some("/img/c.png".to_string());
        let custom = service.signup(&mut session, custom).unwrap();
        assert_eq!(custom.image_url.as_deref(), Some("/img/c.png"));
    }

    #[test]
    fn test_authenticate_before_commit_is_no_match() {
        let service = service();
        let mut session = session();
        service.signup(&mut session, request("alice", "pw123")).unwrap();

        let outcome = service.authenticate(&session, "alice", "pw123").unwrap();
        assert_eq!(outcome, AuthOutcome::NoMatch);
    }

    #[test]
    fn test_update_profile_requires_fields_and_user() {
        let service = service();
        let mut session = session();

        let empty = service.update_profile(&mut session, 1, ProfileUpdate::default());
        assert!(matches!(empty, Err(Error::Validation(_))));

        let update = ProfileUpdate {
            first_name: Some("X".to_string()),
            ..Default::default()
        };
        let missing = service.update_profile(&mut session, 1, update);
        assert!(matches!(missing, Err(Error::NotFound(_))));
        assert!(!session.has_pending());
    }

    #[test]
    fn test_change_password_checks_current() {
        let service = service();
        let mut session = session();
        service.signup(&mut session, request("alice", "old")).unwrap();
        let persisted = session.commit().unwrap();
        let user_id = persisted[0].as_user().unwrap().id.unwrap();

        let wrong = service.change_password(&mut session, user_id, "nope", "new").unwrap();
        assert_eq!(wrong, AuthOutcome::NoMatch);
        assert!(!session.has_pending());

        let ok = service.change_password(&mut session, user_id, "old", "new").unwrap();
        assert!(ok.is_authenticated());
        session.commit().unwrap();

        assert!(!service.authenticate(&session, "alice", "old").unwrap().is_authenticated());
        assert!(service.authenticate(&session, "alice", "new").unwrap().is_authenticated());
    }
}
