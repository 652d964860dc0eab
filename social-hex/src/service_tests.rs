//! SocialService unit tests.

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    use social_auth::JwtAuthenticator;
    use social_types::{
        AppError, CreateTokenRequest, MailError, MailMessage, Mailer, NewUser,
        RegisterUserRequest, Role, StoreError, TokenAuthenticator, User, UserId, UserRepository,
    };

    use crate::{ServiceSettings, SocialService};

    /// Simple in-memory repository for testing the service layer.
    #[derive(Default)]
    pub struct MockRepo {
        users: Mutex<HashMap<UserId, User>>,
        /// raw token -> (user, expiry)
        invitations: Mutex<HashMap<String, (UserId, chrono::DateTime<Utc>)>>,
        follows: Mutex<HashSet<(UserId, UserId)>>,
    }

    #[async_trait]
    impl UserRepository for MockRepo {
        async fn get_user(&self, id: UserId) -> Result<Option<User>, StoreError> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }

        async fn get_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email == email)
                .cloned())
        }

        async fn create_and_invite(
            &self,
            user: NewUser,
            raw_token: &str,
            invitation_ttl: Duration,
        ) -> Result<User, StoreError> {
            let mut users = self.users.lock().unwrap();
            if users.values().any(|u| u.email == user.email) {
                return Err(StoreError::DuplicateEmail);
            }
            if users.values().any(|u| u.username == user.username) {
                return Err(StoreError::DuplicateUsername);
            }

            let id = UserId::new(users.len() as i64 + 1);
            let created = User {
                id,
                username: user.username,
                email: user.email,
                password: user.password,
                created_at: Utc::now(),
                is_active: false,
                role: Role {
                    id: 1,
                    name: "user".into(),
                    level: 1,
                    description: String::new(),
                },
            };
            users.insert(id, created.clone());
            self.invitations
                .lock()
                .unwrap()
                .insert(raw_token.to_string(), (id, Utc::now() + invitation_ttl));
            Ok(created)
        }

        async fn activate(&self, raw_token: &str) -> Result<(), StoreError> {
            let mut invitations = self.invitations.lock().unwrap();
            let (id, expiry) = *invitations.get(raw_token).ok_or(StoreError::NotFound)?;
            if expiry <= Utc::now() {
                return Err(StoreError::NotFound);
            }
            invitations.retain(|_, (owner, _)| *owner != id);
            if let Some(user) = self.users.lock().unwrap().get_mut(&id) {
                user.is_active = true;
            }
            Ok(())
        }

        async fn delete_user(&self, id: UserId) -> Result<(), StoreError> {
            self.users
                .lock()
                .unwrap()
                .remove(&id)
                .ok_or(StoreError::NotFound)?;
            self.invitations
                .lock()
                .unwrap()
                .retain(|_, (owner, _)| *owner != id);
            Ok(())
        }

        async fn follow(&self, follower: UserId, followee: UserId) -> Result<(), StoreError> {
            if !self.users.lock().unwrap().contains_key(&followee) {
                return Err(StoreError::NotFound);
            }
            if !self.follows.lock().unwrap().insert((follower, followee)) {
                return Err(StoreError::Conflict("already following this user".into()));
            }
            Ok(())
        }

        async fn unfollow(&self, follower: UserId, followee: UserId) -> Result<(), StoreError> {
            self.follows.lock().unwrap().remove(&(follower, followee));
            Ok(())
        }
    }

    /// Records every message it is asked to send.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<MailMessage>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &MailMessage) -> Result<(), MailError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }

    pub struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send(&self, _message: &MailMessage) -> Result<(), MailError> {
            Err(MailError::Delivery {
                attempts: 3,
                reason: "connection refused".into(),
            })
        }
    }

    fn authenticator() -> Arc<JwtAuthenticator> {
        Arc::new(JwtAuthenticator::new("test-secret", "gophersocial", "gophersocial"))
    }

    fn service_with(mailer: Arc<dyn Mailer>) -> SocialService<MockRepo> {
        SocialService::new(
            MockRepo::default(),
            mailer,
            authenticator(),
            ServiceSettings {
                frontend_url: "http://frontend.test/".into(),
                ..ServiceSettings::default()
            },
        )
    }

    fn register_request(username: &str, email: &str) -> RegisterUserRequest {
        RegisterUserRequest {
            username: username.into(),
            email: email.into(),
            password: "password123".into(),
        }
    }

    #[tokio::test]
    async fn test_register_sends_invitation() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = service_with(mailer.clone());

        let created = service
            .register(register_request("gopher", "gopher@example.com"))
            .await
            .unwrap();

        assert_eq!(created.user.username, "gopher");
        assert!(!created.user.is_active);
        assert!(!created.token.is_empty());

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to_email, "gopher@example.com");
        assert!(
            sent[0]
                .body
                .contains(&format!("http://frontend.test/confirm/{}", created.token))
        );
    }

    #[tokio::test]
    async fn test_register_rejects_short_password() {
        let service = service_with(Arc::new(RecordingMailer::default()));

        let mut req = register_request("gopher", "gopher@example.com");
        req.password = "ab".into();

        let result = service.register(req).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_register_rolls_back_user_when_mail_fails() {
        let service = service_with(Arc::new(FailingMailer));

        let result = service
            .register(register_request("gopher", "gopher@example.com"))
            .await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert!(
            service
                .repo()
                .get_user_by_email("gopher@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_register_duplicate_email_is_conflict() {
        let service = service_with(Arc::new(RecordingMailer::default()));

        service
            .register(register_request("gopher", "gopher@example.com"))
            .await
            .unwrap();
        let result = service
            .register(register_request("other", "gopher@example.com"))
            .await;

        assert!(matches!(result, Err(AppError::Conflict(msg)) if msg.contains("email")));
    }

    #[tokio::test]
    async fn test_activate_then_issue_token() {
        let service = service_with(Arc::new(RecordingMailer::default()));
        let created = service
            .register(register_request("gopher", "gopher@example.com"))
            .await
            .unwrap();

        let login = CreateTokenRequest {
            email: "gopher@example.com".into(),
            password: "password123".into(),
        };

        // Pending users cannot log in.
        assert!(matches!(
            service.create_token(login.clone()).await,
            Err(AppError::Unauthorized(_))
        ));

        service.activate(&created.token).await.unwrap();

        let issued = service.create_token(login).await.unwrap();
        let claims = authenticator().validate_token(&issued.token).unwrap();
        assert_eq!(claims.subject_id().unwrap(), created.user.id);

        let wrong = CreateTokenRequest {
            email: "gopher@example.com".into(),
            password: "wrong-password".into(),
        };
        assert!(matches!(
            service.create_token(wrong).await,
            Err(AppError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_activate_unknown_token_is_not_found() {
        let service = service_with(Arc::new(RecordingMailer::default()));

        assert!(matches!(
            service.activate("nope").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_active_user_hides_pending_users() {
        let service = service_with(Arc::new(RecordingMailer::default()));
        let created = service
            .register(register_request("gopher", "gopher@example.com"))
            .await
            .unwrap();

        assert!(matches!(
            service.get_active_user(created.user.id).await,
            Err(AppError::NotFound(_))
        ));

        service.activate(&created.token).await.unwrap();
        let user = service.get_active_user(created.user.id).await.unwrap();
        assert!(user.is_active);
    }

    #[tokio::test]
    async fn test_follow_rules() {
        let service = service_with(Arc::new(RecordingMailer::default()));
        let alice = service
            .register(register_request("alice", "alice@example.com"))
            .await
            .unwrap()
            .user;
        let bob = service
            .register(register_request("bob", "bob@example.com"))
            .await
            .unwrap()
            .user;

        assert!(matches!(
            service.follow(&alice, alice.id).await,
            Err(AppError::BadRequest(_))
        ));

        service.follow(&alice, bob.id).await.unwrap();
        assert!(matches!(
            service.follow(&alice, bob.id).await,
            Err(AppError::Conflict(_))
        ));

        assert!(matches!(
            service.follow(&alice, UserId::new(999)).await,
            Err(AppError::NotFound(_))
        ));

        service.unfollow(&alice, bob.id).await.unwrap();
        service.follow(&alice, bob.id).await.unwrap();
    }
}
