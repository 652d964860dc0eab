//! SQLite repository integration tests.

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use social_types::{
        DomainError, NewUser, PasswordHash, StoreError, UserId, UserRepository,
    };

    use crate::SqliteRepo;
    use crate::security::hash_token;

    // A single connection keeps every statement on the same in-memory database.
    async fn setup_repo() -> SqliteRepo {
        SqliteRepo::new("sqlite::memory:", 1).await.unwrap()
    }

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser::new(
            username.to_string(),
            email.to_string(),
            PasswordHash::from_stored("$argon2id$stub".to_string()),
        )
        .unwrap()
    }

    fn ttl() -> Duration {
        Duration::hours(72)
    }

    async fn invitation_hashes(repo: &SqliteRepo, id: UserId) -> Vec<String> {
        sqlx::query_scalar("SELECT token FROM user_invitations WHERE user_id = ?")
            .bind(id.get())
            .fetch_all(repo.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_and_invite() {
        let repo = setup_repo().await;

        let user = repo
            .create_and_invite(new_user("alice", "alice@example.com"), "tok-alice", ttl())
            .await
            .unwrap();

        assert_eq!(user.username, "alice");
        assert!(!user.is_active);
        assert_eq!(user.role.name, "user");

        let fetched = repo.get_user(user.id).await.unwrap().unwrap();
        assert_eq!(fetched.email, "alice@example.com");
        assert!(!fetched.is_active);
        assert_eq!(fetched.role.level, 1);

        let hashes = invitation_hashes(&repo, user.id).await;
        assert_eq!(hashes.len(), 1);
        assert_ne!(hashes[0], "tok-alice");
        assert_eq!(hashes[0], hash_token("tok-alice"));
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let repo = setup_repo().await;

        assert!(repo.get_user(UserId::new(999)).await.unwrap().is_none());
        assert!(
            repo.get_user_by_email("nobody@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_unknown_role_is_rejected() {
        let repo = setup_repo().await;

        let result = repo
            .create_and_invite(
                new_user("bob", "bob@example.com").with_role("superuser"),
                "tok-bob",
                ttl(),
            )
            .await;

        assert!(matches!(
            result,
            Err(StoreError::Domain(DomainError::ValidationError(_)))
        ));
        assert!(
            repo.get_user_by_email("bob@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_duplicate_email() {
        let repo = setup_repo().await;

        repo.create_and_invite(new_user("alice", "alice@example.com"), "tok-1", ttl())
            .await
            .unwrap();

        let result = repo
            .create_and_invite(new_user("alice2", "alice@example.com"), "tok-2", ttl())
            .await;

        assert!(matches!(result, Err(StoreError::DuplicateEmail)));
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let repo = setup_repo().await;

        repo.create_and_invite(new_user("alice", "alice@example.com"), "tok-1", ttl())
            .await
            .unwrap();

        let result = repo
            .create_and_invite(new_user("alice", "other@example.com"), "tok-2", ttl())
            .await;

        assert!(matches!(result, Err(StoreError::DuplicateUsername)));
    }

    #[tokio::test]
    async fn test_failed_invitation_rolls_back_user_insert() {
        let repo = setup_repo().await;

        repo.create_and_invite(new_user("alice", "alice@example.com"), "same-token", ttl())
            .await
            .unwrap();

        // Second invitation collides on the token primary key after the user
        // row was already inserted in the same transaction.
        let result = repo
            .create_and_invite(new_user("bob", "bob@example.com"), "same-token", ttl())
            .await;

        assert!(matches!(result, Err(StoreError::Conflict(_))));
        assert!(
            repo.get_user_by_email("bob@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_activate() {
        let repo = setup_repo().await;

        let user = repo
            .create_and_invite(new_user("alice", "alice@example.com"), "tok-alice", ttl())
            .await
            .unwrap();

        repo.activate("tok-alice").await.unwrap();

        let fetched = repo.get_user(user.id).await.unwrap().unwrap();
        assert!(fetched.is_active);
        assert!(invitation_hashes(&repo, user.id).await.is_empty());

        // The invitation is consumed.
        assert!(matches!(
            repo.activate("tok-alice").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_activate_unknown_token() {
        let repo = setup_repo().await;

        assert!(matches!(
            repo.activate("does-not-exist").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_activate_expired_invitation() {
        let repo = setup_repo().await;

        let user = repo
            .create_and_invite(
                new_user("alice", "alice@example.com"),
                "tok-old",
                Duration::seconds(-60),
            )
            .await
            .unwrap();

        assert!(matches!(
            repo.activate("tok-old").await,
            Err(StoreError::NotFound)
        ));

        let fetched = repo.get_user(user.id).await.unwrap().unwrap();
        assert!(!fetched.is_active);
        assert_eq!(
            invitation_hashes(&repo, user.id).await,
            vec![hash_token("tok-old")]
        );
    }

    #[tokio::test]
    async fn test_delete_user() {
        let repo = setup_repo().await;

        let user = repo
            .create_and_invite(new_user("alice", "alice@example.com"), "tok-alice", ttl())
            .await
            .unwrap();

        repo.delete_user(user.id).await.unwrap();

        assert!(repo.get_user(user.id).await.unwrap().is_none());
        assert!(invitation_hashes(&repo, user.id).await.is_empty());
        assert!(matches!(
            repo.delete_user(user.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_follow_and_unfollow() {
        let repo = setup_repo().await;

        let alice = repo
            .create_and_invite(new_user("alice", "alice@example.com"), "tok-a", ttl())
            .await
            .unwrap();
        let bob = repo
            .create_and_invite(new_user("bob", "bob@example.com"), "tok-b", ttl())
            .await
            .unwrap();

        repo.follow(alice.id, bob.id).await.unwrap();

        let again = repo.follow(alice.id, bob.id).await;
        assert!(matches!(again, Err(StoreError::Conflict(msg)) if msg.contains("already following")));

        repo.unfollow(alice.id, bob.id).await.unwrap();
        // Unfollowing twice is a no-op.
        repo.unfollow(alice.id, bob.id).await.unwrap();

        repo.follow(alice.id, bob.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_follow_unknown_user() {
        let repo = setup_repo().await;

        let alice = repo
            .create_and_invite(new_user("alice", "alice@example.com"), "tok-a", ttl())
            .await
            .unwrap();

        assert!(matches!(
            repo.follow(alice.id, UserId::new(999)).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_cancelled_workflows_release_connection() {
        let repo = setup_repo().await;

        let mut cancelled = 0;
        for i in 0..8 {
            let attempt = tokio::time::timeout(
                std::time::Duration::from_micros(5),
                repo.create_and_invite(
                    new_user(&format!("user{}", i), &format!("user{}@example.com", i)),
                    &format!("tok-{}", i),
                    ttl(),
                ),
            )
            .await;
            if attempt.is_err() {
                cancelled += 1;
            }
        }
        assert!(cancelled > 0);

        // The single pooled connection must come back after each drop.
        let follow_up = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            repo.get_user_by_email("nobody@example.com"),
        )
        .await;
        assert!(matches!(follow_up, Ok(Ok(None))));

        // Every surviving user row has its invitation alongside it.
        let orphans: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users u
             WHERE NOT EXISTS (SELECT 1 FROM user_invitations i WHERE i.user_id = u.id)",
        )
        .fetch_one(repo.pool())
        .await
        .unwrap();
        assert_eq!(orphans, 0);
    }
}
