use mongodb::{bson::oid::ObjectId, Database};

use models::errors::ModelError;

use crate::auth::domain::{AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

/// Document-store implementation over the `users` collection.
pub struct MongoAuthRepository {
    pub db: Database,
}

fn repo_err(e: ModelError) -> AuthError {
    match e {
        ModelError::Validation(m) => AuthError::Validation(m),
        ModelError::Db(m) => AuthError::Repository(m),
    }
}

#[async_trait::async_trait]
impl AuthRepository for MongoAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let res = models::user::find_by_email(&self.db, email).await.map_err(repo_err)?;
        Ok(res.map(|u| AuthUser { id: u.id, email: u.email, name: u.name }))
    }

    async fn create_user(&self, email: &str, name: &str) -> Result<AuthUser, AuthError> {
        let created = models::user::create(&self.db, email, name).await.map_err(repo_err)?;
        Ok(AuthUser { id: created.id, email: created.email, name: created.name })
    }

    async fn get_credentials(&self, user_id: ObjectId) -> Result<Option<Credentials>, AuthError> {
        let res = models::user::find_by_id(&self.db, user_id).await.map_err(repo_err)?;
        Ok(res.and_then(|u| match (u.password_hash, u.password_algorithm) {
            (Some(hash), Some(algorithm)) => Some(Credentials {
                user_id,
                password_hash: hash,
                password_algorithm: algorithm,
            }),
            _ => None,
        }))
    }

    async fn upsert_password(
        &self,
        user_id: ObjectId,
        password_hash: String,
        password_algorithm: String,
    ) -> Result<Credentials, AuthError> {
        models::user::set_password(&self.db, user_id, &password_hash, &password_algorithm)
            .await
            .map_err(repo_err)?;
        Ok(Credentials { user_id, password_hash, password_algorithm })
    }
}
