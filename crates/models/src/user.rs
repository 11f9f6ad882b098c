use mongodb::{
    bson::{doc, oid::ObjectId, DateTime},
    Database,
};
use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

pub const COLLECTION: &str = "users";

/// Account document. Credentials live on the document itself; they are absent
/// until the auth layer sets a password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_algorithm: Option<String>,
    pub created_at: DateTime,
}

fn collection(db: &Database) -> mongodb::Collection<User> {
    db.collection(COLLECTION)
}

pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let e = email.trim();
    let well_formed = e.contains('@') && !e.starts_with('@') && !e.ends_with('@') && !e.contains(' ');
    if e.is_empty() || !well_formed {
        return Err(ModelError::Validation("invalid email".into()));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("name required".into()));
    }
    if name.chars().count() > 100 {
        return Err(ModelError::Validation("name longer than 100 characters".into()));
    }
    Ok(())
}

pub async fn create(db: &Database, email: &str, name: &str) -> Result<User, ModelError> {
    validate_email(email)?;
    validate_name(name)?;
    let user = User {
        id: ObjectId::new(),
        email: email.trim().to_string(),
        name: name.trim().to_string(),
        password_hash: None,
        password_algorithm: None,
        created_at: DateTime::now(),
    };
    collection(db).insert_one(&user, None).await?;
    Ok(user)
}

pub async fn find_by_email(db: &Database, email: &str) -> Result<Option<User>, ModelError> {
    Ok(collection(db).find_one(doc! { "email": email.trim() }, None).await?)
}

pub async fn find_by_id(db: &Database, id: ObjectId) -> Result<Option<User>, ModelError> {
    Ok(collection(db).find_one(doc! { "_id": id }, None).await?)
}

pub async fn set_password(db: &Database, id: ObjectId, hash: &str, algorithm: &str) -> Result<(), ModelError> {
    let res = collection(db)
        .update_one(
            doc! { "_id": id },
            doc! { "$set": { "password_hash": hash, "password_algorithm": algorithm } },
            None,
        )
        .await?;
    if res.matched_count == 0 {
        return Err(ModelError::Validation("user not found".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_email_accepts_plain_addresses() {
        assert!(validate_email("bob@example.com").is_ok());
        assert!(validate_email("  padded@example.com ").is_ok());
    }

    #[test]
    fn validate_email_rejects_malformed_input() {
        assert!(validate_email("").is_err());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@leading.example").is_err());
        assert!(validate_email("trailing@").is_err());
        assert!(validate_email("spaces in@example.com").is_err());
    }

    #[test]
    fn validate_name_bounds() {
        assert!(validate_name("Bob").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(101)).is_err());
    }
}
