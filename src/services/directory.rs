//! Identity & Role Directory

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::info;

use crate::entities::{prelude::Users, users};
use crate::models::user::Role;
use crate::services::error::ServiceError;
use crate::services::policy::{authorize, Action, Actor};

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub phone: Option<String>,
    pub role: Role,
}

pub async fn find_user<C: ConnectionTrait>(conn: &C, user_id: i32) -> Result<users::Model, ServiceError> {
    Users::find_by_id(user_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("User", user_id))
}

fn normalize_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(ServiceError::Validation(format!("invalid email: '{}'", email))),
    }
}

#[derive(Clone)]
pub struct DirectoryService {
    db: DatabaseConnection,
}

impl DirectoryService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Resolve the acting user behind a request
    pub async fn actor(&self, user_id: i32) -> Result<Actor, ServiceError> {
        let user = find_user(&self.db, user_id).await?;
        Actor::from_user(&user)
    }

    pub async fn get_user(&self, actor: &Actor, user_id: i32) -> Result<users::Model, ServiceError> {
        authorize(actor, &Action::ViewUser { user_id })?;
        find_user(&self.db, user_id).await
    }

    pub async fn list_by_role(
        &self,
        actor: &Actor,
        role: Option<Role>,
    ) -> Result<Vec<users::Model>, ServiceError> {
        authorize(actor, &Action::ViewDirectory)?;

        let mut select = Users::find();
        if let Some(role) = role {
            select = select.filter(users::Column::Role.eq(role.to_string()));
        }
        Ok(select.order_by_asc(users::Column::FullName).all(&self.db).await?)
    }

    /// Register a user. Self sign-up (no actor) may only create clients.
    pub async fn create_user(
        &self,
        actor: Option<&Actor>,
        new_user: NewUser,
    ) -> Result<users::Model, ServiceError> {
        if new_user.role != Role::Client {
            match actor {
                Some(actor) => authorize(actor, &Action::ManageUsers)?,
                None => {
                    return Err(ServiceError::Forbidden(
                        "only an admin can create staff users".to_string(),
                    ))
                }
            }
        }

        let email = normalize_email(&new_user.email)?;
        let full_name = new_user.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(ServiceError::Validation("fullName cannot be empty".to_string()));
        }

        let taken = Users::find()
            .filter(users::Column::Email.eq(email.as_str()))
            .one(&self.db)
            .await?;
        if taken.is_some() {
            return Err(ServiceError::Conflict(format!("email '{}' is already registered", email)));
        }

        let user = users::ActiveModel {
            email: Set(email),
            full_name: Set(full_name),
            phone: Set(new_user.phone.filter(|p| !p.trim().is_empty())),
            role: Set(new_user.role.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&self.db)
        .await?;

        info!(user_id = user.id, role = %user.role, "User registered");
        Ok(user)
    }

    pub async fn set_role(
        &self,
        actor: &Actor,
        user_id: i32,
        role: Role,
    ) -> Result<users::Model, ServiceError> {
        authorize(actor, &Action::ManageUsers)?;

        let user = find_user(&self.db, user_id).await?;
        let previous = user.role.clone();
        let mut active: users::ActiveModel = user.into();
        active.role = Set(role.to_string());
        let user = active.update(&self.db).await?;

        info!(user_id = user.id, from = %previous, to = %user.role, "Role changed");
        Ok(user)
    }
}
