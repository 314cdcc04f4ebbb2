use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::config::SecurityConfig;
use crate::db::StoreResult;
use crate::db::repositories::user::hash_password_blocking;
use crate::entities::{prelude::*, superuser_invites, users};
use crate::models::{Invite, User};

pub struct InviteRepository {
    conn: DatabaseConnection,
}

impl InviteRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(
        &self,
        token: &str,
        email: &str,
        invited_by: i32,
        expires_at: DateTime<Utc>,
    ) -> StoreResult<Invite> {
        let active = superuser_invites::ActiveModel {
            token: Set(token.to_string()),
            email: Set(email.to_string()),
            invited_by: Set(invited_by),
            expires_at: Set(expires_at),
            used_at: Set(None),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let model = active.insert(&self.conn).await?;
        Ok(Invite::from(model))
    }

    pub async fn get_by_token(&self, token: &str) -> StoreResult<Option<Invite>> {
        let invite = SuperuserInvites::find()
            .filter(superuser_invites::Column::Token.eq(token))
            .one(&self.conn)
            .await?;

        Ok(invite.map(Invite::from))
    }

    /// Claims the invite and creates the invited superuser in one
    /// transaction. Returns `Ok(None)` when the token is unknown, already
    /// used or expired; the claim is a conditional update, so two concurrent
    /// redemptions cannot both succeed.
    pub async fn redeem(
        &self,
        token: &str,
        username: &str,
        password: &str,
        security: &SecurityConfig,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<User>> {
        let password_hash = hash_password_blocking(password, security).await?;

        let txn = self.conn.begin().await?;

        let claimed = SuperuserInvites::update_many()
            .col_expr(superuser_invites::Column::UsedAt, Expr::value(now))
            .filter(superuser_invites::Column::Token.eq(token))
            .filter(superuser_invites::Column::UsedAt.is_null())
            .filter(superuser_invites::Column::ExpiresAt.gt(now))
            .exec(&txn)
            .await?;

        if claimed.rows_affected != 1 {
            txn.rollback().await?;
            return Ok(None);
        }

        let Some(invite) = SuperuserInvites::find()
            .filter(superuser_invites::Column::Token.eq(token))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let active = users::ActiveModel {
            username: Set(username.to_string()),
            email: Set(invite.email),
            password_hash: Set(password_hash),
            is_superuser: Set(true),
            is_verified: Set(false),
            otp: Set(None),
            otp_expires_at: Set(None),
            otp_attempts: Set(0),
            created_at: Set(now),
            ..Default::default()
        };

        // A unique violation here drops `txn`, which rolls the claim back.
        let model = active.insert(&txn).await?;
        txn.commit().await?;

        Ok(Some(User::from(model)))
    }
}
