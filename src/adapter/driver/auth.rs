use crate::adapter::driver::rest_api::ApiError;
use crate::application::service::Requester;
use crate::domain::model::UserId;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::Json;

/// 認証済みユーザーのエクストラクター
///
/// 認証は外部コラボレーターの責務であり、このコアは上流で検証済みの
/// 識別子を信頼する。コラボレーターは各リクエストに以下のヘッダーを注入する:
/// - `x-user-id`: 検証済みユーザーのUUID
/// - `x-user-role`: `admin` の場合は管理者
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub is_admin: bool,
}

impl AuthenticatedUser {
    /// アプリケーション層の呼び出し元情報に変換
    pub fn requester(&self) -> Requester {
        Requester {
            user_id: self.user_id,
            is_admin: self.is_admin,
        }
    }
}

fn unauthenticated(message: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiError {
            error: message.to_string(),
            code: "UNAUTHENTICATED".to_string(),
        }),
    )
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ApiError>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| unauthenticated("認証情報がありません"))?;

        let user_id = UserId::from_string(user_id)
            .map_err(|_| unauthenticated("無効なユーザーIDです"))?;

        let is_admin = parts
            .headers
            .get("x-user-role")
            .and_then(|value| value.to_str().ok())
            .map(|role| role.eq_ignore_ascii_case("admin"))
            .unwrap_or(false);

        Ok(Self { user_id, is_admin })
    }
}
