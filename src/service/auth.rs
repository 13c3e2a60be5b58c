//! Auth token issuance and freshness checks.

use crate::error::{AppError, ErrorKind};
use crate::hashword::{constant_time_eq_str, is_match};
use crate::record::{Record, Slot};
use crate::service::base::{ServiceCore, ServiceSpec, Table};
use crate::service::{Method, Outcome, Params, Route, Secret, Service};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;

pub const AUTH_SERVICE: ServiceSpec = ServiceSpec {
    route: Route::Auth,
    secure_methods: &[Method::Post],
    all_methods: &[Method::Options, Method::Get, Method::Post],
};

/// The master credential and how long an issued token stays valid.
#[derive(Clone, Debug)]
pub struct AuthSettings {
    pub master_user_id: String,
    pub master_hashword: Secret,
    pub fresh_limit_ms: i64,
}

#[derive(Clone)]
pub struct AuthService {
    core: ServiceCore,
    settings: Arc<AuthSettings>,
}

fn str_field<'a>(rec: &'a Record, field: &str) -> Option<&'a str> {
    rec.get(field).and_then(Value::as_str)
}

impl AuthService {
    pub fn new(table: Arc<Table>, settings: Arc<AuthSettings>, is_secure: bool) -> Self {
        Self {
            core: ServiceCore::new(AUTH_SERVICE, table, is_secure),
            settings,
        }
    }

    fn is_fresh(&self, rec: &Record) -> bool {
        let created = rec.get("createdAt").and_then(Value::as_i64).unwrap_or(i64::MIN);
        created > chrono::Utc::now().timestamp_millis() - self.settings.fresh_limit_ms
    }

    /// Looks up an auth record by authToken, then userID, then id. Stale
    /// records are deleted and reported as needing reauthentication.
    pub async fn get(&self, params: Params) -> Outcome {
        let this = self.clone();
        let (token, user_id, id) = (params.auth_token.clone(), params.user_id.clone(), params.id);
        self.core
            .perform_after_security_checks(Method::Get, params, move || async move {
                if token.is_none() && user_id.is_none() && id.is_none() {
                    return Err(AppError::ParameterType(
                        "expecting an authToken, a userID or an id.".into(),
                    ));
                }
                let model = this.core.model();
                let records = model.read(1, None).await?;
                let found = records.into_iter().find(|rec| match (&token, &user_id) {
                    (Some(token), user) => {
                        str_field(rec, "authToken").is_some_and(|t| constant_time_eq_str(t, token.expose()))
                            && user.as_deref().map_or(true, |u| str_field(rec, "userID") == Some(u))
                    }
                    (None, Some(user)) => str_field(rec, "userID") == Some(user.as_str()),
                    (None, None) => rec.id(model.schema().primary()) == id,
                });
                let rec = found.ok_or_else(|| AppError::NoRecordsFound("No matching auth record found.".into()))?;
                if this.is_fresh(&rec) {
                    return Ok(Value::Array(vec![rec.into_value()]));
                }
                if let Some(auth_id) = rec.id(model.schema().primary()) {
                    model.delete(auth_id).await?;
                }
                tracing::debug!(user_id = ?str_field(&rec, "userID"), "auth record expired");
                Err(AppError::ReauthenticationRequired(format!(
                    "Reauthentication is required; the time limit is {} ms.",
                    this.settings.fresh_limit_ms
                )))
            })
            .await
    }

    /// Issues a token for the master credential. Needs a secure transport only.
    pub async fn post(&self, params: Params) -> Outcome {
        if let Err(e) = self.core.ensure_secure(Method::Post) {
            return self.core.generate_error(Method::Post, e, &params);
        }
        let result = self.issue(params.user_id.as_deref(), params.plainword.as_ref()).await;
        if let Err(ref e) = result {
            tracing::warn!(kind = %e.kind(), "authentication refused");
        }
        self.core.finish(Method::Post, result, &params)
    }

    async fn issue(&self, user_id: Option<&str>, plainword: Option<&Secret>) -> Result<Value, AppError> {
        let plainword =
            plainword.ok_or_else(|| AppError::ParameterType("expecting password to be a string.".into()))?;
        let master = &self.settings;
        let word_ok = is_match(plainword.expose(), master.master_hashword.expose())?;
        let user_ok = user_id.map_or(true, |u| constant_time_eq_str(u, &master.master_user_id));
        if !(word_ok && user_ok) {
            return Err(AppError::AuthenticationFailed("Authentication has failed.".into()));
        }

        self.prune_stale().await?;
        let model = self.core.model();
        let id = self.core.get_next_id().await?;
        let token = Uuid::new_v4().simple().to_string();
        let mut rec = Record::new();
        rec.set_id(model.schema().primary(), id);
        rec.insert("authToken", token.clone());
        rec.insert("userID", master.master_user_id.clone());
        rec.insert("createdAt", chrono::Utc::now().timestamp_millis());
        let id = model.create(&Slot::Live(rec), Some(id)).await?;
        self.core.set_next_id(id + 1).await;
        Ok(json!({ "id": id, "authToken": token }))
    }

    /// Deletes every auth record past the freshness limit.
    async fn prune_stale(&self) -> Result<(), AppError> {
        let model = self.core.model();
        let records = match model.read(1, None).await {
            Ok(records) => records,
            Err(e) if e.kind() == ErrorKind::NoRecordsFound => return Ok(()),
            Err(e) => return Err(e),
        };
        for rec in records.iter().filter(|rec| !self.is_fresh(rec)) {
            if let Some(auth_id) = rec.id(model.schema().primary()) {
                model.delete(auth_id).await?;
                tracing::debug!(auth_id, "pruned stale auth record");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Service for AuthService {
    fn core(&self) -> &ServiceCore {
        &self.core
    }

    async fn call(&self, method: Method, params: Params) -> Outcome {
        match method {
            Method::Options => self.core.options(&params),
            Method::Get => self.get(params).await,
            Method::Post => self.post(params).await,
            other => self.core.no_such_method(other.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashword::salt_and_hash;
    use crate::model::Model;
    use crate::schema::auth_schema;
    use crate::store::MemoryStore;

    fn service(fresh_limit_ms: i64, is_secure: bool) -> AuthService {
        let model = Model::new(Arc::new(auth_schema().unwrap()), Arc::new(MemoryStore::new()), false);
        let settings = AuthSettings {
            master_user_id: "master".into(),
            master_hashword: Secret::new(salt_and_hash("open sesame").unwrap()),
            fresh_limit_ms,
        };
        AuthService::new(Arc::new(Table::new(model)), Arc::new(settings), is_secure)
    }

    fn login(user: &str, word: &str) -> Params {
        Params {
            user_id: Some(user.into()),
            plainword: Some(Secret::new(word)),
            ..Params::default()
        }
    }

    fn bearer(token: &str) -> Params {
        Params {
            user_id: Some("master".into()),
            auth_token: Some(Secret::new(token)),
            ..Params::default()
        }
    }

    #[tokio::test]
    async fn post_issues_token_and_get_finds_it() {
        let svc = service(60_000, true);
        let out = svc.post(login("master", "open sesame")).await;
        let data = out.data().unwrap().clone();
        assert_eq!(data["id"], json!(1));
        let token = data["authToken"].as_str().unwrap().to_string();
        assert!(!token.is_empty());
        assert_eq!(out.params.plainword, None);

        let found = svc.get(bearer(&token)).await;
        assert_eq!(found.data().unwrap()[0]["userID"], json!("master"));

        let second = svc.post(login("master", "open sesame")).await;
        assert_eq!(second.data().unwrap()["id"], json!(2));
    }

    #[tokio::test]
    async fn post_rejects_bad_credentials() {
        let svc = service(60_000, true);
        let wrong_word = svc.post(login("master", "guess")).await;
        assert_eq!(
            wrong_word.error().unwrap().message(),
            "AuthenticationFailedError: Authentication has failed."
        );
        let wrong_user = svc.post(login("intruder", "open sesame")).await;
        assert_eq!(wrong_user.error_kind(), Some(ErrorKind::AuthenticationFailed));
        let no_word = svc.post(Params::default()).await;
        assert_eq!(no_word.error_kind(), Some(ErrorKind::ParameterType));
    }

    #[tokio::test]
    async fn post_needs_secure_transport() {
        let out = service(60_000, false).post(login("master", "open sesame")).await;
        assert_eq!(out.error_kind(), Some(ErrorKind::InsecureOperation));
    }

    #[tokio::test]
    async fn stale_token_is_deleted() {
        let svc = service(-1, true);
        let token = svc.post(login("master", "open sesame")).await.data().unwrap()["authToken"]
            .as_str()
            .unwrap()
            .to_string();
        let stale = svc.get(bearer(&token)).await;
        assert_eq!(
            stale.error().unwrap().message(),
            "ReauthenticationRequiredError: Reauthentication is required; the time limit is -1 ms."
        );
        let gone = svc.get(bearer(&token)).await;
        assert_eq!(gone.error_kind(), Some(ErrorKind::NoRecordsFound));
    }

    #[tokio::test]
    async fn issuing_prunes_stale_records() {
        let svc = service(-1, true);
        svc.post(login("master", "open sesame")).await;
        let second = svc.post(login("master", "open sesame")).await;
        assert_eq!(second.data().unwrap()["id"], json!(2));

        let left = svc.core.model().read(1, None).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id("authID"), Some(2));
    }

    #[tokio::test]
    async fn get_with_unknown_token_or_nothing() {
        let svc = service(60_000, true);
        svc.post(login("master", "open sesame")).await;
        assert_eq!(svc.get(bearer("nope")).await.error_kind(), Some(ErrorKind::NoRecordsFound));
        assert_eq!(svc.get(Params::default()).await.error_kind(), Some(ErrorKind::ParameterType));
    }
}
