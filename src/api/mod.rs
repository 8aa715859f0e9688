use crate::models::{Category, Item, ItemOrderEntry, LearningPath};
use crate::storage::load_token_from_storage;
use crate::sync::HierarchyBackend;
use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ApiErrorKind {
    Unauthorized,
    Network,
    Http,
    Parse,
}

#[derive(Clone, Debug, thiserror::Error)]
#[error("{message}")]
pub(crate) struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
}

impl ApiError {
    fn network(e: reqwest::Error) -> Self {
        Self {
            kind: ApiErrorKind::Network,
            message: e.to_string(),
        }
    }

    fn parse(e: impl std::fmt::Display) -> Self {
        Self {
            kind: ApiErrorKind::Parse,
            message: e.to_string(),
        }
    }

    fn unauthorized() -> Self {
        Self {
            kind: ApiErrorKind::Unauthorized,
            message: "Unauthorized".to_string(),
        }
    }

    pub(crate) fn http(status: reqwest::StatusCode, body: String, ctx: &str) -> Self {
        Self {
            kind: ApiErrorKind::Http,
            message: format!("{ctx} ({status}): {body}"),
        }
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;

const DEFAULT_API_URL: &str = "http://localhost:6689";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub(crate) struct EnvConfig {
    pub api_url: String,

    /// Re-fetch the whole hierarchy after every confirmed order save, so
    /// server-side side effects (e.g. id reassignment) show up.
    pub refetch_after_save: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            refetch_after_save: false,
        }
    }
}

impl EnvConfig {
    /// Read `window.ENV`.
    ///
    /// Both the upper-case (`API_URL`) and lower-case (`api_url`) spellings are
    /// accepted; upper-case wins.
    pub fn from_window() -> Self {
        let mut cfg = Self::default();

        let Some(env) = web_sys::window()
            .and_then(|w| w.get("ENV"))
            .filter(|env| !env.is_undefined() && env.is_object())
        else {
            return cfg;
        };

        let get = |keys: [&str; 2]| {
            keys.iter().find_map(|k| {
                js_sys::Reflect::get(&env, &(*k).into())
                    .ok()
                    .and_then(|v| {
                        v.as_string()
                            .or_else(|| v.as_bool().map(|b| b.to_string()))
                    })
            })
        };

        if let Some(url) = get(["API_URL", "api_url"]) {
            cfg.api_url = url;
        }
        if let Some(flag) = get(["REFETCH_AFTER_SAVE", "refetch_after_save"]) {
            cfg.refetch_after_save = parse_flag(&flag);
        }

        cfg
    }
}

pub(crate) fn parse_flag(v: &str) -> bool {
    matches!(
        v.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct CategoryOrderRequest {
    pub category_ids: Vec<i64>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub(crate) struct ItemOrderRequest {
    pub items: Vec<ItemOrderEntry>,
}

#[derive(Clone)]
pub(crate) struct ApiClient {
    pub(crate) base_url: String,
    pub(crate) token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn load_from_storage(config: &EnvConfig) -> Self {
        let mut client = Self::new(config.api_url.clone());
        client.token = load_token_from_storage();
        client
    }

    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn get_auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn builder(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut req = reqwest::Client::new().request(method, self.url(path));
        if let Some(header) = self.get_auth_header() {
            req = req.header("Authorization", header);
        }
        req
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&impl Serialize>,
        ctx: &str,
    ) -> ApiResult<reqwest::Response> {
        let mut req = self.builder(method, path);
        if let Some(b) = body {
            req = req.json(b);
        }

        let res = req.send().await.map_err(ApiError::network)?;

        if res.status().is_success() {
            Ok(res)
        } else if res.status().as_u16() == 401 {
            Err(ApiError::unauthorized())
        } else {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            Err(ApiError::http(status, body, ctx))
        }
    }

    async fn request_json(&self, path: &str, ctx: &str) -> ApiResult<serde_json::Value> {
        let res = self.send(Method::GET, path, None::<&()>, ctx).await?;
        res.json().await.map_err(ApiError::parse)
    }

    /// Mutations only care about the status; the body (if any) is ignored.
    async fn request_empty(
        &self,
        method: Method,
        path: &str,
        body: Option<&impl Serialize>,
        ctx: &str,
    ) -> ApiResult<()> {
        self.send(method, path, body, ctx).await.map(|_| ())
    }

    pub async fn get_learning_path(&self, learning_path_id: i64) -> ApiResult<LearningPath> {
        let data = self
            .request_json(
                &format!("/learning-paths/{learning_path_id}"),
                "Failed to load learning path",
            )
            .await?;
        Self::parse_learning_path_response(data)
    }

    pub async fn get_category_items(&self, category_id: i64) -> ApiResult<Vec<Item>> {
        let data = self
            .request_json(
                &format!("/categories/{category_id}/items"),
                "Failed to load category items",
            )
            .await?;
        Self::parse_item_list_response(data)
    }

    pub async fn save_category_order(
        &self,
        learning_path_id: i64,
        category_ids: &[i64],
    ) -> ApiResult<()> {
        self.request_empty(
            Method::PUT,
            &format!("/learning-paths/{learning_path_id}/categories/order"),
            Some(&CategoryOrderRequest {
                category_ids: category_ids.to_vec(),
            }),
            "Failed to save category order",
        )
        .await
    }

    pub async fn save_item_order(
        &self,
        learning_path_id: i64,
        category_id: i64,
        items: &[ItemOrderEntry],
    ) -> ApiResult<()> {
        self.request_empty(
            Method::PUT,
            &format!("/learning-paths/{learning_path_id}/categories/{category_id}/items/order"),
            Some(&ItemOrderRequest {
                items: items.to_vec(),
            }),
            "Failed to save item order",
        )
        .await
    }

    pub async fn remove_reading(&self, learning_path_id: i64, reading_id: i64) -> ApiResult<()> {
        self.request_empty(
            Method::DELETE,
            &format!("/learning-paths/{learning_path_id}/readings/{reading_id}"),
            None::<&()>,
            "Failed to delete reading",
        )
        .await
    }

    pub async fn remove_game(&self, learning_path_id: i64, game_id: i64) -> ApiResult<()> {
        self.request_empty(
            Method::DELETE,
            &format!("/learning-paths/{learning_path_id}/games/{game_id}"),
            None::<&()>,
            "Failed to delete game",
        )
        .await
    }

    /// Accepts the learning path either bare or wrapped in `data`.
    pub(crate) fn parse_learning_path_response(data: serde_json::Value) -> ApiResult<LearningPath> {
        let inner = match data.get("data") {
            Some(v) if v.is_object() => v.clone(),
            _ => data,
        };
        serde_json::from_value::<LearningPath>(inner).map_err(ApiError::parse)
    }

    /// Accepts a bare array, or an object holding the array under `items`
    /// or `data`. Entries that do not parse as items are skipped.
    pub(crate) fn parse_item_list_response(data: serde_json::Value) -> ApiResult<Vec<Item>> {
        let list = if data.is_array() {
            data
        } else {
            match data.get("items").or_else(|| data.get("data")) {
                Some(v) if v.is_array() => v.clone(),
                _ => return Err(ApiError::parse(format!("unexpected item list: {data}"))),
            }
        };

        let raw = list.as_array().cloned().unwrap_or_default();
        let mut out: Vec<Item> = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_value::<Item>(entry) {
                Ok(item) => out.push(item),
                Err(e) => tracing::warn!(error = %e, "skipping malformed item"),
            }
        }
        Ok(out)
    }
}

impl HierarchyBackend for ApiClient {
    async fn fetch_hierarchy(&self, learning_path_id: i64) -> ApiResult<Vec<Category>> {
        self.get_learning_path(learning_path_id)
            .await
            .map(|lp| lp.categories)
    }

    async fn persist_category_order(
        &self,
        learning_path_id: i64,
        ordered_category_ids: &[i64],
    ) -> ApiResult<()> {
        self.save_category_order(learning_path_id, ordered_category_ids)
            .await
    }

    async fn persist_item_order(
        &self,
        learning_path_id: i64,
        category_id: i64,
        ordered_items: &[ItemOrderEntry],
    ) -> ApiResult<()> {
        self.save_item_order(learning_path_id, category_id, ordered_items)
            .await
    }

    async fn fetch_category_items(&self, category_id: i64) -> ApiResult<Vec<Item>> {
        self.get_category_items(category_id).await
    }

    async fn delete_reading(&self, learning_path_id: i64, reading_id: i64) -> ApiResult<()> {
        self.remove_reading(learning_path_id, reading_id).await
    }

    async fn delete_game(&self, learning_path_id: i64, game_id: i64) -> ApiResult<()> {
        self.remove_game(learning_path_id, game_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_learning_path_contract_deserialize() {
        let json = serde_json::json!({
            "id": 3,
            "name": "Phonics",
            "difficulty_level": "beginner",
            "categories": [{
                "category_id": 9,
                "category_name": "Vowels",
                "items": [
                    {"id": 1, "sequence_order": 1, "is_active": true, "name": "A",
                     "reading_id": 40, "game_id": null, "prerequisite_reading_id": null},
                    {"id": 2, "sequence_order": 2, "is_active": false, "name": "A game",
                     "reading_id": null, "game_id": 70, "prerequisite_reading_id": 40}
                ]
            }]
        });

        let lp = ApiClient::parse_learning_path_response(json).expect("should parse");
        assert_eq!(lp.id, 3);
        assert_eq!(lp.difficulty_level.as_deref(), Some("beginner"));
        let items = &lp.categories[0].items;
        assert!(items[0].is_reading());
        assert!(items[1].is_game_of(40));
        assert!(!items[1].is_active);
    }

    #[test]
    fn test_learning_path_accepts_data_envelope() {
        let json = serde_json::json!({"data": {"id": 3, "categories": []}});
        let lp = ApiClient::parse_learning_path_response(json).expect("should parse");
        assert_eq!(lp.id, 3);
        assert!(lp.categories.is_empty());
    }

    #[test]
    fn test_item_list_shapes() {
        let item = serde_json::json!({"id": 1, "sequence_order": 1, "reading_id": 4});

        let bare = serde_json::json!([item.clone()]);
        let wrapped = serde_json::json!({"items": [item.clone()]});
        let data = serde_json::json!({"data": [item, {"bogus": true}]});

        for v in [bare, wrapped, data] {
            let items = ApiClient::parse_item_list_response(v).expect("should parse");
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].reading_id, Some(4));
            assert!(items[0].is_active);
        }

        let err = ApiClient::parse_item_list_response(serde_json::json!({"nope": 1}))
            .expect_err("should reject");
        assert_eq!(err.kind, ApiErrorKind::Parse);
    }

    #[test]
    fn test_item_order_request_serializes_nulls() {
        let req = ItemOrderRequest {
            items: vec![ItemOrderEntry {
                reading_id: None,
                game_id: Some(5),
                sequence_order: 2,
            }],
        };
        let v = serde_json::to_value(req).expect("should serialize");
        assert!(v["items"][0]["reading_id"].is_null());
        assert_eq!(v["items"][0]["game_id"], 5);
        assert_eq!(v["items"][0]["sequence_order"], 2);
    }

    #[test]
    fn test_api_client_new_trims_trailing_slash() {
        let client = ApiClient::new("http://localhost:6689/".to_string());
        assert_eq!(client.base_url, "http://localhost:6689");
        assert_eq!(client.url("/categories/1/items"), "http://localhost:6689/categories/1/items");
        assert!(client.token.is_none());
    }

    #[test]
    fn test_api_client_get_auth_header() {
        let mut client = ApiClient::new("http://localhost:6689".to_string());
        assert!(client.get_auth_header().is_none());
        assert!(!client.is_authenticated());

        client.set_token("my-jwt-token".to_string());
        assert_eq!(client.get_auth_header().as_deref(), Some("Bearer my-jwt-token"));
        assert!(client.is_authenticated());
    }

    #[test]
    fn test_parse_flag() {
        for v in ["1", "true", "TRUE", " yes ", "on"] {
            assert!(parse_flag(v), "{v:?}");
        }
        for v in ["", "0", "false", "no", "maybe"] {
            assert!(!parse_flag(v), "{v:?}");
        }
    }

    #[test]
    fn test_env_config_default() {
        let cfg = EnvConfig::default();
        assert_eq!(cfg.api_url, "http://localhost:6689");
        assert!(!cfg.refetch_after_save);
    }

    #[test]
    fn test_api_error_display_uses_message() {
        let e = ApiError::http(
            reqwest::StatusCode::CONFLICT,
            "stale order".to_string(),
            "Failed to save item order",
        );
        assert_eq!(e.kind, ApiErrorKind::Http);
        assert_eq!(e.to_string(), "Failed to save item order (409 Conflict): stale order");
    }
}
