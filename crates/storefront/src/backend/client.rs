//! REST client implementation for the hosted backend.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use redthread_core::{OrderId, OrderStatus, ProductId, UserId};

use super::types::{AdminFlag, AuthUser, AuthUserResponse, NewOrder, Order, Product, Profile};
use super::{BackendError, OrderSink, ProductCatalog};
use crate::catalog::ProductQuery;
use crate::config::BackendConfig;

/// How long a resolved bearer token is trusted before asking the auth API again.
const USER_CACHE_TTL: Duration = Duration::from_secs(60);

/// Maximum number of response-body characters kept in errors and logs.
const BODY_SNIPPET_LEN: usize = 200;

/// Client for the backend's REST data API and auth API.
///
/// Cheap to clone; all clones share the HTTP connection pool and caches.
#[derive(Clone)]
pub struct BackendClient {
    inner: Arc<BackendClientInner>,
}

struct BackendClientInner {
    client: reqwest::Client,
    base_url: Url,
    anon_key: SecretString,
    products: Cache<ProductId, Product>,
    users: Cache<String, AuthUser>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        let products = Cache::builder()
            .max_capacity(1000)
            .time_to_live(config.product_cache_ttl)
            .build();

        let users = Cache::builder()
            .max_capacity(10_000)
            .time_to_live(USER_CACHE_TTL)
            .build();

        Ok(Self {
            inner: Arc::new(BackendClientInner {
                client,
                base_url: config.url.clone(),
                anon_key: config.anon_key.clone(),
                products,
                users,
            }),
        })
    }

    /// Build an API URL below the configured base URL.
    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, BackendError> {
        let mut url = self.inner.base_url.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Start a request carrying the project key and a bearer token.
    ///
    /// Without a user token the anonymous key doubles as the bearer.
    fn request(&self, method: Method, url: Url, bearer: Option<&SecretString>) -> RequestBuilder {
        let token = bearer.unwrap_or(&self.inner.anon_key);
        self.inner
            .client
            .request(method, url)
            .header("apikey", self.inner.anon_key.expose_secret())
            .bearer_auth(token.expose_secret())
    }

    /// Send a request and decode a JSON response body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }

        let body = response.text().await?;

        if !status.is_success() {
            let message: String = body.chars().take(BODY_SNIPPET_LEN).collect();
            tracing::error!(status = %status, body = %message, "Backend returned non-success status");
            return Err(BackendError::Status {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                body = %body.chars().take(BODY_SNIPPET_LEN).collect::<String>(),
                "Failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    /// Check that the REST API is reachable with the configured key.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend answers with a
    /// non-success status.
    pub async fn ping(&self) -> Result<(), BackendError> {
        let url = self.endpoint("rest/v1/", &[])?;
        let response = self.request(Method::GET, url, None).send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(BackendError::Status {
                status: status.as_u16(),
                message: "health check failed".to_string(),
            })
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Fetch a product by ID, consulting the local cache first.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if no product has this ID, or
    /// another error if the request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, BackendError> {
        if let Some(product) = self.inner.products.get(&id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let filter = format!("eq.{id}");
        let url = self.endpoint("rest/v1/products", &[("id", &filter), ("select", "*")])?;
        let rows: Vec<Product> = self.send(self.request(Method::GET, url, None)).await?;

        let product = rows
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("Product not found: {id}")))?;

        self.inner.products.insert(id, product.clone()).await;

        Ok(product)
    }

    /// List products for the catalog page, filtered and sorted by the
    /// backend, then narrowed by the text search.
    ///
    /// Every returned row also primes the product cache used by the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(category = ?query.category, sort = ?query.sort))]
    pub async fn list_products(&self, query: &ProductQuery) -> Result<Vec<Product>, BackendError> {
        let params = query.backend_params();
        let pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let url = self.endpoint("rest/v1/products", &pairs)?;
        let rows: Vec<Product> = self.send(self.request(Method::GET, url, None)).await?;

        for product in &rows {
            self.inner.products.insert(product.id, product.clone()).await;
        }

        Ok(query.apply(rows))
    }

    /// Products flagged as featured, for the home page.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn featured_products(&self, limit: usize) -> Result<Vec<Product>, BackendError> {
        let limit = limit.to_string();
        let url = self.endpoint(
            "rest/v1/products",
            &[("select", "*"), ("featured", "eq.true"), ("limit", &limit)],
        )?;
        self.send(self.request(Method::GET, url, None)).await
    }

    /// Count the rows of a table visible to the caller, without fetching them.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend does not report
    /// a total.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn count_rows(&self, user: &AuthUser, table: &str) -> Result<u64, BackendError> {
        let url = self.endpoint(&format!("rest/v1/{table}"), &[("select", "id")])?;
        let response = self
            .request(Method::HEAD, url, Some(&user.access_token))
            .header("Prefer", "count=exact")
            .send()
            .await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
                message: format!("count of {table} failed"),
            });
        }

        response
            .headers()
            .get("Content-Range")
            .and_then(|v| v.to_str().ok())
            .and_then(content_range_total)
            .ok_or_else(|| BackendError::Status {
                status: status.as_u16(),
                message: format!("count of {table} missing Content-Range"),
            })
    }

    // =========================================================================
    // Auth & Profiles
    // =========================================================================

    /// Resolve a bearer token into the user it belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Unauthorized`] if the token is invalid or
    /// expired.
    #[instrument(skip_all)]
    pub async fn user_from_token(&self, token: &str) -> Result<AuthUser, BackendError> {
        if let Some(user) = self.inner.users.get(token).await {
            return Ok(user);
        }

        let access_token = SecretString::from(token);
        let url = self.endpoint("auth/v1/user", &[])?;
        let response: AuthUserResponse = self
            .send(self.request(Method::GET, url, Some(&access_token)))
            .await?;

        let user = AuthUser {
            id: response.id,
            email: response.email,
            access_token,
        };
        self.inner.users.insert(token.to_owned(), user.clone()).await;

        Ok(user)
    }

    /// Fetch the caller's profile row.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if the user has no profile.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn profile(&self, user: &AuthUser) -> Result<Profile, BackendError> {
        let filter = format!("eq.{}", user.id);
        let url = self.endpoint("rest/v1/profiles", &[("id", &filter), ("select", "*")])?;
        let rows: Vec<Profile> = self
            .send(self.request(Method::GET, url, Some(&user.access_token)))
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("Profile not found: {}", user.id)))
    }

    /// List every profile, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn list_profiles(&self, admin: &AuthUser) -> Result<Vec<Profile>, BackendError> {
        let url = self.endpoint(
            "rest/v1/profiles",
            &[("select", "*"), ("order", "created_at.desc")],
        )?;
        self.send(self.request(Method::GET, url, Some(&admin.access_token)))
            .await
    }

    /// Grant or revoke a user's admin flag.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if no profile with this ID is
    /// visible to the caller.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id, user_id = %user_id))]
    pub async fn set_admin(
        &self,
        admin: &AuthUser,
        user_id: UserId,
        is_admin: bool,
    ) -> Result<Profile, BackendError> {
        let filter = format!("eq.{user_id}");
        let url = self.endpoint("rest/v1/profiles", &[("id", &filter)])?;
        let request = self
            .request(Method::PATCH, url, Some(&admin.access_token))
            .header("Prefer", "return=representation")
            .json(&AdminFlag { is_admin });
        let rows: Vec<Profile> = self.send(request).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("Profile not found: {user_id}")))
    }

    // =========================================================================
    // Orders
    // =========================================================================

    /// Insert a new order row.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the insert.
    #[instrument(skip(self, user, order), fields(user_id = %user.id, items = order.items.len()))]
    pub async fn insert_order(&self, user: &AuthUser, order: &NewOrder) -> Result<Order, BackendError> {
        let url = self.endpoint("rest/v1/orders", &[])?;
        let request = self
            .request(Method::POST, url, Some(&user.access_token))
            .header("Prefer", "return=representation")
            .json(&[order]);
        let rows: Vec<Order> = self.send(request).await?;

        rows.into_iter().next().ok_or_else(|| BackendError::Status {
            status: 201,
            message: "insert returned no rows".to_string(),
        })
    }

    /// List the caller's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn orders_for_user(&self, user: &AuthUser) -> Result<Vec<Order>, BackendError> {
        let filter = format!("eq.{}", user.id);
        let url = self.endpoint(
            "rest/v1/orders",
            &[
                ("user_id", &filter),
                ("select", "*"),
                ("order", "created_at.desc"),
            ],
        )?;
        self.send(self.request(Method::GET, url, Some(&user.access_token)))
            .await
    }

    /// List every order with the customer's name and email, newest first.
    ///
    /// Only returns rows the caller may see; admins see all of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id))]
    pub async fn list_orders(&self, admin: &AuthUser) -> Result<Vec<Order>, BackendError> {
        let url = self.endpoint(
            "rest/v1/orders",
            &[
                ("select", "*,profiles(name,email)"),
                ("order", "created_at.desc"),
            ],
        )?;
        self.send(self.request(Method::GET, url, Some(&admin.access_token)))
            .await
    }

    /// Move an order to a new status.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::NotFound`] if no order with this ID is visible
    /// to the caller.
    #[instrument(skip(self, admin), fields(admin_id = %admin.id, order_id = %order_id, status = %status))]
    pub async fn update_order_status(
        &self,
        admin: &AuthUser,
        order_id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, BackendError> {
        let filter = format!("eq.{order_id}");
        let url = self.endpoint("rest/v1/orders", &[("id", &filter)])?;
        let request = self
            .request(Method::PATCH, url, Some(&admin.access_token))
            .header("Prefer", "return=representation")
            .json(&serde_json::json!({ "status": status }));
        let rows: Vec<Order> = self.send(request).await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("Order not found: {order_id}")))
    }
}

/// Total from a `Content-Range` header such as `0-24/318` or `*/0`.
fn content_range_total(value: &str) -> Option<u64> {
    value.rsplit_once('/')?.1.trim().parse().ok()
}

impl ProductCatalog for BackendClient {
    async fn product(&self, id: ProductId) -> Result<Product, BackendError> {
        self.get_product(id).await
    }
}

impl OrderSink for BackendClient {
    async fn create_order(&self, user: &AuthUser, order: &NewOrder) -> Result<Order, BackendError> {
        self.insert_order(user, order).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn client(base: &str) -> BackendClient {
        BackendClient::new(&BackendConfig {
            url: Url::parse(base).unwrap(),
            anon_key: SecretString::from("k3yMaterial-9fQ2"),
            timeout: Duration::from_secs(5),
            product_cache_ttl: Duration::from_secs(300),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_below_base() {
        let client = client("https://project.backend.test/");
        let url = client
            .endpoint("rest/v1/products", &[("id", "eq.42"), ("select", "*")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://project.backend.test/rest/v1/products?id=eq.42&select=*"
        );
    }

    #[test]
    fn test_content_range_total() {
        assert_eq!(content_range_total("0-24/318"), Some(318));
        assert_eq!(content_range_total("*/0"), Some(0));
        assert_eq!(content_range_total("0-24/*"), None);
        assert_eq!(content_range_total("garbage"), None);
    }

    #[test]
    fn test_endpoint_encodes_embedded_select() {
        let client = client("https://project.backend.test/");
        let url = client
            .endpoint("rest/v1/orders", &[("select", "*,profiles(name,email)")])
            .unwrap();
        assert_eq!(
            url.query(),
            Some("select=*%2Cprofiles%28name%2Cemail%29")
        );
    }
}
