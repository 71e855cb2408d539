//! Integration tests for the Redthread storefront.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p redthread-integration-tests
//! ```
//!
//! No external services are needed: the cart store is driven with in-memory
//! storage and [`FakeCatalog`]; the HTTP tests either point the backend
//! client at an address where nothing listens, or at a [`MockBackend`]
//! served on a local port.
//!
//! # Test Categories
//!
//! - `cart_store` - cart operations through the library API
//! - `http_cart` - the JSON routes with the backend down
//! - `http_session` - carts carried by the session cookie, checkout and
//!   product browsing against the mock backend

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use redthread_core::{OrderId, Price, ProductId};
use redthread_storefront::backend::{BackendError, Product, ProductCatalog};
use redthread_storefront::config::{ConfigError, StorefrontConfig};
use redthread_storefront::state::AppState;
use serde_json::{Value, json};
use tokio::sync::Mutex;

/// Access token the mock auth API accepts.
pub const MOCK_TOKEN: &str = "mock-access-token";

/// User the mock auth API resolves [`MOCK_TOKEN`] to.
pub const MOCK_USER_ID: &str = "16fd2706-8baf-433b-82eb-8c7fada847da";

/// Email on the mock user's account.
pub const MOCK_USER_EMAIL: &str = "sam@redthread.test";

/// A second, non-admin profile known to the mock backend.
pub const MOCK_OTHER_USER_ID: &str = "7c9e6679-7425-40de-944b-e07fc1f90ae7";

/// In-memory product catalog that counts lookups.
#[derive(Clone, Default)]
pub struct FakeCatalog {
    products: Arc<HashMap<ProductId, Product>>,
    lookups: Arc<AtomicUsize>,
}

impl FakeCatalog {
    /// A catalog holding `products`.
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: Arc::new(products.into_iter().map(|p| (p.id, p)).collect()),
            lookups: Arc::default(),
        }
    }

    /// Number of lookups served so far, hits and misses alike.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl ProductCatalog for FakeCatalog {
    async fn product(&self, id: ProductId) -> Result<Product, BackendError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.products
            .get(&id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("Product not found: {id}")))
    }
}

/// A product fixture priced in cents.
#[must_use]
pub fn product(name: &str, cents: u32, sizes: &[&str]) -> Product {
    Product {
        id: ProductId::generate(),
        name: name.to_string(),
        description: None,
        price: Price::from_cents(cents),
        images: vec![format!("https://cdn.redthread.test/{}.jpg", name.to_lowercase())],
        stock: Some(25),
        sizes: sizes.iter().map(|s| (*s).to_string()).collect(),
        category: Some("men".to_string()),
        featured: false,
        created_at: None,
    }
}

/// Configuration talking to the backend at `backend_url`.
///
/// # Errors
///
/// Returns an error if the variables fail validation.
pub fn config_for(backend_url: &str) -> Result<StorefrontConfig, ConfigError> {
    let vars: HashMap<&str, &str> = HashMap::from([
        ("STOREFRONT_BASE_URL", "http://localhost:3000"),
        ("BACKEND_URL", backend_url),
        ("BACKEND_ANON_KEY", "eyJhbGciOiJIUzI1NiJ9.Qm7xR2vK9pL4sT8wZ1nC5yE3"),
        ("BACKEND_TIMEOUT_SECS", "2"),
    ]);
    StorefrontConfig::from_lookup(|key| vars.get(key).map(|v| (*v).to_string()))
}

/// Configuration whose backend refuses every connection.
///
/// # Errors
///
/// Returns an error if the fixed variables fail validation.
pub fn offline_config() -> Result<StorefrontConfig, ConfigError> {
    config_for("http://127.0.0.1:9")
}

/// Application state over [`offline_config`].
///
/// # Errors
///
/// Returns an error if the configuration or the backend client cannot be
/// built.
pub fn offline_state() -> Result<AppState, Box<dyn std::error::Error>> {
    Ok(AppState::new(offline_config()?)?)
}

// =============================================================================
// Mock backend
// =============================================================================

#[derive(Clone)]
struct MockState {
    products: Arc<Vec<Product>>,
    orders: Arc<Mutex<Vec<Value>>>,
    profiles: Arc<Mutex<Vec<Value>>>,
}

/// A stand-in for the hosted backend's REST and auth APIs.
///
/// Serves products, orders and profiles under `/rest/v1/` (honoring
/// `id=eq.` filters and reporting row counts in `Content-Range`) and
/// `GET /auth/v1/user`, which accepts only [`MOCK_TOKEN`]. The token's user
/// is an admin; [`MOCK_OTHER_USER_ID`] is not. Inserted orders are kept for
/// inspection.
pub struct MockBackend {
    url: String,
    orders: Arc<Mutex<Vec<Value>>>,
}

impl MockBackend {
    /// Serve `products` on a free local port.
    ///
    /// # Errors
    ///
    /// Returns an error if no port can be bound.
    pub async fn start(products: Vec<Product>) -> std::io::Result<Self> {
        let profiles = vec![
            json!({"id": MOCK_USER_ID, "name": "Sam Rivera", "email": MOCK_USER_EMAIL, "is_admin": true}),
            json!({"id": MOCK_OTHER_USER_ID, "name": "Alex Kim", "email": "alex@redthread.test", "is_admin": false}),
        ];
        let state = MockState {
            products: Arc::new(products),
            orders: Arc::default(),
            profiles: Arc::new(Mutex::new(profiles)),
        };
        let orders = Arc::clone(&state.orders);

        let router = Router::new()
            .route("/rest/v1/products", get(mock_products))
            .route("/rest/v1/orders", get(mock_orders).post(mock_insert_order))
            .route("/rest/v1/profiles", get(mock_profiles).patch(mock_update_profile))
            .route("/auth/v1/user", get(mock_auth_user))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "Mock backend stopped");
            }
        });

        Ok(Self { url, orders })
    }

    /// Base URL to configure the storefront with.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Application state wired to this backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration or the client cannot be built.
    pub fn state(&self) -> Result<AppState, Box<dyn std::error::Error>> {
        Ok(AppState::new(config_for(&self.url)?)?)
    }

    /// Order rows inserted so far.
    pub async fn orders(&self) -> Vec<Value> {
        self.orders.lock().await.clone()
    }
}

/// The ID an `id=eq.<id>` filter asks for, if any.
fn id_filter(params: &HashMap<String, String>) -> Option<&str> {
    params.get("id").and_then(|f| f.strip_prefix("eq."))
}

/// A JSON row listing with its `Content-Range` count. `GET` handlers also
/// answer `HEAD`, which is how the storefront counts rows.
fn rows_response(rows: &[Value]) -> Response {
    let range = match rows.len() {
        0 => "*/0".to_string(),
        n => format!("0-{}/{n}", n - 1),
    };
    ([(header::CONTENT_RANGE, range)], Json(rows)).into_response()
}

async fn mock_products(
    State(mock): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let wanted = id_filter(&params);
    let rows: Vec<Value> = mock
        .products
        .iter()
        .filter(|p| wanted.is_none_or(|id| p.id.to_string() == id))
        .map(|p| json!(p))
        .collect();
    rows_response(&rows)
}

async fn mock_orders(State(mock): State<MockState>) -> Response {
    let orders = mock.orders.lock().await;
    rows_response(orders.as_slice())
}

async fn mock_profiles(
    State(mock): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let wanted = id_filter(&params);
    let rows: Vec<Value> = mock
        .profiles
        .lock()
        .await
        .iter()
        .filter(|p| wanted.is_none_or(|id| p["id"] == id))
        .cloned()
        .collect();
    rows_response(&rows)
}

async fn mock_update_profile(
    State(mock): State<MockState>,
    Query(params): Query<HashMap<String, String>>,
    Json(changes): Json<Value>,
) -> Json<Vec<Value>> {
    let wanted = id_filter(&params).unwrap_or_default().to_string();
    let mut profiles = mock.profiles.lock().await;
    let mut updated = Vec::new();
    for profile in profiles.iter_mut().filter(|p| p["id"] == wanted.as_str()) {
        if let (Some(fields), Some(changes)) = (profile.as_object_mut(), changes.as_object()) {
            fields.extend(changes.clone());
        }
        updated.push(profile.clone());
    }
    Json(updated)
}

async fn mock_insert_order(
    State(mock): State<MockState>,
    Json(rows): Json<Vec<Value>>,
) -> (StatusCode, Json<Vec<Value>>) {
    let stored: Vec<Value> = rows
        .into_iter()
        .map(|mut row| {
            if let Some(fields) = row.as_object_mut() {
                fields.insert("id".to_string(), json!(OrderId::generate()));
                fields.insert("created_at".to_string(), json!("2024-06-01T12:00:00Z"));
            }
            row
        })
        .collect();
    mock.orders.lock().await.extend(stored.iter().cloned());
    (StatusCode::CREATED, Json(stored))
}

async fn mock_auth_user(headers: HeaderMap) -> Response {
    let expected = format!("Bearer {MOCK_TOKEN}");
    match headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => {
            Json(json!({ "id": MOCK_USER_ID, "email": MOCK_USER_EMAIL })).into_response()
        }
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}
