//! Cart route handlers.
//!
//! Each request opens the visitor's cart from the session, applies one
//! operation and lets the store persist it. Mutations answer with the
//! updated cart and an `HX-Trigger: cart-updated` header so the header
//! badge refreshes.

use axum::{
    Json,
    extract::State,
    response::{AppendHeaders, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::instrument;

use redthread_core::{ProductId, Quantity, Size, format_amount};

use crate::backend::BackendClient;
use crate::cart::{Cart, CartError, CartLine, CartStore, SessionCartStorage};
use crate::error::{Result, add_breadcrumb};
use crate::state::AppState;

/// Header telling HTMX listeners that the cart changed.
pub const CART_UPDATED_TRIGGER: (&str, &str) = ("HX-Trigger", "cart-updated");

/// The cart store as used by handlers.
pub type SessionCart = CartStore<SessionCartStorage, BackendClient>;

/// Open the visitor's cart.
pub async fn open_cart(state: &AppState, session: Session) -> SessionCart {
    CartStore::load(SessionCartStorage::new(session), state.backend().clone()).await
}

// =============================================================================
// Views
// =============================================================================

/// One cart line as returned to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub size: Size,
    pub quantity: Quantity,
    pub name: String,
    pub price: String,
    pub line_total: String,
    pub image: Option<String>,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id,
            size: line.size.clone(),
            quantity: line.quantity,
            name: line.name.clone(),
            price: line.price.to_string(),
            line_total: format_amount(line.line_total()),
            image: line.images.first().cloned(),
        }
    }
}

/// The cart as returned to the browser.
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub total: String,
    pub count: u32,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        Self {
            lines: cart.lines().iter().map(CartLineView::from).collect(),
            total: cart.total_display(),
            count: cart.count(),
        }
    }
}

/// Header badge payload.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CartCountView {
    pub count: u32,
}

// =============================================================================
// Requests
// =============================================================================

/// Add to cart request body.
///
/// Without a size the product's first listed size (or "One Size") is used,
/// matching the quick-add button on product cards.
#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
}

/// Update quantity request body.
#[derive(Debug, Deserialize)]
pub struct UpdateCartRequest {
    pub product_id: ProductId,
    pub size: Size,
    pub quantity: i64,
}

/// Remove line request body.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: ProductId,
    pub size: Size,
}

// =============================================================================
// Handlers
// =============================================================================

/// Show the cart.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Json<CartView> {
    let store = open_cart(&state, session).await;
    Json(CartView::from(store.cart()))
}

/// Cart count for the header badge.
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> Json<CartCountView> {
    let store = open_cart(&state, session).await;
    Json(CartCountView {
        count: store.cart_count(),
    })
}

/// Add a product to the cart.
#[instrument(skip(state, session, request), fields(product_id = %request.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<AddToCartRequest>,
) -> Result<impl IntoResponse> {
    let size = match request.size.as_deref() {
        Some(label) => Size::new(label),
        None => state
            .backend()
            .get_product(request.product_id)
            .await
            .map_err(CartError::Lookup)?
            .default_size(),
    };
    let quantity = request.quantity.map_or(Quantity::ONE, Quantity::clamped);

    let mut store = open_cart(&state, session).await;
    store
        .add_to_cart(request.product_id, size.clone(), quantity)
        .await?;

    let product_id = request.product_id.to_string();
    add_breadcrumb(
        "cart",
        "Added to cart",
        &[("product_id", product_id.as_str()), ("size", size.as_str())],
    );

    Ok((
        AppendHeaders([CART_UPDATED_TRIGGER]),
        Json(CartView::from(store.cart())),
    ))
}

/// Set the quantity of a line.
#[instrument(skip(state, session, request), fields(product_id = %request.product_id))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<UpdateCartRequest>,
) -> Result<impl IntoResponse> {
    let mut store = open_cart(&state, session).await;
    store
        .update_cart_item(request.product_id, request.size, request.quantity)
        .await?;

    Ok((
        AppendHeaders([CART_UPDATED_TRIGGER]),
        Json(CartView::from(store.cart())),
    ))
}

/// Remove a line. Removing a line that is not in the cart is not an error,
/// but only an actual removal fires the update trigger.
#[instrument(skip(state, session, request), fields(product_id = %request.product_id))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<RemoveFromCartRequest>,
) -> Response {
    let mut store = open_cart(&state, session).await;
    let removed = store
        .remove_from_cart(request.product_id, request.size)
        .await;

    let body = Json(CartView::from(store.cart()));
    if removed {
        (AppendHeaders([CART_UPDATED_TRIGGER]), body).into_response()
    } else {
        body.into_response()
    }
}

/// Empty the cart.
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let mut store = open_cart(&state, session).await;
    store.clear_cart().await;

    (
        AppendHeaders([CART_UPDATED_TRIGGER]),
        Json(CartView::from(store.cart())),
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::tests::line;

    #[test]
    fn test_cart_view() {
        let cart: Cart = [line(1, "M", 3, 2000), line(2, "", 1, 1500)]
            .into_iter()
            .collect();
        let view = CartView::from(&cart);

        assert_eq!(view.total, "75.00");
        assert_eq!(view.count, 4);
        assert_eq!(view.lines[0].line_total, "60.00");
        assert_eq!(view.lines[0].price, "20.00");
        assert_eq!(view.lines[1].size.as_str(), Size::ONE_SIZE);
        assert_eq!(
            view.lines[0].image.as_deref(),
            Some("https://cdn.test/1.jpg")
        );
    }

    #[test]
    fn test_requests_accept_missing_optionals() {
        let request: AddToCartRequest = serde_json::from_value(serde_json::json!({
            "product_id": "0f8fad5b-d9cb-469f-a165-70867728950e"
        }))
        .unwrap();
        assert!(request.size.is_none());
        assert!(request.quantity.is_none());

        let request: RemoveFromCartRequest = serde_json::from_value(serde_json::json!({
            "product_id": "0f8fad5b-d9cb-469f-a165-70867728950e",
            "size": null
        }))
        .unwrap();
        assert!(request.size.is_one_size());
    }
}
