//! Product browsing: category filter, sort order and text search.
//!
//! Category and sort are pushed down to the backend query; the free-text
//! search runs over the returned rows (name and description).

use serde::{Deserialize, Deserializer};

use crate::backend::Product;

/// Number of products shown on the home page.
pub const FEATURED_LIMIT: usize = 6;

/// Listing order, from `?sort=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProductSort {
    /// Most recently added first.
    #[default]
    Newest,
    /// Cheapest first (`low-high`).
    PriceAscending,
    /// Most expensive first (`high-low`).
    PriceDescending,
}

impl ProductSort {
    /// The backend's `order` parameter for this sort.
    #[must_use]
    pub const fn order_clause(self) -> &'static str {
        match self {
            Self::Newest => "created_at.desc",
            Self::PriceAscending => "price.asc",
            Self::PriceDescending => "price.desc",
        }
    }
}

impl<'de> Deserialize<'de> for ProductSort {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        // Unknown values fall back to newest, like the sort dropdown's default.
        Ok(match raw.as_deref().map(str::trim) {
            Some("low-high") => Self::PriceAscending,
            Some("high-low") => Self::PriceDescending,
            _ => Self::Newest,
        })
    }
}

/// Product listing query, from `?category=&sort=&q=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    /// Only this category; `None` (or `all`) lists every category.
    #[serde(default, deserialize_with = "category_or_all")]
    pub category: Option<String>,
    #[serde(default)]
    pub sort: ProductSort,
    /// Case-insensitive substring of the name or description.
    #[serde(default, rename = "q")]
    pub search: Option<String>,
}

fn category_or_all<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty() && s != "all"))
}

impl ProductQuery {
    /// Query parameters for the backend's `products` endpoint.
    #[must_use]
    pub fn backend_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("select", "*".to_string())];
        if let Some(category) = &self.category {
            params.push(("category", format!("eq.{category}")));
        }
        params.push(("order", self.sort.order_clause().to_string()));
        params
    }

    /// Whether a product passes the text search.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        let Some(term) = self
            .search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
        else {
            return true;
        };
        let term = term.to_lowercase();

        product.name.to_lowercase().contains(&term)
            || product
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term))
    }

    /// Keep the matching products, preserving the backend's order.
    #[must_use]
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        products.into_iter().filter(|p| self.matches(p)).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use redthread_core::{Price, ProductId};

    use super::*;

    fn product(name: &str, description: Option<&str>) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_string(),
            description: description.map(String::from),
            price: Price::from_cents(2500),
            images: vec![],
            stock: Some(5),
            sizes: vec![],
            category: Some("men".to_string()),
            featured: false,
            created_at: None,
        }
    }

    #[test]
    fn test_query_from_params() {
        let query: ProductQuery = serde_json::from_value(serde_json::json!({
            "category": "Women",
            "sort": "high-low",
            "q": "denim"
        }))
        .unwrap();
        assert_eq!(query.category.as_deref(), Some("women"));
        assert_eq!(query.sort, ProductSort::PriceDescending);
        assert_eq!(query.search.as_deref(), Some("denim"));

        let query: ProductQuery =
            serde_json::from_value(serde_json::json!({"category": "all", "sort": "random"}))
                .unwrap();
        assert!(query.category.is_none());
        assert_eq!(query.sort, ProductSort::Newest);
    }

    #[test]
    fn test_backend_params() {
        let query = ProductQuery {
            category: Some("accessories".to_string()),
            sort: ProductSort::PriceAscending,
            search: None,
        };
        assert_eq!(
            query.backend_params(),
            vec![
                ("select", "*".to_string()),
                ("category", "eq.accessories".to_string()),
                ("order", "price.asc".to_string()),
            ]
        );

        let params = ProductQuery::default().backend_params();
        assert_eq!(params.len(), 2);
        assert_eq!(params[1], ("order", "created_at.desc".to_string()));
    }

    #[test]
    fn test_search_covers_name_and_description() {
        let products = vec![
            product("Logo Tee", Some("Heavyweight cotton")),
            product("Denim Jacket", None),
            product("Beanie", Some("Ribbed COTTON knit")),
        ];
        let query = ProductQuery {
            search: Some(" cotton ".to_string()),
            ..ProductQuery::default()
        };
        let names: Vec<_> = query
            .apply(products.clone())
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Logo Tee", "Beanie"]);

        assert_eq!(ProductQuery::default().apply(products).len(), 3);
    }
}
