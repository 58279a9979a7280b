use std::cmp::Ordering;

use crate::model::{Product, SearchFilters};

/// Order products by descending quality score.
///
/// The sort is stable: products with equal scores keep their input order.
pub fn rank(mut products: Vec<Product>) -> Vec<Product> {
    products.sort_by(|a, b| {
        b.quality_score()
            .partial_cmp(&a.quality_score())
            .unwrap_or(Ordering::Equal)
    });
    products
}

/// Apply post-filters in fixed order: price range, MOQ range, minimum rating.
///
/// Price bounds compare against `price.min` only.
pub fn apply_filters(products: Vec<Product>, filters: &SearchFilters) -> Vec<Product> {
    products
        .into_iter()
        .filter(|p| filters.min_price.is_none_or(|min| p.price.min >= min))
        .filter(|p| filters.max_price.is_none_or(|max| p.price.min <= max))
        .filter(|p| filters.min_moq.is_none_or(|min| p.minimum_order_quantity >= min))
        .filter(|p| filters.max_moq.is_none_or(|max| p.minimum_order_quantity <= max))
        .filter(|p| filters.min_rating.is_none_or(|min| p.supplier.rating.unwrap_or(0.0) >= min))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::{Price, Supplier};

    pub(crate) fn product(id: &str, rating: Option<f64>, repurchase: Option<f64>) -> Product {
        Product {
            id: id.to_string(),
            title: id.to_string(),
            title_native: id.to_string(),
            price: Price::zero("CNY"),
            price_converted: Price::zero("XOF"),
            minimum_order_quantity: 1,
            units_sold: 0,
            repurchase_rate: repurchase,
            supplier: Supplier {
                name: String::new(),
                name_native: String::new(),
                location: String::new(),
                location_native: String::new(),
                years_on_platform: None,
                rating,
                verified: false,
            },
            image_url: String::new(),
            product_url: String::new(),
        }
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[test]
    fn test_rank_by_composite_score() {
        let ranked = rank(vec![
            product("a", Some(4.0), None),       // 4.0
            product("b", Some(3.5), Some(20.0)), // 5.5
            product("c", None, Some(90.0)),      // 9.0
            product("d", None, None),            // 0.0
        ]);
        assert_eq!(ids(&ranked), vec!["c", "b", "a", "d"]);
    }

    #[test]
    fn test_rank_is_stable_for_equal_scores() {
        let ranked = rank(vec![
            product("first", Some(4.0), None),
            product("low", Some(1.0), None),
            product("second", Some(3.0), Some(10.0)),
            product("third", None, Some(40.0)),
            product("none-a", None, None),
            product("none-b", None, None),
        ]);
        assert_eq!(ids(&ranked), vec!["first", "second", "third", "low", "none-a", "none-b"]);
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(Vec::new()).is_empty());
    }

    #[test]
    fn test_filters_use_price_min_and_missing_rating_as_zero() {
        let mut cheap = product("cheap", Some(4.5), None);
        cheap.price = Price { min: 2.0, max: 50.0, currency_code: "CNY".to_string() };
        let mut pricey = product("pricey", None, None);
        pricey.price = Price { min: 30.0, max: 10.0, currency_code: "CNY".to_string() };
        pricey.minimum_order_quantity = 500;

        let filters = SearchFilters { max_price: Some(20.0), ..Default::default() };
        assert_eq!(ids(&apply_filters(vec![cheap.clone(), pricey.clone()], &filters)), vec!["cheap"]);

        let filters = SearchFilters { min_price: Some(25.0), ..Default::default() };
        assert_eq!(ids(&apply_filters(vec![cheap.clone(), pricey.clone()], &filters)), vec!["pricey"]);

        let filters = SearchFilters { min_moq: Some(10), max_moq: Some(1000), ..Default::default() };
        assert_eq!(ids(&apply_filters(vec![cheap.clone(), pricey.clone()], &filters)), vec!["pricey"]);

        let filters = SearchFilters { min_rating: Some(4.0), ..Default::default() };
        assert_eq!(ids(&apply_filters(vec![cheap, pricey], &filters)), vec!["cheap"]);
    }

    #[test]
    fn test_empty_filters_keep_everything_in_order() {
        let products = vec![product("x", None, None), product("y", Some(5.0), None)];
        assert_eq!(ids(&apply_filters(products, &SearchFilters::default())), vec!["x", "y"]);
    }
}
