//! Cart line items.
//!
//! A cart is a plain ordered list of [`CartItem`]s. The persisted JSON shape
//! uses camelCase keys (`variantId`, `shopId`) so carts written by older
//! clients keep loading.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::id::{ProductId, ShopId, VariantId};
use crate::types::money::{MoneyError, Vnd};

/// Number of units on a cart line. Never below one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// The smallest quantity a line can hold.
    pub const ONE: Self = Self(1);

    /// Build a quantity, flooring at one.
    #[must_use]
    pub const fn new(count: u32) -> Self {
        if count == 0 { Self::ONE } else { Self(count) }
    }

    /// The unit count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// One more unit (saturates at `u32::MAX`).
    #[must_use]
    pub const fn incremented(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// One fewer unit, or `None` when already at one.
    #[must_use]
    pub const fn decremented(self) -> Option<Self> {
        if self.0 > 1 { Some(Self(self.0 - 1)) } else { None }
    }

    /// Combine two quantities of the same line.
    #[must_use]
    pub const fn merged(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Zero, negative or fractional counts written by older clients read as one.
impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        let count = raw
            .as_ref()
            .and_then(serde_json::Value::as_u64)
            .and_then(|n| u32::try_from(n).ok())
            .unwrap_or(1);
        Ok(Self::new(count))
    }
}

/// One product entry in the cart, with its price and image cached at the
/// time it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    /// Product id.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price.
    pub price: Vnd,
    /// Image URL.
    #[serde(default)]
    pub image: String,
    /// Units on this line.
    #[serde(default)]
    pub quantity: Quantity,
    /// Variant id (the product id for single-variant listings).
    pub variant_id: VariantId,
    /// Seller shop id.
    pub shop_id: ShopId,
}

impl CartItem {
    /// Unit price times quantity.
    ///
    /// # Errors
    ///
    /// Returns [`MoneyError::Overflow`] when the line total does not fit.
    pub fn line_total(&self) -> Result<Vnd, MoneyError> {
        self.price.checked_mul(self.quantity.get())
    }

    /// Whether `other` is the same product and variant (so the lines merge).
    #[must_use]
    pub fn same_line(&self, other: &Self) -> bool {
        self.id == other.id && self.variant_id == other.variant_id
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn item(id: &str, price: i64, quantity: u32) -> CartItem {
        CartItem {
            id: ProductId::new(id),
            name: format!("Battery {id}"),
            price: Vnd::new(price),
            image: String::new(),
            quantity: Quantity::new(quantity),
            variant_id: VariantId::new(id),
            shop_id: ShopId::new("shop-1"),
        }
    }

    #[test]
    fn test_quantity_floors_at_one() {
        assert_eq!(Quantity::new(0), Quantity::ONE);
        assert_eq!(Quantity::ONE.decremented(), None);
        assert_eq!(Quantity::new(3).decremented(), Some(Quantity::new(2)));
        assert_eq!(Quantity::new(u32::MAX).incremented().get(), u32::MAX);
    }

    #[test]
    fn test_persisted_shape_is_camel_case() {
        let json = serde_json::to_value(item("A", 100, 2)).unwrap();
        assert_eq!(json["variantId"], "A");
        assert_eq!(json["shopId"], "shop-1");
        assert_eq!(json["quantity"], 2);
        assert_eq!(json["price"], 100);
    }

    #[test]
    fn test_missing_or_zero_quantity_reads_as_one() {
        let missing: CartItem = serde_json::from_str(
            r#"{"id":"A","name":"Pin","price":100,"variantId":"A","shopId":"s"}"#,
        )
        .unwrap();
        assert_eq!(missing.quantity, Quantity::ONE);
        assert_eq!(missing.image, "");

        let zero: CartItem = serde_json::from_str(
            r#"{"id":"A","name":"Pin","price":100,"quantity":0,"variantId":"A","shopId":"s"}"#,
        )
        .unwrap();
        assert_eq!(zero.quantity, Quantity::ONE);

        let null: CartItem = serde_json::from_str(
            r#"{"id":"A","name":"Pin","price":100,"quantity":null,"variantId":"A","shopId":"s"}"#,
        )
        .unwrap();
        assert_eq!(null.quantity, Quantity::ONE);
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item("A", 250, 4).line_total().unwrap(), Vnd::new(1_000));
    }

    #[test]
    fn test_same_line() {
        let a = item("A", 100, 1);
        let mut other_variant = item("A", 100, 1);
        other_variant.variant_id = VariantId::new("A-red");
        assert!(a.same_line(&item("A", 999, 5)));
        assert!(!a.same_line(&other_variant));
        assert!(!a.same_line(&item("B", 100, 1)));
    }
}
