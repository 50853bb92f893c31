use serde::{Deserialize, Serialize};

use crate::domain::money::Money;
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FoodItemId(pub String);

/// One cart row, captured at the price in effect when the snapshot was taken.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LineItemFields")]
pub struct LineItem {
    food_item_id: FoodItemId,
    unit_price: Money,
    quantity: u32,
}

#[derive(Deserialize)]
struct LineItemFields {
    food_item_id: FoodItemId,
    unit_price: Money,
    quantity: u32,
}

impl TryFrom<LineItemFields> for LineItem {
    type Error = DomainError;

    fn try_from(fields: LineItemFields) -> Result<Self, Self::Error> {
        Self::new(fields.food_item_id, fields.unit_price, fields.quantity)
    }
}

impl LineItem {
    pub fn new(
        food_item_id: FoodItemId,
        unit_price: Money,
        quantity: u32,
    ) -> Result<Self, DomainError> {
        if quantity == 0 {
            return Err(DomainError::InvariantViolation(format!(
                "line item `{}` must have a quantity of at least 1",
                food_item_id.0
            )));
        }

        Ok(Self { food_item_id, unit_price, quantity })
    }

    pub fn food_item_id(&self) -> &FoodItemId {
        &self.food_item_id
    }

    pub fn unit_price(&self) -> Money {
        self.unit_price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<LineItem>,
}

impl Cart {
    pub fn new(lines: Vec<LineItem>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[LineItem] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(LineItem::quantity).fold(0, u32::saturating_add)
    }

    pub fn subtotal(&self) -> Money {
        self.lines.iter().map(LineItem::line_total).sum()
    }
}
