//! Display strings for ingredients.
//!
//! The shopping list shows what to buy, so quantities always round up:
//! under-buying is worse than a spare onion. The recipe view shows the raw
//! measurements for cooking.

use crate::models::{AggregatedItem, Ingredient, NewIngredient, normalize_unit};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightUnit {
    Pound,
    Ounce,
}

impl WeightUnit {
    fn to_ounces(self, quantity: f64) -> f64 {
        match self {
            Self::Pound => quantity * 16.0,
            Self::Ounce => quantity,
        }
    }
}

/// How a unit is shopped for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitClass {
    /// Size descriptors (medium, large, small): buy a whole number of things.
    Count,
    /// Sold by weight.
    Weight(WeightUnit),
    /// Measures (cups, cloves, tablespoons) and unknown units.
    Other,
}

impl UnitClass {
    /// Classifies the whole unit token, so "bulb" is not pounds and "dozen" is
    /// not ounces.
    #[must_use]
    pub fn of(unit: Option<&str>) -> Self {
        let Some(unit) = unit else {
            return Self::Other;
        };
        match normalize_unit(unit).as_str() {
            "medium" | "large" | "small" => Self::Count,
            "lb" => Self::Weight(WeightUnit::Pound),
            "oz" => Self::Weight(WeightUnit::Ounce),
            _ => Self::Other,
        }
    }
}

pub trait IngredientLike {
    fn name(&self) -> &str;
    fn quantity(&self) -> Option<f64>;
    fn unit(&self) -> Option<&str>;
    fn notes(&self) -> Option<&str>;
}

macro_rules! impl_ingredient_like {
    ($($ty:ty),*) => {
        $(impl IngredientLike for $ty {
            fn name(&self) -> &str {
                &self.name
            }
            fn quantity(&self) -> Option<f64> {
                self.quantity
            }
            fn unit(&self) -> Option<&str> {
                self.unit.as_deref()
            }
            fn notes(&self) -> Option<&str> {
                self.notes.as_deref()
            }
        })*
    };
}

impl_ingredient_like!(Ingredient, NewIngredient, AggregatedItem);

/// A quantity of zero or less counts as "not set".
fn positive(quantity: Option<f64>) -> Option<f64> {
    quantity.filter(|q| *q > 0.0)
}

/// Shopping list line: a count, a weight in ounces, or just the name.
#[must_use]
pub fn format_for_shopping(item: &impl IngredientLike) -> String {
    let name = item.name();
    let Some(quantity) = positive(item.quantity()) else {
        return name.to_string();
    };

    match UnitClass::of(item.unit()) {
        UnitClass::Count => format!("{} {name}", quantity.ceil()),
        UnitClass::Weight(unit) => format!("{name} ({} oz)", unit.to_ounces(quantity).ceil()),
        UnitClass::Other => name.to_string(),
    }
}

/// Recipe view line: `"{quantity} {unit} {name} ({notes})"`, skipping absent parts.
#[must_use]
pub fn format_for_recipe(item: &impl IngredientLike) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if let Some(q) = positive(item.quantity()) {
        parts.push(format_quantity(q));
    }
    if let Some(unit) = item.unit().filter(|u| !u.is_empty()) {
        parts.push(unit.to_string());
    }
    parts.push(item.name().to_string());

    let mut line = parts.join(" ");
    if let Some(notes) = item.notes().filter(|n| !n.is_empty()) {
        line.push_str(&format!(" ({notes})"));
    }
    line
}

/// `2.0` renders as `2`, `0.25` as `0.25`.
#[must_use]
pub fn format_quantity(quantity: f64) -> String {
    let rounded = (quantity * 1000.0).round() / 1000.0;
    format!("{rounded}")
}
