//! Products covered by the batch gallery generator.

/// A catalog product known to the batch generator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogProduct {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
}

impl CatalogProduct {
    pub const fn new(id: &'static str, name: &'static str, category: &'static str) -> Self {
        Self { id, name, category }
    }
}

pub const BATCH_CATALOG: &[CatalogProduct] = &[
    CatalogProduct::new("velocity-pro", "Velocity Pro", "Shoes"),
    CatalogProduct::new("cloud-runner", "Cloud Runner", "Shoes"),
    CatalogProduct::new("swift-elite", "Swift Elite", "Shoes"),
    CatalogProduct::new("marathon-ultra", "Marathon Ultra", "Shoes"),
    CatalogProduct::new("sprint-flex", "Sprint Flex", "Shoes"),
    CatalogProduct::new("trail-blazer", "Trail Blazer", "Shoes"),
    CatalogProduct::new("tempo-lite", "Tempo Lite", "Shoes"),
    CatalogProduct::new("endurance-max", "Endurance Max", "Shoes"),
];
