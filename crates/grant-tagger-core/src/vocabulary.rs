//! Seed vocabulary and default synonym groups.
//!
//! Stores load these on initialization; after that the vocabulary only grows
//! through LLM discovery.

use crate::models::TagSet;

pub const SEED_TAGS: &[&str] = &[
    "agriculture",
    "aquaculture",
    "capacity-building",
    "capital",
    "climate",
    "community-benefit",
    "conservation",
    "cost-share",
    "dairy",
    "distribution",
    "drought",
    "education",
    "equipment",
    "equine",
    "equine-owners",
    "food-safety",
    "farmer",
    "farm-to-school",
    "grant",
    "infrastructure",
    "irrigation",
    "local-food",
    "local-government",
    "logistics",
    "marketing",
    "mixed-operations",
    "nonprofit",
    "nutrient-management",
    "operational",
    "organic-certification",
    "organic-transition",
    "outreach",
    "planning",
    "pilot",
    "producer-group",
    "procurement",
    "processing",
    "research",
    "resilience",
    "reimbursement",
    "rolling",
    "rural",
    "safety-net",
    "school",
    "seafood",
    "seafood-harvester",
    "soil",
    "supply-chain",
    "technical-assistance",
    "training",
    "value-added",
    "water",
    "water-storage",
    "working-capital",
    "row-crops",
    "vegetables",
    "fruit",
    "livestock",
    "competitive",
    "match-required",
    "public-entity-eligible",
    "individual-eligible",
    "rfa-open",
    "wi",
    "va",
    "ri",
    "nh",
    "mn",
    "me",
    "ky",
    "co",
    "cooperative",
    "for-profit",
    "university",
    "extension",
    "tribal",
    "veteran",
    "beginning-farmer",
    "underserved",
    "youth",
    "food-access",
    "nutrition",
    "workforce",
    "energy",
    "renewable-energy",
    "water-quality",
    "soil-health",
    "wildlife-habitat",
    "pasture",
    "grazing",
    "manure-management",
    "disaster-relief",
    "flood",
];

/// Each tag appears in at most one group.
pub const SEED_SYNONYM_GROUPS: &[&[&str]] = &[
    &["agriculture", "farmer"],
    &["education", "training", "extension"],
    &["seafood", "aquaculture", "seafood-harvester"],
    &["irrigation", "water-storage"],
    &["soil", "soil-health"],
    &["grazing", "pasture"],
    &["renewable-energy", "energy"],
    &["disaster-relief", "flood", "safety-net"],
];

pub fn seed_tags() -> TagSet {
    SEED_TAGS.iter().map(|t| t.to_string()).collect()
}

pub fn seed_synonym_groups() -> Vec<TagSet> {
    SEED_SYNONYM_GROUPS
        .iter()
        .map(|g| g.iter().map(|t| t.to_string()).collect())
        .collect()
}
