use std::{collections::{BTreeMap, HashSet}, path::Path};

use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::models::{Area, PlanTemplate, Restaurant};

const BUILTIN_CATALOG: &str = include_str!("../data/catalog.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("reading catalog {path}: {source}")]
    Io { path: String, source: std::io::Error },
    #[error("parsing catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog has no plan templates")]
    NoTemplates,
    #[error("catalog has no restaurants")]
    NoRestaurants,
    #[error("fallback area {0:?} is not in the area list")]
    UnknownFallbackArea(String),
    #[error("template {0:?}: {1}")]
    InvalidTemplate(String, String),
}

/// On-disk shape of the catalog document.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CatalogDocument {
    fallback_area: String,
    areas: BTreeMap<String, Area>,
    templates: Vec<PlanTemplate>,
    restaurants: Vec<Restaurant>,
}

/// Validated, read-only reference data the planner works from.
#[derive(Debug, Clone)]
pub struct Catalog {
    areas: BTreeMap<String, Area>,
    templates: Vec<PlanTemplate>,
    restaurants: Vec<Restaurant>,
    fallback: Area,
}

impl Catalog {
    pub fn new(
        areas: BTreeMap<String, Area>,
        templates: Vec<PlanTemplate>,
        restaurants: Vec<Restaurant>,
        fallback_area: &str,
    ) -> Result<Self, CatalogError> {
        if templates.is_empty() {
            return Err(CatalogError::NoTemplates);
        }
        if restaurants.is_empty() {
            return Err(CatalogError::NoRestaurants);
        }
        let fallback = areas
            .get(fallback_area)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownFallbackArea(fallback_area.to_string()))?;

        let mut seen = HashSet::new();
        for t in &templates {
            validate_template(t)?;
            if !seen.insert(t.id.as_str()) {
                return Err(CatalogError::InvalidTemplate(t.id.clone(), "duplicate id".into()));
            }
        }

        Ok(Catalog { areas, templates, restaurants, fallback })
    }

    pub fn from_json(raw: &str) -> Result<Self, CatalogError> {
        let doc: CatalogDocument = serde_json::from_str(raw)?;
        Catalog::new(doc.areas, doc.templates, doc.restaurants, &doc.fallback_area)
    }

    pub fn builtin() -> Result<Self, CatalogError> { Catalog::from_json(BUILTIN_CATALOG) }

    /// Loads from `path` when given, otherwise the copy compiled into the binary.
    pub fn load(path: Option<&Path>) -> Result<Self, CatalogError> {
        let catalog = match path {
            Some(p) => {
                let raw = std::fs::read_to_string(p)
                    .map_err(|source| CatalogError::Io { path: p.display().to_string(), source })?;
                Catalog::from_json(&raw)?
            }
            None => Catalog::builtin()?,
        };
        info!(
            "📚 Catalog loaded ({}): {} templates, {} areas, {} restaurants",
            path.map(|p| p.display().to_string()).unwrap_or_else(|| "built-in".into()),
            catalog.templates.len(),
            catalog.areas.len(),
            catalog.restaurants.len()
        );
        Ok(catalog)
    }

    pub fn templates(&self) -> &[PlanTemplate] { &self.templates }

    pub fn restaurants(&self) -> &[Restaurant] { &self.restaurants }

    pub fn areas(&self) -> &BTreeMap<String, Area> { &self.areas }

    /// The template's first area, or the fallback area when it is missing or unknown.
    pub fn main_area(&self, template: &PlanTemplate) -> &Area {
        template.areas.first().and_then(|id| self.areas.get(id)).unwrap_or(&self.fallback)
    }
}

fn validate_template(t: &PlanTemplate) -> Result<(), CatalogError> {
    let invalid = |why: &str| Err(CatalogError::InvalidTemplate(t.id.clone(), why.to_string()));
    if t.id.is_empty() {
        return invalid("empty id");
    }
    if !t.duration.is_known() {
        return invalid("unknown duration");
    }
    if t.tags.iter().any(|tag| !tag.is_known()) {
        return invalid("tag outside the activity vocabulary");
    }
    if t.areas.is_empty() {
        return invalid("no areas");
    }
    if t.timeline.windows(2).any(|w| w[1].time < w[0].time) {
        return invalid("timeline is not in time order");
    }
    Ok(())
}
