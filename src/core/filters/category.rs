use super::Filter;
use crate::core::query::ProfileQuery;
use crate::core::Params;
use crate::models::{FilterCriteria, SearchableProfile};
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// Parent -> children category hierarchy
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    children: HashMap<u64, Vec<u64>>,
}

impl CategoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(parent, child)` pairs
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (u64, u64)>,
    {
        let mut tree = Self::new();
        for (parent, child) in pairs {
            tree.children.entry(parent).or_default().push(child);
        }
        tree
    }

    /// The category itself plus every descendant (breadth-first, cycle safe)
    pub fn expand(&self, id: u64) -> HashSet<u64> {
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([id]);
        while let Some(current) = queue.pop_front() {
            for child in self.children.get(&current).into_iter().flatten() {
                if seen.insert(*child) {
                    queue.push_back(*child);
                }
            }
        }
        seen
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryParams {
    pub specialty: Option<String>,
    pub category_ids: Vec<u64>,
    pub category_types: Vec<String>,
    /// Require every listed id/type instead of any
    pub match_all: bool,
    pub include_subcategories: bool,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    params: CategoryParams,
    tree: Option<Arc<CategoryTree>>,
}

impl CategoryFilter {
    pub fn new(params: CategoryParams, tree: Option<Arc<CategoryTree>>) -> Self {
        Self { params, tree }
    }

    pub fn from_criteria(criteria: &FilterCriteria, tree: Option<Arc<CategoryTree>>) -> Self {
        Self::new(
            CategoryParams {
                specialty: criteria.specialty.clone(),
                category_ids: criteria.category_ids.clone(),
                category_types: criteria.category_types.clone(),
                match_all: criteria.match_all,
                include_subcategories: criteria.include_subcategories,
            },
            tree,
        )
    }

    pub fn params(&self) -> &CategoryParams {
        &self.params
    }

    /// One acceptable id set per requested category
    fn id_groups(&self) -> Vec<HashSet<u64>> {
        let expand = self.params.include_subcategories;
        if expand && self.tree.is_none() {
            tracing::warn!("Subcategory expansion requested without a category tree, matching exact ids only");
        }
        self.params
            .category_ids
            .iter()
            .map(|id| match (&self.tree, expand) {
                (Some(tree), true) => tree.expand(*id),
                _ => HashSet::from([*id]),
            })
            .collect()
    }

    fn matches(&self, profile: &SearchableProfile, groups: &[HashSet<u64>]) -> bool {
        let p = &self.params;
        if let Some(specialty) = &p.specialty {
            let same = profile
                .specialty
                .as_deref()
                .is_some_and(|s| s.to_lowercase() == specialty.to_lowercase());
            if !same {
                return false;
            }
        }

        if !groups.is_empty() {
            let owned: HashSet<u64> = profile.all_category_ids().collect();
            let hit = |group: &HashSet<u64>| !group.is_disjoint(&owned);
            let ok = if p.match_all {
                groups.iter().all(hit)
            } else {
                groups.iter().any(hit)
            };
            if !ok {
                return false;
            }
        }

        if !p.category_types.is_empty() {
            let has_type = |t: &String| profile.category_type.as_deref() == Some(t.as_str());
            let ok = if p.match_all {
                p.category_types.iter().all(has_type)
            } else {
                p.category_types.iter().any(has_type)
            };
            if !ok {
                return false;
            }
        }

        true
    }
}

impl Filter for CategoryFilter {
    fn name(&self) -> &'static str {
        "category"
    }

    fn apply(&self, query: ProfileQuery) -> ProfileQuery {
        if !self.is_active() {
            return query;
        }
        let groups = self.id_groups();
        query.filter(|row| self.matches(&row.profile, &groups))
    }

    fn is_active(&self) -> bool {
        let p = &self.params;
        p.specialty.is_some() || !p.category_ids.is_empty() || !p.category_types.is_empty()
    }

    fn active_params(&self) -> Params {
        let p = &self.params;
        let mut params = Params::new();
        if !self.is_active() {
            return params;
        }
        if let Some(specialty) = &p.specialty {
            params.insert("specialty".into(), json!(specialty));
        }
        if !p.category_ids.is_empty() {
            params.insert("category_ids".into(), json!(p.category_ids));
        }
        if !p.category_types.is_empty() {
            params.insert("category_types".into(), json!(p.category_types));
        }
        if p.match_all {
            params.insert("match_all".into(), json!(true));
        }
        // Reported even when no tree is available to honor it
        if p.include_subcategories {
            params.insert("include_subcategories".into(), json!(true));
        }
        params
    }

    fn description(&self) -> String {
        let p = &self.params;
        let mut parts = Vec::new();
        if let Some(specialty) = &p.specialty {
            parts.push(format!("специализация: {}", specialty));
        }
        if !p.category_ids.is_empty() {
            let mode = if p.match_all { "все" } else { "любая" };
            parts.push(format!("категории ({}): {}", mode, p.category_ids.len()));
        }
        if !p.category_types.is_empty() {
            parts.push(format!("типы: {}", p.category_types.join(", ")));
        }
        parts.join(", ")
    }

    fn reset(&mut self) {
        self.params = CategoryParams::default();
    }

    fn box_clone(&self) -> Box<dyn Filter> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn query() -> ProfileQuery {
        let profiles = vec![
            SearchableProfile { id: 1, category_ids: vec![10, 20], ..Default::default() },
            SearchableProfile { id: 2, category_ids: vec![10], ..Default::default() },
            SearchableProfile { id: 3, category_ids: vec![11], ..Default::default() },
        ];
        ProfileQuery::from_profiles(profiles, Utc::now())
    }

    fn ids(query: ProfileQuery) -> Vec<u64> {
        query.fetch().iter().map(|r| r.id()).collect()
    }

    #[test]
    fn test_any_versus_all() {
        let mut params = CategoryParams {
            category_ids: vec![10, 20],
            ..Default::default()
        };
        assert_eq!(ids(CategoryFilter::new(params.clone(), None).apply(query())), vec![1, 2]);

        params.match_all = true;
        assert_eq!(ids(CategoryFilter::new(params, None).apply(query())), vec![1]);
    }

    #[test]
    fn test_subcategories_with_tree() {
        let tree = Arc::new(CategoryTree::from_pairs([(10, 11)]));
        let params = CategoryParams {
            category_ids: vec![10],
            include_subcategories: true,
            ..Default::default()
        };
        let filter = CategoryFilter::new(params, Some(tree));
        assert_eq!(ids(filter.apply(query())), vec![1, 2, 3]);
    }

    #[test]
    fn test_subcategories_without_tree_keeps_flag() {
        let params = CategoryParams {
            category_ids: vec![10],
            include_subcategories: true,
            ..Default::default()
        };
        let filter = CategoryFilter::new(params, None);

        assert_eq!(ids(filter.apply(query())), vec![1, 2]);
        assert_eq!(filter.active_params()["include_subcategories"], json!(true));
    }

    #[test]
    fn test_tree_expansion_handles_cycles() {
        let tree = CategoryTree::from_pairs([(1, 2), (2, 3), (3, 1)]);
        assert_eq!(tree.expand(1).len(), 3);
    }
}
