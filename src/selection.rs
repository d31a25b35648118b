//! Selection state: the active category and the models chosen within it.
//!
//! Selection is category-scoped and ordered by insertion so results can be
//! displayed in the order the user picked models. Names are not checked
//! against the catalog here; the orchestrator consumes whatever is selected.

use crate::catalog::Category;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    category: Category,
    models: Vec<String>,
}

impl Selection {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            models: Vec::new(),
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    /// Selected model names in insertion order.
    pub fn models(&self) -> &[String] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.models.iter().any(|m| m == name)
    }

    /// Switches category. The selection is always emptied, even when the
    /// category does not change.
    pub fn set_category(&mut self, category: Category) {
        self.category = category;
        self.models.clear();
    }

    /// Adds `name` if absent, removes it if present. Blank names are ignored.
    ///
    /// Returns `true` if `name` is selected afterwards.
    pub fn toggle_model(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        if let Some(pos) = self.models.iter().position(|m| m == name) {
            self.models.remove(pos);
            false
        } else {
            self.models.push(name.to_string());
            true
        }
    }

    /// Replaces the selection wholesale, keeping first occurrences.
    pub fn set_selected_models<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.models.clear();
        for name in names {
            let name = name.as_ref().trim();
            if !name.is_empty() && !self.contains(name) {
                self.models.push(name.to_string());
            }
        }
    }

    /// Appends every model in `available` whose name contains `filter`
    /// (case-insensitive) and is not yet selected. Returns how many were added.
    pub fn select_all_filtered(&mut self, available: &[String], filter: &str) -> usize {
        let needle = filter.trim().to_lowercase();
        let mut added = 0;
        for name in available {
            if name.to_lowercase().contains(&needle) && !self.contains(name) {
                self.models.push(name.clone());
                added += 1;
            }
        }
        added
    }

    pub fn clear_all(&mut self) {
        self.models.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut sel = Selection::default();
        assert!(sel.toggle_model("gpt-4"));
        assert!(sel.toggle_model("gpt-3.5"));
        assert_eq!(sel.models(), ["gpt-4", "gpt-3.5"]);
        assert!(!sel.toggle_model("gpt-4"));
        assert_eq!(sel.models(), ["gpt-3.5"]);
    }

    #[test]
    fn test_double_toggle_cancels_out() {
        let mut sel = Selection::default();
        sel.set_selected_models(["a1", "b1"]);
        let before = sel.clone();
        sel.toggle_model("c1");
        sel.toggle_model("c1");
        assert_eq!(sel, before);
    }

    #[test]
    fn test_switching_category_clears_selection() {
        for category in [Category::Commercial, Category::HuggingFace] {
            let mut sel = Selection::new(Category::Commercial);
            sel.set_selected_models(["gpt-4", "gpt-4o"]);
            sel.set_category(category);
            assert!(sel.is_empty());
            assert_eq!(sel.category(), category);
        }
    }

    #[test]
    fn test_set_selected_allows_unknown_and_dedups() {
        let mut sel = Selection::default();
        sel.set_selected_models(["not-in-catalog", " gpt-4 ", "gpt-4", ""]);
        assert_eq!(sel.models(), ["not-in-catalog", "gpt-4"]);
    }

    #[test]
    fn test_select_all_filtered_appends_in_catalog_order() {
        let available = names(&[
            "gpt-4o",
            "claude-3-7-sonnet",
            "GPT-4.1",
            "gemini-2.0-flash",
        ]);
        let mut sel = Selection::default();
        sel.toggle_model("gemini-2.0-flash");
        let added = sel.select_all_filtered(&available, "gpt");
        assert_eq!(added, 2);
        assert_eq!(sel.models(), ["gemini-2.0-flash", "gpt-4o", "GPT-4.1"]);

        let added = sel.select_all_filtered(&available, "");
        assert_eq!(added, 1);
        assert_eq!(sel.models().len(), 4);

        sel.clear_all();
        assert!(sel.is_empty());
    }
}
