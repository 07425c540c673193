use anyhow::Context;
use log::{debug, info};
use serde_json::{Map, Value};

use crate::{
    catalog::ModelsData,
    data::{
        history::UndoHistory,
        modification::{Modification, split_path, value_at},
        schema::ParsedSchema,
        scope::{ConfigScope, ScopeSnapshot},
        tree::{TreeNode, build_tree},
    },
    paths::{ConfigLocations, ScopeRequest},
    validate::{ValidationError, validate},
};

/// Editing state over the global and project configuration files.
///
/// Edits are queued as modifications on the active scope and only reach the
/// disk through [`AppData::save`]. The project scope inherits values from the
/// global scope, including the global scope's unsaved edits.
#[derive(Debug, Clone)]
pub struct AppData {
    active: ConfigScope,
    global: ScopeSnapshot,
    project: ScopeSnapshot,
    schema: ParsedSchema,
    raw_schema: Option<Value>,
    catalog: Option<ModelsData>,
    history: UndoHistory,
}

impl AppData {
    /// Build from already loaded snapshots.
    ///
    /// Without a raw schema the bundled property set is used for the tree and
    /// schema validation is skipped.
    pub fn new(
        active: ConfigScope,
        global: ScopeSnapshot,
        project: ScopeSnapshot,
        raw_schema: Option<Value>,
    ) -> Self {
        let schema = match &raw_schema {
            Some(raw) => ParsedSchema::parse(raw),
            None => ParsedSchema::fallback(),
        };
        Self {
            active,
            global,
            project,
            schema,
            raw_schema,
            catalog: None,
            history: UndoHistory::new(),
        }
    }

    /// Resolve both config files under `locations` and read them.
    pub fn load(
        locations: &ConfigLocations,
        request: ScopeRequest,
        raw_schema: Option<Value>,
    ) -> anyhow::Result<Self> {
        let (active, _) = locations.resolve(request);

        let global_path = locations.resolve_global_path();
        let global = ScopeSnapshot::load(&global_path)
            .with_context(|| format!("loading global config {}", global_path.display()))?;

        let project_path = locations.project_path();
        let project = ScopeSnapshot::load(&project_path)
            .with_context(|| format!("loading project config {}", project_path.display()))?;

        let active_path = match active {
            ConfigScope::Global => &global_path,
            ConfigScope::Project => &project_path,
        };
        info!("Editing {active} config {}", active_path.display());
        Ok(Self::new(active, global, project, raw_schema))
    }

    pub fn with_catalog(mut self, catalog: Option<ModelsData>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn active_scope(&self) -> ConfigScope {
        self.active
    }

    /// Change the edited scope. Pending modifications of both scopes are
    /// kept; the undo history is not.
    pub fn switch_scope(&mut self, scope: ConfigScope) {
        if self.active != scope {
            debug!("Switching scope {} -> {scope}", self.active);
            self.active = scope;
            self.history.clear();
        }
    }

    pub fn snapshot(&self, scope: ConfigScope) -> &ScopeSnapshot {
        match scope {
            ConfigScope::Global => &self.global,
            ConfigScope::Project => &self.project,
        }
    }

    pub fn current(&self) -> &ScopeSnapshot {
        self.snapshot(self.active)
    }

    fn current_mut(&mut self) -> &mut ScopeSnapshot {
        match self.active {
            ConfigScope::Global => &mut self.global,
            ConfigScope::Project => &mut self.project,
        }
    }

    pub fn schema(&self) -> &ParsedSchema {
        &self.schema
    }

    pub fn raw_schema(&self) -> Option<&Value> {
        self.raw_schema.as_ref()
    }

    pub fn catalog(&self) -> Option<&ModelsData> {
        self.catalog.as_ref()
    }

    pub fn effective_data(&self) -> Map<String, Value> {
        self.current().effective_data()
    }

    pub fn global_effective_data(&self) -> Map<String, Value> {
        self.global.effective_data()
    }

    /// Effective value at a dot path of the active scope.
    pub fn value(&self, dot_path: &str) -> Option<Value> {
        value_at(&self.effective_data(), &split_path(dot_path)).cloned()
    }

    /// Value at `path` as persisted, ignoring pending modifications.
    pub fn original_value(&self, path: &[String]) -> Option<&Value> {
        value_at(&self.current().data, path)
    }

    pub fn edit_value(&mut self, path: Vec<String>, value: Value) {
        self.apply(Modification::set(path, value));
    }

    pub fn delete_value(&mut self, path: Vec<String>) {
        self.apply(Modification::unset(path));
    }

    fn apply(&mut self, modification: Modification) {
        let previous = value_at(&self.effective_data(), &modification.path).cloned();
        self.history.record(modification.clone(), previous);
        self.current_mut().push(modification);
    }

    /// Revert the latest edit. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.undo() {
            Some(inverse) => {
                self.current_mut().push(inverse);
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo() {
            Some(modification) => {
                self.current_mut().push(modification);
                true
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Tree of the active scope, with global values inherited in project scope.
    pub fn tree(&self) -> Vec<TreeNode> {
        let effective = self.effective_data();
        let inherited = match self.active {
            ConfigScope::Project => Some(self.global_effective_data()),
            ConfigScope::Global => None,
        };
        build_tree(
            self.schema.properties(),
            &effective,
            inherited.as_ref(),
            Some(&self.current().data),
        )
    }

    /// Diagnostics for the effective data; empty without a raw schema.
    pub fn validation_errors(&self) -> Vec<ValidationError> {
        match &self.raw_schema {
            Some(raw) => validate(raw, &self.effective_data(), &self.schema, self.catalog.as_ref()),
            None => Vec::new(),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.current().is_dirty()
    }

    /// Whether the active scope's file exists or will be created on save.
    pub fn exists(&self) -> bool {
        let current = self.current();
        current.exists || current.is_dirty()
    }

    /// Persist the active scope and start a fresh undo history.
    pub fn save(&mut self) -> anyhow::Result<()> {
        let scope = self.active;
        let current = self.current_mut();
        let path = current.file_path.clone();
        current
            .save()
            .with_context(|| format!("saving {scope} config {}", path.display()))?;
        self.history.clear();
        info!("Saved {scope} config {}", path.display());
        Ok(())
    }
}
