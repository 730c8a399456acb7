//! Collection view configuration

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;

use super::ParameterBindings;
use crate::error::ConfigError;
use crate::model::DataShape;
use crate::model::Row;
use crate::model::Value;
use crate::selection::SelectionMode;

/// What happens to the existing data when items are dropped onto the view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPolicy {
    /// Dropped items are inserted next to the drop target.
    #[default]
    Insert,
    /// Dropped items replace the whole data set.
    Replace,
}

/// Configuration for a collection view.
///
/// Deserializes from the host's camelCase property names. Only `uidField`
/// is required; everything else has a default.
///
/// # Example
///
/// ```
/// use collection_view_lib::config::CollectionConfig;
///
/// let config = CollectionConfig::new("id")
///     .with_template("Card")
///     .with_sort("name", true)
///     .with_section_field("group");
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CollectionConfig {
    /// Row field holding the stable identity.
    pub uid_field: String,

    /// Template used for every cell unless overridden.
    pub cell_template: Option<String>,

    /// Row field naming the template per row. Takes priority over the
    /// selected and editing templates.
    pub cell_template_field: Option<String>,

    pub selected_cell_template: Option<String>,

    pub editing_cell_template: Option<String>,

    /// Serialized JSON object mapping row fields to template parameters.
    pub parameter_binding: Option<String>,

    /// Template parameter receiving the cell's selection state.
    pub selected_parameter: Option<String>,

    /// Template parameter receiving the cell's editing state.
    pub editing_parameter: Option<String>,

    /// Global parameters and their initial values, pushed to every template.
    pub global_parameters: HashMap<String, Value>,

    pub sort_field: Option<String>,

    /// Default: `true`
    pub sort_ascending: bool,

    /// Row field used to group rows into sections.
    pub section_field: Option<String>,

    pub header_template: Option<String>,

    /// Header template parameter receiving the section identifier.
    pub header_section_parameter: Option<String>,

    pub footer_template: Option<String>,

    pub footer_section_parameter: Option<String>,

    /// Template shown when the data set is empty.
    pub empty_template: Option<String>,

    /// Row field holding the item width. Changes to it require a layout pass.
    pub width_field: Option<String>,

    /// Row field holding the item height. Changes to it require a layout pass.
    pub height_field: Option<String>,

    pub selection_mode: SelectionMode,

    /// Select the first item after a commit when nothing is selected.
    pub auto_select_first: bool,

    /// Row fields copied to `Event:<field>` properties before firing events.
    pub event_fields: Vec<String>,

    pub can_move_cells: bool,

    pub can_move_cells_across_sections: bool,

    pub drop_policy: DropPolicy,

    /// Field definitions used to create new items.
    pub data_shape: DataShape,

    /// Identifier of this view, used to ignore its own selection broadcasts.
    pub component_id: Option<String>,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            uid_field: String::new(),
            cell_template: None,
            cell_template_field: None,
            selected_cell_template: None,
            editing_cell_template: None,
            parameter_binding: None,
            selected_parameter: None,
            editing_parameter: None,
            global_parameters: HashMap::new(),
            sort_field: None,
            sort_ascending: true,
            section_field: None,
            header_template: None,
            header_section_parameter: None,
            footer_template: None,
            footer_section_parameter: None,
            empty_template: None,
            width_field: None,
            height_field: None,
            selection_mode: SelectionMode::default(),
            auto_select_first: false,
            event_fields: Vec::new(),
            can_move_cells: false,
            can_move_cells_across_sections: false,
            drop_policy: DropPolicy::default(),
            data_shape: DataShape::default(),
            component_id: None,
        }
    }
}

impl CollectionConfig {
    /// Creates a configuration keyed by `uid_field`.
    pub fn new(uid_field: impl Into<String>) -> Self {
        Self {
            uid_field: uid_field.into(),
            ..Self::default()
        }
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn with_template(mut self, name: impl Into<String>) -> Self {
        self.cell_template = Some(name.into());
        self
    }

    pub fn with_template_field(mut self, field: impl Into<String>) -> Self {
        self.cell_template_field = Some(field.into());
        self
    }

    pub fn with_selected_template(mut self, name: impl Into<String>) -> Self {
        self.selected_cell_template = Some(name.into());
        self
    }

    pub fn with_editing_template(mut self, name: impl Into<String>) -> Self {
        self.editing_cell_template = Some(name.into());
        self
    }

    /// Sets the serialized binding map.
    pub fn with_bindings(mut self, json: impl Into<String>) -> Self {
        self.parameter_binding = Some(json.into());
        self
    }

    pub fn with_selected_parameter(mut self, name: impl Into<String>) -> Self {
        self.selected_parameter = Some(name.into());
        self
    }

    pub fn with_editing_parameter(mut self, name: impl Into<String>) -> Self {
        self.editing_parameter = Some(name.into());
        self
    }

    pub fn with_global(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.global_parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort_field = Some(field.into());
        self.sort_ascending = ascending;
        self
    }

    pub fn with_section_field(mut self, field: impl Into<String>) -> Self {
        self.section_field = Some(field.into());
        self
    }

    pub fn with_header_template(mut self, name: impl Into<String>, section_parameter: impl Into<String>) -> Self {
        self.header_template = Some(name.into());
        self.header_section_parameter = Some(section_parameter.into());
        self
    }

    pub fn with_footer_template(mut self, name: impl Into<String>, section_parameter: impl Into<String>) -> Self {
        self.footer_template = Some(name.into());
        self.footer_section_parameter = Some(section_parameter.into());
        self
    }

    pub fn with_empty_template(mut self, name: impl Into<String>) -> Self {
        self.empty_template = Some(name.into());
        self
    }

    pub fn with_width_field(mut self, field: impl Into<String>) -> Self {
        self.width_field = Some(field.into());
        self
    }

    pub fn with_height_field(mut self, field: impl Into<String>) -> Self {
        self.height_field = Some(field.into());
        self
    }

    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    pub fn with_auto_select_first(mut self, enabled: bool) -> Self {
        self.auto_select_first = enabled;
        self
    }

    pub fn with_event_field(mut self, field: impl Into<String>) -> Self {
        self.event_fields.push(field.into());
        self
    }

    /// Sets whether items can be moved, and whether across sections.
    pub fn with_moves(mut self, can_move: bool, across_sections: bool) -> Self {
        self.can_move_cells = can_move;
        self.can_move_cells_across_sections = across_sections;
        self
    }

    pub fn with_drop_policy(mut self, policy: DropPolicy) -> Self {
        self.drop_policy = policy;
        self
    }

    pub fn with_data_shape(mut self, shape: DataShape) -> Self {
        self.data_shape = shape;
        self
    }

    pub fn with_component_id(mut self, id: impl Into<String>) -> Self {
        self.component_id = Some(id.into());
        self
    }

    // =========================================================================
    // Derived settings
    // =========================================================================

    /// Checks the settings every view needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.uid_field.trim().is_empty() {
            return Err(ConfigError::Missing("uidField"));
        }
        Ok(())
    }

    /// Returns the parsed binding map. A malformed map is logged and ignored.
    pub fn bindings(&self) -> ParameterBindings {
        ParameterBindings::parse_or_empty(self.parameter_binding.as_deref())
    }

    /// Returns the row fields whose changes require a layout pass.
    pub fn size_fields(&self) -> Vec<String> {
        self.width_field.iter().chain(self.height_field.iter()).cloned().collect()
    }

    /// Resolves the template for a row.
    ///
    /// A configured template field wins (falling back to the default
    /// template) and disables the selected and editing variants. Otherwise
    /// the editing template beats the selected template, which beats the
    /// default.
    pub fn template_for(&self, row: &Row, selected: bool, editing: bool) -> Option<String> {
        if let Some(field) = non_empty(&self.cell_template_field) {
            return row
                .get(&field)
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .or_else(|| non_empty(&self.cell_template));
        }
        if editing {
            if let Some(name) = non_empty(&self.editing_cell_template) {
                return Some(name);
            }
        }
        if selected {
            if let Some(name) = non_empty(&self.selected_cell_template) {
                return Some(name);
            }
        }
        non_empty(&self.cell_template)
    }

    /// Returns every template name referenced by the configuration, without
    /// duplicates.
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for name in [
            &self.cell_template,
            &self.selected_cell_template,
            &self.editing_cell_template,
            &self.header_template,
            &self.footer_template,
            &self.empty_template,
        ]
        .into_iter()
        .flatten()
        {
            if !name.is_empty() && !names.contains(name) {
                names.push(name.clone());
            }
        }
        names
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}
